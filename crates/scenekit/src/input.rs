use crate::render_target::Viewport;
use glam::Vec2;

/// Client pixel coordinates (origin top-left) to normalized device
/// coordinates in `[-1, 1]` with y pointing up
pub fn pointer_ndc(client: Vec2, viewport: Viewport) -> Vec2 {
    Vec2::new(
        client.x / viewport.width as f32 * 2.0 - 1.0,
        -(client.y / viewport.height as f32) * 2.0 + 1.0,
    )
}

/// Client pixel coordinates to `[0, 1]` texture space with y pointing up
pub fn pointer_uv(client: Vec2, viewport: Viewport) -> Vec2 {
    Vec2::new(
        client.x / viewport.width as f32,
        1.0 - client.y / viewport.height as f32,
    )
}

/// How far down the page we are, `0` when the page cannot scroll
pub fn scroll_progress(offset: f32, max_scroll: f32) -> f32 {
    if max_scroll > 0.0 {
        (offset / max_scroll).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Camera height for a scroll progress, linear between the two ends
pub fn scroll_height(top_y: f32, bottom_y: f32, progress: f32) -> f32 {
    top_y + (bottom_y - top_y) * progress
}

/// Latest input observed by a scene, read by the next tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    /// Raw client position, `None` until the pointer first moves
    pub pointer_client: Option<Vec2>,
    pub scroll_offset: f32,
    pub max_scroll: f32,
    pub viewport: Viewport,
}

impl InputState {
    pub fn pointer_ndc(&self) -> Option<Vec2> {
        self.pointer_client.map(|client| pointer_ndc(client, self.viewport))
    }

    pub fn pointer_uv(&self) -> Option<Vec2> {
        self.pointer_client.map(|client| pointer_uv(client, self.viewport))
    }

    pub fn scroll_progress(&self) -> f32 {
        scroll_progress(self.scroll_offset, self.max_scroll)
    }
}
