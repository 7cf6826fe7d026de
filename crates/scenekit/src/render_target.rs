use crate::backend::TargetId;

/// Drawable area in physical pixels. Never zero-sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Viewport scaled by `factor`, rounded, at least one pixel per side
    pub fn scaled(&self, factor: f32) -> Viewport {
        Viewport::new(
            (self.width as f32 * factor).round() as u32,
            (self.height as f32 * factor).round() as u32,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::new(1280, 720)
    }
}

/// Offscreen color buffer owned by one scene.
///
/// The size is always `viewport.scaled(scale)`; the controller calls
/// [`RenderTarget::fit`] for every live target on resize, so sampling
/// coordinates computed from the viewport stay valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub id: TargetId,
    pub scale: f32,
    size: Viewport,
}

impl RenderTarget {
    pub fn new(id: TargetId, viewport: Viewport, scale: f32) -> Self {
        Self {
            id,
            scale,
            size: viewport.scaled(scale),
        }
    }

    pub fn size(&self) -> Viewport {
        self.size
    }

    /// New size for `viewport`, or `None` if the target already matches it
    pub fn fit(&mut self, viewport: Viewport) -> Option<Viewport> {
        let wanted = viewport.scaled(self.scale);
        if wanted == self.size {
            return None;
        }
        self.size = wanted;
        Some(wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_viewport_is_clamped() {
        let viewport = Viewport::new(0, 0);
        assert_eq!(viewport, Viewport::new(1, 1));
        assert_eq!(viewport.aspect(), 1.0);
    }

    #[test]
    fn target_follows_viewport() {
        let mut target = RenderTarget::new(TargetId(1), Viewport::new(1000, 500), 0.5);
        assert_eq!(target.size(), Viewport::new(500, 250));

        assert_eq!(target.fit(Viewport::new(1000, 500)), None);
        assert_eq!(target.fit(Viewport::new(800, 600)), Some(Viewport::new(400, 300)));
        assert_eq!(target.size(), Viewport::new(400, 300));
    }
}
