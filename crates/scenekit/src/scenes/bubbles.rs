use crate::backend::{Environment, InputKind};
use crate::bubbles::BubbleEmitter;
use crate::camera::{CameraRig, CameraSpec};
use crate::color::Rgb;
use crate::config::BubbleConfig;
use crate::entity::EntityBuffer;
use crate::error::SceneError;
use crate::lifecycle::{FrameInput, SceneContext, SceneVariant};
use glam::Vec3;
use log::trace;
use rand::rngs::StdRng;

/// A column of bubbles rising from the floor and fading near the top
pub struct BubbleColumn {
    background: Rgb,
    emitter: BubbleEmitter,
    buffer: EntityBuffer,
}

impl BubbleColumn {
    pub fn new(config: BubbleConfig, rng: StdRng) -> Self {
        Self {
            background: Rgb::from_hex(config.background),
            emitter: BubbleEmitter::new(config, rng),
            buffer: EntityBuffer::default(),
        }
    }
}

impl SceneVariant for BubbleColumn {
    fn name(&self) -> &'static str {
        "bubbles"
    }

    fn camera_spec(&self) -> CameraSpec {
        CameraSpec::perspective(60.0, 0.1, 100.0, Vec3::new(0.0, 0.0, 10.0))
    }

    fn listeners(&self) -> &'static [InputKind] {
        &[InputKind::Resize]
    }

    fn initialize(&mut self, _ctx: &mut SceneContext<'_>, _camera: &mut CameraRig) -> Result<(), SceneError> {
        self.emitter.clear();
        self.buffer.clear();
        Ok(())
    }

    fn update(&mut self, input: &FrameInput, _camera: &mut CameraRig) {
        let popped = self.emitter.step(input.elapsed, input.delta);
        if popped > 0 {
            trace!("{popped} bubbles popped, {} left", self.emitter.len());
        }
        self.emitter.write_to(&mut self.buffer);
    }

    fn render(&mut self, ctx: &mut SceneContext<'_>, camera: &CameraRig) -> Result<(), SceneError> {
        ctx.upload(&mut self.buffer)?;
        let pass = ctx
            .surface_pass(camera)
            .with_environment(Environment::clear(self.background));
        ctx.submit(&pass)
    }

    fn teardown(&mut self) {
        self.emitter.clear();
        self.buffer.clear();
    }

    fn entity_count(&self) -> usize {
        self.emitter.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::lifecycle::SceneController;
    use crate::render_target::Viewport;
    use rand::SeedableRng;

    #[test]
    fn column_fills_up_to_cap_and_uploads_live_bubbles() {
        let config = BubbleConfig { max_bubbles: 10, spawn_rate: 60.0, ..BubbleConfig::default() };
        let mut backend = RecordingBackend::default();
        let mut controller =
            SceneController::new(Box::new(BubbleColumn::new(config, StdRng::seed_from_u64(1))), &mut backend);
        controller.initialize(Viewport::default()).unwrap();
        assert_eq!(controller.entity_count(), 0);

        for frame in 0..60 {
            controller.tick(frame as f32 / 60.0, 1.0 / 60.0).unwrap();
        }
        assert_eq!(controller.entity_count(), 10);
        drop(controller);
        assert_eq!(backend.last_upload_len, 10);
    }
}
