use super::scatter;
use crate::backend::{Environment, InputKind};
use crate::camera::{CameraRig, CameraSpec};
use crate::color::Rgb;
use crate::config::CubeConfig;
use crate::entity::{Entity, EntityBuffer, VisualAttributes};
use crate::error::SceneError;
use crate::lifecycle::{FrameInput, SceneContext, SceneVariant};
use crate::physics::{Bounds, ReflectMode};
use glam::Vec3;
use rand::Rng;
use rand::rngs::StdRng;

/// Translucent cubes tumbling around a box, no pointer interaction
pub struct DriftingCubes {
    config: CubeConfig,
    rng: StdRng,
    buffer: EntityBuffer,
    bounds: Bounds,
}

impl DriftingCubes {
    pub fn new(config: CubeConfig, rng: StdRng) -> Self {
        let bounds = Bounds::symmetric(Vec3::splat(config.bound));
        Self {
            config,
            rng,
            buffer: EntityBuffer::default(),
            bounds,
        }
    }

    pub fn buffer(&self) -> &EntityBuffer {
        &self.buffer
    }

    fn populate(&mut self) {
        let extent = Vec3::splat(self.config.spawn_extent);
        let speed = Vec3::splat(self.config.initial_speed);
        let entities: Vec<Entity> = (0..self.config.count)
            .map(|_| {
                let color = Rgb::new(self.rng.random(), self.rng.random(), self.rng.random());
                let visual = VisualAttributes {
                    color,
                    opacity: self.config.opacity,
                    ..VisualAttributes::default()
                };
                let position = scatter(&mut self.rng, extent);
                let velocity = scatter(&mut self.rng, speed);
                Entity::new(position, velocity, visual)
            })
            .collect();
        self.buffer.replace(entities);
    }

    pub fn step(&mut self) {
        let spin = self.config.spin;
        for cube in self.buffer.iter_mut() {
            cube.rotation.x += spin;
            cube.rotation.y += spin;
            cube.position += cube.velocity;
            self.bounds.reflect(&mut cube.position, &mut cube.velocity, ReflectMode::Flip);
        }
    }
}

impl SceneVariant for DriftingCubes {
    fn name(&self) -> &'static str {
        "cubes"
    }

    fn camera_spec(&self) -> CameraSpec {
        CameraSpec::perspective(75.0, 0.1, 100.0, Vec3::new(0.0, 0.0, 10.0))
    }

    fn listeners(&self) -> &'static [InputKind] {
        &[InputKind::Resize]
    }

    fn initialize(&mut self, _ctx: &mut SceneContext<'_>, _camera: &mut CameraRig) -> Result<(), SceneError> {
        self.populate();
        Ok(())
    }

    fn update(&mut self, _input: &FrameInput, _camera: &mut CameraRig) {
        self.step();
    }

    fn render(&mut self, ctx: &mut SceneContext<'_>, camera: &CameraRig) -> Result<(), SceneError> {
        ctx.upload(&mut self.buffer)?;
        let pass = ctx
            .surface_pass(camera)
            .with_environment(Environment::clear(Rgb::from_hex(self.config.background)));
        ctx.submit(&pass)
    }

    fn teardown(&mut self) {
        self.buffer.clear();
    }

    fn entity_count(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn cubes() -> DriftingCubes {
        DriftingCubes::new(CubeConfig::default(), StdRng::seed_from_u64(4))
    }

    #[test]
    fn cube_turns_back_after_crossing_a_face() {
        let mut cubes = cubes();
        let cube = Entity::new(Vec3::new(9.995, 0.0, 0.0), Vec3::new(0.01, 0.0, 0.0), VisualAttributes::default());
        cubes.buffer.replace([cube]);

        cubes.step();
        let cube = cubes.buffer().entities()[0];
        // Flip mode lets it overshoot for one tick
        assert!(cube.position.x > 10.0);
        assert!(cube.velocity.x < 0.0);

        cubes.step();
        assert!(cubes.buffer().entities()[0].position.x < cube.position.x);
    }

    #[test]
    fn cubes_spin_every_tick() {
        let mut cubes = cubes();
        cubes.populate();
        cubes.step();
        cubes.step();
        let rotation = cubes.buffer().entities()[0].rotation;
        assert!((rotation.x - 0.01).abs() < 1e-6);
        assert!((rotation.y - 0.01).abs() < 1e-6);
        assert_eq!(rotation.z, 0.0);
    }

    #[test]
    fn population_matches_config() {
        let mut cubes = cubes();
        cubes.populate();
        assert_eq!(cubes.buffer().len(), 50);
        assert!(cubes.buffer().entities().iter().all(|c| c.visual.opacity == 0.6));
    }
}
