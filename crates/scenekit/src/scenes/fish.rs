use super::palette_color;
use crate::backend::Environment;
use crate::camera::{CameraRig, CameraSpec};
use crate::color::Rgb;
use crate::config::FishConfig;
use crate::entity::{Entity, EntityBuffer, VisualAttributes};
use crate::error::SceneError;
use crate::flock::{FlockRules, heading};
use crate::lifecycle::{FrameInput, SceneContext, SceneVariant};
use crate::physics::Bounds;
use glam::Vec3;
use rand::Rng;
use rand::rngs::StdRng;

/// A school of fish that swims together and shies away from the pointer
pub struct FishSchool {
    config: FishConfig,
    rng: StdRng,
    buffer: EntityBuffer,
    rules: FlockRules,
    bounds: Bounds,
}

impl FishSchool {
    pub fn new(config: FishConfig, rng: StdRng) -> Self {
        let rules = FlockRules::from_config(&config);
        let bounds = Bounds::symmetric(Vec3::from(config.bounds));
        Self {
            config,
            rng,
            buffer: EntityBuffer::default(),
            rules,
            bounds,
        }
    }

    pub fn buffer(&self) -> &EntityBuffer {
        &self.buffer
    }

    fn populate(&mut self) {
        let bounds = self.bounds;
        let entities: Vec<Entity> = (0..self.config.count)
            .map(|index| {
                let position = Vec3::new(
                    self.rng.random_range(bounds.min.x..=bounds.max.x),
                    self.rng.random_range(bounds.min.y..=bounds.max.y),
                    self.rng.random_range(bounds.min.z..=bounds.max.z),
                );
                let direction = Vec3::new(
                    self.rng.random_range(-1.0..=1.0),
                    self.rng.random_range(-0.2..=0.2),
                    self.rng.random_range(-1.0..=1.0),
                )
                .try_normalize()
                .unwrap_or(Vec3::X);
                let speed = self.rng.random_range(self.rules.min_speed..=self.rules.max_speed);
                let visual = VisualAttributes {
                    color: palette_color(&self.config.palette, index),
                    scale: self.config.scale,
                    base_scale: self.config.scale,
                    radius: self.config.scale,
                    opacity: 1.0,
                };
                let mut fish = Entity::new(position, direction * speed, visual);
                fish.rotation = heading(fish.velocity);
                fish
            })
            .collect();
        self.buffer.replace(entities);
    }
}

impl SceneVariant for FishSchool {
    fn name(&self) -> &'static str {
        "fish"
    }

    fn camera_spec(&self) -> CameraSpec {
        CameraSpec::perspective(60.0, 0.1, 100.0, Vec3::new(0.0, 0.0, 12.0))
    }

    fn initialize(&mut self, _ctx: &mut SceneContext<'_>, _camera: &mut CameraRig) -> Result<(), SceneError> {
        self.populate();
        Ok(())
    }

    fn update(&mut self, input: &FrameInput, camera: &mut CameraRig) {
        let pointer = input.pointer_on_z_plane(camera, 0.0);
        self.rules.step(&mut self.buffer, pointer, &self.bounds);
    }

    fn render(&mut self, ctx: &mut SceneContext<'_>, camera: &CameraRig) -> Result<(), SceneError> {
        ctx.upload(&mut self.buffer)?;
        let environment = Environment {
            light_intensity: 0.9,
            ..Environment::clear(Rgb::from_hex(self.config.background))
        };
        let pass = ctx.surface_pass(camera).with_environment(environment);
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

    #[test]
    fn school_starts_inside_bounds_at_legal_speeds() {
        let mut school = FishSchool::new(FishConfig::default(), StdRng::seed_from_u64(8));
        school.populate();
        assert_eq!(school.buffer().len(), 80);
        for fish in school.buffer().entities() {
            assert!(school.bounds.contains(fish.position));
            let speed = fish.velocity.length();
            assert!(speed >= school.rules.min_speed - 1e-6 && speed <= school.rules.max_speed + 1e-6);
        }
    }

    #[test]
    fn school_keeps_swimming_inside_wrapped_bounds() {
        let mut school = FishSchool::new(FishConfig::default(), StdRng::seed_from_u64(8));
        school.populate();
        for _ in 0..200 {
            school.rules.step(&mut school.buffer, Some(Vec3::ZERO), &school.bounds);
        }
        let bounds = school.bounds;
        let margin = Vec3::splat(school.rules.max_speed);
        let loose = Bounds::new(bounds.min - margin, bounds.max + margin);
        assert!(school.buffer().entities().iter().all(|fish| loose.contains(fish.position)));
    }
}
