use super::{palette_color, scatter};
use crate::backend::Environment;
use crate::camera::{CameraRig, CameraSpec};
use crate::color::Rgb;
use crate::config::StarConfig;
use crate::entity::{Entity, EntityBuffer, VisualAttributes};
use crate::error::SceneError;
use crate::lifecycle::{FrameInput, SceneContext, SceneVariant};
use crate::physics::Repulsion;
use glam::{Quat, Vec3};
use rand::Rng;
use rand::rngs::StdRng;

/// Slowly turning star cloud that scatters away from the pointer
pub struct StarField {
    config: StarConfig,
    rng: StdRng,
    buffer: EntityBuffer,
    repulsion: Repulsion,
}

impl StarField {
    /// Radius of the star mesh before per-star scaling
    const STAR_RADIUS: f32 = 0.1;

    pub fn new(config: StarConfig, rng: StdRng) -> Self {
        let repulsion = Repulsion {
            radius: config.repulsion_radius,
            strength: config.repulsion_strength,
            return_rate: config.return_rate,
            scale_boost: config.scale_boost,
        };
        Self {
            config,
            rng,
            buffer: EntityBuffer::default(),
            repulsion,
        }
    }

    pub fn buffer(&self) -> &EntityBuffer {
        &self.buffer
    }

    fn populate(&mut self) {
        let extent = Vec3::from(self.config.spawn_extent);
        let tint = Rgb::from_hex(self.config.tint);
        let entities: Vec<Entity> = (0..self.config.count)
            .map(|index| {
                let color = palette_color(&self.config.palette, index).lerp(tint, self.config.tint_amount);
                let base_scale = (self.config.min_scale + self.rng.random::<f32>() * self.config.scale_jitter)
                    * Self::STAR_RADIUS;
                let visual = VisualAttributes {
                    color,
                    scale: base_scale,
                    base_scale,
                    radius: Self::STAR_RADIUS,
                    opacity: 1.0,
                };
                Entity::new(scatter(&mut self.rng, extent), Vec3::ZERO, visual)
            })
            .collect();
        self.buffer.replace(entities);
    }

    /// One tick. `pointer` is in world space; stars live in the rotating
    /// group's frame, so it is turned back into that frame first.
    pub fn step(&mut self, pointer: Option<Vec3>) {
        let to_group = Quat::from_rotation_y(-self.buffer.group_rotation_y());
        let local_pointer = pointer.map(|pointer| to_group * pointer);
        for star in self.buffer.iter_mut() {
            self.repulsion.apply(star, local_pointer);
        }
        let angle = self.buffer.group_rotation_y() + self.config.spin;
        self.buffer.set_group_rotation_y(angle);
    }
}

impl SceneVariant for StarField {
    fn name(&self) -> &'static str {
        "starfield"
    }

    fn camera_spec(&self) -> CameraSpec {
        CameraSpec::perspective(75.0, 0.1, 1000.0, Vec3::new(0.0, 0.0, 15.0))
    }

    fn initialize(&mut self, _ctx: &mut SceneContext<'_>, _camera: &mut CameraRig) -> Result<(), SceneError> {
        self.populate();
        Ok(())
    }

    fn update(&mut self, input: &FrameInput, camera: &mut CameraRig) {
        let pointer = input.pointer_on_z_plane(camera, 0.0);
        self.step(pointer);
    }

    fn render(&mut self, ctx: &mut SceneContext<'_>, camera: &CameraRig) -> Result<(), SceneError> {
        ctx.upload(&mut self.buffer)?;
        let environment = Environment {
            light_intensity: 0.3,
            ..Environment::clear(Rgb::from_hex(self.config.background))
        };
        let pass = ctx.surface_pass(camera).with_environment(environment);
        ctx.submit(&pass)
    }

    fn teardown(&mut self) {
        self.buffer.clear();
        self.buffer.set_group_rotation_y(0.0);
    }

    fn entity_count(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn field() -> StarField {
        StarField::new(StarConfig { spin: 0.0, ..StarConfig::default() }, StdRng::seed_from_u64(5))
    }

    fn star_at(position: Vec3) -> Entity {
        let visual = VisualAttributes { base_scale: 0.02, scale: 0.02, ..VisualAttributes::default() };
        Entity::new(position, Vec3::ZERO, visual)
    }

    #[test]
    fn stars_flee_and_swell_near_pointer() {
        let mut field = field();
        field.buffer.replace([star_at(Vec3::new(1.0, 0.0, 0.0))]);
        field.step(Some(Vec3::ZERO));

        let star = field.buffer().entities()[0];
        assert!(star.position.x > 1.0);
        assert!(star.visual.scale > star.visual.base_scale);
    }

    #[test]
    fn stars_drift_home_once_pointer_leaves() {
        let mut field = field();
        field.buffer.replace([star_at(Vec3::new(1.0, 0.0, 0.0))]);
        field.step(Some(Vec3::ZERO));
        let pushed = field.buffer().entities()[0].position;

        for _ in 0..500 {
            field.step(None);
        }
        let star = field.buffer().entities()[0];
        assert!(star.position.distance(star.origin) < pushed.distance(star.origin) * 0.01);
        assert_eq!(star.visual.scale, star.visual.base_scale);
    }

    #[test]
    fn group_keeps_turning() {
        let mut field = StarField::new(StarConfig::default(), StdRng::seed_from_u64(5));
        field.populate();
        for _ in 0..10 {
            field.step(None);
        }
        assert!((field.buffer().group_rotation_y() - 10.0 * StarConfig::default().spin).abs() < 1e-6);
    }

    #[test]
    fn pointer_is_taken_into_group_frame() {
        let mut field = field();
        field.buffer.replace([star_at(Vec3::new(0.0, 0.0, -1.0))]);
        field.buffer.set_group_rotation_y(std::f32::consts::FRAC_PI_2);
        // The local star at -z sits at -x in world space, next to this pointer
        field.step(Some(Vec3::new(-1.2, 0.0, 0.0)));
        assert!(field.buffer().entities()[0].visual.scale > 0.02);
    }

    #[test]
    fn colors_are_tinted() {
        let mut field = field();
        field.populate();
        let tint = Rgb::from_hex(StarConfig::default().tint);
        let expected = Rgb::from_hex(0xffc1cc).lerp(tint, 0.3);
        assert_eq!(field.buffer().entities()[0].visual.color, expected);
        assert_eq!(field.buffer().len(), 300);
    }
}
