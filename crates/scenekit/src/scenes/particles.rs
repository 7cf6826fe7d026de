use super::{palette_color, scatter};
use crate::backend::Environment;
use crate::camera::{CameraRig, CameraSpec};
use crate::color::Rgb;
use crate::config::ParticleConfig;
use crate::entity::{Entity, EntityBuffer, VisualAttributes};
use crate::error::SceneError;
use crate::lifecycle::{FrameInput, SceneContext, SceneVariant};
use crate::physics::{Attraction, Bounds, ReflectMode, integrate_damped};
use glam::Vec3;
use rand::rngs::StdRng;

/// Pastel spheres that drift inside a box and gather around the pointer
pub struct FloatingParticles {
    config: ParticleConfig,
    rng: StdRng,
    buffer: EntityBuffer,
    attraction: Attraction,
    bounds: Bounds,
}

impl FloatingParticles {
    pub fn new(config: ParticleConfig, rng: StdRng) -> Self {
        let attraction = Attraction {
            radius: config.attraction_radius,
            strength: config.attraction_strength,
        };
        let bounds = Bounds::symmetric(Vec3::from(config.bounds));
        Self {
            config,
            rng,
            buffer: EntityBuffer::default(),
            attraction,
            bounds,
        }
    }

    pub fn buffer(&self) -> &EntityBuffer {
        &self.buffer
    }

    fn populate(&mut self) {
        let extent = Vec3::from(self.config.spawn_extent);
        let speed = Vec3::splat(self.config.initial_speed);
        let entities: Vec<Entity> = (0..self.config.count)
            .map(|index| {
                let visual = VisualAttributes {
                    color: palette_color(&self.config.palette, index),
                    scale: self.config.radius,
                    base_scale: self.config.radius,
                    radius: self.config.radius,
                    opacity: self.config.opacity,
                };
                let position = scatter(&mut self.rng, extent);
                let velocity = scatter(&mut self.rng, speed);
                Entity::new(position, velocity, visual)
            })
            .collect();
        self.buffer.replace(entities);
    }

    /// One tick: pull towards the pointer, integrate with damping, bounce
    pub fn step(&mut self, pointer: Option<Vec3>) {
        let restitution = self.config.restitution;
        for particle in self.buffer.iter_mut() {
            if let Some(pointer) = pointer {
                particle.velocity += self.attraction.force(particle.position, pointer);
            }
            integrate_damped(particle, self.config.damping);
            self.bounds.reflect(
                &mut particle.position,
                &mut particle.velocity,
                ReflectMode::Clamp { restitution },
            );
        }
    }
}

impl SceneVariant for FloatingParticles {
    fn name(&self) -> &'static str {
        "particles"
    }

    fn camera_spec(&self) -> CameraSpec {
        CameraSpec::perspective(75.0, 0.1, 1000.0, Vec3::new(0.0, 0.0, 7.0))
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
            light_intensity: 0.8,
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
