use crate::camera::{CameraRig, CameraSpec};
use crate::color::Rgb;
use crate::config::MetaballConfig;
use crate::entity::{Entity, VisualAttributes};
use crate::error::SceneError;
use crate::lifecycle::{FrameInput, SceneContext, SceneVariant};
use crate::physics::{Attraction, Bounds, EPSILON, ReflectMode};
use crate::render_target::Viewport;
use crate::uniforms::{UniformKind, UniformLayout, UniformSet, UniformValue};
use glam::{Vec2, Vec3, Vec4};
use log::warn;
use rand::Rng;
use rand::rngs::StdRng;

/// Metaball field at `uv`: the sum of `r^2 / d^2` over all blobs packed as
/// `(x, y, radius, _)`
pub fn field_at(blobs: &[Vec4], uv: Vec2) -> f32 {
    blobs
        .iter()
        .map(|blob| {
            let distance = uv.distance(blob.truncate().truncate()) + EPSILON;
            blob.z * blob.z / (distance * distance)
        })
        .sum()
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Final color for a field value, the same blend the metaball shader does
pub fn shade(field: f32, uv: Vec2, config: &MetaballConfig) -> Rgb {
    let background = Rgb::from_hex(config.background_bottom).lerp(Rgb::from_hex(config.background_top), uv.y);
    let fill = smoothstep(config.threshold - 0.01, config.threshold + 0.01, field);
    let shadow = smoothstep(config.shadow_low, config.threshold, field);
    background
        .lerp(Rgb::BLACK, shadow * (1.0 - fill) * config.shadow_opacity)
        .lerp(Rgb::from_hex(config.fill), fill)
}

/// Blobs moving in screen UV space, merged by a full-screen shader
pub struct Metaballs {
    config: MetaballConfig,
    rng: StdRng,
    blobs: Vec<Entity>,
    uniforms: UniformSet,
    attraction: Attraction,
    bounds: Bounds,
}

impl Metaballs {
    pub fn new(config: MetaballConfig, rng: StdRng) -> Self {
        let layout = UniformLayout::new()
            .with("u_time", UniformKind::Float)
            .with("u_mouse", UniformKind::Vec2)
            .with("u_resolution", UniformKind::Vec2)
            .with("u_blobs", UniformKind::Vec4Array(config.count))
            .with("u_background_bottom", UniformKind::Color)
            .with("u_background_top", UniformKind::Color)
            .with("u_fill", UniformKind::Color)
            .with("u_shape", UniformKind::Vec4);
        let attraction = Attraction {
            radius: config.pointer_radius,
            strength: config.attraction_strength,
        };
        Self {
            config,
            rng,
            blobs: Vec::new(),
            uniforms: UniformSet::new(layout),
            attraction,
            bounds: Bounds::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)),
        }
    }

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    pub fn blobs(&self) -> &[Entity] {
        &self.blobs
    }

    fn populate(&mut self) {
        let speed = self.config.initial_speed;
        self.blobs = (0..self.config.count)
            .map(|_| {
                let radius = self.config.min_radius + self.rng.random::<f32>() * self.config.radius_jitter;
                let position = Vec3::new(self.rng.random(), self.rng.random(), 0.0);
                let velocity = Vec3::new(
                    (self.rng.random::<f32>() - 0.5) * speed,
                    (self.rng.random::<f32>() - 0.5) * speed,
                    0.0,
                );
                let visual = VisualAttributes {
                    radius,
                    ..VisualAttributes::default()
                };
                Entity::new(position, velocity, visual)
            })
            .collect();
    }

    /// One tick: move, bounce off the screen edges, drift towards the pointer
    /// (UV space), then damp
    pub fn step(&mut self, pointer_uv: Vec2) {
        let target = pointer_uv.extend(0.0);
        for blob in &mut self.blobs {
            blob.position += blob.velocity;
            self.bounds
                .reflect(&mut blob.position, &mut blob.velocity, ReflectMode::Clamp { restitution: 1.0 });
            blob.velocity += self.attraction.force(blob.position, target);
            blob.velocity *= self.config.damping;
        }
    }

    /// Blob centers and radii as the shader expects them
    pub fn packed(&self) -> Vec<Vec4> {
        self.blobs
            .iter()
            .map(|blob| Vec4::new(blob.position.x, blob.position.y, blob.visual.radius, 0.0))
            .collect()
    }

    fn write_static_uniforms(&mut self, viewport: Viewport) -> Result<(), SceneError> {
        let config = &self.config;
        let shape = Vec4::new(config.threshold, config.shadow_low, config.shadow_opacity, 0.0);
        self.uniforms
            .set("u_background_bottom", UniformValue::Color(Rgb::from_hex(config.background_bottom)))?;
        self.uniforms
            .set("u_background_top", UniformValue::Color(Rgb::from_hex(config.background_top)))?;
        self.uniforms.set("u_fill", UniformValue::Color(Rgb::from_hex(config.fill)))?;
        self.uniforms.set("u_shape", UniformValue::Vec4(shape))?;
        self.uniforms.set("u_mouse", UniformValue::Vec2(Vec2::splat(0.5)))?;
        self.set_resolution(viewport)
    }

    fn set_resolution(&mut self, viewport: Viewport) -> Result<(), SceneError> {
        let resolution = Vec2::new(viewport.width as f32, viewport.height as f32);
        self.uniforms.set("u_resolution", UniformValue::Vec2(resolution))
    }

    fn write_frame_uniforms(&mut self, time: f32, pointer_uv: Vec2) -> Result<(), SceneError> {
        self.uniforms.set_float("u_time", time)?;
        self.uniforms.set("u_mouse", UniformValue::Vec2(pointer_uv))?;
        let packed = self.packed();
        self.uniforms.set("u_blobs", UniformValue::Vec4Array(packed))
    }

    fn pointer(&self) -> Vec2 {
        self.uniforms.vec2("u_mouse").unwrap_or(Vec2::splat(0.5))
    }
}

impl SceneVariant for Metaballs {
    fn name(&self) -> &'static str {
        "metaballs"
    }

    fn camera_spec(&self) -> CameraSpec {
        CameraSpec::screen_quad()
    }

    fn initialize(&mut self, ctx: &mut SceneContext<'_>, _camera: &mut CameraRig) -> Result<(), SceneError> {
        self.populate();
        self.write_static_uniforms(ctx.viewport())?;
        let pointer = self.pointer();
        self.write_frame_uniforms(0.0, pointer)
    }

    fn update(&mut self, input: &FrameInput, _camera: &mut CameraRig) {
        // The last known pointer stays in effect once it leaves the window
        let pointer = input.pointer_uv.unwrap_or_else(|| self.pointer());
        self.step(pointer);
        if let Err(err) = self.write_frame_uniforms(input.elapsed, pointer) {
            warn!("Metaball uniforms rejected: {err}");
        }
    }

    fn render(&mut self, ctx: &mut SceneContext<'_>, camera: &CameraRig) -> Result<(), SceneError> {
        let pass = ctx.surface_pass(camera).with_uniforms(&self.uniforms);
        ctx.submit(&pass)?;
        self.uniforms.mark_clean();
        Ok(())
    }

    fn resized(&mut self, viewport: Viewport) {
        if let Err(err) = self.set_resolution(viewport) {
            warn!("Metaball resolution rejected: {err}");
        }
    }

    fn teardown(&mut self) {
        self.blobs.clear();
    }

    fn entity_count(&self) -> usize {
        self.blobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::lifecycle::SceneController;
    use rand::SeedableRng;
    use rstest::rstest;

    fn scene() -> Metaballs {
        Metaballs::new(MetaballConfig::default(), StdRng::seed_from_u64(9))
    }

    #[test]
    fn field_is_one_at_blob_radius() {
        let blobs = [Vec4::new(0.5, 0.5, 0.1, 0.0)];
        let field = field_at(&blobs, Vec2::new(0.6, 0.5));
        assert!((field - 1.0).abs() < 0.01, "field {field}");
    }

    #[test]
    fn fields_add_up() {
        let blob = Vec4::new(0.2, 0.2, 0.05, 0.0);
        let single = field_at(&[blob], Vec2::splat(0.5));
        let double = field_at(&[blob, blob], Vec2::splat(0.5));
        assert!((double - 2.0 * single).abs() < 1e-6);
    }

    #[rstest]
    #[case(5.0, 0xffffff)]
    #[case(0.0, 0x2a3a9f)]
    fn shade_picks_fill_or_background(#[case] field: f32, #[case] expected: u32) {
        let color = shade(field, Vec2::new(0.5, 0.0), &MetaballConfig::default());
        assert_eq!(color.to_hex(), expected);
    }

    #[test]
    fn shadow_band_darkens_background() {
        let config = MetaballConfig::default();
        let uv = Vec2::new(0.5, 0.5);
        let outside = shade(0.0, uv, &config);
        let band = shade(0.95, uv, &config);
        assert!(band.r < outside.r && band.b < outside.b);
    }

    #[test]
    fn blobs_stay_on_screen() {
        let mut metaballs = Metaballs::new(
            MetaballConfig { initial_speed: 0.2, ..MetaballConfig::default() },
            StdRng::seed_from_u64(2),
        );
        metaballs.populate();
        for tick in 0..500 {
            metaballs.step(Vec2::new((tick as f32 * 0.05).cos() * 0.5 + 0.5, 0.5));
            for blob in metaballs.blobs() {
                assert!((0.0..=1.0).contains(&blob.position.x));
                assert!((0.0..=1.0).contains(&blob.position.y));
            }
        }
    }

    #[test]
    fn blob_near_pointer_is_pulled_in() {
        let mut metaballs = scene();
        metaballs.blobs = vec![Entity::at_rest(Vec3::new(0.4, 0.5, 0.0))];
        metaballs.step(Vec2::new(0.5, 0.5));
        assert!(metaballs.blobs()[0].velocity.x > 0.0);
    }

    #[test]
    fn uniforms_follow_the_frame() {
        let mut backend = RecordingBackend::default();
        let mut controller = SceneController::new(Box::new(scene()), &mut backend);
        controller.initialize(Viewport::new(800, 600)).unwrap();
        controller.pointer_moved(Vec2::new(200.0, 150.0));
        controller.tick(1.5, 0.016).unwrap();
        controller.resized(Viewport::new(400, 300)).unwrap();
        controller.tick(1.516, 0.016).unwrap();
        drop(controller);

        assert_eq!(backend.passes.len(), 2);
        assert_eq!(backend.passes[0].time, Some(1.5));
        assert_eq!(backend.passes[1].time, Some(1.516));
    }

    #[test]
    fn undeclared_blob_count_is_rejected() {
        let mut metaballs = scene();
        metaballs.blobs = vec![Entity::at_rest(Vec3::ZERO)];
        assert!(matches!(
            metaballs.write_frame_uniforms(0.0, Vec2::ZERO),
            Err(SceneError::UniformKind { .. })
        ));
    }
}
