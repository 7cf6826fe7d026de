use super::sample_range;
use crate::backend::{Environment, InputKind};
use crate::camera::{CameraRig, CameraSpec};
use crate::color::Rgb;
use crate::config::OceanConfig;
use crate::entity::{Entity, EntityBuffer, VisualAttributes};
use crate::error::SceneError;
use crate::fog::{FogState, depth_light_intensity};
use crate::input::scroll_height;
use crate::lifecycle::{FrameInput, SceneContext, SceneVariant};
use crate::ripple::RippleField;
use crate::uniforms::{UniformKind, UniformLayout, UniformSet, UniformValue};
use glam::{Vec2, Vec3};
use log::{trace, warn};
use rand::Rng;
use rand::rngs::StdRng;

/// Simulation step per tick, independent of frame time
const RIPPLE_STEP: f32 = 0.016;

/// Rippling water surface the page scrolls through.
///
/// The ripple grid's vertices are kept as entities so the host can rebuild
/// the surface mesh from the regular instance upload. Scrolling lowers the
/// camera below the surface, where fog and light follow its depth.
pub struct Ocean {
    config: OceanConfig,
    rng: StdRng,
    ripple: RippleField,
    surface: EntityBuffer,
    uniforms: UniformSet,
    since_drop: f32,
    time: f32,
    fog: Option<FogState>,
}

impl Ocean {
    pub fn new(config: OceanConfig, rng: StdRng) -> Self {
        let layout = UniformLayout::new()
            .with("time", UniformKind::Float)
            .with("water_color", UniformKind::Color)
            .with("alpha", UniformKind::Float)
            .with("light_direction", UniformKind::Vec3)
            .with("light_color", UniformKind::Color)
            .with("ground_color", UniformKind::Color)
            .with("ground_y", UniformKind::Float);
        Self {
            ripple: RippleField::new(config.grid_size),
            config,
            rng,
            surface: EntityBuffer::default(),
            uniforms: UniformSet::new(layout),
            since_drop: 0.0,
            time: 0.0,
            fog: None,
        }
    }

    /// Surface color, ground and key light for the host's materials
    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    pub fn ripple(&self) -> &RippleField {
        &self.ripple
    }

    pub fn surface(&self) -> &EntityBuffer {
        &self.surface
    }

    pub fn fog(&self) -> Option<FogState> {
        self.fog
    }

    fn vertex_position(&self, column: usize, row: usize) -> Vec3 {
        let size = self.ripple.size() as f32;
        let uv = (Vec2::new(column as f32, row as f32) + 0.5) / size;
        let height = self.ripple.height_at(column as isize, row as isize);
        Vec3::new(
            (uv.x - 0.5) * self.config.plane_size,
            height * self.config.displacement,
            (uv.y - 0.5) * self.config.plane_size,
        )
    }

    fn build_surface(&mut self) {
        let size = self.ripple.size();
        let visual = VisualAttributes {
            color: Rgb::from_hex(self.config.water_color),
            opacity: self.config.alpha,
            ..VisualAttributes::default()
        };
        let vertices: Vec<Entity> = (0..size)
            .flat_map(|row| (0..size).map(move |column| (column, row)))
            .map(|(column, row)| Entity::new(self.vertex_position(column, row), Vec3::ZERO, visual))
            .collect();
        self.surface.replace(vertices);
    }

    fn sync_surface(&mut self) {
        let displacement = self.config.displacement;
        let heights = self.ripple.heights();
        for (vertex, height) in self.surface.iter_mut().zip(heights) {
            vertex.position.y = height * displacement;
        }
    }

    fn drop_random(&mut self) {
        let center = Vec2::new(self.rng.random(), self.rng.random());
        let radius = sample_range(&mut self.rng, &self.config.drop_radius);
        let strength = sample_range(&mut self.rng, &self.config.drop_strength);
        trace!("Ocean drop at {center} (radius {radius}, strength {strength})");
        self.ripple.drop(center, radius, strength);
    }

    /// Advance the drop timer and the ripple simulation by one tick
    pub fn step(&mut self, delta: f32) {
        self.since_drop += delta;
        if self.since_drop >= self.config.drop_interval {
            self.since_drop = 0.0;
            self.drop_random();
        }
        self.ripple.step(RIPPLE_STEP);
        self.sync_surface();
    }

    fn write_static_uniforms(&mut self) -> Result<(), SceneError> {
        let config = &self.config;
        let light_direction = Vec3::from(config.light_direction).normalize_or_zero();
        self.uniforms.set("water_color", UniformValue::Color(Rgb::from_hex(config.water_color)))?;
        self.uniforms.set_float("alpha", config.alpha)?;
        self.uniforms.set("light_direction", UniformValue::Vec3(light_direction))?;
        self.uniforms.set("light_color", UniformValue::Color(Rgb::from_hex(config.light_color)))?;
        self.uniforms.set("ground_color", UniformValue::Color(Rgb::from_hex(config.ground_color)))?;
        self.uniforms.set_float("ground_y", config.ground_y)
    }
}

impl SceneVariant for Ocean {
    fn name(&self) -> &'static str {
        "ocean"
    }

    fn camera_spec(&self) -> CameraSpec {
        CameraSpec::perspective(45.0, 0.1, 100.0, Vec3::new(0.0, self.config.top_y, self.config.camera_distance))
    }

    fn listeners(&self) -> &'static [InputKind] {
        &[InputKind::Scroll, InputKind::Resize]
    }

    fn initialize(&mut self, _ctx: &mut SceneContext<'_>, camera: &mut CameraRig) -> Result<(), SceneError> {
        self.ripple.clear();
        self.time = 0.0;
        // First drop lands on the first tick
        self.since_drop = self.config.drop_interval;
        self.build_surface();
        self.fog = Some(self.config.fog.evaluate(camera.eye.y));
        self.write_static_uniforms()
    }

    fn update(&mut self, input: &FrameInput, camera: &mut CameraRig) {
        camera.eye.y = scroll_height(self.config.top_y, self.config.bottom_y, input.scroll_progress);
        self.fog = Some(self.config.fog.evaluate(camera.eye.y));

        self.time += input.delta;
        self.step(input.delta);
        if let Err(err) = self.uniforms.set_float("time", self.time) {
            warn!("Ocean uniforms rejected: {err}");
        }
    }

    fn render(&mut self, ctx: &mut SceneContext<'_>, camera: &CameraRig) -> Result<(), SceneError> {
        ctx.upload(&mut self.surface)?;
        let fog = self.fog.unwrap_or_else(|| self.config.fog.evaluate(camera.eye.y));
        let environment = Environment {
            background: fog.background,
            fog: Some(fog),
            light_intensity: depth_light_intensity(camera.eye.y),
        };
        let pass = ctx
            .surface_pass(camera)
            .with_uniforms(&self.uniforms)
            .with_environment(environment);
        ctx.submit(&pass)?;
        self.uniforms.mark_clean();
        Ok(())
    }

    fn teardown(&mut self) {
        self.surface.clear();
        self.ripple.clear();
        self.fog = None;
    }

    fn entity_count(&self) -> usize {
        self.surface.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::lifecycle::SceneController;
    use crate::render_target::Viewport;
    use rand::SeedableRng;

    fn small() -> OceanConfig {
        OceanConfig {
            grid_size: 16,
            drop_radius: 0.25..0.3,
            ..OceanConfig::default()
        }
    }

    fn ocean(config: OceanConfig) -> Ocean {
        Ocean::new(config, StdRng::seed_from_u64(5))
    }

    #[test]
    fn scrolling_sinks_the_camera_and_thickens_fog() {
        let mut backend = RecordingBackend::default();
        {
            let mut controller = SceneController::new(Box::new(ocean(small())), &mut backend);
            controller.initialize(Viewport::new(800, 600)).unwrap();
            controller.tick(0.0, 0.016).unwrap();
            assert_eq!(controller.camera().map(|camera| camera.eye.y), Some(2.0));

            assert!(controller.scrolled(1000.0, 1000.0));
            controller.tick(0.016, 0.016).unwrap();
            assert_eq!(controller.camera().map(|camera| camera.eye.y), Some(-2.0));
        }
        let environments: Vec<Environment> = backend.passes.iter().filter_map(|pass| pass.environment).collect();
        let [top, bottom] = [environments[0], environments[1]];
        let (top_fog, bottom_fog) = (top.fog.unwrap(), bottom.fog.unwrap());
        assert_eq!(top_fog.factor, 0.0);
        assert!(bottom_fog.factor > top_fog.factor);
        assert!(bottom_fog.far < top_fog.far);
        assert!(bottom.light_intensity < top.light_intensity);
        assert_eq!(top.background, top_fog.background);
    }

    #[test]
    fn surface_has_one_vertex_per_cell() {
        let mut backend = RecordingBackend::default();
        let mut controller = SceneController::new(Box::new(ocean(small())), &mut backend);
        assert_eq!(controller.entity_count(), 0);
        controller.initialize(Viewport::default()).unwrap();
        assert_eq!(controller.entity_count(), 256);
        controller.tick(0.0, 0.016).unwrap();
        assert_eq!(controller.backend().last_upload_len, 256);
    }

    #[test]
    fn first_tick_drops_and_surface_follows() {
        let mut ocean = ocean(small());
        ocean.since_drop = ocean.config.drop_interval;
        ocean.build_surface();
        assert_eq!(ocean.ripple().energy(), 0.0);

        ocean.step(0.016);
        assert!(ocean.ripple().energy() > 0.0);
        let lifted = ocean.surface().entities().iter().any(|vertex| vertex.position.y != 0.0);
        assert!(lifted);
    }

    #[test]
    fn drops_wait_for_the_interval() {
        let mut ocean = ocean(OceanConfig { drop_interval: 1.0, ..small() });
        ocean.build_surface();
        for _ in 0..3 {
            ocean.step(0.25);
        }
        assert_eq!(ocean.ripple().energy(), 0.0);
        ocean.step(0.25);
        assert!(ocean.ripple().energy() > 0.0);
    }

    #[test]
    fn uniforms_describe_the_configured_look() {
        let mut ocean = ocean(OceanConfig {
            water_color: 0x112233,
            ground_y: -3.0,
            ..small()
        });
        ocean.write_static_uniforms().unwrap();

        let uniforms = ocean.uniforms();
        assert_eq!(uniforms.color("water_color"), Some(Rgb::from_hex(0x112233)));
        assert_eq!(uniforms.float("ground_y"), Some(-3.0));
        let light = uniforms.vec3("light_direction").unwrap();
        assert!((light.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn vertices_span_the_plane() {
        let mut ocean = ocean(small());
        ocean.build_surface();
        let xs: Vec<f32> = ocean.surface().entities().iter().map(|vertex| vertex.position.x).collect();
        let half = ocean.config.plane_size / 2.0;
        assert!(xs.iter().all(|x| x.abs() < half));
        assert!(xs.iter().cloned().fold(f32::MIN, f32::max) > half * 0.9);
    }
}
