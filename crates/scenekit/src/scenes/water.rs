use crate::backend::{DrawPass, Environment, InputKind, PassTarget, RequestId, TargetId, TextureId};
use crate::camera::{CameraRig, CameraSpec};
use crate::color::Rgb;
use crate::config::WaterConfig;
use crate::error::SceneError;
use crate::lifecycle::{FrameInput, SceneContext, SceneVariant};
use crate::shading::{MeshVisibility, WATER_F0, mirror_camera, ripple_offset};
use crate::uniforms::{UniformKind, UniformLayout, UniformSet, UniformValue};
use crate::waves::MAX_WAVE_TERMS;
use glam::Vec3;
use log::{debug, warn};

/// Height of the water plane
const WATER_LEVEL: f32 = 0.0;

/// Endless water plane that reflects the sky.
///
/// Each frame renders twice: once from the camera mirrored under the water
/// plane into an offscreen target, with the water mesh hidden, then the
/// normal view, where the water shader blends that reflection with the
/// refraction color by a Fresnel term.
pub struct ReflectiveWater {
    config: WaterConfig,
    uniforms: UniformSet,
    visibility: MeshVisibility,
    reflection: Option<TargetId>,
    normal_request: Option<RequestId>,
    time: f32,
}

impl ReflectiveWater {
    pub fn new(config: WaterConfig) -> Self {
        let layout = UniformLayout::new()
            .with("time", UniformKind::Float)
            .with("ripple_offset", UniformKind::Vec2)
            .with("eye", UniformKind::Vec3)
            .with("distortion_scale", UniformKind::Float)
            .with("fresnel_f0", UniformKind::Float)
            .with("water_color", UniformKind::Color)
            .with("tint_amount", UniformKind::Float)
            .with("alpha", UniformKind::Float)
            .with("sun_color", UniformKind::Color)
            .with("sun_direction", UniformKind::Vec3)
            .with("waves", UniformKind::Vec4Array(MAX_WAVE_TERMS * 2))
            .with("normal_map", UniformKind::Texture)
            .with("reflection", UniformKind::RenderTarget);
        Self {
            config,
            uniforms: UniformSet::new(layout),
            visibility: MeshVisibility::default(),
            reflection: None,
            normal_request: None,
            time: 0.0,
        }
    }

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    pub fn water_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    fn write_static_uniforms(&mut self) -> Result<(), SceneError> {
        let config = &self.config;
        let sun_direction = Vec3::from(config.sun_direction).normalize_or_zero();
        let waves = config.waves.packed().to_vec();
        self.uniforms.set_float("distortion_scale", config.distortion_scale)?;
        self.uniforms.set_float("fresnel_f0", WATER_F0)?;
        self.uniforms.set("water_color", UniformValue::Color(Rgb::from_hex(config.water_color)))?;
        self.uniforms.set_float("tint_amount", config.tint_amount)?;
        self.uniforms.set_float("alpha", config.alpha)?;
        self.uniforms.set("sun_color", UniformValue::Color(Rgb::from_hex(config.sun_color)))?;
        self.uniforms.set("sun_direction", UniformValue::Vec3(sun_direction))?;
        self.uniforms.set("waves", UniformValue::Vec4Array(waves))?;
        self.uniforms.set("reflection", UniformValue::RenderTarget(self.reflection))
    }

    fn environment(&self) -> Environment {
        Environment {
            light_intensity: 0.8,
            ..Environment::clear(Rgb::from_hex(self.config.sky_color))
        }
    }
}

impl SceneVariant for ReflectiveWater {
    fn name(&self) -> &'static str {
        "water"
    }

    fn camera_spec(&self) -> CameraSpec {
        CameraSpec::perspective(55.0, 1.0, 20000.0, Vec3::new(30.0, 30.0, 100.0))
    }

    fn listeners(&self) -> &'static [InputKind] {
        &[InputKind::Resize]
    }

    fn initialize(&mut self, ctx: &mut SceneContext<'_>, _camera: &mut CameraRig) -> Result<(), SceneError> {
        self.time = 0.0;
        self.normal_request = Some(ctx.request_texture(&self.config.normal_map));
        self.reflection = Some(ctx.create_render_target(self.config.reflection_scale)?);
        self.write_static_uniforms()
    }

    fn update(&mut self, input: &FrameInput, camera: &mut CameraRig) {
        self.time += input.delta;
        let result = self
            .uniforms
            .set_float("time", self.time)
            .and_then(|_| self.uniforms.set("ripple_offset", UniformValue::Vec2(ripple_offset(self.time))))
            .and_then(|_| self.uniforms.set("eye", UniformValue::Vec3(camera.eye)));
        if let Err(err) = result {
            warn!("Water uniforms rejected: {err}");
        }
    }

    fn render(&mut self, ctx: &mut SceneContext<'_>, camera: &CameraRig) -> Result<(), SceneError> {
        let Some(reflection) = self.reflection else {
            return Err(SceneError::Backend("reflection target was never created".into()));
        };
        let environment = self.environment();
        let mirrored = mirror_camera(camera, WATER_LEVEL);
        {
            // Hidden for the reflection pass only, shown again however it ends
            let hidden = self.visibility.hidden_scope();
            let pass = DrawPass::new(PassTarget::Offscreen(reflection), &mirrored)
                .with_uniforms(&self.uniforms)
                .with_environment(environment)
                .with_water_visible(hidden.is_visible());
            ctx.submit(&pass)?;
        }

        let pass = ctx
            .surface_pass(camera)
            .with_uniforms(&self.uniforms)
            .with_environment(environment)
            .with_water_visible(self.visibility.is_visible());
        ctx.submit(&pass)?;
        self.uniforms.mark_clean();
        Ok(())
    }

    fn texture_ready(&mut self, request: RequestId, texture: Option<TextureId>) {
        if self.normal_request != Some(request) {
            return;
        }
        self.normal_request = None;
        match texture {
            Some(texture) => {
                debug!("Water normal map ready as {texture:?}");
                if let Err(err) = self.uniforms.set("normal_map", UniformValue::Texture(Some(texture))) {
                    warn!("Water normal map rejected: {err}");
                }
            }
            None => debug!("Water renders without a normal map"),
        }
    }

    fn teardown(&mut self) {
        self.reflection = None;
        self.normal_request = None;
        self.visibility = MeshVisibility::default();
        self.uniforms = UniformSet::new(self.uniforms.layout().clone());
    }

    fn entity_count(&self) -> usize {
        if self.reflection.is_some() {
            let side = self.config.subdivisions as usize + 1;
            side * side
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::lifecycle::SceneController;
    use crate::render_target::Viewport;
    use crate::shading::fresnel;
    use glam::Vec2;

    fn controller(backend: &mut RecordingBackend) -> SceneController<&mut RecordingBackend> {
        SceneController::new(Box::new(ReflectiveWater::new(WaterConfig::default())), backend)
    }

    #[test]
    fn renders_reflection_first_without_the_water() {
        let mut backend = RecordingBackend::default();
        {
            let mut controller = controller(&mut backend);
            controller.initialize(Viewport::new(1024, 768)).unwrap();
            controller.tick(0.0, 0.016).unwrap();
        }
        let [reflection, main] = [&backend.passes[0], &backend.passes[1]];

        assert!(matches!(reflection.target, PassTarget::Offscreen(_)));
        assert!(!reflection.water_visible);
        assert_eq!(reflection.camera.eye, Vec3::new(30.0, -30.0, 100.0));

        assert!(matches!(main.target, PassTarget::Surface(_)));
        assert!(main.water_visible);
        assert_eq!(main.camera.eye, Vec3::new(30.0, 30.0, 100.0));
    }

    #[test]
    fn water_is_shown_again_after_failed_reflection_pass() {
        let mut backend = RecordingBackend::default();
        backend.fail_offscreen_passes = true;
        {
            let mut controller = controller(&mut backend);
            controller.initialize(Viewport::default()).unwrap();
            assert!(matches!(controller.tick(0.0, 0.016), Err(SceneError::Backend(_))));

            controller.backend_mut().fail_offscreen_passes = false;
            controller.tick(0.016, 0.016).unwrap();
        }
        let visible: Vec<bool> = backend.passes.iter().map(|pass| pass.water_visible).collect();
        assert_eq!(visible, vec![false, true]);
    }

    #[test]
    fn time_accumulates_frame_deltas() {
        let mut backend = RecordingBackend::default();
        {
            let mut controller = controller(&mut backend);
            controller.initialize(Viewport::default()).unwrap();
            controller.tick(10.0, 0.5).unwrap();
            controller.tick(10.5, 0.25).unwrap();
        }
        let times: Vec<Option<f32>> = backend.passes.iter().map(|pass| pass.time).collect();
        assert_eq!(times, vec![Some(0.5), Some(0.5), Some(0.75), Some(0.75)]);
    }

    #[test]
    fn normal_map_scroll_follows_time() {
        let mut scene = ReflectiveWater::new(WaterConfig::default());
        let mut camera = CameraRig::from_spec(&scene.camera_spec(), Viewport::default());
        for _ in 0..4 {
            scene.update(&FrameInput::still(0.0, 0.5, Viewport::default()), &mut camera);
        }
        assert_eq!(scene.uniforms().vec2("ripple_offset"), Some(Vec2::splat(0.1)));
    }

    #[test]
    fn normal_map_lands_in_uniforms() {
        let mut scene = ReflectiveWater::new(WaterConfig::default());
        scene.normal_request = Some(RequestId(3));

        scene.texture_ready(RequestId(4), Some(TextureId(1)));
        assert_eq!(scene.uniforms().texture("normal_map"), None);

        scene.texture_ready(RequestId(3), Some(TextureId(9)));
        assert_eq!(scene.uniforms().texture("normal_map"), Some(TextureId(9)));
    }

    #[test]
    fn reflection_target_is_bound_and_sized() {
        let mut backend = RecordingBackend::default();
        let mut controller = controller(&mut backend);
        controller.initialize(Viewport::new(1000, 800)).unwrap();
        controller.tick(0.0, 0.016).unwrap();
        let PassTarget::Offscreen(target) = controller.backend().passes[0].target else {
            panic!("reflection pass must go offscreen");
        };
        assert_eq!(controller.backend().target_size(target), Some(Viewport::new(500, 400)));
        assert_eq!(controller.ledger().target(target).map(|t| t.size()), Some(Viewport::new(500, 400)));
    }

    #[test]
    fn steep_view_reflects_less_than_grazing_view() {
        let steep = fresnel(Vec3::Y, Vec3::Y, WATER_F0);
        let grazing = fresnel(Vec3::new(1.0, 0.05, 0.0), Vec3::Y, WATER_F0);
        assert!(steep < grazing);
    }
}
