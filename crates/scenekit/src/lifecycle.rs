use crate::backend::{
    DrawPass, InputKind, ListenerId, PassTarget, RenderBackend, RequestId, SurfaceId, TargetId,
    TextureId,
};
use crate::camera::{CameraRig, CameraSpec};
use crate::entity::EntityBuffer;
use crate::error::SceneError;
use crate::input::InputState;
use crate::render_target::{RenderTarget, Viewport};
use glam::{Vec2, Vec3};
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SceneState {
    #[default]
    Unmounted,
    Initializing,
    Running,
    TearingDown,
}

/// Everything a scene may read during its update step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub elapsed: f32,
    pub delta: f32,
    pub pointer_ndc: Option<Vec2>,
    pub pointer_uv: Option<Vec2>,
    pub scroll_progress: f32,
    pub viewport: Viewport,
}

impl FrameInput {
    /// Frame with no pointer and no scroll, mostly for tests
    pub fn still(elapsed: f32, delta: f32, viewport: Viewport) -> Self {
        Self {
            elapsed,
            delta,
            pointer_ndc: None,
            pointer_uv: None,
            scroll_progress: 0.0,
            viewport,
        }
    }

    pub fn pointer_on_z_plane(&self, camera: &CameraRig, depth: f32) -> Option<Vec3> {
        self.pointer_ndc
            .and_then(|ndc| camera.pointer_on_z_plane(ndc, depth))
    }
}

/// Handles owned on behalf of one mounted scene
#[derive(Debug, Default)]
pub struct ResourceLedger {
    surface: Option<SurfaceId>,
    listeners: Vec<(ListenerId, InputKind)>,
    targets: Vec<RenderTarget>,
    requests: Vec<RequestId>,
    textures: Vec<TextureId>,
}

impl ResourceLedger {
    pub fn is_empty(&self) -> bool {
        self.surface.is_none()
            && self.listeners.is_empty()
            && self.targets.is_empty()
            && self.requests.is_empty()
            && self.textures.is_empty()
    }

    pub fn listens_to(&self, kind: InputKind) -> bool {
        self.listeners.iter().any(|(_, registered)| *registered == kind)
    }

    pub fn target(&self, id: TargetId) -> Option<&RenderTarget> {
        self.targets.iter().find(|target| target.id == id)
    }

    fn release_all(&mut self, backend: &mut dyn RenderBackend) {
        for (listener, _) in self.listeners.drain(..) {
            backend.remove_listener(listener);
        }
        for request in self.requests.drain(..) {
            backend.cancel_request(request);
        }
        for texture in self.textures.drain(..) {
            backend.release_texture(texture);
        }
        for target in self.targets.drain(..) {
            backend.release_render_target(target.id);
        }
        if let Some(surface) = self.surface.take() {
            backend.release_surface(surface);
        }
    }
}

/// Backend access handed to a scene. Anything created through it is
/// recorded in the controller's ledger.
pub struct SceneContext<'a> {
    backend: &'a mut dyn RenderBackend,
    ledger: &'a mut ResourceLedger,
    surface: SurfaceId,
    viewport: Viewport,
}

impl SceneContext<'_> {
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Offscreen target sized `scale` times the viewport, kept in lockstep
    /// with it by the controller
    pub fn create_render_target(&mut self, scale: f32) -> Result<TargetId, SceneError> {
        let size = self.viewport.scaled(scale);
        let id = self.backend.create_render_target(size)?;
        self.ledger.targets.push(RenderTarget::new(id, self.viewport, scale));
        Ok(id)
    }

    pub fn render_target(&self, id: TargetId) -> Option<&RenderTarget> {
        self.ledger.target(id)
    }

    pub fn request_texture(&mut self, path: &str) -> RequestId {
        let request = self.backend.request_texture(path);
        self.ledger.requests.push(request);
        request
    }

    /// Send the instance buffer to the backend if it changed.
    /// Returns whether an upload happened.
    pub fn upload(&mut self, buffer: &mut EntityBuffer) -> Result<bool, SceneError> {
        match buffer.take_upload() {
            Some(raw) => {
                self.backend.upload_instances(self.surface, raw)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn submit(&mut self, pass: &DrawPass<'_>) -> Result<(), SceneError> {
        if let PassTarget::Offscreen(target) = pass.target {
            if self.ledger.target(target).is_none() {
                return Err(SceneError::UnknownTarget(target.0));
            }
        }
        self.backend.submit(pass)
    }

    /// The main pass onto the scene's own surface
    pub fn surface_pass<'c>(&self, camera: &'c CameraRig) -> DrawPass<'c> {
        DrawPass::new(PassTarget::Surface(self.surface), camera)
    }
}

/// One concrete animated background.
///
/// Implementations keep all their state inside `self`; nothing lives at
/// module scope, so several instances can be mounted at once.
pub trait SceneVariant: Send + Sync {
    fn name(&self) -> &'static str;

    fn camera_spec(&self) -> CameraSpec;

    fn listeners(&self) -> &'static [InputKind] {
        &[InputKind::PointerMove, InputKind::Resize]
    }

    /// Populate entities and create GPU resources
    fn initialize(&mut self, ctx: &mut SceneContext<'_>, camera: &mut CameraRig) -> Result<(), SceneError>;

    /// Entity update step, never touches the backend
    fn update(&mut self, input: &FrameInput, camera: &mut CameraRig);

    fn render(&mut self, ctx: &mut SceneContext<'_>, camera: &CameraRig) -> Result<(), SceneError>;

    fn resized(&mut self, _viewport: Viewport) {}

    /// A requested texture finished loading (`None` if it failed)
    fn texture_ready(&mut self, _request: RequestId, _texture: Option<TextureId>) {}

    /// Drop per-instance state. Backend handles are released by the controller.
    fn teardown(&mut self) {}

    fn entity_count(&self) -> usize;
}

/// Owns one mounted scene, its backend handles and its input state.
///
/// Dropping the controller tears the scene down, so resources are released
/// on every unmount path.
pub struct SceneController<B: RenderBackend> {
    scene: Box<dyn SceneVariant>,
    backend: B,
    state: SceneState,
    ledger: ResourceLedger,
    camera: Option<CameraRig>,
    input: InputState,
}

impl<B: RenderBackend> SceneController<B> {
    pub fn new(scene: Box<dyn SceneVariant>, backend: B) -> Self {
        Self {
            scene,
            backend,
            state: SceneState::Unmounted,
            ledger: ResourceLedger::default(),
            camera: None,
            input: InputState::default(),
        }
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn name(&self) -> &'static str {
        self.scene.name()
    }

    pub fn entity_count(&self) -> usize {
        self.scene.entity_count()
    }

    pub fn camera(&self) -> Option<&CameraRig> {
        self.camera.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn initialize(&mut self, viewport: Viewport) -> Result<(), SceneError> {
        if self.state != SceneState::Unmounted {
            return Err(SceneError::InvalidTransition {
                from: self.state,
                to: SceneState::Initializing,
            });
        }
        self.state = SceneState::Initializing;
        self.input = InputState {
            viewport,
            ..InputState::default()
        };

        match self.mount(viewport) {
            Ok(()) => {
                self.state = SceneState::Running;
                info!("Scene '{}' running ({} entities)", self.scene.name(), self.scene.entity_count());
                Ok(())
            }
            Err(err) => {
                warn!("Scene '{}' failed to initialize: {err}", self.scene.name());
                self.teardown();
                Err(err)
            }
        }
    }

    fn mount(&mut self, viewport: Viewport) -> Result<(), SceneError> {
        let surface = self.backend.create_surface(viewport)?;
        self.ledger.surface = Some(surface);

        for kind in self.scene.listeners() {
            let listener = self.backend.add_listener(*kind);
            self.ledger.listeners.push((listener, *kind));
        }

        let mut camera = CameraRig::from_spec(&self.scene.camera_spec(), viewport);
        let mut ctx = SceneContext {
            backend: &mut self.backend,
            ledger: &mut self.ledger,
            surface,
            viewport,
        };
        self.scene.initialize(&mut ctx, &mut camera)?;
        self.camera = Some(camera);
        Ok(())
    }

    /// Advance the scene by one frame: entity update, then render
    pub fn tick(&mut self, elapsed: f32, delta: f32) -> Result<(), SceneError> {
        if self.state != SceneState::Running {
            return Err(SceneError::NotRunning(self.state));
        }
        let (Some(camera), Some(surface)) = (self.camera.as_mut(), self.ledger.surface) else {
            return Err(SceneError::NotRunning(self.state));
        };

        let frame = FrameInput {
            elapsed,
            delta,
            pointer_ndc: self.input.pointer_ndc(),
            pointer_uv: self.input.pointer_uv(),
            scroll_progress: self.input.scroll_progress(),
            viewport: self.input.viewport,
        };
        self.scene.update(&frame, camera);

        let mut ctx = SceneContext {
            backend: &mut self.backend,
            ledger: &mut self.ledger,
            surface,
            viewport: self.input.viewport,
        };
        self.scene.render(&mut ctx, camera)
    }

    /// Release everything the scene owns. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.state == SceneState::Unmounted && self.ledger.is_empty() {
            return;
        }
        self.state = SceneState::TearingDown;
        self.scene.teardown();
        self.ledger.release_all(&mut self.backend);
        self.camera = None;
        self.state = SceneState::Unmounted;
        info!("Scene '{}' torn down", self.scene.name());
    }

    /// Record a pointer move in client pixels. Returns false if the scene
    /// does not listen to pointer input.
    pub fn pointer_moved(&mut self, client: Vec2) -> bool {
        if !self.accepts(InputKind::PointerMove) {
            return false;
        }
        self.input.pointer_client = Some(client);
        true
    }

    pub fn scrolled(&mut self, offset: f32, max_scroll: f32) -> bool {
        if !self.accepts(InputKind::Scroll) {
            return false;
        }
        self.input.scroll_offset = offset;
        self.input.max_scroll = max_scroll;
        true
    }

    /// Track a viewport change: camera aspect and every render target follow
    pub fn resized(&mut self, viewport: Viewport) -> Result<bool, SceneError> {
        if !self.accepts(InputKind::Resize) {
            return Ok(false);
        }
        self.input.viewport = viewport;
        if let Some(camera) = self.camera.as_mut() {
            camera.set_aspect(viewport);
        }
        for target in self.ledger.targets.iter_mut() {
            if let Some(size) = target.fit(viewport) {
                self.backend.resize_render_target(target.id, size)?;
            }
        }
        self.scene.resized(viewport);
        Ok(true)
    }

    /// Deliver the outcome of a texture request. Completions for requests
    /// this scene no longer owns are dropped and reported as `Ok(false)`.
    pub fn asset_loaded(
        &mut self,
        request: RequestId,
        result: Result<TextureId, SceneError>,
    ) -> Result<bool, SceneError> {
        let Some(index) = self.ledger.requests.iter().position(|r| *r == request) else {
            debug!("Ignoring texture {request:?} for scene '{}', no longer requested", self.scene.name());
            if let Ok(texture) = result {
                self.backend.release_texture(texture);
            }
            return Ok(false);
        };
        self.ledger.requests.swap_remove(index);

        match result {
            Ok(texture) => {
                self.ledger.textures.push(texture);
                self.scene.texture_ready(request, Some(texture));
            }
            Err(err) => {
                warn!("Scene '{}' continues without texture: {err}", self.scene.name());
                self.scene.texture_ready(request, None);
            }
        }
        Ok(true)
    }

    fn accepts(&self, kind: InputKind) -> bool {
        self.state == SceneState::Running && self.ledger.listens_to(kind)
    }
}

impl<B: RenderBackend> Drop for SceneController<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::config::SceneKitConfig;
    use crate::scenes::SceneKind;
    use rstest::rstest;

    fn controller(kind: SceneKind, backend: &mut RecordingBackend) -> SceneController<&mut RecordingBackend> {
        let config = SceneKitConfig::default();
        SceneController::new(kind.build_seeded(&config, 7), backend)
    }

    #[rstest]
    #[case(SceneKind::Particles)]
    #[case(SceneKind::StarField)]
    #[case(SceneKind::Metaballs)]
    #[case(SceneKind::Cubes)]
    #[case(SceneKind::Fish)]
    #[case(SceneKind::Bubbles)]
    #[case(SceneKind::Water)]
    #[case(SceneKind::Ocean)]
    fn mount_then_unmount_leaves_nothing_behind(#[case] kind: SceneKind) {
        let mut backend = RecordingBackend::default();
        {
            let mut controller = controller(kind, &mut backend);
            controller.initialize(Viewport::new(800, 600)).unwrap();
            assert_eq!(controller.state(), SceneState::Running);
            controller.teardown();
            assert_eq!(controller.state(), SceneState::Unmounted);
            assert!(controller.ledger().is_empty());
        }
        assert_eq!(backend.live_listeners(), 0);
        assert_eq!(backend.live_gpu_handles(), 0);
        assert_eq!(backend.pending_requests(), 0);
    }

    #[rstest]
    #[case(SceneKind::Particles)]
    #[case(SceneKind::Water)]
    #[case(SceneKind::Ocean)]
    fn dropping_a_running_scene_releases_it(#[case] kind: SceneKind) {
        let mut backend = RecordingBackend::default();
        {
            let mut controller = controller(kind, &mut backend);
            controller.initialize(Viewport::new(800, 600)).unwrap();
            controller.tick(0.016, 0.016).unwrap();
        }
        assert_eq!(backend.live_listeners(), 0);
        assert_eq!(backend.live_gpu_handles(), 0);
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut backend = RecordingBackend::default();
        let mut controller = controller(SceneKind::Particles, &mut backend);
        controller.teardown();
        controller.initialize(Viewport::default()).unwrap();
        controller.teardown();
        controller.teardown();
        assert_eq!(controller.state(), SceneState::Unmounted);
    }

    #[test]
    fn failed_initialization_releases_partial_resources() {
        let mut backend = RecordingBackend::default();
        backend.fail_render_targets = true;
        {
            let mut controller = controller(SceneKind::Water, &mut backend);
            let err = controller.initialize(Viewport::default()).unwrap_err();
            assert!(matches!(err, SceneError::Backend(_)));
            assert_eq!(controller.state(), SceneState::Unmounted);
        }
        assert_eq!(backend.live_listeners(), 0);
        assert_eq!(backend.live_gpu_handles(), 0);
        assert_eq!(backend.pending_requests(), 0);
    }

    #[test]
    fn double_initialize_is_rejected() {
        let mut backend = RecordingBackend::default();
        let mut controller = controller(SceneKind::Cubes, &mut backend);
        controller.initialize(Viewport::default()).unwrap();
        let err = controller.initialize(Viewport::default()).unwrap_err();
        assert_eq!(
            err,
            SceneError::InvalidTransition { from: SceneState::Running, to: SceneState::Initializing }
        );
        controller.teardown();
        drop(controller);
        assert_eq!(backend.live_listeners(), 0);
    }

    #[test]
    fn tick_requires_running_scene() {
        let mut backend = RecordingBackend::default();
        let mut controller = controller(SceneKind::StarField, &mut backend);
        assert_eq!(
            controller.tick(0.0, 0.016),
            Err(SceneError::NotRunning(SceneState::Unmounted))
        );
    }

    #[test]
    fn input_is_ignored_without_listener() {
        let mut backend = RecordingBackend::default();
        let mut controller = controller(SceneKind::Cubes, &mut backend);
        assert!(!controller.pointer_moved(Vec2::new(10.0, 10.0)));

        controller.initialize(Viewport::default()).unwrap();
        assert!(!controller.pointer_moved(Vec2::new(10.0, 10.0)));
        assert!(!controller.scrolled(100.0, 1000.0));
        assert_eq!(controller.resized(Viewport::new(640, 480)), Ok(true));
    }

    #[test]
    fn render_targets_follow_the_viewport() {
        let mut backend = RecordingBackend::default();
        let mut controller = controller(SceneKind::Water, &mut backend);
        controller.initialize(Viewport::new(1024, 768)).unwrap();

        controller.resized(Viewport::new(1920, 1080)).unwrap();
        let targets: Vec<RenderTarget> = controller.ledger().targets.clone();
        assert!(!targets.is_empty());
        for target in &targets {
            assert_eq!(target.size(), Viewport::new(1920, 1080).scaled(target.scale));
            assert_eq!(controller.backend().target_size(target.id), Some(target.size()));
        }
        assert_eq!(controller.camera().map(|c| c.aspect), Some(1920.0 / 1080.0));
    }

    #[test]
    fn late_texture_is_ignored_after_teardown() {
        let mut backend = RecordingBackend::default();
        let mut controller = controller(SceneKind::Water, &mut backend);
        controller.initialize(Viewport::default()).unwrap();
        let request = controller.ledger().requests[0];
        controller.teardown();

        // The host finished the load anyway
        let texture = TextureId(999);
        assert_eq!(controller.asset_loaded(request, Ok(texture)), Ok(false));
        assert!(controller.ledger().is_empty());
    }

    #[test]
    fn texture_failure_is_tolerated() {
        let mut backend = RecordingBackend::default();
        let mut controller = controller(SceneKind::Water, &mut backend);
        controller.initialize(Viewport::default()).unwrap();
        let request = controller.ledger().requests[0];

        let failure = Err(SceneError::AssetLoad { path: "missing.png".into(), reason: "not found".into() });
        assert_eq!(controller.asset_loaded(request, failure), Ok(true));
        controller.tick(0.0, 0.016).unwrap();
        controller.tick(0.016, 0.016).unwrap();
    }

    #[test]
    fn loaded_texture_is_released_on_teardown() {
        let mut backend = RecordingBackend::default();
        {
            let mut controller = controller(SceneKind::Water, &mut backend);
            controller.initialize(Viewport::default()).unwrap();
            let request = controller.ledger().requests[0];
            let texture = controller.backend_mut().complete_request(request).unwrap();
            assert_eq!(controller.asset_loaded(request, Ok(texture)), Ok(true));
            controller.tick(0.0, 0.016).unwrap();
        }
        assert_eq!(backend.live_gpu_handles(), 0);
    }
}
