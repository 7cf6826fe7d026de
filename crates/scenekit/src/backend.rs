use crate::camera::CameraRig;
use crate::color::Rgb;
use crate::entity::InstanceRaw;
use crate::error::SceneError;
use crate::fog::FogState;
use crate::render_target::Viewport;
use crate::uniforms::UniformSet;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u32);

/// Input a scene can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    PointerMove,
    Scroll,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassTarget {
    Surface(SurfaceId),
    Offscreen(TargetId),
}

/// Clear color and optional fog for a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub background: Rgb,
    pub fog: Option<FogState>,
    pub light_intensity: f32,
}

impl Environment {
    pub fn clear(background: Rgb) -> Self {
        Self {
            background,
            fog: None,
            light_intensity: 1.0,
        }
    }
}

/// One draw of the scene's content into a surface or offscreen target
#[derive(Debug, Clone, Copy)]
pub struct DrawPass<'a> {
    pub target: PassTarget,
    pub camera: &'a CameraRig,
    pub uniforms: Option<&'a UniformSet>,
    pub environment: Option<Environment>,
    /// Whether the water mesh takes part in this pass
    pub water_visible: bool,
}

impl<'a> DrawPass<'a> {
    pub fn new(target: PassTarget, camera: &'a CameraRig) -> Self {
        Self {
            target,
            camera,
            uniforms: None,
            environment: None,
            water_visible: true,
        }
    }

    pub fn with_uniforms(mut self, uniforms: &'a UniformSet) -> Self {
        self.uniforms = Some(uniforms);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_water_visible(mut self, visible: bool) -> Self {
        self.water_visible = visible;
        self
    }
}

/// Graphics and windowing services a scene needs from its host.
///
/// Every handle returned here is recorded by the
/// [`SceneController`](crate::lifecycle::SceneController) that asked for it
/// and released on teardown, so implementations never have to guess when
/// a scene is gone.
pub trait RenderBackend {
    fn create_surface(&mut self, viewport: Viewport) -> Result<SurfaceId, SceneError>;
    fn release_surface(&mut self, surface: SurfaceId);

    fn add_listener(&mut self, kind: InputKind) -> ListenerId;
    fn remove_listener(&mut self, listener: ListenerId);

    fn create_render_target(&mut self, size: Viewport) -> Result<TargetId, SceneError>;
    fn resize_render_target(&mut self, target: TargetId, size: Viewport) -> Result<(), SceneError>;
    fn release_render_target(&mut self, target: TargetId);

    /// Start an asynchronous texture load. The result comes back through
    /// [`SceneController::asset_loaded`](crate::lifecycle::SceneController::asset_loaded).
    fn request_texture(&mut self, path: &str) -> RequestId;
    fn cancel_request(&mut self, request: RequestId);
    fn release_texture(&mut self, texture: TextureId);

    fn upload_instances(&mut self, surface: SurfaceId, instances: &[InstanceRaw]) -> Result<(), SceneError>;
    fn submit(&mut self, pass: &DrawPass<'_>) -> Result<(), SceneError>;
}

impl<B: RenderBackend + ?Sized> RenderBackend for &mut B {
    fn create_surface(&mut self, viewport: Viewport) -> Result<SurfaceId, SceneError> {
        (**self).create_surface(viewport)
    }
    fn release_surface(&mut self, surface: SurfaceId) {
        (**self).release_surface(surface)
    }
    fn add_listener(&mut self, kind: InputKind) -> ListenerId {
        (**self).add_listener(kind)
    }
    fn remove_listener(&mut self, listener: ListenerId) {
        (**self).remove_listener(listener)
    }
    fn create_render_target(&mut self, size: Viewport) -> Result<TargetId, SceneError> {
        (**self).create_render_target(size)
    }
    fn resize_render_target(&mut self, target: TargetId, size: Viewport) -> Result<(), SceneError> {
        (**self).resize_render_target(target, size)
    }
    fn release_render_target(&mut self, target: TargetId) {
        (**self).release_render_target(target)
    }
    fn request_texture(&mut self, path: &str) -> RequestId {
        (**self).request_texture(path)
    }
    fn cancel_request(&mut self, request: RequestId) {
        (**self).cancel_request(request)
    }
    fn release_texture(&mut self, texture: TextureId) {
        (**self).release_texture(texture)
    }
    fn upload_instances(&mut self, surface: SurfaceId, instances: &[InstanceRaw]) -> Result<(), SceneError> {
        (**self).upload_instances(surface, instances)
    }
    fn submit(&mut self, pass: &DrawPass<'_>) -> Result<(), SceneError> {
        (**self).submit(pass)
    }
}

/// What a [`RecordingBackend`] saw for one submitted pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    pub target: PassTarget,
    pub water_visible: bool,
    pub environment: Option<Environment>,
    pub camera: CameraRig,
    pub time: Option<f32>,
}

/// In-memory backend that tracks every live handle.
///
/// Used by tests and headless runs; the counters make leaks visible.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_id: u32,
    surfaces: HashSet<SurfaceId>,
    listeners: HashMap<ListenerId, InputKind>,
    targets: HashMap<TargetId, Viewport>,
    requests: HashMap<RequestId, String>,
    textures: HashSet<TextureId>,
    pub uploads: usize,
    pub last_upload_len: usize,
    pub passes: Vec<PassRecord>,
    /// Fail the next `create_render_target` call
    pub fail_render_targets: bool,
    /// Fail `submit` calls aimed at offscreen targets
    pub fail_offscreen_passes: bool,
}

impl RecordingBackend {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Surfaces, render targets and textures still alive
    pub fn live_gpu_handles(&self) -> usize {
        self.surfaces.len() + self.targets.len() + self.textures.len()
    }

    pub fn live_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn listens_to(&self, kind: InputKind) -> bool {
        self.listeners.values().any(|registered| *registered == kind)
    }

    pub fn target_size(&self, target: TargetId) -> Option<Viewport> {
        self.targets.get(&target).copied()
    }

    pub fn requested_path(&self, request: RequestId) -> Option<&str> {
        self.requests.get(&request).map(String::as_str)
    }

    /// Pretend the host finished loading a texture
    pub fn complete_request(&mut self, request: RequestId) -> Option<TextureId> {
        self.requests.remove(&request)?;
        let texture = TextureId(self.next());
        self.textures.insert(texture);
        Some(texture)
    }
}

impl RenderBackend for RecordingBackend {
    fn create_surface(&mut self, _viewport: Viewport) -> Result<SurfaceId, SceneError> {
        let surface = SurfaceId(self.next());
        self.surfaces.insert(surface);
        Ok(surface)
    }

    fn release_surface(&mut self, surface: SurfaceId) {
        self.surfaces.remove(&surface);
    }

    fn add_listener(&mut self, kind: InputKind) -> ListenerId {
        let listener = ListenerId(self.next());
        self.listeners.insert(listener, kind);
        listener
    }

    fn remove_listener(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }

    fn create_render_target(&mut self, size: Viewport) -> Result<TargetId, SceneError> {
        if self.fail_render_targets {
            self.fail_render_targets = false;
            return Err(SceneError::Backend("out of video memory".into()));
        }
        let target = TargetId(self.next());
        self.targets.insert(target, size);
        Ok(target)
    }

    fn resize_render_target(&mut self, target: TargetId, size: Viewport) -> Result<(), SceneError> {
        let slot = self
            .targets
            .get_mut(&target)
            .ok_or(SceneError::UnknownTarget(target.0))?;
        *slot = size;
        Ok(())
    }

    fn release_render_target(&mut self, target: TargetId) {
        self.targets.remove(&target);
    }

    fn request_texture(&mut self, path: &str) -> RequestId {
        let request = RequestId(self.next());
        self.requests.insert(request, path.to_string());
        request
    }

    fn cancel_request(&mut self, request: RequestId) {
        self.requests.remove(&request);
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn upload_instances(&mut self, _surface: SurfaceId, instances: &[InstanceRaw]) -> Result<(), SceneError> {
        self.uploads += 1;
        self.last_upload_len = instances.len();
        Ok(())
    }

    fn submit(&mut self, pass: &DrawPass<'_>) -> Result<(), SceneError> {
        if let PassTarget::Offscreen(target) = pass.target {
            if self.fail_offscreen_passes {
                return Err(SceneError::Backend("offscreen pass failed".into()));
            }
            if !self.targets.contains_key(&target) {
                return Err(SceneError::UnknownTarget(target.0));
            }
        }
        self.passes.push(PassRecord {
            target: pass.target,
            water_visible: pass.water_visible,
            environment: pass.environment,
            camera: *pass.camera,
            time: pass
                .uniforms
                .and_then(|uniforms| uniforms.float("time").or_else(|| uniforms.float("u_time"))),
        });
        Ok(())
    }
}
