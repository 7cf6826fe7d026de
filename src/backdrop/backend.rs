use bevy::log::debug;
use bevy::prelude::Resource;
use scenekit::SceneError;
use scenekit::backend::{
    DrawPass, Environment, InputKind, ListenerId, PassTarget, RenderBackend, RequestId, SurfaceId, TargetId,
    TextureId,
};
use scenekit::camera::CameraRig;
use scenekit::entity::InstanceRaw;
use scenekit::render_target::Viewport;
use scenekit::uniforms::UniformSet;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A submitted pass, owned so it can cross into the ECS
#[derive(Debug, Clone)]
pub struct PassSnapshot {
    pub target: PassTarget,
    pub camera: CameraRig,
    pub uniforms: Option<UniformSet>,
    pub environment: Option<Environment>,
    pub water_visible: bool,
}

/// Work the scene asked of the renderer, applied to the world after the tick
#[derive(Debug, Clone)]
pub enum HostCommand {
    CreateTarget { target: TargetId, size: Viewport },
    ResizeTarget { target: TargetId, size: Viewport },
    ReleaseTarget(TargetId),
    LoadTexture { request: RequestId, path: String },
    CancelRequest(RequestId),
    ReleaseTexture(TextureId),
    Instances(Vec<InstanceRaw>),
    Draw(PassSnapshot),
}

/// Queue shared by every backend the app creates. Commands from a scene
/// being dropped still land here and get applied.
#[derive(Resource, Clone, Default)]
pub struct CommandQueue(Arc<Mutex<Vec<HostCommand>>>);

impl CommandQueue {
    fn lock(&self) -> MutexGuard<'_, Vec<HostCommand>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, command: HostCommand) {
        self.lock().push(command);
    }

    pub fn drain(&self) -> Vec<HostCommand> {
        std::mem::take(&mut *self.lock())
    }
}

/// Shared by every backend, so ids stay unique across remounts
static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// [`RenderBackend`] for the Bevy app. Hands out ids immediately and defers
/// the actual work to [`CommandQueue`].
pub struct HostBackend {
    queue: CommandQueue,
    surfaces: HashSet<SurfaceId>,
    listeners: HashMap<ListenerId, InputKind>,
    targets: HashSet<TargetId>,
}

impl HostBackend {
    pub fn new(queue: CommandQueue) -> Self {
        Self {
            queue,
            surfaces: HashSet::new(),
            listeners: HashMap::new(),
            targets: HashSet::new(),
        }
    }

    fn next(&mut self) -> u32 {
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// Id for an image the host finished loading
    pub fn texture_loaded(&mut self) -> TextureId {
        TextureId(self.next())
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn live_listeners(&self) -> usize {
        self.listeners.len()
    }
}

impl RenderBackend for HostBackend {
    fn create_surface(&mut self, viewport: Viewport) -> Result<SurfaceId, SceneError> {
        let surface = SurfaceId(self.next());
        debug!("Surface {surface:?} at {}x{}", viewport.width, viewport.height);
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
        let target = TargetId(self.next());
        self.targets.insert(target);
        self.queue.push(HostCommand::CreateTarget { target, size });
        Ok(target)
    }

    fn resize_render_target(&mut self, target: TargetId, size: Viewport) -> Result<(), SceneError> {
        if !self.targets.contains(&target) {
            return Err(SceneError::UnknownTarget(target.0));
        }
        self.queue.push(HostCommand::ResizeTarget { target, size });
        Ok(())
    }

    fn release_render_target(&mut self, target: TargetId) {
        if self.targets.remove(&target) {
            self.queue.push(HostCommand::ReleaseTarget(target));
        }
    }

    fn request_texture(&mut self, path: &str) -> RequestId {
        let request = RequestId(self.next());
        self.queue.push(HostCommand::LoadTexture {
            request,
            path: path.to_string(),
        });
        request
    }

    fn cancel_request(&mut self, request: RequestId) {
        self.queue.push(HostCommand::CancelRequest(request));
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.queue.push(HostCommand::ReleaseTexture(texture));
    }

    fn upload_instances(&mut self, surface: SurfaceId, instances: &[InstanceRaw]) -> Result<(), SceneError> {
        if !self.surfaces.contains(&surface) {
            return Err(SceneError::Backend(format!("surface {} is gone", surface.0)));
        }
        self.queue.push(HostCommand::Instances(instances.to_vec()));
        Ok(())
    }

    fn submit(&mut self, pass: &DrawPass<'_>) -> Result<(), SceneError> {
        if let PassTarget::Offscreen(target) = pass.target {
            if !self.targets.contains(&target) {
                return Err(SceneError::UnknownTarget(target.0));
            }
        }
        self.queue.push(HostCommand::Draw(PassSnapshot {
            target: pass.target,
            camera: *pass.camera,
            uniforms: pass.uniforms.cloned(),
            environment: pass.environment,
            water_visible: pass.water_visible,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenekit::config::SceneKitConfig;
    use scenekit::lifecycle::SceneController;
    use scenekit::scenes::SceneKind;

    fn count(commands: &[HostCommand], matches: impl Fn(&HostCommand) -> bool) -> usize {
        commands.iter().filter(|command| matches(command)).count()
    }

    #[test]
    fn water_scene_queues_target_texture_and_two_passes() {
        let queue = CommandQueue::default();
        let scene = SceneKind::Water.build_seeded(&SceneKitConfig::default(), 1);
        let mut controller = SceneController::new(scene, HostBackend::new(queue.clone()));
        controller.initialize(Viewport::new(800, 600)).unwrap();
        controller.tick(0.016, 0.016).unwrap();

        let commands = queue.drain();
        assert_eq!(count(&commands, |c| matches!(c, HostCommand::CreateTarget { .. })), 1);
        assert_eq!(count(&commands, |c| matches!(c, HostCommand::LoadTexture { .. })), 1);
        let draws: Vec<&PassSnapshot> = commands
            .iter()
            .filter_map(|c| match c {
                HostCommand::Draw(pass) => Some(pass),
                _ => None,
            })
            .collect();
        assert_eq!(draws.len(), 2);
        assert!(!draws[0].water_visible);
        assert!(draws[1].water_visible);
    }

    #[test]
    fn dropped_controller_releases_through_the_shared_queue() {
        let queue = CommandQueue::default();
        {
            let scene = SceneKind::Water.build_seeded(&SceneKitConfig::default(), 1);
            let mut controller = SceneController::new(scene, HostBackend::new(queue.clone()));
            controller.initialize(Viewport::default()).unwrap();
            queue.drain();
        }
        let commands = queue.drain();
        assert_eq!(count(&commands, |c| matches!(c, HostCommand::ReleaseTarget(_))), 1);
        assert_eq!(count(&commands, |c| matches!(c, HostCommand::CancelRequest(_))), 1);
    }

    #[test]
    fn instances_are_queued_only_when_they_change() {
        let queue = CommandQueue::default();
        let scene = SceneKind::Particles.build_seeded(&SceneKitConfig::default(), 3);
        let mut controller = SceneController::new(scene, HostBackend::new(queue.clone()));
        controller.initialize(Viewport::default()).unwrap();
        controller.tick(0.016, 0.016).unwrap();

        let uploads = queue
            .drain()
            .into_iter()
            .filter_map(|c| match c {
                HostCommand::Instances(instances) => Some(instances.len()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(uploads, vec![100]);
    }

    #[test]
    fn remounted_scene_gets_fresh_ids() {
        let queue = CommandQueue::default();
        let mount = || {
            let scene = SceneKind::Water.build_seeded(&SceneKitConfig::default(), 1);
            let mut controller = SceneController::new(scene, HostBackend::new(queue.clone()));
            controller.initialize(Viewport::default()).unwrap();
            controller.teardown();
        };
        mount();
        mount();

        let ids: Vec<(RequestId, TargetId)> = {
            let commands = queue.drain();
            let requests = commands.iter().filter_map(|c| match c {
                HostCommand::LoadTexture { request, .. } => Some(*request),
                _ => None,
            });
            let targets = commands.iter().filter_map(|c| match c {
                HostCommand::CreateTarget { target, .. } => Some(*target),
                _ => None,
            });
            requests.zip(targets).collect()
        };
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0].0, ids[1].0);
        assert_ne!(ids[0].1, ids[1].1);
    }

    #[test]
    fn unknown_target_is_rejected() {
        let mut backend = HostBackend::new(CommandQueue::default());
        assert_eq!(
            backend.resize_render_target(TargetId(9), Viewport::default()),
            Err(SceneError::UnknownTarget(9))
        );
    }

    #[test]
    fn released_target_is_forgotten() {
        let queue = CommandQueue::default();
        let mut backend = HostBackend::new(queue.clone());
        let target = backend.create_render_target(Viewport::default()).unwrap();
        backend.release_render_target(target);
        backend.release_render_target(target);
        assert_eq!(backend.live_targets(), 0);
        let releases = queue
            .drain()
            .iter()
            .filter(|c| matches!(c, HostCommand::ReleaseTarget(_)))
            .count();
        assert_eq!(releases, 1);
    }
}
