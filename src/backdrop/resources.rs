use crate::backdrop::backend::{CommandQueue, HostBackend};
use bevy::prelude::*;
use scenekit::backend::{RequestId, TargetId, TextureId};
use scenekit::config::SceneKitConfig;
use scenekit::lifecycle::SceneController;
use scenekit::render_target::Viewport;
use scenekit::scenes::SceneKind;
use std::collections::HashMap;

/// Scroll distance per wheel line, in logical pixels
pub const SCROLL_LINE: f32 = 40.0;

/// The mounted scene and its controller
#[derive(Resource)]
pub struct ActiveScene {
    pub kind: SceneKind,
    pub controller: SceneController<HostBackend>,
}

impl ActiveScene {
    /// Build and mount a scene. A scene that fails to mount stays unmounted
    /// and is reported by the overlay.
    pub fn mount(kind: SceneKind, config: &SceneKitConfig, queue: &CommandQueue, viewport: Viewport) -> Self {
        let mut controller = SceneController::new(kind.build(config), HostBackend::new(queue.clone()));
        if let Err(err) = controller.initialize(viewport) {
            warn!("Scene '{}' could not start: {err}", kind.label());
        }
        Self { kind, controller }
    }
}

/// GPU assets behind the ids handed to the scene
#[derive(Resource, Default)]
pub struct HostRegistry {
    pub targets: HashMap<TargetId, Handle<Image>>,
    /// Path and handle of each texture still loading
    pub requests: HashMap<RequestId, (String, Handle<Image>)>,
    pub textures: HashMap<TextureId, Handle<Image>>,
}

/// Simulated page scroll driven by the mouse wheel
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct PageScroll {
    pub offset: f32,
    pub max: f32,
}

impl Default for PageScroll {
    fn default() -> Self {
        Self {
            offset: 0.0,
            max: 2000.0,
        }
    }
}

impl PageScroll {
    /// Wheel lines up are positive, like a browser page
    pub fn scroll_lines(&mut self, lines: f32) {
        self.offset = (self.offset - lines * SCROLL_LINE).clamp(0.0, self.max);
    }
}

/// Request to replace the mounted scene
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchScene(pub SceneKind);

/// Request to reread the config file and remount the current scene
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadConfig;
