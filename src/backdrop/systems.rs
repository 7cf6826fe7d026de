use crate::backdrop::backend::CommandQueue;
use crate::backdrop::components::{MainCamera, SceneLight, SceneProp};
use crate::backdrop::render::{SceneAssets, despawn_props, spawn_props};
use crate::backdrop::resources::*;
use bevy::asset::LoadState;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::{CursorMoved, PrimaryWindow, WindowResized};
use scenekit::SceneError;
use scenekit::lifecycle::SceneState;
use scenekit::render_target::Viewport;
use scenekit::scenes::SceneKind;

/// Base illuminance, scaled by the scene's light intensity
pub const LIGHT_ILLUMINANCE: f32 = 8000.0;

const SCENE_KEYS: [(KeyCode, SceneKind); 8] = [
    (KeyCode::Digit1, SceneKind::Particles),
    (KeyCode::Digit2, SceneKind::StarField),
    (KeyCode::Digit3, SceneKind::Metaballs),
    (KeyCode::Digit4, SceneKind::Cubes),
    (KeyCode::Digit5, SceneKind::Fish),
    (KeyCode::Digit6, SceneKind::Bubbles),
    (KeyCode::Digit7, SceneKind::Water),
    (KeyCode::Digit8, SceneKind::Ocean),
];

/// Where the key light sits until a scene moves it
pub fn default_light_transform() -> Transform {
    Transform::from_xyz(5.0, 10.0, 7.5).looking_at(Vec3::ZERO, Vec3::Y)
}

pub fn window_viewport(window: &Window) -> Viewport {
    Viewport::new(window.width() as u32, window.height() as u32)
}

pub fn setup_backdrop(
    mut commands: Commands,
    queue: Res<CommandQueue>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut assets: SceneAssets,
) {
    commands.spawn((Camera3d::default(), Transform::from_xyz(0.0, 0.0, 10.0), MainCamera));
    commands.spawn((
        DirectionalLight {
            illuminance: LIGHT_ILLUMINANCE,
            ..default()
        },
        default_light_transform(),
        SceneLight,
    ));

    let config = scenekit::get_config();
    let viewport = windows.single().map(window_viewport).unwrap_or_default();
    let kind = config.startup.scene;
    spawn_props(&mut commands, &mut assets, kind, &config);
    commands.insert_resource(ActiveScene::mount(kind, &config, &queue, viewport));
    info!("Backdrop started with '{}'", kind.label());
}

pub fn select_scene_with_keys(keyboard_input: Res<ButtonInput<KeyCode>>, mut switches: MessageWriter<SwitchScene>) {
    for (key, kind) in SCENE_KEYS {
        if keyboard_input.just_pressed(key) {
            switches.write(SwitchScene(kind));
        }
    }
}

pub fn switch_scene(
    mut commands: Commands,
    mut switches: MessageReader<SwitchScene>,
    mut reloads: MessageReader<ReloadConfig>,
    mut active: ResMut<ActiveScene>,
    queue: Res<CommandQueue>,
    windows: Query<&Window, With<PrimaryWindow>>,
    props: Query<Entity, With<SceneProp>>,
    mut lights: Query<(&mut DirectionalLight, &mut Transform), With<SceneLight>>,
    mut assets: SceneAssets,
    mut scroll: ResMut<PageScroll>,
) {
    let mut next = switches.read().last().map(|switch| switch.0);
    if reloads.read().count() > 0 {
        if let Err(err) = scenekit::reload_config() {
            warn!("Keeping previous config: {err}");
        }
        next.get_or_insert(active.kind);
    }
    let Some(kind) = next else {
        return;
    };

    // The old controller releases its handles into the shared queue
    active.controller.teardown();
    despawn_props(&mut commands, &props);
    for (mut light, mut transform) in lights.iter_mut() {
        light.color = Color::WHITE;
        *transform = default_light_transform();
    }

    let config = scenekit::get_config();
    let viewport = windows.single().map(window_viewport).unwrap_or_default();
    spawn_props(&mut commands, &mut assets, kind, &config);
    *active = ActiveScene::mount(kind, &config, &queue, viewport);
    *scroll = PageScroll::default();
    info!("Switched to '{}'", kind.label());
}

pub fn forward_input(
    mut cursor: MessageReader<CursorMoved>,
    mut wheel: MessageReader<MouseWheel>,
    mut resized: MessageReader<WindowResized>,
    mut scroll: ResMut<PageScroll>,
    mut active: ResMut<ActiveScene>,
) {
    let controller = &mut active.controller;
    if let Some(moved) = cursor.read().last() {
        controller.pointer_moved(moved.position);
    }

    let mut lines = 0.0;
    for event in wheel.read() {
        lines += match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / SCROLL_LINE,
        };
    }
    if lines != 0.0 {
        scroll.scroll_lines(lines);
        controller.scrolled(scroll.offset, scroll.max);
    }

    if let Some(size) = resized.read().last() {
        let viewport = Viewport::new(size.width as u32, size.height as u32);
        if let Err(err) = controller.resized(viewport) {
            warn!("Resize failed: {err}");
        }
    }
}

/// Report finished texture loads back to the scene that asked for them
pub fn poll_textures(
    asset_server: Res<AssetServer>,
    mut registry: ResMut<HostRegistry>,
    mut active: ResMut<ActiveScene>,
) {
    let finished: Vec<_> = registry
        .requests
        .iter()
        .filter_map(|(request, (path, handle))| match asset_server.load_state(handle) {
            LoadState::Loaded => Some((*request, Ok(handle.clone()))),
            LoadState::Failed(err) => Some((
                *request,
                Err(SceneError::AssetLoad {
                    path: path.clone(),
                    reason: err.to_string(),
                }),
            )),
            _ => None,
        })
        .collect();

    for (request, outcome) in finished {
        registry.requests.remove(&request);
        let controller = &mut active.controller;
        let result = outcome.map(|handle| {
            let texture = controller.backend_mut().texture_loaded();
            registry.textures.insert(texture, handle);
            texture
        });
        if let Err(err) = controller.asset_loaded(request, result) {
            warn!("Texture delivery failed: {err}");
        }
    }
}

pub fn tick_scene(time: Res<Time>, mut active: ResMut<ActiveScene>) {
    let controller = &mut active.controller;
    if controller.state() != SceneState::Running {
        return;
    }
    if let Err(err) = controller.tick(time.elapsed_secs(), time.delta_secs()) {
        warn!("Scene '{}' frame failed: {err}", controller.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-1.0, 40.0)]
    #[case(-100.0, 2000.0)]
    #[case(1.0, 0.0)]
    fn wheel_moves_the_page_within_bounds(#[case] lines: f32, #[case] expected: f32) {
        let mut scroll = PageScroll::default();
        scroll.scroll_lines(lines);
        assert_eq!(scroll.offset, expected);
    }

    #[test]
    fn every_scene_has_a_key() {
        for kind in SceneKind::ALL {
            assert!(SCENE_KEYS.iter().any(|(_, keyed)| *keyed == kind));
        }
    }
}
