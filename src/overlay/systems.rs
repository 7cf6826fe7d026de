use crate::backdrop::resources::{ActiveScene, PageScroll, ReloadConfig, SwitchScene};
use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use scenekit::scenes::SceneKind;

#[derive(Resource)]
pub struct OverlayVisible(pub bool);

impl Default for OverlayVisible {
    fn default() -> Self {
        Self(true)
    }
}

pub fn toggle_overlay(keyboard_input: Res<ButtonInput<KeyCode>>, mut visible: ResMut<OverlayVisible>) {
    if keyboard_input.just_pressed(KeyCode::Tab) {
        visible.0 = !visible.0;
    }
}

pub fn render_overlay(
    mut contexts: EguiContexts,
    visible: Res<OverlayVisible>,
    active: Res<ActiveScene>,
    scroll: Res<PageScroll>,
    time: Res<Time>,
    mut switches: MessageWriter<SwitchScene>,
    mut reloads: MessageWriter<ReloadConfig>,
) {
    if !visible.0 {
        return;
    }
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let controller = &active.controller;
    egui::Window::new("Tidewater")
        .default_width(220.0)
        .resizable(false)
        .show(ctx, |ui| {
            for (index, kind) in SceneKind::ALL.into_iter().enumerate() {
                let label = format!("{}  {}", index + 1, kind.label());
                if ui.selectable_label(active.kind == kind, label).clicked() && active.kind != kind {
                    switches.write(SwitchScene(kind));
                }
            }
            ui.separator();

            ui.label(format!("State: {:?}", controller.state()));
            ui.label(format!("Entities: {}", controller.entity_count()));
            ui.label(format!(
                "Offscreen targets: {}  Listeners: {}",
                controller.backend().live_targets(),
                controller.backend().live_listeners()
            ));
            if active.kind == SceneKind::Ocean {
                ui.label(format!("Scroll: {:.0} / {:.0}", scroll.offset, scroll.max));
            }
            let delta = time.delta_secs();
            if delta > 0.0 {
                ui.label(format!("FPS: {:.0}", 1.0 / delta));
            }
            ui.separator();

            if ui.button("Reload config").clicked() {
                reloads.write(ReloadConfig);
            }
            ui.small("Tab hides this window");
        });
}
