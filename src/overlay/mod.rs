mod systems;

use bevy::prelude::*;
use bevy_egui::{EguiPlugin, EguiPrimaryContextPass};
use systems::*;

/// Small egui window for switching scenes and watching the mounted one
pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .init_resource::<OverlayVisible>()
            .add_systems(Update, toggle_overlay)
            .add_systems(EguiPrimaryContextPass, render_overlay);
    }
}
