pub mod backdrop;
mod overlay;

use crate::backdrop::BackdropPlugin;
use crate::overlay::OverlayPlugin;
use bevy::app::App;
#[cfg(debug_assertions)]
use bevy::diagnostic::LogDiagnosticsPlugin;
use bevy::prelude::*;

pub struct TidewaterPlugin;

impl Plugin for TidewaterPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((BackdropPlugin, OverlayPlugin));

        #[cfg(debug_assertions)]
        {
            app.add_plugins(LogDiagnosticsPlugin::default());
        }
    }
}
