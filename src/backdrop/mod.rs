pub mod backend;
pub mod components;
pub mod render;
pub mod resources;
pub mod systems;

use crate::backdrop::backend::CommandQueue;
use crate::backdrop::render::{InstanceMesh, apply_scene_commands};
use crate::backdrop::resources::*;
use crate::backdrop::systems::*;
use bevy::prelude::*;
use bevy_water::{MetaballMaterial, WaterMaterial};

/// Mounts one scenekit scene and mirrors it into the world every frame
pub struct BackdropPlugin;

impl Plugin for BackdropPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            MaterialPlugin::<WaterMaterial>::default(),
            MaterialPlugin::<MetaballMaterial>::default(),
        ))
        .add_message::<SwitchScene>()
        .add_message::<ReloadConfig>()
        .init_resource::<CommandQueue>()
        .init_resource::<HostRegistry>()
        .init_resource::<InstanceMesh>()
        .init_resource::<PageScroll>()
        .add_systems(Startup, setup_backdrop)
        .add_systems(
            Update,
            (
                select_scene_with_keys,
                switch_scene,
                forward_input,
                poll_textures,
                tick_scene,
                apply_scene_commands,
            )
                .chain(),
        );
    }
}
