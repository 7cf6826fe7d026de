use bevy::prelude::*;
use scenekit::backend::TargetId;

/// Camera that renders the scene's main pass
#[derive(Component)]
pub struct MainCamera;

/// Camera rendering into one of the scene's offscreen targets
#[derive(Component)]
pub struct OffscreenCamera(pub TargetId);

#[derive(Component)]
pub struct SceneLight;

/// Anything spawned for the mounted scene, despawned when it changes
#[derive(Component)]
pub struct SceneProp;

/// Entity mirroring the `n`th instance of the scene's upload
#[derive(Component)]
pub struct InstanceSlot {
    pub index: usize,
    pub material: Handle<StandardMaterial>,
}

#[derive(Component)]
pub struct WaterSurface;

#[derive(Component)]
pub struct OceanSurface;

/// Sea floor under the ocean surface
#[derive(Component)]
pub struct OceanGround;

#[derive(Component)]
pub struct MetaballQuad;
