use crate::backdrop::backend::{CommandQueue, HostCommand, PassSnapshot};
use crate::backdrop::components::*;
use crate::backdrop::resources::{ActiveScene, HostRegistry};
use crate::backdrop::systems::LIGHT_ILLUMINANCE;
use bevy::camera::RenderTarget;
use bevy::camera::visibility::{NoFrustumCulling, RenderLayers};
use bevy::ecs::system::SystemParam;
use bevy::pbr::{DistanceFog, FogFalloff};
use bevy::prelude::*;
use bevy::render::render_resource::Extent3d;
use bevy_water::{
    MetaballMaterial, MetaballParams, PlaneConfig, WaterMaterial, WaterParams, WaterPlaneBuilder, grid_mesh,
    render_target_image, screen_quad,
};
use scenekit::backend::{Environment, PassTarget};
use scenekit::camera::{CameraRig, Projection as RigProjection};
use scenekit::color::Rgb;
use scenekit::config::SceneKitConfig;
use scenekit::entity::InstanceRaw;
use scenekit::scenes::SceneKind;
use scenekit::uniforms::UniformSet;
use std::f32::consts::FRAC_PI_2;

/// Layer only the main pass sees, so the reflection pass can leave the water out
pub const WATER_LAYER: usize = 1;

/// Mesh shared by every instance of the mounted scene
#[derive(Resource, Default)]
pub struct InstanceMesh(pub Option<Handle<Mesh>>);

#[derive(SystemParam)]
pub struct SceneAssets<'w> {
    pub meshes: ResMut<'w, Assets<Mesh>>,
    pub standard: ResMut<'w, Assets<StandardMaterial>>,
    pub water: ResMut<'w, Assets<WaterMaterial>>,
    pub metaballs: ResMut<'w, Assets<MetaballMaterial>>,
    pub instance_mesh: ResMut<'w, InstanceMesh>,
}

pub fn srgb(color: Rgb, alpha: f32) -> Color {
    Color::srgba(color.r, color.g, color.b, alpha)
}

/// Linear color as the custom shaders expect it
pub fn linear(color: Rgb, alpha: f32) -> Vec4 {
    let linear = Color::srgb(color.r, color.g, color.b).to_linear();
    Vec4::new(linear.red, linear.green, linear.blue, alpha)
}

fn instance_mesh(kind: SceneKind) -> Option<Mesh> {
    match kind {
        SceneKind::Particles | SceneKind::StarField | SceneKind::Bubbles => Some(Sphere::new(1.0).into()),
        SceneKind::Cubes => Some(Cuboid::new(1.0, 1.0, 1.0).into()),
        // Long axis along +X, the direction a fish heading faces
        SceneKind::Fish => Some(Mesh::from(Capsule3d::new(0.3, 1.0)).rotated_by(Quat::from_rotation_z(FRAC_PI_2))),
        SceneKind::Metaballs | SceneKind::Water | SceneKind::Ocean => None,
    }
}

/// Spawn the meshes a scene kind draws with, besides its instances
pub fn spawn_props(commands: &mut Commands, assets: &mut SceneAssets, kind: SceneKind, config: &SceneKitConfig) {
    assets.instance_mesh.0 = instance_mesh(kind).map(|mesh| assets.meshes.add(mesh));

    match kind {
        SceneKind::Water => {
            let plane = WaterPlaneBuilder::new(PlaneConfig {
                size: config.water.plane_size,
                subdivisions: config.water.subdivisions,
            })
            .build();
            commands.spawn((
                Mesh3d(assets.meshes.add(plane)),
                MeshMaterial3d(assets.water.add(WaterMaterial::default())),
                RenderLayers::layer(WATER_LAYER),
                WaterSurface,
                SceneProp,
            ));
        }
        SceneKind::Metaballs => {
            commands.spawn((
                Mesh3d(assets.meshes.add(screen_quad())),
                MeshMaterial3d(assets.metaballs.add(MetaballMaterial::default())),
                NoFrustumCulling,
                MetaballQuad,
                SceneProp,
            ));
        }
        SceneKind::Ocean => {
            let ocean = &config.ocean;
            let water = StandardMaterial {
                base_color: srgb(Rgb::from_hex(ocean.water_color), ocean.alpha),
                perceptual_roughness: 0.1,
                reflectance: 0.8,
                alpha_mode: AlphaMode::Blend,
                cull_mode: None,
                double_sided: true,
                ..default()
            };
            commands.spawn((
                Mesh3d(assets.meshes.add(Plane3d::default().mesh().size(ocean.plane_size, ocean.plane_size))),
                MeshMaterial3d(assets.standard.add(water)),
                OceanSurface,
                SceneProp,
            ));
            let ground = StandardMaterial {
                base_color: srgb(Rgb::from_hex(ocean.ground_color), 1.0),
                perceptual_roughness: 1.0,
                ..default()
            };
            commands.spawn((
                Mesh3d(assets.meshes.add(Plane3d::default().mesh().size(ocean.plane_size * 4.0, ocean.plane_size * 4.0))),
                MeshMaterial3d(assets.standard.add(ground)),
                Transform::from_xyz(0.0, ocean.ground_y, 0.0),
                OceanGround,
                SceneProp,
            ));
        }
        _ => {}
    }
}

pub fn despawn_props(commands: &mut Commands, props: &Query<Entity, With<SceneProp>>) {
    for entity in props.iter() {
        commands.entity(entity).despawn();
    }
}

pub fn rig_transform(rig: &CameraRig) -> Transform {
    Transform::from_translation(rig.eye).looking_at(rig.target, rig.up)
}

pub fn rig_projection(rig: &CameraRig) -> Projection {
    match rig.projection {
        RigProjection::Perspective { fov_y_degrees } => Projection::Perspective(PerspectiveProjection {
            fov: fov_y_degrees.to_radians(),
            aspect_ratio: rig.aspect,
            near: rig.near,
            far: rig.far,
            ..default()
        }),
        RigProjection::Orthographic { half_height } => Projection::Orthographic(OrthographicProjection {
            near: rig.near,
            far: rig.far,
            scaling_mode: bevy::camera::ScalingMode::FixedVertical {
                viewport_height: half_height * 2.0,
            },
            ..OrthographicProjection::default_3d()
        }),
    }
}

pub fn distance_fog(environment: &Environment) -> Option<DistanceFog> {
    environment.fog.map(|fog| DistanceFog {
        color: srgb(fog.color, 1.0),
        falloff: FogFalloff::Linear {
            start: fog.near,
            end: fog.far,
        },
        ..default()
    })
}

/// Water shader parameters from the scene's uniform set
pub fn water_params(uniforms: &UniformSet) -> WaterParams {
    let defaults = WaterParams::default();
    let alpha = uniforms.float("alpha").unwrap_or(1.0);
    let scroll = uniforms.vec2("ripple_offset").unwrap_or(Vec2::ZERO);
    let mut waves = defaults.waves;
    if let Some(packed) = uniforms.vec4_array("waves") {
        for (slot, value) in waves.iter_mut().zip(packed) {
            *slot = *value;
        }
    }
    WaterParams {
        water_color: uniforms.color("water_color").map_or(defaults.water_color, |c| linear(c, alpha)),
        sun_color: uniforms.color("sun_color").map_or(defaults.sun_color, |c| linear(c, 1.0)),
        sun_direction: uniforms.vec3("sun_direction").map_or(defaults.sun_direction, |d| d.extend(0.0)),
        eye: uniforms.vec3("eye").map_or(defaults.eye, |eye| eye.extend(1.0)),
        settings: Vec4::new(
            uniforms.float("time").unwrap_or(0.0),
            uniforms.float("distortion_scale").unwrap_or(defaults.settings.y),
            uniforms.float("fresnel_f0").unwrap_or(defaults.settings.z),
            uniforms.float("tint_amount").unwrap_or(defaults.settings.w),
        ),
        detail: Vec4::new(
            if uniforms.texture("normal_map").is_some() { 1.0 } else { 0.0 },
            scroll.x,
            scroll.y,
            0.0,
        ),
        waves,
    }
}

/// Ocean water, ground and key light as the scene's uniforms describe them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OceanLook {
    pub water: Color,
    pub ground: Color,
    pub ground_y: f32,
    pub light_color: Color,
    /// Points from the scene towards the light
    pub light_direction: Vec3,
}

/// `None` unless the uniform set carries the whole ocean look
pub fn ocean_look(uniforms: &UniformSet) -> Option<OceanLook> {
    Some(OceanLook {
        water: srgb(uniforms.color("water_color")?, uniforms.float("alpha").unwrap_or(1.0)),
        ground: srgb(uniforms.color("ground_color")?, 1.0),
        ground_y: uniforms.float("ground_y")?,
        light_color: srgb(uniforms.color("light_color")?, 1.0),
        light_direction: uniforms.vec3("light_direction")?,
    })
}

/// Metaball shader parameters from the scene's uniform set
pub fn metaball_params(uniforms: &UniformSet) -> MetaballParams {
    let mut params = MetaballParams::default();
    let resolution = uniforms.vec2("u_resolution").unwrap_or(Vec2::ONE);
    let time = uniforms.float("u_time").unwrap_or(0.0);
    params.frame = Vec4::new(resolution.x, resolution.y, time, 0.0);
    if let Some(mouse) = uniforms.vec2("u_mouse") {
        params.mouse = mouse.extend(0.0).extend(0.0);
    }
    for (name, slot) in [
        ("u_background_bottom", &mut params.background_bottom),
        ("u_background_top", &mut params.background_top),
        ("u_fill", &mut params.fill),
    ] {
        if let Some(color) = uniforms.color(name) {
            *slot = linear(color, 1.0);
        }
    }
    if let Some(shape) = uniforms.vec4("u_shape") {
        params.shape = shape;
    }
    let blobs = uniforms.vec4_array("u_blobs").unwrap_or(&[]);
    if params.set_blobs(blobs) < blobs.len() {
        warn_once!("Metaball count exceeds the shader limit, extra blobs are dropped");
    }
    params
}

#[derive(SystemParam)]
pub struct PassTargets<'w, 's> {
    pub clear_color: ResMut<'w, ClearColor>,
    pub main_camera: Query<
        'w,
        's,
        (Entity, &'static mut Transform, &'static mut Projection),
        (With<MainCamera>, Without<OffscreenCamera>),
    >,
    pub offscreen_cameras: Query<
        'w,
        's,
        (Entity, &'static OffscreenCamera, &'static mut Transform, &'static mut Camera),
        Without<MainCamera>,
    >,
    pub light: Query<
        'w,
        's,
        (&'static mut DirectionalLight, &'static mut Transform),
        (
            With<SceneLight>,
            Without<MainCamera>,
            Without<OffscreenCamera>,
            Without<InstanceSlot>,
            Without<OceanGround>,
        ),
    >,
    pub water: Query<'w, 's, &'static MeshMaterial3d<WaterMaterial>, With<WaterSurface>>,
    pub metaballs: Query<'w, 's, &'static MeshMaterial3d<MetaballMaterial>, With<MetaballQuad>>,
    pub ocean: Query<'w, 's, (&'static Mesh3d, &'static MeshMaterial3d<StandardMaterial>), With<OceanSurface>>,
    pub ground: Query<
        'w,
        's,
        (&'static MeshMaterial3d<StandardMaterial>, &'static mut Transform),
        (
            With<OceanGround>,
            Without<MainCamera>,
            Without<OffscreenCamera>,
            Without<InstanceSlot>,
        ),
    >,
    pub slots: Query<'w, 's, (Entity, &'static InstanceSlot, &'static mut Transform), (Without<MainCamera>, Without<OffscreenCamera>)>,
}

/// Apply everything the scene queued during the tick
pub fn apply_scene_commands(
    mut commands: Commands,
    queue: Res<CommandQueue>,
    active: Res<ActiveScene>,
    asset_server: Res<AssetServer>,
    mut registry: ResMut<HostRegistry>,
    mut images: ResMut<Assets<Image>>,
    mut assets: SceneAssets,
    mut targets: PassTargets,
) {
    for command in queue.drain() {
        match command {
            HostCommand::CreateTarget { target, size } => {
                let handle = images.add(render_target_image(size.width, size.height));
                commands.spawn((
                    Camera3d::default(),
                    Camera {
                        target: RenderTarget::Image(handle.clone().into()),
                        order: -1,
                        ..default()
                    },
                    RenderLayers::layer(0),
                    OffscreenCamera(target),
                ));
                registry.targets.insert(target, handle);
            }
            HostCommand::ResizeTarget { target, size } => {
                let image = registry.targets.get(&target).and_then(|handle| images.get_mut(handle));
                if let Some(image) = image {
                    image.resize(Extent3d {
                        width: size.width,
                        height: size.height,
                        depth_or_array_layers: 1,
                    });
                }
            }
            HostCommand::ReleaseTarget(target) => {
                if let Some(handle) = registry.targets.remove(&target) {
                    images.remove(&handle);
                }
                for (entity, camera, ..) in targets.offscreen_cameras.iter() {
                    if camera.0 == target {
                        commands.entity(entity).despawn();
                    }
                }
            }
            HostCommand::LoadTexture { request, path } => {
                let handle = asset_server.load(path.clone());
                registry.requests.insert(request, (path, handle));
            }
            HostCommand::CancelRequest(request) => {
                registry.requests.remove(&request);
            }
            HostCommand::ReleaseTexture(texture) => {
                registry.textures.remove(&texture);
            }
            HostCommand::Instances(instances) => {
                if active.kind == SceneKind::Ocean {
                    rebuild_ocean(&instances, &targets.ocean, &mut assets.meshes);
                } else {
                    sync_instances(&mut commands, &instances, &mut assets, &mut targets.slots);
                }
            }
            HostCommand::Draw(pass) => apply_pass(&mut commands, &pass, &registry, &mut assets, &mut targets),
        }
    }
}

fn rebuild_ocean(
    instances: &[InstanceRaw],
    surfaces: &Query<(&Mesh3d, &MeshMaterial3d<StandardMaterial>), With<OceanSurface>>,
    meshes: &mut Assets<Mesh>,
) {
    let side = (instances.len() as f64).sqrt().round() as usize;
    let points: Vec<Vec3> = instances
        .iter()
        .map(|instance| Vec3::from_slice(&instance.position_scale[..3]))
        .collect();
    let Some(mesh) = grid_mesh(&points, side) else {
        warn!("Ocean upload of {} vertices is not a square grid", instances.len());
        return;
    };
    for (surface, _) in surfaces.iter() {
        if let Some(slot) = meshes.get_mut(&surface.0) {
            *slot = mesh.clone();
        }
    }
}

fn instance_transform(instance: &InstanceRaw) -> Transform {
    let [x, y, z, scale] = instance.position_scale;
    Transform {
        translation: Vec3::new(x, y, z),
        rotation: Quat::from_array(instance.rotation),
        scale: Vec3::splat(scale),
    }
}

fn instance_material(instance: &InstanceRaw) -> StandardMaterial {
    let [r, g, b, a] = instance.color;
    StandardMaterial {
        base_color: Color::srgba(r, g, b, a),
        alpha_mode: if a < 1.0 { AlphaMode::Blend } else { AlphaMode::Opaque },
        perceptual_roughness: 0.6,
        ..default()
    }
}

/// Keep one entity per uploaded instance, spawning and despawning at the tail
fn sync_instances(
    commands: &mut Commands,
    instances: &[InstanceRaw],
    assets: &mut SceneAssets,
    slots: &mut Query<(Entity, &InstanceSlot, &mut Transform), (Without<MainCamera>, Without<OffscreenCamera>)>,
) {
    let Some(mesh) = assets.instance_mesh.0.clone() else {
        return;
    };
    let mut present = vec![false; instances.len()];
    for (entity, slot, mut transform) in slots.iter_mut() {
        let Some(instance) = instances.get(slot.index) else {
            assets.standard.remove(&slot.material);
            commands.entity(entity).despawn();
            continue;
        };
        present[slot.index] = true;
        *transform = instance_transform(instance);
        if let Some(material) = assets.standard.get_mut(&slot.material) {
            let color = Color::srgba(instance.color[0], instance.color[1], instance.color[2], instance.color[3]);
            if material.base_color != color {
                *material = instance_material(instance);
            }
        }
    }

    for (index, instance) in instances.iter().enumerate() {
        if present[index] {
            continue;
        }
        let material = assets.standard.add(instance_material(instance));
        commands.spawn((
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            instance_transform(instance),
            InstanceSlot { index, material },
            SceneProp,
        ));
    }
}

fn apply_pass(
    commands: &mut Commands,
    pass: &PassSnapshot,
    registry: &HostRegistry,
    assets: &mut SceneAssets,
    targets: &mut PassTargets,
) {
    let background = pass.environment.map(|environment| srgb(environment.background, 1.0));
    let layers = if pass.water_visible {
        RenderLayers::from_layers(&[0, WATER_LAYER])
    } else {
        RenderLayers::layer(0)
    };

    match pass.target {
        PassTarget::Surface(_) => {
            if let Ok((entity, mut transform, mut projection)) = targets.main_camera.single_mut() {
                *transform = rig_transform(&pass.camera);
                *projection = rig_projection(&pass.camera);
                let mut camera = commands.entity(entity);
                camera.insert(layers);
                match pass.environment.as_ref().and_then(distance_fog) {
                    Some(fog) => camera.insert(fog),
                    None => camera.remove::<DistanceFog>(),
                };
            }
            if let Some(background) = background {
                targets.clear_color.0 = background;
            }
            if let Some(environment) = pass.environment {
                for (mut light, _) in targets.light.iter_mut() {
                    light.illuminance = LIGHT_ILLUMINANCE * environment.light_intensity;
                }
            }
            if let Some(uniforms) = &pass.uniforms {
                apply_uniforms(uniforms, registry, assets, targets);
            }
        }
        PassTarget::Offscreen(target) => {
            for (entity, offscreen, mut transform, mut camera) in targets.offscreen_cameras.iter_mut() {
                if offscreen.0 != target {
                    continue;
                }
                *transform = rig_transform(&pass.camera);
                if let Some(background) = background {
                    camera.clear_color = ClearColorConfig::Custom(background);
                }
                commands.entity(entity).insert((layers.clone(), rig_projection(&pass.camera)));
            }
        }
    }
}

fn apply_uniforms(uniforms: &UniformSet, registry: &HostRegistry, assets: &mut SceneAssets, targets: &mut PassTargets) {
    if !uniforms.is_dirty() {
        return;
    }
    for handle in targets.water.iter() {
        if let Some(material) = assets.water.get_mut(&handle.0) {
            material.params = water_params(uniforms);
            material.reflection = uniforms
                .render_target("reflection")
                .and_then(|target| registry.targets.get(&target).cloned());
            material.normal_map = uniforms
                .texture("normal_map")
                .and_then(|texture| registry.textures.get(&texture).cloned());
        }
    }
    for handle in targets.metaballs.iter() {
        if let Some(material) = assets.metaballs.get_mut(&handle.0) {
            material.params = metaball_params(uniforms);
        }
    }
    if let Some(look) = ocean_look(uniforms) {
        apply_ocean_look(&look, assets, targets);
    }
}

fn apply_ocean_look(look: &OceanLook, assets: &mut SceneAssets, targets: &mut PassTargets) {
    for (_, material) in targets.ocean.iter() {
        if let Some(material) = assets.standard.get_mut(&material.0) {
            material.base_color = look.water;
        }
    }
    for (material, mut transform) in targets.ground.iter_mut() {
        transform.translation.y = look.ground_y;
        if let Some(material) = assets.standard.get_mut(&material.0) {
            material.base_color = look.ground;
        }
    }
    for (mut light, mut transform) in targets.light.iter_mut() {
        light.color = look.light_color;
        *transform = Transform::from_translation(look.light_direction).looking_at(Vec3::ZERO, Vec3::Y);
    }
}
