use crate::error::SceneError;
use crate::fog::DepthFog;
use crate::scenes::SceneKind;
use crate::waves::WaveStack;
use log::warn;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::{Mutex, MutexGuard, OnceLock};

pub const CONFIG_FILE: &str = "tidewater.toml";

static CONFIG: OnceLock<Mutex<SceneKitConfig>> = OnceLock::new();

fn lock(config: &Mutex<SceneKitConfig>) -> MutexGuard<'_, SceneKitConfig> {
    config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Get a copy of the current configuration, loading it from `tidewater.toml`
/// on first use. A missing or broken file falls back to the defaults.
pub fn get_config() -> SceneKitConfig {
    let config = CONFIG.get_or_init(|| {
        let config = SceneKitConfig::load_from_file(CONFIG_FILE).unwrap_or_else(|err| {
            warn!("Using default scene configuration, {CONFIG_FILE}: {err}");
            SceneKitConfig::default()
        });
        Mutex::new(config)
    });
    lock(config).clone()
}

/// Re-read `tidewater.toml`. The previous values stay in place on error.
pub fn reload_config() -> Result<(), SceneError> {
    reload_config_from_file(CONFIG_FILE)
}

fn reload_config_from_file(path: &str) -> Result<(), SceneError> {
    let new_config = SceneKitConfig::load_from_file(path)?;
    let config = CONFIG.get_or_init(|| Mutex::new(new_config.clone()));
    *lock(config) = new_config;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneKitConfig {
    pub startup: StartupConfig,
    pub particles: ParticleConfig,
    pub stars: StarConfig,
    pub metaballs: MetaballConfig,
    pub cubes: CubeConfig,
    pub fish: FishConfig,
    pub bubbles: BubbleConfig,
    pub water: WaterConfig,
    pub ocean: OceanConfig,
}

impl SceneKitConfig {
    pub fn load_from_file(path: &str) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path)?;
        let config: SceneKitConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), SceneError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    pub scene: SceneKind,
    /// Fixed seed for entity population, random when unset
    pub seed: Option<u64>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            scene: SceneKind::Particles,
            seed: None,
        }
    }
}

/// Pastel spheres drawn towards the pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    pub radius: f32,
    pub palette: Vec<u32>,
    pub opacity: f32,
    /// Full size of the box particles spawn in
    pub spawn_extent: [f32; 3],
    pub initial_speed: f32,
    pub attraction_radius: f32,
    pub attraction_strength: f32,
    pub damping: f32,
    /// Half size of the box particles bounce in
    pub bounds: [f32; 3],
    pub restitution: f32,
    pub background: u32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 100,
            radius: 0.12,
            palette: vec![
                0xa8d5ba, 0xf9d5e5, 0xffe6a7, 0xc9c9ff, 0xffd6ba, 0xd0f4de, 0xf6f5ae, 0xc5d8a4,
            ],
            opacity: 0.8,
            spawn_extent: [8.0, 5.0, 8.0],
            initial_speed: 0.015,
            attraction_radius: 3.0,
            attraction_strength: 0.008,
            damping: 0.92,
            bounds: [4.0, 2.5, 4.0],
            restitution: 0.6,
            background: 0xf7f4ee,
        }
    }
}

/// Glowing stars pushed away by the pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarConfig {
    pub count: usize,
    pub palette: Vec<u32>,
    pub tint: u32,
    pub tint_amount: f32,
    pub spawn_extent: [f32; 3],
    pub min_scale: f32,
    pub scale_jitter: f32,
    pub repulsion_radius: f32,
    pub repulsion_strength: f32,
    pub return_rate: f32,
    pub scale_boost: f32,
    /// Group rotation around Y per tick, radians
    pub spin: f32,
    pub background: u32,
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            count: 300,
            palette: vec![0xffc1cc, 0xa0d8ef, 0xb9fbc0, 0xfff1a8, 0xd0bbff],
            tint: 0xfff7cc,
            tint_amount: 0.3,
            spawn_extent: [30.0, 20.0, 30.0],
            min_scale: 0.1,
            scale_jitter: 0.15,
            repulsion_radius: 5.0,
            repulsion_strength: 0.1,
            return_rate: 0.02,
            scale_boost: 0.5,
            spin: 0.0005,
            background: 0x000000,
        }
    }
}

/// Screen space blobs merged by the metaball shader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaballConfig {
    pub count: usize,
    pub min_radius: f32,
    pub radius_jitter: f32,
    pub initial_speed: f32,
    pub pointer_radius: f32,
    pub attraction_strength: f32,
    pub damping: f32,
    pub background_bottom: u32,
    pub background_top: u32,
    pub fill: u32,
    pub threshold: f32,
    pub shadow_low: f32,
    pub shadow_opacity: f32,
}

impl Default for MetaballConfig {
    fn default() -> Self {
        Self {
            count: 12,
            min_radius: 0.04,
            radius_jitter: 0.05,
            initial_speed: 0.002,
            pointer_radius: 0.3,
            attraction_strength: 0.0001,
            damping: 0.98,
            background_bottom: 0x2a3a9f,
            background_top: 0x7b4dc7,
            fill: 0xffffff,
            threshold: 1.0,
            shadow_low: 0.8,
            shadow_opacity: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    pub count: usize,
    pub spawn_extent: f32,
    pub initial_speed: f32,
    /// Half size of the cube they drift in
    pub bound: f32,
    /// Rotation around X and Y per tick, radians
    pub spin: f32,
    pub opacity: f32,
    pub background: u32,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            count: 50,
            spawn_extent: 20.0,
            initial_speed: 0.01,
            bound: 10.0,
            spin: 0.005,
            opacity: 0.6,
            background: 0x0f1724,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FishConfig {
    pub count: usize,
    pub bounds: [f32; 3],
    pub perception_radius: f32,
    pub separation_radius: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub separation: f32,
    pub avoid_radius: f32,
    pub avoid_strength: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub scale: f32,
    pub palette: Vec<u32>,
    pub background: u32,
}

impl Default for FishConfig {
    fn default() -> Self {
        Self {
            count: 80,
            bounds: [8.0, 4.0, 4.0],
            perception_radius: 2.0,
            separation_radius: 0.8,
            alignment: 0.05,
            cohesion: 0.005,
            separation: 0.03,
            avoid_radius: 3.0,
            avoid_strength: 0.02,
            min_speed: 0.02,
            max_speed: 0.08,
            scale: 0.3,
            palette: vec![0xff9f43, 0x48dbfb, 0xfeca57, 0xff6b6b],
            background: 0x0b3d5c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleConfig {
    pub max_bubbles: usize,
    /// New bubbles per second while under the cap
    pub spawn_rate: f32,
    /// Half width and half depth of the spawn area
    pub spawn_area: [f32; 2],
    pub floor_y: f32,
    pub rise_speed: Range<f32>,
    pub wobble_amplitude: f32,
    pub wobble_frequency: f32,
    pub lifetime: Range<f32>,
    /// Share of the lifetime spent fading out
    pub fade_fraction: f32,
    pub fade_threshold: f32,
    pub radius: Range<f32>,
    pub opacity: f32,
    pub color: u32,
    pub background: u32,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            max_bubbles: 120,
            spawn_rate: 12.0,
            spawn_area: [6.0, 3.0],
            floor_y: -4.0,
            rise_speed: 0.01..0.025,
            wobble_amplitude: 0.01,
            wobble_frequency: 2.0,
            lifetime: 4.0..8.0,
            fade_fraction: 0.3,
            fade_threshold: 0.02,
            radius: 0.05..0.15,
            opacity: 0.7,
            color: 0xdff6ff,
            background: 0x0a2a43,
        }
    }
}

/// Reflective water plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    pub plane_size: f32,
    pub subdivisions: u32,
    /// Reflection target size relative to the viewport
    pub reflection_scale: f32,
    pub normal_map: String,
    pub distortion_scale: f32,
    pub water_color: u32,
    pub tint_amount: f32,
    pub alpha: f32,
    pub sun_color: u32,
    pub sun_direction: [f32; 3],
    pub sky_color: u32,
    pub waves: WaveStack,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            plane_size: 10000.0,
            subdivisions: 128,
            reflection_scale: 0.5,
            normal_map: "textures/waternormals.jpg".to_string(),
            distortion_scale: 3.7,
            water_color: 0x001e0f,
            tint_amount: 0.15,
            alpha: 1.0,
            sun_color: 0xffffff,
            sun_direction: [1.0, 1.0, 1.0],
            sky_color: 0x9ec9e8,
            waves: WaveStack::default(),
        }
    }
}

/// Rippling ocean with scroll-driven camera and depth fog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OceanConfig {
    /// Cells per side of the ripple simulation
    pub grid_size: usize,
    pub plane_size: f32,
    /// Seconds between random drops
    pub drop_interval: f32,
    pub drop_radius: Range<f32>,
    pub drop_strength: Range<f32>,
    pub displacement: f32,
    pub water_color: u32,
    pub alpha: f32,
    pub light_direction: [f32; 3],
    pub light_color: u32,
    pub ground_color: u32,
    pub ground_y: f32,
    pub top_y: f32,
    pub bottom_y: f32,
    pub camera_distance: f32,
    pub fog: DepthFog,
}

impl Default for OceanConfig {
    fn default() -> Self {
        Self {
            grid_size: 128,
            plane_size: 10.0,
            drop_interval: 4.0,
            drop_radius: 0.03..0.05,
            drop_strength: 0.3..0.8,
            displacement: 0.15,
            water_color: 0x3fa9f5,
            alpha: 0.8,
            light_direction: [0.5, 1.0, 0.5],
            light_color: 0xaaccff,
            ground_color: 0x8b7d5b,
            ground_y: -0.1,
            top_y: 2.0,
            bottom_y: -2.0,
            camera_distance: 5.0,
            fog: DepthFog::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: SceneKitConfig = toml::from_str(
            r#"
            [startup]
            scene = "ocean"

            [particles]
            count = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.startup.scene, SceneKind::Ocean);
        assert_eq!(config.particles.count, 12);
        assert_eq!(config.particles.damping, 0.92);
        assert_eq!(config.stars, StarConfig::default());
    }

    #[test]
    fn save_then_load_gives_same_config() {
        let path = std::env::temp_dir().join(format!("tidewater-{}.toml", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let mut config = SceneKitConfig::default();
        config.fish.count = 7;
        config.ocean.fog.surface_y = 1.0;
        config.save_to_file(&path).unwrap();

        let loaded = SceneKitConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = SceneKitConfig::load_from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, SceneError::Config(_)));
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = toml::from_str::<SceneKitConfig>("particles = 3").map_err(SceneError::from);
        assert!(matches!(err, Err(SceneError::Config(_))));
    }
}
