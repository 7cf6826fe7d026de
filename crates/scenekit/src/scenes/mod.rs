//! Concrete scene variants and the catalogue that builds them.

pub mod bubbles;
pub mod cubes;
pub mod fish;
pub mod metaballs;
pub mod ocean;
pub mod particles;
pub mod starfield;
pub mod water;

use crate::color::Rgb;
use crate::config::SceneKitConfig;
use crate::lifecycle::SceneVariant;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub use bubbles::BubbleColumn;
pub use cubes::DriftingCubes;
pub use fish::FishSchool;
pub use metaballs::Metaballs;
pub use ocean::Ocean;
pub use particles::FloatingParticles;
pub use starfield::StarField;
pub use water::ReflectiveWater;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    Particles,
    StarField,
    Metaballs,
    Cubes,
    Fish,
    Bubbles,
    Water,
    Ocean,
}

impl SceneKind {
    pub const ALL: [SceneKind; 8] = [
        SceneKind::Particles,
        SceneKind::StarField,
        SceneKind::Metaballs,
        SceneKind::Cubes,
        SceneKind::Fish,
        SceneKind::Bubbles,
        SceneKind::Water,
        SceneKind::Ocean,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SceneKind::Particles => "Floating particles",
            SceneKind::StarField => "Star field",
            SceneKind::Metaballs => "Metaballs",
            SceneKind::Cubes => "Drifting cubes",
            SceneKind::Fish => "Fish school",
            SceneKind::Bubbles => "Bubbles",
            SceneKind::Water => "Reflective water",
            SceneKind::Ocean => "Ocean",
        }
    }

    /// Build a fresh, unmounted scene. Uses the configured seed if there is one.
    pub fn build(self, config: &SceneKitConfig) -> Box<dyn SceneVariant> {
        let seed = config.startup.seed.unwrap_or_else(|| rand::rng().random());
        self.build_seeded(config, seed)
    }

    pub fn build_seeded(self, config: &SceneKitConfig, seed: u64) -> Box<dyn SceneVariant> {
        let rng = StdRng::seed_from_u64(seed);
        match self {
            SceneKind::Particles => Box::new(FloatingParticles::new(config.particles.clone(), rng)),
            SceneKind::StarField => Box::new(StarField::new(config.stars.clone(), rng)),
            SceneKind::Metaballs => Box::new(Metaballs::new(config.metaballs.clone(), rng)),
            SceneKind::Cubes => Box::new(DriftingCubes::new(config.cubes.clone(), rng)),
            SceneKind::Fish => Box::new(FishSchool::new(config.fish.clone(), rng)),
            SceneKind::Bubbles => Box::new(BubbleColumn::new(config.bubbles.clone(), rng)),
            SceneKind::Water => Box::new(ReflectiveWater::new(config.water.clone())),
            SceneKind::Ocean => Box::new(Ocean::new(config.ocean.clone(), rng)),
        }
    }
}

/// Uniform draw from `range`, or its start when the range is empty
pub(crate) fn sample_range(rng: &mut StdRng, range: &Range<f32>) -> f32 {
    if range.start < range.end {
        rng.random_range(range.clone())
    } else {
        range.start
    }
}

/// Random point in a box of size `extent` centered on the origin
pub(crate) fn scatter(rng: &mut StdRng, extent: Vec3) -> Vec3 {
    Vec3::new(
        rng.random::<f32>() - 0.5,
        rng.random::<f32>() - 0.5,
        rng.random::<f32>() - 0.5,
    ) * extent
}

/// Palette entry for the `index`th entity, cycling; white for an empty palette
pub(crate) fn palette_color(palette: &[u32], index: usize) -> Rgb {
    if palette.is_empty() {
        return Rgb::WHITE;
    }
    Rgb::from_hex(palette[index % palette.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn every_kind_builds_an_empty_scene() {
        let config = SceneKitConfig::default();
        for kind in SceneKind::ALL {
            let scene = kind.build_seeded(&config, 1);
            assert_eq!(scene.entity_count(), 0, "{} populated before mount", scene.name());
        }
    }

    #[rstest]
    #[case("\"starfield\"", SceneKind::StarField)]
    #[case("\"ocean\"", SceneKind::Ocean)]
    fn kinds_parse_lowercase(#[case] text: &str, #[case] expected: SceneKind) {
        #[derive(Deserialize)]
        struct Wrapper {
            scene: SceneKind,
        }
        let parsed: Wrapper = toml::from_str(&format!("scene = {text}")).unwrap();
        assert_eq!(parsed.scene, expected);
    }

    #[test]
    fn empty_range_yields_start() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sample_range(&mut rng, &(2.0..2.0)), 2.0);
        let value = sample_range(&mut rng, &(1.0..3.0));
        assert!((1.0..3.0).contains(&value));
    }

    #[test]
    fn palette_cycles() {
        let palette = [0xff0000, 0x00ff00];
        assert_eq!(palette_color(&palette, 3), Rgb::from_hex(0x00ff00));
        assert_eq!(palette_color(&[], 3), Rgb::WHITE);
    }
}
