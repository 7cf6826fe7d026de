use crate::color::Rgb;
use serde::{Deserialize, Serialize};

/// Sky-to-murk transition driven by camera height.
///
/// The factor is recomputed from scratch every tick; there is no hysteresis,
/// so a camera hovering at the threshold recolors on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthFog {
    /// Height at which the transition starts
    pub surface_y: f32,
    /// Vertical distance over which the factor goes from 0 to 1
    pub transition_range: f32,
    pub sky_color: u32,
    pub deep_color: u32,
    /// Fog near plane above water and at full depth
    pub near: (f32, f32),
    pub far: (f32, f32),
}

impl Default for DepthFog {
    fn default() -> Self {
        Self {
            surface_y: 2.0,
            transition_range: 10.0,
            sky_color: 0x87ceeb,
            deep_color: 0x1e5d88,
            near: (5.0, 2.0),
            far: (20.0, 10.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogState {
    pub factor: f32,
    pub background: Rgb,
    pub color: Rgb,
    pub near: f32,
    pub far: f32,
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl DepthFog {
    pub fn factor(&self, camera_y: f32) -> f32 {
        if self.transition_range <= 0.0 {
            return if camera_y < self.surface_y { 1.0 } else { 0.0 };
        }
        ((self.surface_y - camera_y) / self.transition_range).clamp(0.0, 1.0)
    }

    pub fn evaluate(&self, camera_y: f32) -> FogState {
        let factor = self.factor(camera_y);
        let color = Rgb::from_hex(self.sky_color).lerp(Rgb::from_hex(self.deep_color), factor);
        FogState {
            factor,
            background: color,
            color,
            near: lerp(self.near.0, self.near.1, factor),
            far: lerp(self.far.0, self.far.1, factor),
        }
    }
}

/// Key light dimming once the camera dips below the surface at y = 0
pub fn depth_light_intensity(camera_y: f32) -> f32 {
    let depth = if camera_y > 0.0 {
        0.0
    } else {
        (-camera_y / 10.0).clamp(0.0, 1.0)
    };
    lerp(1.5, 0.3, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(100.0, 0.0)]
    #[case(2.0, 0.0)]
    #[case(-3.0, 0.5)]
    #[case(-8.0, 1.0)]
    #[case(-1.0e6, 1.0)]
    fn factor_examples(#[case] camera_y: f32, #[case] expected: f32) {
        let fog = DepthFog::default();
        assert!((fog.factor(camera_y) - expected).abs() < 1e-6);
    }

    #[test]
    fn deep_camera_gets_deep_colors_and_dense_fog() {
        let fog = DepthFog::default();
        let state = fog.evaluate(-50.0);
        assert_eq!(state.background.to_hex(), 0x1e5d88);
        assert_eq!(state.near, 2.0);
        assert_eq!(state.far, 10.0);
    }

    #[test]
    fn fog_gets_denser_with_depth() {
        let fog = DepthFog::default();
        let shallow = fog.evaluate(1.0);
        let deep = fog.evaluate(-5.0);
        assert!(deep.near < shallow.near);
        assert!(deep.far < shallow.far);
    }

    #[rstest]
    #[case(5.0, 1.5)]
    #[case(-5.0, 0.9)]
    #[case(-30.0, 0.3)]
    fn light_dims_below_surface(#[case] camera_y: f32, #[case] expected: f32) {
        assert!((depth_light_intensity(camera_y) - expected).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn factor_is_always_clamped(
            camera_y in proptest::num::f32::NORMAL,
            surface_y in -100.0f32..100.0,
            range in 0.001f32..500.0,
        ) {
            let fog = DepthFog { surface_y, transition_range: range, ..DepthFog::default() };
            let factor = fog.factor(camera_y);
            prop_assert!((0.0..=1.0).contains(&factor));
        }
    }
}
