use bevy::prelude::*;
use bevy::render::render_resource::{AsBindGroup, ShaderType};
use bevy::shader::ShaderRef;

/// Wave slots in [`WaterParams::waves`], two per wave term
pub const WATER_WAVE_SLOTS: usize = 8;

/// Blobs the metaball shader can sum
pub const MAX_BLOBS: usize = 32;

#[derive(ShaderType, Debug, Clone, Copy)]
pub struct WaterParams {
    /// rgb + alpha
    pub water_color: Vec4,
    pub sun_color: Vec4,
    pub sun_direction: Vec4,
    pub eye: Vec4,
    /// time, distortion scale, fresnel f0, tint amount
    pub settings: Vec4,
    /// normal map weight (0 without a map), normal map scroll xy, unused
    pub detail: Vec4,
    pub waves: [Vec4; WATER_WAVE_SLOTS],
}

impl Default for WaterParams {
    fn default() -> Self {
        Self {
            water_color: Vec4::new(0.0, 0.118, 0.059, 1.0),
            sun_color: Vec4::ONE,
            sun_direction: Vec3::ONE.normalize().extend(0.0),
            eye: Vec4::ZERO,
            settings: Vec4::new(0.0, 3.7, 0.02, 0.15),
            detail: Vec4::ZERO,
            waves: [Vec4::ZERO; WATER_WAVE_SLOTS],
        }
    }
}

/// Reflective water surface: the reflection texture is the output of a
/// mirrored camera, blended with the water color by a Fresnel term
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone, Default)]
pub struct WaterMaterial {
    #[uniform(0)]
    pub params: WaterParams,
    #[texture(1)]
    #[sampler(2)]
    pub reflection: Option<Handle<Image>>,
    #[texture(3)]
    #[sampler(4)]
    pub normal_map: Option<Handle<Image>>,
}

impl Material for WaterMaterial {
    fn fragment_shader() -> ShaderRef {
        "shaders/water.wgsl".into()
    }

    fn alpha_mode(&self) -> AlphaMode {
        if self.params.water_color.w < 1.0 {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        }
    }
}

#[derive(ShaderType, Debug, Clone, Copy)]
pub struct MetaballParams {
    /// resolution x, resolution y, time, blob count
    pub frame: Vec4,
    /// pointer in uv space, xy
    pub mouse: Vec4,
    pub background_bottom: Vec4,
    pub background_top: Vec4,
    pub fill: Vec4,
    /// threshold, shadow low edge, shadow opacity
    pub shape: Vec4,
    /// x, y, radius, unused
    pub blobs: [Vec4; MAX_BLOBS],
}

impl Default for MetaballParams {
    fn default() -> Self {
        Self {
            frame: Vec4::new(1.0, 1.0, 0.0, 0.0),
            mouse: Vec4::new(0.5, 0.5, 0.0, 0.0),
            background_bottom: Vec4::ZERO,
            background_top: Vec4::ZERO,
            fill: Vec4::ONE,
            shape: Vec4::new(1.0, 0.8, 0.15, 0.0),
            blobs: [Vec4::ZERO; MAX_BLOBS],
        }
    }
}

impl MetaballParams {
    /// Copy blobs in, dropping any beyond [`MAX_BLOBS`]. Returns how many fit.
    pub fn set_blobs(&mut self, blobs: &[Vec4]) -> usize {
        let count = blobs.len().min(MAX_BLOBS);
        self.blobs = [Vec4::ZERO; MAX_BLOBS];
        self.blobs[..count].copy_from_slice(&blobs[..count]);
        self.frame.w = count as f32;
        count
    }
}

/// Full-screen metaball field, drawn on a clip-space quad
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone, Default)]
pub struct MetaballMaterial {
    #[uniform(0)]
    pub params: MetaballParams,
}

impl Material for MetaballMaterial {
    fn vertex_shader() -> ShaderRef {
        "shaders/metaballs.wgsl".into()
    }

    fn fragment_shader() -> ShaderRef {
        "shaders/metaballs.wgsl".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_blobs_are_dropped() {
        let mut params = MetaballParams::default();
        let blobs = vec![Vec4::ONE; MAX_BLOBS + 5];
        assert_eq!(params.set_blobs(&blobs), MAX_BLOBS);
        assert_eq!(params.frame.w, MAX_BLOBS as f32);
    }

    #[test]
    fn stale_blobs_are_cleared() {
        let mut params = MetaballParams::default();
        params.set_blobs(&[Vec4::ONE; 3]);
        params.set_blobs(&[Vec4::splat(2.0)]);
        assert_eq!(params.blobs[1], Vec4::ZERO);
        assert_eq!(params.frame.w, 1.0);
    }

    #[test]
    fn translucent_water_blends() {
        let mut material = WaterMaterial::default();
        assert_eq!(material.alpha_mode(), AlphaMode::Opaque);
        material.params.water_color.w = 0.8;
        assert_eq!(material.alpha_mode(), AlphaMode::Blend);
    }
}
