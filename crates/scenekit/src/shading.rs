//! CPU side of the water compositing shader.
//!
//! `assets/shaders/water.wgsl` runs the same math per fragment; these
//! functions exist so the host can reason about the result (tests, debug
//! overlays) without a GPU.

use crate::camera::CameraRig;
use crate::color::Rgb;
use glam::{Vec2, Vec3};

/// Reflectance of water at normal incidence
pub const WATER_F0: f32 = 0.02;

/// Schlick's approximation: `f0 + (1 - f0) * (1 - cos_theta)^5`
pub fn fresnel_schlick(cos_theta: f32, f0: f32) -> f32 {
    let cos_theta = cos_theta.clamp(0.0, 1.0);
    f0 + (1.0 - f0) * (1.0 - cos_theta).powi(5)
}

/// Fresnel term for a view direction (from surface to eye) and a normal
pub fn fresnel(view_dir: Vec3, normal: Vec3, f0: f32) -> f32 {
    let cos_theta = view_dir.normalize_or_zero().dot(normal.normalize_or_zero());
    fresnel_schlick(cos_theta, f0)
}

/// Camera reflected across the horizontal plane `y = plane_y`, used for the
/// offscreen reflection pass
pub fn mirror_camera(camera: &CameraRig, plane_y: f32) -> CameraRig {
    let mirror = |p: Vec3| Vec3::new(p.x, 2.0 * plane_y - p.y, p.z);
    CameraRig {
        eye: mirror(camera.eye),
        target: mirror(camera.target),
        up: Vec3::new(camera.up.x, -camera.up.y, camera.up.z),
        ..*camera
    }
}

/// `mix(refraction, reflection, fresnel)`, pulled towards `tint`, with alpha
pub fn composite(
    refraction: Rgb,
    reflection: Rgb,
    fresnel: f32,
    tint: Rgb,
    tint_amount: f32,
    alpha: f32,
) -> [f32; 4] {
    let mixed = refraction.lerp(reflection, fresnel.clamp(0.0, 1.0));
    mixed.lerp(tint, tint_amount.clamp(0.0, 1.0)).to_array(alpha.clamp(0.0, 1.0))
}

/// Normal map scroll that fakes ripple motion
pub fn ripple_offset(time: f32) -> Vec2 {
    Vec2::splat(time * 0.05)
}

/// Whether the water mesh takes part in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshVisibility {
    visible: bool,
}

impl Default for MeshVisibility {
    fn default() -> Self {
        Self { visible: true }
    }
}

impl MeshVisibility {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hide the mesh until the returned guard drops. Restores whatever
    /// visibility was set before, on every exit path.
    pub fn hidden_scope(&mut self) -> HiddenScope<'_> {
        let previous = self.visible;
        self.visible = false;
        HiddenScope {
            visibility: self,
            previous,
        }
    }
}

pub struct HiddenScope<'a> {
    visibility: &'a mut MeshVisibility,
    previous: bool,
}

impl HiddenScope<'_> {
    pub fn is_visible(&self) -> bool {
        self.visibility.visible
    }
}

impl Drop for HiddenScope<'_> {
    fn drop(&mut self) {
        self.visibility.visible = self.previous;
    }
}
