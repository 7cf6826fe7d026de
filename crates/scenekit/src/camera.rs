use crate::render_target::Viewport;
use glam::{Mat4, Vec2, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in degrees
    Perspective { fov_y_degrees: f32 },
    /// Half of the visible height, width follows the aspect ratio
    Orthographic { half_height: f32 },
}

/// What a scene asks for when it is mounted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSpec {
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub look_at: Vec3,
}

impl CameraSpec {
    pub fn perspective(fov_y_degrees: f32, near: f32, far: f32, position: Vec3) -> Self {
        Self {
            projection: Projection::Perspective { fov_y_degrees },
            near,
            far,
            position,
            look_at: Vec3::ZERO,
        }
    }

    /// Full-screen quad camera covering `[-1, 1]` vertically
    pub fn screen_quad() -> Self {
        Self {
            projection: Projection::Orthographic { half_height: 1.0 },
            near: 0.0,
            far: 1.0,
            position: Vec3::new(0.0, 0.0, 1.0),
            look_at: Vec3::ZERO,
        }
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.look_at = target;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Intersection with the plane `dot(normal, p) = offset`
    pub fn intersect_plane(&self, normal: Vec3, offset: f32) -> Option<Vec3> {
        let denominator = normal.dot(self.direction);
        if denominator.abs() < 1e-6 {
            return None;
        }
        let t = (offset - normal.dot(self.origin)) / denominator;
        (t >= 0.0).then(|| self.origin + self.direction * t)
    }
}

/// Live camera of a mounted scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraRig {
    pub fn from_spec(spec: &CameraSpec, viewport: Viewport) -> Self {
        Self {
            eye: spec.position,
            target: spec.look_at,
            up: Vec3::Y,
            projection: spec.projection,
            aspect: viewport.aspect(),
            near: spec.near,
            far: spec.far,
        }
    }

    pub fn set_aspect(&mut self, viewport: Viewport) {
        self.aspect = viewport.aspect();
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y_degrees } => {
                Mat4::perspective_rh(fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
            }
            Projection::Orthographic { half_height } => {
                let half_width = half_height * self.aspect;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view()
    }

    /// World-space ray through a point in normalized device coordinates
    pub fn ray(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let unproject = |depth: f32| {
            let point = inverse * Vec4::new(ndc.x, ndc.y, depth, 1.0);
            point.truncate() / point.w
        };
        let near = unproject(0.0);
        let far = unproject(1.0);
        Ray {
            origin: near,
            direction: (far - near).normalize_or_zero(),
        }
    }

    /// Project a pointer onto the plane `z = depth`, the plane the
    /// particle scenes interact on
    pub fn pointer_on_z_plane(&self, ndc: Vec2, depth: f32) -> Option<Vec3> {
        self.ray(ndc).intersect_plane(Vec3::Z, depth)
    }
}
