// Per-tick entity rules. All rates are per tick, not per second.

use crate::entity::Entity;
use glam::Vec3;

/// Added to distances before dividing by them
pub const EPSILON: f32 = 1e-4;

/// Pull towards a target that fades out linearly at `radius`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attraction {
    pub radius: f32,
    pub strength: f32,
}

impl Attraction {
    /// Velocity change for an entity at `position`
    pub fn force(&self, position: Vec3, target: Vec3) -> Vec3 {
        let offset = target - position;
        let distance = offset.length();
        if distance >= self.radius {
            return Vec3::ZERO;
        }
        let falloff = 1.0 - distance / self.radius;
        offset / (distance + EPSILON) * self.strength * falloff
    }
}

/// Move by the current velocity, then decay it
pub fn integrate_damped(entity: &mut Entity, damping: f32) {
    entity.position += entity.velocity;
    entity.velocity *= damping;
}

/// Push away from the pointer, drift back home once outside the radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repulsion {
    pub radius: f32,
    pub strength: f32,
    /// Fraction of the remaining distance to the origin covered per tick
    pub return_rate: f32,
    /// Extra scale at zero distance
    pub scale_boost: f32,
}

impl Repulsion {
    pub fn apply(&self, entity: &mut Entity, pointer: Option<Vec3>) {
        let inside = pointer.and_then(|pointer| {
            let distance = entity.position.distance(pointer);
            (distance < self.radius).then_some((pointer, distance))
        });

        match inside {
            Some((pointer, distance)) => {
                let falloff = 1.0 - distance / self.radius;
                let away = (entity.position - pointer) / (distance + EPSILON);
                entity.position += away * self.strength * falloff;
                entity.visual.scale = entity.visual.base_scale * (1.0 + self.scale_boost * falloff);
            }
            None => {
                entity.position = entity.position.lerp(entity.origin, self.return_rate);
                entity.visual.scale = entity.visual.base_scale;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReflectMode {
    /// Snap back onto the face and bounce with `restitution`
    Clamp { restitution: f32 },
    /// Only negate the velocity, the entity may overshoot for a tick
    Flip,
}

/// Axis-aligned simulation domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on the origin
    pub fn symmetric(half_extents: Vec3) -> Self {
        Self {
            min: -half_extents,
            max: half_extents,
        }
    }

    pub fn contains(&self, position: Vec3) -> bool {
        position.cmpge(self.min).all() && position.cmple(self.max).all()
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Reflect `velocity` on every axis where `position` left the box.
    /// Returns true when any axis bounced.
    pub fn reflect(&self, position: &mut Vec3, velocity: &mut Vec3, mode: ReflectMode) -> bool {
        let mut bounced = false;
        for axis in 0..3 {
            let below = position[axis] < self.min[axis];
            let above = position[axis] > self.max[axis];
            if !below && !above {
                continue;
            }
            bounced = true;
            match mode {
                ReflectMode::Clamp { restitution } => {
                    position[axis] = if below { self.min[axis] } else { self.max[axis] };
                    velocity[axis] *= -restitution;
                }
                ReflectMode::Flip => {
                    velocity[axis] = -velocity[axis];
                }
            }
        }
        bounced
    }

    /// Wrap a position around to the opposite face
    pub fn wrap(&self, position: &mut Vec3) {
        let size = self.size();
        for axis in 0..3 {
            if size[axis] <= 0.0 {
                continue;
            }
            if position[axis] < self.min[axis] {
                position[axis] += size[axis];
            } else if position[axis] > self.max[axis] {
                position[axis] -= size[axis];
            }
        }
    }
}
