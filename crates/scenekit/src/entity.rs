use crate::color::Rgb;
use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

/// Per-entity look, set at creation and occasionally modulated per tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualAttributes {
    pub color: Rgb,
    /// Current scale, may be modulated from `base_scale`
    pub scale: f32,
    pub base_scale: f32,
    /// Collision / field radius in scene units
    pub radius: f32,
    pub opacity: f32,
}

impl Default for VisualAttributes {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            scale: 1.0,
            base_scale: 1.0,
            radius: 1.0,
            opacity: 1.0,
        }
    }
}

/// A single simulated visual object (particle, blob, star, fish, bubble)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Rest position, the starfield drifts back towards it
    pub origin: Vec3,
    /// Euler rotation (x, y, z) in radians
    pub rotation: Vec3,
    pub visual: VisualAttributes,
}

impl Entity {
    pub fn new(position: Vec3, velocity: Vec3, visual: VisualAttributes) -> Self {
        Self {
            position,
            velocity,
            origin: position,
            rotation: Vec3::ZERO,
            visual,
        }
    }

    pub fn at_rest(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO, VisualAttributes::default())
    }
}

/// GPU-facing instance record
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    /// xyz = world position, w = uniform scale
    pub position_scale: [f32; 4],
    /// Rotation quaternion (x, y, z, w)
    pub rotation: [f32; 4],
    /// rgb + opacity
    pub color: [f32; 4],
}

/// Instance buffer owned by a scene's update step.
///
/// Every mutable accessor marks the buffer dirty; the render step uploads it
/// only when dirty and then calls [`EntityBuffer::take_upload`], which clears
/// the flag.
#[derive(Debug, Clone, Default)]
pub struct EntityBuffer {
    entities: Vec<Entity>,
    raw: Vec<InstanceRaw>,
    group_rotation_y: f32,
    dirty: bool,
}

impl EntityBuffer {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            raw: Vec::new(),
            group_rotation_y: 0.0,
            dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut Vec<Entity> {
        self.dirty = true;
        &mut self.entities
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.dirty = true;
        self.entities.iter_mut()
    }

    pub fn push(&mut self, entity: Entity) {
        self.dirty = true;
        self.entities.push(entity);
    }

    pub fn retain(&mut self, keep: impl FnMut(&Entity) -> bool) {
        let before = self.entities.len();
        self.entities.retain(keep);
        if self.entities.len() != before {
            self.dirty = true;
        }
    }

    pub fn replace(&mut self, entities: impl IntoIterator<Item = Entity>) {
        self.entities.clear();
        self.entities.extend(entities);
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        if !self.entities.is_empty() {
            self.dirty = true;
        }
        self.entities.clear();
    }

    pub fn group_rotation_y(&self) -> f32 {
        self.group_rotation_y
    }

    /// Rotation applied to the whole group around the Y axis (world space)
    pub fn set_group_rotation_y(&mut self, angle: f32) {
        if angle != self.group_rotation_y {
            self.group_rotation_y = angle;
            self.dirty = true;
        }
    }

    /// Rebuild the raw instance data if anything changed since the last upload.
    /// Returns `None` when the backend copy is already current.
    pub fn take_upload(&mut self) -> Option<&[InstanceRaw]> {
        if !self.dirty {
            return None;
        }
        let group = Quat::from_rotation_y(self.group_rotation_y);
        self.raw.clear();
        self.raw.extend(self.entities.iter().map(|entity| {
            let position = group * entity.position;
            let rotation = group
                * Quat::from_euler(
                    glam::EulerRot::XYZ,
                    entity.rotation.x,
                    entity.rotation.y,
                    entity.rotation.z,
                );
            InstanceRaw {
                position_scale: [position.x, position.y, position.z, entity.visual.scale],
                rotation: rotation.to_array(),
                color: entity.visual.color.to_array(entity.visual.opacity),
            }
        }));
        self.dirty = false;
        Some(&self.raw)
    }
}
