use crate::backend::{TargetId, TextureId};
use crate::color::Rgb;
use crate::error::SceneError;
use glam::{Vec2, Vec3, Vec4};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Color,
    /// Fixed-length array, the length is part of the shader declaration
    Vec4Array(usize),
    Texture,
    /// Color buffer of one of the scene's own render targets
    RenderTarget,
}

impl UniformKind {
    fn describe(self) -> &'static str {
        match self {
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
            UniformKind::Color => "color",
            UniformKind::Vec4Array(_) => "vec4 array of the declared length",
            UniformKind::Texture => "texture",
            UniformKind::RenderTarget => "render target",
        }
    }

    fn default_value(self) -> UniformValue {
        match self {
            UniformKind::Float => UniformValue::Float(0.0),
            UniformKind::Vec2 => UniformValue::Vec2(Vec2::ZERO),
            UniformKind::Vec3 => UniformValue::Vec3(Vec3::ZERO),
            UniformKind::Vec4 => UniformValue::Vec4(Vec4::ZERO),
            UniformKind::Color => UniformValue::Color(Rgb::BLACK),
            UniformKind::Vec4Array(len) => UniformValue::Vec4Array(vec![Vec4::ZERO; len]),
            UniformKind::Texture => UniformValue::Texture(None),
            UniformKind::RenderTarget => UniformValue::RenderTarget(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Color(Rgb),
    Vec4Array(Vec<Vec4>),
    /// `None` until the texture has loaded; shaders render without it
    Texture(Option<TextureId>),
    RenderTarget(Option<TargetId>),
}

impl UniformValue {
    fn matches(&self, kind: UniformKind) -> bool {
        match (self, kind) {
            (UniformValue::Float(_), UniformKind::Float)
            | (UniformValue::Vec2(_), UniformKind::Vec2)
            | (UniformValue::Vec3(_), UniformKind::Vec3)
            | (UniformValue::Vec4(_), UniformKind::Vec4)
            | (UniformValue::Color(_), UniformKind::Color)
            | (UniformValue::Texture(_), UniformKind::Texture)
            | (UniformValue::RenderTarget(_), UniformKind::RenderTarget) => true,
            (UniformValue::Vec4Array(values), UniformKind::Vec4Array(len)) => values.len() == len,
            _ => false,
        }
    }
}

/// Inputs a shader program declares
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformLayout {
    entries: Vec<(&'static str, UniformKind)>,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, kind: UniformKind) -> Self {
        self.entries.push((name, kind));
        self
    }

    pub fn kind_of(&self, name: &str) -> Option<UniformKind> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, kind)| *kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Current uniform values of one scene, always matching its layout.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSet {
    layout: UniformLayout,
    values: BTreeMap<&'static str, UniformValue>,
    dirty: bool,
}

impl UniformSet {
    pub fn new(layout: UniformLayout) -> Self {
        let values = layout
            .entries
            .iter()
            .map(|(name, kind)| (*name, kind.default_value()))
            .collect();
        Self {
            layout,
            values,
            dirty: true,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<(), SceneError> {
        let kind = self
            .layout
            .kind_of(name)
            .ok_or_else(|| SceneError::UndeclaredUniform(name.to_string()))?;
        if !value.matches(kind) {
            return Err(SceneError::UniformKind {
                name: name.to_string(),
                expected: kind.describe(),
            });
        }
        if let Some(slot) = self.values.get_mut(name) {
            if *slot != value {
                *slot = value;
                self.dirty = true;
            }
        }
        Ok(())
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<(), SceneError> {
        self.set(name, UniformValue::Float(value))
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.values.get(name) {
            Some(UniformValue::Float(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn vec4_array(&self, name: &str) -> Option<&[Vec4]> {
        match self.values.get(name) {
            Some(UniformValue::Vec4Array(values)) => Some(values),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<TextureId> {
        match self.values.get(name) {
            Some(UniformValue::Texture(texture)) => *texture,
            _ => None,
        }
    }

    pub fn render_target(&self, name: &str) -> Option<TargetId> {
        match self.values.get(name) {
            Some(UniformValue::RenderTarget(target)) => *target,
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<Rgb> {
        match self.values.get(name) {
            Some(UniformValue::Color(color)) => Some(*color),
            _ => None,
        }
    }

    pub fn vec2(&self, name: &str) -> Option<Vec2> {
        match self.values.get(name) {
            Some(UniformValue::Vec2(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.values.get(name) {
            Some(UniformValue::Vec3(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn vec4(&self, name: &str) -> Option<Vec4> {
        match self.values.get(name) {
            Some(UniformValue::Vec4(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &UniformValue)> + '_ {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> UniformLayout {
        UniformLayout::new()
            .with("u_time", UniformKind::Float)
            .with("u_blobs", UniformKind::Vec4Array(2))
            .with("normal_map", UniformKind::Texture)
    }

    #[test]
    fn starts_with_defaults() {
        let uniforms = UniformSet::new(layout());
        assert_eq!(uniforms.float("u_time"), Some(0.0));
        assert_eq!(uniforms.vec4_array("u_blobs").map(<[Vec4]>::len), Some(2));
        assert_eq!(uniforms.texture("normal_map"), None);
    }

    #[test]
    fn rejects_undeclared_names() {
        let mut uniforms = UniformSet::new(layout());
        let err = uniforms.set_float("u_mouse", 1.0).unwrap_err();
        assert_eq!(err, SceneError::UndeclaredUniform("u_mouse".into()));
    }

    #[test]
    fn rejects_wrong_kind_and_array_length() {
        let mut uniforms = UniformSet::new(layout());
        assert!(matches!(
            uniforms.set("u_time", UniformValue::Vec2(Vec2::ONE)),
            Err(SceneError::UniformKind { .. })
        ));
        assert!(matches!(
            uniforms.set("u_blobs", UniformValue::Vec4Array(vec![Vec4::ONE; 3])),
            Err(SceneError::UniformKind { .. })
        ));
    }

    #[test]
    fn only_real_changes_mark_dirty() {
        let mut uniforms = UniformSet::new(layout());
        uniforms.mark_clean();

        uniforms.set_float("u_time", 0.0).unwrap();
        assert!(!uniforms.is_dirty());

        uniforms.set_float("u_time", 0.5).unwrap();
        assert!(uniforms.is_dirty());
    }
}
