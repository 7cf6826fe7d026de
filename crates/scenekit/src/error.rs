use crate::lifecycle::SceneState;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// A lifecycle call arrived in a state that does not allow it
    InvalidTransition { from: SceneState, to: SceneState },
    NotRunning(SceneState),
    AssetLoad { path: String, reason: String },
    UndeclaredUniform(String),
    UniformKind { name: String, expected: &'static str },
    UnknownTarget(u32),
    Backend(String),
    Config(String),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::InvalidTransition { from, to } => {
                write!(f, "cannot move scene from {from:?} to {to:?}")
            }
            SceneError::NotRunning(state) => write!(f, "scene is not running (state: {state:?})"),
            SceneError::AssetLoad { path, reason } => {
                write!(f, "failed to load asset '{path}': {reason}")
            }
            SceneError::UndeclaredUniform(name) => {
                write!(f, "uniform '{name}' is not declared by the shader layout")
            }
            SceneError::UniformKind { name, expected } => {
                write!(f, "uniform '{name}' expects a {expected} value")
            }
            SceneError::UnknownTarget(id) => write!(f, "render target {id} does not exist"),
            SceneError::Backend(reason) => write!(f, "render backend error: {reason}"),
            SceneError::Config(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for SceneError {}

impl From<toml::de::Error> for SceneError {
    fn from(err: toml::de::Error) -> Self {
        SceneError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SceneError {
    fn from(err: toml::ser::Error) -> Self {
        SceneError::Config(err.to_string())
    }
}

impl From<std::io::Error> for SceneError {
    fn from(err: std::io::Error) -> Self {
        SceneError::Config(err.to_string())
    }
}
