pub use crate::backend::{InputKind, RecordingBackend, RenderBackend};
pub use crate::camera::{CameraRig, CameraSpec};
pub use crate::color::Rgb;
pub use crate::config::SceneKitConfig;
pub use crate::entity::{Entity, EntityBuffer, VisualAttributes};
pub use crate::error::SceneError;
pub use crate::lifecycle::{FrameInput, SceneController, SceneState, SceneVariant};
pub use crate::render_target::Viewport;
pub use crate::scenes::SceneKind;
