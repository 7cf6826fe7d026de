//! # scenekit
//!
//! Simulation, shading math and lifecycle for animated background scenes.
//! Nothing in here knows about a particular renderer: a host implements
//! [`backend::RenderBackend`] and drives a [`lifecycle::SceneController`].
//!
//! ```no_run
//! use scenekit::backend::RecordingBackend;
//! use scenekit::lifecycle::SceneController;
//! use scenekit::render_target::Viewport;
//! use scenekit::scenes::SceneKind;
//!
//! let config = scenekit::get_config();
//! let scene = SceneKind::Particles.build(&config);
//! let mut controller = SceneController::new(scene, RecordingBackend::default());
//! controller.initialize(Viewport::new(1280, 720)).unwrap();
//! controller.tick(0.016, 0.016).unwrap();
//! controller.teardown();
//! ```

pub mod backend;
pub mod bubbles;
pub mod camera;
pub mod color;
pub mod config;
pub mod entity;
pub mod error;
pub mod flock;
pub mod fog;
pub mod input;
pub mod lifecycle;
pub mod physics;
pub mod prelude;
pub mod render_target;
pub mod ripple;
pub mod scenes;
pub mod shading;
pub mod uniforms;
pub mod waves;

pub use config::{get_config, reload_config};
pub use error::SceneError;
