//! # Bevy Water Crate
//!
//! Meshes and materials for the water backgrounds, for Bevy 0.17.
//! Stateless: the caller owns the simulation and hands the current values in.
//!
//! ## Usage
//! ```no_run
//! use bevy::prelude::*;
//! use bevy_water::*;
//!
//! fn setup(
//!     mut commands: Commands,
//!     mut meshes: ResMut<Assets<Mesh>>,
//!     mut materials: ResMut<Assets<WaterMaterial>>,
//! ) {
//!     let plane = WaterPlaneBuilder::new(PlaneConfig {
//!         size: 10000.0,
//!         subdivisions: 128,
//!     })
//!     .build();
//!
//!     commands.spawn((
//!         Mesh3d(meshes.add(plane)),
//!         MeshMaterial3d(materials.add(WaterMaterial::default())),
//!     ));
//! }
//! ```

mod material;
mod mesh;

pub use material::{MAX_BLOBS, MetaballMaterial, MetaballParams, WATER_WAVE_SLOTS, WaterMaterial, WaterParams};
pub use mesh::{PlaneConfig, WaterPlaneBuilder, grid_mesh, render_target_image, screen_quad};
