//! Interactive **planar cutting** of mesh hierarchies.
//!
//! A stroke drawn on screen becomes a cutting plane; every leaf mesh of the
//! loaded model is split against it with a [BSP](mesh::bsp) boolean evaluator,
//! and the fragments are reassembled into two separated parts that can be
//! picked, dragged and exported as binary glTF.
//!
//! The pipeline, bottom-up:
//! - [`cutting::mapper`]: pointer + camera to world point
//! - [`cutting::plane_solver`]: stroke to [`CuttingPlane`]
//! - [`cutting::split`]: cooperative per-mesh split ([`SplitJob`])
//! - [`cutting::assembler`]: fragments to Part A / Part B
//! - [`interaction`]: the `View` / `Cut` / `Move` state machine
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//!
//! Logging goes through [`tracing`]; install any subscriber in the host.

#![forbid(unsafe_code)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod boolean;
pub mod config;
pub mod cutting;
pub mod errors;
pub mod float_types;
pub mod interaction;
pub mod io;
pub mod mesh;
pub mod scene;

#[cfg(any(
    all(feature = "f64", feature = "f32"),
    not(any(feature = "f64", feature = "f32"))
))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use boolean::{BooleanEvaluator, BooleanOp, Brush, BspEvaluator};
pub use config::{CutConfig, PlaneBasis};
pub use cutting::{AssembledParts, CuttingPlane, PartInfo, SplitJob};
pub use errors::{ConfigError, CutError, CutSide, ExportError};
pub use interaction::{Interaction, Mode, Notice, PointerEvent};
pub use mesh::Mesh;
pub use scene::{Camera, Material, NodeDesc, NodeId, Scene, Viewport};
