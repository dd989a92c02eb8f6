//! The cutting pipeline: stroke mapping, plane derivation, per-mesh split and
//! part assembly.

pub mod assembler;
pub mod mapper;
pub mod plane_solver;
pub mod split;

pub use assembler::{AssembledParts, PartInfo, assemble};
pub use mapper::{MapContext, map_pointer};
pub use plane_solver::{CuttingPlane, PlaneIndicator, solve};
pub use split::{Fragment, SplitJob, SplitOutput, SplitProgress, plane_in_mesh_frame};
