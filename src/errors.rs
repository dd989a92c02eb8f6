//! Error types for the cutting core, configuration and export.

use crate::interaction::Mode;
use crate::scene::NodeId;
use std::fmt::Display;

/// Which side of the cutting plane a fragment or part belongs to.
///
/// `Subtraction` keeps the half-space in front of the plane normal (Part A),
/// `Intersection` keeps the half-space behind it (Part B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CutSide {
    Subtraction,
    Intersection,
}

impl CutSide {
    /// Human readable part label.
    pub const fn label(self) -> &'static str {
        match self {
            CutSide::Subtraction => "Part A",
            CutSide::Intersection => "Part B",
        }
    }
}

impl Display for CutSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CutSide::Subtraction => write!(f, "subtraction"),
            CutSide::Intersection => write!(f, "intersection"),
        }
    }
}

/// Every failure the cutting workflow can report.
///
/// None of these are fatal: the interaction layer turns each one into a
/// [`Notice`](crate::interaction::Notice) and falls back to a well-defined state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CutError {
    // -- input errors
    #[error("no model is loaded")]
    NoModel,

    #[error("invalid cutting points: {0}")]
    InvalidCuttingPoints(String),

    #[error("cutting plane is degenerate: the drag runs parallel to the reference axis")]
    DegenerateCuttingPlane,

    #[error("no cutting plane has been drawn")]
    NoCuttingPlane,

    #[error("scene node {0:?} does not exist")]
    MissingNode(NodeId),

    // -- geometry errors
    #[error("transform of `{0}` is not invertible")]
    SingularTransform(String),

    #[error("boolean evaluation of `{mesh}` failed: {reason}")]
    Evaluation { mesh: String, reason: String },

    #[error("cut failed: the {0} side is empty")]
    OneSideEmpty(CutSide),

    #[error("part assembly failed: {0}")]
    Assembly(String),

    // -- state errors
    #[error("a cut is already in progress")]
    CutInProgress,

    #[error("one cut only: this model has already been cut, load a new model to cut again")]
    OneCutOnly,

    #[error("cannot switch from {from:?} to {to:?}: {reason}")]
    ModeRejected { from: Mode, to: Mode, reason: String },

    // -- export errors
    #[error("no part is selected")]
    NoSelection,

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Errors raised while serializing a part to binary glTF.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    #[error("part has no geometry to export")]
    EmptyPart,

    #[error("failed to encode glTF JSON chunk: {0}")]
    Json(String),

    #[error("binary buffer exceeds the 4 GiB glTF limit")]
    BufferTooLarge,
}

impl From<serde_json::Error> for ExportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

/// Errors raised while loading or validating a [`CutConfig`](crate::config::CutConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
