use crate::errors::CutError;
use crate::scene::NodeId;

/// User-visible message produced by the interaction layer. The UI drains them
/// with [`Interaction::drain_notices`](super::Interaction::drain_notices).
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(CutError),
    /// Split progress in percent.
    Progress(u8),
    /// A plane was frozen and the confirmation collaborator is being asked.
    ConfirmationRequested,
    CutCompleted { part_a: NodeId, part_b: NodeId },
}

impl Notice {
    pub const fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}
