use std::fmt::Display;

/// Interaction mode of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Orbit only, pointer events are left to the camera controls.
    #[default]
    View,
    /// Strokes define a cutting plane; orbiting is disabled.
    Cut,
    /// Parts can be picked and dragged.
    Move,
}

impl Mode {
    pub const fn orbit_enabled(self) -> bool {
        !matches!(self, Mode::Cut)
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::View => write!(f, "view"),
            Mode::Cut => write!(f, "cut"),
            Mode::Move => write!(f, "move"),
        }
    }
}
