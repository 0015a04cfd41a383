//! Dispatch phases.

use std::fmt;

/// A step of the dispatch state machine.
///
/// A successful dispatch walks
/// `Idle → Matching → ComposingChain → Resolving → Executing → Normalizing → Done`.
/// `Resolving`, `Executing` and `Normalizing` happen inside the terminal of
/// the middleware chain and are skipped when a middleware answers without
/// reaching it. Any error moves the machine to `Failed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing has happened yet.
    Idle,
    /// Looking up the route.
    Matching,
    /// Resolving global and route middleware and running it inbound.
    ComposingChain,
    /// Resolving the handler through the request scope.
    Resolving,
    /// Running the handler.
    Executing,
    /// Converting the handler's reply into a response.
    Normalizing,
    /// A response was produced.
    Done,
    /// An error was handed to the exception renderer.
    Failed,
}

impl Phase {
    /// Returns the snake_case name of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Matching => "matching",
            Self::ComposingChain => "composing_chain",
            Self::Resolving => "resolving",
            Self::Executing => "executing",
            Self::Normalizing => "normalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::ComposingChain.to_string(), "composing_chain");
        assert_eq!(Phase::Idle.as_str(), "idle");
    }

    #[test]
    fn test_terminal_phases() {
        assert!(Phase::Done.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Executing.is_terminal());
    }
}
