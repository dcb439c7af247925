//! Core shared types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary a tracing subscriber is being installed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Harness,
    Analyzer,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Harness => write!(f, "harness"),
            Component::Analyzer => write!(f, "analyzer"),
        }
    }
}

/// Lifecycle state of a supervised process.
///
/// States only move forward: `Starting -> Running -> {Stopped, Failed}`.
/// `Starting` may also fail directly when the service never becomes ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    Starting,
    Running,
    Stopped,
    Failed,
}

impl ProcessState {
    /// Whether the process has reached a final state
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Stopped | ProcessState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal forward transition
    pub fn can_advance_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (Starting, Running) | (Starting, Failed) | (Starting, Stopped) | (Running, Stopped) | (Running, Failed)
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Starting => write!(f, "starting"),
            ProcessState::Running => write!(f, "running"),
            ProcessState::Stopped => write!(f, "stopped"),
            ProcessState::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_only() {
        assert!(ProcessState::Starting.can_advance_to(ProcessState::Running));
        assert!(ProcessState::Running.can_advance_to(ProcessState::Stopped));
        assert!(ProcessState::Running.can_advance_to(ProcessState::Failed));

        assert!(!ProcessState::Running.can_advance_to(ProcessState::Starting));
        assert!(!ProcessState::Stopped.can_advance_to(ProcessState::Running));
        assert!(!ProcessState::Failed.can_advance_to(ProcessState::Stopped));
        assert!(!ProcessState::Running.can_advance_to(ProcessState::Running));
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProcessState::Stopped.is_terminal());
        assert!(ProcessState::Failed.is_terminal());
        assert!(!ProcessState::Starting.is_terminal());
        assert!(!ProcessState::Running.is_terminal());
    }

    #[test]
    fn test_component_display() {
        assert_eq!(Component::Harness.to_string(), "harness");
        assert_eq!(Component::Analyzer.to_string(), "analyzer");
    }
}
