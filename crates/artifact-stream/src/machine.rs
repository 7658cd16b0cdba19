//! Artifact lifecycle state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │      Idle       │ (initial)
//! └────────┬────────┘
//!          │ Push
//!          ▼
//! ┌─────────────────┐
//! │     Loading     │
//! └────────┬────────┘
//!          │ Push
//!          ▼
//! ┌─────────────────┐
//! │    Streaming    │ ◄── Push / Progress
//! └────────┬────────┘
//!          │
//!          │ Complete                Fail (any non-terminal state)
//!          ▼                                    ▼
//! ┌─────────────────┐               ┌─────────────────┐
//! │    Complete     │               │      Error      │
//! └─────────────────┘               └─────────────────┘
//! ```
//!
//! `Complete` and `Error` have no outgoing transitions; consuming any input
//! there fails.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub artifact_machine(Idle)

    Idle => {
        Push => Loading,
        Progress => Idle,
        Complete => Complete,
        Fail => Error
    },
    Loading => {
        Push => Streaming,
        Progress => Loading,
        Complete => Complete,
        Fail => Error
    },
    Streaming => {
        Push => Streaming,
        Progress => Streaming,
        Complete => Complete,
        Fail => Error
    }
}

pub use artifact_machine::Input as ArtifactMachineInput;
pub use artifact_machine::State as ArtifactMachineState;
pub use artifact_machine::StateMachine as ArtifactMachine;

/// Public lifecycle status of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Created, no payload yet.
    Idle,
    /// First partial payload received.
    Loading,
    /// Further partial payloads are arriving.
    Streaming,
    /// Validated against the full schema. Terminal.
    Complete,
    /// Failed, cancelled or timed out. Terminal.
    Error,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ArtifactMachineState> for ArtifactStatus {
    fn from(state: &ArtifactMachineState) -> Self {
        match state {
            ArtifactMachineState::Idle => ArtifactStatus::Idle,
            ArtifactMachineState::Loading => ArtifactStatus::Loading,
            ArtifactMachineState::Streaming => ArtifactStatus::Streaming,
            ArtifactMachineState::Complete => ArtifactStatus::Complete,
            ArtifactMachineState::Error => ArtifactStatus::Error,
        }
    }
}
