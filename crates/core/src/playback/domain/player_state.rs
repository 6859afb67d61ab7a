use std::fmt;

/// Lifecycle of a playback session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Stalled,
    Completed,
    Failed,
}

impl PlayerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlayerState::Completed | PlayerState::Failed)
    }

    /// Whether the player is actively advancing (or trying to).
    pub fn is_active(self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Stalled)
    }

    /// The legal edges of the state machine.
    ///
    /// `Loading` is reachable from anywhere because `load` starts a new
    /// session, and `Failed` is reachable from anywhere but `Idle`.
    /// `Completed -> Playing` is only taken by a loop restart.
    pub fn can_transition_to(self, next: PlayerState) -> bool {
        use PlayerState::*;
        match (self, next) {
            (_, Loading) => true,
            (_, Idle) => true,
            (Idle, Failed) => false,
            (_, Failed) => true,
            (Loading, Ready) => true,
            (Ready, Playing) | (Paused, Playing) | (Stalled, Playing) => true,
            (Completed, Playing) => true,
            (Playing, Paused) | (Stalled, Paused) => true,
            (Playing, Stalled) => true,
            (Playing, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::Idle => "idle",
            PlayerState::Loading => "loading",
            PlayerState::Ready => "ready",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Stalled => "stalled",
            PlayerState::Completed => "completed",
            PlayerState::Failed => "failed",
        };
        f.write_str(name)
    }
}
