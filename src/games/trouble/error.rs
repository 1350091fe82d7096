/// Rejected move request. Display strings are shown to players verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Roll the die first")]
    NoActiveRoll,

    #[error("Invalid player")]
    InvalidPlayer,

    #[error("No piece selected")]
    NoPieceSelected,

    #[error("Target space required")]
    TargetRequired,

    #[error("Invalid move for this roll")]
    InvalidMove,
}

/// Turn-lifecycle request that does not fit the current decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("die value {0} is outside 1..=6")]
    RollOutOfRange(u8),

    #[error("a move choice is pending; rolling is disabled")]
    ChoicePending,

    #[error("no bring-out or board-move choice is pending")]
    NoChoicePending,

    #[error("no players seated")]
    NoPlayers,

    #[error(transparent)]
    Move(#[from] MoveError),
}
