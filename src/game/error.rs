use thiserror::Error;

/// Client-engine failure taxonomy. Terminal variants carry the redirect the
/// UI layer should perform; best-effort backend failures never surface here.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("not enough lives to start a round")]
    InsufficientLives,

    #[error("not enough coins for this action")]
    InsufficientCoins,

    #[error("player session expired")]
    SessionExpired,

    #[error("could not load questions for the round")]
    QuestionLoadFailed,

    #[error("round initialization timed out")]
    InitTimeout,

    #[error("no reward videos available")]
    RewardUnavailable,

    #[error("reward settlement failed")]
    SettlementFailed,

    #[error("collaborator failure: {0}")]
    Provider(color_eyre::Report),
}

impl From<color_eyre::Report> for GameError {
    fn from(report: color_eyre::Report) -> Self {
        GameError::Provider(report)
    }
}

/// Where the UI should send the player after a terminal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Dashboard,
    Login,
}

impl GameError {
    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            GameError::SessionExpired => Some(Redirect::Login),
            GameError::InsufficientLives
            | GameError::QuestionLoadFailed
            | GameError::InitTimeout => Some(Redirect::Dashboard),
            _ => None,
        }
    }
}
