// Client-side game engine: round lifecycle, answer shuffling, and the
// ad-reward flow. Server collaborators are injected through the ports in
// `crate::services`.

pub mod error;
pub mod queue;
pub mod reward;
pub mod session;
pub mod shuffle;

pub use error::{GameError, Redirect};
pub use queue::RewardVideoQueue;
pub use reward::{RewardFlow, RewardSession};
pub use session::{Advance, GameSession, GameSessionController, RoundPhase};
