pub const RESULT_URL: &str = "/game/result";
pub const REWARD_SETTLE_URL: &str = "/reward/settle";

pub const SESSION_TOKEN_HEADER: &str = "x-session-token";
pub const USER_SESSION_COOKIE_NAME: &str = "user_session";

// Round shape
pub const ROUND_LENGTH: usize = 15;
pub const ANSWERS_PER_QUESTION: usize = 3;
pub const RESULT_CATEGORY: &str = "trivia";

// Shuffle policy: re-roll when the correct slot would land in the same
// position three questions in a row.
pub const MAX_SLOT_STREAK: usize = 2;
pub const SHUFFLE_MAX_ATTEMPTS: usize = 10;

// Reward video queue
pub const VIDEO_QUEUE_TARGET: usize = 20;
pub const VIDEO_QUEUE_REFILL_THRESHOLD: usize = 5;
pub const ADS_FOR_DOUBLE: usize = 1;
pub const ADS_FOR_REFILL: usize = 2;

// Timings
pub const INIT_TIMEOUT_MS: u64 = 5_000;
pub const INIT_FAILURE_READ_DELAY_MS: u64 = 2_000;
pub const ADVANCE_SAFETY_TIMER_MS: u64 = 2_000;
pub const QUESTION_TRANSITION_DELAY_MS: u64 = 150;

// Result recording
pub const DUPLICATE_RESULT_WINDOW_SECS: i64 = 10;
pub const MAX_AVG_RESPONSE_TIME_MS: f64 = 30_000.0;
pub const RESULT_RATE_WINDOW_SECS: i64 = 60;
pub const RESULT_RATE_LIMIT: i64 = 10;

/// Numeric policy for paid actions and per-question earnings. Values are
/// data, not logic: the bands index by question position (0-4, 5-9, 10-14).
#[derive(Debug, Clone, Copy)]
pub struct CostSchedule {
    pub skip_cost: [i64; 3],
    pub mistake_continue_cost: i64,
    pub timeout_continue_cost: i64,
    pub coins_per_correct: [i64; 3],
}

pub const DEFAULT_COSTS: CostSchedule = CostSchedule {
    skip_cost: [10, 20, 30],
    mistake_continue_cost: 20,
    timeout_continue_cost: 15,
    coins_per_correct: [1, 2, 3],
};

impl CostSchedule {
    fn band(question_idx: usize) -> usize {
        (question_idx / 5).min(2)
    }

    pub fn skip_cost_at(&self, question_idx: usize) -> i64 {
        self.skip_cost[Self::band(question_idx)]
    }

    pub fn coins_for_correct_at(&self, question_idx: usize) -> i64 {
        self.coins_per_correct[Self::band(question_idx)]
    }

    /// Informational round payout used by result recording. The endpoint only
    /// knows the total correct count, so answers are assumed to fill bands
    /// from the start of the round.
    pub fn coins_for_round(&self, correct_answers: i64) -> i64 {
        (0..correct_answers.max(0) as usize)
            .map(|idx| self.coins_for_correct_at(idx))
            .sum()
    }
}
