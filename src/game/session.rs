// The 15-question round lifecycle. All backend collaborators are injected;
// the controller owns the round state machine and the only compensating
// transaction in the system (the init-timeout life refund).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use ulid::Ulid;

use crate::game::error::GameError;
use crate::game::shuffle::shuffle_round;
use crate::models::{Question, QuestionAnalytics};
use crate::names::{
    self, CostSchedule, ADVANCE_SAFETY_TIMER_MS, INIT_TIMEOUT_MS, QUESTION_TRANSITION_DELAY_MS,
    ROUND_LENGTH,
};
use crate::services::{
    AuthExpired, ProfileService, QuestionProvider, ResultSink, RoundOutcome, WalletService,
    WALLET_CHANGED_TOPIC,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Starting,
    Playing,
    MistakeBanner,
    TimeoutBanner,
    Completed,
    Restarting,
}

/// Per-round state. One active instance per player.
#[derive(Debug, Clone, Default)]
pub struct GameSession {
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub correct_answers: usize,
    pub response_times: Vec<f64>,
    pub answer_results: Vec<bool>,
    pub coins_earned: i64,
    pub game_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next { index: usize },
    Completed,
    /// A concurrent advance was already in flight; this one was dropped.
    Ignored,
}

struct ControllerState {
    phase: RoundPhase,
    session: GameSession,
    prefetched_questions: Option<Vec<Question>>,
    /// Set once the round's reward has been credited, by either the result
    /// recording path or a doubled ad claim. Guards against double credit.
    result_recorded: bool,
    /// Shown when a round is abandoned before natural completion.
    coin_loss_warning: bool,
    /// Terminal error raised by a background start task on the instant path.
    pending_error: Option<GameError>,
    language: String,
}

pub struct GameSessionController {
    wallet: Arc<dyn WalletService>,
    questions: Arc<dyn QuestionProvider>,
    profile: Arc<dyn ProfileService>,
    recorder: Arc<dyn ResultSink>,
    costs: CostSchedule,
    state: Mutex<ControllerState>,
    advancing: AtomicBool,
    start_handle: Mutex<Option<JoinHandle<Result<Vec<Question>, GameError>>>>,
    rng: Mutex<StdRng>,
}

impl GameSessionController {
    pub fn new(
        wallet: Arc<dyn WalletService>,
        questions: Arc<dyn QuestionProvider>,
        profile: Arc<dyn ProfileService>,
        recorder: Arc<dyn ResultSink>,
        language: impl Into<String>,
    ) -> Arc<Self> {
        Self::with_rng(
            wallet,
            questions,
            profile,
            recorder,
            language,
            StdRng::from_entropy(),
        )
    }

    pub fn with_rng(
        wallet: Arc<dyn WalletService>,
        questions: Arc<dyn QuestionProvider>,
        profile: Arc<dyn ProfileService>,
        recorder: Arc<dyn ResultSink>,
        language: impl Into<String>,
        rng: StdRng,
    ) -> Arc<Self> {
        Arc::new(Self {
            wallet,
            questions,
            profile,
            recorder,
            costs: names::DEFAULT_COSTS,
            state: Mutex::new(ControllerState {
                phase: RoundPhase::Idle,
                session: GameSession::default(),
                prefetched_questions: None,
                result_recorded: false,
                coin_loss_warning: false,
                pending_error: None,
                language: language.into(),
            }),
            advancing: AtomicBool::new(false),
            start_handle: Mutex::new(None),
            rng: Mutex::new(rng),
        })
    }

    pub fn phase(&self) -> RoundPhase {
        self.state.lock().unwrap().phase
    }

    pub fn session(&self) -> GameSession {
        self.state.lock().unwrap().session.clone()
    }

    pub fn coin_loss_warning(&self) -> bool {
        self.state.lock().unwrap().coin_loss_warning
    }

    /// Terminal error raised by a background start task, if any. Taking it
    /// clears it.
    pub fn take_pending_error(&self) -> Option<GameError> {
        self.state.lock().unwrap().pending_error.take()
    }

    pub fn set_prefetched(&self, questions: Vec<Question>) {
        self.state.lock().unwrap().prefetched_questions = Some(questions);
    }

    pub fn has_prefetched(&self) -> bool {
        self.state.lock().unwrap().prefetched_questions.is_some()
    }

    /// Starts a round. No-op while another start is already underway.
    ///
    /// With `use_prefetched` and a prefetched pool available, the round is
    /// installed synchronously and the backend sequence runs in the
    /// background; the UI never waits. Otherwise the sequence gates the round
    /// and `skip_intro` decides whether we await it here or leave it racing
    /// the intro video (see [`Self::on_intro_end`]).
    pub async fn start(
        self: &Arc<Self>,
        skip_intro: bool,
        use_prefetched: bool,
    ) -> Result<(), GameError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.phase == RoundPhase::Starting {
                return Ok(());
            }

            if use_prefetched {
                if let Some(pool) = state.prefetched_questions.take() {
                    let shuffled = {
                        let mut rng = self.rng.lock().unwrap();
                        shuffle_round(&mut *rng, pool)
                    };
                    state.session = GameSession {
                        questions: shuffled,
                        ..GameSession::default()
                    };
                    state.result_recorded = false;
                    state.coin_loss_warning = false;
                    state.phase = RoundPhase::Playing;
                    drop(state);

                    let controller = Arc::clone(self);
                    tokio::spawn(async move {
                        if let Err(e) = controller.run_backend_sequence(false).await {
                            tracing::error!("background round start failed: {e}");
                            let mut state = controller.state.lock().unwrap();
                            state.session = GameSession::default();
                            state.phase = RoundPhase::Idle;
                            state.pending_error = Some(e);
                        }
                    });
                    return Ok(());
                }
            }

            state.phase = RoundPhase::Starting;
        }

        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move { controller.run_backend_sequence(true).await });
        *self.start_handle.lock().unwrap() = Some(handle);

        if skip_intro {
            self.on_intro_end().await
        } else {
            Ok(())
        }
    }

    /// Reset helpers, spend a life, resync the wallet, then (for the normal
    /// path) fetch questions in parallel with the profile refresh. Best-effort
    /// steps log and continue; life spend and question load are the gates.
    async fn run_backend_sequence(
        self: &Arc<Self>,
        fetch_questions: bool,
    ) -> Result<Vec<Question>, GameError> {
        if let Err(e) = self.profile.reset_helpers().await {
            tracing::warn!("helper reset failed: {e}");
        }

        match self.wallet.spend_life().await {
            Ok(true) => {}
            Ok(false) => return Err(GameError::InsufficientLives),
            Err(e) => return Err(classify(e)),
        }

        if let Err(e) = self.wallet.fetch_wallet().await {
            tracing::warn!("wallet resync failed: {e}");
        }
        self.wallet.broadcast(
            WALLET_CHANGED_TOPIC,
            serde_json::json!({ "source": "round_start" }),
        );

        let language = self.state.lock().unwrap().language.clone();
        let questions = if fetch_questions {
            let (fetched, profile) = tokio::join!(
                self.questions.fetch_round(&language),
                self.profile.refresh()
            );
            if let Err(e) = profile {
                tracing::warn!("profile refresh failed: {e}");
            }
            match fetched {
                Ok(questions) if round_is_well_formed(&questions) => questions,
                Ok(questions) => {
                    tracing::error!(
                        "question provider returned a malformed round of {}",
                        questions.len()
                    );
                    return Err(GameError::QuestionLoadFailed);
                }
                Err(e) => {
                    if e.downcast_ref::<AuthExpired>().is_some() {
                        return Err(GameError::SessionExpired);
                    }
                    tracing::error!("question fetch failed: {e}");
                    return Err(GameError::QuestionLoadFailed);
                }
            }
        } else {
            if let Err(e) = self.profile.refresh().await {
                tracing::warn!("profile refresh failed: {e}");
            }
            Vec::new()
        };

        if let Err(e) = self.profile.credit_start_reward().await {
            tracing::warn!("start reward credit failed: {e}");
        }

        Ok(questions)
    }

    /// Called when the loading interstitial ends. Races the pending backend
    /// sequence against a 5 s timeout; on timeout the spent life is refunded
    /// with a timestamp-derived idempotency key before the player is sent
    /// back to the dashboard.
    pub async fn on_intro_end(self: &Arc<Self>) -> Result<(), GameError> {
        let Some(handle) = self.start_handle.lock().unwrap().take() else {
            return Ok(());
        };

        let outcome =
            tokio::time::timeout(Duration::from_millis(INIT_TIMEOUT_MS), handle).await;

        match outcome {
            Ok(Ok(Ok(questions))) => {
                let shuffled = {
                    let mut rng = self.rng.lock().unwrap();
                    shuffle_round(&mut *rng, questions)
                };
                let mut state = self.state.lock().unwrap();
                state.session = GameSession {
                    questions: shuffled,
                    ..GameSession::default()
                };
                state.result_recorded = false;
                state.coin_loss_warning = false;
                state.phase = RoundPhase::Playing;
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                self.state.lock().unwrap().phase = RoundPhase::Idle;
                Err(e)
            }
            Ok(Err(join_error)) => {
                tracing::error!("start task panicked: {join_error}");
                self.state.lock().unwrap().phase = RoundPhase::Idle;
                Err(GameError::QuestionLoadFailed)
            }
            Err(_elapsed) => {
                tracing::error!("round init exceeded {INIT_TIMEOUT_MS}ms, refunding life");
                self.refund_spent_life().await;
                self.state.lock().unwrap().phase = RoundPhase::Idle;
                // Give the player time to read the failure message before the
                // redirect the caller performs.
                tokio::time::sleep(Duration::from_millis(names::INIT_FAILURE_READ_DELAY_MS))
                    .await;
                Err(GameError::InitTimeout)
            }
        }
    }

    async fn refund_spent_life(&self) {
        let key = format!("init-refund-{}", Ulid::new());
        if let Err(e) = self.wallet.credit_lives(1, "init_timeout_refund", &key).await {
            tracing::error!("compensating life refund failed: {e}");
        }
        if let Err(e) = self.wallet.fetch_wallet().await {
            tracing::warn!("wallet resync after refund failed: {e}");
        }
        self.wallet.broadcast(
            WALLET_CHANGED_TOPIC,
            serde_json::json!({ "source": "init_timeout_refund" }),
        );
    }

    /// Records the outcome of the current question. A wrong answer moves the
    /// round into the mistake banner; `advance` is still required to move on.
    pub fn record_answer(&self, is_correct: bool, response_time_secs: f64) {
        let mut state = self.state.lock().unwrap();
        let idx = state.session.current_question_index;
        state.session.answer_results.push(is_correct);
        state.session.response_times.push(response_time_secs);
        if is_correct {
            state.session.correct_answers += 1;
            state.session.coins_earned += self.costs.coins_for_correct_at(idx);
        } else {
            state.phase = RoundPhase::MistakeBanner;
        }
    }

    /// Records a question timeout and shows the timeout banner.
    pub fn record_timeout(&self) {
        let mut state = self.state.lock().unwrap();
        state.session.answer_results.push(false);
        state.session.response_times.push(0.0);
        state.phase = RoundPhase::TimeoutBanner;
    }

    /// Moves to the next question, or completes the round on the last one.
    /// Re-entrant calls are dropped; a safety timer releases the guard if the
    /// normal path never finishes.
    pub async fn advance(self: &Arc<Self>) -> Result<Advance, GameError> {
        if self.advancing.swap(true, Ordering::SeqCst) {
            return Ok(Advance::Ignored);
        }

        let controller = Arc::clone(self);
        let safety = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ADVANCE_SAFETY_TIMER_MS)).await;
            if controller.advancing.swap(false, Ordering::SeqCst) {
                tracing::warn!("advance guard released by safety timer");
            }
        });

        let at_last = {
            let state = self.state.lock().unwrap();
            state.session.current_question_index + 1 >= state.session.questions.len()
        };

        let result = if at_last {
            let mut state = self.state.lock().unwrap();
            state.session.game_completed = true;
            state.phase = RoundPhase::Completed;
            Ok(Advance::Completed)
        } else {
            // Cosmetic transition pacing only.
            tokio::time::sleep(Duration::from_millis(QUESTION_TRANSITION_DELAY_MS)).await;
            let mut state = self.state.lock().unwrap();
            state.session.current_question_index += 1;
            state.phase = RoundPhase::Playing;
            Ok(Advance::Next {
                index: state.session.current_question_index,
            })
        };

        safety.abort();
        self.advancing.store(false, Ordering::SeqCst);
        result
    }

    /// Paid skip. The cost escalates by question band; on insufficient coins
    /// the skip is refused and the round continues unchanged.
    pub async fn skip(self: &Arc<Self>) -> Result<Advance, GameError> {
        let idx = self.state.lock().unwrap().session.current_question_index;
        let cost = self.costs.skip_cost_at(idx);

        match self.wallet.spend_coins(cost).await {
            Ok(true) => {}
            Ok(false) => return Err(GameError::InsufficientCoins),
            Err(e) => return Err(classify(e)),
        }

        {
            let mut state = self.state.lock().unwrap();
            state.session.answer_results.push(false);
            state.session.response_times.push(0.0);
        }
        self.advance().await
    }

    /// Paid continuation after a wrong answer. Insufficient balance ends the
    /// round; there is no retry at that point.
    pub async fn continue_after_mistake(&self) -> Result<(), GameError> {
        self.paid_continue(self.costs.mistake_continue_cost).await
    }

    /// Paid continuation after a question timeout.
    pub async fn continue_after_timeout(&self) -> Result<(), GameError> {
        self.paid_continue(self.costs.timeout_continue_cost).await
    }

    async fn paid_continue(&self, cost: i64) -> Result<(), GameError> {
        match self.wallet.spend_coins(cost).await {
            Ok(true) => {
                self.state.lock().unwrap().phase = RoundPhase::Playing;
                Ok(())
            }
            Ok(false) => {
                // The round ends here, but not all 15 questions were
                // resolved, so `game_completed` stays false.
                self.state.lock().unwrap().phase = RoundPhase::Completed;
                Err(GameError::InsufficientCoins)
            }
            Err(e) => Err(classify(e)),
        }
    }

    /// Marks the completed round's reward as already credited through the ad
    /// double-reward flow, so the restart path skips result recording.
    pub fn mark_reward_claimed(&self) {
        self.state.lock().unwrap().result_recorded = true;
    }

    /// Sends the completed round to the result recorder exactly once.
    pub async fn settle_round_if_needed(&self) -> Result<(), GameError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            if state.phase != RoundPhase::Completed || state.result_recorded {
                return Ok(());
            }
            state.result_recorded = true;

            let times = &state.session.response_times;
            let average_response_time_ms = if times.is_empty() {
                0.0
            } else {
                times.iter().sum::<f64>() * 1000.0 / times.len() as f64
            };

            let analytics = state
                .session
                .questions
                .iter()
                .zip(state.session.answer_results.iter())
                .zip(state.session.response_times.iter())
                .map(|((q, &is_correct), &secs)| QuestionAnalytics {
                    question_id: q.id,
                    topic_id: q.topic_id,
                    is_correct,
                    response_time_ms: (secs * 1000.0) as i64,
                })
                .collect();

            RoundOutcome {
                correct_answers: state.session.correct_answers as i64,
                total_questions: state.session.questions.len() as i64,
                average_response_time_ms,
                analytics,
            }
        };

        if let Err(e) = self.recorder.record_round(&outcome).await {
            // Best-effort: the incremental per-answer credits already landed.
            tracing::warn!("result recording failed: {e}");
        }
        Ok(())
    }

    /// Instant restart. All per-round state is reset under a single lock so
    /// no stale question is ever visible, then the prefetched pool (when
    /// present) makes the new round ready before any backend call resolves.
    ///
    /// The coin-loss warning is applied after the new round is installed,
    /// since installation clears it.
    pub async fn restart(self: &Arc<Self>) -> Result<(), GameError> {
        self.settle_round_if_needed().await?;

        let abandoned = {
            let mut state = self.state.lock().unwrap();
            let abandoned =
                !state.session.game_completed && !state.session.questions.is_empty();
            state.session = GameSession::default();
            state.result_recorded = false;
            state.phase = RoundPhase::Restarting;
            abandoned
        };

        let started = self.start(true, true).await;
        self.state.lock().unwrap().coin_loss_warning = abandoned;
        started
    }

    /// Fetches a question pool for the next round in the background.
    pub fn prefetch_next_round(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let language = controller.state.lock().unwrap().language.clone();
            match controller.questions.fetch_round(&language).await {
                Ok(questions) if round_is_well_formed(&questions) => {
                    controller.state.lock().unwrap().prefetched_questions = Some(questions);
                    tracing::info!("prefetched next round");
                }
                Ok(questions) => {
                    tracing::warn!(
                        "prefetch returned a malformed round of {}, discarded",
                        questions.len()
                    );
                }
                Err(e) => {
                    tracing::warn!("prefetch failed: {e}");
                }
            }
        })
    }
}

/// A playable round is exactly 15 questions with 3 answers each.
fn round_is_well_formed(questions: &[Question]) -> bool {
    questions.len() == ROUND_LENGTH
        && questions
            .iter()
            .all(|q| q.answers.len() == names::ANSWERS_PER_QUESTION)
}

fn classify(report: color_eyre::Report) -> GameError {
    if report.downcast_ref::<AuthExpired>().is_some() {
        GameError::SessionExpired
    } else {
        GameError::Provider(report)
    }
}
