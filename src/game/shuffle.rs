// Answer shuffling with anti-repetition: players should not be able to guess
// the correct slot positionally after seeing it land in the same place twice.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::Question;
use crate::names::{MAX_SLOT_STREAK, SHUFFLE_MAX_ATTEMPTS};

/// Permutes each question's answers so the correct slot never repeats three
/// questions in a row. Best-effort: after ten failed re-rolls the current
/// permutation is accepted as-is.
pub fn shuffle_round<R: Rng>(rng: &mut R, mut questions: Vec<Question>) -> Vec<Question> {
    let mut prev_slot: Option<usize> = None;
    let mut streak = 0usize;

    for question in &mut questions {
        question.answers.shuffle(rng);

        let mut attempts = 0;
        while attempts < SHUFFLE_MAX_ATTEMPTS {
            match question.correct_slot() {
                Some(slot) if prev_slot == Some(slot) && streak >= MAX_SLOT_STREAK => {
                    question.answers.shuffle(rng);
                    attempts += 1;
                }
                _ => break,
            }
        }

        let slot = question.correct_slot();
        if slot.is_some() && slot == prev_slot {
            streak += 1;
        } else {
            prev_slot = slot;
            streak = 1;
        }
    }

    questions
}
