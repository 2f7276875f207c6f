//! Spaced repetition review scheduler.
//!
//! A simplified SM-2 style update rule: each card carries an ease factor and
//! an interval in days, and every rating moves both:
//! - `Again` resets the interval to 0 and lowers the ease factor
//! - `Hard` grows the interval slowly (x1.2) and lowers the ease factor
//! - `Good` grows the interval by the ease factor
//! - `Easy` grows the interval by the ease factor with a x1.3 bonus and
//!   raises the ease factor
//!
//! The ease factor always stays within [1.3, 2.5]. Intervals are whole days
//! (growth is floored) and the next review date is the day of rating plus the
//! new interval.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lower bound for the ease factor; cards never get "harder" than this.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Upper bound (and starting value) for the ease factor.
pub const MAX_EASE_FACTOR: f64 = 2.5;

/// Ease factor assigned to new cards and to copies of shared cards.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Recall-quality grade supplied by the user when reviewing a card.
///
/// On the wire ratings are the integers 1 through 4, in increasing order of
/// recall quality. Anything outside that range is invalid input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl TryFrom<u8> for Rating {
    type Error = InvalidRating;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(InvalidRating(other)),
        }
    }
}

/// Error returned when a wire rating is not one of 1-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRating(pub u8);

impl std::fmt::Display for InvalidRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rating must be an integer from 1 to 4, got {}", self.0)
    }
}

impl std::error::Error for InvalidRating {}

/// The scheduling-relevant slice of a card's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    /// Retention difficulty multiplier in [1.3, 2.5]; lower = harder.
    pub ease_factor: f64,

    /// Days until the next scheduled review; 0 means unscheduled/new.
    pub interval: i64,

    /// When the card is next due; `None` until the first rating.
    pub next_review: Option<DateTime<Utc>>,
}

impl Default for ReviewState {
    fn default() -> Self {
        ReviewState {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 0,
            next_review: None,
        }
    }
}

/// Computes the next review state for a card given a rating.
///
/// Pure and deterministic: no I/O, no randomness, no hidden state. The
/// caller is responsible for persisting the returned state.
///
/// Out-of-domain inputs (negative interval, ease factor outside the clamp
/// range) can only come from a corrupted record; they are clamped into the
/// valid domain rather than propagated.
pub fn schedule(current: &ReviewState, rating: Rating, now: DateTime<Utc>) -> ReviewState {
    let ease = current
        .ease_factor
        .clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR);
    let interval = current.interval.max(0);

    let (new_interval, ease_delta) = match rating {
        Rating::Again => (0, -0.2),
        Rating::Hard => {
            let next = if interval == 0 {
                1
            } else {
                (interval as f64 * 1.2).floor() as i64
            };
            (next, -0.15)
        }
        Rating::Good => {
            let next = if interval == 0 {
                1
            } else {
                (interval as f64 * ease).floor() as i64
            };
            (next, 0.0)
        }
        Rating::Easy => {
            let next = if interval == 0 {
                4
            } else {
                (interval as f64 * ease * 1.3).floor() as i64
            };
            (next, 0.15)
        }
    };

    ReviewState {
        ease_factor: (ease + ease_delta).clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR),
        interval: new_interval,
        next_review: Some(now + Duration::days(new_interval)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(interval: i64, ease_factor: f64) -> ReviewState {
        ReviewState {
            ease_factor,
            interval,
            next_review: None,
        }
    }

    #[test]
    fn test_again_on_new_card() {
        let next = schedule(&state(0, 2.5), Rating::Again, Utc::now());
        assert_eq!(next.interval, 0);
        assert!((next.ease_factor - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_good_on_new_card() {
        let next = schedule(&state(0, 2.5), Rating::Good, Utc::now());
        assert_eq!(next.interval, 1);
        assert!((next.ease_factor - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_easy_on_new_card_clamps_ease() {
        let next = schedule(&state(0, 2.5), Rating::Easy, Utc::now());
        assert_eq!(next.interval, 4);
        // 2.5 + 0.15 exceeds the maximum and gets clamped back
        assert!((next.ease_factor - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_hard_grows_slowly() {
        let next = schedule(&state(10, 2.5), Rating::Hard, Utc::now());
        assert_eq!(next.interval, 12);
        assert!((next.ease_factor - 2.35).abs() < 1e-9);
    }

    #[test]
    fn test_good_multiplies_by_ease() {
        let next = schedule(&state(10, 2.0), Rating::Good, Utc::now());
        assert_eq!(next.interval, 20);
        assert!((next.ease_factor - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_again_clamps_ease_at_minimum() {
        let next = schedule(&state(10, 1.35), Rating::Again, Utc::now());
        assert_eq!(next.interval, 0);
        assert!((next.ease_factor - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_hard_on_new_card() {
        let next = schedule(&state(0, 2.5), Rating::Hard, Utc::now());
        assert_eq!(next.interval, 1);
        assert!((next.ease_factor - 2.35).abs() < 1e-9);
    }

    #[test]
    fn test_easy_compounds_with_bonus() {
        let next = schedule(&state(10, 2.0), Rating::Easy, Utc::now());
        // floor(10 * 2.0 * 1.3) = 26
        assert_eq!(next.interval, 26);
        assert!((next.ease_factor - 2.15).abs() < 1e-9);
    }

    #[test]
    fn test_next_review_is_now_plus_interval_days() {
        let now = Utc::now();
        let next = schedule(&state(10, 2.0), Rating::Good, now);
        assert_eq!(next.next_review, Some(now + Duration::days(20)));
    }

    #[test]
    fn test_corrupted_state_is_clamped_on_read() {
        // Negative interval and out-of-range ease can only come from a bad
        // record; schedule treats them as 0 and the nearest bound.
        let next = schedule(&state(-5, 9.0), Rating::Good, Utc::now());
        assert_eq!(next.interval, 1);
        assert!((next.ease_factor - 2.5).abs() < 1e-9);

        let next = schedule(&state(10, 0.1), Rating::Good, Utc::now());
        assert_eq!(next.interval, 13); // floor(10 * 1.3)
        assert!((next.ease_factor - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_hold_for_all_ratings() {
        let now = Utc::now();
        for rating in [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy] {
            for interval in [0, 1, 7, 365] {
                for ease in [1.3, 1.8, 2.5] {
                    let next = schedule(&state(interval, ease), rating, now);
                    assert!(next.interval >= 0);
                    assert!(next.ease_factor >= MIN_EASE_FACTOR);
                    assert!(next.ease_factor <= MAX_EASE_FACTOR);
                    assert_eq!(next.next_review, Some(now + Duration::days(next.interval)));
                }
            }
        }
    }

    #[test]
    fn test_schedule_is_pure() {
        let now = Utc::now();
        let current = state(6, 2.1);
        let a = schedule(&current, Rating::Easy, now);
        let b = schedule(&current, Rating::Easy, now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_wire_rating_is_rejected() {
        assert_eq!(Rating::try_from(3), Ok(Rating::Good));
        assert!(Rating::try_from(0).is_err());
        assert!(Rating::try_from(5).is_err());
    }
}
