//! Escape-hatch gesture.
//!
//! Rapid repeated back presses open the admin-password prompt. The gesture
//! is the only way to reach the prompt from the restricted surface, and it
//! is not a navigable action: the prompt is rendered inside this app's own
//! package, so surface correction never treats it as leaving the kiosk.

/// Presses further apart than this restart the count.
pub const PRESS_WINDOW_MS: i64 = 1000;

/// Consecutive presses required to open the prompt.
pub const PRESS_THRESHOLD: u32 = 5;

/// Result of a single press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// The press was counted; `count` presses are in the current run.
    Counting {
        /// Presses in the current run, including this one.
        count: u32,
    },
    /// The threshold was reached; show the admin prompt.
    PromptRequested,
}

/// Back-press counter state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackPressCounter {
    /// Presses in the current run.
    pub count: u32,
    /// Timestamp of the previous press in milliseconds.
    pub last_timestamp_ms: Option<i64>,
}

/// Counts back presses and decides when to open the admin prompt.
#[derive(Debug, Clone, Default)]
pub struct EscapeHatch {
    counter: BackPressCounter,
}

impl EscapeHatch {
    /// Creates a gesture with an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a press at `now_ms`.
    ///
    /// A press less than [`PRESS_WINDOW_MS`] after the previous one extends
    /// the run; anything else (including a clock that moved backwards or a
    /// gap too large to represent) starts a new run at 1. The run that reaches [`PRESS_THRESHOLD`]
    /// resets the count to 0 and requests the prompt.
    pub fn press(&mut self, now_ms: i64) -> GestureOutcome {
        let within_window = self
            .counter
            .last_timestamp_ms
            .and_then(|last| now_ms.checked_sub(last))
            .is_some_and(|gap| (0..PRESS_WINDOW_MS).contains(&gap));

        self.counter.count = if within_window {
            self.counter.count.saturating_add(1)
        } else {
            1
        };
        self.counter.last_timestamp_ms = Some(now_ms);

        if self.counter.count >= PRESS_THRESHOLD {
            self.counter.count = 0;
            return GestureOutcome::PromptRequested;
        }

        GestureOutcome::Counting {
            count: self.counter.count,
        }
    }

    /// Current counter state.
    #[must_use]
    pub const fn counter(&self) -> BackPressCounter {
        self.counter
    }

    /// Clears the counter.
    pub fn reset(&mut self) {
        self.counter = BackPressCounter::default();
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn quick_runs_of_five_always_prompt(
            start in 0i64..1_000_000_000,
            gaps in proptest::collection::vec(0i64..PRESS_WINDOW_MS, 4),
        ) {
            let mut hatch = EscapeHatch::new();
            let mut t = start;
            let mut outcomes = vec![hatch.press(t)];
            for gap in gaps {
                t += gap;
                outcomes.push(hatch.press(t));
            }
            prop_assert_eq!(outcomes.last().copied(), Some(GestureOutcome::PromptRequested));
            prop_assert_eq!(
                outcomes.iter().filter(|o| **o == GestureOutcome::PromptRequested).count(),
                1
            );
            prop_assert_eq!(hatch.counter().count, 0);
        }

        #[test]
        fn one_slow_gap_prevents_prompt(
            gaps in proptest::collection::vec(0i64..PRESS_WINDOW_MS, 4),
            slow_index in 0usize..4,
            slow_gap in PRESS_WINDOW_MS..10 * PRESS_WINDOW_MS,
        ) {
            let mut hatch = EscapeHatch::new();
            let mut t = 0;
            let mut prompted = hatch.press(t) == GestureOutcome::PromptRequested;
            for (i, gap) in gaps.into_iter().enumerate() {
                t += if i == slow_index { slow_gap } else { gap };
                prompted |= hatch.press(t) == GestureOutcome::PromptRequested;
            }
            prop_assert!(!prompted);
        }
    }
}
