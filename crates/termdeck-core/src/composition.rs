//! Enter-key handling around input-method composition
//!
//! An IME commits its candidate with Enter, and some platforms deliver that
//! Enter to the text field right after the composition ends. Treating it as
//! a submit would send half-typed text, so Enter is swallowed while composing
//! and for a short grace window afterwards.

use std::time::{Duration, Instant};

/// How long after a composition ends Enter is still ignored
pub const COMPOSITION_GRACE: Duration = Duration::from_millis(100);

/// What the footer should do with an Enter press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterAction {
    /// Send the text
    Submit,
    /// Insert a line break
    InsertNewline,
    /// Ignore the key
    Suppress,
}

/// Tracks composition state for one text field
#[derive(Debug, Clone, Default)]
pub struct CompositionFilter {
    composing: bool,
    ended_at: Option<Instant>,
}

impl CompositionFilter {
    /// Filter with no composition in progress
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An input method started composing
    pub fn composition_start(&mut self) {
        self.composing = true;
    }

    /// The input method committed or cancelled
    pub fn composition_end(&mut self, now: Instant) {
        self.composing = false;
        self.ended_at = Some(now);
    }

    /// Whether a composition is in progress
    #[must_use]
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Decide what an Enter press means
    #[must_use]
    pub fn on_enter(&self, shift: bool, now: Instant) -> EnterAction {
        if shift {
            return EnterAction::InsertNewline;
        }
        if self.composing {
            return EnterAction::Suppress;
        }
        match self.ended_at {
            Some(ended) if now.saturating_duration_since(ended) < COMPOSITION_GRACE => {
                EnterAction::Suppress
            }
            _ => EnterAction::Submit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_enter_submits() {
        let filter = CompositionFilter::new();
        assert_eq!(filter.on_enter(false, Instant::now()), EnterAction::Submit);
    }

    #[test]
    fn test_shift_enter_always_inserts_newline() {
        let mut filter = CompositionFilter::new();
        let now = Instant::now();
        assert_eq!(filter.on_enter(true, now), EnterAction::InsertNewline);
        filter.composition_start();
        assert_eq!(filter.on_enter(true, now), EnterAction::InsertNewline);
    }

    #[test]
    fn test_enter_while_composing_is_suppressed() {
        let mut filter = CompositionFilter::new();
        filter.composition_start();
        assert!(filter.is_composing());
        assert_eq!(filter.on_enter(false, Instant::now()), EnterAction::Suppress);
    }

    #[test]
    fn test_grace_window_after_composition() {
        let mut filter = CompositionFilter::new();
        let t0 = Instant::now();
        filter.composition_start();
        filter.composition_end(t0);

        assert_eq!(
            filter.on_enter(false, t0 + Duration::from_millis(99)),
            EnterAction::Suppress
        );
        assert_eq!(
            filter.on_enter(false, t0 + Duration::from_millis(100)),
            EnterAction::Submit
        );
    }
}
