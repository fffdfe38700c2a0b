//! Scan state machine and mutation debouncing

use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
}

/// What asked for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Bootstrap,
    /// Back/forward navigation.
    History,
    /// Same-document `#fragment` navigation.
    HashChange,
    /// The page became visible again.
    Visibility,
    /// A debounced burst of relevant DOM mutations.
    Mutation,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Bootstrap => "bootstrap",
            Trigger::History => "popstate",
            Trigger::HashChange => "hashchange",
            Trigger::Visibility => "visibility",
            Trigger::Mutation => "mutation",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a trigger did not start a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadyScanning,
    Cooldown,
    Hidden,
}

/// Process-wide scan bookkeeping, owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct ScanState {
    phase: Phase,
    last_start: Option<Instant>,
    last_signature: Option<String>,
    /// Full detection passes, not counting skipped ones.
    pub passes: usize,
}

impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanState {
    pub fn new() -> Self {
        Self { phase: Phase::Idle, last_start: None, last_signature: None, passes: 0 }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_signature(&self) -> Option<&str> {
        self.last_signature.as_deref()
    }

    /// Move to [`Phase::Scanning`] if the guards allow it. Rejected triggers are dropped.
    pub fn try_begin(&mut self, now: Instant, cooldown: Duration, visible: bool) -> Result<(), Rejection> {
        if self.phase == Phase::Scanning {
            return Err(Rejection::AlreadyScanning);
        }
        if let Some(last) = self.last_start {
            if now.saturating_duration_since(last) < cooldown {
                return Err(Rejection::Cooldown);
            }
        }
        if !visible {
            return Err(Rejection::Hidden);
        }
        self.last_start = Some(now);
        self.phase = Phase::Scanning;
        Ok(())
    }

    pub fn finish(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Make the next scan run even if the page has not changed.
    pub fn forget_signature(&mut self) {
        self.last_signature = None;
    }

    /// Record `signature`; `false` if it equals the previous one.
    pub fn update_signature(&mut self, signature: &str) -> bool {
        if self.last_signature.as_deref() == Some(signature) {
            return false;
        }
        self.last_signature = Some(signature.to_string());
        true
    }
}

/// Fires once after `delay` has passed without another [`Debouncer::schedule`].
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// `true` exactly once when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_in_order() {
        let mut state = ScanState::new();
        let t0 = Instant::now();
        let cooldown = Duration::from_secs(2);

        assert_eq!(state.try_begin(t0, cooldown, true), Ok(()));
        assert_eq!(state.try_begin(t0, cooldown, true), Err(Rejection::AlreadyScanning));
        state.finish();
        assert_eq!(
            state.try_begin(t0 + Duration::from_secs(1), cooldown, true),
            Err(Rejection::Cooldown)
        );
        assert_eq!(
            state.try_begin(t0 + Duration::from_secs(3), cooldown, false),
            Err(Rejection::Hidden)
        );
        assert_eq!(state.try_begin(t0 + Duration::from_secs(3), cooldown, true), Ok(()));
        assert_eq!(state.phase(), Phase::Scanning);
    }

    #[test]
    fn hidden_trigger_does_not_start_cooldown() {
        let mut state = ScanState::new();
        let t0 = Instant::now();
        let cooldown = Duration::from_secs(2);
        assert_eq!(state.try_begin(t0, cooldown, false), Err(Rejection::Hidden));
        assert_eq!(state.try_begin(t0, cooldown, true), Ok(()));
    }

    #[test]
    fn signature_changes() {
        let mut state = ScanState::new();
        assert!(state.update_signature("a"));
        assert!(!state.update_signature("a"));
        assert!(state.update_signature("b"));
        assert_eq!(state.last_signature(), Some("b"));
    }

    #[test]
    fn debouncer_restarts_and_fires_once() {
        let mut debouncer = Debouncer::new(Duration::from_millis(800));
        let t0 = Instant::now();
        debouncer.schedule(t0);
        debouncer.schedule(t0 + Duration::from_millis(500));
        assert!(!debouncer.fire(t0 + Duration::from_millis(900)));
        assert!(debouncer.fire(t0 + Duration::from_millis(1300)));
        assert!(!debouncer.fire(t0 + Duration::from_millis(2000)));
        assert!(!debouncer.is_pending());
    }
}
