//! Session trigger
//!
//! Edge-detects the push-to-talk button and gates one pipeline run at a
//! time. Presses while a session is active are ignored (no queueing, no
//! interruption), and after a session completes a debounce window suppresses
//! mechanical bounce and accidental re-triggering.

use std::io::BufRead;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::Result;

/// Whether a pipeline run is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a press
    Idle,
    /// A session is running; presses are ignored
    Active,
}

/// Logical button input; `true` means pressed.
///
/// The physical pin is active-low behind this seam; implementations map
/// the electrical level to the logical state.
pub trait ButtonInput {
    /// Poll the current button state.
    ///
    /// # Errors
    ///
    /// Returns an error if the input can no longer be read.
    fn is_pressed(&mut self) -> Result<bool>;
}

/// Gates pipeline runs on button edges.
///
/// Time is passed in by the caller so tests can step the debounce window
/// without real delays.
pub struct SessionTrigger {
    state: SessionState,
    debounce: Duration,
    held: bool,
    ready_at: Option<Instant>,
}

impl SessionTrigger {
    /// Create a trigger with the given post-session debounce window.
    #[must_use]
    pub const fn new(debounce: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            debounce,
            held: false,
            ready_at: None,
        }
    }

    /// Feed one poll of the button level.
    ///
    /// Returns `true` when a new session should start; the caller owns the
    /// run and must report completion via [`Self::complete`].
    pub fn poll(&mut self, pressed: bool, now: Instant) -> bool {
        let edge = pressed && !self.held;
        self.held = pressed;

        if self.state == SessionState::Active || !edge {
            return false;
        }
        if let Some(ready_at) = self.ready_at {
            if now < ready_at {
                tracing::debug!("press ignored during debounce");
                return false;
            }
        }

        self.state = SessionState::Active;
        true
    }

    /// Mark the in-flight session finished (success or failure) and open the
    /// debounce window.
    pub fn complete(&mut self, now: Instant) {
        self.state = SessionState::Idle;
        self.ready_at = Some(now + self.debounce);
    }

    /// Current gate state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }
}

/// Push-to-talk "button" read from stdin: each line is one momentary press.
///
/// Stands in for the GPIO pin on hosts without one; a firmware port would
/// implement [`ButtonInput`] against the pin instead.
pub struct StdinButton {
    rx: mpsc::Receiver<()>,
}

impl StdinButton {
    /// Spawn the stdin reader thread.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if line.is_err() || tx.send(()).is_err() {
                    break;
                }
            }
        });
        Self { rx }
    }
}

impl Default for StdinButton {
    fn default() -> Self {
        Self::new()
    }
}

impl ButtonInput for StdinButton {
    fn is_pressed(&mut self) -> Result<bool> {
        Ok(self.rx.try_recv().is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_secs(1);

    #[test]
    fn test_edge_starts_session() {
        let mut trigger = SessionTrigger::new(DEBOUNCE);
        let t0 = Instant::now();

        assert!(!trigger.poll(false, t0));
        assert!(trigger.poll(true, t0));
        assert_eq!(trigger.state(), SessionState::Active);
    }

    #[test]
    fn test_held_button_is_one_press() {
        let mut trigger = SessionTrigger::new(DEBOUNCE);
        let t0 = Instant::now();

        assert!(trigger.poll(true, t0));
        trigger.complete(t0);

        // Still held: no new edge even after the debounce window
        assert!(!trigger.poll(true, t0 + DEBOUNCE * 2));
        // Released then pressed again: new session
        assert!(!trigger.poll(false, t0 + DEBOUNCE * 2));
        assert!(trigger.poll(true, t0 + DEBOUNCE * 2));
    }

    #[test]
    fn test_press_while_active_is_ignored() {
        let mut trigger = SessionTrigger::new(DEBOUNCE);
        let t0 = Instant::now();

        assert!(trigger.poll(true, t0));
        assert!(!trigger.poll(false, t0));
        assert!(!trigger.poll(true, t0));
        assert_eq!(trigger.state(), SessionState::Active);
    }

    #[test]
    fn test_debounce_after_completion() {
        let mut trigger = SessionTrigger::new(DEBOUNCE);
        let t0 = Instant::now();

        assert!(trigger.poll(true, t0));
        trigger.complete(t0);
        assert_eq!(trigger.state(), SessionState::Idle);

        // Within the window: ignored
        assert!(!trigger.poll(false, t0 + Duration::from_millis(100)));
        assert!(!trigger.poll(true, t0 + Duration::from_millis(500)));

        // After the window: accepted
        assert!(!trigger.poll(false, t0 + DEBOUNCE));
        assert!(trigger.poll(true, t0 + DEBOUNCE + Duration::from_millis(1)));
    }
}
