//! Animation-loop state.
//!
//! The host calls back once per display refresh with a ticket issued by the
//! loop. Stopping, or hiding the page, bumps the generation, so a callback
//! that was already in flight arrives with a stale ticket and is dropped.
//! At most one ticket is outstanding at any time.

use crate::api::error::Result;

/// Identifies one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTicket {
    generation: u64,
}

impl FrameTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Host facility that invokes the loop once per display refresh.
pub trait FrameScheduler {
    /// Ask for one callback carrying `ticket`.
    fn request(&mut self, ticket: FrameTicket) -> Result<()>;

    /// Withdraw any pending callback.
    fn cancel(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Result of a visibility change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The page was hidden; any pending ticket is now stale.
    Hidden,
    /// The page is visible again; schedule the ticket if one is given.
    Shown(Option<FrameTicket>),
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct AnimationLoop {
    state: LoopState,
    visible: bool,
    generation: u64,
    outstanding: Option<FrameTicket>,
}

impl AnimationLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Stopped,
            visible: true,
            generation: 0,
            outstanding: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Enter `Running`. Returns the first ticket to schedule; `None` when
    /// already running or while hidden.
    pub fn start(&mut self) -> Option<FrameTicket> {
        if self.is_running() {
            return None;
        }
        self.state = LoopState::Running;
        if self.visible {
            Some(self.issue())
        } else {
            None
        }
    }

    /// Enter `Stopped`. Returns whether the loop was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        self.state = LoopState::Stopped;
        self.invalidate();
        was_running
    }

    /// Accept a callback. False for stale tickets, or when stopped or hidden.
    pub fn admit(&mut self, ticket: FrameTicket) -> bool {
        if !self.is_running() || !self.visible || self.outstanding != Some(ticket) {
            return false;
        }
        self.outstanding = None;
        true
    }

    /// Ticket for the next frame, if the loop should keep going.
    pub fn next(&mut self) -> Option<FrameTicket> {
        if self.is_running() && self.visible && self.outstanding.is_none() {
            Some(self.issue())
        } else {
            None
        }
    }

    pub fn set_visible(&mut self, visible: bool) -> Visibility {
        if visible == self.visible {
            return Visibility::Unchanged;
        }
        self.visible = visible;
        if !visible {
            self.invalidate();
            return Visibility::Hidden;
        }
        Visibility::Shown(self.next())
    }

    fn issue(&mut self) -> FrameTicket {
        self.generation += 1;
        let ticket = FrameTicket {
            generation: self.generation,
        };
        self.outstanding = Some(ticket);
        ticket
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.outstanding = None;
    }
}

impl Default for AnimationLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_issues_one_ticket() {
        let mut lp = AnimationLoop::new();
        let t = lp.start().unwrap();
        assert!(lp.is_running());
        assert!(lp.start().is_none(), "second start is a no-op");
        assert!(lp.admit(t));
        assert!(!lp.admit(t), "a ticket is admitted once");
    }

    #[test]
    fn stop_invalidates_pending_callback() {
        let mut lp = AnimationLoop::new();
        let t = lp.start().unwrap();
        assert!(lp.stop());
        assert!(!lp.admit(t));
        assert!(lp.next().is_none());
        assert!(!lp.stop(), "already stopped");
    }

    #[test]
    fn restart_ignores_old_ticket() {
        let mut lp = AnimationLoop::new();
        let old = lp.start().unwrap();
        lp.stop();
        let fresh = lp.start().unwrap();
        assert_ne!(old, fresh);
        assert!(!lp.admit(old));
        assert!(lp.admit(fresh));
    }

    #[test]
    fn only_one_outstanding() {
        let mut lp = AnimationLoop::new();
        let t = lp.start().unwrap();
        assert!(lp.next().is_none());
        assert!(lp.admit(t));
        assert!(lp.next().is_some());
        assert!(lp.next().is_none());
    }

    #[test]
    fn hidden_pauses_and_shown_resumes() {
        let mut lp = AnimationLoop::new();
        let t = lp.start().unwrap();
        assert_eq!(lp.set_visible(false), Visibility::Hidden);
        assert!(!lp.admit(t));
        assert_eq!(lp.set_visible(false), Visibility::Unchanged);
        match lp.set_visible(true) {
            Visibility::Shown(Some(ticket)) => assert!(lp.admit(ticket)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn showing_a_stopped_loop_schedules_nothing() {
        let mut lp = AnimationLoop::new();
        lp.set_visible(false);
        assert_eq!(lp.set_visible(true), Visibility::Shown(None));
        assert!(lp.start().is_some());
    }

    #[test]
    fn start_while_hidden_waits_for_visibility() {
        let mut lp = AnimationLoop::new();
        lp.set_visible(false);
        assert!(lp.start().is_none());
        assert!(lp.is_running());
        assert!(matches!(lp.set_visible(true), Visibility::Shown(Some(_))));
    }
}
