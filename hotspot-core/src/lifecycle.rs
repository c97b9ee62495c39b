/// Viewer lifecycle state: phase machine, run flag and listener bookkeeping
use crate::host::ListenerHandle;

/// Where a viewer session is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing started yet
    Idle,
    /// Scene renders, model request in flight, hit-testing disabled
    Loading,
    /// Model attached, hit-testing enabled
    Active,
    /// Loop will not reschedule; listeners removed on the next tick
    Stopped,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Active => "active",
            Phase::Stopped => "stopped",
        }
    }

    /// Loading and Active both render every frame
    pub fn renders(self) -> bool {
        matches!(self, Phase::Loading | Phase::Active)
    }
}

/// Identifies the session a model request was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Per-widget lifecycle flags and handles
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
    running: bool,
    resize_listener: Option<ListenerHandle>,
    epoch: u64,
    frame_pending: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            running: false,
            resize_listener: None,
            epoch: 0,
            frame_pending: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn resize_listener(&self) -> Option<ListenerHandle> {
        self.resize_listener
    }

    /// Enter Loading for a fresh session; older tickets become stale
    pub fn begin(&mut self, resize_listener: ListenerHandle) -> LoadTicket {
        self.epoch += 1;
        self.phase = Phase::Loading;
        self.running = true;
        self.resize_listener = Some(resize_listener);
        LoadTicket(self.epoch)
    }

    /// Whether `ticket` belongs to the session currently loading
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.epoch && self.phase == Phase::Loading
    }

    /// Loading -> Active once the model is attached
    pub fn activate(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.phase = Phase::Active;
        true
    }

    /// Phase one of teardown: clear the run flag. Returns false when already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.phase = Phase::Stopped;
        true
    }

    /// Hand the resize listener over for deregistration
    pub fn take_resize_listener(&mut self) -> Option<ListenerHandle> {
        self.resize_listener.take()
    }

    /// Record a frame request; false when one is already pending
    pub fn claim_frame(&mut self) -> bool {
        if self.frame_pending {
            return false;
        }
        self.frame_pending = true;
        true
    }

    /// The pending frame callback fired
    pub fn frame_fired(&mut self) {
        self.frame_pending = false;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        let mut state = Lifecycle::new();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(!state.is_running());

        let ticket = state.begin(ListenerHandle::new(1));
        assert_eq!(state.phase(), Phase::Loading);
        assert!(state.is_running());
        assert!(state.activate(ticket));
        assert_eq!(state.phase(), Phase::Active);

        assert!(state.stop());
        assert_eq!(state.phase(), Phase::Stopped);
        assert!(!state.stop());
        assert!(!state.phase().renders());
    }

    #[test]
    fn test_stale_ticket_rejected() {
        let mut state = Lifecycle::new();
        let first = state.begin(ListenerHandle::new(1));
        let second = state.begin(ListenerHandle::new(2));
        assert!(!state.activate(first));
        assert!(state.activate(second));
        // Already active
        assert!(!state.activate(second));
    }

    #[test]
    fn test_stop_while_loading_rejects_late_model() {
        let mut state = Lifecycle::new();
        let ticket = state.begin(ListenerHandle::new(1));
        state.stop();
        assert!(!state.activate(ticket));
        assert_eq!(state.take_resize_listener(), Some(ListenerHandle::new(1)));
        assert_eq!(state.take_resize_listener(), None);
    }

    #[test]
    fn test_single_pending_frame() {
        let mut state = Lifecycle::new();
        assert!(state.claim_frame());
        assert!(!state.claim_frame());
        state.frame_fired();
        assert!(state.claim_frame());
    }
}
