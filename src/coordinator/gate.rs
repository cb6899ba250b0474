//! Mutual exclusion for failover HTTP requests.

/// Why a failover request was queued. `Max` outranks `Timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestReason {
    /// The last known update is stale.
    Timeout,
    /// A peer told us it is at capacity.
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Idle,
    Queued(RequestReason),
    Active(RequestReason),
}

/// Guarantees at most one outstanding failover request.
#[derive(Debug)]
pub struct HttpRequestGate {
    state: GateState,
}

impl Default for HttpRequestGate {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRequestGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Idle,
        }
    }

    /// Queues a request for `reason`.
    ///
    /// Returns true when a request is already queued or active, in which case
    /// the caller must not schedule another one. The stored reason is upgraded
    /// to `reason` if it ranks higher.
    pub fn try_queue(&mut self, reason: RequestReason) -> bool {
        match self.state {
            GateState::Idle => {
                self.state = GateState::Queued(reason);
                false
            }
            GateState::Queued(current) => {
                self.state = GateState::Queued(current.max(reason));
                true
            }
            GateState::Active(current) => {
                self.state = GateState::Active(current.max(reason));
                true
            }
        }
    }

    /// Moves a queued request to active. Returns its reason, or `None` when
    /// nothing was queued.
    pub fn mark_active(&mut self) -> Option<RequestReason> {
        match self.state {
            GateState::Queued(reason) => {
                self.state = GateState::Active(reason);
                Some(reason)
            }
            _ => None,
        }
    }

    /// Clears an active request.
    pub fn finish(&mut self) {
        if let GateState::Active(_) = self.state {
            self.state = GateState::Idle;
        }
    }

    /// Drops a queued request that has not started yet.
    pub fn cancel(&mut self) {
        if let GateState::Queued(_) = self.state {
            self.state = GateState::Idle;
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.state, GateState::Queued(_))
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, GateState::Active(_))
    }

    /// Queued or active.
    pub fn is_pending(&self) -> bool {
        self.state != GateState::Idle
    }

    pub fn reason(&self) -> Option<RequestReason> {
        match self.state {
            GateState::Idle => None,
            GateState::Queued(reason) | GateState::Active(reason) => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_is_not_pending() {
        let mut gate = HttpRequestGate::new();
        assert!(!gate.is_pending());
        assert!(!gate.try_queue(RequestReason::Timeout));
        assert!(gate.is_queued());
        assert_eq!(gate.reason(), Some(RequestReason::Timeout));
    }

    #[test]
    fn test_second_request_is_pending() {
        let mut gate = HttpRequestGate::new();
        gate.try_queue(RequestReason::Timeout);
        assert!(gate.try_queue(RequestReason::Timeout));
        assert!(gate.is_queued());
    }

    #[test]
    fn test_max_upgrades_timeout() {
        let mut gate = HttpRequestGate::new();
        gate.try_queue(RequestReason::Timeout);
        assert!(gate.try_queue(RequestReason::Max));
        assert_eq!(gate.reason(), Some(RequestReason::Max));
    }

    #[test]
    fn test_timeout_never_downgrades_max() {
        let mut gate = HttpRequestGate::new();
        gate.try_queue(RequestReason::Max);
        assert!(gate.try_queue(RequestReason::Timeout));
        assert_eq!(gate.reason(), Some(RequestReason::Max));
    }

    #[test]
    fn test_active_request_blocks_and_upgrades() {
        let mut gate = HttpRequestGate::new();
        gate.try_queue(RequestReason::Timeout);
        assert_eq!(gate.mark_active(), Some(RequestReason::Timeout));
        assert!(gate.is_active());
        assert!(!gate.is_queued());

        assert!(gate.try_queue(RequestReason::Max));
        assert!(gate.is_active());
        assert_eq!(gate.reason(), Some(RequestReason::Max));
    }

    #[test]
    fn test_finish_returns_to_idle() {
        let mut gate = HttpRequestGate::new();
        gate.try_queue(RequestReason::Max);
        gate.mark_active();
        gate.finish();
        assert!(!gate.is_pending());
        assert_eq!(gate.reason(), None);
        assert!(!gate.try_queue(RequestReason::Timeout));
    }

    #[test]
    fn test_cancel_only_clears_queued() {
        let mut gate = HttpRequestGate::new();
        gate.try_queue(RequestReason::Timeout);
        gate.cancel();
        assert!(!gate.is_pending());

        gate.try_queue(RequestReason::Timeout);
        gate.mark_active();
        gate.cancel();
        assert!(gate.is_active());
    }

    #[test]
    fn test_mark_active_without_queue() {
        let mut gate = HttpRequestGate::new();
        assert_eq!(gate.mark_active(), None);
        assert!(!gate.is_pending());
    }
}
