/// Coalescing one-shot update request.
///
/// Any number of `request()` calls between two ticks collapse into a single
/// pending update, which the owner consumes with `take()`. This is the
/// frame-scheduler seam: a browser host arms it from event handlers and
/// drains it once per animation frame; tests drain it manually.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateLatch {
    requested: bool,
    coalesced: u64,
}

impl UpdateLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the latch. Returns `true` if this call armed it (i.e. no
    /// update was already pending).
    pub fn request(&mut self) -> bool {
        self.coalesced += 1;
        let was_armed = self.requested;
        self.requested = true;
        !was_armed
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Consumes the pending request, if any.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.requested)
    }

    /// Disarms without running. Used on teardown.
    pub fn cancel(&mut self) {
        self.requested = false;
    }

    /// Total `request()` calls observed, including coalesced ones.
    pub fn coalesced_requests(&self) -> u64 {
        self.coalesced
    }
}

#[cfg(test)]
mod tests {
    use super::UpdateLatch;

    #[test]
    fn bursts_collapse_into_one_take() {
        let mut latch = UpdateLatch::new();
        assert!(latch.request());
        assert!(!latch.request());
        assert!(!latch.request());
        assert_eq!(latch.coalesced_requests(), 3);

        assert!(latch.take());
        assert!(!latch.take());
    }

    #[test]
    fn cancel_disarms_pending_request() {
        let mut latch = UpdateLatch::new();
        latch.request();
        latch.cancel();
        assert!(!latch.take());
    }
}
