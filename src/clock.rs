// clock.rs

/// Last epoch value handed out by the collector, in milliseconds.
///
/// There is no local ticking clock: every record carries the value of the
/// last successful sync, or 0 if the node never synced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncedClock {
    value: i64,
    last_sync_succeeded: bool,
}

impl SyncedClock {
    pub const fn new() -> Self {
        Self {
            value: 0,
            last_sync_succeeded: false,
        }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn last_sync_succeeded(&self) -> bool {
        self.last_sync_succeeded
    }

    pub fn is_synced(&self) -> bool {
        self.value != 0
    }

    pub(crate) fn record_success(&mut self, unix_ms: i64) {
        self.value = unix_ms;
        self.last_sync_succeeded = true;
    }

    /// The value stays what it was, only the flag drops.
    pub(crate) fn record_failure(&mut self) {
        self.last_sync_succeeded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_last_value() {
        let mut clock = SyncedClock::new();
        assert_eq!(clock.value(), 0);
        assert!(!clock.is_synced());

        clock.record_success(1_700_000_000_000);
        clock.record_failure();
        assert_eq!(clock.value(), 1_700_000_000_000);
        assert!(!clock.last_sync_succeeded());
        assert!(clock.is_synced());
    }
}

// EOF
