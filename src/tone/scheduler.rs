use std::time::{Duration, Instant};

/// Drift-free beep cadence
///
/// Each deadline is derived from the previous deadline rather than from the
/// moment the caller woke up, so scheduling latency does not accumulate over
/// a long flight. If the caller falls more than one full cycle behind, the
/// schedule resynchronizes to `now` instead of firing a burst of catch-up
/// cycles.
#[derive(Debug, Default)]
pub struct PulseScheduler {
    deadline: Option<Instant>,
    resyncs: u64,
}

impl PulseScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the scheduler; the first cycle is due immediately
    pub fn start(&mut self, now: Instant) {
        self.deadline = Some(now);
    }

    /// Book the next cycle of length `cycle` and return its deadline
    ///
    /// Starts the schedule at `now` when not armed.
    pub fn advance(&mut self, cycle: Duration, now: Instant) -> Instant {
        let base = match self.deadline {
            Some(deadline) if now.saturating_duration_since(deadline) <= cycle => deadline,
            Some(deadline) => {
                self.resyncs += 1;
                log::debug!(
                    "Tone schedule {:?} behind, resyncing",
                    now.saturating_duration_since(deadline)
                );
                now
            }
            None => now,
        };

        let next = base + cycle;
        self.deadline = Some(next);
        next
    }

    /// Stop scheduling; pending deadlines are forgotten
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Times the schedule had to be pulled forward to `now`
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }
}
