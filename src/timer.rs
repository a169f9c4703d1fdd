//! Single-shot timers polled against the host clock.

/// A timer that fires at most once per `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleShotTimer {
    deadline: Option<u32>,
}

impl SingleShotTimer {
    /// Arm the timer, replacing any pending deadline.
    pub fn start(&mut self, now: u32, duration: u32) {
        self.deadline = Some(now.saturating_add(duration));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<u32> {
        self.deadline
    }

    /// Consume the timer if its deadline has passed.  Returns true exactly
    /// once per arming.
    pub fn fire_if_due(&mut self, now: u32) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
