//! Pausable countdown state, driven by ticks and keys.

/// Keys the countdown reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownKey {
    /// Space: toggle pause.
    TogglePause,
    /// Enter: skip the rest of the wait.
    Skip,
    /// Ctrl-C: stop the wait and the session.
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEnd {
    Elapsed,
    Skipped,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    total: u64,
    remaining: u64,
    paused: bool,
    end: Option<CountdownEnd>,
}

impl Countdown {
    pub fn new(seconds: u64) -> Self {
        Self {
            total: seconds,
            remaining: seconds,
            paused: false,
            end: (seconds == 0).then_some(CountdownEnd::Elapsed),
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn end(&self) -> Option<CountdownEnd> {
        self.end
    }

    /// One second passed. Paused countdowns do not move.
    pub fn tick(&mut self) {
        if self.end.is_some() || self.paused {
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.end = Some(CountdownEnd::Elapsed);
        }
    }

    pub fn apply_key(&mut self, key: CountdownKey) {
        if self.end.is_some() {
            return;
        }
        match key {
            CountdownKey::TogglePause => self.paused = !self.paused,
            CountdownKey::Skip => {
                self.remaining = 0;
                self.end = Some(CountdownEnd::Skipped);
            }
            CountdownKey::Interrupt => self.end = Some(CountdownEnd::Interrupted),
        }
    }

    /// `▶ ● ● ○ ○ [Space: Pause/Resume | Enter: To continue]`, uncolored.
    pub fn render(&self) -> String {
        let elapsed = self.total - self.remaining;
        let dots: Vec<&str> = (0..self.total)
            .map(|i| if i < elapsed { "●" } else { "○" })
            .collect();
        let status = if self.paused { "⏸" } else { "▶" };
        format!(
            "{status} {} [Space: Pause/Resume | Enter: To continue]",
            dots.join(" ")
        )
    }
}
