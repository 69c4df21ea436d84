use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

/// Outcome of a single one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer is not running; a pending tick after pause/reset lands here.
    Inactive,
    Counting {
        remaining_seconds: u32,
    },
    Expired,
}

/// Single-instance countdown. Each transition is a synchronous atomic step;
/// the once-per-second schedule lives with the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    phase: TimerPhase,
    remaining_seconds: u32,
    duration_minutes: u32,
}

impl FocusTimer {
    pub fn new(duration_minutes: u32) -> Self {
        Self {
            phase: TimerPhase::Idle,
            remaining_seconds: duration_minutes * 60,
            duration_minutes,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// Duration the current countdown was loaded with. A settings change
    /// while running does not alter it; the next reset picks up the new
    /// value.
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Idle or Paused -> Running. A start while already running is a no-op.
    pub fn start(&mut self) {
        if self.phase == TimerPhase::Idle || self.phase == TimerPhase::Paused {
            self.phase = TimerPhase::Running;
        }
    }

    /// Running -> Paused, preserving the remaining time. No-op otherwise.
    pub fn pause(&mut self) {
        if self.phase == TimerPhase::Running {
            self.phase = TimerPhase::Paused;
        }
    }

    /// Any state -> Idle, reloading from the given configured duration.
    pub fn reset(&mut self, duration_minutes: u32) {
        self.phase = TimerPhase::Idle;
        self.duration_minutes = duration_minutes;
        self.remaining_seconds = duration_minutes * 60;
    }

    /// Applies a new configured duration. Only an idle timer reloads;
    /// an in-progress countdown keeps its loaded duration.
    pub fn set_duration(&mut self, duration_minutes: u32) {
        if self.phase == TimerPhase::Idle {
            self.duration_minutes = duration_minutes;
            self.remaining_seconds = duration_minutes * 60;
        }
    }

    /// One-second decrement. On reaching zero the timer expires back to
    /// Idle with the full duration reloaded, and the caller records the
    /// completed session.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != TimerPhase::Running {
            return TickOutcome::Inactive;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.phase = TimerPhase::Idle;
            self.remaining_seconds = self.duration_minutes * 60;
            return TickOutcome::Expired;
        }
        TickOutcome::Counting {
            remaining_seconds: self.remaining_seconds,
        }
    }
}
