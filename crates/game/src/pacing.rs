use std::time::Instant;

use serde::{Deserialize, Serialize};

pub const DEFAULT_STEPS_PER_SECOND: f32 = 60.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    pub steps_per_second: f32,
    /// Steps per second shed when the scheduler reports `slowdown_window`
    /// or more frames ahead.
    pub max_slowdown: f32,
    pub slowdown_window: f32,
    /// Caps one measured interval, so a stalled loop does not replay a burst
    /// of catch-up steps.
    pub max_elapsed_ms: Option<u64>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            steps_per_second: DEFAULT_STEPS_PER_SECOND,
            max_slowdown: 2.0,
            slowdown_window: 2.0,
            max_elapsed_ms: None,
        }
    }
}

/// Turns wall-clock time into whole simulation steps, running slightly slow
/// while the local peer is ahead of the others.
#[derive(Debug, Clone)]
pub struct Pacer {
    config: PacingConfig,
    accumulator: f32,
    last_time: Option<Instant>,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            last_time: None,
        }
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    pub fn effective_rate(&self, frames_ahead: f32) -> f32 {
        let window = self.config.slowdown_window.max(0.0);
        if window == 0.0 {
            return self.config.steps_per_second;
        }

        let ahead = if frames_ahead.is_nan() {
            0.0
        } else {
            frames_ahead.clamp(0.0, window)
        };
        self.config.steps_per_second - ahead * (self.config.max_slowdown / window)
    }

    pub fn accumulate(&mut self, elapsed_ms: u64, frames_ahead: f32) {
        let elapsed_ms = match self.config.max_elapsed_ms {
            Some(cap) => elapsed_ms.min(cap),
            None => elapsed_ms,
        };
        let rate = self.effective_rate(frames_ahead).max(0.0);
        self.accumulator += elapsed_ms as f32 * rate / 1000.0;
    }

    /// Measures the time since the previous call and accumulates it. The
    /// first call only starts the clock.
    pub fn tick(&mut self, now: Instant, frames_ahead: f32) {
        if let Some(last) = self.last_time {
            let elapsed = now.saturating_duration_since(last).as_millis() as u64;
            self.accumulate(elapsed, frames_ahead);
            // Keep the sub-millisecond remainder for the next interval.
            self.last_time = Some(last + std::time::Duration::from_millis(elapsed));
        } else {
            self.last_time = Some(now);
        }
    }

    pub fn should_step(&self) -> bool {
        self.accumulator >= 1.0
    }

    pub fn consume_step(&mut self) -> bool {
        if self.accumulator >= 1.0 {
            self.accumulator -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn due_steps(&mut self) -> u32 {
        let mut steps = 0;
        while self.consume_step() {
            steps += 1;
        }
        steps
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.last_time = None;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(PacingConfig::default())
    }
}
