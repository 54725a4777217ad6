//! Frame timing.

use std::time::{Duration, Instant};

const DT_MIN: Duration = Duration::from_micros(100);
const DT_MAX: Duration = Duration::from_millis(250);

/// Timing of a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
  /// Seconds since the clock started.
  pub time: f32,
  /// Seconds since the previous frame, clamped to `[0.1ms, 250ms]`.
  pub dt: f32,
  pub frame_index: u64,
}

impl FrameTime {
  /// Window title reporting the frame duration and rate.
  pub fn title(&self) -> String {
    format!("dt = {:.2}ms, FPS = {:.1}", self.dt * 1e3, 1. / self.dt)
  }
}

#[derive(Clone, Debug)]
pub struct FrameClock {
  start: Instant,
  last: Instant,
  frame_index: u64,
}

impl FrameClock {
  pub fn new() -> Self {
    Self::starting_at(Instant::now())
  }

  fn starting_at(start: Instant) -> Self {
    FrameClock {
      start,
      last: start,
      frame_index: 0,
    }
  }

  /// Restart measuring `dt` from now, e.g. after a long blocking operation.
  pub fn reset(&mut self) {
    self.last = Instant::now();
  }

  pub fn tick(&mut self) -> FrameTime {
    self.tick_at(Instant::now())
  }

  fn tick_at(&mut self, now: Instant) -> FrameTime {
    let dt = now
      .saturating_duration_since(self.last)
      .max(DT_MIN)
      .min(DT_MAX);
    self.last = now;

    let frame = FrameTime {
      time: now.saturating_duration_since(self.start).as_secs_f32(),
      dt: dt.as_secs_f32(),
      frame_index: self.frame_index,
    };

    self.frame_index = self.frame_index.wrapping_add(1);
    frame
  }
}

impl Default for FrameClock {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn measures_time_between_ticks() {
    let start = Instant::now();
    let mut clock = FrameClock::starting_at(start);

    let first = clock.tick_at(start + Duration::from_millis(16));
    let second = clock.tick_at(start + Duration::from_millis(36));

    assert!((first.dt - 0.016).abs() < 1e-6);
    assert!((second.dt - 0.020).abs() < 1e-6);
    assert!((second.time - 0.036).abs() < 1e-6);
    assert_eq!((first.frame_index, second.frame_index), (0, 1));
  }

  #[test]
  fn clamps_dt() {
    let start = Instant::now();
    let mut clock = FrameClock::starting_at(start);

    let stalled = clock.tick_at(start + Duration::from_secs(3));
    let tight = clock.tick_at(start + Duration::from_secs(3));

    assert!((stalled.dt - 0.25).abs() < 1e-6);
    assert!((tight.dt - 0.0001).abs() < 1e-7);
    assert!((stalled.time - 3.).abs() < 1e-6);
  }

  #[test]
  fn formats_title() {
    let frame = FrameTime {
      time: 1.,
      dt: 0.016,
      frame_index: 60,
    };

    assert_eq!(frame.title(), "dt = 16.00ms, FPS = 62.5");
  }
}
