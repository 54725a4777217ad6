//! Cursor tracking for mouse look.

/// Current and previous cursor positions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MouseStatus {
  x: f32,
  y: f32,
  prev_x: f32,
  prev_y: f32,
  initialized: bool,
}

impl MouseStatus {
  /// Record a new cursor position.
  ///
  /// The first position ever seen becomes the reference so that the first delta is not a jump from the window origin.
  pub fn cursor_moved(&mut self, x: f32, y: f32) {
    if !self.initialized {
      self.prev_x = x;
      self.prev_y = y;
      self.initialized = true;
    }

    self.x = x;
    self.y = y;
  }

  /// Movement since the previous call; the delta is consumed.
  pub fn update(&mut self) -> [f32; 2] {
    let delta = [self.x - self.prev_x, self.y - self.prev_y];
    self.prev_x = self.x;
    self.prev_y = self.y;
    delta
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_position_is_the_reference() {
    let mut mouse = MouseStatus::default();
    mouse.cursor_moved(400., 300.);

    assert_eq!(mouse.update(), [0., 0.]);
  }

  #[test]
  fn delta_is_consumed() {
    let mut mouse = MouseStatus::default();
    mouse.cursor_moved(10., 10.);
    mouse.cursor_moved(15., 7.);
    mouse.cursor_moved(20., 4.);

    assert_eq!(mouse.update(), [10., -6.]);
    assert_eq!(mouse.update(), [0., 0.]);
  }
}
