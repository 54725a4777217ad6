//! Fixed-function switches luminance doesn’t expose, set directly on the OpenGL context.

/// Global rasterization switches.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GlSwitches {
  pub multisampling: bool,
  pub wireframe: bool,
}

impl Default for GlSwitches {
  fn default() -> Self {
    GlSwitches {
      multisampling: true,
      wireframe: false,
    }
  }
}

impl GlSwitches {
  pub fn toggle_multisampling(&mut self) {
    self.multisampling = !self.multisampling;
    log::info!("multisampling: {}", on_off(self.multisampling));
    self.apply();
  }

  pub fn toggle_wireframe(&mut self) {
    self.wireframe = !self.wireframe;
    log::info!("wireframe: {}", on_off(self.wireframe));
    self.apply();
  }

  /// Push the switches to the current OpenGL context.
  pub fn apply(&self) {
    let polygon_mode = if self.wireframe { gl::LINE } else { gl::FILL };

    // the context is current on this thread and its functions are loaded before the first call
    unsafe {
      if self.multisampling {
        gl::Enable(gl::MULTISAMPLE);
      } else {
        gl::Disable(gl::MULTISAMPLE);
      }

      gl::PolygonMode(gl::FRONT_AND_BACK, polygon_mode);
    }
  }
}

pub fn on_off(b: bool) -> &'static str {
  if b {
    "on"
  } else {
    "off"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn starts_multisampled_and_filled() {
    let switches = GlSwitches::default();

    assert!(switches.multisampling);
    assert!(!switches.wireframe);
  }

  #[test]
  fn on_off_names() {
    assert_eq!(on_off(true), "on");
    assert_eq!(on_off(false), "off");
  }
}
