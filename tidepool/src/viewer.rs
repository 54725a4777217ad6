//! State every scene shares: the camera, mouse look and the render toggles.

use cgmath::Point3;
use luminance_front::{
  depth_stencil::Comparison,
  face_culling::{FaceCulling, FaceCullingMode, FaceCullingOrder},
  render_state::RenderState,
};

use crate::{camera::Camera, mouse::MouseStatus, FrameInput, InputAction};

/// Fixed-function switches the user can flip at runtime.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderToggles {
  pub face_culling: bool,
  pub depth_test: bool,
}

impl Default for RenderToggles {
  fn default() -> Self {
    RenderToggles {
      face_culling: true,
      depth_test: true,
    }
  }
}

impl RenderToggles {
  /// Render state for regular geometry.
  pub fn render_state(&self) -> RenderState {
    self.with_front_faces(FaceCullingOrder::CCW)
  }

  /// Render state for geometry seen through a mirror, where winding is flipped.
  pub fn mirrored_render_state(&self) -> RenderState {
    self.with_front_faces(FaceCullingOrder::CW)
  }

  fn with_front_faces(&self, order: FaceCullingOrder) -> RenderState {
    let face_culling = if self.face_culling {
      Some(FaceCulling::new(order, FaceCullingMode::Back))
    } else {
      None
    };
    let depth_test = if self.depth_test {
      Some(Comparison::LessOrEqual)
    } else {
      None
    };

    RenderState::default()
      .set_face_culling(face_culling)
      .set_depth_test(depth_test)
  }
}

/// Camera driven by the mouse and the movement keys.
#[derive(Clone, Debug)]
pub struct Viewer {
  pub camera: Camera,
  pub toggles: RenderToggles,
  mouse: MouseStatus,
  looking: bool,
}

impl Viewer {
  pub fn new(eye: Point3<f32>, target: Point3<f32>, size: [u32; 2]) -> Self {
    Viewer {
      camera: Camera::new(eye, target, aspect_ratio(size[0], size[1])),
      toggles: RenderToggles::default(),
      mouse: MouseStatus::default(),
      looking: false,
    }
  }

  /// React to the actions every scene understands the same way.
  pub fn handle(&mut self, action: &InputAction) {
    match *action {
      InputAction::LookPressed => {
        // ignore whatever the cursor did while not looking
        self.mouse.update();
        self.looking = true;
      }

      InputAction::LookReleased => self.looking = false,

      InputAction::CursorMoved { x, y } => self.mouse.cursor_moved(x, y),

      InputAction::ResetCamera => {
        log::info!("camera reset");
        self.camera.reset();
      }

      InputAction::ToggleFaceCulling => {
        self.toggles.face_culling = !self.toggles.face_culling;
        log::info!("face culling: {}", on_off(self.toggles.face_culling));
      }

      InputAction::ToggleDepthTest => {
        self.toggles.depth_test = !self.toggles.depth_test;
        log::info!("depth test: {}", on_off(self.toggles.depth_test));
      }

      InputAction::Resized { width, height } => {
        log::debug!("resized: {}×{}", width, height);
        self.camera.set_aspect(aspect_ratio(width, height));
      }

      _ => (),
    }
  }

  /// Move the camera for the frame.
  pub fn update(&mut self, input: &FrameInput) {
    let delta = self.mouse.update();
    let delta = if self.looking { delta } else { [0., 0.] };

    self.camera.move_by(input.movement, delta, input.frame.dt);
  }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
  width.max(1) as f32 / height.max(1) as f32
}

fn on_off(b: bool) -> &'static str {
  if b {
    "on"
  } else {
    "off"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{camera::Movement, clock::FrameTime};

  fn input(dt: f32) -> FrameInput {
    FrameInput {
      frame: FrameTime {
        time: 0.,
        dt,
        frame_index: 0,
      },
      movement: Movement::empty(),
    }
  }

  fn viewer() -> Viewer {
    Viewer::new(Point3::new(0., 2.5, -5.), Point3::new(0., 0., 0.), [800, 600])
  }

  #[test]
  fn default_state_culls_and_tests_depth() {
    let state = RenderToggles::default().render_state();

    assert_eq!(
      state,
      RenderState::default()
        .set_face_culling(FaceCulling::new(FaceCullingOrder::CCW, FaceCullingMode::Back))
        .set_depth_test(Comparison::LessOrEqual)
    );
  }

  #[test]
  fn mirrored_state_flips_front_faces() {
    let state = RenderToggles::default().mirrored_render_state();

    assert_eq!(
      state.face_culling(),
      Some(FaceCulling::new(FaceCullingOrder::CW, FaceCullingMode::Back))
    );
  }

  #[test]
  fn toggles_disable_culling_and_depth_test() {
    let mut viewer = viewer();
    viewer.handle(&InputAction::ToggleFaceCulling);
    viewer.handle(&InputAction::ToggleDepthTest);

    let state = viewer.toggles.render_state();
    assert_eq!(state.face_culling(), None);
    assert_eq!(state.depth_test(), None);

    viewer.handle(&InputAction::ToggleDepthTest);
    assert_eq!(viewer.toggles.render_state().depth_test(), Some(Comparison::LessOrEqual));
  }

  #[test]
  fn mouse_only_turns_the_camera_while_looking() {
    let mut viewer = viewer();
    let still = viewer.camera;

    viewer.handle(&InputAction::CursorMoved { x: 100., y: 100. });
    viewer.handle(&InputAction::CursorMoved { x: 160., y: 100. });
    viewer.update(&input(0.016));
    assert_eq!(viewer.camera, still);

    viewer.handle(&InputAction::LookPressed);
    viewer.handle(&InputAction::CursorMoved { x: 200., y: 100. });
    viewer.update(&input(0.016));
    assert_ne!(viewer.camera.forward(), still.forward());
    assert_eq!(viewer.camera.position(), still.position());
  }

  #[test]
  fn resize_updates_the_aspect_ratio() {
    let mut viewer = viewer();
    let before = viewer.camera.projection();
    viewer.handle(&InputAction::Resized {
      width: 1920,
      height: 1080,
    });

    assert_ne!(viewer.camera.projection(), before);

    // a minimized window must not produce a degenerate projection
    viewer.handle(&InputAction::Resized { width: 0, height: 0 });
    assert!(viewer.camera.projection().x.x.is_finite());
  }
}
