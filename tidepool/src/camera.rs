//! First-person camera.
//!
//! The camera is described by a position and two Euler angles (yaw around the world Y axis, pitch around the camera
//! right axis). With both angles at zero, it looks down the +Z axis.

use cgmath::{
  perspective, Deg, InnerSpace as _, Matrix4, Point3, SquareMatrix as _, Vector3, Zero as _,
};

bitflags::bitflags! {
  /// Directions the camera is currently asked to move in.
  #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
  pub struct Movement: u8 {
    const FORWARD  = 0b000001;
    const BACKWARD = 0b000010;
    const LEFT     = 0b000100;
    const RIGHT    = 0b001000;
    const UP       = 0b010000;
    const DOWN     = 0b100000;
  }
}

/// Vertical field of view, in degrees.
pub const DEFAULT_FOVY: f32 = 45.;
pub const DEFAULT_NEAR: f32 = 0.01;
pub const DEFAULT_FAR: f32 = 100.;

// units per second
const MOVE_SPEED: f32 = 5.;
// radians per pixel
const LOOK_SENSITIVITY: f32 = 0.005;
// keeps the view basis well defined at full verticals
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
  position: Point3<f32>,
  yaw: f32,
  pitch: f32,
  home: (Point3<f32>, Point3<f32>),
  fovy: f32,
  aspect: f32,
  near: f32,
  far: f32,
}

impl Camera {
  /// Create a camera at `eye` looking at `target`; this placement is also where [`Camera::reset`] brings it back.
  pub fn new(eye: Point3<f32>, target: Point3<f32>, aspect: f32) -> Self {
    let mut camera = Camera {
      position: eye,
      yaw: 0.,
      pitch: 0.,
      home: (eye, target),
      fovy: DEFAULT_FOVY,
      aspect,
      near: DEFAULT_NEAR,
      far: DEFAULT_FAR,
    };

    camera.set_transformation(eye, target, Vector3::unit_y());
    camera
  }

  /// Place the camera at `eye`, looking at `target`.
  ///
  /// The camera never rolls, so `up` only disambiguates the degenerate case of looking straight up or down, where the
  /// yaw is taken from `up` instead.
  pub fn set_transformation(&mut self, eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) {
    self.position = eye;

    let dir = target - eye;
    if dir.is_zero() {
      return;
    }

    let dir = dir.normalize();
    self.pitch = clamp_pitch(dir.y.asin());

    let flat = if dir.x.abs() + dir.z.abs() > 1e-6 { dir } else { -up };
    self.yaw = flat.x.atan2(flat.z);
  }

  pub fn set_projection(&mut self, fovy: f32, aspect: f32, near: f32, far: f32) {
    self.fovy = fovy;
    self.aspect = aspect;
    self.near = near;
    self.far = far;
  }

  pub fn set_aspect(&mut self, aspect: f32) {
    self.aspect = aspect;
  }

  /// Bring the camera back where it was created.
  pub fn reset(&mut self) {
    let (eye, target) = self.home;
    self.set_transformation(eye, target, Vector3::unit_y());
  }

  /// Rotate with a mouse delta (in pixels) and move along `directions` for `dt` seconds.
  pub fn move_by(&mut self, directions: Movement, mouse_delta: [f32; 2], dt: f32) {
    let [dx, dy] = mouse_delta;
    self.yaw -= dx * LOOK_SENSITIVITY;
    self.pitch = clamp_pitch(self.pitch - dy * LOOK_SENSITIVITY);

    let forward = self.forward();
    let right = self.right();
    let up = Vector3::unit_y();
    let mut step = Vector3::zero();

    for (direction, v) in [
      (Movement::FORWARD, forward),
      (Movement::BACKWARD, -forward),
      (Movement::RIGHT, right),
      (Movement::LEFT, -right),
      (Movement::UP, up),
      (Movement::DOWN, -up),
    ] {
      if directions.contains(direction) {
        step += v;
      }
    }

    self.position += step * MOVE_SPEED * dt;
  }

  pub fn position(&self) -> Point3<f32> {
    self.position
  }

  /// Unit vector the camera looks along.
  pub fn forward(&self) -> Vector3<f32> {
    let (sy, cy) = self.yaw.sin_cos();
    let (sp, cp) = self.pitch.sin_cos();
    Vector3::new(cp * sy, sp, cp * cy)
  }

  /// Unit vector pointing to the right of the view, always horizontal.
  pub fn right(&self) -> Vector3<f32> {
    let (sy, cy) = self.yaw.sin_cos();
    Vector3::new(-cy, 0., sy)
  }

  pub fn near_far(&self) -> [f32; 2] {
    [self.near, self.far]
  }

  pub fn world_to_view(&self) -> Matrix4<f32> {
    Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
  }

  pub fn view_to_world(&self) -> Matrix4<f32> {
    self
      .world_to_view()
      .invert()
      .unwrap_or_else(Matrix4::identity)
  }

  pub fn projection(&self) -> Matrix4<f32> {
    perspective(Deg(self.fovy), self.aspect, self.near, self.far)
  }

  /// View matrix of the camera seeing the world mirrored about the horizontal plane `y = height`.
  ///
  /// Points on the plane project exactly where they do with [`Camera::world_to_view`], so a texture rendered with this
  /// view can be sampled at the same screen position as the plane itself. Mirroring flips triangle winding.
  pub fn reflected_world_to_view(&self, height: f32) -> Matrix4<f32> {
    self.world_to_view() * mirror_y(height)
  }

  /// Where the camera sits in the mirrored world seen by [`Camera::reflected_world_to_view`].
  pub fn reflected_position(&self, height: f32) -> Point3<f32> {
    Point3::new(self.position.x, 2. * height - self.position.y, self.position.z)
  }
}

// Mirror about the plane y = height.
fn mirror_y(height: f32) -> Matrix4<f32> {
  Matrix4::from_translation(Vector3::new(0., 2. * height, 0.))
    * Matrix4::from_nonuniform_scale(1., -1., 1.)
}

fn clamp_pitch(theta: f32) -> f32 {
  theta.max(-MAX_PITCH).min(MAX_PITCH)
}
