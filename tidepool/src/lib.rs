//! Real-time rendering labs: a pool of water under a sky box, a tessellated terrain and a mesh gallery.
//!
//! The labs are platform-agnostic. Each one is a [`Scene`], which allocates its GPU resources once in
//! [`Scene::bootstrap`] and is then stepped once per frame through [`Scene::render_frame`]. Everything that depends on
//! the platform (loading images, turning window events into [`InputAction`]s, measuring time) is done by the code
//! running the scene, which only hands over abstract inputs.
//!
//! # Error handling
//!
//! Bootstrapping returns a [`SceneError`]. Once a scene is running, a failed frame ends the loop with
//! [`LoopFeedback::Exit`] after logging what went wrong.

use std::{error::Error, fmt};

use luminance::{
  framebuffer::FramebufferError, shader::ProgramError, tess::TessError, texture::TextureError,
};
use luminance_front::{context::GraphicsContext, framebuffer::Framebuffer, texture::Dim2, Backend};

pub mod camera;
pub mod clock;
pub mod gallery;
pub mod geometry;
pub mod mouse;
pub mod shaders;
pub mod terrain;
pub mod textures;
pub mod viewer;
pub mod water;

use camera::Movement;
use clock::FrameTime;
use terrain::TessellationMode;
use textures::SamplerKind;

/// Color the screen is cleared with.
pub const CLEAR_COLOR: [f32; 4] = [0.1, 0.2, 0.4, 1.];

/// Scene interface.
pub trait Scene: Sized {
  /// Resources the platform must provide before bootstrapping.
  fn features() -> Features;

  /// Allocate the GPU resources of the scene.
  fn bootstrap(
    config: &SceneConfig,
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, SceneError>;

  /// Render a frame of the scene.
  fn render_frame(
    self,
    input: &FrameInput,
    back_buffer: Framebuffer<Dim2, (), ()>,
    actions: impl Iterator<Item = InputAction>,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> LoopFeedback<Self>;
}

/// Start-up parameters shared by every scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneConfig {
  /// Framebuffer size at start-up.
  pub size: [u32; 2],
  /// How image textures are sampled.
  pub sampler: SamplerKind,
}

impl Default for SceneConfig {
  fn default() -> Self {
    SceneConfig {
      size: [800, 600],
      sampler: SamplerKind::default(),
    }
  }
}

/// What a scene gets every frame besides discrete actions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
  pub frame: FrameTime,
  /// Movement keys currently held down.
  pub movement: Movement,
}

/// Discrete inputs passed to scenes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputAction {
  /// Quit the application.
  Quit,

  /// Main action. Typically used to switch an effect on and off.
  MainToggle,

  /// Auxiliary action. Used to showcase smaller parts of a bigger effect.
  AuxiliaryToggle,

  /// Start looking around with the mouse.
  LookPressed,

  /// Stop looking around with the mouse.
  LookReleased,

  /// Cursor moved to a new position, in window coordinates.
  CursorMoved { x: f32, y: f32 },

  /// Put the camera back where it started.
  ResetCamera,

  ToggleFaceCulling,

  ToggleDepthTest,

  /// Pick how the terrain is tessellated.
  SelectTessellation(TessellationMode),

  /// Framebuffer size changed.
  Resized { width: u32, height: u32 },
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LoopFeedback<T> {
  Continue(T),
  Exit,
}

/// Services a platform offers to scenes.
pub trait PlatformServices {
  type FetchError: fmt::Display;

  /// Fetch an image previously requested through [`Features::texture`].
  fn fetch_texture(&mut self, name: impl AsRef<str>) -> Result<&image::RgbImage, Self::FetchError>;
}

/// Resources a scene needs from the platform.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Features {
  textures: Vec<String>,
}

impl Features {
  pub fn none() -> Self {
    Self::default()
  }

  /// Require a texture, by name.
  pub fn texture(mut self, name: impl Into<String>) -> Self {
    self.textures.push(name.into());
    self
  }

  pub fn textures(&self) -> &[String] {
    &self.textures
  }
}

/// Errors that can occur while bootstrapping a scene.
#[derive(Debug)]
pub enum SceneError {
  /// A shader program failed to build.
  Shader {
    name: &'static str,
    source: ProgramError,
  },
  Texture(TextureError),
  Tess(TessError),
  Framebuffer(FramebufferError),
}

impl fmt::Display for SceneError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      SceneError::Shader { name, source } => write!(f, "cannot build the {} program: {}", name, source),
      SceneError::Texture(e) => write!(f, "cannot create texture: {}", e),
      SceneError::Tess(e) => write!(f, "cannot create tessellation: {}", e),
      SceneError::Framebuffer(e) => write!(f, "cannot create framebuffer: {}", e),
    }
  }
}

impl Error for SceneError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      SceneError::Shader { source, .. } => Some(source),
      SceneError::Texture(e) => Some(e),
      SceneError::Tess(e) => Some(e),
      SceneError::Framebuffer(e) => Some(e),
    }
  }
}

impl From<TextureError> for SceneError {
  fn from(e: TextureError) -> Self {
    SceneError::Texture(e)
  }
}

impl From<TessError> for SceneError {
  fn from(e: TessError) -> Self {
    SceneError::Tess(e)
  }
}

impl From<FramebufferError> for SceneError {
  fn from(e: FramebufferError) -> Self {
    SceneError::Framebuffer(e)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn features_keep_request_order() {
    let features = Features::none().texture("sky.jpg").texture("tiles.jpg");

    assert_eq!(features.textures(), &["sky.jpg".to_owned(), "tiles.jpg".to_owned()]);
  }

  #[test]
  fn default_config_matches_the_default_window() {
    let config = SceneConfig::default();

    assert_eq!(config.size, [800, 600]);
    assert_eq!(config.sampler, SamplerKind::Trilinear);
  }
}
