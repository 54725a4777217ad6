//! Terrain made of patches tessellated on the GPU.
//!
//! The ground is a grid of four-vertex patches. The tessellation control stage picks a level per edge from the
//! distance between the edge and the camera, and the evaluation stage lifts the generated vertices with a height map.
//! Keys `1`, `2` and `3` switch between [`TessellationMode`]s.

use std::fmt;

use cgmath::{Matrix4, Point3};
use luminance_front::{
  context::GraphicsContext,
  framebuffer::Framebuffer,
  pipeline::PipelineState,
  shader::types::{Mat44, Vec2, Vec3},
  tess::{Mode, Tess},
  texture::Dim2,
  Backend,
};

use crate::{
  geometry::{self, PosTex},
  shaders::{self, TerrainProgram},
  textures::{load_texture, Fallback, RgbTexture},
  viewer::Viewer,
  Features, FrameInput, InputAction, LoopFeedback, PlatformServices, Scene, SceneConfig, SceneError,
  CLEAR_COLOR,
};

const COLOR_TEXTURE: &str = "rocks_color.jpg";
const HEIGHT_TEXTURE: &str = "rocks_height.jpg";

/// Patches per side of the grid.
pub const GRID_SIZE: u32 = 16;
// world units per patch
const PATCH_SIZE: f32 = 2.;
const COLOR_TILING: [f32; 2] = [8., 8.];

/// Height of a white texel of the height map.
pub const DISPLACEMENT: f32 = 3.;
/// Largest level the control stage may output; OpenGL guarantees at least 64.
pub const MAX_LEVEL: f32 = 64.;
/// Distances between which the level goes down from its maximum to its minimum.
pub const LOD_RANGE: [f32; 2] = [4., 24.];

/// How the terrain is tessellated.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TessellationMode {
  /// More triangles near the camera, fewer far away.
  DistanceBased,
  /// One quad per patch and no displacement, showing the bare grid.
  Flat,
  /// The maximum level everywhere.
  Max,
}

impl Default for TessellationMode {
  fn default() -> Self {
    TessellationMode::DistanceBased
  }
}

impl fmt::Display for TessellationMode {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      TessellationMode::DistanceBased => f.write_str("distance-based"),
      TessellationMode::Flat => f.write_str("flat"),
      TessellationMode::Max => f.write_str("max"),
    }
  }
}

/// Uniform values driving the tessellation stages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TessellationParams {
  pub min_level: f32,
  pub max_level: f32,
  pub displacement: f32,
}

impl TessellationMode {
  /// Mode selected by a number key.
  pub fn from_digit(digit: u8) -> Option<Self> {
    match digit {
      1 => Some(TessellationMode::DistanceBased),
      2 => Some(TessellationMode::Flat),
      3 => Some(TessellationMode::Max),
      _ => None,
    }
  }

  pub fn params(self) -> TessellationParams {
    match self {
      TessellationMode::DistanceBased => TessellationParams {
        min_level: 1.,
        max_level: MAX_LEVEL,
        displacement: DISPLACEMENT,
      },

      TessellationMode::Flat => TessellationParams {
        min_level: 1.,
        max_level: 1.,
        displacement: 0.,
      },

      TessellationMode::Max => TessellationParams {
        min_level: MAX_LEVEL,
        max_level: MAX_LEVEL,
        displacement: DISPLACEMENT,
      },
    }
  }
}

fn terrain_model() -> Matrix4<f32> {
  Matrix4::from_nonuniform_scale(PATCH_SIZE, 1., PATCH_SIZE)
}

pub struct TerrainScene {
  viewer: Viewer,
  mode: TessellationMode,
  program: TerrainProgram,
  grid: Tess<PosTex, u32>,
  color_map: RgbTexture,
  height_map: RgbTexture,
}

impl Scene for TerrainScene {
  fn features() -> Features {
    Features::none().texture(COLOR_TEXTURE).texture(HEIGHT_TEXTURE)
  }

  fn bootstrap(
    config: &SceneConfig,
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, SceneError> {
    let viewer = Viewer::new(Point3::new(0., 8., -20.), Point3::new(0., 0., 0.), config.size);
    let program = shaders::terrain(context)?;
    let grid = geometry::quad_grid(GRID_SIZE).upload(context, Mode::Patch(4))?;

    let color_map = load_texture(context, platform, COLOR_TEXTURE, config.sampler, Fallback::Checkerboard)?;
    // a missing height map leaves the terrain flat
    let height_map = load_texture(context, platform, HEIGHT_TEXTURE, config.sampler, Fallback::Flat([0, 0, 0]))?;

    let mode = TessellationMode::default();
    log::info!("terrain of {0}×{0} patches, {1} tessellation", GRID_SIZE, mode);

    Ok(TerrainScene {
      viewer,
      mode,
      program,
      grid,
      color_map,
      height_map,
    })
  }

  fn render_frame(
    mut self,
    input: &FrameInput,
    back_buffer: Framebuffer<Dim2, (), ()>,
    actions: impl Iterator<Item = InputAction>,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> LoopFeedback<Self> {
    for action in actions {
      match action {
        InputAction::Quit => return LoopFeedback::Exit,

        InputAction::SelectTessellation(mode) => {
          log::info!("{} tessellation", mode);
          self.mode = mode;
        }

        _ => self.viewer.handle(&action),
      }
    }

    self.viewer.update(input);

    let camera = self.viewer.camera;
    let eye = camera.position();
    let params = self.mode.params();
    let render_state = self.viewer.toggles.render_state();
    let program = &mut self.program;
    let grid = &self.grid;
    let color_map = &mut self.color_map;
    let height_map = &mut self.height_map;

    let render = context
      .new_pipeline_gate()
      .pipeline(
        &back_buffer,
        &PipelineState::default().set_clear_color(CLEAR_COLOR),
        |pipeline, mut shd_gate| {
          let color_map = pipeline.bind_texture(color_map)?;
          let height_map = pipeline.bind_texture(height_map)?;

          shd_gate.shade(program, |mut iface, uni, mut rdr_gate| {
            iface.set(&uni.model, Mat44::new(terrain_model()));
            iface.set(&uni.view, Mat44::new(camera.world_to_view()));
            iface.set(&uni.projection, Mat44::new(camera.projection()));
            iface.set(&uni.camera_position, Vec3::new(eye.x, eye.y, eye.z));
            iface.set(&uni.min_level, params.min_level);
            iface.set(&uni.max_level, params.max_level);
            iface.set(&uni.lod_range, Vec2::new(LOD_RANGE[0], LOD_RANGE[1]));
            iface.set(&uni.displacement, params.displacement);
            iface.set(&uni.tiling, Vec2::new(COLOR_TILING[0], COLOR_TILING[1]));
            iface.set(&uni.color_map, color_map.binding());
            iface.set(&uni.height_map, height_map.binding());

            rdr_gate.render(&render_state, |mut tess_gate| tess_gate.render(grid))
          })
        },
      )
      .assume();

    if let Err(e) = render.into_result() {
      log::error!("terrain pass failed: {}", e);
      return LoopFeedback::Exit;
    }

    LoopFeedback::Continue(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn number_keys_select_modes() {
    assert_eq!(TessellationMode::from_digit(1), Some(TessellationMode::DistanceBased));
    assert_eq!(TessellationMode::from_digit(2), Some(TessellationMode::Flat));
    assert_eq!(TessellationMode::from_digit(3), Some(TessellationMode::Max));
    assert_eq!(TessellationMode::from_digit(0), None);
    assert_eq!(TessellationMode::from_digit(4), None);
  }

  #[test]
  fn distance_based_spans_every_level() {
    let params = TessellationMode::DistanceBased.params();

    assert_eq!(params.min_level, 1.);
    assert_eq!(params.max_level, MAX_LEVEL);
    assert_eq!(params.displacement, DISPLACEMENT);
    assert_eq!(TessellationMode::default(), TessellationMode::DistanceBased);
  }

  #[test]
  fn flat_shows_the_bare_grid() {
    let params = TessellationMode::Flat.params();

    assert_eq!(params.min_level, params.max_level);
    assert_eq!(params.max_level, 1.);
    assert_eq!(params.displacement, 0.);
  }

  #[test]
  fn max_ignores_the_distance() {
    let params = TessellationMode::Max.params();

    assert_eq!(params.min_level, MAX_LEVEL);
    assert_eq!(params.max_level, MAX_LEVEL);
    assert!(params.displacement > 0.);
  }

  #[test]
  fn lod_range_is_ordered() {
    assert!(LOD_RANGE[0] < LOD_RANGE[1]);
  }

  #[test]
  fn mode_names() {
    assert_eq!(TessellationMode::DistanceBased.to_string(), "distance-based");
    assert_eq!(TessellationMode::Flat.to_string(), "flat");
    assert_eq!(TessellationMode::Max.to_string(), "max");
  }

  #[test]
  fn grid_covers_the_terrain() {
    let grid = geometry::quad_grid(GRID_SIZE);
    let (lo, hi) = grid.bounds().unwrap();

    assert_eq!(hi[0] - lo[0], GRID_SIZE as f32);
    assert_eq!(grid.indices.len(), (GRID_SIZE * GRID_SIZE * 4) as usize);
  }
}
