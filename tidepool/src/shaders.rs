//! Shader programs and their uniform interfaces.
//!
//! Sources live next to this file in `shaders/`. The backend prepends the `#version` line, so the sources start right
//! away with their declarations (or with the extensions they need).

use luminance::{shader::TessellationStages, vertex::Semantics as VertexSemantics, UniformInterface};
use luminance_front::{
  context::GraphicsContext,
  pipeline::TextureBinding,
  pixel::{Floating, NormUnsigned},
  shader::{
    types::{Mat44, Vec2, Vec3, Vec4},
    Program, Uniform,
  },
  texture::Dim2,
  Backend,
};

use crate::{geometry::Semantics, SceneError};

const TEXTURED_VS: &str = include_str!("shaders/textured-vs.glsl");
const TEXTURED_FS: &str = include_str!("shaders/textured-fs.glsl");
const COLOR_VS: &str = include_str!("shaders/color-vs.glsl");
const COLOR_FS: &str = include_str!("shaders/color-fs.glsl");
const LIT_VS: &str = include_str!("shaders/lit-vs.glsl");
const LIT_FS: &str = include_str!("shaders/lit-fs.glsl");
const NORMAL_MAPPED_VS: &str = include_str!("shaders/normal-mapped-vs.glsl");
const NORMAL_MAPPED_FS: &str = include_str!("shaders/normal-mapped-fs.glsl");
const WATER_VS: &str = include_str!("shaders/water-vs.glsl");
const WATER_FS: &str = include_str!("shaders/water-fs.glsl");
const TERRAIN_VS: &str = include_str!("shaders/terrain-vs.glsl");
const TERRAIN_TCS: &str = include_str!("shaders/terrain-tcs.glsl");
const TERRAIN_TES: &str = include_str!("shaders/terrain-tes.glsl");
const TERRAIN_FS: &str = include_str!("shaders/terrain-fs.glsl");
const OVERLAY_VS: &str = include_str!("shaders/overlay-vs.glsl");
const OVERLAY_FS: &str = include_str!("shaders/overlay-fs.glsl");

/// Clip plane that keeps everything.
pub const NO_CLIP: [f32; 4] = [0., 0., 0., 1.];

/// Textured geometry, clipped against a plane.
///
/// Besides the color, the fragment shader writes the window-space depth to its second output so that the depth can be
/// sampled later on from a color attachment.
#[derive(Debug, UniformInterface)]
pub struct TexturedInterface {
  #[uniform(unbound)]
  pub model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub projection: Uniform<Mat44<f32>>,
  /// `(a, b, c, d)`: fragments where `a·x + b·y + c·z + d < 0` in world space are discarded.
  #[uniform(unbound)]
  pub clip_plane: Uniform<Vec4<f32>>,
  /// Texture coordinates scale.
  #[uniform(unbound)]
  pub tiling: Uniform<Vec2<f32>>,
  #[uniform(unbound)]
  pub diffuse: Uniform<TextureBinding<Dim2, NormUnsigned>>,
}

/// Vertex-colored geometry.
#[derive(Debug, UniformInterface)]
pub struct ColorInterface {
  #[uniform(unbound)]
  pub model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub projection: Uniform<Mat44<f32>>,
}

/// Flat-colored geometry lit by a directional light.
#[derive(Debug, UniformInterface)]
pub struct LitInterface {
  #[uniform(unbound)]
  pub model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub projection: Uniform<Mat44<f32>>,
  /// Direction the light travels in, world space.
  #[uniform(unbound)]
  pub light_dir: Uniform<Vec3<f32>>,
  #[uniform(unbound)]
  pub albedo: Uniform<Vec3<f32>>,
}

#[derive(Debug, UniformInterface)]
pub struct NormalMappedInterface {
  #[uniform(unbound)]
  pub model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub projection: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub light_dir: Uniform<Vec3<f32>>,
  #[uniform(unbound)]
  pub diffuse: Uniform<TextureBinding<Dim2, NormUnsigned>>,
  #[uniform(unbound)]
  pub normal_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
}

/// Water surface mixing refraction and reflection.
#[derive(Debug, UniformInterface)]
pub struct WaterInterface {
  #[uniform(unbound)]
  pub model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub projection: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub camera_position: Uniform<Vec3<f32>>,
  /// Near and far planes of the projection, to linearize depth.
  #[uniform(unbound)]
  pub near_far: Uniform<Vec2<f32>>,
  /// Wave offset, in `[0, 1)`.
  #[uniform(unbound)]
  pub movement: Uniform<f32>,
  #[uniform(unbound)]
  pub tiling: Uniform<Vec2<f32>>,
  #[uniform(unbound)]
  pub refraction: Uniform<TextureBinding<Dim2, Floating>>,
  #[uniform(unbound)]
  pub refraction_depth: Uniform<TextureBinding<Dim2, Floating>>,
  #[uniform(unbound)]
  pub reflection: Uniform<TextureBinding<Dim2, Floating>>,
  #[uniform(unbound)]
  pub normal_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
  #[uniform(unbound)]
  pub dudv_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
}

/// Terrain patches tessellated by distance to the camera and displaced by a height map.
#[derive(Debug, UniformInterface)]
pub struct TerrainInterface {
  #[uniform(unbound)]
  pub model: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub view: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub projection: Uniform<Mat44<f32>>,
  #[uniform(unbound)]
  pub camera_position: Uniform<Vec3<f32>>,
  /// Tessellation level far away.
  #[uniform(unbound)]
  pub min_level: Uniform<f32>,
  /// Tessellation level up close.
  #[uniform(unbound)]
  pub max_level: Uniform<f32>,
  /// Distances over which the level goes from `max_level` to `min_level`.
  #[uniform(unbound)]
  pub lod_range: Uniform<Vec2<f32>>,
  /// Height of a white texel of the height map.
  #[uniform(unbound)]
  pub displacement: Uniform<f32>,
  #[uniform(unbound)]
  pub tiling: Uniform<Vec2<f32>>,
  #[uniform(unbound)]
  pub height_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
  #[uniform(unbound)]
  pub color_map: Uniform<TextureBinding<Dim2, NormUnsigned>>,
}

/// Screen-space quad showing a floating-point texture.
#[derive(Debug, UniformInterface)]
pub struct OverlayInterface {
  #[uniform(unbound)]
  pub offset: Uniform<Vec2<f32>>,
  #[uniform(unbound)]
  pub scale: Uniform<Vec2<f32>>,
  #[uniform(unbound)]
  pub source: Uniform<TextureBinding<Dim2, Floating>>,
}

pub type TexturedProgram = Program<Semantics, (), TexturedInterface>;
pub type ColorProgram = Program<Semantics, (), ColorInterface>;
pub type LitProgram = Program<Semantics, (), LitInterface>;
pub type NormalMappedProgram = Program<Semantics, (), NormalMappedInterface>;
pub type WaterProgram = Program<Semantics, (), WaterInterface>;
pub type TerrainProgram = Program<Semantics, (), TerrainInterface>;
pub type OverlayProgram = Program<Semantics, (), OverlayInterface>;

// Build a program, logging its warnings.
fn build<Sem, Uni>(
  context: &mut impl GraphicsContext<Backend = Backend>,
  name: &'static str,
  vertex: &str,
  tess: Option<TessellationStages<str>>,
  fragment: &str,
) -> Result<Program<Sem, (), Uni>, SceneError>
where
  Sem: VertexSemantics,
  Uni: luminance::shader::UniformInterface<Backend>,
{
  let built = context
    .new_shader_program::<Sem, (), Uni>()
    .from_strings(vertex, tess, None, fragment)
    .map_err(|source| SceneError::Shader { name, source })?;

  for warning in &built.warnings {
    log::warn!("{} program: {}", name, warning);
  }

  log::debug!("{} program built", name);
  Ok(built.program)
}

pub fn textured(
  context: &mut impl GraphicsContext<Backend = Backend>,
) -> Result<TexturedProgram, SceneError> {
  build(context, "textured", TEXTURED_VS, None, TEXTURED_FS)
}

pub fn color(
  context: &mut impl GraphicsContext<Backend = Backend>,
) -> Result<ColorProgram, SceneError> {
  build(context, "color", COLOR_VS, None, COLOR_FS)
}

pub fn lit(context: &mut impl GraphicsContext<Backend = Backend>) -> Result<LitProgram, SceneError> {
  build(context, "lit", LIT_VS, None, LIT_FS)
}

pub fn normal_mapped(
  context: &mut impl GraphicsContext<Backend = Backend>,
) -> Result<NormalMappedProgram, SceneError> {
  build(
    context,
    "normal mapped",
    NORMAL_MAPPED_VS,
    None,
    NORMAL_MAPPED_FS,
  )
}

pub fn water(
  context: &mut impl GraphicsContext<Backend = Backend>,
) -> Result<WaterProgram, SceneError> {
  build(context, "water", WATER_VS, None, WATER_FS)
}

pub fn terrain(
  context: &mut impl GraphicsContext<Backend = Backend>,
) -> Result<TerrainProgram, SceneError> {
  let stages = TessellationStages {
    control: TERRAIN_TCS,
    evaluation: TERRAIN_TES,
  };

  build(context, "terrain", TERRAIN_VS, Some(stages), TERRAIN_FS)
}

pub fn overlay(
  context: &mut impl GraphicsContext<Backend = Backend>,
) -> Result<OverlayProgram, SceneError> {
  build(context, "overlay", OVERLAY_VS, None, OVERLAY_FS)
}

#[cfg(test)]
mod tests {
  use super::*;

  // The backend prepends its own `#version`, and extensions must come before any declaration.
  #[test]
  fn sources_do_not_declare_a_version() {
    for src in [
      TEXTURED_VS,
      TEXTURED_FS,
      COLOR_VS,
      COLOR_FS,
      LIT_VS,
      LIT_FS,
      NORMAL_MAPPED_VS,
      NORMAL_MAPPED_FS,
      WATER_VS,
      WATER_FS,
      TERRAIN_VS,
      TERRAIN_TCS,
      TERRAIN_TES,
      TERRAIN_FS,
      OVERLAY_VS,
      OVERLAY_FS,
    ] {
      assert!(!src.contains("#version"));
    }
  }

  #[test]
  fn tessellation_stages_enable_the_extension_first() {
    for src in [TERRAIN_TCS, TERRAIN_TES] {
      let first = src.lines().find(|l| !l.trim().is_empty());
      assert_eq!(
        first,
        Some("#extension GL_ARB_tessellation_shader : require")
      );
    }
  }

  #[test]
  fn control_stage_emits_four_vertex_patches() {
    assert!(TERRAIN_TCS.contains("layout (vertices = 4) out;"));
    assert!(TERRAIN_TES.contains("layout (quads"));
  }

  #[test]
  fn water_constants() {
    for constant in [
      "DISTORTION = 0.01",
      "OFFSET_FACTOR = 0.1",
      "DEPTH_SCALE = 0.91",
      "FOG_DENSITY = 1.1",
      "N1 = 1.0",
      "N2 = 1.33",
      "FRESNEL_POWER = 4.0",
      "DEEP_WATER = vec3(0.0, 0.0, 0.247)",
      "FOG_BLEND = 0.5",
    ] {
      assert!(WATER_FS.contains(constant), "missing {}", constant);
    }
  }

  #[test]
  fn water_mixes_distance_and_depth_fogs() {
    assert!(WATER_FS.contains("texture(refraction_depth, screen)"));
    assert!(WATER_FS.contains("clamp(floor_distance - surface_distance, 0.01, 0.99) * DEPTH_SCALE"));
    assert!(WATER_FS.contains("1.0 - exp(-surface_distance * FOG_DENSITY)"));
    assert!(WATER_FS.contains("mix(far_fog, deep_fog, FOG_BLEND)"));
  }
}
