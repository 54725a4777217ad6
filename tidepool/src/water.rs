//! A pool of water sunk into the ground, under a sky box.
//!
//! Every frame is rendered in three passes:
//!
//! 1. The world above the water, mirrored about the water plane, into an offscreen framebuffer: that’s the
//!    reflection.
//! 2. The inside of the pool below the water level into another offscreen framebuffer with two color targets, the
//!    color and the depth of what lies under the surface: that’s the refraction.
//! 3. The world as seen by the camera into the back buffer. The ground gets a hole above the pool thanks to the
//!    stencil buffer, and the water surface mixes both offscreen textures depending on the viewing angle.
//!
//! The main action shows the two offscreen textures in the top corners of the screen. The auxiliary action pauses the
//! waves.

use cgmath::{Matrix4, Point3, Vector3};
use luminance::pipeline::PipelineError;
use luminance_front::{
  context::GraphicsContext,
  depth_stencil::{Comparison, StencilOp, StencilOperations, StencilTest, Write},
  framebuffer::Framebuffer,
  pipeline::{BoundTexture, Pipeline, PipelineState, TextureBinding},
  pixel::{Depth32F, Depth32FStencil8, Floating, NormRGB8UI, R32F, RGBA32F},
  render_state::RenderState,
  shader::types::{Mat44, Vec2, Vec3, Vec4},
  shading_gate::ShadingGate,
  tess::{Mode, Tess},
  texture::{Dim2, MagFilter, MinFilter, Sampler, Wrap},
  Backend,
};

use crate::{
  geometry::{self, PosTex},
  shaders::{self, OverlayProgram, TexturedProgram, WaterProgram, NO_CLIP},
  textures::{load_texture, Fallback, RgbTexture},
  viewer::Viewer,
  Features, FrameInput, InputAction, LoopFeedback, PlatformServices, Scene, SceneConfig, SceneError,
  CLEAR_COLOR,
};

const GROUND_TEXTURE: &str = "grass.jpg";
const POOL_TEXTURE: &str = "tiles.jpg";
const SKY_TEXTURE: &str = "sky.jpg";
const WATER_NORMAL_TEXTURE: &str = "water_normal.png";
const WATER_DUDV_TEXTURE: &str = "water_dudv.png";

/// Height of the water surface; the ground lies at zero.
pub const WATER_LEVEL: f32 = -0.2;

/// Width, depth and length of the pool.
pub const POOL_SIZE: [f32; 3] = [4., 2., 6.];
const POOL_TILING: [f32; 2] = [2., 2.];

const GROUND_SIZE: f32 = 20.;
const GROUND_TILING: [f32; 2] = [10., 10.];

// must stay within the far plane, corners included
const SKY_SIZE: f32 = 50.;

// wave offset per second
const WAVE_SPEED: f32 = 0.03;
// normal and du/dv map repetitions along the pool width
const WAVE_TILING: f32 = 2.;

// clears the refraction depth target to the far plane; the same color goes to the refraction color target
const REFRACTION_CLEAR_COLOR: [f32; 4] = [1., 1., 1., 1.];

const FLAT_NORMAL: [u8; 3] = [128, 128, 255];
const NO_DISTORTION: [u8; 3] = [128, 128, 0];

type ReflectionBuffer = Framebuffer<Dim2, RGBA32F, Depth32FStencil8>;
type RefractionBuffer = Framebuffer<Dim2, (RGBA32F, R32F), Depth32F>;

/// Clip plane keeping what lies above `height`.
pub fn reflection_clip_plane(height: f32) -> [f32; 4] {
  [0., 1., 0., -height]
}

/// Clip plane keeping what lies below `height`.
pub fn refraction_clip_plane(height: f32) -> [f32; 4] {
  [0., -1., 0., height]
}

/// Move the waves forward by `dt` seconds; the offset stays in `[0, 1)`.
pub fn advance_waves(movement: f32, dt: f32) -> f32 {
  (movement + WAVE_SPEED * dt).rem_euclid(1.)
}

/// Texture coordinates scale of the water so that waves keep their aspect ratio on a non-square pool.
pub fn water_tiling() -> [f32; 2] {
  [WAVE_TILING, WAVE_TILING * POOL_SIZE[2] / POOL_SIZE[0]]
}

fn pool_model() -> Matrix4<f32> {
  // the unit pool is centred at the origin; lift it so that its rim is flush with the ground
  Matrix4::from_translation(Vector3::new(0., -POOL_SIZE[1] * 0.5, 0.))
    * Matrix4::from_nonuniform_scale(POOL_SIZE[0], POOL_SIZE[1], POOL_SIZE[2])
}

fn opening_model() -> Matrix4<f32> {
  Matrix4::from_nonuniform_scale(POOL_SIZE[0], 1., POOL_SIZE[2])
}

fn water_model() -> Matrix4<f32> {
  Matrix4::from_translation(Vector3::new(0., WATER_LEVEL, 0.)) * opening_model()
}

fn ground_model() -> Matrix4<f32> {
  Matrix4::from_nonuniform_scale(GROUND_SIZE, 1., GROUND_SIZE)
}

fn sky_model(eye: Point3<f32>) -> Matrix4<f32> {
  Matrix4::from_translation(Vector3::new(eye.x, eye.y, eye.z)) * Matrix4::from_scale(SKY_SIZE)
}

fn framebuffer_sampler() -> Sampler {
  Sampler {
    wrap_r: Wrap::ClampToEdge,
    wrap_s: Wrap::ClampToEdge,
    wrap_t: Wrap::ClampToEdge,
    min_filter: MinFilter::Linear,
    mag_filter: MagFilter::Linear,
    ..Sampler::default()
  }
}

fn framebuffer_size([width, height]: [u32; 2]) -> [u32; 2] {
  [width.max(1), height.max(1)]
}

fn clear_state(color: [f32; 4]) -> PipelineState {
  PipelineState::default().set_clear_color(color).set_clear_stencil(0)
}

fn vec2(v: [f32; 2]) -> Vec2<f32> {
  Vec2::new(v[0], v[1])
}

fn vec4(v: [f32; 4]) -> Vec4<f32> {
  Vec4::new(v[0], v[1], v[2], v[3])
}

// Render state writing 1 in the stencil buffer wherever something is drawn, leaving depth alone.
fn stencil_write(state: &RenderState) -> RenderState {
  state
    .clone()
    .set_depth_write(Write::Off)
    .set_stencil_test(StencilTest::new(Comparison::Always, 1, 0xFF))
    .set_stencil_operations(StencilOperations::default().on_depth_stencil_pass(StencilOp::Replace))
}

// Render state drawing only where the stencil buffer was left untouched.
fn outside_stencil(state: &RenderState) -> RenderState {
  state.clone().set_stencil_test(StencilTest::new(Comparison::Equal, 0, 0xFF))
}

/// Static geometry of the scene.
struct Meshes {
  ground: Tess<PosTex, u32>,
  pool: Tess<PosTex, u32>,
  water: Tess<PosTex, u32>,
  sky: Tess<PosTex, u32>,
  overlay: Tess<PosTex, u32>,
}

impl Meshes {
  fn new(context: &mut impl GraphicsContext<Backend = Backend>) -> Result<Self, SceneError> {
    let quad = geometry::quad_tex();

    Ok(Meshes {
      ground: quad.upload(context, Mode::Triangle)?,
      pool: geometry::pool_tex().upload(context, Mode::Triangle)?,
      water: quad.upload(context, Mode::Triangle)?,
      sky: geometry::cube_tex_inside_out().upload(context, Mode::Triangle)?,
      overlay: geometry::quad_tex_2d().upload(context, Mode::Triangle)?,
    })
  }
}

/// Textures of the surroundings of the water, bound for a whole pass.
struct SurroundingTextures<'a> {
  ground: BoundTexture<'a, Dim2, NormRGB8UI>,
  pool: BoundTexture<'a, Dim2, NormRGB8UI>,
  sky: BoundTexture<'a, Dim2, NormRGB8UI>,
}

impl<'a> SurroundingTextures<'a> {
  fn bind(
    pipeline: &'a Pipeline<'a>,
    ground: &'a mut RgbTexture,
    pool: &'a mut RgbTexture,
    sky: &'a mut RgbTexture,
  ) -> Result<Self, PipelineError> {
    Ok(SurroundingTextures {
      ground: pipeline.bind_texture(ground)?,
      pool: pipeline.bind_texture(pool)?,
      sky: pipeline.bind_texture(sky)?,
    })
  }
}

/// What changes between the passes drawing the surroundings.
struct Pass {
  view: Matrix4<f32>,
  projection: Matrix4<f32>,
  /// Where the sky is centred.
  eye: Point3<f32>,
  clip_plane: [f32; 4],
  state: RenderState,
  sky: bool,
  ground: bool,
}

// Draw the sky, the ground around the pool and the pool itself.
fn draw_surroundings(
  shd_gate: &mut ShadingGate,
  program: &mut TexturedProgram,
  meshes: &Meshes,
  textures: &SurroundingTextures,
  pass: &Pass,
) -> Result<(), PipelineError> {
  shd_gate.shade(program, |mut iface, uni, mut rdr_gate| {
    iface.set(&uni.view, Mat44::new(pass.view));
    iface.set(&uni.projection, Mat44::new(pass.projection));

    if pass.sky {
      iface.set(&uni.model, Mat44::new(sky_model(pass.eye)));
      iface.set(&uni.clip_plane, vec4(NO_CLIP));
      iface.set(&uni.tiling, vec2([1., 1.]));
      iface.set(&uni.diffuse, textures.sky.binding());

      rdr_gate.render(&pass.state.clone().set_depth_write(Write::Off), |mut tess_gate| {
        tess_gate.render(&meshes.sky)
      })?;
    }

    iface.set(&uni.clip_plane, vec4(pass.clip_plane));

    if pass.ground {
      iface.set(&uni.model, Mat44::new(opening_model()));
      iface.set(&uni.tiling, vec2([1., 1.]));
      iface.set(&uni.diffuse, textures.ground.binding());

      rdr_gate.render(&stencil_write(&pass.state), |mut tess_gate| {
        tess_gate.render(&meshes.ground)
      })?;

      iface.set(&uni.model, Mat44::new(ground_model()));
      iface.set(&uni.tiling, vec2(GROUND_TILING));

      rdr_gate.render(&outside_stencil(&pass.state), |mut tess_gate| {
        tess_gate.render(&meshes.ground)
      })?;
    }

    iface.set(&uni.model, Mat44::new(pool_model()));
    iface.set(&uni.tiling, vec2(POOL_TILING));
    iface.set(&uni.diffuse, textures.pool.binding());

    rdr_gate.render(&pass.state, |mut tess_gate| {
      tess_gate.render(&meshes.pool)
    })
  })
}

pub struct WaterScene {
  viewer: Viewer,
  textured: TexturedProgram,
  water: WaterProgram,
  overlay: OverlayProgram,
  meshes: Meshes,
  ground_texture: RgbTexture,
  pool_texture: RgbTexture,
  sky_texture: RgbTexture,
  normal_map: RgbTexture,
  dudv_map: RgbTexture,
  reflection: ReflectionBuffer,
  refraction: RefractionBuffer,
  movement: f32,
  waves_paused: bool,
  show_buffers: bool,
}

impl WaterScene {
  fn resize(
    &mut self,
    context: &mut impl GraphicsContext<Backend = Backend>,
    size: [u32; 2],
  ) -> Result<(), SceneError> {
    let size = framebuffer_size(size);
    self.reflection = context.new_framebuffer(size, 0, framebuffer_sampler())?;
    self.refraction = context.new_framebuffer(size, 0, framebuffer_sampler())?;
    Ok(())
  }
}

impl Scene for WaterScene {
  fn features() -> Features {
    Features::none()
      .texture(GROUND_TEXTURE)
      .texture(POOL_TEXTURE)
      .texture(SKY_TEXTURE)
      .texture(WATER_NORMAL_TEXTURE)
      .texture(WATER_DUDV_TEXTURE)
  }

  fn bootstrap(
    config: &SceneConfig,
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, SceneError> {
    let viewer = Viewer::new(Point3::new(0., 2.5, -5.), Point3::new(0., 0., 0.), config.size);

    let textured = shaders::textured(context)?;
    let water = shaders::water(context)?;
    let overlay = shaders::overlay(context)?;
    let meshes = Meshes::new(context)?;

    let sampler = config.sampler;
    let checkerboard = Fallback::Checkerboard;
    let ground_texture = load_texture(context, platform, GROUND_TEXTURE, sampler, checkerboard)?;
    let pool_texture = load_texture(context, platform, POOL_TEXTURE, sampler, checkerboard)?;
    let sky_texture = load_texture(context, platform, SKY_TEXTURE, sampler, checkerboard)?;
    let normal_map = load_texture(
      context,
      platform,
      WATER_NORMAL_TEXTURE,
      sampler,
      Fallback::Flat(FLAT_NORMAL),
    )?;
    let dudv_map = load_texture(
      context,
      platform,
      WATER_DUDV_TEXTURE,
      sampler,
      Fallback::Flat(NO_DISTORTION),
    )?;

    let size = framebuffer_size(config.size);
    let reflection = context.new_framebuffer(size, 0, framebuffer_sampler())?;
    let refraction = context.new_framebuffer(size, 0, framebuffer_sampler())?;

    log::info!("water scene ready ({}×{})", size[0], size[1]);

    Ok(WaterScene {
      viewer,
      textured,
      water,
      overlay,
      meshes,
      ground_texture,
      pool_texture,
      sky_texture,
      normal_map,
      dudv_map,
      reflection,
      refraction,
      movement: 0.,
      waves_paused: false,
      show_buffers: false,
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

        InputAction::MainToggle => {
          self.show_buffers = !self.show_buffers;
          log::info!("offscreen buffers overlay: {}", self.show_buffers);
        }

        InputAction::AuxiliaryToggle => {
          self.waves_paused = !self.waves_paused;
          log::info!("waves paused: {}", self.waves_paused);
        }

        InputAction::Resized { width, height } => {
          self.viewer.handle(&action);

          if let Err(e) = self.resize(context, [width, height]) {
            log::error!("cannot resize the offscreen buffers: {}", e);
            return LoopFeedback::Exit;
          }
        }

        _ => self.viewer.handle(&action),
      }
    }

    self.viewer.update(input);

    if !self.waves_paused {
      self.movement = advance_waves(self.movement, input.frame.dt);
    }

    let camera = self.viewer.camera;
    let toggles = self.viewer.toggles;
    let projection = camera.projection();
    let [near, far] = camera.near_far();
    let eye = camera.position();
    let movement = self.movement;
    let show_buffers = self.show_buffers;

    let textured = &mut self.textured;
    let water = &mut self.water;
    let overlay = &mut self.overlay;
    let meshes = &self.meshes;
    let ground_texture = &mut self.ground_texture;
    let pool_texture = &mut self.pool_texture;
    let sky_texture = &mut self.sky_texture;
    let normal_map = &mut self.normal_map;
    let dudv_map = &mut self.dudv_map;
    let reflection = &mut self.reflection;
    let refraction = &mut self.refraction;

    let mut pipeline_gate = context.new_pipeline_gate();
    let clear = clear_state(CLEAR_COLOR);
    let refraction_clear = clear_state(REFRACTION_CLEAR_COLOR);

    // reflection: the world above the water, mirrored
    let reflection_pass = Pass {
      view: camera.reflected_world_to_view(WATER_LEVEL),
      projection,
      eye: camera.reflected_position(WATER_LEVEL),
      clip_plane: reflection_clip_plane(WATER_LEVEL),
      state: toggles.mirrored_render_state(),
      sky: true,
      ground: true,
    };

    let render = pipeline_gate
      .pipeline(&*reflection, &clear, |pipeline, mut shd_gate| {
        let textures = SurroundingTextures::bind(&pipeline, ground_texture, pool_texture, sky_texture)?;

        draw_surroundings(&mut shd_gate, textured, meshes, &textures, &reflection_pass)
      })
      .assume();

    if let Err(e) = render.into_result() {
      log::error!("reflection pass failed: {}", e);
      return LoopFeedback::Exit;
    }

    // refraction: the inside of the pool, under the water
    let refraction_pass = Pass {
      view: camera.world_to_view(),
      projection,
      eye,
      clip_plane: refraction_clip_plane(WATER_LEVEL),
      state: toggles.render_state(),
      sky: false,
      ground: false,
    };

    let render = pipeline_gate
      .pipeline(&*refraction, &refraction_clear, |pipeline, mut shd_gate| {
        let textures = SurroundingTextures::bind(&pipeline, ground_texture, pool_texture, sky_texture)?;

        draw_surroundings(&mut shd_gate, textured, meshes, &textures, &refraction_pass)
      })
      .assume();

    if let Err(e) = render.into_result() {
      log::error!("refraction pass failed: {}", e);
      return LoopFeedback::Exit;
    }

    // main pass: the surroundings with a hole in the ground, then the water surface
    let main_pass = Pass {
      clip_plane: NO_CLIP,
      sky: true,
      ground: true,
      ..refraction_pass
    };

    let render = pipeline_gate
      .pipeline(&back_buffer, &clear, |pipeline, mut shd_gate| {
        let textures = SurroundingTextures::bind(&pipeline, ground_texture, pool_texture, sky_texture)?;

        draw_surroundings(&mut shd_gate, textured, meshes, &textures, &main_pass)?;

        let reflection_color = pipeline.bind_texture(reflection.color_slot())?;
        let (refraction_color, refraction_depth) = refraction.color_slot();
        let refraction_color = pipeline.bind_texture(refraction_color)?;
        let refraction_depth = pipeline.bind_texture(refraction_depth)?;
        let normal_map = pipeline.bind_texture(normal_map)?;
        let dudv_map = pipeline.bind_texture(dudv_map)?;

        shd_gate.shade(water, |mut iface, uni, mut rdr_gate| {
          iface.set(&uni.model, Mat44::new(water_model()));
          iface.set(&uni.view, Mat44::new(main_pass.view));
          iface.set(&uni.projection, Mat44::new(projection));
          iface.set(&uni.camera_position, Vec3::new(eye.x, eye.y, eye.z));
          iface.set(&uni.near_far, Vec2::new(near, far));
          iface.set(&uni.movement, movement);
          iface.set(&uni.tiling, vec2(water_tiling()));
          iface.set(&uni.refraction, refraction_color.binding());
          iface.set(&uni.refraction_depth, refraction_depth.binding());
          iface.set(&uni.reflection, reflection_color.binding());
          iface.set(&uni.normal_map, normal_map.binding());
          iface.set(&uni.dudv_map, dudv_map.binding());

          rdr_gate.render(&main_pass.state, |mut tess_gate| {
            tess_gate.render(&meshes.water)
          })
        })?;

        if !show_buffers {
          return Ok(());
        }

        draw_overlays(
          &mut shd_gate,
          overlay,
          &meshes.overlay,
          [reflection_color.binding(), refraction_color.binding()],
        )
      })
      .assume();

    if let Err(e) = render.into_result() {
      log::error!("main pass failed: {}", e);
      return LoopFeedback::Exit;
    }

    LoopFeedback::Continue(self)
  }
}

// Show offscreen textures side by side at the top of the screen.
fn draw_overlays(
  shd_gate: &mut ShadingGate,
  program: &mut OverlayProgram,
  quad: &Tess<PosTex, u32>,
  sources: [TextureBinding<Dim2, Floating>; 2],
) -> Result<(), PipelineError> {
  // the quad spans [-1, 0] × [0, 1]; place its right edge with the offset
  const SCALE: [f32; 2] = [0.4, 0.4];
  const OFFSETS: [[f32; 2]; 2] = [[-0.55, 0.55], [0.95, 0.55]];

  let state = RenderState::default().set_depth_test(None);

  shd_gate.shade(program, |mut iface, uni, mut rdr_gate| {
    iface.set(&uni.scale, vec2(SCALE));

    for (source, offset) in sources.into_iter().zip(OFFSETS) {
      iface.set(&uni.offset, vec2(offset));
      iface.set(&uni.source, source);
      rdr_gate.render(&state, |mut tess_gate| tess_gate.render(quad))?;
    }

    Ok(())
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use cgmath::{Transform as _, Vector4};

  fn signed_distance(plane: [f32; 4], p: [f32; 3]) -> f32 {
    plane[0] * p[0] + plane[1] * p[1] + plane[2] * p[2] + plane[3]
  }

  #[test]
  fn clip_planes_split_the_world_at_the_water() {
    let above = [1., WATER_LEVEL + 0.5, -2.];
    let below = [1., WATER_LEVEL - 0.5, -2.];

    let reflection = reflection_clip_plane(WATER_LEVEL);
    assert!(signed_distance(reflection, above) > 0.);
    assert!(signed_distance(reflection, below) < 0.);

    let refraction = refraction_clip_plane(WATER_LEVEL);
    assert!(signed_distance(refraction, above) < 0.);
    assert!(signed_distance(refraction, below) > 0.);

    assert_eq!(signed_distance(NO_CLIP, below), 1.);
  }

  #[test]
  fn waves_wrap_around() {
    assert!((advance_waves(0., 1.) - WAVE_SPEED).abs() < 1e-6);

    let wrapped = advance_waves(0.999, 1.);
    assert!((0. ..1.).contains(&wrapped));
    assert!((wrapped - (0.999 + WAVE_SPEED - 1.)).abs() < 1e-5);
  }

  #[test]
  fn water_tiling_follows_the_pool_shape() {
    let [u, v] = water_tiling();

    assert!((v / u - POOL_SIZE[2] / POOL_SIZE[0]).abs() < 1e-6);
  }

  #[test]
  fn pool_rim_is_flush_with_the_ground() {
    let pool = geometry::pool_tex();
    let model = pool_model();
    let heights = pool
      .positions()
      .iter()
      .map(|p| model.transform_point(Point3::new(p[0], p[1], p[2])).y)
      .collect::<Vec<_>>();

    let top = heights.iter().cloned().fold(f32::MIN, f32::max);
    let bottom = heights.iter().cloned().fold(f32::MAX, f32::min);
    assert!(top.abs() < 1e-6);
    assert!((bottom + POOL_SIZE[1]).abs() < 1e-6);
    assert!(bottom < WATER_LEVEL && WATER_LEVEL < top);
  }

  #[test]
  fn water_and_opening_cover_the_pool() {
    let corner = Vector4::new(0.5, 0., 0.5, 1.);

    let water = water_model() * corner;
    assert_eq!([water.x, water.y, water.z], [2., WATER_LEVEL, 3.]);

    let opening = opening_model() * corner;
    assert_eq!([opening.x, opening.y, opening.z], [2., 0., 3.]);
  }

  #[test]
  fn sky_surrounds_the_eye_within_the_far_plane() {
    let eye = Point3::new(1., 2., 3.);
    let corner = sky_model(eye).transform_point(Point3::new(0.5, 0.5, 0.5));
    let distance = ((corner.x - eye.x).powi(2) + (corner.y - eye.y).powi(2) + (corner.z - eye.z).powi(2)).sqrt();

    assert!(distance < crate::camera::DEFAULT_FAR);
  }

  #[test]
  fn stencil_states() {
    let base = RenderState::default();

    assert_eq!(
      stencil_write(&base),
      base
        .clone()
        .set_depth_write(Write::Off)
        .set_stencil_test(StencilTest::new(Comparison::Always, 1, 0xFF))
        .set_stencil_operations(StencilOperations::default().on_depth_stencil_pass(StencilOp::Replace))
    );
    assert_eq!(
      outside_stencil(&base),
      base.clone().set_stencil_test(StencilTest::new(Comparison::Equal, 0, 0xFF))
    );
  }

  #[test]
  fn refraction_depth_clears_to_the_far_plane() {
    assert_eq!(REFRACTION_CLEAR_COLOR[0], 1.);
    assert_ne!(REFRACTION_CLEAR_COLOR[0], CLEAR_COLOR[0]);
  }

  #[test]
  fn framebuffers_are_never_empty() {
    assert_eq!(framebuffer_size([0, 0]), [1, 1]);
    assert_eq!(framebuffer_size([800, 600]), [800, 600]);
  }

  #[test]
  fn needs_all_its_textures() {
    let features = WaterScene::features();

    assert_eq!(features.textures().len(), 5);
    assert!(features.textures().iter().any(|t| t == WATER_DUDV_TEXTURE));
  }
}
