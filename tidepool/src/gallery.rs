//! Every procedural mesh side by side, spinning.
//!
//! From left to right: the colored quad, cube, shared-corner cube and pool, the lit tetrahedron, the textured quad and
//! cube, then the normal-mapped quad and cube. The main action pauses the rotation.

use cgmath::{Matrix4, Point3, Rad, Vector3};
use luminance_front::{
  context::GraphicsContext,
  framebuffer::Framebuffer,
  pipeline::PipelineState,
  shader::types::{Mat44, Vec2, Vec3, Vec4},
  tess::{Mode, Tess},
  texture::Dim2,
  Backend,
};

use crate::{
  geometry::{self, Mesh, PosCol, PosNrm, PosNrmTgtTex, PosTex},
  shaders::{self, ColorProgram, LitProgram, NormalMappedProgram, TexturedProgram, NO_CLIP},
  textures::{load_texture, Fallback, RgbTexture},
  viewer::Viewer,
  Features, FrameInput, InputAction, LoopFeedback, PlatformServices, Scene, SceneConfig, SceneError,
  CLEAR_COLOR,
};

const DIFFUSE_TEXTURE: &str = "bricks.jpg";
const NORMAL_TEXTURE: &str = "bricks_normal.png";

// radians per second
const ROTATION_SPEED: f32 = 0.8;
// space between two meshes
const GAP: f32 = 0.5;

const LIGHT_DIR: [f32; 3] = [-0.4, -0.8, 0.45];
const ALBEDO: [f32; 3] = [0.9, 0.6, 0.2];

/// Horizontal centres of items of the given `widths` laid out in a row separated by `gap`, the row being centred at
/// zero.
pub fn row_offsets(widths: &[f32], gap: f32) -> Vec<f32> {
  let total = widths.iter().sum::<f32>() + gap * widths.len().saturating_sub(1) as f32;
  let mut cursor = -total * 0.5;

  widths
    .iter()
    .map(|&width| {
      let center = cursor + width * 0.5;
      cursor += width + gap;
      center
    })
    .collect()
}

fn width<V>(mesh: &Mesh<V>) -> f32 {
  mesh.bounds().map_or(0., |(lo, hi)| hi[0] - lo[0])
}

fn model(x: f32, angle: f32) -> Matrix4<f32> {
  Matrix4::from_translation(Vector3::new(x, 0., 0.)) * Matrix4::from_angle_y(Rad(angle))
}

pub struct GalleryScene {
  viewer: Viewer,
  color: ColorProgram,
  lit: LitProgram,
  textured: TexturedProgram,
  normal_mapped: NormalMappedProgram,
  colored: Vec<(Tess<PosCol, u32>, f32)>,
  tetrahedron: (Tess<PosNrm, u32>, f32),
  textured_meshes: Vec<(Tess<PosTex, u32>, f32)>,
  normal_mapped_meshes: Vec<(Tess<PosNrmTgtTex, u32>, f32)>,
  diffuse: RgbTexture,
  normal_map: RgbTexture,
  angle: f32,
  paused: bool,
}

impl Scene for GalleryScene {
  fn features() -> Features {
    Features::none().texture(DIFFUSE_TEXTURE).texture(NORMAL_TEXTURE)
  }

  fn bootstrap(
    config: &SceneConfig,
    platform: &mut impl PlatformServices,
    context: &mut impl GraphicsContext<Backend = Backend>,
  ) -> Result<Self, SceneError> {
    let viewer = Viewer::new(Point3::new(0., 4., -14.), Point3::new(0., 0., 0.), config.size);

    let color = shaders::color(context)?;
    let lit = shaders::lit(context)?;
    let textured = shaders::textured(context)?;
    let normal_mapped = shaders::normal_mapped(context)?;

    let colored_meshes = [
      geometry::quad_color(),
      geometry::cube_color(),
      geometry::cube_color_shared(),
      geometry::pool_color(),
    ];
    let tetrahedron = geometry::tetrahedron();
    let textured_meshes = [geometry::quad_tex(), geometry::cube_tex()];
    let normal_mapped_meshes = [
      geometry::quad_normal_tangent_tex(),
      geometry::cube_normal_tangent_tex(),
    ];

    let widths = colored_meshes
      .iter()
      .map(width)
      .chain(std::iter::once(width(&tetrahedron)))
      .chain(textured_meshes.iter().map(width))
      .chain(normal_mapped_meshes.iter().map(width))
      .collect::<Vec<_>>();
    let mut offsets = row_offsets(&widths, GAP).into_iter();
    let mut next_offset = move || offsets.next().unwrap_or(0.);

    let colored = colored_meshes
      .iter()
      .map(|mesh| -> Result<_, SceneError> { Ok((mesh.upload(context, Mode::Triangle)?, next_offset())) })
      .collect::<Result<Vec<_>, _>>()?;
    let tetrahedron = (tetrahedron.upload(context, Mode::Triangle)?, next_offset());
    let textured_meshes = textured_meshes
      .iter()
      .map(|mesh| -> Result<_, SceneError> { Ok((mesh.upload(context, Mode::Triangle)?, next_offset())) })
      .collect::<Result<Vec<_>, _>>()?;
    let normal_mapped_meshes = normal_mapped_meshes
      .iter()
      .map(|mesh| -> Result<_, SceneError> { Ok((mesh.upload(context, Mode::Triangle)?, next_offset())) })
      .collect::<Result<Vec<_>, _>>()?;

    let diffuse = load_texture(context, platform, DIFFUSE_TEXTURE, config.sampler, Fallback::Checkerboard)?;
    let normal_map = load_texture(
      context,
      platform,
      NORMAL_TEXTURE,
      config.sampler,
      Fallback::Flat([128, 128, 255]),
    )?;

    log::info!("gallery of {} meshes", widths.len());

    Ok(GalleryScene {
      viewer,
      color,
      lit,
      textured,
      normal_mapped,
      colored,
      tetrahedron,
      textured_meshes,
      normal_mapped_meshes,
      diffuse,
      normal_map,
      angle: 0.,
      paused: false,
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
          self.paused = !self.paused;
          log::info!("rotation paused: {}", self.paused);
        }

        _ => self.viewer.handle(&action),
      }
    }

    self.viewer.update(input);

    if !self.paused {
      self.angle = (self.angle + ROTATION_SPEED * input.frame.dt) % std::f32::consts::TAU;
    }

    let camera = self.viewer.camera;
    let view = camera.world_to_view();
    let projection = camera.projection();
    let render_state = self.viewer.toggles.render_state();
    let angle = self.angle;

    let color = &mut self.color;
    let lit = &mut self.lit;
    let textured = &mut self.textured;
    let normal_mapped = &mut self.normal_mapped;
    let colored = &self.colored;
    let tetrahedron = &self.tetrahedron;
    let textured_meshes = &self.textured_meshes;
    let normal_mapped_meshes = &self.normal_mapped_meshes;
    let diffuse = &mut self.diffuse;
    let normal_map = &mut self.normal_map;

    let render = context
      .new_pipeline_gate()
      .pipeline(
        &back_buffer,
        &PipelineState::default().set_clear_color(CLEAR_COLOR),
        |pipeline, mut shd_gate| {
          let diffuse = pipeline.bind_texture(diffuse)?;
          let normal_map = pipeline.bind_texture(normal_map)?;

          shd_gate.shade(color, |mut iface, uni, mut rdr_gate| {
            iface.set(&uni.view, Mat44::new(view));
            iface.set(&uni.projection, Mat44::new(projection));

            for (tess, x) in colored {
              iface.set(&uni.model, Mat44::new(model(*x, angle)));
              rdr_gate.render(&render_state, |mut tess_gate| tess_gate.render(tess))?;
            }

            Ok(())
          })?;

          shd_gate.shade(lit, |mut iface, uni, mut rdr_gate| {
            let (tess, x) = tetrahedron;

            iface.set(&uni.model, Mat44::new(model(*x, angle)));
            iface.set(&uni.view, Mat44::new(view));
            iface.set(&uni.projection, Mat44::new(projection));
            iface.set(&uni.light_dir, Vec3::new(LIGHT_DIR[0], LIGHT_DIR[1], LIGHT_DIR[2]));
            iface.set(&uni.albedo, Vec3::new(ALBEDO[0], ALBEDO[1], ALBEDO[2]));

            rdr_gate.render(&render_state, |mut tess_gate| tess_gate.render(tess))
          })?;

          shd_gate.shade(textured, |mut iface, uni, mut rdr_gate| {
            iface.set(&uni.view, Mat44::new(view));
            iface.set(&uni.projection, Mat44::new(projection));
            iface.set(&uni.clip_plane, Vec4::from(NO_CLIP));
            iface.set(&uni.tiling, Vec2::new(1., 1.));
            iface.set(&uni.diffuse, diffuse.binding());

            for (tess, x) in textured_meshes {
              iface.set(&uni.model, Mat44::new(model(*x, angle)));
              rdr_gate.render(&render_state, |mut tess_gate| tess_gate.render(tess))?;
            }

            Ok(())
          })?;

          shd_gate.shade(normal_mapped, |mut iface, uni, mut rdr_gate| {
            iface.set(&uni.view, Mat44::new(view));
            iface.set(&uni.projection, Mat44::new(projection));
            iface.set(&uni.light_dir, Vec3::new(LIGHT_DIR[0], LIGHT_DIR[1], LIGHT_DIR[2]));
            iface.set(&uni.diffuse, diffuse.binding());
            iface.set(&uni.normal_map, normal_map.binding());

            for (tess, x) in normal_mapped_meshes {
              iface.set(&uni.model, Mat44::new(model(*x, angle)));
              rdr_gate.render(&render_state, |mut tess_gate| tess_gate.render(tess))?;
            }

            Ok(())
          })
        },
      )
      .assume();

    if let Err(e) = render.into_result() {
      log::error!("gallery pass failed: {}", e);
      return LoopFeedback::Exit;
    }

    LoopFeedback::Continue(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn row_is_centred() {
    let offsets = row_offsets(&[1., 1., 1.], 0.5);

    assert_eq!(offsets, vec![-1.5, 0., 1.5]);
  }

  #[test]
  fn row_keeps_gaps_between_uneven_widths() {
    let widths = [2., 1., 4.];
    let offsets = row_offsets(&widths, 1.);

    for i in 1..widths.len() {
      let gap = (offsets[i] - widths[i] * 0.5) - (offsets[i - 1] + widths[i - 1] * 0.5);
      assert!((gap - 1.).abs() < 1e-6);
    }

    let left = offsets[0] - widths[0] * 0.5;
    let right = offsets[2] + widths[2] * 0.5;
    assert!((left + right).abs() < 1e-6);
  }

  #[test]
  fn empty_row() {
    assert!(row_offsets(&[], GAP).is_empty());
  }

  #[test]
  fn unit_meshes_are_one_unit_wide() {
    assert_eq!(width(&geometry::cube_color()), 1.);
    assert_eq!(width(&geometry::quad_tex()), 1.);
    assert_eq!(width(&geometry::tetrahedron()), 1.);
  }

  #[test]
  fn rotation_spins_in_place() {
    let m = model(2., 1.);

    assert_eq!([m.w.x, m.w.y, m.w.z], [2., 0., 0.]);
  }
}
