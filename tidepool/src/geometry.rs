//! Procedural meshes.
//!
//! Every mesh is generated on the CPU as a [`Mesh`], a plain list of vertices and `u32` indices, and is then uploaded
//! with [`Mesh::upload`] once a graphics context is around. The CPU copy keeps the raw positions too, which is what the
//! scenes use to lay objects out and what the tests inspect.
//!
//! Unless stated otherwise, meshes are unit-sized and centred at the origin, and triangles are wound counter-clockwise
//! when seen from the side they are meant to be seen from.

use luminance::{tess::TessError, Semantics, Vertex};
use luminance_front::{
  context::GraphicsContext,
  tess::{Mode, Tess},
  Backend,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Semantics)]
pub enum Semantics {
  #[sem(name = "position", repr = "[f32; 3]", wrapper = "VertexPosition")]
  Position,
  #[sem(name = "color", repr = "[f32; 3]", wrapper = "VertexColor")]
  Color,
  #[sem(name = "normal", repr = "[f32; 3]", wrapper = "VertexNormal")]
  Normal,
  #[sem(name = "tangent", repr = "[f32; 3]", wrapper = "VertexTangent")]
  Tangent,
  #[sem(name = "tex_coords", repr = "[f32; 2]", wrapper = "VertexTexCoords")]
  TexCoords,
}

/// Position and color.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Vertex)]
#[vertex(sem = "Semantics")]
pub struct PosCol {
  pub position: VertexPosition,
  pub color: VertexColor,
}

/// Position and texture coordinates.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Vertex)]
#[vertex(sem = "Semantics")]
pub struct PosTex {
  pub position: VertexPosition,
  pub tex_coords: VertexTexCoords,
}

/// Position and normal.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Vertex)]
#[vertex(sem = "Semantics")]
pub struct PosNrm {
  pub position: VertexPosition,
  pub normal: VertexNormal,
}

/// Position, normal, tangent and texture coordinates.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Vertex)]
#[vertex(sem = "Semantics")]
pub struct PosNrmTgtTex {
  pub position: VertexPosition,
  pub normal: VertexNormal,
  pub tangent: VertexTangent,
  pub tex_coords: VertexTexCoords,
}

/// CPU-side mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh<V> {
  pub vertices: Vec<V>,
  pub indices: Vec<u32>,
  positions: Vec<[f32; 3]>,
}

impl<V> Mesh<V> {
  fn with_capacity(vertices: usize, indices: usize) -> Self {
    Mesh {
      vertices: Vec::with_capacity(vertices),
      indices: Vec::with_capacity(indices),
      positions: Vec::with_capacity(vertices),
    }
  }

  // Push a vertex and return its index.
  fn push(&mut self, position: [f32; 3], vertex: impl FnOnce(VertexPosition) -> V) -> u32 {
    let index = self.vertices.len() as u32;
    self.vertices.push(vertex(VertexPosition::new(position)));
    self.positions.push(position);
    index
  }

  /// Raw vertex positions, in the same order as [`Mesh::vertices`].
  pub fn positions(&self) -> &[[f32; 3]] {
    &self.positions
  }

  /// Axis-aligned bounds as `(min, max)`, or [`None`] for an empty mesh.
  pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
    let first = *self.positions.first()?;

    Some(self.positions.iter().fold((first, first), |(mut lo, mut hi), p| {
      for i in 0..3 {
        lo[i] = lo[i].min(p[i]);
        hi[i] = hi[i].max(p[i]);
      }

      (lo, hi)
    }))
  }
}

macro_rules! impl_upload {
  ($($vertex:ty),* $(,)?) => {
    $(
      impl Mesh<$vertex> {
        /// Upload the mesh into a GPU tessellation rendered with `mode`.
        pub fn upload(
          &self,
          context: &mut impl GraphicsContext<Backend = Backend>,
          mode: Mode,
        ) -> Result<Tess<$vertex, u32>, TessError> {
          context
            .new_tess()
            .set_vertices(&self.vertices[..])
            .set_indices(&self.indices[..])
            .set_mode(mode)
            .build()
        }
      }
    )*
  };
}

impl_upload!(PosCol, PosTex, PosNrm, PosNrmTgtTex);

// A face of the unit cube: outward normal, tangent (the “right” direction when looking at the face from outside) and the
// flat color used by the colored variants.
struct Face {
  normal: [f32; 3],
  tangent: [f32; 3],
  color: [f32; 3],
}

const TOP: usize = 4;

#[rustfmt::skip]
static CUBE_FACES: [Face; 6] = [
  // front
  Face { normal: [ 0.,  0.,  1.], tangent: [ 1., 0.,  0.], color: [1., 0., 1.] },
  // back
  Face { normal: [ 0.,  0., -1.], tangent: [-1., 0.,  0.], color: [0., 0., 1.] },
  // right
  Face { normal: [ 1.,  0.,  0.], tangent: [ 0., 0., -1.], color: [1., 0., 0.] },
  // left
  Face { normal: [-1.,  0.,  0.], tangent: [ 0., 0.,  1.], color: [1., 1., 0.] },
  // top
  Face { normal: [ 0.,  1.,  0.], tangent: [ 1., 0.,  0.], color: [0., 1., 0.] },
  // bottom
  Face { normal: [ 0., -1.,  0.], tangent: [ 1., 0.,  0.], color: [0., 1., 1.] },
];

const QUAD_UVS: [[f32; 2]; 4] = [[0., 0.], [1., 0.], [1., 1.], [0., 1.]];

const GRAY: [f32; 3] = [0.5, 0.5, 0.5];

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
  [
    a[1] * b[2] - a[2] * b[1],
    a[2] * b[0] - a[0] * b[2],
    a[0] * b[1] - a[1] * b[0],
  ]
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
  [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
  let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
  [v[0] / len, v[1] / len, v[2] / len]
}

// Corners of a face in bottom-left, bottom-right, top-right, top-left order as seen from outside, offset by `depth`
// along the normal.
fn face_corners(normal: [f32; 3], tangent: [f32; 3], depth: f32) -> [[f32; 3]; 4] {
  let bitangent = cross(normal, tangent);
  let corner = |s: f32, t: f32| {
    let mut p = [0.; 3];
    for i in 0..3 {
      p[i] = depth * normal[i] + 0.5 * (s * tangent[i] + t * bitangent[i]);
    }
    p
  };

  [corner(-1., -1.), corner(1., -1.), corner(1., 1.), corner(-1., 1.)]
}

// Two triangles over four consecutive vertices starting at `base`.
fn quad_indices(base: u32, inside_out: bool) -> [u32; 6] {
  if inside_out {
    [base, base + 3, base + 2, base + 2, base + 1, base]
  } else {
    [base, base + 1, base + 2, base + 2, base + 3, base]
  }
}

// Lay out quads for the given faces; `vertex` builds a vertex out of a position, a face and a corner index.
fn layout_faces<'a, V>(
  faces: impl ExactSizeIterator<Item = &'a Face>,
  depth: f32,
  inside_out: bool,
  vertex: impl Fn(VertexPosition, &Face, usize) -> V,
) -> Mesh<V> {
  let count = faces.len();
  let mut mesh = Mesh::with_capacity(count * 4, count * 6);

  for face in faces {
    let corners = face_corners(face.normal, face.tangent, depth);
    let base = mesh.vertices.len() as u32;

    for (corner, &position) in corners.iter().enumerate() {
      mesh.push(position, |p| vertex(p, face, corner));
    }

    mesh.indices.extend_from_slice(&quad_indices(base, inside_out));
  }

  mesh
}

fn tex(position: VertexPosition, _: &Face, corner: usize) -> PosTex {
  PosTex::new(position, VertexTexCoords::new(QUAD_UVS[corner]))
}

fn col(position: VertexPosition, face: &Face, _: usize) -> PosCol {
  PosCol::new(position, VertexColor::new(face.color))
}

fn nrm_tgt_tex(position: VertexPosition, face: &Face, corner: usize) -> PosNrmTgtTex {
  PosNrmTgtTex::new(
    position,
    VertexNormal::new(face.normal),
    VertexTangent::new(face.tangent),
    VertexTexCoords::new(QUAD_UVS[corner]),
  )
}

fn ground_face() -> std::iter::Once<&'static Face> {
  std::iter::once(&CUBE_FACES[TOP])
}

fn pool_faces() -> impl ExactSizeIterator<Item = &'static Face> {
  CUBE_FACES
    .iter()
    .enumerate()
    .filter(|(i, _)| *i != TOP)
    .map(|(_, face)| face)
    .collect::<Vec<_>>()
    .into_iter()
}

/// Gray quad lying on the XZ plane, facing +Y.
pub fn quad_color() -> Mesh<PosCol> {
  layout_faces(ground_face(), 0., false, |p, _, _| {
    PosCol::new(p, VertexColor::new(GRAY))
  })
}

/// Textured quad lying on the XZ plane, facing +Y.
pub fn quad_tex() -> Mesh<PosTex> {
  layout_faces(ground_face(), 0., false, tex)
}

/// Textured quad with a normal and a tangent, lying on the XZ plane.
pub fn quad_normal_tangent_tex() -> Mesh<PosNrmTgtTex> {
  layout_faces(ground_face(), 0., false, nrm_tgt_tex)
}

/// Textured quad on the XY plane spanning `[-1, 0] × [0, 1]`, used for screen-space overlays.
pub fn quad_tex_2d() -> Mesh<PosTex> {
  let mut mesh = Mesh::with_capacity(4, 6);

  for &[u, v] in &QUAD_UVS {
    mesh.push([u - 1., v, 0.], |p| PosTex::new(p, VertexTexCoords::new([u, v])));
  }

  mesh.indices.extend_from_slice(&quad_indices(0, false));
  mesh
}

/// Grid of `size × size` patches of four vertices on the XZ plane, centred at the origin with one unit per cell.
///
/// Texture coordinates span `[0, 1]` over the whole grid. Each patch lists its corners in bottom-left, bottom-right,
/// top-right, top-left order. A `size` of zero is treated as one.
pub fn quad_grid(size: u32) -> Mesh<PosTex> {
  let size = size.max(1);
  let row = size + 1;
  let offset = size as f32 * 0.5;
  let mut mesh = Mesh::with_capacity((row * row) as usize, (size * size * 4) as usize);

  for y in 0..row {
    for x in 0..row {
      let uv = [x as f32 / size as f32, y as f32 / size as f32];
      mesh.push([x as f32 - offset, 0., y as f32 - offset], |p| {
        PosTex::new(p, VertexTexCoords::new(uv))
      });
    }
  }

  for y in 0..size {
    for x in 0..size {
      let bottom_left = x + row * y;
      let top_left = x + row * (y + 1);
      mesh
        .indices
        .extend_from_slice(&[bottom_left, bottom_left + 1, top_left + 1, top_left]);
    }
  }

  mesh
}

/// Cube with a flat color per face.
pub fn cube_color() -> Mesh<PosCol> {
  layout_faces(CUBE_FACES.iter(), 0.5, false, col)
}

/// Cube made of its 8 corners only, each colored after its position.
pub fn cube_color_shared() -> Mesh<PosCol> {
  let mut mesh = Mesh::with_capacity(8, 36);

  // corner index bits: x → 1, y → 2, z → 4
  for i in 0..8 {
    let position = [
      if i & 1 != 0 { 0.5 } else { -0.5 },
      if i & 2 != 0 { 0.5 } else { -0.5 },
      if i & 4 != 0 { 0.5 } else { -0.5 },
    ];
    let color = [position[0] + 0.5, position[1] + 0.5, position[2] + 0.5];
    mesh.push(position, |p| PosCol::new(p, VertexColor::new(color)));
  }

  let corner_index = |p: [f32; 3]| {
    (p[0] > 0.) as u32 | ((p[1] > 0.) as u32) << 1 | ((p[2] > 0.) as u32) << 2
  };

  for face in &CUBE_FACES {
    let corners = face_corners(face.normal, face.tangent, 0.5).map(corner_index);
    mesh.indices.extend_from_slice(&[
      corners[0], corners[1], corners[2], corners[2], corners[3], corners[0],
    ]);
  }

  mesh
}

/// Textured cube.
pub fn cube_tex() -> Mesh<PosTex> {
  layout_faces(CUBE_FACES.iter(), 0.5, false, tex)
}

/// Textured cube seen from the inside.
pub fn cube_tex_inside_out() -> Mesh<PosTex> {
  layout_faces(CUBE_FACES.iter(), 0.5, true, tex)
}

/// Textured cube with per-face normals and tangents.
pub fn cube_normal_tangent_tex() -> Mesh<PosNrmTgtTex> {
  layout_faces(CUBE_FACES.iter(), 0.5, false, nrm_tgt_tex)
}

/// Open-top colored box seen from the inside.
pub fn pool_color() -> Mesh<PosCol> {
  layout_faces(pool_faces(), 0.5, true, col)
}

/// Open-top textured box seen from the inside.
pub fn pool_tex() -> Mesh<PosTex> {
  layout_faces(pool_faces(), 0.5, true, tex)
}

/// Tetrahedron with flat normals.
pub fn tetrahedron() -> Mesh<PosNrm> {
  let corners: [[f32; 3]; 4] = [
    [-0.5, -0.3, -0.5],
    [0.5, -0.3, -0.5],
    [0., -0.3, 0.5],
    [0., 0.5, 0.],
  ];
  let center = [0., -0.1, -0.125];

  let mut mesh = Mesh::with_capacity(12, 12);

  for &[a, b, c] in &[[0, 1, 2], [0, 1, 3], [1, 2, 3], [2, 0, 3]] {
    let [a, mut b, mut c] = [corners[a], corners[b], corners[c]];
    let mut normal = cross(sub(b, a), sub(c, a));

    // keep the face wound so that its normal points away from the center
    if normal
      .iter()
      .zip(sub(a, center).iter())
      .map(|(n, d)| n * d)
      .sum::<f32>()
      < 0.
    {
      std::mem::swap(&mut b, &mut c);
      normal = [-normal[0], -normal[1], -normal[2]];
    }

    let normal = normalize(normal);

    for &position in &[a, b, c] {
      let index = mesh.push(position, |p| PosNrm::new(p, VertexNormal::new(normal)));
      mesh.indices.push(index);
    }
  }

  mesh
}
