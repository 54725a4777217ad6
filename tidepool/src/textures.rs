//! Image textures and how they are sampled.

use std::{borrow::Cow, fmt, str::FromStr};

use image::{Rgb, RgbImage};
use luminance::texture::TextureError;
use luminance_front::{
  context::GraphicsContext,
  pixel::NormRGB8UI,
  texture::{Dim2, MagFilter, MinFilter, Sampler, TexelUpload, Texture, Wrap},
  Backend,
};

use crate::PlatformServices;

/// RGB texture.
pub type RgbTexture = Texture<Dim2, NormRGB8UI>;

/// Filtering applied to image textures.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SamplerKind {
  Nearest,
  Bilinear,
  Trilinear,
}

impl SamplerKind {
  pub fn sampler(self) -> Sampler {
    let (min_filter, mag_filter) = match self {
      SamplerKind::Nearest => (MinFilter::Nearest, MagFilter::Nearest),
      SamplerKind::Bilinear => (MinFilter::Linear, MagFilter::Linear),
      SamplerKind::Trilinear => (MinFilter::LinearMipmapLinear, MagFilter::Linear),
    };

    Sampler {
      wrap_r: Wrap::Repeat,
      wrap_s: Wrap::Repeat,
      wrap_t: Wrap::Repeat,
      min_filter,
      mag_filter,
      ..Sampler::default()
    }
  }

  pub fn needs_mipmaps(self) -> bool {
    self == SamplerKind::Trilinear
  }
}

impl Default for SamplerKind {
  fn default() -> Self {
    SamplerKind::Trilinear
  }
}

impl fmt::Display for SamplerKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      SamplerKind::Nearest => f.write_str("nearest"),
      SamplerKind::Bilinear => f.write_str("bilinear"),
      SamplerKind::Trilinear => f.write_str("trilinear"),
    }
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownSampler(pub String);

impl fmt::Display for UnknownSampler {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(
      f,
      "unknown sampler {:?} (expected nearest, bilinear or trilinear)",
      self.0
    )
  }
}

impl std::error::Error for UnknownSampler {}

impl FromStr for SamplerKind {
  type Err = UnknownSampler;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "nearest" => Ok(SamplerKind::Nearest),
      "bilinear" => Ok(SamplerKind::Bilinear),
      "trilinear" => Ok(SamplerKind::Trilinear),
      _ => Err(UnknownSampler(s.to_owned())),
    }
  }
}

/// Number of mipmaps below the base level of a `width × height` image.
pub fn mipmap_count(width: u32, height: u32) -> usize {
  let largest = width.max(height).max(1);
  (31 - largest.leading_zeros()) as usize
}

/// What to show when an image is missing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fallback {
  /// Light and dark checkerboard.
  Checkerboard,
  /// Single color; e.g. `[128, 128, 255]` for a flat normal map.
  Flat([u8; 3]),
}

impl Fallback {
  pub fn image(self) -> RgbImage {
    match self {
      Fallback::Checkerboard => checkerboard(64, 8),
      Fallback::Flat(color) => RgbImage::from_pixel(1, 1, Rgb(color)),
    }
  }
}

/// Square `size × size` checkerboard with `cells` cells per side.
pub fn checkerboard(size: u32, cells: u32) -> RgbImage {
  let cell = (size / cells.max(1)).max(1);

  RgbImage::from_fn(size, size, |x, y| {
    if (x / cell + y / cell) % 2 == 0 {
      Rgb([255, 255, 255])
    } else {
      Rgb([32, 32, 32])
    }
  })
}

// Image for `name`, or the fallback if the platform cannot provide it.
fn fetch_or_fallback<'a, P>(platform: &'a mut P, name: &str, fallback: Fallback) -> Cow<'a, RgbImage>
where
  P: PlatformServices,
{
  match platform.fetch_texture(name) {
    Ok(img) => Cow::Borrowed(img),
    Err(e) => {
      log::warn!("using a placeholder for {}: {}", name, e);
      Cow::Owned(fallback.image())
    }
  }
}

/// Upload the image `name` provided by `platform`.
pub fn load_texture(
  context: &mut impl GraphicsContext<Backend = Backend>,
  platform: &mut impl PlatformServices,
  name: &str,
  kind: SamplerKind,
  fallback: Fallback,
) -> Result<RgbTexture, TextureError> {
  let img = fetch_or_fallback(platform, name, fallback);
  let (width, height) = img.dimensions();
  let upload = texel_upload(img.as_raw(), [width, height], kind);

  log::debug!("uploading {} ({}×{}, {} sampling)", name, width, height, kind);
  context.new_texture_raw([width, height], kind.sampler(), upload)
}

// Base level upload, with the whole mipmap chain only when the sampler reads it.
fn texel_upload(texels: &[u8], [width, height]: [u32; 2], kind: SamplerKind) -> TexelUpload<[u8]> {
  let mipmaps = if kind.needs_mipmaps() {
    mipmap_count(width, height)
  } else {
    0
  };

  TexelUpload::BaseLevel { texels, mipmaps }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  struct FakePlatform(HashMap<String, RgbImage>);

  impl PlatformServices for FakePlatform {
    type FetchError = String;

    fn fetch_texture(&mut self, name: impl AsRef<str>) -> Result<&RgbImage, Self::FetchError> {
      let name = name.as_ref();
      self.0.get(name).ok_or_else(|| format!("no {}", name))
    }
  }

  #[test]
  fn parses_sampler_names() {
    assert_eq!("nearest".parse(), Ok(SamplerKind::Nearest));
    assert_eq!("bilinear".parse(), Ok(SamplerKind::Bilinear));
    assert_eq!("trilinear".parse(), Ok(SamplerKind::Trilinear));
    assert_eq!(
      "anisotropic".parse::<SamplerKind>(),
      Err(UnknownSampler("anisotropic".to_owned()))
    );
  }

  #[test]
  fn sampler_names_round_trip_through_display() {
    for kind in [SamplerKind::Nearest, SamplerKind::Bilinear, SamplerKind::Trilinear] {
      assert_eq!(kind.to_string().parse(), Ok(kind));
    }
  }

  #[test]
  fn only_trilinear_needs_mipmaps() {
    assert!(!SamplerKind::Nearest.needs_mipmaps());
    assert!(!SamplerKind::Bilinear.needs_mipmaps());
    assert!(SamplerKind::Trilinear.needs_mipmaps());

    let sampler = SamplerKind::Trilinear.sampler();
    assert_eq!(sampler.min_filter, MinFilter::LinearMipmapLinear);
    assert_eq!(sampler.wrap_s, Wrap::Repeat);
  }

  #[test]
  fn counts_mipmaps() {
    assert_eq!(mipmap_count(1, 1), 0);
    assert_eq!(mipmap_count(2, 1), 1);
    assert_eq!(mipmap_count(512, 512), 9);
    assert_eq!(mipmap_count(1024, 300), 10);
    assert_eq!(mipmap_count(600, 800), 9);
    assert_eq!(mipmap_count(0, 0), 0);
  }

  #[test]
  fn uploads_mipmaps_only_for_trilinear() {
    let texels = [0; 4 * 2 * 3];

    for (kind, expected) in [
      (SamplerKind::Nearest, 0),
      (SamplerKind::Bilinear, 0),
      (SamplerKind::Trilinear, 2),
    ] {
      match texel_upload(&texels, [4, 2], kind) {
        TexelUpload::BaseLevel { texels: uploaded, mipmaps } => {
          assert_eq!(uploaded.len(), texels.len());
          assert_eq!(mipmaps, expected, "{} sampling", kind);
        }
        _ => panic!("{} sampling should upload the base level", kind),
      }
    }
  }

  #[test]
  fn checkerboard_alternates_cells() {
    let img = checkerboard(64, 8);

    assert_eq!(img.dimensions(), (64, 64));
    assert_eq!(img.get_pixel(0, 0), img.get_pixel(7, 7));
    assert_ne!(img.get_pixel(0, 0), img.get_pixel(8, 0));
    assert_eq!(img.get_pixel(0, 0), img.get_pixel(8, 8));
  }

  #[test]
  fn missing_images_fall_back() {
    let mut known = HashMap::new();
    known.insert("sky.jpg".to_owned(), RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
    let mut platform = FakePlatform(known);

    let found = fetch_or_fallback(&mut platform, "sky.jpg", Fallback::Checkerboard);
    assert!(matches!(found, Cow::Borrowed(_)));
    assert_eq!(found.get_pixel(1, 1), &Rgb([1, 2, 3]));

    let missing = fetch_or_fallback(&mut platform, "normal.png", Fallback::Flat([128, 128, 255]));
    assert_eq!(missing.dimensions(), (1, 1));
    assert_eq!(missing.get_pixel(0, 0), &Rgb([128, 128, 255]));
  }
}
