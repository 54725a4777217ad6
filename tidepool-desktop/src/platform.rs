//! Platform services implementation.

use image::{ImageError, RgbImage};
use std::{collections::HashMap, error::Error, fmt, path::PathBuf};
use tidepool::{Features, PlatformServices};

/// Desktop implementation of the [`PlatformServices`] API.
///
/// Images are read from the texture directory the first time a scene asks for them.
#[derive(Debug)]
pub struct DesktopPlatformServices {
  texture_root: PathBuf,
  features: Features,
  textures: HashMap<String, RgbImage>,
}

impl DesktopPlatformServices {
  pub fn new(texture_root: PathBuf, features: Features) -> Self {
    log::debug!(
      "{} texture(s) requested from {}",
      features.textures().len(),
      texture_root.display()
    );

    Self {
      texture_root,
      features,
      textures: HashMap::new(),
    }
  }

  fn load(&self, name: &str) -> Result<RgbImage, ImageError> {
    let path = self.texture_root.join(name);
    // images are stored top-down while textures go bottom-up
    let img = image::open(&path)?.flipv().to_rgb8();

    log::info!("loaded {} ({}×{})", path.display(), img.width(), img.height());
    Ok(img)
  }
}

#[derive(Debug)]
pub enum DesktopFetchError {
  UnknownTexture(String),
  ImageError(ImageError),
}

impl fmt::Display for DesktopFetchError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      DesktopFetchError::UnknownTexture(ref name) => write!(f, "unknown texture to load: {}", name),
      DesktopFetchError::ImageError(ref e) => write!(f, "cannot fetch texture: {}", e),
    }
  }
}

impl Error for DesktopFetchError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      DesktopFetchError::UnknownTexture(_) => None,
      DesktopFetchError::ImageError(e) => Some(e),
    }
  }
}

impl From<ImageError> for DesktopFetchError {
  fn from(source: ImageError) -> Self {
    Self::ImageError(source)
  }
}

impl PlatformServices for DesktopPlatformServices {
  type FetchError = DesktopFetchError;

  fn fetch_texture(&mut self, name: impl AsRef<str>) -> Result<&RgbImage, Self::FetchError> {
    let name = name.as_ref();

    if !self.features.textures().iter().any(|t| t == name) {
      return Err(DesktopFetchError::UnknownTexture(name.to_owned()));
    }

    if !self.textures.contains_key(name) {
      let img = self.load(name)?;
      self.textures.insert(name.to_owned(), img);
    }

    self
      .textures
      .get(name)
      .ok_or_else(|| DesktopFetchError::UnknownTexture(name.to_owned()))
  }
}
