use crate::error::Error;
use crate::header::{Channels, Colorspace, Header};

/// Resource limits applied to a parsed header before any pixel is decoded.
///
/// All fields default to `None` (no limit).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Limits {
  pub max_width: Option<u64>,
  pub max_height: Option<u64>,
  /// Maximum pixel count (width * height).
  pub max_pixels: Option<u64>,
}

impl Limits {
  /// Check the header's dimensions against the limits.
  pub fn check(&self, header: &Header) -> Result<(), Error> {
    if let Some(max_w) = self.max_width {
      if u64::from(header.width) > max_w {
        return Err(Error::LimitExceeded(format!(
          "width {} exceeds limit {max_w}",
          header.width
        )));
      }
    }

    if let Some(max_h) = self.max_height {
      if u64::from(header.height) > max_h {
        return Err(Error::LimitExceeded(format!(
          "height {} exceeds limit {max_h}",
          header.height
        )));
      }
    }

    if let Some(max_px) = self.max_pixels {
      let pixels = header.num_pixels();

      if pixels > max_px {
        return Err(Error::LimitExceeded(format!(
          "pixel count {pixels} exceeds limit {max_px}"
        )));
      }
    }

    Ok(())
  }
}

/// Options for [`Decoder`](crate::Decoder).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DecodeOptions {
  /// Require the 8 byte end of stream marker after the last pixel.
  pub enforce_end_marker: bool,
  pub limits: Limits,
}

impl DecodeOptions {
  pub fn with_end_marker(mut self, enforce: bool) -> Self {
    self.enforce_end_marker = enforce;
    self
  }

  pub fn with_limits(mut self, limits: Limits) -> Self {
    self.limits = limits;
    self
  }
}

/// Options for [`Encoder`](crate::Encoder).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EncodeOptions {
  /// Written to the header as-is.
  pub channels: Channels,
  /// Written to the header as-is.
  pub colorspace: Colorspace,
  /// Emit 4 byte `Rgb` blocks for full color pixels whose alpha is unchanged.
  /// When disabled every full color pixel is written as a 5 byte `Rgba`
  /// block.
  pub rgb_blocks: bool,
}

impl Default for EncodeOptions {
  fn default() -> Self {
    Self {
      channels: Channels::Rgba,
      colorspace: Colorspace::Srgb,
      rgb_blocks: true,
    }
  }
}

impl EncodeOptions {
  pub fn with_channels(mut self, channels: Channels) -> Self {
    self.channels = channels;
    self
  }

  pub fn with_colorspace(mut self, colorspace: Colorspace) -> Self {
    self.colorspace = colorspace;
    self
  }

  pub fn with_rgb_blocks(mut self, rgb_blocks: bool) -> Self {
    self.rgb_blocks = rgb_blocks;
    self
  }

  /// Builds the header for an image of the given dimensions.
  pub fn header(&self, width: u32, height: u32) -> Header {
    Header::new(width, height, self.channels, self.colorspace)
  }
}
