use std::io;

use crate::error::Error;

pub const QOI_BYTES_END: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];
pub const QOI_BYTES_MAGIC: [u8; 4] = *b"qoif";
pub const QOI_HEADER_LEN: usize = 14;

/// The fixed 14 byte header that starts every QOI image.
///
/// `channels` and `colorspace` are informational only. Every pixel is
/// encoded and decoded with its alpha channel regardless of their values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
  /// The image's width, at most `i32::MAX`.
  pub width: u32,
  /// The image's height, at most `i32::MAX`.
  pub height: u32,
  /// The number of color channels of the image's source pixels, see
  /// [Channels].
  pub channels: Channels,
  /// The image's colorspace, see [Colorspace].
  pub colorspace: Colorspace,
}

impl Header {
  pub fn new(width: u32, height: u32, channels: Channels, colorspace: Colorspace) -> Self {
    Self { width, height, channels, colorspace }
  }

  /// Returns the total number of pixels that make up the image.
  pub fn num_pixels(&self) -> u64 {
    u64::from(self.width) * u64::from(self.height)
  }

  /// Serializes the header. Fails if either dimension is outside of the
  /// signed 32 bit range the format stores them in.
  pub fn to_bytes(&self) -> Result<[u8; QOI_HEADER_LEN], Error> {
    self.check_dimensions()?;

    let mut bytes = [0; QOI_HEADER_LEN];
    bytes[..4].copy_from_slice(&QOI_BYTES_MAGIC);
    bytes[4..8].copy_from_slice(&self.width.to_be_bytes());
    bytes[8..12].copy_from_slice(&self.height.to_be_bytes());
    bytes[12] = self.channels as u8;
    bytes[13] = self.colorspace as u8;

    Ok(bytes)
  }

  /// Parses a header, validating the magic bytes, the dimensions, and both
  /// enumerated fields.
  pub fn from_bytes(bytes: &[u8; QOI_HEADER_LEN]) -> Result<Self, Error> {
    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];

    if magic != QOI_BYTES_MAGIC {
      return Err(Error::InvalidMagic(magic));
    }

    let header = Header {
      width: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
      height: u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
      channels: Channels::try_from(bytes[12])?,
      colorspace: Colorspace::try_from(bytes[13])?,
    };

    header.check_dimensions()?;

    Ok(header)
  }

  /// Writes the serialized header into the given writer.
  pub fn write_to<W: io::Write>(&self, mut writer: W) -> Result<(), Error> {
    writer.write_all(&self.to_bytes()?)?;
    Ok(())
  }

  /// Reads exactly 14 bytes from the given reader and parses them.
  pub fn read_from<R: io::Read>(mut reader: R) -> Result<Self, Error> {
    let mut header_buf = [0; QOI_HEADER_LEN];
    reader.read_exact(&mut header_buf).map_err(Error::from_read)?;

    Header::from_bytes(&header_buf)
  }

  fn check_dimensions(&self) -> Result<(), Error> {
    let max = i32::MAX as u32;

    if self.width > max || self.height > max {
      return Err(Error::InvalidDimensions { width: self.width, height: self.height });
    }

    Ok(())
  }
}

/// The number of color channels an image's source pixels contain.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Channels {
  Rgb = 3,
  #[default]
  Rgba = 4,
}

impl Channels {
  /// Bytes per pixel in an interleaved raw buffer.
  pub fn count(self) -> usize {
    self as usize
  }
}

/// A `TryFrom` implementation for converting any `u8` into `Channels`. `3`
/// maps to `Channels::Rgb`, and `4` maps to `Channels::Rgba`. All other `u8`
/// values are invalid.
impl TryFrom<u8> for Channels {
  type Error = Error;

  fn try_from(byte: u8) -> Result<Self, Self::Error> {
    match byte {
      3 => Ok(Channels::Rgb),
      4 => Ok(Channels::Rgba),
      _ => Err(Error::InvalidChannels(byte)),
    }
  }
}

/// How an image's color channels are to be interpreted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Colorspace {
  /// sRGB color channels with linear alpha.
  #[default]
  Srgb = 0,
  /// All channels linear.
  Linear = 1,
}

/// A `TryFrom` implemenation for converting any `u8` into a `Colorspace`.
/// `1` maps to `Colorspace::Linear`, and `0` maps to `Colorspace::Srgb`. All
/// other `u8` values are invalid.
impl TryFrom<u8> for Colorspace {
  type Error = Error;

  fn try_from(byte: u8) -> Result<Self, Self::Error> {
    let linear_u8 = Colorspace::Linear as u8;
    let srgb_u8 = Colorspace::Srgb as u8;

    match byte {
      _ if byte == linear_u8 => Ok(Colorspace::Linear),
      _ if byte == srgb_u8 => Ok(Colorspace::Srgb),
      _ => Err(Error::InvalidColorspace(byte)),
    }
  }
}
