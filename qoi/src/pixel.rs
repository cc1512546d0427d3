/// A single RGBA pixel. Color channels are not pre-multiplied with the alpha
/// channel ("un-premultiplied alpha").
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Pixel {
  /// Red channel value.
  pub r: u8,
  /// Green channel value.
  pub g: u8,
  /// Blue channel value.
  pub b: u8,
  /// Alpha channel value.
  pub a: u8,
}

/// The "previous pixel" every encode and decode pass starts from: opaque
/// black.
impl Default for Pixel {
  fn default() -> Self {
    Self { r: 0, g: 0, b: 0, a: 255 }
  }
}

impl Pixel {
  /// Fully transparent black, the value every cache slot starts with.
  pub const TRANSPARENT: Pixel = Pixel { r: 0, g: 0, b: 0, a: 0 };

  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }

  /// Creates an opaque pixel from a 3-channel source.
  pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
    Self { r, g, b, a: 255 }
  }

  /// Unpacks a `0xAARRGGBB` value.
  pub const fn from_packed(argb: u32) -> Self {
    Self {
      a: (argb >> 24) as u8,
      r: (argb >> 16) as u8,
      g: (argb >> 8) as u8,
      b: argb as u8,
    }
  }

  /// Packs the pixel into a `0xAARRGGBB` value, the inverse of
  /// [`Pixel::from_packed`].
  pub const fn to_packed(self) -> u32 {
    (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
  }

  /// QOI color hash, the pixel's slot in the 64 entry color cache. Not
  /// implemented via the `Hash` trait since the value is part of the format.
  pub fn qoi_hash(&self) -> usize {
    let r = self.r as usize;
    let g = self.g as usize;
    let b = self.b as usize;
    let a = self.a as usize;

    (r * 3 + g * 5 + b * 7 + a * 11) % 64
  }

  // Signed per-channel differences `self - prev`, taken modulo 256 and
  // reinterpreted as `i8` so that e.g. 0 - 255 yields 1 rather than -255.
  pub(crate) fn deltas(&self, prev: &Pixel) -> (i8, i8, i8) {
    (
      self.r.wrapping_sub(prev.r) as i8,
      self.g.wrapping_sub(prev.g) as i8,
      self.b.wrapping_sub(prev.b) as i8,
    )
  }

  // Applies signed per-channel differences modulo 256. Alpha is kept.
  pub(crate) fn offset(&self, dr: i8, dg: i8, db: i8) -> Pixel {
    Pixel {
      r: self.r.wrapping_add(dr as u8),
      g: self.g.wrapping_add(dg as u8),
      b: self.b.wrapping_add(db as u8),
      a: self.a,
    }
  }
}

impl From<u32> for Pixel {
  fn from(argb: u32) -> Self {
    Pixel::from_packed(argb)
  }
}

impl From<Pixel> for u32 {
  fn from(pixel: Pixel) -> Self {
    pixel.to_packed()
  }
}

impl From<[u8; 4]> for Pixel {
  fn from([r, g, b, a]: [u8; 4]) -> Self {
    Pixel { r, g, b, a }
  }
}

impl From<[u8; 3]> for Pixel {
  fn from([r, g, b]: [u8; 3]) -> Self {
    Pixel::rgb(r, g, b)
  }
}
