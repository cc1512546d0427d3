use crate::pixel::Pixel;

/// Number of slots in the color cache.
pub const QOI_CACHE_LEN: usize = 64;

/// The rolling prediction state shared by the encoder and the decoder. One
/// instance lives for exactly one encode or decode pass.
#[derive(Clone, Debug)]
pub struct State {
  // A cache of previously seen pixels, indexed by `Pixel::qoi_hash`.
  cache: [Pixel; QOI_CACHE_LEN],
  // The previously decoded/encoded pixel.
  prev_pixel: Pixel,
}

impl Default for State {
  fn default() -> Self {
    Self::new()
  }
}

impl State {
  pub fn new() -> Self {
    Self {
      cache: [Pixel::TRANSPARENT; QOI_CACHE_LEN],
      prev_pixel: Pixel::default(),
    }
  }

  /// The most recently produced or consumed pixel.
  pub fn prev_pixel(&self) -> Pixel {
    self.prev_pixel
  }

  /// Returns the cached pixel at `index` verbatim.
  ///
  /// Indices come from a validated `Index` block, so `index` is always below
  /// 64.
  pub fn lookup(&self, index: u8) -> Pixel {
    self.cache[index as usize % QOI_CACHE_LEN]
  }

  /// Checks if the given pixel matches the cached pixel at its hash slot and
  /// returns the slot. If there is no match the given pixel is inserted,
  /// overwriting whatever was cached there, and `None` is returned.
  pub fn observe(&mut self, pixel: Pixel) -> Option<u8> {
    let index = pixel.qoi_hash();

    if self.cache[index] == pixel {
      return Some(index as u8);
    }

    self.cache[index] = pixel;

    None
  }

  /// Records `pixel` as the previous pixel. Returns `true`, leaving the state
  /// untouched, when it already was.
  pub fn advance(&mut self, pixel: Pixel) -> bool {
    if pixel == self.prev_pixel {
      return true;
    }

    self.prev_pixel = pixel;

    false
  }
}
