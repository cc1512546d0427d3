use std::io;

/// An enumeration of all error values this crate may produce.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
  /// The first four bytes of a QOI image were not `qoif`.
  #[error("invalid magic bytes {0:?}, expected \"qoif\"")]
  InvalidMagic([u8; 4]),

  /// Failed to derive a supported channel count from a QOI image.
  #[error("invalid image channels {0}, expected 3 for RGB or 4 for RGBA")]
  InvalidChannels(u8),

  /// Failed to derive a supported colorspace from a QOI image.
  #[error("invalid image colorspace {0}, expected 0 for sRGB or 1 for linear")]
  InvalidColorspace(u8),

  /// Width or height does not fit in a signed 32 bit integer, or their
  /// product does not fit in memory on this platform.
  #[error("invalid image dimensions {width}x{height}")]
  InvalidDimensions { width: u32, height: u32 },

  /// Unexpectedly reached the end of an image source before decoding was
  /// completed.
  #[error("unexpectedly reached end of input before decoding was completed")]
  UnexpectedEof,

  /// A block expands to more pixels than the header has left to produce.
  #[error("block produces {produced} pixels but only {remaining} remain")]
  PixelOverflow { remaining: u64, produced: u64 },

  /// The eight bytes following the last block were not the end marker.
  #[error("invalid end of stream marker {0:02x?}")]
  InvalidEndMarker([u8; 8]),

  /// The encoder was given a different number of pixels than the header
  /// declares.
  #[error("expected {expected} pixels, got {actual}")]
  PixelCountMismatch { expected: u64, actual: u64 },

  /// A block field was outside of the range its bit layout can hold.
  #[error("{field} value {value} is out of range")]
  OutOfRange { field: &'static str, value: i32 },

  /// The image exceeds one of the configured `Limits`.
  #[error("limit exceeded: {0}")]
  LimitExceeded(String),

  /// Any `std::io::Error` raised while reading an image source or writing to
  /// an image destination.
  #[error(transparent)]
  Io(#[from] io::Error),
}

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
  /// The byte stream is not a well-formed QOI image, or the pixel data does
  /// not match the declared dimensions.
  Format,
  /// A block was constructed from an out-of-range field.
  Value,
  /// A configured resource limit was exceeded.
  Limit,
  /// The underlying reader or writer failed.
  Io,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::InvalidMagic(_)
      | Error::InvalidChannels(_)
      | Error::InvalidColorspace(_)
      | Error::InvalidDimensions { .. }
      | Error::UnexpectedEof
      | Error::PixelOverflow { .. }
      | Error::InvalidEndMarker(_)
      | Error::PixelCountMismatch { .. } => ErrorKind::Format,
      Error::OutOfRange { .. } => ErrorKind::Value,
      Error::LimitExceeded(_) => ErrorKind::Limit,
      Error::Io(_) => ErrorKind::Io,
    }
  }

  // Reading from an exhausted source surfaces as an `io::Error` when going
  // through `read_exact`; report it the same way as an exhausted iterator.
  pub(crate) fn from_read(io_err: io::Error) -> Self {
    match io_err.kind() {
      io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
      _ => Error::Io(io_err),
    }
  }
}

#[cfg(test)]
impl PartialEq for Error {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Error::InvalidMagic(a), Error::InvalidMagic(b)) => a == b,
      (Error::InvalidChannels(a), Error::InvalidChannels(b)) => a == b,
      (Error::InvalidColorspace(a), Error::InvalidColorspace(b)) => a == b,
      (
        Error::InvalidDimensions { width: w1, height: h1 },
        Error::InvalidDimensions { width: w2, height: h2 },
      ) => w1 == w2 && h1 == h2,
      (Error::UnexpectedEof, Error::UnexpectedEof) => true,
      (
        Error::PixelOverflow { remaining: r1, produced: p1 },
        Error::PixelOverflow { remaining: r2, produced: p2 },
      ) => r1 == r2 && p1 == p2,
      (Error::InvalidEndMarker(a), Error::InvalidEndMarker(b)) => a == b,
      (
        Error::PixelCountMismatch { expected: e1, actual: a1 },
        Error::PixelCountMismatch { expected: e2, actual: a2 },
      ) => e1 == e2 && a1 == a2,
      (
        Error::OutOfRange { field: f1, value: v1 },
        Error::OutOfRange { field: f2, value: v2 },
      ) => f1 == f2 && v1 == v2,
      (Error::LimitExceeded(_), Error::LimitExceeded(_)) => true,
      (Error::Io(..), Error::Io(..)) => true,
      _ => false,
    }
  }
}
