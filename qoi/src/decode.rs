use std::io;
use std::iter::FusedIterator;

use log::debug;

use crate::block::{self, Block};
use crate::error::Error;
use crate::header::{Channels, Header, QOI_BYTES_END};
use crate::options::DecodeOptions;
use crate::pixel::Pixel;
use crate::state::State;

// Upper bound on how many pixels `decode_with` reserves up front, so a header
// claiming a huge image can't force a huge allocation before any block has
// been read.
const PREALLOC_PIXELS: usize = 1 << 20;

/// A streaming QOI decoder.
///
/// The header is parsed when the decoder is created. Pixels are then produced
/// one at a time, in stream order, by iterating over the decoder. Iteration
/// ends after `width * height` pixels, or after the first error.
///
/// The decoder reads one byte at a time, so it's recommended to provide a
/// buffered IO implementation such as `std::io::BufReader` when reading from
/// a file or socket.
pub struct Decoder<R> {
  bytes: io::Bytes<R>,
  header: Header,
  state: State,
  // Pixels the header declares that no block has produced yet.
  remaining: u64,
  // Repeats of the previous pixel still owed by the last `Block::Run`.
  pending: u8,
  enforce_end_marker: bool,
  done: bool,
}

impl<R: io::Read> Decoder<R> {
  /// Creates a decoder with default options: no limits, and the end of stream
  /// marker is not checked.
  pub fn new(reader: R) -> Result<Self, Error> {
    Self::with_options(reader, DecodeOptions::default())
  }

  pub fn with_options(mut reader: R, options: DecodeOptions) -> Result<Self, Error> {
    let header = Header::read_from(&mut reader)?;
    options.limits.check(&header)?;

    debug!(
      "decoding {}x{} image ({:?}, {:?})",
      header.width, header.height, header.channels, header.colorspace
    );

    Ok(Self {
      bytes: reader.bytes(),
      header,
      state: State::new(),
      remaining: header.num_pixels(),
      pending: 0,
      enforce_end_marker: options.enforce_end_marker,
      done: false,
    })
  }

  pub fn header(&self) -> &Header {
    &self.header
  }

  /// Number of pixels left to yield.
  pub fn pixels_left(&self) -> u64 {
    self.remaining + u64::from(self.pending)
  }

  fn next_pixel(&mut self) -> Result<Option<Pixel>, Error> {
    if self.pending > 0 {
      self.pending -= 1;
      return Ok(Some(self.state.prev_pixel()));
    }

    if self.remaining == 0 {
      if self.enforce_end_marker {
        self.check_end_marker()?;
      }

      debug!("decoded {} pixels", self.header.num_pixels());
      return Ok(None);
    }

    let block = Block::read_from(&mut self.bytes)?;
    let (pixel, count) = block.expand(&mut self.state);
    let produced = u64::from(count);

    if produced > self.remaining {
      return Err(Error::PixelOverflow { remaining: self.remaining, produced });
    }

    self.remaining -= produced;
    self.pending = count - 1;

    Ok(Some(pixel))
  }

  fn check_end_marker(&mut self) -> Result<(), Error> {
    let mut marker = [0; QOI_BYTES_END.len()];

    for byte in marker.iter_mut() {
      *byte = block::next_byte(&mut self.bytes)?;
    }

    if marker != QOI_BYTES_END {
      return Err(Error::InvalidEndMarker(marker));
    }

    Ok(())
  }
}

impl<R: io::Read> Iterator for Decoder<R> {
  type Item = Result<Pixel, Error>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }

    match self.next_pixel() {
      Ok(Some(pixel)) => Some(Ok(pixel)),
      Ok(None) => {
        self.done = true;
        None
      }
      Err(e) => {
        self.done = true;
        Some(Err(e))
      }
    }
  }
}

impl<R: io::Read> FusedIterator for Decoder<R> {}

/// Decodes a complete QOI image into its header and pixels, optionally
/// requiring the end of stream marker after the last pixel.
pub fn decode<R: io::Read>(reader: R, enforce_end_marker: bool) -> Result<(Header, Vec<Pixel>), Error> {
  decode_with(reader, DecodeOptions::default().with_end_marker(enforce_end_marker))
}

/// Decodes a complete QOI image with the given options.
pub fn decode_with<R: io::Read>(reader: R, options: DecodeOptions) -> Result<(Header, Vec<Pixel>), Error> {
  let decoder = Decoder::with_options(reader, options)?;
  let header = *decoder.header();
  let capacity = usize::try_from(header.num_pixels()).unwrap_or(usize::MAX);
  let mut pixels = Vec::with_capacity(capacity.min(PREALLOC_PIXELS));

  for pixel in decoder {
    pixels.push(pixel?);
  }

  Ok((header, pixels))
}

/// Decodes a QOI encoded image. The decoded pixel data is written to the
/// provided `writer` as interleaved RGB or RGBA bytes, according to the
/// image's channels, and upon success the image's `Header` is returned.
///
/// This function supports reading and writing to in-memory structures or IO
/// streams by accepting a generic trait bound of `std::io::Read` for the
/// encoded image source, and `std::io::Write` for the decoded pixel data
/// destination.
///
/// Note that this function performs frequent reads and writes, so it's
/// recommended to provide a buffered IO implementation such as
/// `std::io::BufReader` and `std::io::BufWriter` for streaming applications.
pub fn decode_image<R: io::Read, W: io::Write>(reader: R, mut writer: W) -> Result<Header, Error> {
  let decoder = Decoder::new(reader)?;
  let header = *decoder.header();

  for pixel in decoder {
    let pixel = pixel?;

    match header.channels {
      Channels::Rgb => {
        writer.write_all(&[pixel.r, pixel.g, pixel.b])?;
      }
      Channels::Rgba => {
        writer.write_all(&[pixel.r, pixel.g, pixel.b, pixel.a])?;
      }
    }
  }

  writer.flush()?;

  Ok(header)
}
