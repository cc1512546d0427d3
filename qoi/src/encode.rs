use std::io;

use log::{debug, trace};

use crate::block::{Block, Diff, Index, Luma, Run, QOI_MAX_RUN};
use crate::error::Error;
use crate::header::{Channels, Colorspace, Header, QOI_BYTES_END, QOI_HEADER_LEN};
use crate::options::EncodeOptions;
use crate::pixel::Pixel;
use crate::state::State;

/// A streaming QOI encoder.
///
/// The header is written when the encoder is created, each call to
/// [`Encoder::encode_pixel`] consumes the next pixel in stream order, and
/// [`Encoder::finish`] terminates the stream. Exactly `width * height` pixels
/// must be given.
pub struct Encoder<W: io::Write> {
  writer: W,
  header: Header,
  state: State,
  // Length of the current run of repeated pixels, always below `QOI_MAX_RUN`.
  run: u8,
  rgb_blocks: bool,
  pixels: u64,
  bytes_written: u64,
}

impl<W: io::Write> Encoder<W> {
  /// Creates an encoder for the given header with default options.
  pub fn new(writer: W, header: Header) -> Result<Self, Error> {
    Self::start(writer, header, EncodeOptions::default().rgb_blocks)
  }

  pub fn with_options(writer: W, width: u32, height: u32, options: EncodeOptions) -> Result<Self, Error> {
    Self::start(writer, options.header(width, height), options.rgb_blocks)
  }

  fn start(mut writer: W, header: Header, rgb_blocks: bool) -> Result<Self, Error> {
    header.write_to(&mut writer)?;

    debug!(
      "encoding {}x{} image ({:?}, {:?})",
      header.width, header.height, header.channels, header.colorspace
    );

    Ok(Self {
      writer,
      header,
      state: State::new(),
      run: 0,
      rgb_blocks,
      pixels: 0,
      bytes_written: QOI_HEADER_LEN as u64,
    })
  }

  pub fn header(&self) -> &Header {
    &self.header
  }

  /// Encodes the next pixel. Repeats of the previous pixel are held back and
  /// written as a single run once the run ends.
  pub fn encode_pixel(&mut self, pixel: Pixel) -> Result<(), Error> {
    let expected = self.header.num_pixels();

    if self.pixels == expected {
      return Err(Error::PixelCountMismatch { expected, actual: self.pixels + 1 });
    }

    self.pixels += 1;

    let prev = self.state.prev_pixel();

    if self.state.advance(pixel) {
      self.run += 1;

      if self.run == QOI_MAX_RUN {
        trace!("flushing full run at pixel {}", self.pixels);
        self.flush_run()?;
      }

      return Ok(());
    }

    self.flush_run()?;

    let block = select_block(&mut self.state, pixel, prev, self.rgb_blocks)?;
    self.write_block(block)
  }

  /// Writes any pending run and the end of stream marker, and returns the
  /// underlying writer. Fails if fewer pixels than the header declares were
  /// given.
  pub fn finish(mut self) -> Result<W, Error> {
    let expected = self.header.num_pixels();

    if self.pixels != expected {
      return Err(Error::PixelCountMismatch { expected, actual: self.pixels });
    }

    self.flush_run()?;

    self.writer.write_all(&QOI_BYTES_END)?;
    self.writer.flush()?;
    self.bytes_written += QOI_BYTES_END.len() as u64;

    debug!("encoded {} pixels into {} bytes", self.pixels, self.bytes_written);

    Ok(self.writer)
  }

  fn flush_run(&mut self) -> Result<(), Error> {
    if self.run > 0 {
      let run = Run::new(self.run)?;
      self.run = 0;
      self.write_block(Block::Run(run))?;
    }

    Ok(())
  }

  fn write_block(&mut self, block: Block) -> Result<(), Error> {
    block.write_to(&mut self.writer)?;
    self.bytes_written += block.encoded_len() as u64;
    Ok(())
  }
}

// Picks the smallest block that reproduces `pixel` given the previous pixel
// `prev`. The cache is updated as a side effect, the previous pixel is not.
fn select_block(state: &mut State, pixel: Pixel, prev: Pixel, rgb_blocks: bool) -> Result<Block, Error> {
  if let Some(index) = state.observe(pixel) {
    return Ok(Block::Index(Index::new(index)?));
  }

  if pixel.a != prev.a {
    return Ok(Block::Rgba(pixel.r, pixel.g, pixel.b, pixel.a));
  }

  let (dr, dg, db) = pixel.deltas(&prev);

  if let Ok(diff) = Diff::new(dr, dg, db) {
    return Ok(Block::Diff(diff));
  }

  if let Ok(luma) = Luma::new(dr, dg, db) {
    return Ok(Block::Luma(luma));
  }

  if rgb_blocks {
    Ok(Block::Rgb(pixel.r, pixel.g, pixel.b))
  } else {
    Ok(Block::Rgba(pixel.r, pixel.g, pixel.b, pixel.a))
  }
}

/// Encodes `width * height` pixels into a complete QOI image.
///
/// Pixels can be anything convertible into a [`Pixel`], including packed
/// `0xAARRGGBB` values.
pub fn encode<I, P>(
  width: u32,
  height: u32,
  pixels: I,
  channels: Channels,
  colorspace: Colorspace,
) -> Result<Vec<u8>, Error>
where
  I: IntoIterator<Item = P>,
  P: Into<Pixel>,
{
  let options = EncodeOptions::default()
    .with_channels(channels)
    .with_colorspace(colorspace);

  encode_with(width, height, pixels, options)
}

/// Encodes `width * height` pixels into a complete QOI image with the given
/// options.
pub fn encode_with<I, P>(width: u32, height: u32, pixels: I, options: EncodeOptions) -> Result<Vec<u8>, Error>
where
  I: IntoIterator<Item = P>,
  P: Into<Pixel>,
{
  let mut encoder = Encoder::with_options(Vec::new(), width, height, options)?;

  for pixel in pixels {
    encoder.encode_pixel(pixel.into())?;
  }

  encoder.finish()
}

/// Encodes an image's raw pixel data and `Header` into a QOI encoded image.
///
/// The pixel data is read as interleaved RGB or RGBA bytes according to
/// `header.channels`. Pixels read from a 3 channel source are opaque.
///
/// This function supports reading and writing to in-memory structures or IO
/// streams by accepting a generic trait bound of `std::io::Read` for the
/// image's pixel data, and `std::io::Write` for the encoded image's
/// destination.
///
/// Note that this function performs frequent reads and writes, so it's
/// recommended to provide a buffered IO implementation such as
/// `std::io::BufReader` and `std::io::BufWriter` for streaming applications.
pub fn encode_image<R: io::Read, W: io::Write>(mut reader: R, writer: W, header: &Header) -> Result<(), Error> {
  let mut encoder = Encoder::new(writer, *header)?;
  let mut pixel_buf = [0; 4];
  let pixel_buf = &mut pixel_buf[..header.channels.count()];

  for _ in 0..header.num_pixels() {
    reader.read_exact(pixel_buf).map_err(Error::from_read)?;

    let pixel = Pixel {
      r: pixel_buf[0],
      g: pixel_buf[1],
      b: pixel_buf[2],
      a: pixel_buf.get(3).copied().unwrap_or(255),
    };

    encoder.encode_pixel(pixel)?;
  }

  encoder.finish()?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  // Encodes `pixels` as a single row and returns only the block bytes.
  fn blocks(pixels: &[Pixel], rgb_blocks: bool) -> Vec<u8> {
    let options = EncodeOptions::default().with_rgb_blocks(rgb_blocks);
    let dest = encode_with(pixels.len() as u32, 1, pixels.iter().copied(), options).expect("Failed to encode image");

    assert_eq!(&dest[..4], b"qoif");
    assert_eq!(&dest[dest.len() - 8..], &QOI_BYTES_END);
    dest[QOI_HEADER_LEN..dest.len() - 8].to_vec()
  }

  #[test]
  fn test_encoding_single_pixel_image() {
    let dest = encode_with(
      1,
      1,
      [Pixel::new(10, 20, 30, 255)],
      EncodeOptions::default().with_rgb_blocks(false),
    )
    .expect("Failed to encode image");

    assert_eq!(
      dest,
      vec![
        b'q', b'o', b'i', b'f', 0, 0, 0, 1, 0, 0, 0, 1, 4, 0, // header
        0xff, 10, 20, 30, 255, // Block::Rgba(10, 20, 30, 255)
        0, 0, 0, 0, 0, 0, 0, 1, // end marker
      ]
    );
  }

  #[test]
  fn test_encoding_rgb_op() {
    assert_eq!(blocks(&[Pixel::new(10, 20, 30, 255)], true), vec![0xfe, 10, 20, 30]);
  }

  #[test]
  fn test_encoding_rgba_op_on_alpha_change() {
    // Would fit a diff if alpha were ignored.
    assert_eq!(blocks(&[Pixel::new(1, 0, 0, 128)], true), vec![0xff, 1, 0, 0, 128]);
  }

  #[test]
  fn test_encoding_diff_op() {
    // (1 + 2) << 4 | (0 + 2) << 2 | (0 + 2)
    assert_eq!(blocks(&[Pixel::new(1, 0, 0, 255)], true), vec![0x40 | 0x3a]);
  }

  #[test]
  fn test_encoding_diff_op_wraps() {
    // 255 - 0 is -1 in the signed 8 bit domain.
    assert_eq!(blocks(&[Pixel::new(255, 255, 255, 255)], true), vec![0x40 | 0x15]);
  }

  #[test]
  fn test_encoding_luma_op() {
    // dg = 8, dr - dg = 2, db - dg = 4
    assert_eq!(blocks(&[Pixel::new(10, 8, 12, 255)], true), vec![0x80 | 40, 10 << 4 | 12]);
  }

  #[test]
  fn test_encoding_index_op() {
    let a = Pixel::new(0, 0, 1, 255);
    let c = Pixel::new(0, 0, 50, 255);
    assert_eq!(a.qoi_hash(), 60);

    assert_eq!(
      blocks(&[a, c, a], true),
      vec![
        0x40 | 0x2b, // Diff(0, 0, 1)
        0xfe, 0, 0, 50, // Rgb(0, 0, 50)
        60,   // Index(60)
      ]
    );
  }

  #[test]
  fn test_encoding_evicted_cache_slot() {
    let a = Pixel::new(0, 0, 1, 255);
    let b = Pixel::new(0, 0, 65, 255);
    assert_eq!(a.qoi_hash(), b.qoi_hash());

    assert_eq!(
      blocks(&[a, b, a], true),
      vec![
        0x40 | 0x2b, // Diff(0, 0, 1)
        0xfe, 0, 0, 65, // Rgb(0, 0, 65)
        0xfe, 0, 0, 1, // Rgb(0, 0, 1), slot 60 holds `b` now
      ]
    );
  }

  #[test]
  fn test_encoding_trailing_run_op() {
    let pixel = Pixel::new(101, 102, 103, 255);

    assert_eq!(blocks(&[pixel, pixel], true), vec![0xfe, 101, 102, 103, 0xc0]);
  }

  #[test]
  fn test_encoding_max_run_ops() {
    let pixels = vec![Pixel::default(); 200];

    // 62, 62, 62, 14
    assert_eq!(blocks(&pixels, true), vec![0xfd, 0xfd, 0xfd, 0xc0 | 13]);
  }

  #[test]
  fn test_encoding_run_flushed_before_next_pixel() {
    let a = Pixel::new(100, 100, 100, 255);
    let b = Pixel::new(101, 100, 100, 255);

    assert_eq!(
      blocks(&[a, a, a, b], true),
      vec![
        0xfe, 100, 100, 100, // Rgb(100, 100, 100)
        0xc0 | 1,      // Run(2)
        0x40 | 0x3a,   // Diff(1, 0, 0)
      ]
    );
  }

  #[test]
  fn test_encoding_too_many_pixels() {
    let mut encoder = Encoder::new(Vec::new(), Header::new(1, 1, Channels::Rgba, Colorspace::Srgb))
      .expect("Failed to write header");

    encoder.encode_pixel(Pixel::default()).expect("Failed to encode pixel");
    assert_eq!(
      encoder.encode_pixel(Pixel::default()),
      Err(Error::PixelCountMismatch { expected: 1, actual: 2 })
    );
  }

  #[test]
  fn test_encoding_too_few_pixels() {
    let encoder = Encoder::new(Vec::new(), Header::new(2, 1, Channels::Rgba, Colorspace::Srgb))
      .expect("Failed to write header");

    assert_eq!(
      encoder.finish().map(|_| ()),
      Err(Error::PixelCountMismatch { expected: 2, actual: 0 })
    );
  }

  #[test]
  fn test_encoding_packed_pixels() {
    let packed = encode(1, 1, [0xff_0a_14_1eu32], Channels::Rgba, Colorspace::Srgb).expect("Failed to encode image");
    let unpacked = encode(1, 1, [Pixel::new(10, 20, 30, 255)], Channels::Rgba, Colorspace::Srgb)
      .expect("Failed to encode image");

    assert_eq!(packed, unpacked);
  }

  #[test]
  fn test_encoding_rgb_source_bytes() {
    let source = [101, 102, 103, 101, 102, 103];
    let mut dest = Vec::new();

    assert_eq!(
      encode_image(source.as_slice(), &mut dest, &Header::new(2, 1, Channels::Rgb, Colorspace::Srgb)),
      Ok(())
    );

    let range_start = QOI_HEADER_LEN + 4; // Header length + Block::Rgb(101, 102, 103)
    assert_eq!(&dest[range_start..range_start + 1], &[0xc0]); // Block::Run(1)
    assert_eq!(dest[12], 3);
  }
}
