use std::io;

use crate::error::Error;
use crate::pixel::Pixel;
use crate::state::State;

/// The longest run a single `Block::Run` can hold.
pub const QOI_MAX_RUN: u8 = 62;

/// The kind of block a tag byte starts, see [`Tag::from_byte`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tag {
  Rgb,
  Rgba,
  Index,
  Diff,
  Luma,
  Run,
}

impl Tag {
  /// Dispatches on the first byte of a block. The two 8 bit tags are matched
  /// exactly before falling back to the 2 bit prefix, so every byte value maps
  /// to exactly one kind.
  pub fn from_byte(byte: u8) -> Tag {
    match byte {
      Block::TAG_RGB => Tag::Rgb,
      Block::TAG_RGBA => Tag::Rgba,
      _ => match byte & Block::MASK_TAG {
        Block::TAG_INDEX => Tag::Index,
        Block::TAG_DIFF => Tag::Diff,
        Block::TAG_LUMA => Tag::Luma,
        _ => Tag::Run,
      },
    }
  }
}

/// A position in the 64 slot color cache.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Index(u8);

impl Index {
  pub fn new(index: u8) -> Result<Self, Error> {
    if index > 63 {
      return Err(Error::OutOfRange { field: "index", value: index.into() });
    }

    Ok(Index(index))
  }

  pub fn get(self) -> u8 {
    self.0
  }
}

/// Small red, green, and blue differences from the previous pixel, each in
/// `-2..=1`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Diff {
  dr: i8,
  dg: i8,
  db: i8,
}

impl Diff {
  pub fn new(dr: i8, dg: i8, db: i8) -> Result<Self, Error> {
    check_range("diff red", dr.into(), -2..=1)?;
    check_range("diff green", dg.into(), -2..=1)?;
    check_range("diff blue", db.into(), -2..=1)?;

    Ok(Diff { dr, dg, db })
  }

  pub fn dr(self) -> i8 {
    self.dr
  }

  pub fn dg(self) -> i8 {
    self.dg
  }

  pub fn db(self) -> i8 {
    self.db
  }
}

/// A green difference in `-32..=31` with red and blue differences relative to
/// it, each in `-8..=7`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Luma {
  dg: i8,
  dr_dg: i8,
  db_dg: i8,
}

impl Luma {
  /// Builds a luma block from plain channel differences.
  pub fn new(dr: i8, dg: i8, db: i8) -> Result<Self, Error> {
    let dr_dg = i32::from(dr) - i32::from(dg);
    let db_dg = i32::from(db) - i32::from(dg);

    check_range("luma green", dg.into(), -32..=31)?;
    check_range("luma red - green", dr_dg, -8..=7)?;
    check_range("luma blue - green", db_dg, -8..=7)?;

    Ok(Luma { dg, dr_dg: dr_dg as i8, db_dg: db_dg as i8 })
  }

  pub fn dr(self) -> i8 {
    self.dr_dg + self.dg
  }

  pub fn dg(self) -> i8 {
    self.dg
  }

  pub fn db(self) -> i8 {
    self.db_dg + self.dg
  }
}

/// The length of a run of repeated pixels, in `1..=62`.
///
/// The ceiling keeps the largest run tag at `0b11111101`, below the two
/// reserved 8 bit tags.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Run(u8);

impl Run {
  pub fn new(length: u8) -> Result<Self, Error> {
    check_range("run", length.into(), 1..=i32::from(QOI_MAX_RUN))?;
    Ok(Run(length))
  }

  pub fn get(self) -> u8 {
    self.0
  }
}

fn check_range(
  field: &'static str,
  value: i32,
  range: std::ops::RangeInclusive<i32>,
) -> Result<(), Error> {
  if !range.contains(&value) {
    return Err(Error::OutOfRange { field, value });
  }

  Ok(())
}

// An enumeration of each possible QOI encoding chunk.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Block {
  // `QOI_OP_RGB`, contains the red, green, and blue values of a pixel. Alpha
  // is carried over from the previous pixel.
  //
  // | 7  6  5  4  3  2  1  0 | 7..0 | 7..0 | 7..0 |
  // |------------------------|------|------|------|
  // | 1  1  1  1  1  1  1  0 |   r  |   g  |   b  |
  //
  Rgb(u8, u8, u8),

  // `QOI_OP_RGBA`, contains the red, green, blue, and alpha values of a pixel.
  //
  // | 7  6  5  4  3  2  1  0 | 7..0 | 7..0 | 7..0 | 7..0 |
  // |------------------------|------|------|------|------|
  // | 1  1  1  1  1  1  1  1 |   r  |   g  |   b  |   a  |
  //
  Rgba(u8, u8, u8, u8),

  // `QOI_OP_INDEX`, index into the state's pixel cache.
  //
  // | 7 6   5  4  3  2  1  0 |
  // |------------------------|
  // | 0 0 |      index       |
  //
  Index(Index),

  // `QOI_OP_DIFF`, contains the red, green, and blue difference from the
  // previous pixel, each stored with a bias of +2.
  //
  // | 7 6   5  4  3  2  1  0 |
  // |------------------------|
  // | 0 1 |  dr |  dg |  db  |
  //
  Diff(Diff),

  // `QOI_OP_LUMA`, contains the green difference from the previous pixel with
  // a bias of +32, and the red-green and blue-green differences with a bias
  // of +8.
  //
  // | 7 6   5  4  3  2  1  0 | 7  6  5  4   3  2  1  0 |
  // |------------------------|-------------------------|
  // | 1 0 |       dg         |   dr - dg  |   db - dg  |
  //
  Luma(Luma),

  // `QOI_OP_RUN`, contains the length of the run with a bias of -1.
  //
  // | 7 6   5  4  3  2  1  0 |
  // |------------------------|
  // | 1 1 |      run         |
  //
  Run(Run),
}

impl Block {
  const MASK_2: u8 = 0x03;
  const MASK_4: u8 = 0x0f;
  const MASK_6: u8 = 0x3f;
  const MASK_TAG: u8 = 0xc0;

  const TAG_DIFF: u8 = 0x40;
  const TAG_INDEX: u8 = 0x00;
  const TAG_LUMA: u8 = 0x80;
  const TAG_RGB: u8 = 0xfe;
  const TAG_RGBA: u8 = 0xff;
  const TAG_RUN: u8 = 0xc0;

  pub fn tag(&self) -> Tag {
    match self {
      Block::Rgb(..) => Tag::Rgb,
      Block::Rgba(..) => Tag::Rgba,
      Block::Index(_) => Tag::Index,
      Block::Diff(_) => Tag::Diff,
      Block::Luma(_) => Tag::Luma,
      Block::Run(_) => Tag::Run,
    }
  }

  /// Number of bytes the block occupies in the stream, tag byte included.
  pub fn encoded_len(&self) -> usize {
    match self {
      Block::Rgb(..) => 4,
      Block::Rgba(..) => 5,
      Block::Luma(_) => 2,
      Block::Index(_) | Block::Diff(_) | Block::Run(_) => 1,
    }
  }

  /// Encodes the block and writes it as bytes into the given writer.
  pub fn write_to<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
    match *self {
      Block::Rgb(r, g, b) => {
        writer.write_all(&[Block::TAG_RGB, r, g, b])?;
      }
      Block::Rgba(r, g, b, a) => {
        writer.write_all(&[Block::TAG_RGBA, r, g, b, a])?;
      }
      Block::Index(index) => {
        writer.write_all(&[Block::TAG_INDEX | index.get()])?;
      }
      Block::Diff(diff) => {
        let dr = bias(diff.dr(), 2);
        let dg = bias(diff.dg(), 2);
        let db = bias(diff.db(), 2);

        writer.write_all(&[Block::TAG_DIFF | dr << 4 | dg << 2 | db])?;
      }
      Block::Luma(luma) => {
        let dg = bias(luma.dg, 32);
        let dr_dg = bias(luma.dr_dg, 8);
        let db_dg = bias(luma.db_dg, 8);

        writer.write_all(&[Block::TAG_LUMA | dg, dr_dg << 4 | db_dg])?;
      }
      Block::Run(run) => {
        writer.write_all(&[Block::TAG_RUN | (run.get() - 1)])?;
      }
    }

    Ok(())
  }

  /// Attempts to decode a block from the given bytes. Running out of bytes
  /// part way through a block is an `Error::UnexpectedEof`.
  pub fn read_from<I>(bytes: &mut I) -> Result<Self, Error>
  where
    I: Iterator<Item = Result<u8, io::Error>>,
  {
    let byte = next_byte(bytes)?;

    let block = match Tag::from_byte(byte) {
      Tag::Rgb => Block::Rgb(next_byte(bytes)?, next_byte(bytes)?, next_byte(bytes)?),
      Tag::Rgba => Block::Rgba(
        next_byte(bytes)?,
        next_byte(bytes)?,
        next_byte(bytes)?,
        next_byte(bytes)?,
      ),
      Tag::Index => Block::Index(Index::new(byte & Block::MASK_6)?),
      Tag::Diff => Block::Diff(Diff::new(
        unbias(byte >> 4 & Block::MASK_2, 2),
        unbias(byte >> 2 & Block::MASK_2, 2),
        unbias(byte & Block::MASK_2, 2),
      )?),
      Tag::Luma => {
        let next = next_byte(bytes)?;

        Block::Luma(Luma {
          dg: unbias(byte & Block::MASK_6, 32),
          dr_dg: unbias(next >> 4 & Block::MASK_4, 8),
          db_dg: unbias(next & Block::MASK_4, 8),
        })
      }
      Tag::Run => Block::Run(Run::new((byte & Block::MASK_6) + 1)?),
    };

    Ok(block)
  }

  /// Reconstructs the pixel this block stands for against `state`, and how
  /// many times it repeats.
  ///
  /// Every block but `Run` updates the cache and the previous pixel. A run
  /// only ever repeats the previous pixel, which is already cached.
  pub fn expand(&self, state: &mut State) -> (Pixel, u8) {
    let prev = state.prev_pixel();

    let pixel = match *self {
      Block::Rgb(r, g, b) => Pixel { r, g, b, a: prev.a },
      Block::Rgba(r, g, b, a) => Pixel { r, g, b, a },
      Block::Index(index) => state.lookup(index.get()),
      Block::Diff(diff) => prev.offset(diff.dr(), diff.dg(), diff.db()),
      Block::Luma(luma) => prev.offset(luma.dr(), luma.dg(), luma.db()),
      Block::Run(run) => return (prev, run.get()),
    };

    state.observe(pixel);
    state.advance(pixel);

    (pixel, 1)
  }
}

pub(crate) fn next_byte<I>(bytes: &mut I) -> Result<u8, Error>
where
  I: Iterator<Item = Result<u8, io::Error>>,
{
  Ok(bytes.next().ok_or(Error::UnexpectedEof)??)
}

// Callers only pass validated fields, so the biased value is never negative.
fn bias(value: i8, bias: i8) -> u8 {
  (value + bias) as u8
}

fn unbias(bits: u8, bias: i8) -> i8 {
  bits as i8 - bias
}

#[cfg(test)]
mod tests {
  use std::io::Read;

  use super::*;

  fn encode(block: Block) -> Vec<u8> {
    let mut dest = Vec::new();
    block.write_to(&mut dest).expect("Failed to write block");
    dest
  }

  fn decode(bytes: &[u8]) -> Result<Block, Error> {
    Block::read_from(&mut bytes.bytes())
  }

  #[test]
  fn test_tags_are_disjoint() {
    let mut counts = [0usize; 6];

    for byte in 0..=255u8 {
      let tag = Tag::from_byte(byte);
      counts[tag as usize] += 1;

      let expected = match byte {
        0xfe => Tag::Rgb,
        0xff => Tag::Rgba,
        0x00..=0x3f => Tag::Index,
        0x40..=0x7f => Tag::Diff,
        0x80..=0xbf => Tag::Luma,
        _ => Tag::Run,
      };
      assert_eq!(tag, expected, "byte {:#010b}", byte);
    }

    // Rgb, Rgba, Index, Diff, Luma, Run
    assert_eq!(counts, [1, 1, 64, 64, 64, 62]);
  }

  #[test]
  fn test_written_tags_dispatch_back() {
    let blocks = [
      Block::Rgb(1, 2, 3),
      Block::Rgba(1, 2, 3, 4),
      Block::Index(Index::new(63).unwrap()),
      Block::Diff(Diff::new(1, 1, 1).unwrap()),
      Block::Luma(Luma::new(38, 31, 24).unwrap()),
      Block::Run(Run::new(62).unwrap()),
    ];

    for block in blocks {
      let bytes = encode(block);
      assert_eq!(bytes.len(), block.encoded_len());
      assert_eq!(Tag::from_byte(bytes[0]), block.tag());
      assert_eq!(decode(&bytes), Ok(block));
    }
  }

  #[test]
  fn test_bit_layouts() {
    assert_eq!(encode(Block::Rgb(10, 20, 30)), [0xfe, 10, 20, 30]);
    assert_eq!(encode(Block::Rgba(10, 20, 30, 40)), [0xff, 10, 20, 30, 40]);
    assert_eq!(encode(Block::Index(Index::new(54).unwrap())), [54]);
    // (-2 + 2) << 4 | (1 + 2) << 2 | (0 + 2)
    assert_eq!(encode(Block::Diff(Diff::new(-2, 1, 0).unwrap())), [0x40 | 0b00_11_10]);
    // dg = 8: 8 + 32 = 40, dr - dg = -8: 0, db - dg = 7: 15
    assert_eq!(encode(Block::Luma(Luma::new(0, 8, 15).unwrap())), [0x80 | 40, 0x0f]);
    assert_eq!(encode(Block::Run(Run::new(1).unwrap())), [0xc0]);
    assert_eq!(encode(Block::Run(Run::new(62).unwrap())), [0xfd]);
  }

  #[test]
  fn test_out_of_range_fields() {
    assert_eq!(Index::new(64), Err(Error::OutOfRange { field: "index", value: 64 }));
    assert_eq!(Diff::new(2, 0, 0), Err(Error::OutOfRange { field: "diff red", value: 2 }));
    assert_eq!(Diff::new(0, -3, 0), Err(Error::OutOfRange { field: "diff green", value: -3 }));
    assert_eq!(Luma::new(0, 32, 0), Err(Error::OutOfRange { field: "luma green", value: 32 }));
    assert_eq!(
      Luma::new(10, 0, 0),
      Err(Error::OutOfRange { field: "luma red - green", value: 10 })
    );
    assert_eq!(
      Luma::new(0, 0, -9),
      Err(Error::OutOfRange { field: "luma blue - green", value: -9 })
    );
    assert_eq!(Run::new(0), Err(Error::OutOfRange { field: "run", value: 0 }));
    assert_eq!(Run::new(63), Err(Error::OutOfRange { field: "run", value: 63 }));
  }

  #[test]
  fn test_luma_field_accessors() {
    let luma = Luma::new(-40, -32, -25).unwrap();

    assert_eq!((luma.dr(), luma.dg(), luma.db()), (-40, -32, -25));
  }

  #[test]
  fn test_truncated_blocks() {
    assert_eq!(decode(&[]), Err(Error::UnexpectedEof));
    assert_eq!(decode(&[0xfe, 1, 2]), Err(Error::UnexpectedEof));
    assert_eq!(decode(&[0xff, 1, 2, 3]), Err(Error::UnexpectedEof));
    assert_eq!(decode(&[0x80]), Err(Error::UnexpectedEof));
  }

  #[test]
  fn test_expanding_rgb_keeps_alpha() {
    let mut state = State::new();
    state.advance(Pixel::new(0, 0, 0, 7));

    assert_eq!(Block::Rgb(1, 2, 3).expand(&mut state), (Pixel::new(1, 2, 3, 7), 1));
    assert_eq!(state.prev_pixel(), Pixel::new(1, 2, 3, 7));
    assert_eq!(state.lookup(Pixel::new(1, 2, 3, 7).qoi_hash() as u8), Pixel::new(1, 2, 3, 7));
  }

  #[test]
  fn test_expanding_deltas_wraps() {
    let mut state = State::new();
    state.advance(Pixel::new(255, 0, 255, 255));

    let diff = Block::Diff(Diff::new(1, -1, 0).unwrap());
    assert_eq!(diff.expand(&mut state), (Pixel::new(0, 255, 255, 255), 1));

    let luma = Block::Luma(Luma::new(-25, -30, -28).unwrap());
    assert_eq!(luma.expand(&mut state), (Pixel::new(231, 225, 227, 255), 1));
  }

  #[test]
  fn test_expanding_index_and_run() {
    let mut state = State::new();
    let pixel = Pixel::new(101, 102, 103, 104);
    state.observe(pixel);

    let index = Block::Index(Index::new(54).unwrap());
    assert_eq!(index.expand(&mut state), (pixel, 1));
    assert_eq!(state.prev_pixel(), pixel);

    let run = Block::Run(Run::new(62).unwrap());
    assert_eq!(run.expand(&mut state), (pixel, 62));
  }
}
