//! This crate implements a streaming encoder and decoder for the
//! [QOI image format](https://qoiformat.org).
//!
//! An image is a 14 byte header followed by a stream of blocks, each of which
//! reproduces one or more pixels from a small amount of rolling state: the
//! previous pixel and a 64 slot cache of recently seen colors. The stream is
//! terminated by an 8 byte end marker.
//!
//! The core entry points are [`Encoder`] and [`Decoder`]. The decoder is an
//! iterator over the image's pixels, and the encoder consumes pixels one at a
//! time, so neither needs the whole image in memory. The [`encode`] and
//! [`decode`] functions wrap them for in-memory images.
//!
//! To keep this crate simple, it does not support decoding other image
//! formats. Pixels go in and come out as [`Pixel`] values, which convert to
//! and from packed `0xAARRGGBB` integers.
//!
//! # In-memory encode example
//!
//! ```rust
//! use qoi::{decode, encode, Channels, Colorspace, Pixel};
//!
//! // A 2x1 image made up of an opaque red and an opaque black pixel.
//! let pixels = [0xffff0000u32, 0xff000000];
//!
//! let bytes = encode(2, 1, pixels, Channels::Rgba, Colorspace::Srgb).expect("Failed to encode image");
//! let (header, decoded) = decode(bytes.as_slice(), true).expect("Failed to decode image");
//!
//! assert_eq!((header.width, header.height), (2, 1));
//! assert_eq!(decoded, [Pixel::rgb(255, 0, 0), Pixel::rgb(0, 0, 0)]);
//! ```
//!
//! # Streaming decode example
//!
//! ```rust
//! use std::io::BufReader;
//! use qoi::{encode, Channels, Colorspace, Decoder, Pixel};
//!
//! let image = encode(64, 64, vec![Pixel::rgb(1, 2, 3); 64 * 64], Channels::Rgb, Colorspace::Linear)
//!   .expect("Failed to encode image");
//!
//! let decoder = Decoder::new(BufReader::new(image.as_slice())).expect("Failed to read header");
//! assert_eq!(decoder.header().num_pixels(), 4096);
//!
//! for pixel in decoder {
//!   match pixel {
//!     Ok(pixel) => assert_eq!(pixel, Pixel::rgb(1, 2, 3)),
//!     // See `error.rs` for all possible errors.
//!     Err(e) => panic!("{}", e),
//!   }
//! }
//! ```
//!

pub use crate::block::{Block, Diff, Index, Luma, Run, Tag, QOI_MAX_RUN};
pub use crate::decode::{decode, decode_image, decode_with, Decoder};
pub use crate::encode::{encode, encode_image, encode_with, Encoder};
pub use crate::error::{Error, ErrorKind};
pub use crate::header::{Channels, Colorspace, Header, QOI_BYTES_END, QOI_BYTES_MAGIC, QOI_HEADER_LEN};
pub use crate::options::{DecodeOptions, EncodeOptions, Limits};
pub use crate::pixel::Pixel;
pub use crate::state::{State, QOI_CACHE_LEN};

mod block;
mod decode;
mod encode;
mod error;
mod header;
mod options;
mod pixel;
mod state;
