//! A [WebAssembly](https://developer.mozilla.org/en-US/docs/WebAssembly)
//! wrapper of the QOI crate. This makes it possible to use the crate on any
//! host system that supports WebAssembly such as a web browser or on systems
//! that have implemented [WASI](https://wasi.dev/).
//!
//! Pixels cross the boundary as packed 32 bit `0xAARRGGBB` values. Reading an
//! image out of a container format such as PNG, or writing one back, stays on
//! the host side.
//!
//! Passing and translating rich data types through the WASM FFI boundary isn't
//! supported as of writing this, so some manual setup and teardown steps need
//! to be done to copy the decoded and encoded image data to and from the WASM
//! instance. It's important that these steps are executed in the right order
//! since they involve manually allocating and deallocating raw memory.
//!
//! # JavaScript WebAssembly decode example
//!
//! ```js
//! let wasm = await WebAssembly.instantiateStreaming(fetch('./path-to-wasm.wasm'), {
//!   env: {
//!     // Called with a pointer to `width * height` packed u32 pixels.
//!     on_decode_complete: (pointer, width, height, channels, colorspace) => {
//!       let pixels = new Uint32Array(wasm.instance.exports.memory.buffer, pointer, width * height).slice();
//!       wasm.instance.exports.qoi_dealloc_pixels(pointer, width * height);
//!     },
//!     on_decode_error: (code) => console.error(code),
//!     on_encode_complete: () => {},
//!     on_encode_error: () => {},
//!   },
//! });
//!
//! let size = encodedImage.byteLength;
//! let pointer = wasm.instance.exports.qoi_malloc(size);
//! new Uint8Array(wasm.instance.exports.memory.buffer, pointer, size).set(encodedImage);
//!
//! // The third argument requests the end of stream marker to be checked.
//! wasm.instance.exports.qoi_image_decode(pointer, size, 1);
//! wasm.instance.exports.qoi_dealloc(pointer, size);
//! ```
//!
//! # JavaScript WebAssembly encode example
//!
//! ```js
//! // `pixels` is a Uint32Array of `width * height` packed pixels.
//! let pointer = wasm.instance.exports.qoi_malloc_pixels(pixels.length);
//! new Uint32Array(wasm.instance.exports.memory.buffer, pointer, pixels.length).set(pixels);
//!
//! // Channels 4 (RGBA) and colorspace 0 (sRGB). Calls `on_encode_complete`
//! // with a pointer to the encoded image and its size in bytes.
//! wasm.instance.exports.qoi_image_encode(width, height, 4, 0, pointer, pixels.length);
//! wasm.instance.exports.qoi_dealloc_pixels(pointer, pixels.length);
//! ```
//!

use std::slice;

use qoi::{decode, encode, Channels, Colorspace, Error, ErrorKind, Header};

// Maps a QOI crate error into an integer that can be trivially passed through
// the WASM FFI boundary.
struct ErrorCode {
  code: u8,
}

impl From<Error> for ErrorCode {
  fn from(error: Error) -> Self {
    let code = match error {
      Error::InvalidColorspace(_) => 1,
      Error::InvalidDimensions { .. } => 2,
      Error::InvalidMagic(_) => 3,
      Error::InvalidChannels(_) => 4,
      Error::Io(_) => 5,
      Error::UnexpectedEof => 6,
      Error::PixelOverflow { .. } => 7,
      Error::InvalidEndMarker(_) => 8,
      Error::PixelCountMismatch { .. } => 9,
      Error::OutOfRange { .. } => 10,
      Error::LimitExceeded(_) => 11,
      // Variants added later fall back to their broad kind.
      other => match other.kind() {
        ErrorKind::Format => 100,
        ErrorKind::Value => 101,
        ErrorKind::Limit => 102,
        ErrorKind::Io => 103,
      },
    };

    ErrorCode { code }
  }
}

// External functions that are expected to be imported into the WASM instance
// from the host.
extern "C" {
  fn on_decode_complete(buf_ptr: *mut u32, width: u32, height: u32, channels: u8, colorspace: u8);
  fn on_decode_error(err_code: u8);
  fn on_encode_complete(buf_ptr: *mut u8, size: usize);
  fn on_encode_error(err_code: u8);
}

/// Allocates a chunk of linear memory of the given `size` in bytes, intended
/// to contain an encoded image.
#[no_mangle]
pub extern "C" fn qoi_malloc(size: usize) -> *mut u8 {
  leak(vec![0u8; size])
}

/// Deallocates the memory starting at `ptr` up to `size` bytes.
///
/// # Safety
///
/// This function should only be called once for each allocation created with
/// `qoi_malloc`, or handed out through `on_encode_complete`, using the same
/// `size` and the returned `ptr`. Otherwise the WASM instance's memory will be
/// corrupted.
#[no_mangle]
pub unsafe extern "C" fn qoi_dealloc(ptr: *mut u8, size: usize) {
  drop(Box::from_raw(slice::from_raw_parts_mut(ptr, size)));
}

/// Allocates room for `len` packed pixels.
#[no_mangle]
pub extern "C" fn qoi_malloc_pixels(len: usize) -> *mut u32 {
  leak(vec![0u32; len])
}

/// Deallocates `len` packed pixels starting at `ptr`.
///
/// # Safety
///
/// Same as `qoi_dealloc`, for allocations created with `qoi_malloc_pixels` or
/// handed out through `on_decode_complete`.
#[no_mangle]
pub unsafe extern "C" fn qoi_dealloc_pixels(ptr: *mut u32, len: usize) {
  drop(Box::from_raw(slice::from_raw_parts_mut(ptr, len)));
}

// Hands a buffer over to the host, which frees it with the matching dealloc
// function and the buffer's length.
fn leak<T>(buf: Vec<T>) -> *mut T {
  Box::leak(buf.into_boxed_slice()).as_mut_ptr()
}

/// Encodes the `len` packed `0xAARRGGBB` pixels starting at `buf_ptr` into a
/// `width * height` QOI image.
///
/// Calls `on_encode_complete` with a pointer to the encoded image's data and
/// size.
///
/// Calls `on_encode_error` with an error code if an error occurs.
///
/// # Safety
///
/// `buf_ptr` must point to `len` pixels created by calling
/// `qoi_malloc_pixels`.
#[no_mangle]
pub unsafe extern "C" fn qoi_image_encode(
  width: u32,
  height: u32,
  channels: u8,
  colorspace: u8,
  buf_ptr: *const u32,
  len: usize,
) {
  let result = Channels::try_from(channels)
    .and_then(|channels| Ok((channels, Colorspace::try_from(colorspace)?)))
    .and_then(|(channels, colorspace)| {
      let pixels = slice::from_raw_parts(buf_ptr, len);
      encode(width, height, pixels.iter().copied(), channels, colorspace)
    });

  match result {
    Ok(dest) => {
      let size = dest.len();
      on_encode_complete(leak(dest), size);
    }
    Err(e) => {
      on_encode_error(ErrorCode::from(e).code);
    }
  }
}

/// Takes a `buf_ptr` and `buf_size` to a chunk of memory that represents a QOI
/// encoded image and decodes it into packed `0xAARRGGBB` pixels.
///
/// Calls `on_decode_complete` with a pointer to the decoded pixels and the
/// image's header. The host frees the `width * height` pixels with
/// `qoi_dealloc_pixels`.
///
/// Calls `on_decode_error` with an error code if an error occurs.
///
/// # Safety
///
/// `buf_ptr` must point to `buf_size` readable bytes created by calling
/// `qoi_malloc`.
#[no_mangle]
pub unsafe extern "C" fn qoi_image_decode(buf_ptr: *const u8, buf_size: usize, enforce_end_marker: u8) {
  let source = slice::from_raw_parts(buf_ptr, buf_size);

  match decode(source, enforce_end_marker != 0) {
    Ok((header, pixels)) => {
      let Header { width, height, channels, colorspace } = header;
      let packed: Vec<u32> = pixels.into_iter().map(u32::from).collect();

      on_decode_complete(leak(packed), width, height, channels as u8, colorspace as u8);
    }
    Err(e) => {
      on_decode_error(ErrorCode::from(e).code);
    }
  }
}
