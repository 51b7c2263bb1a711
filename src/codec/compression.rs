//! Whole-payload compression for Native blocks carried over a transport that
//! negotiates `gzip` or `zstd` bodies.
//!
//! The encoder side consumes a block as a list of parts, so a
//! [`BlockWriter`](crate::BlockWriter) can stream its segments straight into
//! the compressor without joining them first.

use crate::{Error, Result};

#[cfg(any(feature = "compression-zstd", feature = "compression-gzip"))]
use std::io::{ErrorKind, Read, Write};

const ZSTD_LEVELS: core::ops::RangeInclusive<i32> = -7..=22;
const GZIP_MAX_LEVEL: u32 = 9;

#[cfg(any(feature = "compression-zstd", feature = "compression-gzip"))]
const READ_CHUNK: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zstd { level: i32 },
    Gzip { level: u32 },
}

impl Compression {
    /// Name the transport uses for this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zstd { .. } => "zstd",
            Compression::Gzip { .. } => "gzip",
        }
    }

    /// Checks the level against the algorithm's accepted range.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Compression::Zstd { level } if !ZSTD_LEVELS.contains(&level) => {
                Err(Error::numeric_range(format!(
                    "zstd level {level} outside {}..={}",
                    ZSTD_LEVELS.start(),
                    ZSTD_LEVELS.end()
                )))
            }
            Compression::Gzip { level } if level > GZIP_MAX_LEVEL => Err(Error::numeric_range(
                format!("gzip level {level} outside 0..={GZIP_MAX_LEVEL}"),
            )),
            _ => Ok(()),
        }
    }
}

fn not_enabled(c: Compression) -> Error {
    Error::unsupported(format!("{} compression feature not enabled", c.name()))
}

#[cfg(any(feature = "compression-zstd", feature = "compression-gzip"))]
fn io_error(e: std::io::Error) -> Error {
    Error::Other(format!("compression stream: {e}"))
}

fn exceeds_bound(max_uncompressed_len: usize) -> Error {
    Error::bounds(format!(
        "decompressed block exceeds {max_uncompressed_len} bytes"
    ))
}

#[cfg(any(feature = "compression-zstd", feature = "compression-gzip"))]
fn write_parts<W: Write, P: AsRef<[u8]>>(sink: &mut W, parts: &[P]) -> Result<()> {
    for part in parts {
        sink.write_all(part.as_ref()).map_err(io_error)?;
    }
    Ok(())
}

/// Compresses the concatenation of `parts` into `out`, replacing its
/// contents. On error `out` holds no usable payload.
pub fn compress_parts_into<P: AsRef<[u8]>>(
    parts: &[P],
    out: &mut Vec<u8>,
    c: Compression,
) -> Result<()> {
    c.validate()?;
    out.clear();
    match c {
        Compression::None => {
            out.reserve(parts.iter().map(|p| p.as_ref().len()).sum());
            for part in parts {
                out.extend_from_slice(part.as_ref());
            }
            Ok(())
        }
        #[cfg(feature = "compression-zstd")]
        Compression::Zstd { level } => {
            let mut enc = zstd::stream::write::Encoder::new(out, level).map_err(io_error)?;
            write_parts(&mut enc, parts)?;
            enc.finish().map_err(io_error)?;
            Ok(())
        }
        #[cfg(feature = "compression-gzip")]
        Compression::Gzip { level } => {
            // Zero mtime keeps the output a pure function of the input.
            let mut enc = flate2::GzBuilder::new()
                .mtime(0)
                .write(out, flate2::Compression::new(level));
            write_parts(&mut enc, parts)?;
            enc.finish().map_err(io_error)?;
            Ok(())
        }
        #[allow(unreachable_patterns)]
        other => Err(not_enabled(other)),
    }
}

/// Compresses one finished block into `out`, replacing its contents.
pub fn compress_block_into(plain: &[u8], out: &mut Vec<u8>, c: Compression) -> Result<()> {
    compress_parts_into(&[plain], out, c)
}

/// Drains `src` into `out` chunk by chunk, failing as soon as the total would
/// pass `max_uncompressed_len`.
#[cfg(any(feature = "compression-zstd", feature = "compression-gzip"))]
fn read_bounded<R: Read>(mut src: R, max_uncompressed_len: usize, out: &mut Vec<u8>) -> Result<()> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = match src.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(e)),
        };
        if n > max_uncompressed_len - out.len() {
            return Err(exceeds_bound(max_uncompressed_len));
        }
        out.extend_from_slice(&chunk[..n]);
    }
}

/// Restores a block compressed with `c`, refusing to produce more than
/// `max_uncompressed_len` bytes.
pub fn decompress_block_into(
    bytes: &[u8],
    c: Compression,
    max_uncompressed_len: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    out.clear();
    match c {
        Compression::None => {
            if bytes.len() > max_uncompressed_len {
                return Err(exceeds_bound(max_uncompressed_len));
            }
            out.extend_from_slice(bytes);
            Ok(())
        }
        #[cfg(feature = "compression-zstd")]
        Compression::Zstd { .. } => {
            let dec = zstd::stream::read::Decoder::new(bytes).map_err(io_error)?;
            read_bounded(dec, max_uncompressed_len, out)
        }
        #[cfg(feature = "compression-gzip")]
        Compression::Gzip { .. } => {
            read_bounded(flate2::read::GzDecoder::new(bytes), max_uncompressed_len, out)
        }
        #[allow(unreachable_patterns)]
        other => Err(not_enabled(other)),
    }
}
