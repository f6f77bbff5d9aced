use std::env;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest input accepted by a single zlib call (uLong lengths).
pub const ZLIB_MAX_INPUT: usize = u32::MAX as usize;
/// LZ4_MAX_INPUT_SIZE from the reference block format.
pub const LZ4_MAX_INPUT: usize = 0x7E00_0000;

const DEFAULT_ZLIB_LEVEL: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionCodec {
    #[default]
    None,
    Zlib,
    Lz4,
    Lz4Hc,
    Zstd,
}

impl CompressionCodec {
    /// Codec name as it appears in the `compression` attribute.
    pub fn wire_name(self) -> &'static str {
        match self {
            CompressionCodec::None => "",
            CompressionCodec::Zlib => "zlib",
            CompressionCodec::Lz4 => "lz4",
            CompressionCodec::Lz4Hc => "lz4hc",
            CompressionCodec::Zstd => "zstd",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "zlib" => Some(CompressionCodec::Zlib),
            "lz4" => Some(CompressionCodec::Lz4),
            "lz4hc" => Some(CompressionCodec::Lz4Hc),
            "zstd" => Some(CompressionCodec::Zstd),
            _ => None,
        }
    }
}

/// One segment of a chunked compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBlock {
    pub compressed: u64,
    pub uncompressed: u64,
}

/// Compress `input`, chunking into sub-blocks when it exceeds the codec's
/// single-call input limit. The returned list is empty for single-chunk
/// streams. `level` of `-1` selects the codec's library default.
pub fn compress(
    codec: CompressionCodec,
    input: &[u8],
    level: i32,
) -> Result<(Vec<u8>, Vec<SubBlock>)> {
    match codec {
        CompressionCodec::None => Ok((input.to_vec(), Vec::new())),
        CompressionCodec::Zlib => compress_chunked(input, ZLIB_MAX_INPUT, |chunk| {
            Ok(miniz_oxide::deflate::compress_to_vec_zlib(
                chunk,
                zlib_level(level),
            ))
        }),
        CompressionCodec::Lz4 | CompressionCodec::Lz4Hc => {
            compress_chunked(input, LZ4_MAX_INPUT, |chunk| {
                Ok(lz4_flex::block::compress(chunk))
            })
        }
        #[cfg(feature = "zstd")]
        CompressionCodec::Zstd => {
            let out = zstd::bulk::compress(input, zstd_level(level))
                .map_err(|e| Error::CodecFailure(format!("zstd compression failed: {e}")))?;
            Ok((out, Vec::new()))
        }
        #[cfg(not(feature = "zstd"))]
        CompressionCodec::Zstd => Err(Error::UnsupportedFeature(
            "zstd codec not compiled in".into(),
        )),
    }
}

/// Decompress `input` into exactly `expected_size` bytes, traversing the
/// sub-block list in order. An empty list means a single implicit sub-block
/// covering the whole input.
pub fn decompress(
    codec: CompressionCodec,
    input: &[u8],
    expected_size: usize,
    sub_blocks: &[SubBlock],
) -> Result<Vec<u8>> {
    if codec == CompressionCodec::None {
        return Ok(input.to_vec());
    }

    let implicit = [SubBlock {
        compressed: input.len() as u64,
        uncompressed: expected_size as u64,
    }];
    let blocks: &[SubBlock] = if sub_blocks.is_empty() {
        &implicit
    } else {
        sub_blocks
    };

    let mut out = Vec::with_capacity(expected_size);
    let mut offset = 0usize;
    for block in blocks {
        let len = block.compressed as usize;
        let end = offset
            .checked_add(len)
            .filter(|&e| e <= input.len())
            .ok_or_else(|| Error::CodecFailure("sub-block range past end of stream".into()))?;
        let chunk = &input[offset..end];
        let inflated = decompress_chunk(codec, chunk, block.uncompressed as usize)?;
        if inflated.len() != block.uncompressed as usize {
            return Err(Error::CodecFailure(format!(
                "sub-block inflated to {} bytes, expected {}",
                inflated.len(),
                block.uncompressed
            )));
        }
        out.extend_from_slice(&inflated);
        offset = end;
    }

    if out.len() != expected_size {
        return Err(Error::CodecFailure(format!(
            "decompressed {} bytes, expected {expected_size}",
            out.len()
        )));
    }
    Ok(out)
}

fn decompress_chunk(
    codec: CompressionCodec,
    chunk: &[u8],
    uncompressed: usize,
) -> Result<Vec<u8>> {
    match codec {
        CompressionCodec::None => Ok(chunk.to_vec()),
        CompressionCodec::Zlib => miniz_oxide::inflate::decompress_to_vec_zlib(chunk)
            .map_err(|e| Error::CodecFailure(format!("zlib decompression failed: {e}"))),
        CompressionCodec::Lz4 | CompressionCodec::Lz4Hc => {
            lz4_flex::block::decompress(chunk, uncompressed)
                .map_err(|e| Error::CodecFailure(format!("lz4 decompression failed: {e}")))
        }
        #[cfg(feature = "zstd")]
        CompressionCodec::Zstd => zstd::bulk::decompress(chunk, uncompressed)
            .map_err(|e| Error::CodecFailure(format!("zstd decompression failed: {e}"))),
        #[cfg(not(feature = "zstd"))]
        CompressionCodec::Zstd => Err(Error::UnsupportedFeature(
            "zstd codec not compiled in".into(),
        )),
    }
}

fn compress_chunked<F>(
    input: &[u8],
    max_chunk: usize,
    mut one_call: F,
) -> Result<(Vec<u8>, Vec<SubBlock>)>
where
    F: FnMut(&[u8]) -> Result<Vec<u8>>,
{
    if input.len() <= max_chunk {
        return Ok((one_call(input)?, Vec::new()));
    }

    let mut out = Vec::new();
    let mut sub_blocks = Vec::with_capacity(input.len() / max_chunk + 1);
    for chunk in input.chunks(max_chunk) {
        let compressed = one_call(chunk)?;
        sub_blocks.push(SubBlock {
            compressed: compressed.len() as u64,
            uncompressed: chunk.len() as u64,
        });
        out.extend_from_slice(&compressed);
    }
    Ok((out, sub_blocks))
}

#[inline]
fn zlib_level(level: i32) -> u8 {
    if level < 0 {
        DEFAULT_ZLIB_LEVEL
    } else {
        level.min(10) as u8
    }
}

#[cfg(feature = "zstd")]
#[inline]
fn zstd_level(level: i32) -> i32 {
    if level < 0 {
        zstd::DEFAULT_COMPRESSION_LEVEL
    } else {
        level
    }
}

/// Process-wide write-side override taken from `LIBXISF_COMPRESSION`
/// (`<codec>[+sh][:<level>]`). Read once; immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOverride {
    pub codec: CompressionCodec,
    pub shuffle: bool,
    pub level: i32,
}

static OVERRIDE: Lazy<Option<CompressionOverride>> =
    Lazy::new(|| parse_override(env::var("LIBXISF_COMPRESSION").ok()?.as_str()));

pub fn compression_override() -> Option<CompressionOverride> {
    *OVERRIDE
}

fn parse_override(spec: &str) -> Option<CompressionOverride> {
    let mut fields = spec.splitn(2, ':');
    let mut name = fields.next().unwrap_or_default();
    let shuffle = name.ends_with("+sh");
    if shuffle {
        name = &name[..name.len() - 3];
    }
    let codec = CompressionCodec::from_wire_name(name)?;
    // an unparseable level is silently ignored
    let level = fields
        .next()
        .and_then(|l| l.parse::<i32>().ok())
        .unwrap_or(-1);
    Some(CompressionOverride {
        codec,
        shuffle,
        level,
    })
}
