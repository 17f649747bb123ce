use std::io::Write;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use bzip2::write::BzEncoder;
use bzip2::Compression as BzCompression;
use flate2::write::GzEncoder;
use flate2::Compression as GzCompression;

use crate::config::CompressType;
use crate::error::{DedupError, Result};

/// One-shot compression backend applied to a single unique chunk.
///
/// `Refiner`/`Deduplicator`/`Compressor` are fused into one worker closure
/// (see the pipeline module), so this trait is invoked in-process with no
/// separate compression thread — it only needs to be `Send + Sync` so the
/// same `Arc<dyn Codec>` can be shared by every worker.
pub trait Codec: Send + Sync {
    fn compress(&self, input: &[u8]) -> Result<Bytes>;
    fn name(&self) -> &'static str;
}

pub struct NoneCodec;

impl Codec for NoneCodec {
    fn compress(&self, input: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(input))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

pub struct GzipCodec {
    level: GzCompression,
}

impl GzipCodec {
    pub fn new() -> Self {
        GzipCodec {
            level: GzCompression::default(),
        }
    }
}

impl Codec for GzipCodec {
    fn compress(&self, input: &[u8]) -> Result<Bytes> {
        // worst-case gzip expansion: n + (n >> 9) + 12
        let cap = input.len() + (input.len() >> 9) + 12;
        let mut out = BytesMut::with_capacity(cap).writer();
        let mut encoder = GzEncoder::new(&mut out, self.level);
        encoder
            .write_all(input)
            .map_err(|source| DedupError::Codec {
                codec: "gzip",
                source,
            })?;
        encoder.finish().map_err(|source| DedupError::Codec {
            codec: "gzip",
            source,
        })?;
        Ok(out.into_inner().freeze())
    }

    fn name(&self) -> &'static str {
        "gzip"
    }
}

pub struct Bzip2Codec {
    level: BzCompression,
}

impl Bzip2Codec {
    pub fn new() -> Self {
        Bzip2Codec {
            level: BzCompression::default(),
        }
    }
}

impl Codec for Bzip2Codec {
    fn compress(&self, input: &[u8]) -> Result<Bytes> {
        // worst-case bzip2 expansion: n + (n >> 6) + 600
        let cap = input.len() + (input.len() >> 6) + 600;
        let mut out = BytesMut::with_capacity(cap).writer();
        let mut encoder = BzEncoder::new(&mut out, self.level);
        encoder
            .write_all(input)
            .map_err(|source| DedupError::Codec {
                codec: "bzip2",
                source,
            })?;
        encoder.finish().map_err(|source| DedupError::Codec {
            codec: "bzip2",
            source,
        })?;
        Ok(out.into_inner().freeze())
    }

    fn name(&self) -> &'static str {
        "bzip2"
    }
}

pub fn make_codec(compress_type: CompressType) -> Arc<dyn Codec> {
    match compress_type {
        CompressType::None => Arc::new(NoneCodec),
        CompressType::Gzip => Arc::new(GzipCodec::new()),
        CompressType::Bzip2 => Arc::new(Bzip2Codec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_codec_is_identity() {
        let codec = NoneCodec;
        let out = codec.compress(b"hello world").unwrap();
        assert_eq!(&out[..], b"hello world");
    }

    #[test]
    fn gzip_round_trips_via_flate2_read_side() {
        use std::io::Read;
        let codec = GzipCodec::new();
        let compressed = codec.compress(b"hello world, hello world, hello world").unwrap();
        let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, b"hello world, hello world, hello world");
    }

    #[test]
    fn bzip2_round_trips_via_bzip2_read_side() {
        use std::io::Read;
        let codec = Bzip2Codec::new();
        let compressed = codec.compress(b"hello world, hello world, hello world").unwrap();
        let mut decoder = bzip2::read::BzDecoder::new(&compressed[..]);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, b"hello world, hello world, hello world");
    }

    #[test]
    fn empty_input_compresses_without_error() {
        for codec in [make_codec(CompressType::None), make_codec(CompressType::Gzip), make_codec(CompressType::Bzip2)] {
            let out = codec.compress(b"").unwrap();
            assert!(out.len() <= 600);
        }
    }
}
