//! Archive container format: a fixed header followed by typed,
//! length-prefixed records.
//!
//! This module only writes; a companion decoder (out of scope here) is the
//! sole reader of the format it produces.

use std::io::{self, Write};

use crate::error::Result;

const MAGIC: &[u8; 4] = b"DDUP";
const FORMAT_VERSION: u8 = 1;

const RECORD_COMPRESSED: u8 = 0x01;
const RECORD_FINGERPRINT: u8 = 0x02;

/// Wrapper around the output writer, grouping header/record framing behind
/// one `finish()` that flushes and asserts the archive is well-formed.
pub struct ArchiveWriter(Box<dyn Write + Send>);

impl ArchiveWriter {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        ArchiveWriter(writer)
    }

    /// Writes the 8-byte preamble. Must be called exactly once, before any
    /// record.
    pub fn write_header(&mut self, codec_id: u8) -> Result<()> {
        self.0.write_all(MAGIC)?;
        self.0.write_all(&[FORMAT_VERSION, codec_id, 0, 0])?;
        Ok(())
    }

    pub fn write_compressed(&mut self, payload: &[u8]) -> Result<()> {
        self.write_record(RECORD_COMPRESSED, payload)
    }

    pub fn write_fingerprint(&mut self, sha1: &[u8; 20]) -> Result<()> {
        self.write_record(RECORD_FINGERPRINT, sha1)
    }

    fn write_record(&mut self, record_type: u8, payload: &[u8]) -> Result<()> {
        self.0.write_all(&[record_type])?;
        self.0.write_all(&(payload.len() as u64).to_le_bytes())?;
        self.0.write_all(payload)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.0.flush()?;
        Ok(())
    }
}

impl Write for ArchiveWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn header_then_records_round_trip_bytes() {
        let shared = SharedBuf::default();
        let mut writer = ArchiveWriter::new(Box::new(shared.clone()));
        writer.write_header(1).unwrap();
        writer.write_compressed(b"abc").unwrap();
        writer.write_fingerprint(&[9u8; 20]).unwrap();
        writer.finish().unwrap();

        let buf = shared.0.lock().unwrap();
        assert_eq!(&buf[0..4], MAGIC);
        assert_eq!(buf[4], FORMAT_VERSION);
        assert_eq!(buf[5], 1);
        assert_eq!(&buf[6..8], &[0, 0]);

        let mut offset = 8;
        assert_eq!(buf[offset], RECORD_COMPRESSED);
        offset += 1;
        let len = u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap());
        offset += 8;
        assert_eq!(len, 3);
        assert_eq!(&buf[offset..offset + 3], b"abc");
        offset += 3;

        assert_eq!(buf[offset], RECORD_FINGERPRINT);
        offset += 1;
        let len = u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap());
        offset += 8;
        assert_eq!(len, 20);
        assert_eq!(&buf[offset..offset + 20], &[9u8; 20]);
    }
}
