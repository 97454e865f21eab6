//! Sequential read cursor over one acqfile container.
//!
//! ## Reading a container
//!
//! ```ignore
//! use acqfile_storage::EventReader;
//!
//! let mut reader = EventReader::open("run-700000123.acq")?;
//! println!("run {} holds {} events", reader.run_id(), reader.event_count());
//!
//! while let Some(record) = reader.next_record()? {
//!     process(record);
//! }
//! ```
//!
//! ## Indexed access
//!
//! External index files record absolute byte offsets of records. `seek`
//! repositions the cursor to such an offset; the next `next_record` call
//! decodes from there. Offsets are only meaningful if record-aligned; the
//! format carries no boundary markers, so alignment is the index
//! producer's responsibility.
//!
//! A decode error leaves the cursor misaligned. The stream must not be
//! read further after one; reopen or `seek` to a known-good offset first.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Buf;
use tracing::debug;

use acqfile_core::header::HEADER_LEN;
use acqfile_core::{Context, Error, FileHeader, Info, Keys, PayloadBlob, Result};

/// One fully decoded event record.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub context: Context,
    pub payload: PayloadBlob,
    pub info: Info,
    pub keys: Keys,
}

/// Read-only cursor over a container file.
pub struct EventReader {
    path: PathBuf,
    file: BufReader<File>,
    header: FileHeader,
}

impl EventReader {
    /// Open a container and validate its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        let mut file = BufReader::new(file);

        let mut image = [0u8; HEADER_LEN];
        read_exact(&mut file, &mut image)?;
        let header = FileHeader::decode(&mut image.as_slice())?;

        debug!(
            path = %path.display(),
            run_id = header.run_id,
            events = header.event_count,
            "opened container"
        );
        Ok(Self { path, file, header })
    }

    /// Decode the next record, or `Ok(None)` at clean end-of-file.
    ///
    /// End-of-stream is only legal at a record boundary; running out of
    /// bytes mid-record fails with `TruncatedRecord` (or
    /// `TruncatedPayload` inside the blob).
    pub fn next_record(&mut self) -> Result<Option<EventRecord>> {
        if self.file.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let mut image = [0u8; Context::ENCODED_LEN];
        read_exact(&mut self.file, &mut image)?;
        let context = Context::decode(&mut image.as_slice())?;

        let payload = PayloadBlob::read_from(&mut self.file)?;

        let mut framing = [0u8; 8];
        read_exact(&mut self.file, &mut framing)?;
        let mut cursor = framing.as_slice();
        let tag = cursor.get_u32_le();
        let len = cursor.get_u32_le() as usize;
        let mut body = vec![0u8; len];
        read_exact(&mut self.file, &mut body)?;
        let info = Info::decode_body(tag, &mut body.as_slice())?;

        let keys = Keys::read_from(&mut self.file)?;

        Ok(Some(EventRecord {
            context,
            payload,
            info,
            keys,
        }))
    }

    /// Reposition to an absolute byte offset from an external index.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Rewind to the first record, just past the header.
    pub fn rewind(&mut self) -> Result<()> {
        self.seek(Self::first_record_offset())
    }

    /// Byte offset of the first record in any container.
    pub fn first_record_offset() -> u64 {
        HEADER_LEN as u64
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn run_id(&self) -> u32 {
        self.header.run_id
    }

    pub fn event_count(&self) -> u64 {
        self.header.event_count
    }

    pub fn gem_begin(&self) -> u64 {
        self.header.gem_beg
    }

    pub fn gem_end(&self) -> u64 {
        self.header.gem_end
    }

    pub fn secs_begin(&self) -> u32 {
        self.header.secs_beg
    }

    pub fn secs_end(&self) -> u32 {
        self.header.secs_end
    }

    pub fn config_key(&self) -> u32 {
        self.header.config_key
    }

    pub fn alias(&self) -> &str {
        &self.header.alias
    }
}

fn read_exact(r: &mut impl Read, out: &mut [u8]) -> Result<()> {
    r.read_exact(out).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TruncatedRecord
        } else {
            Error::Io(e)
        }
    })
}
