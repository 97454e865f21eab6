//! Append-only writer for one acqfile container.
//!
//! ## Lifecycle
//!
//! ```text
//! open ──→ placeholder header ──→ append* ──→ close
//!                                              │
//!                              events > 0: seek(0), rewrite header
//!                              events = 0: truncate to length 0
//! ```
//!
//! Statistics accumulate in memory only; no header rewrite happens per
//! record. A reader of a file whose writer never closed sees the
//! placeholder header, never a half-updated one. An aborted writer that
//! appended nothing leaves a zero-length file rather than a header-only
//! stub.
//!
//! ```ignore
//! use acqfile_storage::EventWriter;
//! use acqfile_core::RunConfig;
//!
//! let mut writer = EventWriter::open("out.acq", run_id, &RunConfig::default())?;
//! for event in events {
//!     writer.append(&event.context, &event.payload, &event.info, &event.keys)?;
//! }
//! writer.close()?;
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tracing::{info, warn};

use acqfile_core::header::HEADER_LEN;
use acqfile_core::{
    ChannelErrorKind, Context, Error, FileHeader, Info, Keys, PayloadBlob, Result, RunConfig,
};

/// Append-only cursor over a container file.
pub struct EventWriter {
    path: PathBuf,
    file: Option<File>,
    header: FileHeader,
}

impl EventWriter {
    /// Create the container and write the placeholder header.
    ///
    /// The run configuration is captured here and serialized into the
    /// header; it is per-writer state, not process state.
    pub fn open(path: impl AsRef<Path>, run_id: u32, config: &RunConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| Error::Open {
                path: path.clone(),
                source,
            })?;

        let header = FileHeader::new(run_id, config);
        let mut image = BytesMut::with_capacity(HEADER_LEN);
        header.encode(&mut image);
        file.write_all(&image)?;

        info!(path = %path.display(), run_id, "opened container for writing");
        Ok(Self {
            path,
            file: Some(file),
            header,
        })
    }

    /// Encode and append one record, then fold it into the statistics.
    pub fn append(
        &mut self,
        context: &Context,
        payload: &PayloadBlob,
        info: &Info,
        keys: &Keys,
    ) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::WriterClosed(self.path.clone()))?;

        let mut buf = BytesMut::with_capacity(Context::ENCODED_LEN + payload.len() + 64);
        context.encode(&mut buf);
        payload.encode(&mut buf);
        info.encode(&mut buf);
        keys.encode(&mut buf);
        file.write_all(&buf)?;

        self.header.record_event(context);
        Ok(())
    }

    /// Upsert a per-channel error count into the header statistics.
    pub fn record_channel_error(&mut self, channel: u32, kind: ChannelErrorKind, count: u32) {
        self.header.record_channel_error(channel, kind, count);
    }

    /// Finalize the container. Idempotent; a second call is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        if self.header.event_count == 0 {
            // Nothing was ever appended: an empty container is a
            // zero-length file, not a header-only stub.
            file.set_len(0)?;
            file.sync_all()?;
            info!(path = %self.path.display(), "closed empty container, truncated");
            return Ok(());
        }

        file.seek(SeekFrom::Start(0))?;
        let mut image = BytesMut::with_capacity(HEADER_LEN);
        self.header.encode(&mut image);
        file.write_all(&image)?;
        file.seek(SeekFrom::End(0))?;
        file.sync_all()?;

        info!(
            path = %self.path.display(),
            events = self.header.event_count,
            gem_begin = self.header.gem_beg,
            gem_end = self.header.gem_end,
            "closed container"
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn event_count(&self) -> u64 {
        self.header.event_count
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(e) = self.close() {
                warn!(path = %self.path.display(), error = %e, "close on drop failed");
            }
        }
    }
}
