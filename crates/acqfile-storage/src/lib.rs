//! File-level engines for acqfile containers.
//!
//! Three engines over the codec in `acqfile-core`:
//!
//! - [`EventReader`] — sequential read cursor with absolute byte-offset
//!   seeking for externally indexed access.
//! - [`EventWriter`] — append-only writer that accumulates run statistics
//!   in memory and rewrites the header in place at close.
//! - [`Merger`] — re-serializes indexed events from arbitrary source files
//!   into size-bounded output files with geometric rotation.
//!
//! All I/O is synchronous and blocking; each engine owns its file handles
//! exclusively.

pub mod merge;
pub mod reader;
pub mod writer;

pub use merge::{IndexEntry, MergeConfig, MergeSummary, Merger, OutputFile};
pub use reader::{EventReader, EventRecord};
pub use writer::EventWriter;
