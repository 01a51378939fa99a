//! Domain types shared by sources, sinks and the ingestion pool

mod frame;
mod record;
mod status;

pub use frame::{FieldSpec, FrameSpec, ImportOptions, DEFAULT_BATCH_SIZE};
pub use record::{Record, RowAssignment, ValueAssignment};
pub use status::{slice_of, ImportStatus, ImportStatusUpdate, SLICE_WIDTH};
