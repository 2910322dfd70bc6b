//! The incremental-build core's driver-facing crate: the artifact codec,
//! the output file map, and the driver loop that ties
//! `fgdep_query_system`'s module graph to an external compile collaborator.

pub mod driver;
pub mod error;
pub mod output_file_map;
pub mod persist;

pub use driver::{
    dispatch_with_channel, run_incremental_build, BuildInput, BuildReport, CompileJobRunner, DriverConfig, QueueReason,
};
pub use error::{DecodeError, JobError, PersistError};
pub use output_file_map::{FileOutputs, OutputFileMap};
pub use persist::{decode, encode, read_artifact, write_artifact, write_atomic};
