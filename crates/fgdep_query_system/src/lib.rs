//! The fine-grained dependency graph: node/arc model, per-file artifacts,
//! and the cross-file propagation algorithm. The artifact codec and the
//! incremental driver loop live one layer up, in `fgdep_incremental`, since
//! neither needs to know how the graph itself is represented in memory —
//! only how to read and write it.

pub mod dep_key;
pub mod file_graph;
pub mod module_graph;
pub mod node;
pub mod tracker;

pub use dep_key::{Aspect, DependencyKey, NodeKind};
pub use file_graph::{ExternalRecord, SourceFileDepGraph, SourceFileDepGraphBuilder};
pub use module_graph::{CompileStatus, ModuleDepGraph};
pub use node::{Arc, Node, NodeIndex};
pub use tracker::ReferencedNameTracker;
