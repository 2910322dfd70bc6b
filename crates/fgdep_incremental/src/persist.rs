//! The dependency artifact codec: a tagged-record bitstream, framed by a
//! fixed signature and a version header, one artifact per source file.
//!
//! Two notes on the record shapes, called out here rather than left
//! implicit:
//!
//! - Sub-byte bitfields (`kind: u3`, `aspect: u1`, …) are widened to whole
//!   bytes. `fgdep_serialize::Encoder` is a byte/word/vbr writer, not a
//!   bit-packer, and packing three unrelated tag kinds into fewer bits buys
//!   nothing on a format this small.
//! - An explicit `ARC` record follows the node table: an arc's `user` index
//!   and `cascades` flag have nowhere else to live in this crate's node/arc
//!   model, and both must survive an encode/decode round trip.
//!
//! The artifact-path identifier is always written from the node's own
//! `artifact_path` field, never swapped with `context`/`name`.

use std::convert::TryFrom;
use std::fs;
use std::io::Write;
use std::path::Path;

use fgdep_data_structures::fx::{FxHashMap, FxIndexSet};
use fgdep_index::IndexVec;
use fgdep_paths::Identifier;
use fgdep_query_system::dep_key::{Aspect, NodeKind};
use fgdep_query_system::file_graph::{ExternalRecord, SourceFileDepGraph};
use fgdep_query_system::node::{Arc, Node, NodeIndex};
use fgdep_query_system::DependencyKey;
use fgdep_serialize::opaque::{Encoder as OpaqueEncoder, OpaqueDecodeError, SliceDecoder};
use fgdep_serialize::{Decodable, Decoder, Encodable, Encoder};

use crate::error::PersistError;

const SIGNATURE: [u8; 4] = *b"DDEP";
const MAJOR: u16 = 1;
const MINOR: u16 = 0;
const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn kind_tag(kind: NodeKind) -> u8 {
    kind as u8
}

fn kind_from_tag(tag: u8) -> Result<NodeKind, OpaqueDecodeError> {
    Ok(match tag {
        0 => NodeKind::TopLevel,
        1 => NodeKind::Nominal,
        2 => NodeKind::PotentialMember,
        3 => NodeKind::Member,
        4 => NodeKind::DynamicLookup,
        5 => NodeKind::ExternalDepend,
        6 => NodeKind::SourceFileProvide,
        other => return Err(OpaqueDecodeError(format!("unknown node-kind tag {other}"))),
    })
}

fn aspect_tag(aspect: Aspect) -> u8 {
    aspect as u8
}

fn aspect_from_tag(tag: u8) -> Result<Aspect, OpaqueDecodeError> {
    Ok(match tag {
        0 => Aspect::Interface,
        1 => Aspect::Implementation,
        other => return Err(OpaqueDecodeError(format!("unknown aspect tag {other}"))),
    })
}

/// Collects every identifier a graph references into a single table, in a
/// fixed deterministic traversal order (file, then nodes in key order, then
/// arcs in key order, then externals in path order) so two processes that
/// built byte-identical graphs by different routes write byte-identical
/// artifacts.
struct IdentifierTable {
    order: FxIndexSet<Identifier>,
}

impl IdentifierTable {
    fn new() -> Self {
        IdentifierTable { order: FxIndexSet::default() }
    }

    /// Returns the identifier's 1-based sequence number; `Identifier::EMPTY`
    /// always maps to 0 without occupying a table slot.
    fn id_of(&mut self, ident: Identifier) -> u64 {
        if ident.is_empty() {
            return 0;
        }
        let (index, _) = self.order.insert_full(ident);
        index as u64 + 1
    }

}

fn sorted_node_order(nodes: &IndexVec<NodeIndex, Node>) -> Vec<NodeIndex> {
    let mut order: Vec<NodeIndex> = nodes.indices().collect();
    order.sort_by(|&a, &b| nodes[a].key.cmp(&nodes[b].key));
    order
}

fn sorted_arc_order(arcs: &[Arc]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..arcs.len()).collect();
    order.sort_by(|&a, &b| arcs[a].def.cmp(&arcs[b].def));
    order
}

/// Encodes `graph` into its on-disk artifact representation.
pub fn encode(graph: &SourceFileDepGraph) -> Vec<u8> {
    let node_order = sorted_node_order(graph.nodes());
    // Position of each original `NodeIndex` within the sorted table, so an
    // arc's `user` field (which references the pre-sort arena) can be
    // rewritten to the on-disk position.
    let mut position_of: FxHashMap<NodeIndex, u64> = FxHashMap::default();
    for (new_pos, &old_index) in node_order.iter().enumerate() {
        position_of.insert(old_index, new_pos as u64);
    }

    let mut externals: Vec<&ExternalRecord> = graph.externals().iter().collect();
    externals.sort_by_key(|e| e.path.as_str());

    let arc_order = sorted_arc_order(graph.arcs());

    let mut ids = IdentifierTable::new();
    let file_id = ids.id_of(graph.file());
    let node_fields: Vec<_> = node_order
        .iter()
        .map(|&idx| {
            let node = &graph.nodes()[idx];
            (
                ids.id_of(node.key.context),
                ids.id_of(node.key.name),
                node.artifact_path.map(|p| ids.id_of(p)),
            )
        })
        .collect();
    let arc_fields: Vec<_> = arc_order
        .iter()
        .map(|&i| {
            let arc = &graph.arcs()[i];
            (ids.id_of(arc.def.context), ids.id_of(arc.def.name))
        })
        .collect();
    let external_fields: Vec<_> = externals.iter().map(|e| ids.id_of(e.path)).collect();

    let mut e = OpaqueEncoder::new();
    e.emit_raw_bytes(&SIGNATURE).unwrap();
    e.emit_u16(MAJOR).unwrap();
    e.emit_u16(MINOR).unwrap();
    String::from(COMPILER_VERSION).encode(&mut e).unwrap();

    e.emit_vbr(ids.order.len() as u64).unwrap();
    for ident in ids.order.iter() {
        e.emit_raw_bytes(&(ident.as_str().len() as u32).to_le_bytes()).unwrap();
        e.emit_raw_bytes(ident.as_str().as_bytes()).unwrap();
    }

    e.emit_vbr(file_id).unwrap();

    e.emit_vbr(node_order.len() as u64).unwrap();
    for (&idx, &(context_id, name_id, artifact_id)) in node_order.iter().zip(node_fields.iter()) {
        let node = &graph.nodes()[idx];
        e.emit_u8(kind_tag(node.key.kind)).unwrap();
        e.emit_u8(aspect_tag(node.key.aspect)).unwrap();
        e.emit_vbr(context_id).unwrap();
        e.emit_vbr(name_id).unwrap();
        e.emit_bool(node.provides).unwrap();
        e.emit_bool(node.fingerprint.is_some()).unwrap();
        if let Some(fp) = node.fingerprint {
            e.emit_u64(fp).unwrap();
        }
        e.emit_bool(artifact_id.is_some()).unwrap();
        if let Some(artifact_id) = artifact_id {
            e.emit_vbr(artifact_id).unwrap();
        }
    }

    e.emit_vbr(arc_order.len() as u64).unwrap();
    for (&i, &(context_id, name_id)) in arc_order.iter().zip(arc_fields.iter()) {
        let arc = &graph.arcs()[i];
        let user_pos = position_of[&arc.user];
        e.emit_vbr(user_pos).unwrap();
        e.emit_u8(kind_tag(arc.def.kind)).unwrap();
        e.emit_u8(aspect_tag(arc.def.aspect)).unwrap();
        e.emit_vbr(context_id).unwrap();
        e.emit_vbr(name_id).unwrap();
        e.emit_bool(arc.cascades).unwrap();
    }

    e.emit_vbr(externals.len() as u64).unwrap();
    for (external, &path_id) in externals.iter().zip(external_fields.iter()) {
        e.emit_vbr(path_id).unwrap();
        e.emit_bool(external.observed_interface_hash.is_some()).unwrap();
        if let Some(hash) = external.observed_interface_hash {
            e.emit_u64(hash).unwrap();
        }
    }

    e.into_bytes()
}

/// Decodes an artifact produced by `encode`. Rejects an unknown major
/// version, an out-of-range identifier index, or an unknown record tag with
/// a fatal decode error.
pub fn decode(bytes: &[u8]) -> Result<SourceFileDepGraph, OpaqueDecodeError> {
    let mut d = SliceDecoder::new(bytes, 0);

    let signature = d.read_raw_bytes(4)?;
    if signature != SIGNATURE {
        return Err(OpaqueDecodeError(format!("bad artifact signature {signature:?}")));
    }
    let major = d.read_u16()?;
    let _minor = d.read_u16()?;
    if major != MAJOR {
        return Err(OpaqueDecodeError(format!("unsupported artifact major version {major}")));
    }
    let _compiler_version = String::decode(&mut d)?;

    let id_count = d.read_vbr()?;
    let mut table: Vec<Identifier> = Vec::with_capacity(id_count as usize);
    for _ in 0..id_count {
        let len = u32::from_le_bytes(
            <[u8; 4]>::try_from(d.read_raw_bytes(4)?.as_slice())
                .map_err(|_| OpaqueDecodeError("truncated identifier length".to_string()))?,
        );
        let bytes = d.read_raw_bytes(len as usize)?;
        let text = String::from_utf8(bytes).map_err(|_| OpaqueDecodeError("invalid utf-8 identifier".to_string()))?;
        table.push(Identifier::intern(&text));
    }
    let resolve = |seq: u64, table: &[Identifier]| -> Result<Identifier, OpaqueDecodeError> {
        if seq == 0 {
            Ok(Identifier::EMPTY)
        } else {
            table
                .get((seq - 1) as usize)
                .copied()
                .ok_or_else(|| OpaqueDecodeError(format!("identifier index {seq} out of range")))
        }
    };

    let file_id = d.read_vbr()?;
    let file = resolve(file_id, &table)?;

    let node_count = d.read_vbr()?;
    let mut nodes: IndexVec<NodeIndex, Node> = IndexVec::with_capacity(node_count as usize);
    let mut source_file_provide = None;
    for _ in 0..node_count {
        let kind = kind_from_tag(d.read_u8()?)?;
        let aspect = aspect_from_tag(d.read_u8()?)?;
        let context = resolve(d.read_vbr()?, &table)?;
        let name = resolve(d.read_vbr()?, &table)?;
        let provides = d.read_bool()?;
        let has_fingerprint = d.read_bool()?;
        let fingerprint = if has_fingerprint { Some(d.read_u64()?) } else { None };
        let has_artifact_path = d.read_bool()?;
        let artifact_path =
            if has_artifact_path { Some(resolve(d.read_vbr()?, &table)?) } else { None };

        let key = DependencyKey::new(kind, aspect, context, name);
        let index = nodes.push(Node { key, fingerprint, provides, artifact_path });
        if kind == NodeKind::SourceFileProvide {
            source_file_provide = Some(index);
        }
    }
    let source_file_provide = source_file_provide
        .ok_or_else(|| OpaqueDecodeError("artifact has no SourceFileProvide node".to_string()))?;

    let arc_count = d.read_vbr()?;
    let mut arcs = Vec::with_capacity(arc_count as usize);
    for _ in 0..arc_count {
        let user_pos = d.read_vbr()?;
        let user = nodes
            .indices()
            .nth(user_pos as usize)
            .ok_or_else(|| OpaqueDecodeError(format!("arc user index {user_pos} out of range")))?;
        let kind = kind_from_tag(d.read_u8()?)?;
        let aspect = aspect_from_tag(d.read_u8()?)?;
        let context = resolve(d.read_vbr()?, &table)?;
        let name = resolve(d.read_vbr()?, &table)?;
        let cascades = d.read_bool()?;
        arcs.push(Arc { user, def: DependencyKey::new(kind, aspect, context, name), cascades });
    }

    let external_count = d.read_vbr()?;
    let mut externals = Vec::with_capacity(external_count as usize);
    for _ in 0..external_count {
        let path = resolve(d.read_vbr()?, &table)?;
        let has_hash = d.read_bool()?;
        let observed_interface_hash = if has_hash { Some(d.read_u64()?) } else { None };
        externals.push(ExternalRecord { path, observed_interface_hash });
    }

    Ok(SourceFileDepGraph::from_parts(file, nodes, arcs, source_file_provide, externals))
}

/// Writes `bytes` to `path` via a temporary file in the same directory,
/// atomically renamed into place on success — any other exit leaves no
/// partial file. Transient I/O errors are retried once.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let attempt = || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    };
    attempt()
        .or_else(|_| attempt())
        .map_err(|source| PersistError::Io { path: path.to_path_buf(), source })
}

pub fn read_artifact(path: &Path) -> Result<SourceFileDepGraph, PersistError> {
    let bytes = fs::read(path).map_err(|source| PersistError::Io { path: path.to_path_buf(), source })?;
    decode(&bytes).map_err(|source| PersistError::Decode { path: path.to_path_buf(), source })
}

pub fn write_artifact(path: &Path, graph: &SourceFileDepGraph) -> Result<(), PersistError> {
    write_atomic(path, &encode(graph))
}
