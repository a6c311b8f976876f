//! Streaming import
//!
//! Frames are applied one at a time in arrival order: decode, validate
//! against the [`ImportCursor`], commit through the accessor. The first
//! failure stops the import. Nothing is rolled back; the committed prefix
//! stays in the store and the operator resets and retries.
//!
//! The store is only touched once the HEADER frame has been accepted. When
//! bound to a [`ModeController`], the mode is checked again before every
//! record, and a run that stops early still moves the sequence counter past
//! whatever it committed.

use std::collections::BTreeMap;
use std::io::Read;

use serde::Serialize;

use crate::entity::{self, commit, Entity, EntityKind};
use crate::maintenance::ModeController;
use crate::observability::{log_event_with_fields, Event};
use crate::storage::StoreAccessor;
use crate::stream::{hex, CancelFlag, Frame, FrameReader, FORMAT_VERSION};

use super::cursor::ImportCursor;
use super::errors::{ImportError, ImportResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Delete existing entity data before importing
    pub reset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub entities: u64,
    /// Hex SHA-256 from the verified END frame
    pub digest: String,
    pub per_kind: BTreeMap<EntityKind, u64>,
    /// Entities deleted by a reset, zero otherwise
    pub removed: u64,
}

pub struct Importer<'a> {
    store: &'a dyn StoreAccessor,
    cancel: CancelFlag,
    cursor: ImportCursor,
    controller: Option<&'a ModeController>,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a dyn StoreAccessor, cancel: CancelFlag) -> Self {
        Self {
            store,
            cancel,
            cursor: ImportCursor::new(),
            controller: None,
        }
    }

    /// Stop with [`ImportError::NotInMaintenance`] as soon as `controller`
    /// leaves maintenance mode.
    pub fn within_maintenance(mut self, controller: &'a ModeController) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Records committed so far, also meaningful after a failed run
    pub fn committed(&self) -> u64 {
        self.cursor.committed()
    }

    pub fn run<R: Read>(&mut self, source: R, options: ImportOptions) -> ImportResult<ImportSummary> {
        let outcome = self.replay(source, options);
        if outcome.is_err() {
            self.keep_seq_ahead();
        }
        outcome
    }

    fn replay<R: Read>(&mut self, source: R, options: ImportOptions) -> ImportResult<ImportSummary> {
        let mut reader = FrameReader::new(source);

        match reader.read_frame().map_err(|e| ImportError::from_frame(e, 0))? {
            Some(Frame::Header { version }) if version == FORMAT_VERSION => {}
            Some(Frame::Header { version }) => {
                return Err(malformed(0, 0, format!("unsupported format version {}", version)))
            }
            Some(other) => {
                return Err(malformed(0, 0, format!("expected HEADER, found {}", other.name())))
            }
            None => {
                return Err(ImportError::TruncatedStream {
                    position: 0,
                    reason: "empty input".to_string(),
                })
            }
        }

        self.ensure_maintenance()?;
        let removed = self.prepare(options)?;

        let mut position = 0u64;
        let digest = loop {
            position += 1;
            if self.cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }

            let offset = reader.offset();
            let frame = reader
                .read_frame()
                .map_err(|e| ImportError::from_frame(e, position))?;

            match frame {
                Some(Frame::Entity { tag, payload }) => {
                    self.ensure_maintenance()?;
                    self.apply(position, offset, &tag, &payload)?;
                }
                Some(Frame::End {
                    entity_count,
                    digest,
                }) => {
                    if entity_count != self.cursor.committed() {
                        return Err(malformed(
                            position,
                            offset,
                            format!(
                                "end frame counts {} entities, stream carried {}",
                                entity_count,
                                self.cursor.committed()
                            ),
                        ));
                    }
                    if digest != reader.digest() {
                        return Err(malformed(position, offset, "stream digest mismatch".to_string()));
                    }
                    reader
                        .expect_eof()
                        .map_err(|e| ImportError::from_frame(e, position + 1))?;
                    break digest;
                }
                Some(Frame::Header { .. }) => {
                    return Err(malformed(position, offset, "unexpected second HEADER".to_string()));
                }
                None => {
                    return Err(ImportError::TruncatedStream {
                        position,
                        reason: "input ended before END frame".to_string(),
                    });
                }
            }
        };

        if let Some(max_seq) = self.cursor.max_seq() {
            entity::advance_seq_past(self.store, max_seq)?;
        }

        Ok(ImportSummary {
            entities: self.cursor.committed(),
            digest: hex(&digest),
            per_kind: self.cursor.per_kind().clone(),
            removed,
        })
    }

    fn ensure_maintenance(&self) -> ImportResult<()> {
        match self.controller.map(ModeController::mode) {
            Some(mode) if !mode.is_maintenance() => Err(ImportError::NotInMaintenance { mode }),
            _ => Ok(()),
        }
    }

    /// Records committed before a failure must not collide with later creates.
    fn keep_seq_ahead(&self) {
        if let Some(max_seq) = self.cursor.max_seq() {
            if let Err(e) = entity::advance_seq_past(self.store, max_seq) {
                log_event_with_fields(
                    Event::ImportFailed,
                    &[("stage", "advance_seq"), ("reason", &e.to_string())],
                );
            }
        }
    }

    fn prepare(&self, options: ImportOptions) -> ImportResult<u64> {
        if options.reset {
            let removed = entity::reset(self.store)?;
            log_event_with_fields(Event::StoreReset, &[("removed", &removed.to_string())]);
            return Ok(removed);
        }
        if !entity::is_empty(self.store)? {
            return Err(ImportError::StoreNotEmpty);
        }
        Ok(0)
    }

    fn apply(&mut self, position: u64, offset: u64, tag: &str, payload: &[u8]) -> ImportResult<()> {
        let kind = EntityKind::from_tag(tag)
            .ok_or_else(|| malformed(position, offset, format!("unknown kind tag '{}'", tag)))?;
        let entity = Entity::decode(payload)
            .map_err(|e| malformed(position, offset, format!("bad payload: {}", e)))?;
        if entity.kind != kind {
            return Err(malformed(
                position,
                offset,
                format!("frame tagged {} carries a {}", kind, entity.kind),
            ));
        }
        self.cursor
            .check(&entity)
            .map_err(|reason| malformed(position, offset, reason))?;

        commit(self.store, &entity)?;
        self.cursor.accept(&entity);
        Ok(())
    }
}

fn malformed(position: u64, offset: u64, reason: String) -> ImportError {
    ImportError::MalformedRecord {
        position,
        offset,
        reason,
    }
}

/// Run a complete import with a fresh [`Importer`]
pub fn import_from<R: Read>(
    store: &dyn StoreAccessor,
    source: R,
    options: ImportOptions,
    cancel: CancelFlag,
) -> ImportResult<ImportSummary> {
    Importer::new(store, cancel).run(source, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{entity_key, next_seq, EntityRef};
    use crate::export::export_to;
    use crate::maintenance::Mode;
    use crate::observability::MetricsRegistry;
    use crate::storage::MemoryStore;
    use std::sync::Arc;
    use crate::stream::StreamWriter;
    use serde_json::json;

    fn entity(kind: EntityKind, id: &str, seq: u64, refs: Vec<EntityRef>) -> Entity {
        Entity {
            kind,
            id: id.to_string(),
            seq,
            refs,
            data: json!({"name": id}),
        }
    }

    fn dump(entities: &[Entity]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = StreamWriter::new(&mut out).unwrap();
        for e in entities {
            writer.write_entity(e.kind.tag(), &e.encode().unwrap()).unwrap();
        }
        writer.finish().unwrap();
        out
    }

    fn run(store: &MemoryStore, bytes: &[u8]) -> ImportResult<ImportSummary> {
        import_from(store, bytes, ImportOptions::default(), CancelFlag::new())
    }

    #[test]
    fn test_import_commits_and_advances_seq() {
        let bytes = dump(&[
            entity(EntityKind::User, "u1", 4, vec![]),
            entity(EntityKind::Organization, "acme", 9, vec![EntityRef::new(EntityKind::User, "u1")]),
        ]);
        let store = MemoryStore::new();
        let summary = run(&store, &bytes).unwrap();

        assert_eq!(summary.entities, 2);
        assert!(store.get(&entity_key(EntityKind::Organization, "acme")).unwrap().is_some());
        assert_eq!(next_seq(&store).unwrap(), 10);
    }

    #[test]
    fn test_dangling_reference_commits_nothing() {
        let bytes = dump(&[entity(
            EntityKind::Organization,
            "acme",
            1,
            vec![EntityRef::new(EntityKind::User, "ghost")],
        )]);
        let store = MemoryStore::new();
        let mut importer = Importer::new(&store, CancelFlag::new());
        let err = importer.run(bytes.as_slice(), ImportOptions::default()).unwrap_err();

        assert!(matches!(err, ImportError::MalformedRecord { position: 1, .. }));
        assert_eq!(importer.committed(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_failure_keeps_committed_prefix() {
        let bytes = dump(&[
            entity(EntityKind::User, "u1", 1, vec![]),
            entity(EntityKind::Organization, "acme", 2, vec![EntityRef::new(EntityKind::User, "u2")]),
        ]);
        let store = MemoryStore::new();
        let mut importer = Importer::new(&store, CancelFlag::new());
        assert!(importer.run(bytes.as_slice(), ImportOptions::default()).is_err());
        assert_eq!(importer.committed(), 1);
        assert!(store.get(&entity_key(EntityKind::User, "u1")).unwrap().is_some());
    }

    #[test]
    fn test_missing_end_is_truncated() {
        let bytes = dump(&[entity(EntityKind::User, "u1", 1, vec![])]);
        let end_len = Frame::End {
            entity_count: 0,
            digest: [0; 32],
        }
        .encode()
        .len();
        let cut = &bytes[..bytes.len() - end_len];

        let err = run(&MemoryStore::new(), cut).unwrap_err();
        assert!(matches!(err, ImportError::TruncatedStream { position: 2, .. }));
        assert_eq!(err.code(), "CS_TRUNCATED_STREAM");
    }

    #[test]
    fn test_empty_input_is_truncated() {
        assert!(matches!(
            run(&MemoryStore::new(), &[]),
            Err(ImportError::TruncatedStream { position: 0, .. })
        ));
    }

    #[test]
    fn test_count_mismatch_is_malformed() {
        let mut out = Vec::new();
        out.extend(Frame::Header { version: FORMAT_VERSION }.encode());
        out.extend(
            Frame::End {
                entity_count: 3,
                digest: [0; 32],
            }
            .encode(),
        );
        assert!(matches!(
            run(&MemoryStore::new(), &out),
            Err(ImportError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_tag_payload_mismatch() {
        let mut out = Vec::new();
        let mut writer = StreamWriter::new(&mut out).unwrap();
        let user = entity(EntityKind::User, "u1", 1, vec![]);
        writer.write_entity("remotesource", &user.encode().unwrap()).unwrap();
        writer.finish().unwrap();

        let err = run(&MemoryStore::new(), &out).unwrap_err();
        assert!(matches!(err, ImportError::MalformedRecord { .. }));
    }

    #[test]
    fn test_populated_store_requires_reset() {
        let source = MemoryStore::new();
        commit(&source, &entity(EntityKind::User, "u1", 1, vec![])).unwrap();
        let mut bytes = Vec::new();
        export_to(&source, &mut bytes, &CancelFlag::new()).unwrap();

        let target = MemoryStore::new();
        commit(&target, &entity(EntityKind::User, "old", 7, vec![])).unwrap();
        target.put("maintenance/requested", b"true").unwrap();

        assert!(matches!(run(&target, &bytes), Err(ImportError::StoreNotEmpty)));

        let summary = import_from(
            &target,
            bytes.as_slice(),
            ImportOptions { reset: true },
            CancelFlag::new(),
        )
        .unwrap();
        assert_eq!(summary.removed, 1);
        assert!(target.get(&entity_key(EntityKind::User, "old")).unwrap().is_none());
        assert!(target.get("maintenance/requested").unwrap().is_some());
    }

    #[test]
    fn test_cancelled_before_first_record() {
        let bytes = dump(&[entity(EntityKind::User, "u1", 1, vec![])]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let store = MemoryStore::new();
        let err = import_from(&store, bytes.as_slice(), ImportOptions::default(), cancel).unwrap_err();
        assert!(matches!(err, ImportError::Cancelled));
        assert!(store.is_empty());
    }

    #[test]
    fn test_bad_header_leaves_store_untouched_on_reset() {
        let store = MemoryStore::new();
        commit(&store, &entity(EntityKind::User, "keep", 1, vec![])).unwrap();

        for input in [&b""[..], &b"not a dump at all"[..]] {
            let err = import_from(&store, input, ImportOptions { reset: true }, CancelFlag::new())
                .unwrap_err();
            assert!(!matches!(err, ImportError::StoreNotEmpty));
            assert!(store.get(&entity_key(EntityKind::User, "keep")).unwrap().is_some());
        }
    }

    /// Leaves maintenance once the first `after` bytes have been handed out.
    struct DisableAfter<'a> {
        inner: &'a [u8],
        after: usize,
        served: usize,
        controller: &'a ModeController,
    }

    impl Read for DisableAfter<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served >= self.after {
                self.controller.reconcile(false);
            }
            let len = buf.len().min(8);
            let n = self.inner.read(&mut buf[..len])?;
            self.served += n;
            Ok(n)
        }
    }

    #[test]
    fn test_leaving_maintenance_stops_import() {
        let entities = [
            entity(EntityKind::User, "u1", 1, vec![]),
            entity(EntityKind::User, "u2", 2, vec![]),
            entity(EntityKind::User, "u3", 3, vec![]),
        ];
        let bytes = dump(&entities);
        let first_record_end = Frame::Header { version: FORMAT_VERSION }.encode().len()
            + Frame::Entity {
                tag: entities[0].kind.tag().to_string(),
                payload: entities[0].encode().unwrap(),
            }
            .encode()
            .len();

        let controller = ModeController::new(Mode::Maintenance, Arc::new(MetricsRegistry::new()));
        let store = MemoryStore::new();
        let source = DisableAfter {
            inner: &bytes,
            after: first_record_end,
            served: 0,
            controller: &controller,
        };

        let mut importer = Importer::new(&store, CancelFlag::new()).within_maintenance(&controller);
        let err = importer.run(source, ImportOptions::default()).unwrap_err();

        assert!(matches!(err, ImportError::NotInMaintenance { mode: Mode::Normal }));
        assert_eq!(importer.committed(), 1);
        assert!(store.get(&entity_key(EntityKind::User, "u3")).unwrap().is_none());
        // A create after the aborted import must not reuse an imported seq
        assert_eq!(next_seq(&store).unwrap(), 2);
    }
}
