//! Import Integrity Tests
//!
//! - A stream cut anywhere is reported as truncated, never as success
//! - A flipped byte is a malformed record
//! - Referential violations stop the import; the committed prefix stays
//! - A non-empty store requires an explicit reset

use std::sync::Arc;

use serde_json::json;

use configstore::entity::{self, Entity, EntityKind, EntityRef};
use configstore::export::export_to;
use configstore::import::{import_from, ImportError, ImportOptions, Importer};
use configstore::storage::{MemoryStore, StoreAccessor};
use configstore::stream::{CancelFlag, StreamWriter};

fn entity(kind: EntityKind, id: &str, seq: u64, refs: Vec<EntityRef>) -> Entity {
    Entity {
        kind,
        id: id.to_string(),
        seq,
        refs,
        data: json!({ "name": id }),
    }
}

fn dump(entities: &[Entity]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut writer = StreamWriter::new(&mut out).unwrap();
    for e in entities {
        writer
            .write_entity(e.kind.tag(), &e.encode().unwrap())
            .unwrap();
    }
    writer.finish().unwrap();
    out
}

fn sample() -> Vec<Entity> {
    let alice = entity(EntityKind::User, "alice", 1, vec![]);
    let acme = entity(EntityKind::Organization, "acme", 2, vec![alice.as_ref()]);
    let group = entity(EntityKind::ProjectGroup, "platform", 3, vec![acme.as_ref()]);
    let project = entity(EntityKind::Project, "api", 4, vec![group.as_ref()]);
    let secret = entity(EntityKind::Secret, "token", 5, vec![project.as_ref()]);
    vec![alice, acme, group, project, secret]
}

fn import(store: &dyn StoreAccessor, bytes: &[u8]) -> Result<u64, ImportError> {
    import_from(store, bytes, ImportOptions::default(), CancelFlag::new()).map(|s| s.entities)
}

fn stored_count(store: &dyn StoreAccessor) -> usize {
    EntityKind::EXPORT_ORDER
        .into_iter()
        .map(|kind| entity::scan_order(store, kind).count())
        .sum()
}

#[test]
fn test_complete_stream_imports_everything() {
    let store = MemoryStore::new();
    assert_eq!(import(&store, &dump(&sample())).unwrap(), 5);

    let secret = entity::load(&store, EntityKind::Secret, "token")
        .unwrap()
        .unwrap();
    assert_eq!(secret.refs, vec![EntityRef::new(EntityKind::Project, "api")]);
}

#[test]
fn test_every_cut_is_truncated() {
    let bytes = dump(&sample());

    for cut in 0..bytes.len() {
        let store = MemoryStore::new();
        match import(&store, &bytes[..cut]) {
            Err(ImportError::TruncatedStream { .. }) => {}
            other => panic!("cut at {} of {}: expected truncation, got {:?}", cut, bytes.len(), other),
        }
    }
}

#[test]
fn test_flipped_byte_is_malformed() {
    let mut bytes = dump(&sample());
    // Header frame is 17 bytes; the first entity's JSON starts at 28
    bytes[30] ^= 0x55;

    let store = MemoryStore::new();
    let err = import(&store, &bytes).unwrap_err();
    assert!(
        matches!(err, ImportError::MalformedRecord { .. }),
        "expected malformed record, got {:?}",
        err
    );
}

#[test]
fn test_trailing_bytes_after_end_are_malformed() {
    let mut bytes = dump(&sample());
    bytes.extend_from_slice(b"extra");

    let store = MemoryStore::new();
    assert_eq!(import(&store, &bytes).unwrap_err().code(), "CS_MALFORMED_RECORD");
}

#[test]
fn test_dangling_first_record_commits_nothing() {
    let orphan = entity(
        EntityKind::Organization,
        "acme",
        1,
        vec![EntityRef::new(EntityKind::User, "ghost")],
    );

    let store = MemoryStore::new();
    let err = import(&store, &dump(&[orphan])).unwrap_err();

    assert!(matches!(err, ImportError::MalformedRecord { position: 1, .. }));
    assert_eq!(stored_count(&store), 0);
}

#[test]
fn test_forward_reference_stops_with_prefix_committed() {
    let mut entities = sample();
    // Project now points at a group that only appears later in the stream
    entities[3].refs = vec![EntityRef::new(EntityKind::ProjectGroup, "later")];

    let store = MemoryStore::new();
    let mut importer = Importer::new(&store, CancelFlag::new());
    let err = importer
        .run(dump(&entities).as_slice(), ImportOptions::default())
        .unwrap_err();

    assert!(matches!(err, ImportError::MalformedRecord { position: 4, .. }));
    assert_eq!(importer.committed(), 3);
    assert_eq!(stored_count(&store), 3);
    assert!(entity::load(&store, EntityKind::Project, "api").unwrap().is_none());
}

#[test]
fn test_kind_order_violation_is_malformed() {
    let alice = entity(EntityKind::User, "alice", 2, vec![]);
    let github = entity(EntityKind::RemoteSource, "github", 1, vec![]);

    let store = MemoryStore::new();
    let err = import(&store, &dump(&[alice, github])).unwrap_err();
    assert!(matches!(err, ImportError::MalformedRecord { position: 2, .. }));
}

#[test]
fn test_nested_group_self_consistent() {
    let alice = entity(EntityKind::User, "alice", 1, vec![]);
    let parent = entity(EntityKind::ProjectGroup, "parent", 2, vec![alice.as_ref()]);
    let child = entity(EntityKind::ProjectGroup, "child", 3, vec![parent.as_ref()]);
    let looped = entity(
        EntityKind::ProjectGroup,
        "looped",
        4,
        vec![EntityRef::new(EntityKind::ProjectGroup, "looped")],
    );

    let store = MemoryStore::new();
    assert_eq!(import(&store, &dump(&[alice, parent, child, looped])).unwrap(), 4);
}

#[test]
fn test_populated_store_requires_reset() {
    let store: Arc<dyn StoreAccessor> = Arc::new(MemoryStore::new());
    import(store.as_ref(), &dump(&sample())).unwrap();

    let err = import(store.as_ref(), &dump(&sample())).unwrap_err();
    assert!(matches!(err, ImportError::StoreNotEmpty));

    let summary = import_from(
        store.as_ref(),
        dump(&sample()[..2]).as_slice(),
        ImportOptions { reset: true },
        CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(summary.removed, 5);
    assert_eq!(summary.entities, 2);
    assert_eq!(stored_count(store.as_ref()), 2);
}

#[test]
fn test_cancelled_import_stops() {
    let cancel = CancelFlag::new();
    cancel.cancel();

    let store = MemoryStore::new();
    let err = import_from(&store, dump(&sample()).as_slice(), ImportOptions::default(), cancel)
        .unwrap_err();
    assert!(matches!(err, ImportError::Cancelled));
    assert_eq!(stored_count(&store), 0);
}

#[test]
fn test_interrupted_export_cannot_be_imported() {
    let source = MemoryStore::new();
    import(&source, &dump(&sample())).unwrap();

    // Export cancelled midway: everything written so far, but no END frame
    let mut partial = Vec::new();
    let cancel = CancelFlag::new();
    cancel.cancel();
    assert!(export_to(&source, &mut partial, &cancel).is_err());

    let target = MemoryStore::new();
    let err = import(&target, &partial).unwrap_err();
    assert_eq!(err.code(), "CS_TRUNCATED_STREAM");
}
