//! Export Determinism Tests
//!
//! - Same store, same bytes
//! - Kinds in dependency order, creation order within a kind
//! - Export, import into an empty store, export again: identical bytes
//! - A reopened file store exports exactly what it exported before

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use configstore::entity::{Entity, EntityKind, EntityRef, EntityStore, NewEntity};
use configstore::export::export_to;
use configstore::import::{import_from, ImportOptions};
use configstore::maintenance::{bootstrap_controller, MaintenanceFlag};
use configstore::observability::MetricsRegistry;
use configstore::storage::{FileStore, MemoryStore, StoreAccessor};
use configstore::stream::{CancelFlag, Frame, FrameReader};

fn entity_store(store: &Arc<dyn StoreAccessor>) -> EntityStore {
    let flag = MaintenanceFlag::new(Arc::clone(store));
    let controller = bootstrap_controller(&flag, Arc::new(MetricsRegistry::new())).unwrap();
    EntityStore::new(Arc::clone(store), controller)
}

fn create(entities: &EntityStore, kind: EntityKind, id: &str, refs: Vec<EntityRef>) -> Entity {
    entities
        .create(NewEntity {
            kind,
            id: Some(id.to_string()),
            refs,
            data: json!({ "name": id }),
        })
        .unwrap()
}

/// One of every kind, created in an order that is not the export order
fn populate(store: &Arc<dyn StoreAccessor>) {
    let entities = entity_store(store);

    let alice = create(&entities, EntityKind::User, "alice", vec![]);
    let github = create(&entities, EntityKind::RemoteSource, "github", vec![]);
    let acme = create(&entities, EntityKind::Organization, "acme", vec![alice.as_ref()]);
    let platform = create(&entities, EntityKind::ProjectGroup, "platform", vec![acme.as_ref()]);
    let infra = create(
        &entities,
        EntityKind::ProjectGroup,
        "infra",
        vec![platform.as_ref()],
    );
    let bob = create(&entities, EntityKind::User, "bob", vec![]);
    create(
        &entities,
        EntityKind::OrganizationMember,
        "acme-bob",
        vec![acme.as_ref(), bob.as_ref()],
    );
    let account = create(
        &entities,
        EntityKind::LinkedAccount,
        "alice-github",
        vec![alice.as_ref(), github.as_ref()],
    );
    let api = create(
        &entities,
        EntityKind::Project,
        "api",
        vec![infra.as_ref(), github.as_ref(), account.as_ref()],
    );
    create(&entities, EntityKind::Secret, "api-token", vec![api.as_ref()]);
    create(&entities, EntityKind::Variable, "region", vec![infra.as_ref()]);
}

fn export_bytes(store: &dyn StoreAccessor) -> Vec<u8> {
    let mut out = Vec::new();
    export_to(store, &mut out, &CancelFlag::new()).unwrap();
    out
}

fn exported_entities(bytes: &[u8]) -> Vec<Entity> {
    let mut reader = FrameReader::new(bytes);
    let mut entities = Vec::new();
    while let Some(frame) = reader.read_frame().unwrap() {
        if let Frame::Entity { payload, .. } = frame {
            entities.push(Entity::decode(&payload).unwrap());
        }
    }
    entities
}

#[test]
fn test_export_twice_is_byte_identical() {
    let store: Arc<dyn StoreAccessor> = Arc::new(MemoryStore::new());
    populate(&store);

    assert_eq!(export_bytes(store.as_ref()), export_bytes(store.as_ref()));
}

#[test]
fn test_export_orders_kinds_then_creation() {
    let store: Arc<dyn StoreAccessor> = Arc::new(MemoryStore::new());
    populate(&store);

    let entities = exported_entities(&export_bytes(store.as_ref()));
    let order: Vec<(EntityKind, &str)> = entities
        .iter()
        .map(|e| (e.kind, e.id.as_str()))
        .collect();

    assert_eq!(
        order,
        vec![
            (EntityKind::RemoteSource, "github"),
            (EntityKind::User, "alice"),
            (EntityKind::User, "bob"),
            (EntityKind::LinkedAccount, "alice-github"),
            (EntityKind::Organization, "acme"),
            (EntityKind::OrganizationMember, "acme-bob"),
            (EntityKind::ProjectGroup, "platform"),
            (EntityKind::ProjectGroup, "infra"),
            (EntityKind::Project, "api"),
            (EntityKind::Secret, "api-token"),
            (EntityKind::Variable, "region"),
        ]
    );
}

#[test]
fn test_every_reference_points_backwards() {
    let store: Arc<dyn StoreAccessor> = Arc::new(MemoryStore::new());
    populate(&store);

    let entities = exported_entities(&export_bytes(store.as_ref()));
    for (i, entity) in entities.iter().enumerate() {
        for target in &entity.refs {
            assert!(
                entities[..i].iter().any(|e| &e.as_ref() == target),
                "{}/{} references {}/{} which is not earlier in the stream",
                entity.kind,
                entity.id,
                target.kind,
                target.id
            );
        }
    }
}

#[test]
fn test_export_import_export_round_trip() {
    let source: Arc<dyn StoreAccessor> = Arc::new(MemoryStore::new());
    populate(&source);
    let first = export_bytes(source.as_ref());

    let target: Arc<dyn StoreAccessor> = Arc::new(MemoryStore::new());
    let summary = import_from(
        target.as_ref(),
        first.as_slice(),
        ImportOptions::default(),
        CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(summary.entities, 11);
    assert_eq!(summary.per_kind[&EntityKind::User], 2);

    let second = export_bytes(target.as_ref());
    assert_eq!(first, second);
}

#[test]
fn test_imported_store_allocates_fresh_seqs() {
    let source: Arc<dyn StoreAccessor> = Arc::new(MemoryStore::new());
    populate(&source);
    let dump = export_bytes(source.as_ref());

    let target: Arc<dyn StoreAccessor> = Arc::new(MemoryStore::new());
    import_from(
        target.as_ref(),
        dump.as_slice(),
        ImportOptions::default(),
        CancelFlag::new(),
    )
    .unwrap();

    let max_seq = exported_entities(&dump).iter().map(|e| e.seq).max().unwrap();
    let carol = create(&entity_store(&target), EntityKind::User, "carol", vec![]);
    assert!(carol.seq > max_seq);
}

#[test]
fn test_reopened_file_store_exports_same_bytes() {
    let temp_dir = TempDir::new().unwrap();

    let before = {
        let store: Arc<dyn StoreAccessor> = Arc::new(FileStore::open(temp_dir.path()).unwrap());
        populate(&store);
        export_bytes(store.as_ref())
    };

    let store = FileStore::open(temp_dir.path()).unwrap();
    assert_eq!(export_bytes(&store), before);
}

#[test]
fn test_summary_matches_stream() {
    let store: Arc<dyn StoreAccessor> = Arc::new(MemoryStore::new());
    populate(&store);

    let mut out = Vec::new();
    let summary = export_to(store.as_ref(), &mut out, &CancelFlag::new()).unwrap();

    assert_eq!(summary.entities, 11);
    assert_eq!(summary.bytes, out.len() as u64);
    assert_eq!(summary.per_kind[&EntityKind::ProjectGroup], 2);
    assert_eq!(summary.digest.len(), 64);
}
