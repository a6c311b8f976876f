//! Entity persistence on top of the store accessor
//!
//! [`EntityStore`] is the ordinary write path: every mutation first obtains
//! a [`WritePermit`](crate::maintenance::WritePermit) and holds it until the
//! last key is written. The free functions below are the privileged
//! primitives shared with export and import, which run only while the
//! process is quiescent and bypass the gate.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use crate::maintenance::ModeController;
use crate::storage::{ScanCursor, StoreAccessor, StoreError, StoreResult};

use super::errors::{EntityError, EntityResult};
use super::keys::{entity_key, order_key, order_prefix, parse_order_key, ENTITY_PREFIX, NEXT_SEQ_KEY, ORDER_PREFIX};
use super::kind::EntityKind;
use super::model::{Entity, EntityRef};

/// First sequence number handed out by an empty store
pub const FIRST_SEQ: u64 = 1;

const RESET_BATCH: usize = 128;

/// Read and decode one entity, checking that it matches its key.
pub fn load(store: &dyn StoreAccessor, kind: EntityKind, id: &str) -> EntityResult<Option<Entity>> {
    let key = entity_key(kind, id);
    let Some(bytes) = store.get(&key)? else {
        return Ok(None);
    };

    let entity = Entity::decode(&bytes).map_err(|e| EntityError::Corrupt {
        key: key.clone(),
        reason: e.to_string(),
    })?;
    if entity.kind != kind || entity.id != id {
        return Err(EntityError::Corrupt {
            key,
            reason: format!("record holds {}/{}", entity.kind, entity.id),
        });
    }
    Ok(Some(entity))
}

/// Write an entity and its order index entry.
///
/// The entity key is written first, so the order index never names a
/// missing entity.
pub fn commit(store: &dyn StoreAccessor, entity: &Entity) -> StoreResult<()> {
    let bytes = entity
        .encode()
        .map_err(|e| StoreError::write(format!("encode entity: {}", e)))?;
    store.put(&entity_key(entity.kind, &entity.id), &bytes)?;
    store.put(&order_key(entity.kind, entity.seq), entity.id.as_bytes())
}

/// Next sequence number to hand out
pub fn next_seq(store: &dyn StoreAccessor) -> StoreResult<u64> {
    match store.get(NEXT_SEQ_KEY)? {
        None => Ok(FIRST_SEQ),
        Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::corruption(format!("invalid sequence counter: {}", e)).with_key(NEXT_SEQ_KEY)
        }),
    }
}

fn store_next_seq(store: &dyn StoreAccessor, seq: u64) -> StoreResult<()> {
    store.put(NEXT_SEQ_KEY, seq.to_string().as_bytes())
}

/// Make sure future sequence numbers are strictly greater than `seq`
pub fn advance_seq_past(store: &dyn StoreAccessor, seq: u64) -> StoreResult<()> {
    let wanted = seq.saturating_add(1);
    if next_seq(store)? < wanted {
        store_next_seq(store, wanted)?;
    }
    Ok(())
}

/// Whether the store holds no entity at all
pub fn is_empty(store: &dyn StoreAccessor) -> StoreResult<bool> {
    Ok(store.scan_batch(ENTITY_PREFIX, None, 1)?.is_empty())
}

/// Delete every entity, the order index and the sequence counter.
///
/// The maintenance flag is outside this keyspace and survives. Returns the
/// number of entities removed.
pub fn reset(store: &dyn StoreAccessor) -> StoreResult<u64> {
    let removed = delete_prefix(store, ENTITY_PREFIX)?;
    delete_prefix(store, ORDER_PREFIX)?;
    store.delete(NEXT_SEQ_KEY)?;
    Ok(removed)
}

fn delete_prefix(store: &dyn StoreAccessor, prefix: &str) -> StoreResult<u64> {
    let mut removed = 0;
    loop {
        let batch = store.scan_batch(prefix, None, RESET_BATCH)?;
        if batch.is_empty() {
            return Ok(removed);
        }
        for (key, _) in batch {
            store.delete(&key)?;
            removed += 1;
        }
    }
}

/// Iterate one kind in creation order, yielding the sequence number and id
/// recorded in the order index.
pub fn scan_order(
    store: &dyn StoreAccessor,
    kind: EntityKind,
) -> impl Iterator<Item = EntityResult<(u64, String)>> + '_ {
    ScanCursor::new(store, order_prefix(kind)).map(move |entry| {
        let (key, value) = entry?;
        let seq = parse_order_key(&key, kind).ok_or_else(|| EntityError::Corrupt {
            key: key.clone(),
            reason: "malformed order key".to_string(),
        })?;
        let id = String::from_utf8(value).map_err(|_| EntityError::Corrupt {
            key,
            reason: "order entry is not utf-8".to_string(),
        })?;
        Ok((seq, id))
    })
}

/// Fields of an entity about to be created
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub kind: EntityKind,
    /// Generated when absent
    pub id: Option<String>,
    pub refs: Vec<EntityRef>,
    pub data: Value,
}

/// Gated ordinary reads and writes of entities
pub struct EntityStore {
    store: Arc<dyn StoreAccessor>,
    controller: Arc<ModeController>,
    write_lock: Mutex<()>,
}

impl EntityStore {
    pub fn new(store: Arc<dyn StoreAccessor>, controller: Arc<ModeController>) -> Self {
        Self {
            store,
            controller,
            write_lock: Mutex::new(()),
        }
    }

    pub fn create(&self, new: NewEntity) -> EntityResult<Entity> {
        let _permit = self.controller.admit()?;
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let store = self.store.as_ref();

        let mut entity = Entity {
            kind: new.kind,
            id: new.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            seq: 0,
            refs: new.refs,
            data: new.data,
        };
        entity.validate_shape().map_err(EntityError::Invalid)?;

        if load(store, entity.kind, &entity.id)?.is_some() {
            return Err(EntityError::AlreadyExists {
                kind: entity.kind,
                id: entity.id,
            });
        }
        for target in &entity.refs {
            if entity.is_self_reference(target) {
                continue;
            }
            if store.get(&entity_key(target.kind, &target.id))?.is_none() {
                return Err(EntityError::DanglingReference {
                    kind: target.kind,
                    id: target.id.clone(),
                });
            }
        }

        entity.seq = next_seq(store)?;
        store_next_seq(store, entity.seq + 1)?;
        commit(store, &entity)?;
        Ok(entity)
    }

    /// Replace the data payload. References and sequence are unchanged.
    pub fn update(&self, kind: EntityKind, id: &str, data: Value) -> EntityResult<Entity> {
        let _permit = self.controller.admit()?;
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let store = self.store.as_ref();

        let mut entity = load(store, kind, id)?.ok_or_else(|| EntityError::NotFound {
            kind,
            id: id.to_string(),
        })?;
        entity.data = data;

        let bytes = entity
            .encode()
            .map_err(|e| EntityError::Invalid(e.to_string()))?;
        store.put(&entity_key(kind, id), &bytes)?;
        Ok(entity)
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> EntityResult<Option<Entity>> {
        load(self.store.as_ref(), kind, id)
    }

    /// All entities of one kind, in creation order
    pub fn list(&self, kind: EntityKind) -> EntityResult<Vec<Entity>> {
        let store = self.store.as_ref();
        let mut entities = Vec::new();
        for entry in scan_order(store, kind) {
            let (_, id) = entry?;
            let entity = load(store, kind, &id)?.ok_or_else(|| EntityError::Corrupt {
                key: entity_key(kind, &id),
                reason: "order index names a missing entity".to_string(),
            })?;
            entities.push(entity);
        }
        Ok(entities)
    }
}
