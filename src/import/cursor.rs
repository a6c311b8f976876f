//! In-stream validation state for an import
//!
//! Tracks what the stream has delivered so far, so ordering and reference
//! checks never need a store lookup: a reference is satisfied only by an
//! earlier record of the same stream.

use std::collections::{BTreeMap, HashSet};

use crate::entity::{Entity, EntityKind, EntityRef};

#[derive(Debug, Default)]
pub struct ImportCursor {
    seen: HashSet<EntityRef>,
    seqs: HashSet<u64>,
    last: Option<(EntityKind, u64)>,
    max_seq: Option<u64>,
    per_kind: BTreeMap<EntityKind, u64>,
    committed: u64,
}

impl ImportCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `entity` against everything accepted so far.
    pub fn check(&self, entity: &Entity) -> Result<(), String> {
        entity.validate_shape()?;

        if let Some((last_kind, last_seq)) = self.last {
            if entity.kind < last_kind {
                return Err(format!("{} record after {} records", entity.kind, last_kind));
            }
            if entity.kind == last_kind && entity.seq <= last_seq {
                return Err(format!(
                    "{} seq {} does not follow seq {}",
                    entity.kind, entity.seq, last_seq
                ));
            }
        }
        if self.seqs.contains(&entity.seq) {
            return Err(format!("duplicate seq {}", entity.seq));
        }
        if self.seen.contains(&entity.as_ref()) {
            return Err(format!("duplicate {} '{}'", entity.kind, entity.id));
        }

        for target in &entity.refs {
            if entity.is_self_reference(target) {
                continue;
            }
            if !self.seen.contains(target) {
                return Err(format!(
                    "reference to {} '{}' not satisfied by an earlier record",
                    target.kind, target.id
                ));
            }
        }

        Ok(())
    }

    /// Record a committed entity
    pub fn accept(&mut self, entity: &Entity) {
        self.seen.insert(entity.as_ref());
        self.seqs.insert(entity.seq);
        self.last = Some((entity.kind, entity.seq));
        self.max_seq = Some(self.max_seq.map_or(entity.seq, |m| m.max(entity.seq)));
        *self.per_kind.entry(entity.kind).or_insert(0) += 1;
        self.committed += 1;
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    pub fn max_seq(&self) -> Option<u64> {
        self.max_seq
    }

    pub fn per_kind(&self) -> &BTreeMap<EntityKind, u64> {
        &self.per_kind
    }
}
