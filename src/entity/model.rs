//! Entity record and reference types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kind::EntityKind;

/// Longest accepted entity identifier, in bytes
pub const MAX_ID_LEN: usize = 256;

/// Pointer from one entity to another
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// A stored configuration entity.
///
/// `seq` is the store-assigned creation sequence number: unique across all
/// kinds and strictly increasing in creation order. It is the per-kind sort
/// key of the export stream. `data` is the opaque schema payload; its
/// encoding (serde_json, sorted object keys) is canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    pub kind: EntityKind,
    pub id: String,
    pub seq: u64,
    #[serde(default)]
    pub refs: Vec<EntityRef>,
    #[serde(default)]
    pub data: Value,
}

impl Entity {
    pub fn as_ref(&self) -> EntityRef {
        EntityRef::new(self.kind, self.id.clone())
    }

    /// Whether `target` points back at this entity
    pub fn is_self_reference(&self, target: &EntityRef) -> bool {
        target.kind == self.kind && target.id == self.id
    }

    /// Structural checks that need no store access.
    pub fn validate_shape(&self) -> Result<(), String> {
        validate_id(&self.id)?;

        for (i, target) in self.refs.iter().enumerate() {
            if !self.kind.may_reference(target.kind) {
                return Err(format!(
                    "{} may not reference {} (ref {})",
                    self.kind, target.kind, i
                ));
            }
            validate_id(&target.id).map_err(|e| format!("ref {}: {}", i, e))?;
            if self.refs[..i].contains(target) {
                return Err(format!("duplicate reference to {}/{}", target.kind, target.id));
            }
        }

        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Identifiers are non-empty, bounded, and never contain `/` or control
/// characters (they are embedded in store keys).
pub fn validate_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("empty id".to_string());
    }
    if id.len() > MAX_ID_LEN {
        return Err(format!("id longer than {} bytes", MAX_ID_LEN));
    }
    if id.chars().any(|c| c == '/' || c.is_control()) {
        return Err(format!("invalid character in id '{}'", id.escape_debug()));
    }
    Ok(())
}
