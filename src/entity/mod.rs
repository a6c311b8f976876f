//! Configuration entities
//!
//! Entities are the records a bulk dump carries: remote sources, users,
//! linked accounts, organizations and their members, project groups,
//! projects, secrets and variables. Each entity has a kind, an id, a
//! creation sequence number, typed references to other entities, and an
//! opaque JSON payload.
//!
//! The kind registry fixes a total order in which every reference points to
//! an earlier kind (or to the same kind, created earlier). Export walks the
//! kinds in that order and each kind in creation order, so an import that
//! replays the stream never sees a reference to something it has not yet
//! written.

mod errors;
mod keys;
mod kind;
mod model;
mod store;

pub use errors::{EntityError, EntityResult};
pub use keys::{entity_key, entity_prefix, order_key, order_prefix, ENTITY_PREFIX, NEXT_SEQ_KEY, ORDER_PREFIX};
pub use kind::EntityKind;
pub use model::{validate_id, Entity, EntityRef, MAX_ID_LEN};
pub use store::{
    advance_seq_past, commit, is_empty, load, next_seq, reset, scan_order, EntityStore, NewEntity,
    FIRST_SEQ,
};
