//! Store key layout for entity data
//!
//! ```text
//! entity/<tag>/<id>            -> entity JSON
//! order/<tag>/<seq, 20 digits> -> id (creation order index)
//! meta/next_seq                -> JSON u64
//! ```
//!
//! Sequence numbers are zero-padded so that lexical key order equals
//! numeric order.

use super::kind::EntityKind;

pub const ENTITY_PREFIX: &str = "entity/";
pub const ORDER_PREFIX: &str = "order/";
pub const NEXT_SEQ_KEY: &str = "meta/next_seq";

pub fn entity_key(kind: EntityKind, id: &str) -> String {
    format!("{}{}/{}", ENTITY_PREFIX, kind.tag(), id)
}

pub fn entity_prefix(kind: EntityKind) -> String {
    format!("{}{}/", ENTITY_PREFIX, kind.tag())
}

pub fn order_key(kind: EntityKind, seq: u64) -> String {
    format!("{}{}/{:020}", ORDER_PREFIX, kind.tag(), seq)
}

pub fn order_prefix(kind: EntityKind) -> String {
    format!("{}{}/", ORDER_PREFIX, kind.tag())
}

/// Sequence number encoded in an order key
pub fn parse_order_key(key: &str, kind: EntityKind) -> Option<u64> {
    key.strip_prefix(&order_prefix(kind))?.parse().ok()
}
