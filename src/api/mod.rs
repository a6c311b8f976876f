//! API Layer for configstore
//!
//! [`ApiHandler`] is the service facade shared by the HTTP server and the
//! CLI:
//!
//! - maintenance status / enable / disable
//! - export and import, one at a time per process ([`DumpPermit`])
//! - ordinary entity reads and gated writes

mod errors;
mod handler;

pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use handler::{ApiHandler, DumpPermit};
