//! configstore - configuration metadata store for a CI/CD platform
//!
//! Ordinary entity traffic is gated by a maintenance-mode coordinator;
//! while the process is quiesced the whole store can be exported as one
//! self-verifying stream and imported into another instance.

pub mod api;
pub mod cli;
pub mod entity;
pub mod export;
pub mod http_server;
pub mod import;
pub mod maintenance;
pub mod observability;
pub mod storage;
pub mod stream;
