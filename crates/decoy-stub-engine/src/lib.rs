//! Decoy: mock-response resolution engine.
//!
//! Given a transport-delivered request view, the engine decides which
//! canned response to serve: route-pattern matching with scoring,
//! fixed-precedence preset aggregation across heterogeneous sources
//! (header override, cookies, layered files, persisted rows), loose-shape
//! preset decoding, and prompt-steered example selection backed by a
//! shared state store. The HTTP transport, relational persistence, and
//! spec-document storage stay behind small trait boundaries.

// ===== Resolution pipeline =====
pub mod aggregate;
pub mod engine;
pub mod matcher;
pub mod preset;
pub mod prompt;
pub mod sources;
pub mod spec;

// ===== Boundary types & ambient plumbing =====
pub mod config;
pub mod request;
pub mod state;

pub use config::EngineConfig;
pub use engine::{ResolutionEngine, StubResponse};
pub use request::RequestView;
