//! # SkyGate Gateway Runtime
//!
//! Orchestrates the command security pipeline: UDP ingest, cryptographic
//! gate, concurrent detector fan-out, decision, audit, and forwarding to the
//! trusted sink. Exposed as a library so the integration suite can drive the
//! pipeline without sockets.
//!
//! ## Per-datagram flow
//!
//! ```text
//! UDP datagram ──→ CryptoGate::open ──→ per-source ordering lock
//!                        │                        │
//!                   hard failure          ┌───────┼────────┐
//!                        │                ↓       ↓        ↓
//!                      Block         ReplayGuard Rate  Authorization
//!                                         └───────┼────────┘
//!                                                 ↓
//!                                          DecisionEngine
//!                                                 ↓
//!                               Accept/Constrain → forward; else withhold
//!                                                 ↓
//!                                            AuditSink
//! ```

pub mod audit;
pub mod pipeline;
pub mod runtime;

pub use audit::{JsonlAuditSink, TracingAuditSink};
pub use pipeline::{CommandPipeline, PipelineOutcome};
pub use runtime::{GatewayHandle, GatewayRuntime};
