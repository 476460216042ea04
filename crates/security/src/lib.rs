//! Security module for SprintLoop: role-based capability gating and audit
//! logging.
//!
//! Provides:
//! - **Capability gate**: maps caller roles to the permission tokens that
//!   decide which tools are visible and callable
//! - **Audit logging**: structured records of tool dispatches, denials and
//!   aborted runs

pub mod audit;
pub mod capability;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use capability::{CapabilityGate, normalize_role};
