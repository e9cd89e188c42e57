//! Business-logic core for a multi-tenant micro-lending platform.
//!
//! The crate originates loans against applicant records, recomputes loan
//! financial metrics from tenant- and segment-specific configuration, and
//! enforces a mandatory review gate before sensitive record mutations take
//! effect. HTTP routing, authentication, file storage, mail, and raw
//! persistence live outside; the core consumes an async record store, a
//! configuration source, and a resolved actor identity.

pub mod config;
pub mod error;
pub mod identity;
pub mod store;
pub mod workflows;

pub use error::{CoreError, ErrorPayload, InvariantViolation, ValidationError};
pub use identity::{ActorContext, ActorId, CapabilitySet, Role, TenantId};
