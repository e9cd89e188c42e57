//! The deferred edit-approval workflow gating mutations to protected
//! records.

pub mod domain;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{Alteration, ReviewId, ReviewRequest, ReviewStatus, ReviewTarget, TargetKind};
pub use service::{
    CustomerSummary, LoanSummary, ReviewDecision, ReviewListing, ReviewService, TargetSnapshot,
};
