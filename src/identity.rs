//! Acting-user context and capability-based role dispatch.
//!
//! Identity is resolved by an external authentication layer; the core only
//! consumes it. Workflow logic branches on [`CapabilitySet`] flags, never on
//! role literals, so adding a role is a one-line change here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::workflows::lending::domain::LoanId;

/// Identifier wrapper for a lender organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for an acting user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of roles recognized by the workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Agent,
    CreditOfficer,
    Supervisor,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::CreditOfficer => "credit_officer",
            Role::Supervisor => "supervisor",
            Role::Admin => "admin",
        }
    }

    /// Capability tags granted to the role.
    pub const fn capabilities(self) -> CapabilitySet {
        match self {
            Role::Agent => CapabilitySet {
                decide_reviews: false,
                edit_records_directly: false,
                view_all_reviews: false,
                scoped_to_assigned_loans: false,
                remove_any_pending_review: false,
            },
            Role::CreditOfficer => CapabilitySet {
                decide_reviews: true,
                edit_records_directly: false,
                view_all_reviews: false,
                scoped_to_assigned_loans: true,
                remove_any_pending_review: false,
            },
            Role::Supervisor | Role::Admin => CapabilitySet {
                decide_reviews: true,
                edit_records_directly: true,
                view_all_reviews: true,
                scoped_to_assigned_loans: false,
                remove_any_pending_review: true,
            },
        }
    }
}

/// Capability tags the workflows dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    /// May set a terminal status on a review request.
    pub decide_reviews: bool,
    /// Mutations to protected records apply immediately instead of queueing
    /// a review.
    pub edit_records_directly: bool,
    /// Sees every review request in the tenant.
    pub view_all_reviews: bool,
    /// Visibility limited to loan-typed requests on loans assigned to the
    /// actor.
    pub scoped_to_assigned_loans: bool,
    /// May withdraw pending requests created by anyone.
    pub remove_any_pending_review: bool,
}

/// Acting-user context attached to every core operation.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub id: ActorId,
    pub tenant_id: TenantId,
    pub role: Role,
    /// Loans explicitly assigned by the identity layer, on top of the
    /// `credit_officer_id` back-reference carried by each loan.
    pub assigned_loan_ids: Vec<LoanId>,
}

impl ActorContext {
    pub fn new(id: ActorId, tenant_id: TenantId, role: Role) -> Self {
        Self {
            id,
            tenant_id,
            role,
            assigned_loan_ids: Vec::new(),
        }
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.role.capabilities()
    }
}
