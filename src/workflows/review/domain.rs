use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::identity::{ActorContext, ActorId, TenantId};
use crate::workflows::lending::domain::{CustomerId, CustomerPatch, LoanId, LoanPatch};

/// Identifier wrapper for review requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewId(pub String);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A review request's status is terminal once set outside `Pending`; further
/// changes require a fresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Denied,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Denied => "denied",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }
}

/// The two record kinds the approval gate protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Customer,
    Loan,
}

/// Reference to the record a request proposes to change. A closed enum, so
/// an unsupported target kind is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewTarget {
    Customer(CustomerId),
    Loan(LoanId),
}

impl ReviewTarget {
    pub const fn kind(&self) -> TargetKind {
        match self {
            ReviewTarget::Customer(_) => TargetKind::Customer,
            ReviewTarget::Loan(_) => TargetKind::Loan,
        }
    }
}

/// Partial-field map staged against the target. Stored as submitted and
/// validated against the live record only at approval time.
pub type Alteration = Map<String, Value>;

/// A staged, not-yet-applied mutation awaiting privileged review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: ReviewId,
    pub tenant_id: TenantId,
    pub target: ReviewTarget,
    pub alteration: Alteration,
    pub status: ReviewStatus,
    /// Reviewer's note, required on a terminal decision.
    pub remark: Option<String>,
    pub created_by: ActorId,
    pub modified_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

static REVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_review_id() -> ReviewId {
    let id = REVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewId(format!("rev-{id:06}"))
}

impl ReviewRequest {
    /// Stage an alteration for review. The target's existence is deliberately
    /// not checked here; a target missing at approval time is a modeled
    /// outcome of `decide`, not of submission.
    pub fn new(
        actor: &ActorContext,
        target: ReviewTarget,
        alteration: Alteration,
    ) -> Result<Self, ValidationError> {
        if alteration.is_empty() {
            return Err(ValidationError::on_field(
                "alteration",
                "alteration must name at least one field",
            ));
        }
        Ok(Self {
            id: next_review_id(),
            tenant_id: actor.tenant_id.clone(),
            target,
            alteration,
            status: ReviewStatus::Pending,
            remark: None,
            created_by: actor.id.clone(),
            modified_by: None,
            created_at: Utc::now(),
            version: 0,
        })
    }

    /// Stage a typed loan patch.
    pub fn for_loan(
        actor: &ActorContext,
        loan_id: LoanId,
        patch: &LoanPatch,
    ) -> Result<Self, ValidationError> {
        Self::new(actor, ReviewTarget::Loan(loan_id), patch_to_alteration(patch)?)
    }

    /// Stage a typed customer patch.
    pub fn for_customer(
        actor: &ActorContext,
        customer_id: CustomerId,
        patch: &CustomerPatch,
    ) -> Result<Self, ValidationError> {
        Self::new(
            actor,
            ReviewTarget::Customer(customer_id),
            patch_to_alteration(patch)?,
        )
    }
}

fn patch_to_alteration<T: Serialize>(patch: &T) -> Result<Alteration, ValidationError> {
    match serde_json::to_value(patch) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ValidationError::on_field(
            "alteration",
            "alteration must be a field map",
        )),
    }
}
