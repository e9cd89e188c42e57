use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::identity::{ActorId, TenantId};

/// Identifier wrapper for applicant segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub String);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for customer records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for loans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanId(pub String);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Applicant grouping (typically by employer) carrying the employment
/// identifier prefix rule. Parameter overrides for the segment live in the
/// configuration source, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub tenant_id: TenantId,
    pub code_prefix: String,
    pub active: bool,
}

/// Applicant record. Loans back-reference customers by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub tenant_id: TenantId,
    pub full_name: String,
    /// Must start with the segment's `code_prefix`.
    pub employee_number: String,
    pub segment_id: SegmentId,
    pub birth_date: NaiveDate,
    pub employment_start_date: NaiveDate,
    pub phone: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loan lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Pending,
    Approved,
    Denied,
    OnHold,
    Liquidated,
    Discontinued,
    Matured,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Denied => "denied",
            LoanStatus::OnHold => "on_hold",
            LoanStatus::Liquidated => "liquidated",
            LoanStatus::Discontinued => "discontinued",
            LoanStatus::Matured => "matured",
        }
    }

    /// Statuses outside the edit-approval pathway: no review request may be
    /// applied to a loan in one of these.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            LoanStatus::Matured | LoanStatus::Liquidated | LoanStatus::Discontinued
        )
    }

    /// Statuses closed to any edit; only programmatic lifecycle operations
    /// may still touch the record.
    pub const fn is_closed(self) -> bool {
        matches!(self, LoanStatus::Matured | LoanStatus::Liquidated)
    }

    /// A decision carrying this status must also carry a remark.
    pub const fn requires_remark(self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Denied)
    }
}

/// Product variant of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanKind {
    New,
    TopUp,
    Refinance,
}

/// Fixed enumeration of underwriting remarks. Required alongside an
/// approved or denied status, optional otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanRemark {
    MeetsPolicy,
    InsufficientNetPay,
    ExcessiveDti,
    IncompleteDocumentation,
    EmploymentUnverified,
    RestructureRecommended,
}

/// Snapshot of the configuration resolved at origination plus the applicant
/// metrics derived from the customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanParams {
    pub interest_rate: Decimal,
    pub upfront_fee_percent: Decimal,
    pub transfer_fee: Decimal,
    pub min_net_pay: Decimal,
    pub max_dti: Decimal,
    pub net_pay: Decimal,
    pub age: u32,
    pub service_length: u32,
}

/// Monetary fields owned by the Financial Engine. Never settable by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub upfront_fee: Decimal,
    pub net_value: Decimal,
    pub repayment: Decimal,
    pub total_repayment: Decimal,
    pub dti: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    /// Requested principal and tenor, as captured at intake.
    pub amount: Decimal,
    pub tenor: u32,
    /// Engine inputs. Seeded from `amount`/`tenor` and re-seeded whenever
    /// those change; adjustable on their own by reviewers.
    pub recommended_amount: Decimal,
    pub recommended_tenor: u32,
    pub kind: LoanKind,
    pub status: LoanStatus,
    pub remark: Option<LoanRemark>,
    pub agent_id: ActorId,
    pub credit_officer_id: ActorId,
    pub params: LoanParams,
    pub derived: DerivedMetrics,
    pub active: bool,
    pub booked: bool,
    pub disbursed: bool,
    pub locked: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inputs accepted at loan origination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub tenor: u32,
    pub kind: LoanKind,
    /// Applicant's verified monthly net pay.
    pub net_pay: Decimal,
    pub agent_id: ActorId,
    pub credit_officer_id: ActorId,
}

/// Partial edit over a loan's mutable fields. Every field is optional; the
/// validator and lifecycle judge the ones that are present. Unknown keys in
/// a stored alteration fail deserialization at approval time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoanPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_tenor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<LoanKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LoanStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<LoanRemark>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_pay: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_officer_id: Option<ActorId>,
}

impl LoanPatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.tenor.is_none()
            && self.recommended_amount.is_none()
            && self.recommended_tenor.is_none()
            && self.kind.is_none()
            && self.status.is_none()
            && self.remark.is_none()
            && self.net_pay.is_none()
            && self.agent_id.is_none()
            && self.credit_officer_id.is_none()
    }

    /// Does the patch touch principal terms (amount or tenor, requested or
    /// recommended)?
    pub fn touches_principal(&self) -> bool {
        self.amount.is_some()
            || self.tenor.is_some()
            || self.recommended_amount.is_some()
            || self.recommended_tenor.is_some()
    }
}

/// Partial edit over a customer's mutable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<SegmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.employee_number.is_none()
            && self.segment_id.is_none()
            && self.birth_date.is_none()
            && self.employment_start_date.is_none()
            && self.phone.is_none()
    }
}
