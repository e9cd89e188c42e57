//! The approval gate: staged mutations, role-scoped retrieval, and
//! atomic apply-and-revalidate on approval.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::domain::{
    Alteration, ReviewId, ReviewRequest, ReviewStatus, ReviewTarget, TargetKind,
};
use crate::config::{ConfigSource, ParameterResolver};
use crate::error::{CoreError, ValidationError};
use crate::identity::{ActorContext, ActorId, CapabilitySet};
use crate::store::{CustomerFilter, LoanFilter, RecordStore, ReviewFilter, WriteBatch};
use crate::workflows::lending::customer::CustomerService;
use crate::workflows::lending::domain::{
    Customer, CustomerId, CustomerPatch, Loan, LoanId, LoanPatch, LoanStatus, SegmentId,
};
use crate::workflows::lending::service::LoanService;

const DECISION_REMARK_MIN: usize = 5;
const DECISION_REMARK_MAX: usize = 250;

/// Decision or content-update payload for [`ReviewService::decide`].
#[derive(Debug, Clone, Default)]
pub struct ReviewDecision {
    pub status: Option<ReviewStatus>,
    pub remark: Option<String>,
    pub alteration: Option<Alteration>,
}

/// Denormalized view of a loan attached to a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanSummary {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub status: LoanStatus,
    pub credit_officer_id: ActorId,
}

impl From<&Loan> for LoanSummary {
    fn from(loan: &Loan) -> Self {
        Self {
            id: loan.id.clone(),
            customer_id: loan.customer_id.clone(),
            amount: loan.amount,
            status: loan.status,
            credit_officer_id: loan.credit_officer_id.clone(),
        }
    }
}

/// Denormalized view of a customer attached to a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub full_name: String,
    pub segment_id: SegmentId,
}

impl From<&Customer> for CustomerSummary {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.clone(),
            full_name: customer.full_name.clone(),
            segment_id: customer.segment_id.clone(),
        }
    }
}

/// Current state of the request's target, when it still exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TargetSnapshot {
    Loan(Option<LoanSummary>),
    Customer(Option<CustomerSummary>),
}

/// A request joined with its target's live state for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewListing {
    pub request: ReviewRequest,
    pub target: TargetSnapshot,
}

/// The review workflow over a record store, composing the loan and customer
/// services for apply-and-revalidate on approval.
pub struct ReviewService<S, C> {
    store: Arc<S>,
    loans: LoanService<S, C>,
    customers: CustomerService<S>,
}

impl<S, C> ReviewService<S, C>
where
    S: RecordStore,
    C: ConfigSource,
{
    pub fn new(store: Arc<S>, resolver: Arc<ParameterResolver<C>>) -> Self {
        Self {
            loans: LoanService::new(Arc::clone(&store), resolver),
            customers: CustomerService::new(Arc::clone(&store)),
            store,
        }
    }

    /// Stage an alteration against a customer or loan. The target's
    /// existence is checked at decision time, not here.
    pub async fn submit(
        &self,
        actor: &ActorContext,
        target: ReviewTarget,
        alteration: Alteration,
    ) -> Result<ReviewRequest, CoreError> {
        let request = ReviewRequest::new(actor, target, alteration)?;
        let stored = self.store.insert_review(request).await?;
        info!(
            review_id = %stored.id,
            tenant_id = %stored.tenant_id,
            created_by = %stored.created_by,
            "review request submitted"
        );
        Ok(stored)
    }

    /// List the requests visible to the actor, joined with target state and
    /// sorted descending by creation time. The customer-typed and loan-typed
    /// sets are fetched and joined separately, then re-sorted globally so
    /// join order cannot leak into the final ordering.
    pub async fn list(&self, actor: &ActorContext) -> Result<Vec<ReviewListing>, CoreError> {
        let caps = actor.capabilities();

        let loan_requests = self
            .store
            .reviews(
                &actor.tenant_id,
                ReviewFilter {
                    target_kind: Some(TargetKind::Loan),
                    ..ReviewFilter::default()
                },
            )
            .await?;
        let customer_requests = self
            .store
            .reviews(
                &actor.tenant_id,
                ReviewFilter {
                    target_kind: Some(TargetKind::Customer),
                    ..ReviewFilter::default()
                },
            )
            .await?;

        let loans = self.join_loans(actor, &loan_requests).await?;
        let customers = self.join_customers(actor, &customer_requests).await?;

        let mut listings = Vec::new();
        for request in loan_requests {
            let loan = match &request.target {
                ReviewTarget::Loan(loan_id) => loans.get(loan_id),
                ReviewTarget::Customer(_) => None,
            };
            if in_scope(actor, &caps, &request, loan) {
                listings.push(ReviewListing {
                    target: TargetSnapshot::Loan(loan.map(LoanSummary::from)),
                    request,
                });
            }
        }
        for request in customer_requests {
            let customer = match &request.target {
                ReviewTarget::Customer(customer_id) => customers.get(customer_id),
                ReviewTarget::Loan(_) => None,
            };
            if in_scope(actor, &caps, &request, None) {
                listings.push(ReviewListing {
                    target: TargetSnapshot::Customer(customer.map(CustomerSummary::from)),
                    request,
                });
            }
        }

        listings.sort_by(|a, b| {
            b.request
                .created_at
                .cmp(&a.request.created_at)
                .then_with(|| b.request.id.cmp(&a.request.id))
        });
        Ok(listings)
    }

    /// Fetch one visible request. Out-of-scope and missing are deliberately
    /// the same `NotFound` so existence of foreign requests never leaks.
    pub async fn get(&self, actor: &ActorContext, id: &ReviewId) -> Result<ReviewListing, CoreError> {
        let (request, loan, customer) = self.scoped_request(actor, id).await?;
        let target = match request.target {
            ReviewTarget::Loan(_) => TargetSnapshot::Loan(loan.as_ref().map(LoanSummary::from)),
            ReviewTarget::Customer(_) => {
                TargetSnapshot::Customer(customer.as_ref().map(CustomerSummary::from))
            }
        };
        Ok(ReviewListing { request, target })
    }

    /// Decide a pending request, or — for its creator — replace the staged
    /// alteration while it is still pending.
    pub async fn decide(
        &self,
        actor: &ActorContext,
        id: &ReviewId,
        decision: ReviewDecision,
    ) -> Result<ReviewRequest, CoreError> {
        let caps = actor.capabilities();
        let (mut request, target_loan, target_customer) = self.scoped_request(actor, id).await?;

        if request.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "review {} is already {}",
                request.id,
                request.status.label()
            )));
        }

        let status = match decision.status {
            None => return self.amend_content(actor, request, decision).await,
            Some(ReviewStatus::Pending) => {
                return Err(ValidationError::on_field(
                    "status",
                    "a decision cannot reset a request to pending",
                )
                .into());
            }
            Some(status) => status,
        };

        if !decision_in_scope(actor, &caps, &request, target_loan.as_ref()) {
            return Err(ValidationError::on_field(
                "status",
                "actor is not permitted to decide this request",
            )
            .into());
        }

        let remark = validate_decision_remark(decision.remark.as_deref())?;
        request.status = status;
        request.remark = Some(remark);
        request.modified_by = Some(actor.id.clone());

        match status {
            ReviewStatus::Denied => {
                self.store
                    .commit(WriteBatch::new().save_review(request))
                    .await?;
            }
            ReviewStatus::Approved => {
                self.apply_approval(actor, &request, target_loan, target_customer)
                    .await?;
            }
            ReviewStatus::Pending => unreachable!("rejected above"),
        }

        let stored = self
            .store
            .review(&actor.tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        info!(
            review_id = %stored.id,
            status = stored.status.label(),
            decided_by = %actor.id,
            "review request decided"
        );
        Ok(stored)
    }

    /// Withdraw a pending request. Allowed for the creator or an elevated
    /// role; decided requests are kept for the audit trail.
    pub async fn remove(&self, actor: &ActorContext, id: &ReviewId) -> Result<(), CoreError> {
        let caps = actor.capabilities();
        let (request, _, _) = self.scoped_request(actor, id).await?;

        if request.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "review {} is {} and kept for audit",
                request.id,
                request.status.label()
            )));
        }
        if request.created_by != actor.id && !caps.remove_any_pending_review {
            return Err(CoreError::Conflict(
                "only the creator or an elevated role may withdraw a pending request".to_string(),
            ));
        }

        self.store
            .commit(WriteBatch::new().delete_review(
                request.tenant_id,
                request.id,
                request.version,
            ))
            .await?;
        Ok(())
    }

    /// Creator-only replacement of the staged alteration while pending.
    async fn amend_content(
        &self,
        actor: &ActorContext,
        mut request: ReviewRequest,
        decision: ReviewDecision,
    ) -> Result<ReviewRequest, CoreError> {
        if request.created_by != actor.id {
            return Err(CoreError::Conflict(
                "only the creator may amend a pending request".to_string(),
            ));
        }
        if decision.remark.is_some() {
            return Err(ValidationError::on_field(
                "remark",
                "a remark accompanies a decision, not a content update",
            )
            .into());
        }
        let alteration = decision
            .alteration
            .ok_or_else(|| ValidationError::new("no fields to change"))?;
        if alteration.is_empty() {
            return Err(ValidationError::on_field(
                "alteration",
                "alteration must name at least one field",
            )
            .into());
        }

        request.alteration = alteration;
        request.modified_by = Some(actor.id.clone());
        let id = request.id.clone();
        self.store
            .commit(WriteBatch::new().save_review(request))
            .await?;
        self.store
            .review(&actor.tenant_id, &id)
            .await?
            .ok_or(CoreError::NotFound)
    }

    /// Load → apply → revalidate → persist target and request in one atomic
    /// batch. Any failure leaves the request pending and the target
    /// untouched.
    async fn apply_approval(
        &self,
        actor: &ActorContext,
        request: &ReviewRequest,
        target_loan: Option<Loan>,
        target_customer: Option<Customer>,
    ) -> Result<(), CoreError> {
        match &request.target {
            ReviewTarget::Loan(_) => {
                let loan = target_loan.ok_or(CoreError::NotFound)?;
                if loan.status.is_terminal() {
                    return Err(CoreError::Conflict(format!(
                        "loan {} is {} and outside the review pathway",
                        loan.id,
                        loan.status.label()
                    )));
                }
                let patch: LoanPatch = parse_alteration(&request.alteration)?;
                let updated = self
                    .loans
                    .apply_patch(&actor.tenant_id, loan, &patch)
                    .await?;
                self.store
                    .commit(
                        WriteBatch::new()
                            .save_loan(updated)
                            .save_review(request.clone()),
                    )
                    .await?;
            }
            ReviewTarget::Customer(_) => {
                let customer = target_customer.ok_or(CoreError::NotFound)?;
                let patch: CustomerPatch = parse_alteration(&request.alteration)?;
                let (updated, touched_loans) = self
                    .customers
                    .apply_patch(&actor.tenant_id, customer, &patch)
                    .await?;
                let mut batch = WriteBatch::new().save_customer(updated);
                for loan in touched_loans {
                    batch = batch.save_loan(loan);
                }
                self.store
                    .commit(batch.save_review(request.clone()))
                    .await?;
            }
        }
        Ok(())
    }

    async fn scoped_request(
        &self,
        actor: &ActorContext,
        id: &ReviewId,
    ) -> Result<(ReviewRequest, Option<Loan>, Option<Customer>), CoreError> {
        let caps = actor.capabilities();
        let request = self
            .store
            .review(&actor.tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;

        let (loan, customer) = match &request.target {
            ReviewTarget::Loan(loan_id) => {
                (self.store.loan(&actor.tenant_id, loan_id).await?, None)
            }
            ReviewTarget::Customer(customer_id) => (
                None,
                self.store.customer(&actor.tenant_id, customer_id).await?,
            ),
        };

        if !in_scope(actor, &caps, &request, loan.as_ref()) {
            return Err(CoreError::NotFound);
        }
        Ok((request, loan, customer))
    }

    async fn join_loans(
        &self,
        actor: &ActorContext,
        requests: &[ReviewRequest],
    ) -> Result<HashMap<LoanId, Loan>, CoreError> {
        let ids: Vec<LoanId> = requests
            .iter()
            .filter_map(|request| match &request.target {
                ReviewTarget::Loan(loan_id) => Some(loan_id.clone()),
                ReviewTarget::Customer(_) => None,
            })
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let loans = self
            .store
            .loans(
                &actor.tenant_id,
                LoanFilter {
                    ids: Some(ids),
                    ..LoanFilter::default()
                },
            )
            .await?;
        Ok(loans.into_iter().map(|loan| (loan.id.clone(), loan)).collect())
    }

    async fn join_customers(
        &self,
        actor: &ActorContext,
        requests: &[ReviewRequest],
    ) -> Result<HashMap<CustomerId, Customer>, CoreError> {
        let ids: Vec<CustomerId> = requests
            .iter()
            .filter_map(|request| match &request.target {
                ReviewTarget::Customer(customer_id) => Some(customer_id.clone()),
                ReviewTarget::Loan(_) => None,
            })
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let customers = self
            .store
            .customers(&actor.tenant_id, CustomerFilter { ids: Some(ids) })
            .await?;
        Ok(customers
            .into_iter()
            .map(|customer| (customer.id.clone(), customer))
            .collect())
    }
}

/// Visibility: full-view actors see the tenant; creators see their own;
/// assignment-scoped actors additionally see loan-typed requests on loans
/// assigned to them.
fn in_scope(
    actor: &ActorContext,
    caps: &CapabilitySet,
    request: &ReviewRequest,
    target_loan: Option<&Loan>,
) -> bool {
    if caps.view_all_reviews {
        return true;
    }
    if request.created_by == actor.id {
        return true;
    }
    if caps.scoped_to_assigned_loans {
        if let (ReviewTarget::Loan(loan_id), Some(loan)) = (&request.target, target_loan) {
            return loan.credit_officer_id == actor.id
                || actor.assigned_loan_ids.contains(loan_id);
        }
    }
    false
}

/// Decision privilege: the capability plus, for assignment-scoped actors,
/// an assignment match on the target loan. Being the creator is not enough.
fn decision_in_scope(
    actor: &ActorContext,
    caps: &CapabilitySet,
    request: &ReviewRequest,
    target_loan: Option<&Loan>,
) -> bool {
    if !caps.decide_reviews {
        return false;
    }
    if caps.view_all_reviews {
        return true;
    }
    if caps.scoped_to_assigned_loans {
        if let (ReviewTarget::Loan(loan_id), Some(loan)) = (&request.target, target_loan) {
            return loan.credit_officer_id == actor.id
                || actor.assigned_loan_ids.contains(loan_id);
        }
    }
    false
}

fn validate_decision_remark(remark: Option<&str>) -> Result<String, ValidationError> {
    let remark = remark
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ValidationError::on_field("remark", "a decision requires a remark"))?;
    let length = remark.chars().count();
    if length < DECISION_REMARK_MIN || length > DECISION_REMARK_MAX {
        return Err(ValidationError::on_field(
            "remark",
            format!(
                "remark must be between {DECISION_REMARK_MIN} and {DECISION_REMARK_MAX} characters"
            ),
        ));
    }
    Ok(remark.to_string())
}

/// Deserialize the stored alteration into the target's typed patch. A key or
/// value that does not fit the target schema fails here, at approval time,
/// with the offending field in the message.
fn parse_alteration<T: DeserializeOwned>(alteration: &Alteration) -> Result<T, CoreError> {
    serde_json::from_value(Value::Object(alteration.clone())).map_err(|err| {
        ValidationError::on_field("alteration", format!("alteration does not apply to the target: {err}"))
            .into()
    })
}
