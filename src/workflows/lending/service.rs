//! Loan lifecycle: origination, edits (direct or staged for review), and
//! programmatic closure/disbursement transitions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{
    DerivedMetrics, Loan, LoanId, LoanParams, LoanPatch, LoanStatus, NewLoan,
};
use super::financial;
use super::validator::LoanValidator;
use crate::config::{ConfigSource, LoanParameterSet, ParameterResolver};
use crate::error::{CoreError, ValidationError};
use crate::identity::{ActorContext, TenantId};
use crate::store::{RecordStore, WriteBatch};
use crate::workflows::review::domain::ReviewRequest;

/// Outcome of an edit attempt: applied to the live record, or staged as a
/// pending review request because the actor lacks direct-write privilege.
#[derive(Debug, Clone)]
pub enum EditOutcome<T> {
    Applied(T),
    Queued(ReviewRequest),
}

static LOAN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_loan_id() -> LoanId {
    let id = LOAN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LoanId(format!("loan-{id:06}"))
}

/// Service composing the record store, configuration resolver, validator,
/// and financial engine.
pub struct LoanService<S, C> {
    store: Arc<S>,
    resolver: Arc<ParameterResolver<C>>,
}

impl<S, C> LoanService<S, C>
where
    S: RecordStore,
    C: ConfigSource,
{
    pub fn new(store: Arc<S>, resolver: Arc<ParameterResolver<C>>) -> Self {
        Self { store, resolver }
    }

    /// Originate a loan against a customer record. Seeds the recommended
    /// fields from the requested ones, snapshots the resolved parameters,
    /// derives applicant metrics, and prices the loan.
    pub async fn create(&self, actor: &ActorContext, input: NewLoan) -> Result<Loan, CoreError> {
        let customer = self
            .store
            .customer(&actor.tenant_id, &input.customer_id)
            .await?
            .ok_or(CoreError::NotFound)?;
        let segment = self
            .store
            .segment(&actor.tenant_id, &customer.segment_id)
            .await?
            .ok_or(CoreError::NotFound)?;
        if !segment.active {
            return Err(ValidationError::on_field(
                "segment_id",
                format!("segment {} is not accepting new loans", segment.id),
            )
            .into());
        }

        let params = self
            .resolver
            .resolve(&actor.tenant_id, &customer.segment_id)
            .await?;
        let validator = LoanValidator::new(Arc::clone(&params));
        validator.validate_create(&input)?;

        let now = Utc::now();
        let today = now.date_naive();
        let mut loan = Loan {
            id: next_loan_id(),
            tenant_id: actor.tenant_id.clone(),
            customer_id: customer.id.clone(),
            amount: input.amount,
            tenor: input.tenor,
            recommended_amount: input.amount,
            recommended_tenor: input.tenor,
            kind: input.kind,
            status: LoanStatus::Pending,
            remark: None,
            agent_id: input.agent_id,
            credit_officer_id: input.credit_officer_id,
            params: LoanParams {
                interest_rate: params.interest_rate,
                upfront_fee_percent: params.upfront_fee_percent,
                transfer_fee: params.transfer_fee,
                min_net_pay: params.min_net_pay,
                max_dti: params.max_dti,
                net_pay: input.net_pay,
                age: financial::whole_years_between(customer.birth_date, today),
                service_length: financial::whole_years_between(
                    customer.employment_start_date,
                    today,
                ),
            },
            derived: DerivedMetrics::default(),
            active: false,
            booked: false,
            disbursed: false,
            locked: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        financial::recompute(&mut loan)?;
        enforce_dti(&loan, &params)?;

        let stored = self.store.insert_loan(loan).await?;
        info!(
            loan_id = %stored.id,
            tenant_id = %stored.tenant_id,
            customer_id = %stored.customer_id,
            "loan originated"
        );
        Ok(stored)
    }

    /// Edit a loan. Actors with direct-write privilege get the change applied
    /// and revalidated immediately; everyone else gets a pending review
    /// request staged instead.
    pub async fn edit(
        &self,
        actor: &ActorContext,
        id: &LoanId,
        patch: LoanPatch,
    ) -> Result<EditOutcome<Loan>, CoreError> {
        if !actor.capabilities().edit_records_directly {
            let request = ReviewRequest::for_loan(actor, id.clone(), &patch)?;
            let stored = self.store.insert_review(request).await?;
            debug!(review_id = %stored.id, loan_id = %id, "loan edit staged for review");
            return Ok(EditOutcome::Queued(stored));
        }

        let loan = self
            .store
            .loan(&actor.tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        if loan.locked {
            return Err(CoreError::Conflict(format!("loan {id} is locked for edits")));
        }

        let updated = self.apply_patch(&actor.tenant_id, loan, &patch).await?;
        self.store
            .commit(WriteBatch::new().save_loan(updated))
            .await?;
        let stored = self
            .store
            .loan(&actor.tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        Ok(EditOutcome::Applied(stored))
    }

    /// Validate and apply a patch against a loaded loan, re-running the
    /// financial engine when the engine's inputs move. Shared between direct
    /// edits and review approval; does not persist.
    pub(crate) async fn apply_patch(
        &self,
        tenant_id: &TenantId,
        loan: Loan,
        patch: &LoanPatch,
    ) -> Result<Loan, CoreError> {
        let customer = self
            .store
            .customer(tenant_id, &loan.customer_id)
            .await?
            .ok_or(CoreError::NotFound)?;
        let params = self
            .resolver
            .resolve(tenant_id, &customer.segment_id)
            .await?;
        let validator = LoanValidator::new(Arc::clone(&params));
        apply_loan_patch(loan, patch, &validator, &params)
    }

    /// Programmatic closure of an approved loan by an external
    /// disbursement/closure process.
    pub async fn close(
        &self,
        tenant_id: &TenantId,
        id: &LoanId,
        outcome: LoanStatus,
    ) -> Result<Loan, CoreError> {
        if !matches!(outcome, LoanStatus::Matured | LoanStatus::Liquidated) {
            return Err(ValidationError::on_field(
                "status",
                "closure must set matured or liquidated",
            )
            .into());
        }
        let mut loan = self
            .store
            .loan(tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        if loan.status != LoanStatus::Approved {
            return Err(CoreError::Conflict(format!(
                "loan {id} is {} and cannot be closed",
                loan.status.label()
            )));
        }
        loan.status = outcome;
        loan.active = false;
        loan.updated_at = Utc::now();
        self.store.commit(WriteBatch::new().save_loan(loan)).await?;
        let stored = self
            .store
            .loan(tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        info!(loan_id = %id, status = stored.status.label(), "loan closed");
        Ok(stored)
    }

    /// Bookkeeping performed once an approved loan is paid out.
    pub async fn record_disbursement(
        &self,
        tenant_id: &TenantId,
        id: &LoanId,
    ) -> Result<Loan, CoreError> {
        let mut loan = self
            .store
            .loan(tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        if loan.status != LoanStatus::Approved {
            return Err(CoreError::Conflict(format!(
                "loan {id} is {} and cannot be disbursed",
                loan.status.label()
            )));
        }
        loan.active = true;
        loan.booked = true;
        loan.disbursed = true;
        loan.updated_at = Utc::now();
        self.store.commit(WriteBatch::new().save_loan(loan)).await?;
        let stored = self
            .store
            .loan(tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        Ok(stored)
    }

    /// Toggle the edit lock maintained by downstream processes.
    pub async fn set_locked(
        &self,
        tenant_id: &TenantId,
        id: &LoanId,
        locked: bool,
    ) -> Result<Loan, CoreError> {
        let mut loan = self
            .store
            .loan(tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        loan.locked = locked;
        loan.updated_at = Utc::now();
        self.store.commit(WriteBatch::new().save_loan(loan)).await?;
        let stored = self
            .store
            .loan(tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        Ok(stored)
    }
}

/// May a privileged decision move a loan between these statuses?
pub(crate) fn decision_transition_allowed(from: LoanStatus, _to: LoanStatus) -> bool {
    matches!(from, LoanStatus::Pending | LoanStatus::OnHold)
}

/// Validate and apply a patch to a loan. Pure over its inputs; the caller
/// persists the result.
pub(crate) fn apply_loan_patch(
    mut loan: Loan,
    patch: &LoanPatch,
    validator: &LoanValidator,
    params: &LoanParameterSet,
) -> Result<Loan, CoreError> {
    if loan.status.is_closed() {
        return Err(CoreError::Conflict(format!(
            "loan {} is {} and closed to edits",
            loan.id,
            loan.status.label()
        )));
    }

    validator.validate_edit(patch)?;

    if patch.touches_principal() && loan.disbursed {
        return Err(CoreError::Conflict(format!(
            "loan {} is disbursed; principal terms are fixed",
            loan.id
        )));
    }

    if let Some(status) = patch.status {
        if status != loan.status && !decision_transition_allowed(loan.status, status) {
            return Err(CoreError::Conflict(format!(
                "loan {} cannot move from {} to {} by decision",
                loan.id,
                loan.status.label(),
                status.label()
            )));
        }
        loan.status = status;
    }
    if let Some(remark) = patch.remark {
        loan.remark = Some(remark);
    }

    let mut engine_inputs_moved = false;
    if let Some(amount) = patch.amount {
        loan.amount = amount;
        loan.recommended_amount = amount;
        engine_inputs_moved = true;
    }
    if let Some(tenor) = patch.tenor {
        loan.tenor = tenor;
        loan.recommended_tenor = tenor;
        engine_inputs_moved = true;
    }
    if let Some(amount) = patch.recommended_amount {
        loan.recommended_amount = amount;
        engine_inputs_moved = true;
    }
    if let Some(tenor) = patch.recommended_tenor {
        loan.recommended_tenor = tenor;
        engine_inputs_moved = true;
    }
    if let Some(net_pay) = patch.net_pay {
        loan.params.net_pay = net_pay;
        engine_inputs_moved = true;
    }
    if let Some(kind) = patch.kind {
        loan.kind = kind;
    }
    if let Some(agent_id) = &patch.agent_id {
        loan.agent_id = agent_id.clone();
    }
    if let Some(officer_id) = &patch.credit_officer_id {
        loan.credit_officer_id = officer_id.clone();
    }

    if engine_inputs_moved {
        financial::recompute(&mut loan)?;
        enforce_dti(&loan, params)?;
    }

    loan.updated_at = Utc::now();
    Ok(loan)
}

/// The engine computes DTI; the lifecycle judges it.
fn enforce_dti(loan: &Loan, params: &LoanParameterSet) -> Result<(), CoreError> {
    if loan.derived.dti > params.max_dti {
        return Err(ValidationError::on_field(
            "dti",
            format!(
                "debt-to-income {} exceeds the {} limit",
                loan.derived.dti, params.max_dti
            ),
        )
        .into());
    }
    Ok(())
}
