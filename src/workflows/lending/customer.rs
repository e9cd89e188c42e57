//! Customer record maintenance and the applicant-metric cascade.
//!
//! A change to `birth_date` or `employment_start_date` must leave every
//! non-terminal loan of the customer carrying fresh `age`/`service_length`
//! metrics. The cascade is computed here and committed in the same atomic
//! batch as the customer write, so a reader never observes the customer and
//! their loans disagreeing.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::domain::{Customer, CustomerId, CustomerPatch, Loan, LoanStatus};
use super::financial;
use super::service::EditOutcome;
use crate::error::{CoreError, ValidationError};
use crate::identity::{ActorContext, TenantId};
use crate::store::{LoanFilter, RecordStore, WriteBatch};
use crate::workflows::review::domain::ReviewRequest;

/// Statuses still reachable by the cascade.
const OPEN_STATUSES: [LoanStatus; 4] = [
    LoanStatus::Pending,
    LoanStatus::Approved,
    LoanStatus::Denied,
    LoanStatus::OnHold,
];

pub struct CustomerService<S> {
    store: Arc<S>,
}

impl<S: RecordStore> CustomerService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Apply a patch to a customer record. Privileged actors mutate the live
    /// record (with the cascade in the same commit); everyone else gets a
    /// pending review request staged instead.
    pub async fn update(
        &self,
        actor: &ActorContext,
        id: &CustomerId,
        patch: CustomerPatch,
    ) -> Result<EditOutcome<Customer>, CoreError> {
        if !actor.capabilities().edit_records_directly {
            let request = ReviewRequest::for_customer(actor, id.clone(), &patch)?;
            let stored = self.store.insert_review(request).await?;
            debug!(review_id = %stored.id, customer_id = %id, "customer edit staged for review");
            return Ok(EditOutcome::Queued(stored));
        }

        let customer = self
            .store
            .customer(&actor.tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        let (updated, touched_loans) = self
            .apply_patch(&actor.tenant_id, customer, &patch)
            .await?;

        let mut batch = WriteBatch::new().save_customer(updated);
        for loan in touched_loans {
            batch = batch.save_loan(loan);
        }
        self.store.commit(batch).await?;

        let stored = self
            .store
            .customer(&actor.tenant_id, id)
            .await?
            .ok_or(CoreError::NotFound)?;
        Ok(EditOutcome::Applied(stored))
    }

    /// Entry point for birth or hire date corrections, exposed by name for
    /// callers that only deal in dates.
    pub async fn correct_dates(
        &self,
        actor: &ActorContext,
        id: &CustomerId,
        birth_date: Option<chrono::NaiveDate>,
        employment_start_date: Option<chrono::NaiveDate>,
    ) -> Result<EditOutcome<Customer>, CoreError> {
        self.update(
            actor,
            id,
            CustomerPatch {
                birth_date,
                employment_start_date,
                ..CustomerPatch::default()
            },
        )
        .await
    }

    /// Validate and apply a patch against a loaded customer, computing the
    /// loan cascade when the dates moved. Shared between direct edits and
    /// review approval; does not persist. Returns the updated customer plus
    /// the loans whose applicant metrics were refreshed.
    pub(crate) async fn apply_patch(
        &self,
        tenant_id: &TenantId,
        mut customer: Customer,
        patch: &CustomerPatch,
    ) -> Result<(Customer, Vec<Loan>), CoreError> {
        if patch.is_empty() {
            return Err(ValidationError::new("no fields to change").into());
        }

        if let Some(full_name) = &patch.full_name {
            customer.full_name = full_name.clone();
        }
        if let Some(phone) = &patch.phone {
            customer.phone = Some(phone.clone());
        }
        if let Some(segment_id) = &patch.segment_id {
            customer.segment_id = segment_id.clone();
        }
        if let Some(employee_number) = &patch.employee_number {
            customer.employee_number = employee_number.clone();
        }

        // Re-validate the prefix invariant against the (possibly changed)
        // segment using the final field values.
        let segment = self
            .store
            .segment(tenant_id, &customer.segment_id)
            .await?
            .ok_or(CoreError::NotFound)?;
        if !segment.active {
            return Err(ValidationError::on_field(
                "segment_id",
                format!("segment {} is inactive", segment.id),
            )
            .into());
        }
        if !customer.employee_number.starts_with(&segment.code_prefix) {
            return Err(ValidationError::on_field(
                "employee_number",
                format!(
                    "employment identifier must start with {}",
                    segment.code_prefix
                ),
            )
            .into());
        }

        let dates_moved = patch
            .birth_date
            .is_some_and(|date| date != customer.birth_date)
            || patch
                .employment_start_date
                .is_some_and(|date| date != customer.employment_start_date);
        if let Some(date) = patch.birth_date {
            customer.birth_date = date;
        }
        if let Some(date) = patch.employment_start_date {
            customer.employment_start_date = date;
        }
        customer.updated_at = Utc::now();

        let touched = if dates_moved {
            self.refresh_open_loans(&customer).await?
        } else {
            Vec::new()
        };

        Ok((customer, touched))
    }

    async fn refresh_open_loans(&self, customer: &Customer) -> Result<Vec<Loan>, CoreError> {
        let mut loans = self
            .store
            .loans(
                &customer.tenant_id,
                LoanFilter {
                    customer_id: Some(customer.id.clone()),
                    statuses: Some(OPEN_STATUSES.to_vec()),
                    ..LoanFilter::default()
                },
            )
            .await?;

        let now = Utc::now();
        let today = now.date_naive();
        for loan in &mut loans {
            financial::refresh_applicant_metrics(
                loan,
                customer.birth_date,
                customer.employment_start_date,
                today,
            );
            loan.updated_at = now;
        }
        debug!(
            customer_id = %customer.id,
            loans = loans.len(),
            "applicant metrics cascaded to open loans"
        );
        Ok(loans)
    }
}
