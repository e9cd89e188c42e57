//! In-memory [`RecordStore`] used by tests and embedders.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{
    CustomerFilter, LoanFilter, RecordStore, ReviewFilter, StoreError, StoreResult, Write,
    WriteBatch,
};
use crate::identity::TenantId;
use crate::workflows::lending::domain::{Customer, CustomerId, Loan, LoanId, Segment, SegmentId};
use crate::workflows::review::domain::{ReviewId, ReviewRequest};

#[derive(Default)]
struct Shelves {
    segments: HashMap<(TenantId, SegmentId), Segment>,
    customers: HashMap<(TenantId, CustomerId), Customer>,
    loans: HashMap<(TenantId, LoanId), Loan>,
    reviews: HashMap<(TenantId, ReviewId), ReviewRequest>,
}

/// Mutex-guarded collections; a commit holds the lock for its whole batch,
/// which is what makes the batch atomic here.
#[derive(Default)]
pub struct MemoryStore {
    shelves: Mutex<Shelves>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Shelves>> {
        self.shelves
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

fn guard_version(stored: Option<u64>, incoming: u64, collection: &'static str, id: String) -> StoreResult<()> {
    match stored {
        None => Err(StoreError::NotFound),
        Some(version) if version != incoming => Err(StoreError::VersionConflict { collection, id }),
        Some(_) => Ok(()),
    }
}

impl RecordStore for MemoryStore {
    async fn segment(&self, tenant_id: &TenantId, id: &SegmentId) -> StoreResult<Option<Segment>> {
        let shelves = self.lock()?;
        Ok(shelves
            .segments
            .get(&(tenant_id.clone(), id.clone()))
            .cloned())
    }

    async fn customer(
        &self,
        tenant_id: &TenantId,
        id: &CustomerId,
    ) -> StoreResult<Option<Customer>> {
        let shelves = self.lock()?;
        Ok(shelves
            .customers
            .get(&(tenant_id.clone(), id.clone()))
            .cloned())
    }

    async fn customers(
        &self,
        tenant_id: &TenantId,
        filter: CustomerFilter,
    ) -> StoreResult<Vec<Customer>> {
        let shelves = self.lock()?;
        Ok(shelves
            .customers
            .iter()
            .filter(|((tenant, _), customer)| tenant == tenant_id && filter.matches(customer))
            .map(|(_, customer)| customer.clone())
            .collect())
    }

    async fn loan(&self, tenant_id: &TenantId, id: &LoanId) -> StoreResult<Option<Loan>> {
        let shelves = self.lock()?;
        Ok(shelves.loans.get(&(tenant_id.clone(), id.clone())).cloned())
    }

    async fn loans(&self, tenant_id: &TenantId, filter: LoanFilter) -> StoreResult<Vec<Loan>> {
        let shelves = self.lock()?;
        Ok(shelves
            .loans
            .iter()
            .filter(|((tenant, _), loan)| tenant == tenant_id && filter.matches(loan))
            .map(|(_, loan)| loan.clone())
            .collect())
    }

    async fn review(
        &self,
        tenant_id: &TenantId,
        id: &ReviewId,
    ) -> StoreResult<Option<ReviewRequest>> {
        let shelves = self.lock()?;
        Ok(shelves
            .reviews
            .get(&(tenant_id.clone(), id.clone()))
            .cloned())
    }

    async fn reviews(
        &self,
        tenant_id: &TenantId,
        filter: ReviewFilter,
    ) -> StoreResult<Vec<ReviewRequest>> {
        let shelves = self.lock()?;
        Ok(shelves
            .reviews
            .iter()
            .filter(|((tenant, _), request)| tenant == tenant_id && filter.matches(request))
            .map(|(_, request)| request.clone())
            .collect())
    }

    async fn insert_segment(&self, segment: Segment) -> StoreResult<Segment> {
        let mut shelves = self.lock()?;
        let key = (segment.tenant_id.clone(), segment.id.clone());
        if shelves.segments.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                collection: "segments",
                id: segment.id.0,
            });
        }
        shelves.segments.insert(key, segment.clone());
        Ok(segment)
    }

    async fn insert_customer(&self, mut customer: Customer) -> StoreResult<Customer> {
        let mut shelves = self.lock()?;
        let key = (customer.tenant_id.clone(), customer.id.clone());
        if shelves.customers.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                collection: "customers",
                id: customer.id.0,
            });
        }
        customer.version = 1;
        shelves.customers.insert(key, customer.clone());
        Ok(customer)
    }

    async fn insert_loan(&self, mut loan: Loan) -> StoreResult<Loan> {
        let mut shelves = self.lock()?;
        let key = (loan.tenant_id.clone(), loan.id.clone());
        if shelves.loans.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                collection: "loans",
                id: loan.id.0,
            });
        }
        loan.version = 1;
        shelves.loans.insert(key, loan.clone());
        Ok(loan)
    }

    async fn insert_review(&self, mut request: ReviewRequest) -> StoreResult<ReviewRequest> {
        let mut shelves = self.lock()?;
        let key = (request.tenant_id.clone(), request.id.clone());
        if shelves.reviews.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                collection: "reviews",
                id: request.id.0,
            });
        }
        request.version = 1;
        shelves.reviews.insert(key, request.clone());
        Ok(request)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut shelves = self.lock()?;

        // Guard every write before applying any, so a stale version leaves
        // the whole batch unapplied.
        for write in batch.writes() {
            match write {
                Write::SaveCustomer(customer) => guard_version(
                    shelves
                        .customers
                        .get(&(customer.tenant_id.clone(), customer.id.clone()))
                        .map(|stored| stored.version),
                    customer.version,
                    "customers",
                    customer.id.0.clone(),
                )?,
                Write::SaveLoan(loan) => guard_version(
                    shelves
                        .loans
                        .get(&(loan.tenant_id.clone(), loan.id.clone()))
                        .map(|stored| stored.version),
                    loan.version,
                    "loans",
                    loan.id.0.clone(),
                )?,
                Write::SaveReview(request) => guard_version(
                    shelves
                        .reviews
                        .get(&(request.tenant_id.clone(), request.id.clone()))
                        .map(|stored| stored.version),
                    request.version,
                    "reviews",
                    request.id.0.clone(),
                )?,
                Write::DeleteReview {
                    tenant_id,
                    id,
                    version,
                } => guard_version(
                    shelves
                        .reviews
                        .get(&(tenant_id.clone(), id.clone()))
                        .map(|stored| stored.version),
                    *version,
                    "reviews",
                    id.0.clone(),
                )?,
            }
        }

        for write in batch.into_writes() {
            match write {
                Write::SaveCustomer(mut customer) => {
                    customer.version += 1;
                    shelves.customers.insert(
                        (customer.tenant_id.clone(), customer.id.clone()),
                        customer,
                    );
                }
                Write::SaveLoan(mut loan) => {
                    loan.version += 1;
                    shelves
                        .loans
                        .insert((loan.tenant_id.clone(), loan.id.clone()), loan);
                }
                Write::SaveReview(mut request) => {
                    request.version += 1;
                    shelves
                        .reviews
                        .insert((request.tenant_id.clone(), request.id.clone()), request);
                }
                Write::DeleteReview { tenant_id, id, .. } => {
                    shelves.reviews.remove(&(tenant_id, id));
                }
            }
        }

        Ok(())
    }
}
