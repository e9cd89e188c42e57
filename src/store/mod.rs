//! Record store abstraction consumed by the workflows.
//!
//! Every read and write is a suspension point; implementations are expected
//! to sit in front of real I/O. Reads offer equality and set-membership
//! filtering; writes go through [`RecordStore::commit`], an atomic batch
//! with optimistic version guards. A save carries the version the caller
//! loaded, and the store rejects the whole batch when any guard is stale,
//! which is what turns approval/direct-edit races into clean conflicts.

use std::future::Future;

use crate::identity::{ActorId, TenantId};
use crate::workflows::lending::domain::{
    Customer, CustomerId, Loan, LoanId, LoanStatus, Segment, SegmentId,
};
use crate::workflows::review::domain::{ReviewId, ReviewRequest, ReviewStatus, TargetKind};

pub mod memory;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("{collection} record {id} already exists")]
    DuplicateKey {
        collection: &'static str,
        id: String,
    },
    #[error("stale version for {collection} record {id}")]
    VersionConflict {
        collection: &'static str,
        id: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Equality / set-membership filter over the loan collection.
#[derive(Debug, Clone, Default)]
pub struct LoanFilter {
    pub ids: Option<Vec<LoanId>>,
    pub customer_id: Option<CustomerId>,
    pub statuses: Option<Vec<LoanStatus>>,
    pub credit_officer_id: Option<ActorId>,
}

impl LoanFilter {
    pub fn matches(&self, loan: &Loan) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&loan.id) {
                return false;
            }
        }
        if let Some(customer_id) = &self.customer_id {
            if &loan.customer_id != customer_id {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&loan.status) {
                return false;
            }
        }
        if let Some(officer) = &self.credit_officer_id {
            if &loan.credit_officer_id != officer {
                return false;
            }
        }
        true
    }
}

/// Set-membership filter over the customer collection.
#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub ids: Option<Vec<CustomerId>>,
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        match &self.ids {
            Some(ids) => ids.contains(&customer.id),
            None => true,
        }
    }
}

/// Equality filter over the review-request collection.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub created_by: Option<ActorId>,
    pub target_kind: Option<TargetKind>,
    pub statuses: Option<Vec<ReviewStatus>>,
}

impl ReviewFilter {
    pub fn matches(&self, request: &ReviewRequest) -> bool {
        if let Some(creator) = &self.created_by {
            if &request.created_by != creator {
                return false;
            }
        }
        if let Some(kind) = self.target_kind {
            if request.target.kind() != kind {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&request.status) {
                return false;
            }
        }
        true
    }
}

/// A single write inside an atomic batch. Saves carry the record as loaded;
/// the store compares the embedded `version` against the stored one and
/// bumps it on success.
#[derive(Debug, Clone)]
pub enum Write {
    SaveCustomer(Customer),
    SaveLoan(Loan),
    SaveReview(ReviewRequest),
    DeleteReview {
        tenant_id: TenantId,
        id: ReviewId,
        version: u64,
    },
}

/// Ordered set of writes applied all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_customer(mut self, customer: Customer) -> Self {
        self.writes.push(Write::SaveCustomer(customer));
        self
    }

    pub fn save_loan(mut self, loan: Loan) -> Self {
        self.writes.push(Write::SaveLoan(loan));
        self
    }

    pub fn save_review(mut self, request: ReviewRequest) -> Self {
        self.writes.push(Write::SaveReview(request));
        self
    }

    pub fn delete_review(mut self, tenant_id: TenantId, id: ReviewId, version: u64) -> Self {
        self.writes.push(Write::DeleteReview {
            tenant_id,
            id,
            version,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

/// Transactional record store keyed by tenant and document id.
///
/// Inserts assign version 1. After a committed save the stored version is
/// the loaded version plus one; callers that keep using a record after a
/// commit should re-read it.
pub trait RecordStore: Send + Sync + 'static {
    fn segment(
        &self,
        tenant_id: &TenantId,
        id: &SegmentId,
    ) -> impl Future<Output = StoreResult<Option<Segment>>> + Send;

    fn customer(
        &self,
        tenant_id: &TenantId,
        id: &CustomerId,
    ) -> impl Future<Output = StoreResult<Option<Customer>>> + Send;

    fn customers(
        &self,
        tenant_id: &TenantId,
        filter: CustomerFilter,
    ) -> impl Future<Output = StoreResult<Vec<Customer>>> + Send;

    fn loan(
        &self,
        tenant_id: &TenantId,
        id: &LoanId,
    ) -> impl Future<Output = StoreResult<Option<Loan>>> + Send;

    fn loans(
        &self,
        tenant_id: &TenantId,
        filter: LoanFilter,
    ) -> impl Future<Output = StoreResult<Vec<Loan>>> + Send;

    fn review(
        &self,
        tenant_id: &TenantId,
        id: &ReviewId,
    ) -> impl Future<Output = StoreResult<Option<ReviewRequest>>> + Send;

    fn reviews(
        &self,
        tenant_id: &TenantId,
        filter: ReviewFilter,
    ) -> impl Future<Output = StoreResult<Vec<ReviewRequest>>> + Send;

    fn insert_segment(&self, segment: Segment) -> impl Future<Output = StoreResult<Segment>> + Send;

    fn insert_customer(
        &self,
        customer: Customer,
    ) -> impl Future<Output = StoreResult<Customer>> + Send;

    fn insert_loan(&self, loan: Loan) -> impl Future<Output = StoreResult<Loan>> + Send;

    fn insert_review(
        &self,
        request: ReviewRequest,
    ) -> impl Future<Output = StoreResult<ReviewRequest>> + Send;

    /// Apply every write in the batch atomically, or none of them.
    fn commit(&self, batch: WriteBatch) -> impl Future<Output = StoreResult<()>> + Send;
}
