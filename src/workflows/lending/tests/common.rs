use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;

use crate::config::{
    ConfigSource, ConfigSourceError, LoanDefaults, LoanParameterSet, ParameterResolver,
    SegmentParams,
};
use crate::identity::{ActorContext, ActorId, Role, TenantId};
use crate::store::memory::MemoryStore;
use crate::store::RecordStore;
use crate::workflows::lending::customer::CustomerService;
use crate::workflows::lending::domain::{
    Customer, CustomerId, DerivedMetrics, Loan, LoanId, LoanKind, LoanParams, LoanStatus, NewLoan,
    Segment, SegmentId,
};
use crate::workflows::lending::service::LoanService;

pub(super) const TENANT: &str = "tenant-unity";
pub(super) const SEGMENT: &str = "seg-federal";
pub(super) const INACTIVE_SEGMENT: &str = "seg-frozen";

pub(super) fn tenant() -> TenantId {
    TenantId(TENANT.to_string())
}

pub(super) fn admin() -> ActorContext {
    ActorContext::new(
        ActorId("admin-1".to_string()),
        tenant(),
        Role::Admin,
    )
}

pub(super) fn agent() -> ActorContext {
    ActorContext::new(ActorId("agent-1".to_string()), tenant(), Role::Agent)
}

/// Configuration source with fixed tenant defaults and per-segment
/// overrides, standing in for the external collaborator.
pub(super) struct StaticConfig {
    defaults: LoanDefaults,
    segments: HashMap<SegmentId, SegmentParams>,
}

impl StaticConfig {
    pub(super) fn standard() -> Self {
        let mut segments = HashMap::new();
        segments.insert(SegmentId(SEGMENT.to_string()), segment_params());
        segments.insert(SegmentId(INACTIVE_SEGMENT.to_string()), segment_params());
        Self {
            defaults: loan_defaults(),
            segments,
        }
    }
}

impl ConfigSource for StaticConfig {
    async fn loan_defaults(
        &self,
        _tenant_id: &TenantId,
    ) -> Result<LoanDefaults, ConfigSourceError> {
        Ok(self.defaults.clone())
    }

    async fn segment_params(
        &self,
        tenant_id: &TenantId,
        segment_id: &SegmentId,
    ) -> Result<SegmentParams, ConfigSourceError> {
        self.segments
            .get(segment_id)
            .cloned()
            .ok_or_else(|| ConfigSourceError::MissingSegment {
                tenant: tenant_id.0.clone(),
                segment: segment_id.0.clone(),
            })
    }
}

pub(super) fn loan_defaults() -> LoanDefaults {
    LoanDefaults {
        interest_rate: dec!(24),
        upfront_fee_percent: dec!(2),
        transfer_fee: dec!(500),
        max_dti: dec!(45),
    }
}

pub(super) fn segment_params() -> SegmentParams {
    SegmentParams {
        min_amount: dec!(10000),
        max_amount: dec!(500000),
        min_tenor: 3,
        max_tenor: 24,
        min_net_pay: dec!(30000),
    }
}

pub(super) fn parameter_set() -> LoanParameterSet {
    LoanParameterSet {
        min_amount: dec!(10000),
        max_amount: dec!(500000),
        min_tenor: 3,
        max_tenor: 24,
        min_net_pay: dec!(30000),
        max_dti: dec!(45),
        interest_rate: dec!(24),
        upfront_fee_percent: dec!(2),
        transfer_fee: dec!(500),
    }
}

pub(super) fn resolver() -> Arc<ParameterResolver<StaticConfig>> {
    Arc::new(ParameterResolver::new(Arc::new(StaticConfig::standard())))
}

pub(super) fn birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 6, 15).expect("valid date")
}

pub(super) fn employment_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 3, 1).expect("valid date")
}

pub(super) fn customer_record(id: &str, employee_number: &str, segment: &str) -> Customer {
    let now = Utc::now();
    Customer {
        id: CustomerId(id.to_string()),
        tenant_id: tenant(),
        full_name: "Amina Okonkwo".to_string(),
        employee_number: employee_number.to_string(),
        segment_id: SegmentId(segment.to_string()),
        birth_date: birth_date(),
        employment_start_date: employment_start_date(),
        phone: Some("+254700111222".to_string()),
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Store seeded with the active and inactive segments plus one customer.
pub(super) async fn seeded_store() -> (Arc<MemoryStore>, Customer) {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_segment(Segment {
            id: SegmentId(SEGMENT.to_string()),
            tenant_id: tenant(),
            code_prefix: "FED".to_string(),
            active: true,
        })
        .await
        .expect("seed segment");
    store
        .insert_segment(Segment {
            id: SegmentId(INACTIVE_SEGMENT.to_string()),
            tenant_id: tenant(),
            code_prefix: "FRZ".to_string(),
            active: false,
        })
        .await
        .expect("seed segment");
    let customer = store
        .insert_customer(customer_record("cust-100", "FED-0441", SEGMENT))
        .await
        .expect("seed customer");
    (store, customer)
}

pub(super) fn loan_service(
    store: Arc<MemoryStore>,
) -> LoanService<MemoryStore, StaticConfig> {
    LoanService::new(store, resolver())
}

pub(super) fn customer_service(store: Arc<MemoryStore>) -> CustomerService<MemoryStore> {
    CustomerService::new(store)
}

pub(super) fn new_loan(customer_id: &CustomerId) -> NewLoan {
    NewLoan {
        customer_id: customer_id.clone(),
        amount: dec!(100000),
        tenor: 12,
        kind: LoanKind::New,
        net_pay: dec!(150000),
        agent_id: ActorId("agent-1".to_string()),
        credit_officer_id: ActorId("officer-1".to_string()),
    }
}

/// Standalone loan for exercising the engine without a store.
pub(super) fn pricing_loan() -> Loan {
    let now = Utc::now();
    Loan {
        id: LoanId("loan-pricing".to_string()),
        tenant_id: tenant(),
        customer_id: CustomerId("cust-100".to_string()),
        amount: dec!(100000),
        tenor: 12,
        recommended_amount: dec!(100000),
        recommended_tenor: 12,
        kind: LoanKind::New,
        status: LoanStatus::Pending,
        remark: None,
        agent_id: ActorId("agent-1".to_string()),
        credit_officer_id: ActorId("officer-1".to_string()),
        params: LoanParams {
            interest_rate: dec!(24),
            upfront_fee_percent: dec!(2),
            transfer_fee: dec!(500),
            min_net_pay: dec!(30000),
            max_dti: dec!(45),
            net_pay: dec!(150000),
            age: 34,
            service_length: 10,
        },
        derived: DerivedMetrics::default(),
        active: false,
        booked: false,
        disbursed: false,
        locked: false,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}
