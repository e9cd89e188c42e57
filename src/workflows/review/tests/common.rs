use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::config::{
    ConfigSource, ConfigSourceError, LoanDefaults, ParameterResolver, SegmentParams,
};
use crate::identity::{ActorContext, ActorId, Role, TenantId};
use crate::store::memory::MemoryStore;
use crate::store::RecordStore;
use crate::workflows::lending::domain::{
    Customer, CustomerId, Loan, LoanKind, NewLoan, Segment, SegmentId,
};
use crate::workflows::lending::service::LoanService;
use crate::workflows::review::domain::Alteration;
use crate::workflows::review::service::ReviewService;

pub(super) const TENANT: &str = "tenant-unity";
pub(super) const SEGMENT: &str = "seg-federal";

pub(super) fn tenant() -> TenantId {
    TenantId(TENANT.to_string())
}

pub(super) fn admin() -> ActorContext {
    ActorContext::new(ActorId("admin-1".to_string()), tenant(), Role::Admin)
}

pub(super) fn agent() -> ActorContext {
    ActorContext::new(ActorId("agent-1".to_string()), tenant(), Role::Agent)
}

pub(super) fn other_agent() -> ActorContext {
    ActorContext::new(ActorId("agent-2".to_string()), tenant(), Role::Agent)
}

/// Credit officer assigned to the fixture loans via `credit_officer_id`.
pub(super) fn assigned_officer() -> ActorContext {
    ActorContext::new(
        ActorId("officer-1".to_string()),
        tenant(),
        Role::CreditOfficer,
    )
}

pub(super) fn unassigned_officer() -> ActorContext {
    ActorContext::new(
        ActorId("officer-9".to_string()),
        tenant(),
        Role::CreditOfficer,
    )
}

pub(super) struct StaticConfig {
    defaults: LoanDefaults,
    segments: HashMap<SegmentId, SegmentParams>,
}

impl StaticConfig {
    fn standard() -> Self {
        let mut segments = HashMap::new();
        segments.insert(
            SegmentId(SEGMENT.to_string()),
            SegmentParams {
                min_amount: dec!(10000),
                max_amount: dec!(500000),
                min_tenor: 3,
                max_tenor: 24,
                min_net_pay: dec!(30000),
            },
        );
        Self {
            defaults: LoanDefaults {
                interest_rate: dec!(24),
                upfront_fee_percent: dec!(2),
                transfer_fee: dec!(500),
                max_dti: dec!(45),
            },
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

pub(super) fn resolver() -> Arc<ParameterResolver<StaticConfig>> {
    Arc::new(ParameterResolver::new(Arc::new(StaticConfig::standard())))
}

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
    let now = Utc::now();
    let customer = store
        .insert_customer(Customer {
            id: CustomerId("cust-100".to_string()),
            tenant_id: tenant(),
            full_name: "Amina Okonkwo".to_string(),
            employee_number: "FED-0441".to_string(),
            segment_id: SegmentId(SEGMENT.to_string()),
            birth_date: NaiveDate::from_ymd_opt(1990, 6, 15).expect("valid date"),
            employment_start_date: NaiveDate::from_ymd_opt(2015, 3, 1).expect("valid date"),
            phone: Some("+254700111222".to_string()),
            version: 0,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("seed customer");
    (store, customer)
}

pub(super) fn review_service(
    store: Arc<MemoryStore>,
) -> ReviewService<MemoryStore, StaticConfig> {
    ReviewService::new(store, resolver())
}

pub(super) fn loan_service(store: Arc<MemoryStore>) -> LoanService<MemoryStore, StaticConfig> {
    LoanService::new(store, resolver())
}

/// Originate a fixture loan assigned to officer-1.
pub(super) async fn originate(store: &Arc<MemoryStore>, customer_id: &CustomerId) -> Loan {
    loan_service(Arc::clone(store))
        .create(
            &admin(),
            NewLoan {
                customer_id: customer_id.clone(),
                amount: dec!(100000),
                tenor: 12,
                kind: LoanKind::New,
                net_pay: dec!(150000),
                agent_id: ActorId("agent-1".to_string()),
                credit_officer_id: ActorId("officer-1".to_string()),
            },
        )
        .await
        .expect("originates")
}

pub(super) fn alteration(value: Value) -> Alteration {
    value.as_object().expect("object alteration").clone()
}
