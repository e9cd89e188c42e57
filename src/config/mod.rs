//! Loan parameter configuration: the consumed source interface, the
//! tenant/segment merge, and the resolver cache.
//!
//! Thresholds are not static; the same structural loan schema enforces
//! different numeric bounds per tenant and per segment, resolved at request
//! time. The resolver owns an explicit, size-bounded, short-TTL cache so
//! repeated validations do not re-consult the source, and it never mutates
//! configuration.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identity::TenantId;
use crate::workflows::lending::domain::SegmentId;

/// Tenant-level pricing defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDefaults {
    pub interest_rate: Decimal,
    pub upfront_fee_percent: Decimal,
    pub transfer_fee: Decimal,
    pub max_dti: Decimal,
}

/// Segment-level eligibility thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentParams {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub min_tenor: u32,
    pub max_tenor: u32,
    pub min_net_pay: Decimal,
}

/// Merged, coherence-checked parameter set handed to validators and the
/// origination path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanParameterSet {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub min_tenor: u32,
    pub max_tenor: u32,
    pub min_net_pay: Decimal,
    pub max_dti: Decimal,
    pub interest_rate: Decimal,
    pub upfront_fee_percent: Decimal,
    pub transfer_fee: Decimal,
}

impl LoanParameterSet {
    fn merge(defaults: LoanDefaults, segment: SegmentParams) -> Result<Self, ConfigSourceError> {
        if segment.min_amount > segment.max_amount {
            return Err(ConfigSourceError::Incoherent(format!(
                "min amount {} exceeds max amount {}",
                segment.min_amount, segment.max_amount
            )));
        }
        if segment.min_tenor == 0 || segment.min_tenor > segment.max_tenor {
            return Err(ConfigSourceError::Incoherent(format!(
                "tenor bounds {}..={} are unusable",
                segment.min_tenor, segment.max_tenor
            )));
        }
        if defaults.interest_rate < Decimal::ZERO
            || defaults.upfront_fee_percent < Decimal::ZERO
            || defaults.transfer_fee < Decimal::ZERO
        {
            return Err(ConfigSourceError::Incoherent(
                "pricing rates must be non-negative".to_string(),
            ));
        }
        if defaults.max_dti <= Decimal::ZERO {
            return Err(ConfigSourceError::Incoherent(
                "max DTI must be positive".to_string(),
            ));
        }
        Ok(Self {
            min_amount: segment.min_amount,
            max_amount: segment.max_amount,
            min_tenor: segment.min_tenor,
            max_tenor: segment.max_tenor,
            min_net_pay: segment.min_net_pay,
            max_dti: defaults.max_dti,
            interest_rate: defaults.interest_rate,
            upfront_fee_percent: defaults.upfront_fee_percent,
            transfer_fee: defaults.transfer_fee,
        })
    }
}

/// Failures reported by the external configuration collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigSourceError {
    #[error("no loan defaults configured for tenant {0}")]
    MissingDefaults(String),
    #[error("no parameters configured for segment {segment} of tenant {tenant}")]
    MissingSegment { tenant: String, segment: String },
    #[error("incoherent configuration: {0}")]
    Incoherent(String),
    #[error("configuration source unavailable: {0}")]
    Unavailable(String),
}

/// External source of tenant defaults and per-segment overrides.
pub trait ConfigSource: Send + Sync + 'static {
    fn loan_defaults(
        &self,
        tenant_id: &TenantId,
    ) -> impl Future<Output = Result<LoanDefaults, ConfigSourceError>> + Send;

    fn segment_params(
        &self,
        tenant_id: &TenantId,
        segment_id: &SegmentId,
    ) -> impl Future<Output = Result<SegmentParams, ConfigSourceError>> + Send;
}

const DEFAULT_CACHE_CAPACITY: u64 = 1024;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Resolves and caches merged parameter sets keyed by `(tenant, segment)`.
pub struct ParameterResolver<C> {
    source: Arc<C>,
    cache: Cache<(TenantId, SegmentId), Arc<LoanParameterSet>>,
}

impl<C: ConfigSource> ParameterResolver<C> {
    pub fn new(source: Arc<C>) -> Self {
        Self::with_cache_policy(source, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }

    pub fn with_cache_policy(source: Arc<C>, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            source,
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Resolve the parameter set for a tenant/segment pair, consulting the
    /// source only on a cache miss. Source failures and incoherent data
    /// surface as [`CoreError::Dependency`].
    pub async fn resolve(
        &self,
        tenant_id: &TenantId,
        segment_id: &SegmentId,
    ) -> Result<Arc<LoanParameterSet>, CoreError> {
        let key = (tenant_id.clone(), segment_id.clone());
        let source = Arc::clone(&self.source);
        let tenant = tenant_id.clone();
        let segment = segment_id.clone();
        self.cache
            .try_get_with(key, async move {
                let defaults = source.loan_defaults(&tenant).await?;
                let params = source.segment_params(&tenant, &segment).await?;
                LoanParameterSet::merge(defaults, params).map(Arc::new)
            })
            .await
            .map_err(|err: Arc<ConfigSourceError>| CoreError::Dependency(err.to_string()))
    }

    /// Drop a cached entry, forcing the next resolution to re-consult the
    /// source (used when an operator corrects a misconfiguration).
    pub async fn invalidate(&self, tenant_id: &TenantId, segment_id: &SegmentId) {
        self.cache
            .invalidate(&(tenant_id.clone(), segment_id.clone()))
            .await;
    }
}
