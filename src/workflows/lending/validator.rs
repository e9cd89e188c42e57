//! Configuration-driven loan validation.
//!
//! Validators are built per request from the thresholds resolved for the
//! tenant and segment at hand, so one structural schema enforces different
//! numeric bounds depending on who is asking. Both entry points return a
//! `Result` the caller branches on; nothing here panics or throws.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::domain::{LoanPatch, NewLoan};
use crate::config::{ConfigSource, LoanParameterSet, ParameterResolver};
use crate::error::{CoreError, ValidationError};
use crate::identity::TenantId;
use crate::workflows::lending::domain::SegmentId;

/// Validator carrying the thresholds for one tenant/segment pair.
#[derive(Debug, Clone)]
pub struct LoanValidator {
    params: Arc<LoanParameterSet>,
}

/// Resolve the tenant/segment thresholds and wrap them in a validator.
pub async fn build_loan_validator<C: ConfigSource>(
    resolver: &ParameterResolver<C>,
    tenant_id: &TenantId,
    segment_id: &SegmentId,
) -> Result<LoanValidator, CoreError> {
    let params = resolver.resolve(tenant_id, segment_id).await?;
    Ok(LoanValidator::new(params))
}

impl LoanValidator {
    pub fn new(params: Arc<LoanParameterSet>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LoanParameterSet {
        &self.params
    }

    /// Validate origination inputs.
    pub fn validate_create(&self, input: &NewLoan) -> Result<(), ValidationError> {
        self.check_amount("amount", input.amount)?;
        self.check_tenor("tenor", input.tenor)?;
        self.check_net_pay(input.net_pay)?;
        Ok(())
    }

    /// Validate an edit. Every field is optional; only the present ones are
    /// judged. When `status` is present, `remark` becomes conditionally
    /// required. Terminal-status gating is the lifecycle's job, not ours.
    pub fn validate_edit(&self, patch: &LoanPatch) -> Result<(), ValidationError> {
        if patch.is_empty() {
            return Err(ValidationError::new("no fields to change"));
        }
        if let Some(amount) = patch.amount {
            self.check_amount("amount", amount)?;
        }
        if let Some(amount) = patch.recommended_amount {
            self.check_amount("recommended_amount", amount)?;
        }
        if let Some(tenor) = patch.tenor {
            self.check_tenor("tenor", tenor)?;
        }
        if let Some(tenor) = patch.recommended_tenor {
            self.check_tenor("recommended_tenor", tenor)?;
        }
        if let Some(net_pay) = patch.net_pay {
            self.check_net_pay(net_pay)?;
        }
        if let Some(status) = patch.status {
            if status.requires_remark() && patch.remark.is_none() {
                return Err(ValidationError::on_field(
                    "remark",
                    format!("remark is required when status is {}", status.label()),
                ));
            }
        }
        Ok(())
    }

    fn check_amount(&self, field: &'static str, amount: Decimal) -> Result<(), ValidationError> {
        if amount < self.params.min_amount || amount > self.params.max_amount {
            return Err(ValidationError::on_field(
                field,
                format!(
                    "{field} must be between {} and {}",
                    self.params.min_amount, self.params.max_amount
                ),
            ));
        }
        Ok(())
    }

    fn check_tenor(&self, field: &'static str, tenor: u32) -> Result<(), ValidationError> {
        if tenor == 0 {
            return Err(ValidationError::on_field(field, format!("{field} must be positive")));
        }
        if tenor < self.params.min_tenor || tenor > self.params.max_tenor {
            return Err(ValidationError::on_field(
                field,
                format!(
                    "{field} must be between {} and {} months",
                    self.params.min_tenor, self.params.max_tenor
                ),
            ));
        }
        Ok(())
    }

    fn check_net_pay(&self, net_pay: Decimal) -> Result<(), ValidationError> {
        if net_pay < self.params.min_net_pay {
            return Err(ValidationError::on_field(
                "net_pay",
                format!("net pay must be at least {}", self.params.min_net_pay),
            ));
        }
        Ok(())
    }
}
