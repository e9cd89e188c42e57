//! Pure recomputation of a loan's derived monetary fields.
//!
//! The engine computes; it never judges eligibility. Callers compare the
//! resulting `dti` against the tenant's `max_dti` themselves. The engine is
//! triggered only when `recommended_amount` or `recommended_tenor` (or the
//! net pay feeding DTI) change, not on every save, so the derived fields
//! double as a stable audit trail of when pricing last moved.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::error;

use super::domain::{DerivedMetrics, Loan};
use crate::error::{CoreError, InvariantViolation};

const HUNDRED: Decimal = dec!(100);
/// All monetary results are fixed to 2 decimal places, rounded half-even.
const MONEY_DP: u32 = 2;

/// Recompute `loan.derived` from the recommended principal, recommended
/// tenor, and pricing parameters.
///
/// Preconditions (`recommended_tenor > 0`, `net_pay > 0`) are enforced by
/// the validator before a patch ever reaches this point; finding them
/// violated here is a flow bug and surfaces as an [`InvariantViolation`]
/// rather than a divide-by-zero trap.
pub fn recompute(loan: &mut Loan) -> Result<(), CoreError> {
    if loan.recommended_tenor == 0 {
        return Err(invariant(loan, "recommended tenor is zero".to_string()));
    }
    if loan.params.net_pay <= Decimal::ZERO {
        return Err(invariant(loan, "net pay is not positive".to_string()));
    }

    let principal = loan.recommended_amount;
    let tenor = Decimal::from(loan.recommended_tenor);

    let upfront_fee = (principal * loan.params.upfront_fee_percent / HUNDRED).round_dp(MONEY_DP);
    let net_value = (principal - upfront_fee - loan.params.transfer_fee).round_dp(MONEY_DP);

    if net_value >= principal {
        return Err(invariant(
            loan,
            format!("fee total is not positive (net value {net_value} against principal {principal})"),
        ));
    }
    if net_value <= Decimal::ZERO {
        return Err(invariant(
            loan,
            format!("fees meet or exceed principal (net value {net_value})"),
        ));
    }

    let repayment =
        (principal * loan.params.interest_rate / HUNDRED + principal / tenor).round_dp(MONEY_DP);
    let total_repayment = (repayment * tenor).round_dp(MONEY_DP);
    let dti = (repayment / loan.params.net_pay * HUNDRED).round_dp(MONEY_DP);

    loan.derived = DerivedMetrics {
        upfront_fee,
        net_value,
        repayment,
        total_repayment,
        dti,
    };

    Ok(())
}

/// Recompute the applicant metrics (`age`, `service_length`) carried on a
/// loan from the customer's dates. Independent of the monetary path; the
/// Customer Record component invokes this when birth or employment dates
/// change.
pub fn refresh_applicant_metrics(
    loan: &mut Loan,
    birth_date: NaiveDate,
    employment_start_date: NaiveDate,
    as_of: NaiveDate,
) {
    loan.params.age = whole_years_between(birth_date, as_of);
    loan.params.service_length = whole_years_between(employment_start_date, as_of);
}

/// Whole-year difference between two dates; zero when `to` precedes `from`.
pub fn whole_years_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to < from {
        return 0;
    }
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

fn invariant(loan: &Loan, detail: String) -> CoreError {
    error!(
        loan_id = %loan.id,
        tenant_id = %loan.tenant_id,
        recommended_amount = %loan.recommended_amount,
        recommended_tenor = loan.recommended_tenor,
        interest_rate = %loan.params.interest_rate,
        upfront_fee_percent = %loan.params.upfront_fee_percent,
        transfer_fee = %loan.params.transfer_fee,
        net_pay = %loan.params.net_pay,
        "loan pricing invariant violated: {detail}",
    );
    CoreError::Invariant(InvariantViolation {
        loan_id: loan.id.clone(),
        tenant_id: loan.tenant_id.clone(),
        detail,
    })
}
