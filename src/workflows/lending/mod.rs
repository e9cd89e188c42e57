//! Loan origination, pricing, lifecycle, and customer-record maintenance.

pub mod customer;
pub mod domain;
pub mod financial;
pub mod service;
pub mod validator;

#[cfg(test)]
mod tests;

pub use customer::CustomerService;
pub use domain::{
    Customer, CustomerId, CustomerPatch, DerivedMetrics, Loan, LoanId, LoanKind, LoanParams,
    LoanPatch, LoanRemark, LoanStatus, NewLoan, Segment, SegmentId,
};
pub use service::{EditOutcome, LoanService};
pub use validator::{build_loan_validator, LoanValidator};
