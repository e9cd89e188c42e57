use rust_decimal_macros::dec;

use super::common::*;
use crate::error::CoreError;
use crate::store::{RecordStore, WriteBatch};
use crate::workflows::lending::domain::{
    CustomerId, LoanPatch, LoanRemark, LoanStatus,
};
use crate::workflows::lending::service::EditOutcome;

#[tokio::test]
async fn create_seeds_recommended_fields_and_prices() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store.clone());

    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");

    assert_eq!(loan.status, LoanStatus::Pending);
    assert_eq!(loan.recommended_amount, loan.amount);
    assert_eq!(loan.recommended_tenor, loan.tenor);
    assert_eq!(loan.derived.upfront_fee, dec!(2000.00));
    assert_eq!(loan.derived.net_value, dec!(97500.00));
    assert_eq!(loan.derived.repayment, dec!(32333.33));
    assert_eq!(loan.version, 1);
    assert!(loan.derived.net_value < loan.recommended_amount);
}

#[tokio::test]
async fn create_snapshots_applicant_metrics_from_the_customer() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store);

    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");

    let today = chrono::Utc::now().date_naive();
    use crate::workflows::lending::financial::whole_years_between;
    assert_eq!(loan.params.age, whole_years_between(customer.birth_date, today));
    assert_eq!(
        loan.params.service_length,
        whole_years_between(customer.employment_start_date, today)
    );
}

#[tokio::test]
async fn create_rejects_a_dti_breach() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store);

    let mut input = new_loan(&customer.id);
    // Repayment of 32333.33 against the minimum acceptable net pay puts
    // DTI far past the configured 45 limit.
    input.net_pay = dec!(30000);

    match service.create(&admin(), input).await {
        Err(CoreError::Validation(err)) => assert_eq!(err.field.as_deref(), Some("dti")),
        other => panic!("expected dti validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_rejects_an_unknown_customer() {
    let (store, _) = seeded_store().await;
    let service = loan_service(store);

    let result = service
        .create(&admin(), new_loan(&CustomerId("cust-missing".to_string())))
        .await;
    assert!(matches!(result, Err(CoreError::NotFound)));
}

#[tokio::test]
async fn create_rejects_an_inactive_segment() {
    let (store, _) = seeded_store().await;
    let frozen = store
        .insert_customer(customer_record("cust-frozen", "FRZ-0001", INACTIVE_SEGMENT))
        .await
        .expect("seed customer");
    let service = loan_service(store);

    match service.create(&admin(), new_loan(&frozen.id)).await {
        Err(CoreError::Validation(err)) => {
            assert_eq!(err.field.as_deref(), Some("segment_id"));
        }
        other => panic!("expected segment validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn agent_edits_queue_a_review_request() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store.clone());
    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");

    let patch = LoanPatch {
        recommended_amount: Some(dec!(80000)),
        ..LoanPatch::default()
    };
    let outcome = service
        .edit(&agent(), &loan.id, patch)
        .await
        .expect("queues");

    let request = match outcome {
        EditOutcome::Queued(request) => request,
        EditOutcome::Applied(_) => panic!("agent edits must not apply directly"),
    };
    assert!(request.alteration.contains_key("recommended_amount"));

    let untouched = store
        .loan(&tenant(), &loan.id)
        .await
        .expect("read")
        .expect("present");
    assert_eq!(untouched.recommended_amount, dec!(100000));
}

#[tokio::test]
async fn privileged_edits_apply_and_reprice() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store.clone());
    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");

    let patch = LoanPatch {
        amount: Some(dec!(200000)),
        ..LoanPatch::default()
    };
    let updated = match service.edit(&admin(), &loan.id, patch).await.expect("applies") {
        EditOutcome::Applied(loan) => loan,
        EditOutcome::Queued(_) => panic!("admin edits apply directly"),
    };

    assert_eq!(updated.amount, dec!(200000));
    assert_eq!(updated.recommended_amount, dec!(200000));
    assert_eq!(updated.derived.upfront_fee, dec!(4000.00));
    assert_eq!(updated.version, 2, "commit bumps the stored version");
}

#[tokio::test]
async fn closed_loans_reject_edits() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store.clone());
    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");

    let mut matured = store
        .loan(&tenant(), &loan.id)
        .await
        .expect("read")
        .expect("present");
    matured.status = LoanStatus::Matured;
    store
        .commit(WriteBatch::new().save_loan(matured))
        .await
        .expect("mark matured");

    let patch = LoanPatch {
        recommended_amount: Some(dec!(90000)),
        ..LoanPatch::default()
    };
    assert!(matches!(
        service.edit(&admin(), &loan.id, patch).await,
        Err(CoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn locked_loans_reject_direct_edits() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store.clone());
    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");
    service
        .set_locked(&tenant(), &loan.id, true)
        .await
        .expect("locks");

    let patch = LoanPatch {
        recommended_tenor: Some(6),
        ..LoanPatch::default()
    };
    assert!(matches!(
        service.edit(&admin(), &loan.id, patch).await,
        Err(CoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn decision_transitions_require_pending_or_on_hold() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store.clone());
    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");

    // Pending -> Approved works with a remark.
    let approve = LoanPatch {
        status: Some(LoanStatus::Approved),
        remark: Some(LoanRemark::MeetsPolicy),
        ..LoanPatch::default()
    };
    service
        .edit(&admin(), &loan.id, approve)
        .await
        .expect("approves");

    // Approved -> Denied is not reachable by decision.
    let deny = LoanPatch {
        status: Some(LoanStatus::Denied),
        remark: Some(LoanRemark::ExcessiveDti),
        ..LoanPatch::default()
    };
    assert!(matches!(
        service.edit(&admin(), &loan.id, deny).await,
        Err(CoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn closure_is_reserved_for_approved_loans() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store.clone());
    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");

    assert!(matches!(
        service.close(&tenant(), &loan.id, LoanStatus::Matured).await,
        Err(CoreError::Conflict(_))
    ));

    let approve = LoanPatch {
        status: Some(LoanStatus::Approved),
        remark: Some(LoanRemark::MeetsPolicy),
        ..LoanPatch::default()
    };
    service
        .edit(&admin(), &loan.id, approve)
        .await
        .expect("approves");

    let closed = service
        .close(&tenant(), &loan.id, LoanStatus::Matured)
        .await
        .expect("closes");
    assert_eq!(closed.status, LoanStatus::Matured);
    assert!(!closed.active);
}

#[tokio::test]
async fn closure_rejects_non_closing_statuses() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store.clone());
    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");

    match service.close(&tenant(), &loan.id, LoanStatus::OnHold).await {
        Err(CoreError::Validation(err)) => assert_eq!(err.field.as_deref(), Some("status")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn disbursement_freezes_principal_terms() {
    let (store, customer) = seeded_store().await;
    let service = loan_service(store.clone());
    let loan = service
        .create(&admin(), new_loan(&customer.id))
        .await
        .expect("originates");

    let approve = LoanPatch {
        status: Some(LoanStatus::Approved),
        remark: Some(LoanRemark::MeetsPolicy),
        ..LoanPatch::default()
    };
    service
        .edit(&admin(), &loan.id, approve)
        .await
        .expect("approves");
    let disbursed = service
        .record_disbursement(&tenant(), &loan.id)
        .await
        .expect("disburses");
    assert!(disbursed.active && disbursed.booked && disbursed.disbursed);

    let patch = LoanPatch {
        amount: Some(dec!(120000)),
        ..LoanPatch::default()
    };
    assert!(matches!(
        service.edit(&admin(), &loan.id, patch).await,
        Err(CoreError::Conflict(_))
    ));
}
