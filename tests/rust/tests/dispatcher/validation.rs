//! Rejected operations never reach the remote system

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sapmux_core::{ErrorKind, Operation, OperationRequest, SapMuxError};
use sapmux_gateway::{AuthPolicy, OperationDispatcher};
use serde_json::json;
use tests::fixtures::{self, BUSINESS_PARTNER, SALES_ORDER};
use tests::mocks::RecordingExecutor;

fn dispatcher() -> (OperationDispatcher, Arc<RecordingExecutor>) {
    let executor = Arc::new(RecordingExecutor::new());
    let dispatcher = OperationDispatcher::new(
        Arc::new(fixtures::test_catalog()),
        executor.clone(),
        AuthPolicy::default(),
    );
    (dispatcher, executor)
}

#[tokio::test]
async fn test_create_on_non_creatable_entity_is_denied() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(BUSINESS_PARTNER, "Customer");
    let request = OperationRequest::new(BUSINESS_PARTNER, "Customer", Operation::Create)
        .with_parameter("CustomerID", "1000")
        .with_auth(fixtures::user_auth());

    let err = dispatcher.execute(&request, &schema).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CapabilityDenied);
    assert_eq!(executor.request_count(), 0);
}

#[tokio::test]
async fn test_update_on_read_only_v4_entity_is_denied() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(SALES_ORDER, "SalesOrder");
    let request = OperationRequest::new(SALES_ORDER, "SalesOrder", Operation::Update)
        .with_parameter("SalesOrder", "4711")
        .with_parameter("Currency", "USD")
        .with_auth(fixtures::user_auth());

    let err = dispatcher.execute(&request, &schema).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CapabilityDenied);
    assert_eq!(executor.request_count(), 0);
}

#[tokio::test]
async fn test_missing_key_names_every_key() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(BUSINESS_PARTNER, "Customer");

    for operation in [Operation::ReadSingle, Operation::Update] {
        let request = OperationRequest::new(BUSINESS_PARTNER, "Customer", operation)
            .with_parameter("EmailAddress", "a@b.c")
            .with_auth(fixtures::user_auth());

        let err = dispatcher.execute(&request, &schema).await.unwrap_err();

        assert_eq!(
            err,
            SapMuxError::MissingKey {
                entity_name: "Customer".into(),
                keys: vec!["CustomerID".into()],
            }
        );
    }
    assert_eq!(executor.request_count(), 0);
}

#[tokio::test]
async fn test_create_missing_required_field() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(BUSINESS_PARTNER, "Supplier");
    let request = OperationRequest::new(BUSINESS_PARTNER, "Supplier", Operation::Create)
        .with_parameter("Supplier", "S-1")
        .with_auth(fixtures::user_auth());

    let err = dispatcher.execute(&request, &schema).await.unwrap_err();

    match err {
        SapMuxError::MissingRequiredField { fields, .. } => {
            assert_eq!(fields, vec!["SupplierName"]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(executor.request_count(), 0);
}

#[tokio::test]
async fn test_unknown_property_is_rejected() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(BUSINESS_PARTNER, "Customer");
    let request = OperationRequest::new(BUSINESS_PARTNER, "Customer", Operation::Update)
        .with_parameter("CustomerID", "1000")
        .with_parameter("Email", "typo@acme.com")
        .with_auth(fixtures::user_auth());

    let err = dispatcher.execute(&request, &schema).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownProperty);
    assert_eq!(err.to_json()["error"]["kind"], json!("UnknownProperty"));
    assert_eq!(executor.request_count(), 0);
}
