//! Request shapes per operation and response normalization

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sapmux_core::{
    ErrorKind, ODataMethod, ODataResponse, Operation, OperationRequest, QueryOptions,
    SapMuxError,
};
use sapmux_gateway::{AuthPolicy, OperationDispatcher};
use serde_json::json;
use tests::fixtures::{self, BUSINESS_PARTNER};
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
async fn test_update_email_returns_updated_record() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(BUSINESS_PARTNER, "Customer");
    // MERGE answers 204; the dispatcher then re-reads the entity
    executor.respond_with(Ok(ODataResponse::no_content()));
    executor.respond_with(Ok(ODataResponse::new(
        200,
        Some(json!({"d": {
            "__metadata": {"uri": "A_Customer('1000')", "type": "API_BUSINESS_PARTNER.Customer"},
            "CustomerID": "1000",
            "CustomerName": "ACME Corp",
            "EmailAddress": "new@acme.com"
        }})),
    )));

    let request = OperationRequest::new(BUSINESS_PARTNER, "Customer", Operation::Update)
        .with_parameter("CustomerID", "1000")
        .with_parameter("EmailAddress", "new@acme.com")
        .with_auth(fixtures::user_auth());
    let record = dispatcher.execute(&request, &schema).await.unwrap();

    assert_eq!(
        record,
        json!({"CustomerID": "1000", "CustomerName": "ACME Corp", "EmailAddress": "new@acme.com"})
    );

    let requests = executor.requests();
    assert_eq!(requests.len(), 2);
    let merge = &requests[0].request;
    assert_eq!(merge.method, ODataMethod::Merge);
    assert_eq!(merge.path, "A_Customer('1000')");
    assert_eq!(merge.body, Some(json!({"EmailAddress": "new@acme.com"})));
    assert_eq!(requests[0].credential_scheme, Some("bearer"));
    let reread = &requests[1].request;
    assert_eq!(reread.method, ODataMethod::Get);
    assert_eq!(reread.path, "A_Customer('1000')");
}

#[tokio::test]
async fn test_read_passes_query_options_and_normalizes() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(BUSINESS_PARTNER, "Customer");
    executor.respond_with(Ok(ODataResponse::new(
        200,
        Some(json!({"d": {"results": [
            {"__metadata": {"uri": "x"}, "CustomerID": "1000", "CustomerName": "ACME Corp"},
            {"__metadata": {"uri": "y"}, "CustomerID": "1001", "CustomerName": "ACME Ltd"}
        ]}})),
    )));

    let request = OperationRequest::new(BUSINESS_PARTNER, "Customer", Operation::Read)
        .with_query(QueryOptions {
            filter: Some("startswith(CustomerName,'ACME')".into()),
            select: Some("CustomerID,CustomerName".into()),
            top: Some(2),
            ..Default::default()
        })
        .with_auth(fixtures::user_auth());
    let result = dispatcher.execute(&request, &schema).await.unwrap();

    assert_eq!(result["count"], json!(2));
    assert_eq!(
        result["results"][1],
        json!({"CustomerID": "1001", "CustomerName": "ACME Ltd"})
    );

    let sent = &executor.requests()[0].request;
    assert_eq!(sent.method, ODataMethod::Get);
    assert_eq!(sent.path, "A_Customer");
    assert_eq!(
        sent.query,
        vec![
            ("$filter".to_string(), "startswith(CustomerName,'ACME')".to_string()),
            ("$select".to_string(), "CustomerID,CustomerName".to_string()),
            ("$top".to_string(), "2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_v4_read_single() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(fixtures::SALES_ORDER, "SalesOrder");
    executor.respond_with(Ok(ODataResponse::new(
        200,
        Some(json!({
            "@odata.context": "$metadata#SalesOrder/$entity",
            "SalesOrder": "4711",
            "Currency": "EUR"
        })),
    )));

    let request = OperationRequest::new(fixtures::SALES_ORDER, "SalesOrder", Operation::ReadSingle)
        .with_parameter("SalesOrder", "4711")
        .with_auth(fixtures::user_auth());
    let record = dispatcher.execute(&request, &schema).await.unwrap();

    assert_eq!(record, json!({"SalesOrder": "4711", "Currency": "EUR"}));
    assert_eq!(executor.requests()[0].request.path, "SalesOrder('4711')");
}

#[tokio::test]
async fn test_create_sends_keys_and_returns_created_record() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(BUSINESS_PARTNER, "Supplier");
    executor.respond_with(Ok(ODataResponse::new(
        201,
        Some(json!({"d": {"Supplier": "S1", "SupplierName": "Parts Inc", "PaymentBlocked": false}})),
    )));

    let request = OperationRequest::new(BUSINESS_PARTNER, "Supplier", Operation::Create)
        .with_parameter("Supplier", "S1")
        .with_parameter("SupplierName", "Parts Inc")
        .with_auth(fixtures::user_auth());
    let record = dispatcher.execute(&request, &schema).await.unwrap();

    assert_eq!(record["SupplierName"], json!("Parts Inc"));
    let sent = &executor.requests()[0].request;
    assert_eq!(sent.method, ODataMethod::Post);
    assert_eq!(sent.path, "A_Supplier");
    assert_eq!(
        sent.body,
        Some(json!({"Supplier": "S1", "SupplierName": "Parts Inc"}))
    );
}

#[tokio::test]
async fn test_delete_reports_deleted_key() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(BUSINESS_PARTNER, "Supplier");

    let request = OperationRequest::new(BUSINESS_PARTNER, "Supplier", Operation::Delete)
        .with_parameter("Supplier", "S1")
        .with_auth(fixtures::user_auth());
    let result = dispatcher.execute(&request, &schema).await.unwrap();

    assert_eq!(
        result,
        json!({"deleted": true, "entity": "Supplier", "key": {"Supplier": "S1"}})
    );
    let sent = &executor.requests()[0].request;
    assert_eq!(sent.method, ODataMethod::Delete);
    assert_eq!(sent.path, "A_Supplier('S1')");
}

#[tokio::test]
async fn test_remote_fault_is_passed_through() {
    let (dispatcher, executor) = dispatcher();
    let schema = fixtures::schema(BUSINESS_PARTNER, "Customer");
    executor.respond_with(Err(SapMuxError::RemoteFault {
        status: 400,
        code: Some("CX_SADL_ENTITY_SRV/001".into()),
        message: "Property EmailAddress has invalid value".into(),
    }));

    let request = OperationRequest::new(BUSINESS_PARTNER, "Customer", Operation::Update)
        .with_parameter("CustomerID", "1000")
        .with_parameter("EmailAddress", "not-an-email")
        .with_auth(fixtures::user_auth());
    let err = dispatcher.execute(&request, &schema).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteFault);
    assert_eq!(executor.request_count(), 1);
}
