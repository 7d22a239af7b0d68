//! Concurrent resolution shares one upstream fetch per entity

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use pretty_assertions::assert_eq;
use sapmux_core::ErrorKind;
use sapmux_gateway::MetadataResolver;
use tests::fixtures::{self, BUSINESS_PARTNER, PRODUCT, SALES_ORDER};
use tests::mocks::CountingMetadataSource;

fn resolver(source: Arc<CountingMetadataSource>) -> MetadataResolver {
    MetadataResolver::new(Arc::new(fixtures::test_catalog()), source)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_fetch() {
    let source = Arc::new(CountingMetadataSource::new().with_delay(Duration::from_millis(100)));
    let resolver = Arc::new(resolver(source.clone()));

    let calls = (0..16).map(|_| {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve(BUSINESS_PARTNER, "Customer").await })
    });
    let schemas: Vec<_> = join_all(calls)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(source.fetch_count(), 1);
    let first = &schemas[0];
    for schema in &schemas[1..] {
        assert!(Arc::ptr_eq(first, schema), "every caller sees the same schema");
    }
    assert_eq!(first.entity_set, "A_Customer");
}

#[tokio::test]
async fn test_resolved_schema_is_cached() {
    let source = Arc::new(CountingMetadataSource::new());
    let resolver = resolver(source.clone());

    let first = resolver.resolve(BUSINESS_PARTNER, "Customer").await.unwrap();
    let second = resolver.resolve(BUSINESS_PARTNER, "Customer").await.unwrap();

    assert_eq!(source.fetch_count(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(resolver.cached(BUSINESS_PARTNER, "Customer").is_some());
    assert!(resolver.cached(BUSINESS_PARTNER, "Supplier").is_none());
}

#[tokio::test]
async fn test_distinct_entities_fetch_independently() {
    let source = Arc::new(CountingMetadataSource::new());
    let resolver = resolver(source.clone());

    let (customer, supplier, order) = tokio::join!(
        resolver.resolve(BUSINESS_PARTNER, "Customer"),
        resolver.resolve(BUSINESS_PARTNER, "Supplier"),
        resolver.resolve(SALES_ORDER, "SalesOrder"),
    );

    assert_eq!(customer.unwrap().key_properties, vec!["CustomerID"]);
    assert_eq!(supplier.unwrap().key_properties, vec!["Supplier"]);
    assert_eq!(order.unwrap().key_properties, vec!["SalesOrder"]);
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(resolver.cached_count(), 3);
}

#[tokio::test]
async fn test_unknown_entity_is_rejected_without_fetch() {
    let source = Arc::new(CountingMetadataSource::new());
    let resolver = resolver(source.clone());

    let missing_entity = resolver.resolve(BUSINESS_PARTNER, "Invoice").await.unwrap_err();
    let missing_service = resolver.resolve("API_UNKNOWN", "Customer").await.unwrap_err();

    assert_eq!(missing_entity.kind(), ErrorKind::EntityNotFound);
    assert_eq!(missing_service.kind(), ErrorKind::EntityNotFound);
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let source = Arc::new(CountingMetadataSource::new().failing_first(1));
    let resolver = resolver(source.clone());

    let err = resolver.resolve(BUSINESS_PARTNER, "Customer").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MetadataFetchError);
    assert_eq!(resolver.cached_count(), 0);

    let schema = resolver.resolve(BUSINESS_PARTNER, "Customer").await.unwrap();
    assert_eq!(schema.entity_name, "Customer");
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_waiters_all_see_the_failure() {
    let source = Arc::new(
        CountingMetadataSource::new()
            .with_delay(Duration::from_millis(100))
            .failing_first(1),
    );
    let resolver = Arc::new(resolver(source.clone()));

    let calls = (0..4).map(|_| {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve(BUSINESS_PARTNER, "Customer").await })
    });
    let results = join_all(calls).await;

    assert_eq!(source.fetch_count(), 1);
    for result in results {
        let err = result.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MetadataFetchError);
    }
}

#[tokio::test]
async fn test_catalog_entity_without_metadata_fails() {
    let source = Arc::new(CountingMetadataSource::new());
    let resolver = resolver(source.clone());

    let err = resolver.resolve(PRODUCT, "Product").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MetadataFetchError);
    assert!(err.to_string().contains("404"), "{}", err);
}
