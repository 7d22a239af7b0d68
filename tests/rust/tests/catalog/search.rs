//! Catalog search: keyword, category, limit and the full-catalog fallback

use pretty_assertions::assert_eq;
use sapmux_core::CatalogQuery;
use tests::fixtures::{self, BUSINESS_PARTNER, PRODUCT, SALES_ORDER};

fn ids(search: &sapmux_core::CatalogSearch) -> Vec<&str> {
    search
        .matches
        .iter()
        .map(|m| m.service.service_id.as_str())
        .collect()
}

#[test]
fn test_customer_query_finds_business_partner_with_all_entities() {
    let catalog = fixtures::test_catalog();

    let result = catalog.search(&CatalogQuery::text("customer"));

    assert!(!result.fallback);
    assert_eq!(ids(&result), vec![BUSINESS_PARTNER]);
    let entities: Vec<&str> = result.matches[0]
        .entities
        .iter()
        .map(|e| e.entity_name.as_str())
        .collect();
    assert_eq!(entities, vec!["Customer", "Supplier"]);
}

#[test]
fn test_search_is_case_insensitive_across_fields() {
    let catalog = fixtures::test_catalog();

    assert_eq!(ids(&catalog.search(&CatalogQuery::text("SALES"))), vec![SALES_ORDER]);
    assert_eq!(
        ids(&catalog.search(&CatalogQuery::text("productdescription"))),
        vec![PRODUCT]
    );
    assert_eq!(
        ids(&catalog.search(&CatalogQuery::text("suppliers and"))),
        vec![BUSINESS_PARTNER]
    );
}

#[test]
fn test_unmatched_query_falls_back_to_full_catalog() {
    let catalog = fixtures::test_catalog();

    let result = catalog.search(&CatalogQuery::text("zzz-nothing-matches"));

    assert!(result.fallback);
    assert_eq!(ids(&result), vec![BUSINESS_PARTNER, SALES_ORDER, PRODUCT]);
}

#[test]
fn test_category_filter_and_limit() {
    let catalog = fixtures::test_catalog();

    let sales = catalog.search(&CatalogQuery::default().with_category("Sales"));
    assert!(!sales.fallback);
    assert_eq!(ids(&sales), vec![SALES_ORDER]);

    let limited = catalog.search(&CatalogQuery::default().with_limit(2));
    assert_eq!(limited.matches.len(), 2);

    // Category and text must both match; otherwise the fallback applies
    let mismatch = catalog.search(&CatalogQuery::text("customer").with_category("sales"));
    assert!(mismatch.fallback);
    assert_eq!(mismatch.matches.len(), 3);
}

#[test]
fn test_empty_catalog_returns_empty_without_fallback() {
    let catalog = sapmux_core::ServiceCatalog::empty();

    let result = catalog.search(&CatalogQuery::text("customer"));

    assert!(result.matches.is_empty());
    assert!(!result.fallback);
}

#[test]
fn test_catalog_lookups() {
    let catalog = fixtures::test_catalog();

    assert_eq!(catalog.len(), 3);
    assert!(catalog.contains_entity(BUSINESS_PARTNER, "Customer"));
    assert!(!catalog.contains_entity(BUSINESS_PARTNER, "SalesOrder"));
    assert!(catalog.get("API_UNKNOWN").is_none());
    assert_eq!(
        catalog.categories().into_iter().collect::<Vec<_>>(),
        vec!["business-partner", "product", "sales"]
    );
}
