mod common;

use common::FakeAdapter;
use pantry_core::{
    AdapterRegistry, CanonicalQuery, CatalogError, CompletionStatus, SearchOrchestrator,
    SearchSession, Source,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(adapters: Vec<FakeAdapter>) -> SearchOrchestrator {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(Arc::new(adapter));
    }
    SearchOrchestrator::new(Arc::new(registry))
}

#[tokio::test]
async fn test_late_answer_from_superseded_search_is_dropped() {
    let slow = FakeAdapter::returning(Source::Upc, vec![json!({"ean": "old"})])
        .with_delay(Duration::from_millis(150));
    let fast = FakeAdapter::returning(Source::Usda, vec![json!({"fdcId": 5})]);
    let orchestrator = orchestrator(vec![slow, fast]);
    let mut session = SearchSession::new(orchestrator.clone());

    let query = CanonicalQuery::builder().item_name("beans").build();
    let first = session.begin_search(query.clone(), vec![Source::Upc]);
    let first = tokio::spawn(first.run(orchestrator.clone()));
    let second = session.begin_search(query, vec![Source::Usda]);
    let second = tokio::spawn(second.run(orchestrator));

    let newest = second.await.unwrap();
    assert_eq!(session.complete(newest).unwrap(), CompletionStatus::Applied);

    let late = first.await.unwrap();
    assert!(late.result.is_ok());
    assert_eq!(session.complete(late).unwrap(), CompletionStatus::Stale);

    assert_eq!(session.current_page().unwrap().ids(), vec!["usda:5"]);
}

#[tokio::test]
async fn test_paging_keeps_selection_and_clamps() {
    let items: Vec<_> = (1..=20).map(|n| json!({"fdcId": n})).collect();
    let usda = FakeAdapter::returning(Source::Usda, items).with_total(45);
    let mut session = SearchSession::new(orchestrator(vec![usda]));

    let query = CanonicalQuery::builder().item_name("lentils").page_size(20).build();
    let page = session.search(query, vec![Source::Usda]).await.unwrap();
    assert_eq!(page.total_pages(), 3);
    assert!(!page.page.has_previous());

    session.selection_mut().select("usda:3");

    let page = session.next_page().await.unwrap().unwrap();
    assert_eq!(page.page.current_page, 2);
    let page = session.go_to_page(99).await.unwrap();
    assert_eq!(page.page.current_page, 3);
    assert!(session.next_page().await.unwrap().is_none());
    assert!(session.selection().contains("usda:3"));

    let page = session.previous_page().await.unwrap().unwrap();
    assert_eq!(page.page.current_page, 2);
}

#[tokio::test]
async fn test_new_search_resets_selection() {
    let upc = FakeAdapter::returning(Source::Upc, vec![json!({"ean": "1"}), json!({"ean": "2"})]);
    let mut session = SearchSession::new(orchestrator(vec![upc]));

    let query = CanonicalQuery::builder().brand("Acme").build();
    session.search(query.clone(), vec![Source::Upc]).await.unwrap();
    session.selection_mut().select_all(vec!["upc:1", "upc:2"]);
    assert_eq!(session.selection().len(), 2);

    session.search(query, vec![Source::Upc]).await.unwrap();
    assert!(session.selection().is_empty());
}

#[tokio::test]
async fn test_current_failure_is_reported() {
    let down = FakeAdapter::failing(Source::Upc, || CatalogError::network("unreachable"));
    let mut session = SearchSession::new(orchestrator(vec![down]));

    let query = CanonicalQuery::builder().item_name("tea").build();
    let result = session.search(query, vec![Source::Upc]).await;
    assert!(matches!(result, Err(CatalogError::AggregateSearch(_))));
    assert!(session.current_page().is_none());
}

#[tokio::test]
async fn test_failed_page_change_leaves_session_on_shown_page() {
    let items: Vec<_> = (1..=20).map(|n| json!({"fdcId": n})).collect();
    let usda = FakeAdapter::returning(Source::Usda, items)
        .with_total(100)
        .failing_after(1, || CatalogError::network("connection reset"));
    let mut session = SearchSession::new(orchestrator(vec![usda]));

    let query = CanonicalQuery::builder().item_name("barley").page_size(20).build();
    session.search(query, vec![Source::Usda]).await.unwrap();

    let result = session.go_to_page(3).await;
    assert!(matches!(result, Err(CatalogError::AggregateSearch(_))));
    assert_eq!(session.current_page().unwrap().page.current_page, 1);
    assert_eq!(session.query().unwrap().page_number(), 1);
}
