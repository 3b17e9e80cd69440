mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use sea_orm::ConnectionTrait;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;
use grower_stock_api::{
    entities::{StockUpdateDecision, StockUpdateStatus},
    errors::ServiceError,
    events::Event,
};

async fn tick() {
    // created_at ordering needs distinct timestamps
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn submit_stores_one_pending_row_verbatim() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(10.0).await;
    let service = app.stock_updates();

    let request = service
        .submit(grower.id, product.id, None, &json!(12.75), Some("  harvest  ".into()))
        .await
        .expect("submit");

    assert_eq!(request.status, StockUpdateStatus::Pending);
    assert_eq!(request.new_stock, 12.75);
    assert_eq!(request.current_stock, 10.0);
    assert_eq!(request.reason.as_deref(), Some("harvest"));
    assert!(request.approved_by.is_none());

    let pending = service.list_pending(None).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, request.id);

    // Submission never touches live stock
    let live = app.catalog().live_stock(product.id, None).await.unwrap();
    assert_eq!(live, 10.0);

    let events = app.drain_events().await;
    assert_matches!(
        events.as_slice(),
        [Event::StockUpdateRequested { request_id, new_stock, .. }]
            if *request_id == request.id && *new_stock == 12.75
    );
}

#[tokio::test]
async fn submit_accepts_numeric_strings() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(0.0).await;

    let request = app
        .stock_updates()
        .submit(grower.id, product.id, None, &json!(" 7.5 "), None)
        .await
        .expect("numeric string accepted");

    assert_eq!(request.new_stock, 7.5);
    assert!(request.reason.is_none());
}

#[tokio::test]
async fn invalid_quantities_are_rejected_without_a_row() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(10.0).await;
    let service = app.stock_updates();

    for bad in [json!(-5), json!("abc"), json!(null), json!(true), json!("-0.5"), json!([1])] {
        let result = service
            .submit(grower.id, product.id, None, &bad, Some("recount".into()))
            .await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)), "input {bad}");
    }

    assert_eq!(service.pending_count(None).await.unwrap(), 0);
    assert_eq!(app.catalog().live_stock(product.id, None).await.unwrap(), 10.0);
    assert!(app.drain_events().await.is_empty());
}

#[tokio::test]
async fn submit_checks_references_and_ownership() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(3.0).await;
    let other = app.seed_grower("Hill Farm").await;
    let other_product = app.seed_product(other.id, "Kale", 1.0).await;
    let foreign_variant = app.seed_variant(other_product.id, "Bunch", 1.0).await;
    let service = app.stock_updates();

    let unknown_grower = service
        .submit(Uuid::new_v4(), product.id, None, &json!(1), None)
        .await;
    assert_matches!(unknown_grower, Err(ServiceError::NotFound(_)));

    let unknown_product = service
        .submit(grower.id, Uuid::new_v4(), None, &json!(1), None)
        .await;
    assert_matches!(unknown_product, Err(ServiceError::NotFound(_)));

    let unknown_variant = service
        .submit(grower.id, product.id, Some(Uuid::new_v4()), &json!(1), None)
        .await;
    assert_matches!(unknown_variant, Err(ServiceError::NotFound(_)));

    let not_owner = service
        .submit(grower.id, other_product.id, None, &json!(1), None)
        .await;
    assert_matches!(not_owner, Err(ServiceError::ValidationError(_)));

    let wrong_variant = service
        .submit(grower.id, product.id, Some(foreign_variant.id), &json!(1), None)
        .await;
    assert_matches!(wrong_variant, Err(ServiceError::ValidationError(_)));

    assert_eq!(service.pending_count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn product_with_variants_requires_a_variant() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(0.0).await;
    app.seed_variant(product.id, "1kg crate", 4.0).await;

    let result = app
        .stock_updates()
        .submit(grower.id, product.id, None, &json!(9), None)
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("variantId"));
}

#[tokio::test]
async fn reason_longer_than_policy_is_rejected() {
    let app = TestApp::with_config(|cfg| cfg.max_reason_length = 10).await;
    let (grower, product) = app.seed_simple_product(0.0).await;

    let result = app
        .stock_updates()
        .submit(grower.id, product.id, None, &json!(1), Some("x".repeat(11)))
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn duplicate_pending_requests_coexist() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(0.0).await;
    let service = app.stock_updates();

    service.submit(grower.id, product.id, None, &json!(1), None).await.unwrap();
    tick().await;
    service.submit(grower.id, product.id, None, &json!(2), None).await.unwrap();

    assert_eq!(service.pending_count(Some(grower.id)).await.unwrap(), 2);
}

#[tokio::test]
async fn approving_a_variant_request_end_to_end() {
    let app = TestApp::new().await;
    let grower = app.seed_grower("Green Acres").await;
    let product = app.seed_product(grower.id, "Apples", 0.0).await;
    let variant = app.seed_variant(product.id, "5kg box", 10.0).await;
    let service = app.stock_updates();

    let request = service
        .submit(grower.id, product.id, Some(variant.id), &json!(42), Some("recount".into()))
        .await
        .unwrap();

    let pending = service.list_pending(None).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].new_stock, 42.0);
    assert_eq!(pending[0].current_stock, 10.0);

    let resolved = service
        .resolve(request.id, StockUpdateDecision::Approved, "admin-1", None)
        .await
        .unwrap();

    assert_eq!(resolved.status, StockUpdateStatus::Approved);
    assert_eq!(resolved.approved_by.as_deref(), Some("admin-1"));
    assert_eq!(
        app.catalog().live_stock(product.id, Some(variant.id)).await.unwrap(),
        42.0
    );
    // Only the variant row is written
    assert_eq!(app.catalog().live_stock(product.id, None).await.unwrap(), 0.0);
    assert!(service.list_pending(None).await.unwrap().is_empty());

    let events = app.drain_events().await;
    assert_eq!(events.len(), 2);
    assert_matches!(
        &events[1],
        Event::StockUpdateApproved { previous_stock, new_stock, approved_by, .. }
            if *previous_stock == 10.0 && *new_stock == 42.0 && approved_by == "admin-1"
    );
}

#[tokio::test]
async fn negative_submission_end_to_end() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(10.0).await;

    let result = app
        .stock_updates()
        .submit(grower.id, product.id, None, &json!(-5), None)
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    assert!(app.stock_updates().list_pending(None).await.unwrap().is_empty());
    assert_eq!(app.catalog().live_stock(product.id, None).await.unwrap(), 10.0);
}

#[tokio::test]
async fn rejecting_keeps_live_stock() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(10.0).await;
    let service = app.stock_updates();
    let request = service
        .submit(grower.id, product.id, None, &json!(99), None)
        .await
        .unwrap();

    let resolved = service
        .resolve(
            request.id,
            StockUpdateDecision::Rejected,
            "admin-2",
            Some("does not match delivery notes".into()),
        )
        .await
        .unwrap();

    assert_eq!(resolved.status, StockUpdateStatus::Rejected);
    assert_eq!(resolved.approved_by.as_deref(), Some("admin-2"));
    assert_eq!(
        resolved.admin_comment.as_deref(),
        Some("does not match delivery notes")
    );
    assert_eq!(app.catalog().live_stock(product.id, None).await.unwrap(), 10.0);

    let events = app.drain_events().await;
    assert_matches!(events.last(), Some(Event::StockUpdateRejected { .. }));
}

#[tokio::test]
async fn terminal_requests_are_immutable() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(10.0).await;
    let service = app.stock_updates();
    let request = service
        .submit(grower.id, product.id, None, &json!(20), None)
        .await
        .unwrap();
    let approved = service
        .resolve(request.id, StockUpdateDecision::Approved, "admin-1", None)
        .await
        .unwrap();

    for decision in [StockUpdateDecision::Approved, StockUpdateDecision::Rejected] {
        let again = service.resolve(request.id, decision, "admin-2", None).await;
        assert_matches!(again, Err(ServiceError::InvalidState(_)));
    }

    let stored = service.get(request.id).await.unwrap();
    assert_eq!(stored.status, StockUpdateStatus::Approved);
    assert_eq!(stored.approved_by, approved.approved_by);
    assert_eq!(stored.updated_at, approved.updated_at);
    assert_eq!(app.catalog().live_stock(product.id, None).await.unwrap(), 20.0);
}

#[tokio::test]
async fn resolve_validates_inputs() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(1.0).await;
    let service = app.stock_updates();
    let request = service
        .submit(grower.id, product.id, None, &json!(2), None)
        .await
        .unwrap();

    let blank_admin = service
        .resolve(request.id, StockUpdateDecision::Approved, "   ", None)
        .await;
    assert_matches!(blank_admin, Err(ServiceError::ValidationError(_)));

    let unknown = service
        .resolve(Uuid::new_v4(), StockUpdateDecision::Approved, "admin-1", None)
        .await;
    assert_matches!(unknown, Err(ServiceError::NotFound(_)));

    assert!(service.get(request.id).await.unwrap().is_pending());
}

#[tokio::test]
async fn stale_snapshot_overwrites_by_default() {
    let app = TestApp::new().await;
    let grower = app.seed_grower("Green Acres").await;
    let product = app.seed_product(grower.id, "Pears", 0.0).await;
    let variant = app.seed_variant(product.id, "Tray", 10.0).await;
    let service = app.stock_updates();

    let first = service
        .submit(grower.id, product.id, Some(variant.id), &json!(30), None)
        .await
        .unwrap();
    tick().await;
    let second = service
        .submit(grower.id, product.id, Some(variant.id), &json!(15), None)
        .await
        .unwrap();

    service
        .resolve(first.id, StockUpdateDecision::Approved, "admin-1", None)
        .await
        .unwrap();
    let resolved = service
        .resolve(second.id, StockUpdateDecision::Approved, "admin-1", None)
        .await
        .expect("stale approval still applies");

    assert_eq!(resolved.status, StockUpdateStatus::Approved);
    assert_eq!(
        app.catalog().live_stock(product.id, Some(variant.id)).await.unwrap(),
        15.0
    );
}

#[tokio::test]
async fn stale_snapshot_can_be_refused() {
    let app = TestApp::with_config(|cfg| cfg.reject_stale_requests = true).await;
    let (grower, product) = app.seed_simple_product(10.0).await;
    let service = app.stock_updates();

    let first = service
        .submit(grower.id, product.id, None, &json!(30), None)
        .await
        .unwrap();
    tick().await;
    let second = service
        .submit(grower.id, product.id, None, &json!(15), None)
        .await
        .unwrap();
    service
        .resolve(first.id, StockUpdateDecision::Approved, "admin-1", None)
        .await
        .unwrap();

    let stale = service
        .resolve(second.id, StockUpdateDecision::Approved, "admin-1", None)
        .await;
    assert_matches!(stale, Err(ServiceError::InvalidState(_)));
    assert!(service.get(second.id).await.unwrap().is_pending());
    assert_eq!(app.catalog().live_stock(product.id, None).await.unwrap(), 30.0);

    // Rejecting a stale request is always allowed
    let rejected = service
        .resolve(second.id, StockUpdateDecision::Rejected, "admin-1", None)
        .await
        .unwrap();
    assert_eq!(rejected.status, StockUpdateStatus::Rejected);
}

#[tokio::test]
async fn concurrent_resolutions_have_one_winner() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(5.0).await;
    let service = app.stock_updates();
    let request = service
        .submit(grower.id, product.id, None, &json!(50), None)
        .await
        .unwrap();

    let approve = service.resolve(request.id, StockUpdateDecision::Approved, "admin-1", None);
    let reject = service.resolve(request.id, StockUpdateDecision::Rejected, "admin-2", None);
    let (approved, rejected) = tokio::join!(approve, reject);

    let winners = [approved.is_ok(), rejected.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(winners, 1);

    let stored = service.get(request.id).await.unwrap();
    let expected_stock = match stored.status {
        StockUpdateStatus::Approved => {
            assert_matches!(rejected, Err(ServiceError::InvalidState(_)));
            50.0
        }
        StockUpdateStatus::Rejected => {
            assert_matches!(approved, Err(ServiceError::InvalidState(_)));
            5.0
        }
        StockUpdateStatus::Pending => panic!("request left pending"),
    };
    assert_eq!(
        app.catalog().live_stock(product.id, None).await.unwrap(),
        expected_stock
    );
}

#[tokio::test]
async fn request_resolved_mid_transaction_rolls_back_stock_write() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(5.0).await;
    let service = app.stock_updates();
    let request = service
        .submit(grower.id, product.id, None, &json!(50), None)
        .await
        .unwrap();
    app.drain_events().await;

    // Another admin resolves the request right after the live stock is written
    app.state
        .db
        .execute_unprepared(
            "CREATE TRIGGER resolve_elsewhere AFTER UPDATE OF stock ON products \
             BEGIN UPDATE stock_update_requests SET status = 'REJECTED' \
             WHERE status = 'PENDING'; END",
        )
        .await
        .unwrap();

    let result = service
        .resolve(request.id, StockUpdateDecision::Approved, "admin-1", None)
        .await;
    assert_matches!(result, Err(ServiceError::InvalidState(msg)) if msg.contains("concurrently"));

    app.state
        .db
        .execute_unprepared("DROP TRIGGER resolve_elsewhere")
        .await
        .unwrap();

    assert!(service.get(request.id).await.unwrap().is_pending());
    assert_eq!(app.catalog().live_stock(product.id, None).await.unwrap(), 5.0);
    assert!(app.drain_events().await.is_empty());
}

#[tokio::test]
async fn batch_resolution_is_independent_per_id() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(0.0).await;
    let other = app.seed_product(grower.id, "Leeks", 0.0).await;
    let third = app.seed_product(grower.id, "Onions", 0.0).await;
    let service = app.stock_updates();

    let a = service.submit(grower.id, product.id, None, &json!(1), None).await.unwrap();
    let b = service.submit(grower.id, other.id, None, &json!(2), None).await.unwrap();
    let c = service.submit(grower.id, third.id, None, &json!(3), None).await.unwrap();
    service
        .resolve(b.id, StockUpdateDecision::Rejected, "admin-1", None)
        .await
        .unwrap();

    let missing = Uuid::new_v4();
    let outcomes = service
        .resolve_many(
            vec![a.id, b.id, c.id, a.id, missing],
            StockUpdateDecision::Approved,
            "admin-2",
            Some("weekly sync".into()),
        )
        .await
        .unwrap();

    let ids: Vec<Uuid> = outcomes.iter().map(|o| o.request_id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id, missing]);
    assert!(outcomes[0].is_ok());
    assert_matches!(outcomes[1].result, Err(ServiceError::InvalidState(_)));
    assert!(outcomes[2].is_ok());
    assert_matches!(outcomes[3].result, Err(ServiceError::NotFound(_)));

    let catalog = app.catalog();
    assert_eq!(catalog.live_stock(product.id, None).await.unwrap(), 1.0);
    assert_eq!(catalog.live_stock(other.id, None).await.unwrap(), 0.0);
    assert_eq!(catalog.live_stock(third.id, None).await.unwrap(), 3.0);
    assert_eq!(
        service.get(b.id).await.unwrap().status,
        StockUpdateStatus::Rejected
    );
}

#[tokio::test]
async fn batch_limits_are_enforced() {
    let app = TestApp::with_config(|cfg| cfg.batch_max_size = 2).await;
    let service = app.stock_updates();

    let empty = service
        .resolve_many(Vec::new(), StockUpdateDecision::Approved, "admin-1", None)
        .await;
    assert_matches!(empty, Err(ServiceError::ValidationError(_)));

    let oversized = service
        .resolve_many(
            vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()],
            StockUpdateDecision::Rejected,
            "admin-1",
            None,
        )
        .await;
    assert_matches!(oversized, Err(ServiceError::ValidationError(_)));

    // Duplicates count once against the limit
    let id = Uuid::new_v4();
    let outcomes = service
        .resolve_many(vec![id, id, id], StockUpdateDecision::Rejected, "admin-1", None)
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
}

#[tokio::test]
async fn pending_queue_excludes_resolved_and_orders_newest_first() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(0.0).await;
    let service = app.stock_updates();

    let mut ids = Vec::new();
    for qty in [1, 2, 3, 4] {
        let request = service
            .submit(grower.id, product.id, None, &json!(qty), None)
            .await
            .unwrap();
        ids.push(request.id);
        tick().await;
    }
    service
        .resolve(ids[0], StockUpdateDecision::Approved, "admin-1", None)
        .await
        .unwrap();
    service
        .resolve(ids[2], StockUpdateDecision::Rejected, "admin-1", None)
        .await
        .unwrap();

    let pending = service.list_pending(None).await.unwrap();
    let pending_ids: Vec<Uuid> = pending.iter().map(|r| r.id).collect();
    assert_eq!(pending_ids, vec![ids[3], ids[1]]);
    assert!(pending.iter().all(|r| r.status == StockUpdateStatus::Pending));
    assert_eq!(service.pending_count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn pending_queue_pages_and_filters() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(0.0).await;
    let other = app.seed_grower("Hill Farm").await;
    let other_product = app.seed_product(other.id, "Kale", 0.0).await;
    let service = app.stock_updates();

    for qty in 0..5 {
        service
            .submit(grower.id, product.id, None, &json!(qty), None)
            .await
            .unwrap();
        tick().await;
    }
    service
        .submit(other.id, other_product.id, None, &json!(8), None)
        .await
        .unwrap();

    let page = service.list_pending_page(Some(grower.id), 2, Some(2)).await.unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].new_stock, 2.0);

    let last = service.list_pending_page(None, 3, Some(3)).await.unwrap();
    assert!(last.items.is_empty());
    assert_eq!(last.total, 6);

    let clamped = service.list_pending_page(None, 0, Some(10_000)).await.unwrap();
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.limit, service.policy().max_page_size);

    assert_matches!(
        service.list_pending_page(None, u64::MAX, Some(100)).await,
        Err(ServiceError::ValidationError(_))
    );

    let filtered = service.list_pending(Some(other.id)).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].grower_id, other.id);
}

#[tokio::test]
async fn pending_groups_follow_most_recent_request() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(0.0).await;
    let other = app.seed_grower("Hill Farm").await;
    let other_product = app.seed_product(other.id, "Kale", 0.0).await;
    let service = app.stock_updates();

    service.submit(grower.id, product.id, None, &json!(1), None).await.unwrap();
    tick().await;
    service.submit(grower.id, product.id, None, &json!(2), None).await.unwrap();
    tick().await;
    service
        .submit(other.id, other_product.id, None, &json!(3), None)
        .await
        .unwrap();

    let groups = service.pending_by_grower().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].grower_id, other.id);
    assert_eq!(groups[0].grower_name, "Hill Farm");
    assert_eq!(groups[0].count(), 1);
    assert_eq!(groups[1].grower_name, "Green Acres");
    assert_eq!(groups[1].count(), 2);
}

#[tokio::test]
async fn grower_history_filters_by_status() {
    let app = TestApp::new().await;
    let (grower, product) = app.seed_simple_product(0.0).await;
    let service = app.stock_updates();

    let first = service.submit(grower.id, product.id, None, &json!(1), None).await.unwrap();
    tick().await;
    service.submit(grower.id, product.id, None, &json!(2), None).await.unwrap();
    service
        .resolve(first.id, StockUpdateDecision::Rejected, "admin-1", None)
        .await
        .unwrap();

    let all = service.list_for_grower(grower.id, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].id, first.id);

    let rejected = service
        .list_for_grower(grower.id, Some(StockUpdateStatus::Rejected))
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].id, first.id);

    let unknown = service.list_for_grower(Uuid::new_v4(), None).await;
    assert_matches!(unknown, Err(ServiceError::NotFound(_)));
}
