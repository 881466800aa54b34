use cartsync_core::ids::ProductId;
use cartsync_core::model::Product;
use cartsync_engine::{AnalyticsEvent, EngineError, MutationOutcome, NoticeLevel};
use cartsync_harness::{ApiCall, TestClient};

fn burger() -> Product {
    Product::new("p1", "Classic Burger", 10.0)
}

fn fries() -> Product {
    Product::new("p2", "Fries", 4.0)
}

// ============================================================================
// Queueing
// ============================================================================

#[tokio::test]
async fn offline_add_queues_instead_of_calling_out() -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    client.api.seed_catalog(vec![burger()]);
    client.engine.go_offline();

    let outcome = client.engine.add_item(&burger(), 1, &[]).await?;

    assert_eq!(outcome, MutationOutcome::Queued);
    assert_eq!(client.engine.cart().len(), 1);
    assert_eq!(client.engine.pending_ops(), 1);
    assert!(client.engine.is_dirty());
    assert!(client.api.items().is_empty());
    assert_eq!(client.api.mutation_calls(), 0);
    assert!(client
        .notifier
        .messages_at(NoticeLevel::Info)
        .iter()
        .any(|m| m.contains("offline")));
    Ok(())
}

#[tokio::test]
async fn draining_confirms_the_same_state_without_duplicates(
) -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    client.api.seed_catalog(vec![burger()]);
    client.engine.go_offline();
    client.engine.add_item(&burger(), 1, &[]).await?;

    let report = client.engine.go_online().await?;

    assert_eq!(report.resolved, 1);
    assert_eq!(report.pending, 0);
    assert_eq!(client.engine.pending_ops(), 0);
    assert!(!client.engine.is_dirty());

    // Exactly one line with quantity 1, locally and on the server, and
    // exactly one POST was made.
    let cart = client.engine.cart();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.items()[0].quantity, 1);
    let server = client.api.items();
    assert_eq!(server.len(), 1);
    assert_eq!(server[0].quantity, 1);
    assert_eq!(client.api.mutation_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn queued_operations_replay_in_fifo_order() -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    client.api.seed_catalog(vec![burger(), fries()]);
    client.engine.go_offline();

    client.engine.add_item(&burger(), 1, &[]).await?;
    client.engine.add_item(&fries(), 2, &[]).await?;
    client
        .engine
        .update_quantity(&ProductId::from("p1"), 3, None)
        .await?;
    assert_eq!(client.engine.pending_ops(), 3);

    let report = client.engine.go_online().await?;
    assert_eq!(report.resolved, 3);

    let calls = client.api.calls();
    let mutations: Vec<&ApiCall> = calls
        .iter()
        .filter(|c| !matches!(c, ApiCall::Fetch))
        .collect();
    assert!(matches!(mutations[0], ApiCall::Add { product_id, .. } if product_id.as_str() == "p1"));
    assert!(matches!(mutations[1], ApiCall::Add { product_id, .. } if product_id.as_str() == "p2"));
    assert!(
        matches!(mutations[2], ApiCall::Update { product_id, quantity } if product_id.as_str() == "p1" && *quantity == 3)
    );

    let server = client.api.items();
    assert_eq!(server.len(), 2);
    assert_eq!(server[0].quantity, 3);
    assert_eq!(server[1].quantity, 2);
    Ok(())
}

#[tokio::test]
async fn queued_removal_replays_against_the_server() -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    client.api.seed_catalog(vec![burger()]);
    client.engine.add_item(&burger(), 1, &[]).await?;

    client.engine.go_offline();
    client
        .engine
        .remove_item(&ProductId::from("p1"), None)
        .await?;
    assert!(client.engine.cart().is_empty());
    assert_eq!(client.api.items().len(), 1);

    client.engine.go_online().await?;

    assert!(client.engine.cart().is_empty());
    assert!(client.api.items().is_empty());
    Ok(())
}

// ============================================================================
// Replay failure handling
// ============================================================================

#[tokio::test]
async fn replays_are_abandoned_after_the_retry_cap() -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    client.api.seed_catalog(vec![burger()]);
    client.engine.go_offline();
    client.engine.add_item(&burger(), 1, &[]).await?;
    client.api.fail_next_mutations(100);

    // Pass 1 (scheduled by the reconnect) and pass 2 leave the op queued
    // with a bumped attempt counter; pass 3 abandons it.
    let first = client.engine.go_online().await?;
    assert_eq!(first.resolved, 0);
    assert_eq!(first.pending, 1);

    let second = client.engine.process_queue().await?;
    assert_eq!(second.pending, 1);

    let third = client.engine.process_queue().await?;
    assert_eq!(third.abandoned, 1);
    assert_eq!(third.pending, 0);
    assert_eq!(client.engine.pending_ops(), 0);

    // The optimistic item stays; the cart simply remains dirty until a
    // later full sync reconciles it.
    assert_eq!(client.engine.cart().len(), 1);
    assert!(client.engine.is_dirty());
    Ok(())
}

#[tokio::test]
async fn a_failing_op_does_not_block_the_rest_of_the_queue(
) -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    // Only the burger is in the catalog: the fries add will fail on every
    // replay, the burger add must still resolve.
    client.api.seed_catalog(vec![burger()]);
    client.engine.go_offline();
    client.engine.add_item(&fries(), 1, &[]).await?;
    client.engine.add_item(&burger(), 1, &[]).await?;

    let report = client.engine.go_online().await?;

    assert_eq!(report.resolved, 1);
    assert_eq!(report.pending, 1);
    assert_eq!(client.api.items().len(), 1);
    assert_eq!(client.api.items()[0].product.id.as_str(), "p1");
    Ok(())
}

#[tokio::test]
async fn drain_reports_counts_to_the_user_and_analytics(
) -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    client.api.seed_catalog(vec![burger()]);
    client.engine.go_offline();
    client.engine.add_item(&burger(), 1, &[]).await?;

    client.engine.go_online().await?;

    assert!(client
        .analytics
        .events()
        .iter()
        .any(|e| matches!(e, AnalyticsEvent::QueueProcessed { resolved: 1, pending: 0 })));
    assert!(client
        .notifier
        .messages_at(NoticeLevel::Info)
        .iter()
        .any(|m| m.contains("Synced")));
    Ok(())
}

#[tokio::test]
async fn concurrent_drains_never_replay_an_op_twice() -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    client.api.seed_catalog(vec![burger()]);
    client.engine.go_offline();
    client.engine.add_item(&burger(), 1, &[]).await?;

    // Fail the reconnect drain so the op is still pending while online,
    // then race two drains against it.
    client.api.fail_next_mutations(3);
    let report = client.engine.go_online().await?;
    assert_eq!(report.pending, 1);

    let (a, b) = tokio::join!(client.engine.process_queue(), client.engine.process_queue());
    let (a, b) = (a?, b?);

    assert_eq!(a.resolved + b.resolved, 1);
    let server = client.api.items();
    assert_eq!(server.len(), 1);
    assert_eq!(server[0].quantity, 1);
    Ok(())
}

// ============================================================================
// Sync coordinator
// ============================================================================

#[tokio::test]
async fn sync_fails_fast_when_offline() -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    client.engine.go_offline();
    let result = client.engine.sync_with_server().await;
    assert!(matches!(result, Err(EngineError::Offline)));
    Ok(())
}

#[tokio::test]
async fn sync_pulls_authoritative_state_then_replays_the_queue(
) -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    client.api.seed_catalog(vec![burger(), fries()]);
    client
        .api
        .seed_cart(vec![burger_line(1)], 5);

    // Queue an add offline, and force the reconnect drain to fail so the
    // op is still pending when sync runs.
    client.engine.go_offline();
    client.engine.add_item(&fries(), 2, &[]).await?;
    client.api.fail_next_mutations(3);
    let report = client.engine.go_online().await?;
    assert_eq!(report.pending, 1);

    let report = client.engine.sync_with_server().await?;

    assert_eq!(report.resolved, 1);
    assert_eq!(report.pending, 0);
    assert!(!client.engine.is_dirty());

    // Authoritative burger plus the replayed fries, on both sides.
    let cart = client.engine.cart();
    let mut local: Vec<(String, u32)> = cart
        .items()
        .iter()
        .map(|i| (i.product.id.as_str().to_string(), i.quantity))
        .collect();
    local.sort();
    let mut server: Vec<(String, u32)> = client
        .api
        .items()
        .iter()
        .map(|i| (i.product.id.as_str().to_string(), i.quantity))
        .collect();
    server.sort();
    assert_eq!(local, vec![("p1".into(), 1), ("p2".into(), 2)]);
    assert_eq!(local, server);

    assert!(client
        .analytics
        .events()
        .iter()
        .any(|e| matches!(e, AnalyticsEvent::CartSynced { .. })));
    Ok(())
}

fn burger_line(quantity: u32) -> cartsync_core::model::CartLineItem {
    cartsync_core::model::CartLineItem::new(burger(), quantity, Vec::new())
}
