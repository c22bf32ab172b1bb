//! Ordering service behaviour against the in-memory unit of work.
//!
//! Coverage:
//! - Shift on insert / delete
//! - Renumbering (idempotence, repair of duplicates and gaps, batching)
//! - Best-effort batch reorder with missing entities
//! - Rollback when the storage layer fails mid-operation
//! - Lost update between concurrent transactions, and the serialised wrapper

use entity_ordering::{
    EntityOrderingService, FaultPoint, InMemoryUnitOfWork, OrderColumn, Orderable,
    OrderingConfig, OrderingError, OrderingService, OrderingTransaction, ReorderItem,
    SerializedOrderingService, UnitOfWork,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Clone, PartialEq)]
struct Article {
    id: String,
    display_order: i32,
}

impl Orderable for Article {
    const TABLE: &'static str = "articles";

    fn id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> i32 {
        self.display_order
    }

    fn set_order(&mut self, order: i32) {
        self.display_order = order;
    }
}

type ArticleStore = InMemoryUnitOfWork<Article>;
type ArticleOrdering = EntityOrderingService<Article, ArticleStore>;

fn article(id: &str, display_order: i32) -> Article {
    Article {
        id: id.to_string(),
        display_order,
    }
}

/// Rows `a1..aN` with orders taken from `orders`.
fn store(orders: &[i32]) -> ArticleStore {
    InMemoryUnitOfWork::with_rows(
        orders
            .iter()
            .enumerate()
            .map(|(i, order)| article(&format!("a{}", i + 1), *order))
            .collect(),
    )
}

fn column() -> OrderColumn {
    OrderColumn::display_order()
}

#[tokio::test]
async fn test_insert_shifts_rows_at_and_after_position() {
    for k in 1..=6 {
        let uow = store(&[1, 2, 3, 4, 5]);
        let service = ArticleOrdering::new(uow.clone());

        assert_ok!(service.reorder_after_insert("new", k, &column()).await);

        let orders = uow.orders().await;
        for n in 1..=5 {
            let expected = if n >= k { n + 1 } else { n };
            assert_eq!(orders[&format!("a{n}")], expected, "k={k}, row a{n}");
        }
    }
}

#[tokio::test]
async fn test_delete_shifts_rows_after_position() {
    for k in 1..=5 {
        let uow = store(&[1, 2, 3, 4, 5]);
        let service = ArticleOrdering::new(uow.clone());

        assert_ok!(service.reorder_after_delete(k, &column()).await);

        let orders = uow.orders().await;
        for n in 1..=5 {
            let expected = if n > k { n - 1 } else { n };
            assert_eq!(orders[&format!("a{n}")], expected, "k={k}, row a{n}");
        }
        assert!(orders.values().all(|order| *order > 0));
    }
}

#[tokio::test]
async fn test_five_article_insert_then_delete_scenario() {
    let uow = store(&[1, 2, 3, 4, 5]);
    let service = ArticleOrdering::new(uow.clone());

    // Make room at 3, then the caller writes its row there.
    assert_ok!(service.reorder_after_insert("a6", 3, &column()).await);
    assert_eq!(uow.sorted_orders().await, vec![1, 2, 4, 5, 6]);
    uow.insert(article("a6", 3)).await;
    assert_eq!(uow.sorted_orders().await, vec![1, 2, 3, 4, 5, 6]);

    // Caller deletes the row at 3, then the gap is closed.
    let removed = uow.remove("a6").await.expect("a6 exists");
    assert_ok!(service.reorder_after_delete(removed.display_order, &column()).await);

    let orders = uow.orders().await;
    assert_eq!(orders["a1"], 1);
    assert_eq!(orders["a2"], 2);
    assert_eq!(orders["a3"], 3);
    assert_eq!(orders["a4"], 4);
    assert_eq!(orders["a5"], 5);
}

#[tokio::test]
async fn test_validate_and_fix_is_idempotent_on_contiguous_orders() {
    let uow = store(&[3, 1, 2, 5, 4]);
    let before = uow.orders().await;
    let service = ArticleOrdering::new(uow.clone());

    let total = assert_ok!(service.validate_and_fix_order(&column()).await);

    assert_eq!(total, 5);
    assert_eq!(uow.orders().await, before);
}

#[tokio::test]
async fn test_validate_and_fix_repairs_duplicates_and_gaps() {
    // a1=1, a2=1, a3=4: ties keep id order.
    let uow = store(&[1, 1, 4]);
    let service = ArticleOrdering::new(uow.clone());

    assert_ok!(service.validate_and_fix_order(&column()).await);

    let orders = uow.orders().await;
    assert_eq!(orders["a1"], 1);
    assert_eq!(orders["a2"], 2);
    assert_eq!(orders["a3"], 3);
}

#[tokio::test]
async fn test_validate_and_fix_preserves_relative_order_across_batches() {
    let orders: Vec<i32> = (0..25).map(|i| 100 - i * 3).collect();
    let uow = store(&orders);
    let service =
        ArticleOrdering::with_config(uow.clone(), OrderingConfig::default().with_batch_size(4));

    let total = assert_ok!(service.validate_and_fix_order(&column()).await);

    assert_eq!(total, 25);
    assert_eq!(uow.sorted_orders().await, (1..=25).collect::<Vec<_>>());
    // Orders were descending by id, so the last id is now first.
    let fixed = uow.orders().await;
    assert_eq!(fixed["a25"], 1);
    assert_eq!(fixed["a1"], 25);
    assert_eq!(uow.committed_transactions(), 1);
}

#[tokio::test]
async fn test_batch_reorder_skips_missing_entities() {
    let uow = store(&[1, 2, 3]);
    let service = ArticleOrdering::new(uow.clone());

    let summary = service
        .process_batch_reorder(
            &[
                ReorderItem::new("a3", 1),
                ReorderItem::new("does-not-exist", 2),
                ReorderItem::new("a1", 4),
            ],
            &column(),
        )
        .await;

    assert_eq!(summary.processed, 2);
    assert!(summary.failed >= 1);
    assert_eq!(summary.total(), 3);
    // Two successful shifts: >=1 (+1), then >=4 (+1).
    assert_eq!(uow.sorted_orders().await, vec![2, 3, 5]);
}

#[tokio::test]
async fn test_batch_reorder_isolates_storage_failures() {
    let uow = store(&[1, 2]);
    uow.inject_fault(FaultPoint::Shift).await;
    let service = ArticleOrdering::new(uow.clone());

    let summary = service
        .process_batch_reorder(
            &[ReorderItem::new("a1", 1), ReorderItem::new("a2", 2)],
            &column(),
        )
        .await;

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed, 2);
    assert_eq!(uow.sorted_orders().await, vec![1, 2]);
}

#[tokio::test]
async fn test_insert_rolls_back_on_shift_failure() {
    let uow = store(&[1, 2, 3]);
    uow.inject_fault(FaultPoint::Shift).await;
    let service = ArticleOrdering::new(uow.clone());

    let err = assert_err!(service.reorder_after_insert("new", 1, &column()).await);

    assert!(matches!(err, OrderingError::Storage(_)));
    assert_eq!(uow.sorted_orders().await, vec![1, 2, 3]);
    assert_eq!(uow.rolled_back_transactions(), 1);
    assert_eq!(uow.committed_transactions(), 0);
}

#[tokio::test]
async fn test_delete_propagates_commit_failure() {
    let uow = store(&[1, 2, 3]);
    uow.inject_fault(FaultPoint::Commit).await;
    let service = ArticleOrdering::new(uow.clone());

    assert_err!(service.reorder_after_delete(1, &column()).await);
    assert_eq!(uow.sorted_orders().await, vec![1, 2, 3]);

    uow.clear_faults().await;
    assert_ok!(service.reorder_after_delete(1, &column()).await);
    assert_eq!(uow.sorted_orders().await, vec![1, 1, 2]);
}

#[tokio::test]
async fn test_validate_and_fix_rolls_back_every_batch() {
    let uow = store(&[10, 20, 30, 40, 50, 60]);
    // First two batches flush, the third fails.
    uow.inject_fault(FaultPoint::SaveBatch(3)).await;
    let service =
        ArticleOrdering::with_config(uow.clone(), OrderingConfig::default().with_batch_size(2));

    assert_err!(service.validate_and_fix_order(&column()).await);

    assert_eq!(uow.sorted_orders().await, vec![10, 20, 30, 40, 50, 60]);
    assert_eq!(uow.rolled_back_transactions(), 1);
}

#[tokio::test]
async fn test_validate_and_fix_with_zero_batch_size() {
    let uow = store(&[5, 3]);
    let config = OrderingConfig {
        batch_size: 0,
        ..OrderingConfig::default()
    };
    let service = ArticleOrdering::with_config(uow.clone(), config);

    let total = assert_ok!(service.validate_and_fix_order(&column()).await);

    assert_eq!(total, 2);
    let orders = uow.orders().await;
    assert_eq!(orders["a1"], 2);
    assert_eq!(orders["a2"], 1);
}

#[tokio::test]
async fn test_insert_overflow_rolls_back() {
    let uow = InMemoryUnitOfWork::with_rows(vec![article("a1", 1), article("a2", i32::MAX)]);
    let service = ArticleOrdering::new(uow.clone());

    let err = assert_err!(service.reorder_after_insert("x", 1, &column()).await);

    assert!(matches!(err, OrderingError::Storage(_)));
    assert_eq!(uow.sorted_orders().await, vec![1, i32::MAX]);
    assert_eq!(uow.rolled_back_transactions(), 1);
    assert_eq!(uow.committed_transactions(), 0);
}

#[tokio::test]
async fn test_ties_break_by_bytewise_id() {
    let uow = InMemoryUnitOfWork::with_rows(vec![article("a", 1), article("B", 1)]);
    let service = ArticleOrdering::new(uow.clone());

    assert_ok!(service.validate_and_fix_order(&column()).await);

    let orders = uow.orders().await;
    assert_eq!(orders["B"], 1);
    assert_eq!(orders["a"], 2);
}

#[tokio::test]
async fn test_concurrent_transactions_lose_an_update() {
    let uow = store(&[1, 2, 3]);

    // Two overlapping insert-reorders at position 1 with no locking.
    let mut first = UnitOfWork::<Article>::begin(&uow, &column()).await.unwrap();
    let mut second = UnitOfWork::<Article>::begin(&uow, &column()).await.unwrap();
    first.shift_orders(&column(), 1, 1).await.unwrap();
    second.shift_orders(&column(), 1, 1).await.unwrap();
    first.commit().await.unwrap();
    second.commit().await.unwrap();

    // Serialised, the rows would be at 3, 4, 5.
    assert_eq!(uow.sorted_orders().await, vec![2, 3, 4]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_serialized_service_applies_every_shift() {
    let uow = store(&[1, 2, 3, 4]);
    let service = Arc::new(SerializedOrderingService::new(ArticleOrdering::new(
        uow.clone(),
    )));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            OrderingService::<Article>::reorder_after_insert(&*service, "new", 1, &column()).await
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    assert_eq!(uow.sorted_orders().await, vec![9, 10, 11, 12]);
    assert_eq!(uow.committed_transactions(), 8);
}

#[tokio::test]
async fn test_invalid_column_name_is_rejected() {
    let err = assert_err!(OrderColumn::new("display_order = 0 --"));
    assert!(matches!(err, OrderingError::InvalidColumn(_)));
}
