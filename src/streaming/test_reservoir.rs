use super::Reservoir;
use crate::kernel::AskPolicy;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_keys_are_isolated() {
    let reservoir = Reservoir::new();
    let mut a = reservoir.subscribe("a").await.unwrap();
    let mut b = reservoir.subscribe("b").await.unwrap();
    reservoir.dispatch("a", 1);
    reservoir.dispatch("b", 2);
    reservoir.close("a");

    assert_eq!(a.next().await, Some(1));
    assert_eq!(a.next().await, None);
    assert_eq!(b.next().await, Some(2));
    assert!(timeout(Duration::from_millis(50), b.next()).await.is_err());
}

#[tokio::test]
async fn test_same_source_until_closed() {
    let reservoir = Reservoir::with_policy(AskPolicy::timeout(Duration::from_secs(1)));
    let first = reservoir.acquire("k").await.unwrap();
    let mut attached = first.attach();
    let again = reservoir.acquire("k").await.unwrap();
    again.next(5);
    reservoir.emit("k", 6).await;
    assert_eq!(attached.next().await, Some(5));
    assert_eq!(attached.next().await, Some(6));

    reservoir.close("k");
    let fresh = reservoir.acquire("k").await.unwrap();
    assert_eq!(attached.next().await, None);

    let mut renewed = fresh.attach();
    reservoir.emit("k", 7).await;
    assert_eq!(renewed.next().await, Some(7));
    // The old source stays complete
    assert_eq!(first.attach().next().await, None);
}

#[tokio::test]
async fn test_dispatch_to_unknown_key() {
    let reservoir = Reservoir::new();
    reservoir.dispatch("nobody", 1);
    let mut late = reservoir.subscribe("nobody").await.unwrap();
    reservoir.emit("nobody", 2).await;
    assert_eq!(late.next().await, Some(2));
}

#[tokio::test]
async fn test_closing_unknown_key() {
    let reservoir = Reservoir::<u8, u8>::new();
    reservoir.close(1);
    let mut nozzle = reservoir.subscribe(1).await.unwrap();
    reservoir.emit(1, 8).await;
    assert_eq!(nozzle.next().await, Some(8));
}

#[tokio::test]
async fn test_dropped_subscriber_leaves_its_source() {
    let reservoir = Reservoir::<&str, u8>::new();
    let source = reservoir.acquire("k").await.unwrap();
    let subscriber = reservoir.subscribe("k").await.unwrap();
    assert_eq!(source.subscriber_count().await, 1);

    drop(subscriber);
    timeout(Duration::from_secs(1), async {
        while source.subscriber_count().await != 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("Dropped subscriber stayed attached");
}
