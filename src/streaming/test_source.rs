use super::{Nozzle, Source};
use std::time::Duration;
use tokio::{sync::mpsc, time::timeout};
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

async fn drain(nozzle: Nozzle<u32>) -> Vec<u32> {
    timeout(Duration::from_secs(1), nozzle.collect())
        .await
        .expect("Nozzle did not end")
}

#[tokio::test]
async fn test_every_nozzle_sees_the_same_values() {
    let source = Source::new();
    let first = source.attach();
    let second = source.attach();
    for i in 0..20 {
        source.emit(i).await;
    }
    source.end().await;
    let expected: Vec<u32> = (0..20).collect();
    assert_eq!(drain(first).await, expected);
    assert_eq!(drain(second).await, expected);
}

#[tokio::test]
async fn test_values_are_not_retained() {
    let source = Source::new();
    source.next(1);
    let late = source.attach();
    source.next(2);
    source.complete();
    assert_eq!(drain(late).await, vec![2]);
}

#[tokio::test]
async fn test_attach_after_complete() {
    let source = Source::<u32>::new();
    source.complete();
    let mut nozzle = source.attach();
    assert_eq!(nozzle.next().await, None);

    source.next(3);
    let mut another = source.attach();
    assert_eq!(another.next().await, None);
}

#[tokio::test]
async fn test_detach() {
    let source = Source::new();
    let mut kept = source.attach();
    let mut detached = source.attach();
    source.detach(detached.id());
    source.emit(1).await;
    assert_eq!(kept.next().await, Some(1));
    // Detaching leaves the nozzle open
    assert!(timeout(Duration::from_millis(50), detached.next())
        .await
        .is_err());
    detached.close();
    assert_eq!(detached.next().await, None);
}

#[tokio::test]
async fn test_recipient_broadcasts() {
    let source = Source::new();
    let nozzle = source.attach();
    let recipient = source.recipient();
    recipient.tell(4);
    recipient.send(5).await;
    source.complete();
    assert_eq!(drain(nozzle).await, vec![4, 5]);
}

#[tokio::test]
async fn test_upstream() {
    let (sender, receiver) = mpsc::unbounded_channel();
    let source = Source::upstream(UnboundedReceiverStream::new(receiver));
    let nozzle = source.attach();
    // Make sure the attach went through before anything is produced
    source.emit(0).await;
    for i in 1..=3 {
        sender.send(i).unwrap();
    }
    drop(sender);
    assert_eq!(drain(nozzle).await, vec![0, 1, 2, 3]);
}

async fn wait_for_subscribers(source: &Source<u32>, expected: usize) {
    timeout(Duration::from_secs(1), async {
        while source.subscriber_count().await != expected {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("Subscriber count never settled");
}

#[tokio::test]
async fn test_terminated_nozzles_detach_themselves() {
    let source = Source::new();
    let kept = source.attach();
    let dropped = source.attach();
    let shut = source.attach();
    assert_eq!(source.subscriber_count().await, 3);

    drop(dropped);
    wait_for_subscribers(&source, 2).await;
    shut.shutdown();
    wait_for_subscribers(&source, 1).await;

    source.emit(9).await;
    source.end().await;
    assert_eq!(drain(kept).await, vec![9]);
    assert_eq!(source.subscriber_count().await, 0);
}
