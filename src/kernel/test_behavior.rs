use super::{spawn, spawn_checked, spawn_fn, ActorError, AskPolicy, Behavior, Recipient, Signal};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::mpsc;

enum TestMessage {
    Record(usize),
    IgnoreNext(usize),
    Stop,
    Explode,
}

struct TestActor {
    seen: Vec<usize>,
    fail_initialization: bool,
    drop_notifier: mpsc::Sender<Vec<usize>>,
}

impl TestActor {
    fn new(fail_initialization: bool) -> (TestActor, mpsc::Receiver<Vec<usize>>) {
        let (drop_sender, drop_receiver) = mpsc::channel(2);
        (
            TestActor {
                seen: Vec::new(),
                fail_initialization,
                drop_notifier: drop_sender,
            },
            drop_receiver,
        )
    }
}

#[async_trait]
impl Behavior for TestActor {
    type Message = TestMessage;

    fn get_name(&self) -> String {
        "test_actor".to_owned()
    }

    async fn on_message(&mut self, message: TestMessage) -> Signal {
        match message {
            TestMessage::Record(n) => {
                self.seen.push(n);
                Signal::Running
            }
            TestMessage::IgnoreNext(n) => Signal::Ignoring(n),
            TestMessage::Stop => Signal::Stopped,
            TestMessage::Explode => panic!("Exploded on purpose"),
        }
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.fail_initialization {
            Err(anyhow!("Forced initialization fail"))
        } else {
            Ok(())
        }
    }

    async fn tear_down(&mut self) -> Result<()> {
        Ok(self.drop_notifier.send(self.seen.clone()).await?)
    }
}

#[tokio::test]
async fn test_tell_preserves_order() {
    let (actor, mut notifier) = TestActor::new(false);
    let handle = spawn(actor);
    for i in 0..=100 {
        handle.tell(TestMessage::Record(i));
    }
    drop(handle);
    let seen = notifier.recv().await.expect("tear_down not called");
    assert_eq!(seen, (0..=100).collect::<Vec<_>>());
}

enum Probe {
    Seen(usize),
    Last(Recipient<Option<usize>>),
}

#[tokio::test]
async fn test_last_seen_after_draining() {
    let handle = spawn_fn("last_seen", None, |last: &mut Option<usize>, probe: Probe| {
        match probe {
            Probe::Seen(n) => {
                assert_eq!(n, last.map_or(0, |l| l + 1));
                *last = Some(n);
            }
            Probe::Last(reply) => reply.tell(*last),
        }
        Signal::Running
    });
    for i in 0..=1000 {
        handle.tell(Probe::Seen(i));
    }
    let last = handle
        .ask(Probe::Last, AskPolicy::timeout(Duration::from_secs(1)))
        .await
        .expect("Actor did not reply");
    assert_eq!(last, Some(1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handler_never_overlaps() {
    let guard = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let handled = Arc::new(AtomicUsize::new(0));

    struct Guarded {
        guard: Arc<AtomicUsize>,
        overlaps: Arc<AtomicUsize>,
        handled: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Behavior for Guarded {
        type Message = usize;

        fn get_name(&self) -> String {
            "guarded".to_owned()
        }

        async fn on_message(&mut self, _: usize) -> Signal {
            if self.guard.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            tokio::task::yield_now().await;
            self.guard.fetch_sub(1, Ordering::SeqCst);
            self.handled.fetch_add(1, Ordering::SeqCst);
            Signal::Running
        }
    }

    let handle = spawn(Guarded {
        guard: guard.clone(),
        overlaps: overlaps.clone(),
        handled: handled.clone(),
    });
    let senders: Vec<_> = (0..16)
        .map(|k| {
            let handle = handle.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    handle.tell(k * 100 + i);
                }
                handle.send(k).await
            })
        })
        .collect();
    for sender in senders {
        sender.await.unwrap().unwrap();
    }
    assert_eq!(handled.load(Ordering::SeqCst), 16 * 51);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ignoring_drops_exact_count() {
    let (actor, mut notifier) = TestActor::new(false);
    let handle = spawn(actor);
    handle.tell(TestMessage::Record(1));
    handle.tell(TestMessage::IgnoreNext(2));
    handle.tell(TestMessage::Record(2));
    handle.tell(TestMessage::Record(3));
    handle.tell(TestMessage::Record(4));
    handle.send(TestMessage::Record(5)).await.unwrap();
    drop(handle);
    let seen = notifier.recv().await.unwrap();
    assert_eq!(seen, vec![1, 4, 5]);
}

#[tokio::test]
async fn test_stopped_drops_everything() {
    let (actor, mut notifier) = TestActor::new(false);
    let handle = spawn(actor);
    handle.tell(TestMessage::Record(1));
    handle.tell(TestMessage::Stop);
    let seen = notifier.recv().await.expect("tear_down not called on stop");
    assert_eq!(seen, vec![1]);

    // Still acknowledged, never handled
    handle.send(TestMessage::Record(2)).await.unwrap();
    handle.send(TestMessage::Explode).await.unwrap();
    drop(handle);
    // tear_down runs only once
    assert!(notifier.recv().await.is_none());
}

#[tokio::test]
async fn test_handler_fault() {
    let (actor, _notifier) = TestActor::new(false);
    let handle = spawn(actor);
    let error = handle
        .send(TestMessage::Explode)
        .await
        .expect_err("Panicking handler should be reported");
    assert_eq!(
        error,
        ActorError::HandlerFault {
            actor: "test_actor".to_owned()
        }
    );
    assert!(handle.is_closed());
    assert!(handle.send(TestMessage::Record(1)).await.is_err());
    // Telling a dead actor is not an error for the caller
    handle.tell(TestMessage::Record(2));
}

#[tokio::test]
async fn test_spawn_checked() {
    let (actor, mut notifier) = TestActor::new(false);
    let handle = spawn_checked(actor).await.expect("No handle returned");
    handle.send(TestMessage::Record(7)).await.unwrap();
    drop(handle);
    assert_eq!(notifier.recv().await.unwrap(), vec![7]);
}

#[tokio::test]
async fn test_initialization_failure() {
    let (actor, _) = TestActor::new(true);
    assert!(spawn_checked(actor).await.is_err());

    let (actor, mut notifier) = TestActor::new(true);
    let handle = spawn(actor);
    handle.send(TestMessage::Record(1)).await.unwrap();
    drop(handle);
    // A failed actor is never torn down
    assert!(notifier.recv().await.is_none());
}

#[tokio::test]
async fn test_pipe_stream() {
    let (actor, mut notifier) = TestActor::new(false);
    let handle = spawn(actor);
    let items = tokio_stream::iter((1..=3).map(TestMessage::Record));
    handle
        .pipe_stream(items, Some(TestMessage::Stop))
        .await
        .unwrap();
    let seen = tokio::time::timeout(Duration::from_secs(1), notifier.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen, vec![1, 2, 3]);
}
