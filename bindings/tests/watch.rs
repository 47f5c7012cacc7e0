mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, LogData, B256};
use common::{log_of, FakeNode, CONTRACT};
use sovereign_ger_bindings::abi;
use sovereign_ger_bindings::{
    Error, EventRecord, GlobalExitRootEvent, GlobalExitRootManager, WatchEnd, WatchOpts,
    MAX_PENDING_EVENTS,
};
use tokio::sync::mpsc;
use tokio::time::timeout;

const PATIENCE: Duration = Duration::from_secs(5);

fn update(n: u8) -> abi::UpdateHashChainValue {
    abi::UpdateHashChainValue {
        newGlobalExitRoot: B256::with_last_byte(n),
        newHashChainValue: B256::repeat_byte(n),
    }
}

fn emit_update(node: &FakeNode, n: u8) {
    node.emit(log_of(CONTRACT, &update(n), u64::from(n), 0));
}

async fn recv<T>(rx: &mut mpsc::Receiver<T>) -> T {
    timeout(PATIENCE, rx.recv())
        .await
        .expect("no event delivered in time")
        .expect("watch closed the sink")
}

async fn released(node: &FakeNode, count: usize) {
    timeout(PATIENCE, async {
        while node.released() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("subscription not released in time");
}

fn manager(node: &Arc<FakeNode>) -> GlobalExitRootManager<FakeNode> {
    GlobalExitRootManager::new(CONTRACT, node.clone()).unwrap()
}

#[tokio::test]
async fn delivers_in_emission_order_until_cancelled() {
    let node = FakeNode::new();
    let (tx, mut rx) = mpsc::channel(16);
    let watch = manager(&node)
        .watch_update_hash_chain_value(&WatchOpts::default(), &[], &[], tx)
        .await
        .unwrap();

    for n in 1..=3 {
        emit_update(&node, n);
    }
    for n in 1..=3 {
        let record = recv(&mut rx).await;
        assert_eq!(record.event, update(n));
        assert_eq!(record.block_number(), Some(u64::from(n)));
    }

    assert_eq!(watch.stop().await.unwrap(), WatchEnd::Cancelled);
    assert_eq!(node.released(), 1);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn indexed_filters_apply_to_live_events() {
    let node = FakeNode::new();
    let remover = Address::repeat_byte(0x0d);
    let (tx, mut rx) = mpsc::channel(16);
    let watch = manager(&node)
        .watch_set_global_exit_root_remover(&WatchOpts::default(), &[remover], tx)
        .await
        .unwrap();

    for candidate in [Address::repeat_byte(0x0c), remover] {
        node.emit(log_of(
            CONTRACT,
            &abi::SetGlobalExitRootRemover {
                newGlobalExitRootRemover: candidate,
            },
            7,
            0,
        ));
    }
    // Same event from another contract.
    node.emit(log_of(
        Address::repeat_byte(0xee),
        &abi::SetGlobalExitRootRemover {
            newGlobalExitRootRemover: remover,
        },
        8,
        0,
    ));
    emit_update(&node, 9);

    let record = recv(&mut rx).await;
    assert_eq!(record.event.newGlobalExitRootRemover, remover);
    assert_eq!(watch.stop().await.unwrap(), WatchEnd::Cancelled);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn any_event_watch() {
    let node = FakeNode::new();
    let (tx, mut rx) = mpsc::channel::<EventRecord<GlobalExitRootEvent>>(16);
    let watch = manager(&node)
        .watch_all(&WatchOpts::default(), tx)
        .await
        .unwrap();

    node.emit(log_of(CONTRACT, &abi::Initialized { version: 1 }, 1, 0));
    emit_update(&node, 2);

    assert_eq!(
        recv(&mut rx).await.event,
        GlobalExitRootEvent::Initialized(abi::Initialized { version: 1 })
    );
    assert_eq!(
        recv(&mut rx).await.event,
        GlobalExitRootEvent::UpdateHashChainValue(update(2))
    );
    drop(watch);
    released(&node, 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_racing_delivery_releases_once() {
    let node = FakeNode::new();
    let manager = manager(&node);

    for round in 0..50usize {
        let (tx, mut rx) = mpsc::channel(1);
        let watch = manager
            .watch_update_hash_chain_value(&WatchOpts::default(), &[], &[], tx)
            .await
            .unwrap();

        // Enough events to keep delivery blocked on the full sink.
        for n in 0..4 {
            emit_update(&node, n);
        }
        for _ in 0..round % 3 {
            recv(&mut rx).await;
        }

        assert_eq!(watch.stop().await.unwrap(), WatchEnd::Cancelled);
        assert_eq!(node.released(), round + 1);

        // Nothing arrives after the stop beyond what was already buffered.
        emit_update(&node, 5);
        let mut leftover = 0;
        while rx.recv().await.is_some() {
            leftover += 1;
        }
        assert!(leftover <= 1, "round {round}: {leftover} leftover events");
    }
}

#[tokio::test]
async fn dropping_the_handle_cancels() {
    let node = FakeNode::new();
    let (tx, mut rx) = mpsc::channel(16);
    let watch = manager(&node)
        .watch_initialized(&WatchOpts::default(), tx)
        .await
        .unwrap();
    drop(watch);

    released(&node, 1).await;
    assert!(rx.recv().await.is_none());
    assert_eq!(node.released(), 1);
}

#[tokio::test]
async fn malformed_log_ends_the_watch() {
    let node = FakeNode::new();
    let (tx, mut rx) = mpsc::channel(16);
    let watch = manager(&node)
        .watch_update_hash_chain_value(&WatchOpts::default(), &[], &[], tx)
        .await
        .unwrap();

    emit_update(&node, 1);
    let mut broken = log_of(CONTRACT, &update(2), 2, 0);
    let topics = broken.topics()[..1].to_vec();
    broken.inner.data = LogData::new_unchecked(topics, Default::default());
    node.emit(broken);
    emit_update(&node, 3);

    assert_eq!(recv(&mut rx).await.event, update(1));
    let end = timeout(PATIENCE, watch.join()).await.unwrap();
    assert!(matches!(end, Err(Error::Decode { .. })), "{end:?}");
    assert!(rx.recv().await.is_none());
    assert_eq!(node.released(), 1);
}

#[tokio::test]
async fn closed_sink_ends_the_watch() {
    let node = FakeNode::new();
    let (tx, rx) = mpsc::channel(16);
    let watch = manager(&node)
        .watch_update_hash_chain_value(&WatchOpts::default(), &[], &[], tx)
        .await
        .unwrap();
    drop(rx);

    emit_update(&node, 1);
    let end = timeout(PATIENCE, watch.join()).await.unwrap();
    assert_eq!(end.unwrap(), WatchEnd::SinkClosed);
    assert_eq!(node.released(), 1);
}

#[tokio::test]
async fn feed_failure_preempts_blocked_delivery() {
    let node = FakeNode::new();
    let (tx, mut rx) = mpsc::channel(1);
    let watch = manager(&node)
        .watch_update_hash_chain_value(&WatchOpts::default(), &[], &[], tx)
        .await
        .unwrap();

    for n in 1..=3 {
        emit_update(&node, n);
    }
    node.fail_feeds();

    // Nobody drains the sink, the failure still ends the watch.
    let end = timeout(PATIENCE, watch.join()).await.unwrap();
    assert!(matches!(end, Err(Error::SubscriptionDropped(_))), "{end:?}");
    assert_eq!(node.released(), 1);
    assert!(rx.recv().await.is_some_and(|record| record.event == update(1)));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn lagging_consumer_ends_the_watch() {
    let node = FakeNode::new();
    let (tx, mut rx) = mpsc::channel(1);
    let watch = manager(&node)
        .watch_update_hash_chain_value(&WatchOpts::default(), &[], &[], tx)
        .await
        .unwrap();

    // One in the sink, a full queue behind it, then more.
    for block in 0..MAX_PENDING_EVENTS as u64 + 76 {
        node.emit(log_of(CONTRACT, &update(block as u8), block, 0));
    }
    node.fail_feeds();

    let end = timeout(PATIENCE, watch.join()).await.unwrap();
    match end {
        Err(Error::SubscriptionDropped(reason)) => assert!(reason.contains("lagged"), "{reason}"),
        other => panic!("unexpected end {other:?}"),
    }
    assert_eq!(node.released(), 1);
    assert!(rx.recv().await.is_some_and(|record| record.event == update(0)));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn ended_feed_ends_the_watch() {
    let node = FakeNode::new();
    let (tx, _rx) = mpsc::channel(16);
    let watch = manager(&node)
        .watch_update_removal_hash_chain_value(&WatchOpts::default(), &[], &[], tx)
        .await
        .unwrap();

    node.close_feeds();
    let end = timeout(PATIENCE, watch.join()).await.unwrap();
    assert!(matches!(end, Err(Error::SubscriptionDropped(_))), "{end:?}");
    assert_eq!(node.released(), 1);
}
