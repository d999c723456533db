//! # Listener Replacement Tests
//!
//! The scenarios a UI goes through while a task keeps running:
//! - dismiss the listener, keep only the task id, rediscover through the registry
//! - notifications posted while detached collapse to the latest one
//! - a buffered notification is delivered exactly once
//! - listener failures go to its error handler and never reach the worker
//! - listener swaps from another thread stay ordered with concurrent posts

mod test_helpers;

use std::sync::Arc;
use std::time::Duration;

use tether::prelude::*;
use test_helpers::{Harness, ProgressViewMessage, Recorder, Seen, Steps};
use tokio::time::timeout;

const DEADLINE: Duration = Duration::from_secs(10);

fn progress(step: u32) -> ProgressViewMessage {
    ProgressViewMessage::PublishProgress { step }
}

#[tokio::test]
async fn test_rediscovery_after_listener_teardown() {
    let harness = Harness::new();
    let task = harness.task(Steps::new(6, Duration::from_millis(15)));
    let first = Recorder::new();
    task.set_listener(Some(first.clone()));
    task.execute(()).unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;

    // Save only the id, as a UI would across a configuration change.
    let saved = serde_json::to_string(&task.id()).unwrap();
    task.set_listener(None);
    drop(first);

    tokio::time::sleep(Duration::from_millis(40)).await;

    let id: TaskId = serde_json::from_str(&saved).unwrap();
    let connector = harness
        .registry
        .lookup::<ProgressViewMessage>(id)
        .expect("task still registered");
    let second = Recorder::new();
    connector.attach(second.clone());

    timeout(DEADLINE, task.join()).await.unwrap();
    harness.settle();

    let seen = second.seen();
    assert!(!seen.is_empty(), "the restored listener gets the latest buffered update");
    assert!(matches!(seen.last(), Some(Seen::Result(_))));

    let steps = second.progress();
    assert!(steps.windows(2).all(|w| w[0] < w[1]), "order preserved: {steps:?}");
    assert!(!harness.registry.contains(id), "finished task is evicted");
}

#[test]
fn test_detached_posts_collapse_to_latest() {
    let harness = Harness::new();
    let connector = Connector::<ProgressViewMessage>::new(&harness.registry, harness.queue()).unwrap();

    connector.post(progress(1));
    connector.post(progress(2));
    connector.post(progress(3));
    harness.settle();

    let view = Recorder::new();
    connector.attach(view.clone());
    harness.settle();

    assert_eq!(view.seen(), vec![Seen::Progress(3)]);
}

#[test]
fn test_buffered_notification_is_consumed_once() {
    let harness = Harness::new();
    let connector = Connector::<ProgressViewMessage>::new(&harness.registry, harness.queue()).unwrap();
    connector.post(progress(9));
    harness.settle();

    let first = Recorder::new();
    connector.attach(first.clone());
    connector.remove_listener();
    let second = Recorder::new();
    connector.attach(second.clone());
    harness.settle();

    assert_eq!(first.progress(), vec![9]);
    assert!(second.seen().is_empty());
}

#[test]
fn test_attach_detach_without_posts_delivers_nothing() {
    let harness = Harness::new();
    let connector = Connector::<ProgressViewMessage>::new(&harness.registry, harness.queue()).unwrap();

    let view = Recorder::new();
    connector.attach(view.clone());
    connector.remove_listener();
    connector.attach(view.clone());
    harness.settle();

    assert!(view.seen().is_empty());
    assert!(!connector.has_pending());
}

#[test]
fn test_listener_error_routed_to_its_handler() {
    let harness = Harness::new();
    let connector = Connector::<ProgressViewMessage>::new(&harness.registry, harness.queue()).unwrap();
    let view = Recorder::rejecting(2);
    connector.attach(view.clone());

    for step in 0..4 {
        connector.post(progress(step));
    }
    harness.settle();

    assert_eq!(view.progress(), vec![0, 1, 3]);
    let errors = view.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("publish_progress"));
    assert!(errors[0].contains("progress 2 rejected"));
}

#[test]
fn test_listener_error_without_handler_is_contained() {
    let harness = Harness::new();
    let connector = Connector::<ProgressViewMessage>::new(&harness.registry, harness.queue()).unwrap();
    let view = Recorder::rejecting_unhandled(0);
    connector.attach(view.clone());

    connector.post(progress(0));
    connector.post(progress(1));
    harness.settle();

    assert_eq!(view.progress(), vec![1]);
    assert!(view.errors().is_empty());
}

#[tokio::test]
async fn test_worker_unaffected_by_listener_errors() {
    let harness = Harness::new();
    let task = harness.task(Steps::new(4, Duration::from_millis(5)));
    let view = Recorder::rejecting(1);
    task.set_listener(Some(view.clone()));

    task.execute(()).unwrap();
    timeout(DEADLINE, task.join()).await.unwrap();
    harness.settle();

    assert_eq!(task.state(), TaskState::Completed);
    assert_eq!(view.progress(), vec![0, 2, 3]);
    assert!(matches!(view.seen().last(), Some(Seen::Result(_))));
}

#[test]
fn test_lookup_of_unknown_id_is_none() {
    let harness = Harness::new();
    let unknown = TaskId::from_raw(4242).unwrap();
    assert!(harness.registry.lookup::<ProgressViewMessage>(unknown).is_none());
}

#[test]
fn test_release_drops_registry_reference() {
    let harness = Harness::new();
    let connector = Connector::<ProgressViewMessage>::new(&harness.registry, harness.queue()).unwrap();
    let id = connector.id();

    assert!(harness.registry.release(id));
    assert!(harness.registry.lookup::<ProgressViewMessage>(id).is_none());

    // The connector itself keeps working for whoever still holds it.
    let view = Recorder::new();
    connector.attach(view.clone());
    connector.post(progress(5));
    harness.settle();
    assert_eq!(view.progress(), vec![5]);
}

#[tokio::test]
async fn test_tokio_dispatcher_delivers_in_order() {
    test_helpers::init_tracing();
    let registry = TaskRegistry::new();
    let dispatcher = Arc::new(TokioDispatcher::spawn());
    let connector = Connector::<ProgressViewMessage>::new(&registry, dispatcher.clone()).unwrap();
    let view = Recorder::new();
    connector.attach(view.clone());

    for step in 0..10 {
        connector.post(progress(step));
    }
    dispatcher.flush().await;

    assert_eq!(view.progress(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_swaps_racing_posts_keep_order_without_duplicates() {
    const POSTS: u32 = 2_000;
    const SWAPS: usize = 200;

    let harness = Harness::new();
    let connector = Connector::<ProgressViewMessage>::new(&harness.registry, harness.queue()).unwrap();

    let poster = {
        let connector = connector.clone();
        std::thread::spawn(move || {
            for step in 0..POSTS {
                connector.post(progress(step));
                if step % 64 == 0 {
                    std::thread::yield_now();
                }
            }
        })
    };
    let swapper = {
        let connector = connector.clone();
        std::thread::spawn(move || {
            let mut views = Vec::with_capacity(SWAPS + 1);
            for round in 0..SWAPS {
                let view = Recorder::new();
                connector.attach(view.clone());
                views.push(view);
                if round % 2 == 0 {
                    connector.remove_listener();
                }
                std::thread::yield_now();
            }
            views
        })
    };

    poster.join().unwrap();
    let mut views = swapper.join().unwrap();
    let last = Recorder::new();
    connector.attach(last.clone());
    views.push(last);
    harness.settle();

    let mut delivered = Vec::new();
    for view in &views {
        let steps = view.progress();
        assert!(steps.windows(2).all(|w| w[0] < w[1]), "out of order: {steps:?}");
        delivered.extend(steps);
    }
    // Listeners were installed in order, so their deliveries follow each other.
    assert!(
        delivered.windows(2).all(|w| w[0] < w[1]),
        "a notification reached two listeners or went backwards"
    );
    assert_eq!(delivered.last(), Some(&(POSTS - 1)));
}
