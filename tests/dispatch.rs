use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use queue_lens::command::{Command, Dispatcher, execute, persist_message};
use queue_lens::config::QueueConfig;
use queue_lens::event::Event;
use queue_lens::message::{MessageFormat, RawMessage};
use queue_lens::queue::{InMemoryQueue, QueueClient, QueueError};
use tokio::sync::mpsc;
use uuid::Uuid;

fn config() -> QueueConfig {
    QueueConfig::new(
        "https://sqs.eu-west-1.amazonaws.com/000000000000/orders",
        MessageFormat::Json,
    )
    .with_context_key("tenant")
}

fn scratch_dir() -> PathBuf {
    env::temp_dir().join(format!("queue-lens-test-{}", Uuid::new_v4()))
}

fn fetch(max_messages: i32) -> Command {
    Command::FetchMessages {
        max_messages,
        wait_seconds: 0,
        generation: 3,
    }
}

#[tokio::test]
async fn fetch_decodes_in_receipt_order_and_keeps_raw() {
    let queue = InMemoryQueue::with_messages([
        ("a", r#"{"tenant":"t1"}"#),
        ("b", "oops"),
        ("c", r#"{"tenant":"t2"}"#),
    ]);

    let event = execute(fetch(10), &queue, &config()).await;

    let Event::MessagesFetched { generation, result } = event else {
        panic!("expected a fetch result, got {event:?}");
    };
    assert_eq!(generation, 3);
    let batch = result.expect("fetch should succeed");
    let ids: Vec<&str> = batch.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(batch.messages[0].context_value.as_deref(), Some("t1"));
    assert!(batch.messages[1].error.is_some());
    assert_eq!(batch.raw.len(), 3);
    assert!(batch.raw.iter().all(|m| m.receipt_handle.is_some()));
    assert_eq!(queue.in_flight_len(), 3);
}

#[tokio::test]
async fn fetch_caps_batch_size() {
    let queue = InMemoryQueue::new();
    for n in 0..15 {
        queue.push(format!("m{n}"), "{}");
    }

    let event = execute(fetch(20), &queue, &config()).await;
    let Event::MessagesFetched { result, .. } = event else {
        panic!("expected a fetch result");
    };
    assert_eq!(result.expect("fetch should succeed").raw.len(), 10);
    assert_eq!(queue.ready_len(), 5);
}

#[tokio::test]
async fn fetch_from_empty_queue_is_empty_not_an_error() {
    let queue = InMemoryQueue::new();
    let event = execute(fetch(1), &queue, &config()).await;
    let Event::MessagesFetched { result, .. } = event else {
        panic!("expected a fetch result");
    };
    let batch = result.expect("fetch should succeed");
    assert!(batch.messages.is_empty());
    assert!(batch.raw.is_empty());
}

#[tokio::test]
async fn fetch_failure_is_reported() {
    let queue = InMemoryQueue::with_messages([("a", "{}")]);
    queue.fail_receives_with("access denied");

    let event = execute(fetch(1), &queue, &config()).await;

    let Event::MessagesFetched { result, .. } = event else {
        panic!("expected a fetch result");
    };
    let err = result.expect_err("fetch should fail");
    assert!(err.contains("access denied"), "{err}");
    assert_eq!(queue.ready_len(), 1);
}

#[tokio::test]
async fn delete_acknowledges_received_handles() {
    let queue = InMemoryQueue::with_messages([("a", "{}"), ("b", "{}")]);
    let received = queue.receive(10, 0).await.expect("receive");
    let handles: Vec<String> = received
        .iter()
        .filter_map(|m| m.receipt_handle.clone())
        .collect();

    let event = execute(
        Command::DeleteMessages { messages: received },
        &queue,
        &config(),
    )
    .await;

    assert_eq!(
        event,
        Event::MessagesDeleted {
            count: 2,
            result: Ok(())
        }
    );
    assert_eq!(queue.deleted_receipts(), handles);
    assert_eq!(queue.in_flight_len(), 0);
}

#[tokio::test]
async fn delete_reports_partial_failure() {
    let queue = InMemoryQueue::with_messages([("a", "{}")]);
    let mut received = queue.receive(1, 0).await.expect("receive");
    received.push(RawMessage::new("ghost", "{}", "rh-ghost"));

    let event = execute(
        Command::DeleteMessages { messages: received },
        &queue,
        &config(),
    )
    .await;

    let Event::MessagesDeleted { count, result } = event else {
        panic!("expected a delete result");
    };
    assert_eq!(count, 2);
    let err = result.expect_err("one handle is unknown");
    assert!(err.contains("1 of 2"), "{err}");
    assert!(err.contains("rh-ghost"), "{err}");
    assert_eq!(queue.deleted_receipts().len(), 1);
}

#[tokio::test]
async fn delete_without_handles_is_a_no_op() {
    let queue = InMemoryQueue::new();
    queue.fail_deletes_with("should not be called");
    let unhandled = RawMessage {
        id: Some(String::from("a")),
        body: Some(String::from("{}")),
        receipt_handle: None,
    };

    let event = execute(
        Command::DeleteMessages {
            messages: vec![unhandled],
        },
        &queue,
        &config(),
    )
    .await;

    assert_eq!(
        event,
        Event::MessagesDeleted {
            count: 1,
            result: Ok(())
        }
    );
}

#[tokio::test]
async fn count_reports_value_or_minus_one() {
    let queue = InMemoryQueue::with_messages([("a", "{}"), ("b", "{}")]);
    assert_eq!(
        execute(Command::GetApproxCount, &queue, &config()).await,
        Event::CountFetched {
            count: 2,
            error: None
        }
    );

    queue.fail_counts_with("throttled");
    let Event::CountFetched { count, error } =
        execute(Command::GetApproxCount, &queue, &config()).await
    else {
        panic!("expected a count result");
    };
    assert_eq!(count, -1);
    assert!(error.expect("count should fail").contains("throttled"));
}

#[tokio::test]
async fn persist_writes_value_with_format_extension() {
    let dir = scratch_dir();
    let queue = InMemoryQueue::new();

    let event = execute(
        Command::PersistToDisk {
            id: String::from("abc"),
            value: String::from("{\n  \"k\": 1\n}"),
            format: MessageFormat::Json,
            dir: dir.join("orders"),
        },
        &queue,
        &config(),
    )
    .await;

    let Event::MessagePersisted(result) = event else {
        panic!("expected a persist result");
    };
    let path = result.expect("persist should succeed");
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("file name");
    assert!(name.ends_with("-abc.json"), "{name}");
    assert!(path.starts_with(dir.join("orders")));
    assert_eq!(
        fs::read_to_string(&path).expect("read persisted"),
        "{\n  \"k\": 1\n}"
    );

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn persist_plain_text_uses_txt() {
    let dir = scratch_dir();
    let path = persist_message("xyz", "hello", MessageFormat::PlainText, &dir)
        .expect("persist should succeed");
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("txt"));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn persist_failure_names_the_directory() {
    let dir = scratch_dir();
    fs::create_dir_all(&dir).expect("create scratch dir");
    let blocker = dir.join("not-a-dir");
    fs::write(&blocker, "").expect("create blocker file");

    let err = persist_message("a", "{}", MessageFormat::Json, &blocker.join("nested"))
        .expect_err("parent is a file");
    assert!(format!("{err:#}").contains("not-a-dir"));

    fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn timers_fire_their_events() {
    let queue = InMemoryQueue::new();
    assert_eq!(
        execute(
            Command::TickCount {
                interval: Duration::from_millis(5),
                epoch: 7
            },
            &queue,
            &config()
        )
        .await,
        Event::CountTick { epoch: 7 }
    );
    assert_eq!(
        execute(
            Command::HideHelpAfter(Duration::from_millis(5)),
            &queue,
            &config()
        )
        .await,
        Event::HideHelp
    );
}

#[tokio::test]
async fn dispatcher_reports_each_command_on_the_channel() {
    let queue = Arc::new(InMemoryQueue::with_messages([("a", r#"{"tenant":"t1"}"#)]));
    let client: Arc<dyn QueueClient> = queue.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(
        client,
        Arc::new(config()),
        tx,
        tokio::runtime::Handle::current(),
    );

    dispatcher.dispatch_all(vec![fetch(1), Command::GetApproxCount]);

    let mut fetched = None;
    let mut counted = false;
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        match event {
            Event::MessagesFetched { result, .. } => fetched = Some(result),
            Event::CountFetched { error: None, .. } => counted = true,
            other => panic!("unexpected event {other:?}"),
        }
    }

    let batch = fetched
        .expect("fetch event")
        .expect("fetch should succeed");
    assert_eq!(batch.messages[0].id, "a");
    assert!(counted);
}

#[test]
fn queue_errors_read_well() {
    let err = QueueError::PartialDelete {
        failed: 2,
        total: 5,
        details: String::from("expired"),
    };
    assert_eq!(
        err.to_string(),
        "2 of 5 messages couldn't be deleted: expired"
    );
}
