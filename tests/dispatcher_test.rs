//! Dispatcher and delivery tests
//! Run with: cargo test --test dispatcher_test

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use chatlog_bot::application::errors::{BotError, StorageError};
use chatlog_bot::application::messaging::{Dispatcher, Outcome, EXPORT_FAILED_REPLY};
use chatlog_bot::application::services::{read_snapshot, AiBridge, Exporter, MessageService, AI_FAILED_REPLY};
use chatlog_bot::domain::entities::{InboundEvent, Message, User};
use chatlog_bot::domain::traits::{Bot, BotInfo, MessageStore, Reply};
use chatlog_bot::infrastructure::database::SqliteStore;
use chatlog_bot::infrastructure::llm::{LLMError, LLMMessage, LLMResponse, LLMResult, LLM};

fn response(content: impl Into<String>) -> LLMResponse {
    LLMResponse {
        content: content.into(),
        model: "fake".to_string(),
        usage: None,
        finish_reason: Some("stop".to_string()),
    }
}

/// Echoes the last prompt and counts calls
#[derive(Default)]
struct EchoLLM {
    calls: AtomicUsize,
}

#[async_trait]
impl LLM for EchoLLM {
    fn name(&self) -> &str {
        "echo"
    }

    async fn chat(&self, messages: Vec<LLMMessage>, _: Option<&str>, _: Option<f32>, _: Option<u32>) -> LLMResult<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(response(format!("echo: {}", prompt)))
    }
}

/// Fails every call
#[derive(Default)]
struct DownLLM {
    calls: AtomicUsize,
}

#[async_trait]
impl LLM for DownLLM {
    fn name(&self) -> &str {
        "down"
    }

    async fn chat(&self, _: Vec<LLMMessage>, _: Option<&str>, _: Option<f32>, _: Option<u32>) -> LLMResult<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LLMError::NetworkError("connection refused (key=AIzaSecret)".to_string()))
    }
}

/// Blocks until released, to simulate a slow provider
#[derive(Default)]
struct GatedLLM {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl LLM for GatedLLM {
    fn name(&self) -> &str {
        "gated"
    }

    async fn chat(&self, _: Vec<LLMMessage>, _: Option<&str>, _: Option<f32>, _: Option<u32>) -> LLMResult<LLMResponse> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(response("finally"))
    }
}

/// Store whose medium is gone
struct BrokenStore;

#[async_trait]
impl MessageStore for BrokenStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, _: &str, _: &str) -> Result<i64, StorageError> {
        Err(StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
    }

    async fn all(&self) -> Result<Vec<Message>, StorageError> {
        Err(StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk gone")))
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(0)
    }
}

/// Records every reply instead of sending it
#[derive(Default)]
struct RecordingBot {
    sent: Mutex<Vec<(String, Reply)>>,
}

#[async_trait]
impl Bot for RecordingBot {
    async fn start(&self) -> Result<(), BotError> {
        Ok(())
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        self.sent.lock().unwrap().push((chat_id.to_string(), Reply::text(text)));
        Ok("1".to_string())
    }

    async fn send_document(&self, chat_id: &str, path: &Path, filename: &str, caption: Option<&str>) -> Result<String, BotError> {
        self.sent.lock().unwrap().push((
            chat_id.to_string(),
            Reply::Document {
                path: path.to_path_buf(),
                filename: filename.to_string(),
                caption: caption.map(str::to_string),
            },
        ));
        Ok("2".to_string())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: "1".to_string(),
            name: "test".to_string(),
            username: "test_bot".to_string(),
        }
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    export_path: PathBuf,
    store: Arc<SqliteStore>,
    dispatcher: Arc<Dispatcher>,
}

async fn harness(llm: Arc<dyn LLM>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let export_path = dir.path().join("messages.csv");

    let store = Arc::new(SqliteStore::open(dir.path().join("messages.db")).unwrap());
    store.init().await.unwrap();

    let exporter = Exporter::new(store.clone(), export_path.clone());
    let dispatcher = Dispatcher::new("/", store.clone(), AiBridge::new(llm), exporter);

    Harness {
        _dir: dir,
        export_path,
        store,
        dispatcher: Arc::new(dispatcher),
    }
}

fn from(name: &str, text: &str) -> InboundEvent {
    InboundEvent::from_text("chat-1", text).with_sender(User::new("1").with_username(name))
}

fn reply_text(outcome: &Outcome) -> &str {
    match outcome {
        Outcome::Replied(Reply::Text(text)) => text,
        other => panic!("expected a text reply, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_plain_messages_are_all_stored() {
    let h = harness(Arc::new(EchoLLM::default())).await;

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let dispatcher = h.dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(&from(&format!("user{}", i), &format!("hello {}", i))).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Outcome::Silent);
    }

    let all = h.store.all().await.unwrap();
    assert_eq!(all.len(), 40);
    assert!(all.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test]
async fn test_export_contains_header_and_rows_in_insertion_order() {
    let h = harness(Arc::new(EchoLLM::default())).await;

    h.dispatcher.dispatch(&from("alice", "hi")).await;
    h.dispatcher.dispatch(&from("bob", "yo")).await;

    let outcome = h.dispatcher.dispatch(&from("alice", "/export")).await;
    let (path, filename) = match outcome {
        Outcome::Replied(Reply::Document { path, filename, .. }) => (path, filename),
        other => panic!("expected a document reply, got {:?}", other),
    };
    assert_eq!(path, h.export_path);
    assert_eq!(filename, "messages.csv");

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "id,sender,text,timestamp");

    let rows = read_snapshot(&path).unwrap();
    let pairs: Vec<(&str, &str)> = rows.iter().map(|m| (m.sender.as_str(), m.text.as_str())).collect();
    assert_eq!(pairs, vec![("alice", "hi"), ("bob", "yo")]);

    // The command itself is not logged.
    assert_eq!(h.store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_empty_ai_prompt_returns_usage_without_side_effects() {
    let llm = Arc::new(EchoLLM::default());
    let h = harness(llm.clone()).await;

    let outcome = h.dispatcher.dispatch(&from("alice", "/ai")).await;
    assert_eq!(reply_text(&outcome), "Usage: /ai <your question>");

    let outcome = h.dispatcher.dispatch(&from("alice", "/ai   ")).await;
    assert_eq!(reply_text(&outcome), "Usage: /ai <your question>");

    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ai_answer_is_returned_and_not_persisted() {
    let llm = Arc::new(EchoLLM::default());
    let h = harness(llm.clone()).await;

    let outcome = h.dispatcher.dispatch(&from("alice", "/ai what is rust?")).await;
    assert_eq!(reply_text(&outcome), "echo: what is rust?");
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ai_failure_is_normalized_and_dispatcher_keeps_working() {
    let llm = Arc::new(DownLLM::default());
    let h = harness(llm.clone()).await;

    let outcome = h.dispatcher.dispatch(&from("alice", "/ai hello")).await;
    let text = reply_text(&outcome);
    assert_eq!(text, AI_FAILED_REPLY);
    assert!(!text.contains("AIza"));

    assert_eq!(h.dispatcher.dispatch(&from("bob", "still here")).await, Outcome::Silent);
    assert_eq!(h.store.count().await.unwrap(), 1);

    let again = h.dispatcher.dispatch(&from("alice", "/ai hello again")).await;
    assert_eq!(reply_text(&again), AI_FAILED_REPLY);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_plain_is_silent_and_export_always_replies() {
    let h = harness(Arc::new(EchoLLM::default())).await;

    assert!(h.dispatcher.dispatch(&from("alice", "just chatting")).await.is_silent());
    assert!(h.dispatcher.dispatch(&from("alice", "/export")).await.reply().is_some());

    // Same dispatcher shape over a broken store: still exactly one reply.
    let store: Arc<dyn MessageStore> = Arc::new(BrokenStore);
    let broken = Dispatcher::new(
        "/",
        store.clone(),
        AiBridge::new(Arc::new(EchoLLM::default())),
        Exporter::new(store, h.export_path.clone()),
    );

    assert!(broken.dispatch(&from("alice", "lost message")).await.is_silent());
    let outcome = broken.dispatch(&from("alice", "/export")).await;
    assert_eq!(reply_text(&outcome), EXPORT_FAILED_REPLY);
}

#[tokio::test]
async fn test_export_round_trip_is_stable() {
    let h = harness(Arc::new(EchoLLM::default())).await;

    h.dispatcher.dispatch(&from("alice", "hi, all")).await;
    h.dispatcher.dispatch(&InboundEvent::from_text("chat-1", "no sender here")).await;
    h.dispatcher.dispatch(&from("bob", "quote \" and\nnewline")).await;

    h.dispatcher.dispatch(&from("alice", "/export")).await;
    let first = std::fs::read(&h.export_path).unwrap();
    assert_eq!(read_snapshot(&h.export_path).unwrap(), h.store.all().await.unwrap());

    h.dispatcher.dispatch(&from("alice", "/export")).await;
    let second = std::fs::read(&h.export_path).unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pending_ai_call_does_not_block_storage() {
    let llm = Arc::new(GatedLLM::default());
    let h = harness(llm.clone()).await;

    let dispatcher = h.dispatcher.clone();
    let pending = tokio::spawn(async move { dispatcher.dispatch(&from("alice", "/ai slow question")).await });

    llm.started.notified().await;

    assert!(h.dispatcher.dispatch(&from("bob", "meanwhile")).await.is_silent());
    assert_eq!(h.store.count().await.unwrap(), 1);
    assert!(!pending.is_finished());

    llm.release.notify_one();
    let outcome = pending.await.unwrap();
    assert_eq!(reply_text(&outcome), "finally");
}

#[tokio::test]
async fn test_unknown_command_gets_help_and_is_not_stored() {
    let h = harness(Arc::new(EchoLLM::default())).await;

    let outcome = h.dispatcher.dispatch(&from("alice", "/start")).await;
    let text = reply_text(&outcome);
    assert!(text.starts_with("Unknown command: /start"));
    assert!(text.contains("/ai <your question>"));
    assert_eq!(h.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_event_without_text_is_ignored() {
    let h = harness(Arc::new(EchoLLM::default())).await;

    let outcome = h.dispatcher.dispatch(&InboundEvent::new("chat-1")).await;
    assert_eq!(outcome, Outcome::Silent);
    assert_eq!(h.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_message_service_sends_one_reply_per_command() {
    let h = harness(Arc::new(EchoLLM::default())).await;
    let bot = Arc::new(RecordingBot::default());
    let mut service = MessageService::new(bot.clone(), h.dispatcher.clone());

    assert_eq!(service.deliver(from("alice", "hello")).await, Some(Outcome::Silent));
    assert!(bot.sent.lock().unwrap().is_empty());

    assert_eq!(service.deliver(from("alice", "/ai ping")).await, None);
    service.drain().await;
    assert_eq!(service.deliver(from("alice", "/export")).await, None);
    service.drain().await;

    let sent = bot.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], ("chat-1".to_string(), Reply::text("echo: ping")));
    assert!(matches!(&sent[1].1, Reply::Document { filename, caption: Some(caption), .. }
        if filename == "messages.csv" && caption == "1 messages"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_sender_messages_are_stored_in_delivery_order() {
    let h = harness(Arc::new(EchoLLM::default())).await;
    let mut service = MessageService::new(Arc::new(RecordingBot::default()), h.dispatcher.clone());

    for i in 0..200 {
        service.deliver(from("alice", &i.to_string())).await;
        if i % 50 == 0 {
            // Commands in the same batch must not disturb the order.
            service.deliver(from("alice", "/ai interleaved")).await;
        }
    }
    service.drain().await;

    let texts: Vec<String> = h.store.all().await.unwrap().into_iter().map(|m| m.text).collect();
    let expected: Vec<String> = (0..200).map(|i| i.to_string()).collect();
    assert_eq!(texts, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_drain_waits_for_running_commands() {
    let llm = Arc::new(GatedLLM::default());
    let h = harness(llm.clone()).await;
    let bot = Arc::new(RecordingBot::default());
    let mut service = MessageService::new(bot.clone(), h.dispatcher.clone());

    assert_eq!(service.deliver(from("alice", "/ai slow question")).await, None);
    llm.started.notified().await;

    // Polling continues while the command is pending.
    assert_eq!(service.deliver(from("bob", "meanwhile")).await, Some(Outcome::Silent));
    assert_eq!(service.in_flight(), 1);
    assert!(bot.sent.lock().unwrap().is_empty());

    llm.release.notify_one();
    let outcomes = service.drain().await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(service.in_flight(), 0);

    let sent = bot.sent.lock().unwrap();
    assert_eq!(sent.as_slice(), &[("chat-1".to_string(), Reply::text("finally"))]);
}

/// Accepts text but rejects every upload
#[derive(Default)]
struct UploadRejectingBot {
    sent: Mutex<Vec<String>>,
    uploads: AtomicUsize,
}

#[async_trait]
impl Bot for UploadRejectingBot {
    async fn start(&self) -> Result<(), BotError> {
        Ok(())
    }

    async fn send_message(&self, _chat_id: &str, text: &str) -> Result<String, BotError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok("1".to_string())
    }

    async fn send_document(&self, _: &str, _: &Path, _: &str, _: Option<&str>) -> Result<String, BotError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Err(BotError::Api("Request Entity Too Large".to_string()))
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: "2".to_string(),
            name: "test".to_string(),
            username: "test_bot".to_string(),
        }
    }
}

#[tokio::test]
async fn test_failed_export_upload_falls_back_to_text() {
    let h = harness(Arc::new(EchoLLM::default())).await;
    let bot = Arc::new(UploadRejectingBot::default());
    let mut service = MessageService::new(bot.clone(), h.dispatcher.clone());

    service.deliver(from("alice", "hi")).await;
    service.deliver(from("alice", "/export")).await;
    service.drain().await;

    assert_eq!(bot.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(bot.sent.lock().unwrap().as_slice(), &[EXPORT_FAILED_REPLY.to_string()]);
}
