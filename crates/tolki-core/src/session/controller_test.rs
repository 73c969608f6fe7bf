use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::*;
use crate::command::CommandInput;
use crate::error::Result;
use crate::item::{Item, ItemBuilder, MarkdownLevel};
use crate::locale::LocaleLoader;
use crate::scroll::Viewport;
use crate::storefront::{CartSnapshot, CartStatus, SharedStorefront, StorefrontState};

struct MemorySettings {
    values: Mutex<HashMap<(String, String), Value>>,
}

impl MemorySettings {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            values: Mutex::new(HashMap::new()),
        })
    }

    fn value(&self, bot_id: &str, key: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap()
            .get(&(bot_id.to_string(), key.to_string()))
            .cloned()
    }
}

impl SettingsRepository for MemorySettings {
    fn get(&self, bot_id: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.value(bot_id, key))
    }

    fn set(&self, bot_id: &str, key: &str, value: Value) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert((bot_id.to_string(), key.to_string()), value);
        Ok(())
    }

    fn remove(&self, bot_id: &str, key: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .remove(&(bot_id.to_string(), key.to_string()));
        Ok(())
    }
}

struct ScriptedEndpoint {
    status: BotStatus,
    props: Option<BotProps>,
    outcomes: Mutex<VecDeque<MessageOutcome>>,
    sent: Mutex<Vec<(String, String, String)>>,
}

impl ScriptedEndpoint {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            status: BotStatus::Ok,
            props: Some(BotProps {
                name: "Support".to_string(),
                welcome_message: Some("Welcome!".to_string()),
                ..BotProps::default()
            }),
            outcomes: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn with_status(status: BotStatus) -> Arc<Self> {
        Arc::new(Self {
            status,
            props: None,
            outcomes: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn script(&self, outcome: MessageOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageEndpoint for ScriptedEndpoint {
    async fn fetch_bot(&self, _bot_id: &str, _language: &str) -> BotInitResult {
        BotInitResult {
            status: self.status,
            props: self.props.clone(),
        }
    }

    async fn send_message(&self, bot_id: &str, chat_id: &str, message: &str) -> MessageOutcome {
        self.sent.lock().unwrap().push((
            bot_id.to_string(),
            chat_id.to_string(),
            message.to_string(),
        ));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MessageOutcome::Error("unscripted call".to_string()))
    }
}

struct RecordingLoader {
    loaded: Mutex<Vec<String>>,
}

impl RecordingLoader {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            loaded: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LocaleLoader for RecordingLoader {
    async fn load(&self, locale: &str) -> Result<()> {
        self.loaded.lock().unwrap().push(locale.to_string());
        Ok(())
    }
}

const BOT: &str = "bot-1";

fn controller(
    endpoint: Arc<ScriptedEndpoint>,
    settings: Arc<MemorySettings>,
    storefront: SharedStorefront,
) -> ChatController {
    ChatController::new(
        BOT,
        "en",
        endpoint,
        settings,
        RecordingLoader::new(),
        storefront,
    )
}

async fn initialized(
    endpoint: Arc<ScriptedEndpoint>,
) -> (ChatController, Arc<MemorySettings>) {
    let settings = MemorySettings::new();
    let mut session = controller(endpoint, settings.clone(), SharedStorefront::default());
    session.init().await.unwrap();
    (session, settings)
}

fn contents(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            Item::Markdown { content, .. } => content.clone(),
            Item::UserInput { content } => content.clone(),
            other => format!("{:?}", other),
        })
        .collect()
}

#[tokio::test]
async fn test_init_seeds_heading_and_chat_id() {
    let (session, settings) = initialized(ScriptedEndpoint::ok()).await;

    assert_eq!(session.state().bot_status, BotStatus::Ok);
    assert!(!session.state().chat_id.is_empty());
    assert_eq!(
        settings.value(BOT, keys::CHAT),
        Some(Value::String(session.state().chat_id.clone()))
    );

    // Privacy notice plus the configured welcome message.
    assert_eq!(session.items().len(), 2);
    let persisted: Vec<Item> =
        serde_json::from_value(settings.value(BOT, keys::HISTORY).unwrap()).unwrap();
    assert_eq!(persisted.len(), 2);
}

#[tokio::test]
async fn test_init_restores_stored_history() {
    let settings = MemorySettings::new();
    let stored = vec![
        ItemBuilder::assistant("earlier").unwrap(),
        ItemBuilder::user_input("hi").unwrap(),
    ];
    settings
        .set(BOT, keys::HISTORY, serde_json::to_value(&stored).unwrap())
        .unwrap();
    let chat_id = "1fbda641-74a8-45fb-a6e6-9ba95e6296e0";
    settings.set(BOT, keys::CHAT, json!(chat_id)).unwrap();

    let mut session = controller(
        ScriptedEndpoint::ok(),
        settings.clone(),
        SharedStorefront::default(),
    );
    session.init().await.unwrap();

    assert_eq!(session.state().chat_id, chat_id);
    assert_eq!(session.items(), stored.as_slice());
}

#[tokio::test]
async fn test_init_regenerates_malformed_chat_id() {
    let settings = MemorySettings::new();
    settings.set(BOT, keys::CHAT, json!("chat-42")).unwrap();

    let mut session = controller(
        ScriptedEndpoint::ok(),
        settings.clone(),
        SharedStorefront::default(),
    );
    session.init().await.unwrap();

    assert_ne!(session.state().chat_id, "chat-42");
    assert_eq!(
        settings.value(BOT, keys::CHAT),
        Some(Value::String(session.state().chat_id.clone()))
    );
}

#[tokio::test]
async fn test_init_recovers_from_corrupt_history() {
    let settings = MemorySettings::new();
    settings
        .set(BOT, keys::HISTORY, json!("not an item array"))
        .unwrap();

    let mut session = controller(
        ScriptedEndpoint::ok(),
        settings.clone(),
        SharedStorefront::default(),
    );
    session.init().await.unwrap();

    // Fresh heading messages, and the corrupt blob is overwritten.
    assert_eq!(session.items().len(), 2);
    let persisted: Vec<Item> =
        serde_json::from_value(settings.value(BOT, keys::HISTORY).unwrap()).unwrap();
    assert_eq!(persisted.len(), 2);
}

#[tokio::test]
async fn test_unavailable_bot_disables_session() {
    let endpoint = ScriptedEndpoint::with_status(BotStatus::NotFound);
    let (mut session, _settings) = initialized(endpoint.clone()).await;

    assert_eq!(session.state().bot_status, BotStatus::NotFound);
    assert!(session.items().is_empty());

    session.submit_message("hello?").await.unwrap();
    assert!(session.items().is_empty());
    assert!(endpoint.sent().is_empty());
}

#[tokio::test]
async fn test_round_trip_splices_response_at_thinking_position() {
    let endpoint = ScriptedEndpoint::ok();
    endpoint.script(MessageOutcome::Success(vec![
        ItemBuilder::assistant("first").unwrap(),
        ItemBuilder::assistant("second").unwrap(),
    ]));
    let (mut session, settings) = initialized(endpoint.clone()).await;

    session.submit_message("  hello  ").await.unwrap();

    assert!(!session.state().pending);
    assert!(session.items().iter().all(|item| !item.is_thinking()));
    assert_eq!(
        contents(session.items()),
        vec![
            "By chatting you agree to the privacy policy.",
            "Welcome!",
            "hello",
            "first",
            "second"
        ]
    );

    let sent = endpoint.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, BOT);
    assert_eq!(sent[0].1, session.state().chat_id);
    assert_eq!(sent[0].2, "hello");

    let persisted: Vec<Item> =
        serde_json::from_value(settings.value(BOT, keys::HISTORY).unwrap()).unwrap();
    assert_eq!(persisted.len(), 5);
}

#[tokio::test]
async fn test_failed_round_trip_appends_error_bubble() {
    let endpoint = ScriptedEndpoint::ok();
    endpoint.script(MessageOutcome::Error("connection refused".to_string()));
    let (mut session, _settings) = initialized(endpoint).await;

    // The failure is absorbed; the call still succeeds.
    session.submit_message("hello").await.unwrap();

    assert!(!session.state().pending);
    match session.items().last().unwrap() {
        Item::Markdown { level, .. } => assert_eq!(*level, MarkdownLevel::Error),
        other => panic!("unexpected item: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_response_settles_without_items() {
    let endpoint = ScriptedEndpoint::ok();
    endpoint.script(MessageOutcome::Malformed);
    let (mut session, _settings) = initialized(endpoint).await;

    session.submit_message("hello").await.unwrap();

    assert!(!session.state().pending);
    assert!(session.items().iter().all(|item| !item.is_thinking()));
    // No response items and no error bubble; the user message stays.
    assert_eq!(
        contents(session.items()).last().map(String::as_str),
        Some("hello")
    );
}

#[tokio::test]
async fn test_blank_submission_is_ignored() {
    let endpoint = ScriptedEndpoint::ok();
    let (mut session, _settings) = initialized(endpoint.clone()).await;
    let before = session.items().len();

    session.submit_message("   ").await.unwrap();

    assert_eq!(session.items().len(), before);
    assert!(endpoint.sent().is_empty());
}

#[tokio::test]
async fn test_reset_chat_starts_fresh_session() {
    let endpoint = ScriptedEndpoint::ok();
    endpoint.script(MessageOutcome::Success(vec![
        ItemBuilder::assistant("reply").unwrap(),
    ]));
    let (mut session, settings) = initialized(endpoint).await;
    session.submit_message("hello").await.unwrap();
    let old_chat_id = session.state().chat_id.clone();

    session
        .execute_command("resetChat", CommandInput::none())
        .await
        .unwrap();

    assert_ne!(session.state().chat_id, old_chat_id);
    assert_eq!(
        settings.value(BOT, keys::CHAT),
        Some(Value::String(session.state().chat_id.clone()))
    );
    // Back to the heading messages only.
    assert_eq!(session.items().len(), 2);
}

#[tokio::test]
async fn test_cancel_action_removes_confirmation_prompt() {
    let (mut session, _settings) = initialized(ScriptedEndpoint::ok()).await;

    session.request_reset().await;
    let prompt = session.items().last().unwrap().clone();
    assert!(matches!(prompt, Item::Action { .. }));

    // A second request replaces the prompt instead of stacking.
    session.request_reset().await;
    let prompts = session
        .items()
        .iter()
        .filter(|item| matches!(item, Item::Action { .. }))
        .count();
    assert_eq!(prompts, 1);

    session
        .execute_command("cancelAction", CommandInput::with_target(prompt))
        .await
        .unwrap();
    assert!(
        session
            .items()
            .iter()
            .all(|item| !matches!(item, Item::Action { .. }))
    );
}

#[tokio::test]
async fn test_unknown_command_is_an_error() {
    let (mut session, _settings) = initialized(ScriptedEndpoint::ok()).await;

    let err = session
        .execute_command("selfDestruct", CommandInput::none())
        .await
        .unwrap_err();
    assert!(err.is_unknown_command());
}

#[tokio::test]
async fn test_show_cart_and_remove_notification_swaps_notice_for_panel() {
    let storefront = SharedStorefront::new(StorefrontState {
        cart: Some(CartSnapshot {
            status: CartStatus::Loaded,
            items: vec![json!({ "sku": 1 })],
        }),
        orders: None,
    });
    let settings = MemorySettings::new();
    let mut session = controller(ScriptedEndpoint::ok(), settings, storefront);
    session.init().await.unwrap();

    // The loaded non-empty cart seeded a notification in the heading.
    assert!(session.items().iter().any(Item::is_cart_notification));

    session
        .execute_command("showCartAndRemoveNotification", CommandInput::none())
        .await
        .unwrap();

    assert!(
        session
            .items()
            .iter()
            .all(|item| !item.is_cart_notification())
    );
    let carts = session
        .items()
        .iter()
        .filter(|item| matches!(item, Item::Cart))
        .count();
    assert_eq!(carts, 1);
}

#[tokio::test]
async fn test_cart_suggestion_respects_live_cart() {
    let storefront = SharedStorefront::default();
    let settings = MemorySettings::new();
    let mut session = controller(ScriptedEndpoint::ok(), settings, storefront.clone());
    session.init().await.unwrap();

    // Empty cart: the command is inapplicable and silently skipped.
    session
        .execute_suggestion("Show my cart [show_cart]")
        .await
        .unwrap();
    assert!(
        session
            .items()
            .iter()
            .all(|item| !matches!(item, Item::Cart))
    );

    storefront.update(StorefrontState {
        cart: Some(CartSnapshot {
            status: CartStatus::Loaded,
            items: vec![json!({ "sku": 1 })],
        }),
        orders: None,
    });

    session
        .execute_suggestion("Show my cart [show_cart]")
        .await
        .unwrap();
    session
        .execute_suggestion("Show my cart [show_cart]")
        .await
        .unwrap();

    // Singleton: repeated invocations keep a single cart panel.
    let carts = session
        .items()
        .iter()
        .filter(|item| matches!(item, Item::Cart))
        .count();
    assert_eq!(carts, 1);
}

#[tokio::test]
async fn test_set_locale_suggestion_switches_language() {
    let (mut session, _settings) = initialized(ScriptedEndpoint::ok()).await;

    session
        .execute_suggestion("Parla italiano [set_locale it]")
        .await
        .unwrap();

    assert_eq!(
        session.items().last().unwrap().locale_checkpoint(),
        Some("it")
    );
}

#[tokio::test]
async fn test_short_locale_argument_is_rejected() {
    let (mut session, _settings) = initialized(ScriptedEndpoint::ok()).await;

    let err = session
        .execute_command("set_locale", CommandInput::with_argument("e"))
        .await
        .unwrap_err();
    assert!(err.is_invalid_params());

    // Well-formed but unsupported: silently skipped, not an error.
    session
        .execute_command("set_locale", CommandInput::with_argument("tlh"))
        .await
        .unwrap();
    assert!(
        session
            .items()
            .iter()
            .all(|item| item.locale_checkpoint().is_none())
    );
}

#[tokio::test]
async fn test_plain_suggestion_is_submitted_as_message() {
    let endpoint = ScriptedEndpoint::ok();
    endpoint.script(MessageOutcome::Success(Vec::new()));
    let (mut session, _settings) = initialized(endpoint.clone()).await;

    session
        .execute_suggestion("What are your opening hours?")
        .await
        .unwrap();

    let sent = endpoint.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].2, "What are your opening hours?");
}

#[tokio::test]
async fn test_toggle_open_persists_preference() {
    let (mut session, settings) = initialized(ScriptedEndpoint::ok()).await;
    assert!(!session.state().open);

    session.toggle_open().unwrap();
    assert!(session.state().open);
    assert_eq!(settings.value(BOT, keys::OPEN), Some(json!(true)));

    session.toggle_open().unwrap();
    assert_eq!(settings.value(BOT, keys::OPEN), Some(json!(false)));
}

struct RecordingViewport {
    scrolls: Mutex<Vec<f64>>,
}

impl RecordingViewport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            scrolls: Mutex::new(Vec::new()),
        })
    }
}

impl Viewport for RecordingViewport {
    fn content_height(&self) -> f64 {
        1000.0
    }

    fn client_height(&self) -> f64 {
        400.0
    }

    fn scroll_top(&self) -> f64 {
        0.0
    }

    fn message_count(&self) -> usize {
        2
    }

    fn message_offset(&self, index: usize) -> Option<f64> {
        Some(index as f64 * 100.0)
    }

    fn scroll_to(&self, offset: f64, _animated: bool) {
        self.scrolls.lock().unwrap().push(offset);
    }
}

#[tokio::test(start_paused = true)]
async fn test_init_aligns_viewport_at_tail() {
    let settings = MemorySettings::new();
    let stored = vec![
        ItemBuilder::assistant("earlier").unwrap(),
        ItemBuilder::user_input("hi").unwrap(),
    ];
    settings
        .set(BOT, keys::HISTORY, serde_json::to_value(&stored).unwrap())
        .unwrap();

    let viewport = RecordingViewport::new();
    let mut session = controller(
        ScriptedEndpoint::ok(),
        settings,
        SharedStorefront::default(),
    )
    .with_viewport(viewport.clone());
    session.init().await.unwrap();

    let scrolls = viewport.scrolls.lock().unwrap();
    assert!(!scrolls.is_empty());
    // Tail anchor: content height minus the padded viewport height.
    assert_eq!(scrolls[0], 1000.0 - (400.0 - 80.0));
}

#[tokio::test]
async fn test_state_changes_are_published() {
    let (mut session, _settings) = initialized(ScriptedEndpoint::ok()).await;
    let mut receiver = session.subscribe();
    receiver.borrow_and_update();

    session.toggle_open().unwrap();

    assert!(receiver.has_changed().unwrap());
    assert!(receiver.borrow_and_update().open);
}
