use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use formpilot_core::Registrar;

use crate::messages;
use crate::state::{Conversation, SessionState, Step};

/// Chat the conversation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub i64);

/// A message previously sent by the bot, so it can be edited later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef(pub i32);

/// Outgoing side of the chat transport.
#[async_trait]
pub trait ChatOutbound: Send + Sync {
    async fn send_text(&self, session: SessionId, text: &str) -> anyhow::Result<MessageRef>;

    async fn edit_text(
        &self,
        session: SessionId,
        message: MessageRef,
        text: &str,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    New,
    Cancel,
    UnknownCommand(String),
    Text(String),
}

impl Input {
    /// `/new`, `/new@some_bot` and `/new extra` are all the `new` command.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let Some(command) = trimmed.strip_prefix('/') else {
            return Input::Text(text.to_string());
        };
        let word = command.split_whitespace().next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default();
        match name.to_ascii_lowercase().as_str() {
            "start" => Input::Start,
            "new" => Input::New,
            "cancel" => Input::Cancel,
            other => Input::UnknownCommand(other.to_string()),
        }
    }
}

type Slot = Arc<Mutex<Conversation>>;

/// Routes chat turns to per-session conversations and runs the
/// registration once a conversation has collected everything.
///
/// A session only has an entry while a conversation is in progress; it is
/// removed as soon as the conversation is done or cancelled. Turns fed
/// through [`Collector::dispatch`] are applied in arrival order per session,
/// while different sessions run concurrently.
pub struct Collector {
    sessions: DashMap<SessionId, Slot>,
    queues: DashMap<SessionId, mpsc::UnboundedSender<String>>,
    registrar: Arc<dyn Registrar>,
    outbound: Arc<dyn ChatOutbound>,
    login_url: String,
}

impl Collector {
    pub fn new(
        registrar: Arc<dyn Registrar>,
        outbound: Arc<dyn ChatOutbound>,
        login_url: impl Into<String>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            queues: DashMap::new(),
            registrar,
            outbound,
            login_url: login_url.into(),
        }
    }

    /// State of the session's conversation, `None` when none is in progress.
    pub async fn state(&self, session: SessionId) -> Option<SessionState> {
        let slot = self.active(session)?;
        let state = slot.lock().await.state();
        Some(state)
    }

    /// Queue a turn for `session`. Turns of one session are handled one at a
    /// time in the order they were queued, by a worker that lives only while
    /// the session has queued turns.
    pub fn dispatch(self: &Arc<Self>, session: SessionId, text: String) {
        let queue = self.queues.entry(session).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(Arc::clone(self).drain(session, rx));
            tx
        });
        // Sent under the entry lock, so the worker cannot retire in between.
        if queue.send(text).is_err() {
            warn!(chat_id = session.0, "session worker gone, dropping message");
        }
    }

    async fn drain(self: Arc<Self>, session: SessionId, mut rx: mpsc::UnboundedReceiver<String>) {
        while let Some(text) = rx.recv().await {
            if let Err(e) = self.handle(session, &text).await {
                error!(chat_id = session.0, error = %e, "error handling chat message");
            }
            let mut idle = false;
            self.queues.remove_if(&session, |_, _| {
                idle = rx.is_empty();
                idle
            });
            if idle {
                break;
            }
        }
    }

    /// Apply one turn. Calls for the same session must not overlap; use
    /// [`Collector::dispatch`] when turns arrive concurrently.
    pub async fn handle(&self, session: SessionId, text: &str) -> anyhow::Result<()> {
        match Input::parse(text) {
            Input::Start => {
                self.outbound.send_text(session, messages::WELCOME).await?;
            }
            Input::UnknownCommand(name) => {
                debug!(chat_id = session.0, command = %name, "ignoring unknown command");
            }
            Input::New => {
                self.sessions
                    .insert(session, Arc::new(Mutex::new(Conversation::new())));
                info!(chat_id = session.0, "registration started");
                self.outbound.send_text(session, messages::ASK_FIRST_NAME).await?;
            }
            Input::Cancel => {
                let Some(slot) = self.active(session) else {
                    debug!(chat_id = session.0, "no conversation to cancel");
                    return Ok(());
                };
                let cancelled = slot.lock().await.cancel();
                self.release(session, &slot);
                if cancelled {
                    info!(chat_id = session.0, "registration cancelled");
                    self.outbound.send_text(session, messages::CANCELLED).await?;
                }
            }
            Input::Text(text) => {
                let Some(slot) = self.active(session) else {
                    debug!(chat_id = session.0, "no conversation, ignoring text");
                    return Ok(());
                };
                self.advance(session, &slot, &text).await?;
            }
        }
        Ok(())
    }

    async fn advance(&self, session: SessionId, slot: &Slot, text: &str) -> anyhow::Result<()> {
        let mut conversation = slot.lock().await;
        let before = conversation.state();
        match conversation.accept(text) {
            Step::Reprompt(prompt) => {
                debug!(chat_id = session.0, state = %before, "input rejected");
                self.outbound.send_text(session, prompt).await?;
            }
            Step::Advance(prompt) => {
                debug!(
                    chat_id = session.0,
                    from = %before,
                    to = %conversation.state(),
                    "input accepted"
                );
                self.outbound.send_text(session, prompt).await?;
            }
            Step::Ready(request) => {
                let placeholder = self.outbound.send_text(session, messages::PROCESSING).await?;
                info!(chat_id = session.0, email = %request.email, "submitting registration");

                let result = self.registrar.register(request.clone()).await;
                conversation.finish();
                self.release(session, slot);
                info!(
                    chat_id = session.0,
                    success = result.success,
                    status = ?result.status,
                    "registration finished"
                );

                let report = messages::final_report(&request, &result, &self.login_url);
                if let Err(e) = self.outbound.edit_text(session, placeholder, &report).await {
                    warn!(
                        chat_id = session.0,
                        error = %e,
                        "editing placeholder failed, sending report"
                    );
                    self.outbound.send_text(session, &report).await?;
                }
            }
            Step::Ignored => {
                self.release(session, slot);
                debug!(chat_id = session.0, state = %before, "conversation over, ignoring text");
            }
        }
        Ok(())
    }

    fn active(&self, session: SessionId) -> Option<Slot> {
        self.sessions.get(&session).map(|s| Arc::clone(s.value()))
    }

    /// Drop the session's entry if it still holds this conversation.
    fn release(&self, session: SessionId, slot: &Slot) {
        self.sessions
            .remove_if(&session, |_, current| Arc::ptr_eq(current, slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_core::{RegistrationError, RegistrationRequest, RegistrationResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    const LOGIN_URL: &str = "https://platform.example.com/login";

    struct MockRegistrar {
        result: RegistrationResult,
        calls: AtomicUsize,
        requests: StdMutex<Vec<RegistrationRequest>>,
    }

    impl MockRegistrar {
        fn returning(result: RegistrationResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
                requests: StdMutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Registrar for MockRegistrar {
        async fn register(&self, request: RegistrationRequest) -> RegistrationResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            self.result.clone()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Text(SessionId, String),
        Edit(SessionId, MessageRef, String),
    }

    #[derive(Default)]
    struct MockOutbound {
        sent: StdMutex<Vec<Sent>>,
    }

    impl MockOutbound {
        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn last_text(&self) -> String {
            match self.sent().last() {
                Some(Sent::Text(_, text)) | Some(Sent::Edit(_, _, text)) => text.clone(),
                None => String::new(),
            }
        }
    }

    #[async_trait]
    impl ChatOutbound for MockOutbound {
        async fn send_text(&self, session: SessionId, text: &str) -> anyhow::Result<MessageRef> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(Sent::Text(session, text.to_string()));
            Ok(MessageRef(sent.len() as i32))
        }

        async fn edit_text(
            &self,
            session: SessionId,
            message: MessageRef,
            text: &str,
        ) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Edit(session, message, text.to_string()));
            Ok(())
        }
    }

    fn collector(result: RegistrationResult) -> (Collector, Arc<MockRegistrar>, Arc<MockOutbound>) {
        let registrar = MockRegistrar::returning(result);
        let outbound = Arc::new(MockOutbound::default());
        let collector = Collector::new(registrar.clone(), outbound.clone(), LOGIN_URL);
        (collector, registrar, outbound)
    }

    async fn feed(collector: &Collector, session: SessionId, turns: &[&str]) {
        for turn in turns {
            collector.handle(session, turn).await.unwrap();
        }
    }

    async fn wait_until_drained(collector: &Collector) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !collector.queues.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session workers finished");
    }

    const CHAT: SessionId = SessionId(42);

    #[test]
    fn test_parse_input() {
        assert_eq!(Input::parse("/start"), Input::Start);
        assert_eq!(Input::parse("/new@formpilot_bot"), Input::New);
        assert_eq!(Input::parse(" /Cancel now"), Input::Cancel);
        assert_eq!(Input::parse("/help"), Input::UnknownCommand("help".to_string()));
        assert_eq!(Input::parse("Jane"), Input::Text("Jane".to_string()));
    }

    #[tokio::test]
    async fn test_successful_registration() {
        let (collector, registrar, outbound) = collector(RegistrationResult::created());

        feed(&collector, CHAT, &["/new", "Jane", "Doe", "jane@example.com", "Passw0rd1"]).await;

        assert_eq!(registrar.calls(), 1);
        let request = registrar.requests.lock().unwrap()[0].clone();
        assert_eq!(request.full_name(), "Jane Doe");
        assert_eq!(request.email, "jane@example.com");

        let sent = outbound.sent();
        let placeholder = sent
            .iter()
            .position(|s| *s == Sent::Text(CHAT, messages::PROCESSING.to_string()))
            .expect("processing placeholder sent");
        match sent.last().unwrap() {
            Sent::Edit(session, message, text) => {
                assert_eq!(*session, CHAT);
                assert_eq!(*message, MessageRef(placeholder as i32 + 1));
                assert!(text.contains("REGISTRATION SUCCESSFUL"));
                assert!(text.contains("🔑 Password: *********\n"));
                assert!(!text.contains("Passw0rd1"));
                assert!(text.contains(LOGIN_URL));
            }
            other => panic!("expected placeholder edit, got {:?}", other),
        }
        assert_eq!(collector.state(CHAT).await, None);
        assert!(collector.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_site_error_reported() {
        let error = RegistrationError::SiteValidation("Email already registered".to_string());
        let (collector, registrar, outbound) = collector(RegistrationResult::failed(&error));

        feed(&collector, CHAT, &["/new", "Jane", "Doe", "jane@example.com", "Passw0rd1"]).await;

        assert_eq!(registrar.calls(), 1);
        let report = outbound.last_text();
        assert!(report.contains("REGISTRATION FAILED"));
        assert!(report.contains("Email already registered"));
        assert!(report.contains("Try again with /new"));
        assert_eq!(collector.state(CHAT).await, None);
    }

    #[tokio::test]
    async fn test_cancel_mid_flow() {
        let (collector, registrar, outbound) = collector(RegistrationResult::created());

        feed(&collector, CHAT, &["/new", "Jane", "Doe"]).await;
        assert_eq!(collector.state(CHAT).await, Some(SessionState::AwaitingEmail));

        feed(&collector, CHAT, &["/cancel"]).await;
        assert_eq!(collector.state(CHAT).await, None);
        assert!(collector.sessions.is_empty());
        assert_eq!(outbound.last_text(), messages::CANCELLED);

        let before = outbound.sent().len();
        feed(&collector, CHAT, &["jane@example.com", "Passw0rd1"]).await;
        assert_eq!(outbound.sent().len(), before);
        assert_eq!(registrar.calls(), 0);

        feed(&collector, CHAT, &["/new"]).await;
        assert_eq!(collector.state(CHAT).await, Some(SessionState::AwaitingFirstName));
        assert_eq!(outbound.last_text(), messages::ASK_FIRST_NAME);
    }

    #[tokio::test]
    async fn test_rejected_input_reprompts() {
        let (collector, registrar, outbound) = collector(RegistrationResult::created());

        feed(&collector, CHAT, &["/new", "J"]).await;
        assert_eq!(outbound.last_text(), messages::RETRY_FIRST_NAME);
        assert_eq!(collector.state(CHAT).await, Some(SessionState::AwaitingFirstName));

        feed(&collector, CHAT, &["Jane", "Doe", "user@mailinator.com"]).await;
        assert_eq!(outbound.last_text(), messages::RETRY_EMAIL_DISPOSABLE);
        assert_eq!(collector.state(CHAT).await, Some(SessionState::AwaitingEmail));

        feed(&collector, CHAT, &["jane@example.com", "abcdefgh"]).await;
        assert_eq!(outbound.last_text(), messages::RETRY_PASSWORD);
        assert_eq!(registrar.calls(), 0);
    }

    #[tokio::test]
    async fn test_new_discards_previous_data() {
        let (collector, registrar, _outbound) = collector(RegistrationResult::created());

        feed(&collector, CHAT, &["/new", "Jane", "Doe", "/new"]).await;
        feed(&collector, CHAT, &["Ada", "Lovelace", "ada@example.com", "Passw0rd1"]).await;

        let request = registrar.requests.lock().unwrap()[0].clone();
        assert_eq!(request.full_name(), "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (collector, _registrar, _outbound) = collector(RegistrationResult::created());
        let other = SessionId(7);

        feed(&collector, CHAT, &["/new", "Jane"]).await;
        feed(&collector, other, &["/new"]).await;

        assert_eq!(collector.state(CHAT).await, Some(SessionState::AwaitingLastName));
        assert_eq!(collector.state(other).await, Some(SessionState::AwaitingFirstName));
    }

    #[tokio::test]
    async fn test_start_and_stray_input() {
        let (collector, _registrar, outbound) = collector(RegistrationResult::created());

        feed(&collector, CHAT, &["/start"]).await;
        assert_eq!(outbound.last_text(), messages::WELCOME);
        assert_eq!(collector.state(CHAT).await, None);

        feed(&collector, CHAT, &["hello", "/cancel", "/help"]).await;
        assert_eq!(outbound.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_strangers_leave_no_sessions() {
        let (collector, _registrar, outbound) = collector(RegistrationResult::created());

        for chat in 0..1000 {
            feed(&collector, SessionId(chat), &["hello", "/cancel"]).await;
        }

        assert!(collector.sessions.is_empty());
        assert!(outbound.sent().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dispatch_keeps_per_session_order() {
        for _ in 0..50 {
            let (collector, registrar, _outbound) = collector(RegistrationResult::created());
            let collector = Arc::new(collector);
            let other = SessionId(7);

            let turns = ["/new", "Jane", "Doe", "jane@example.com", "Passw0rd1"];
            let other_turns = ["/new", "Ada", "Lovelace", "ada@example.com", "Passw0rd1"];
            for (mine, theirs) in turns.iter().zip(other_turns.iter()) {
                collector.dispatch(CHAT, mine.to_string());
                collector.dispatch(other, theirs.to_string());
            }
            wait_until_drained(&collector).await;

            let mut names: Vec<_> = registrar
                .requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| (r.full_name(), r.email.clone()))
                .collect();
            names.sort();
            assert_eq!(
                names,
                vec![
                    ("Ada Lovelace".to_string(), "ada@example.com".to_string()),
                    ("Jane Doe".to_string(), "jane@example.com".to_string()),
                ]
            );
            assert!(collector.sessions.is_empty());
            assert!(collector.queues.is_empty());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dispatch_worker_restarts_after_idle() {
        let (collector, _registrar, outbound) = collector(RegistrationResult::created());
        let collector = Arc::new(collector);

        collector.dispatch(CHAT, "/new".to_string());
        wait_until_drained(&collector).await;
        collector.dispatch(CHAT, "Jane".to_string());
        wait_until_drained(&collector).await;

        assert_eq!(collector.state(CHAT).await, Some(SessionState::AwaitingLastName));
        assert_eq!(outbound.last_text(), messages::ASK_LAST_NAME);
    }
}
