//! Per-user front-end sessions: login gate, chat history and last search.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::ChunkMetadata;

/// The single accepted username.
pub const VALID_USERNAME: &str = "admin";
/// The single accepted password.
pub const VALID_PASSWORD: &str = "password123";

/// Chat exchanges kept per session; older turns are dropped first.
pub const MAX_CHAT_HISTORY: usize = 50;
/// Sessions unused for this long are evicted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Whether the pair matches the hardcoded credentials.
pub fn check_credentials(username: &str, password: &str) -> bool {
    username == VALID_USERNAME && password == VALID_PASSWORD
}

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    /// What the user asked.
    pub question: String,
    /// What the assistant answered.
    pub answer: String,
}

/// Most recent search and its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastSearch {
    /// Query text as submitted.
    pub query: String,
    /// Ranked results.
    pub results: Vec<ChunkMetadata>,
}

/// State owned by one logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Logged-in username.
    pub username: String,
    /// Chat exchanges, oldest first.
    pub chat_history: Vec<ChatTurn>,
    /// Last search, if any.
    pub last_search: Option<LastSearch>,
    #[serde(skip)]
    last_seen: Instant,
}

impl Session {
    /// Fresh session for `username`.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            chat_history: Vec::new(),
            last_search: None,
            last_seen: Instant::now(),
        }
    }

    /// Appends a chat exchange, keeping at most [`MAX_CHAT_HISTORY`] turns.
    pub fn record_chat(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.chat_history.push(ChatTurn {
            question: question.into(),
            answer: answer.into(),
        });
        if self.chat_history.len() > MAX_CHAT_HISTORY {
            let excess = self.chat_history.len() - MAX_CHAT_HISTORY;
            self.chat_history.drain(..excess);
        }
    }

    /// Replaces the remembered search.
    pub fn record_search(&mut self, query: impl Into<String>, results: Vec<ChunkMetadata>) {
        self.last_search = Some(LastSearch {
            query: query.into(),
            results,
        });
    }
}

/// Sessions keyed by opaque token. A token present and not idle is logged in.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    /// Empty store evicting sessions after [`DEFAULT_IDLE_TIMEOUT`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store evicting sessions idle for `idle_timeout`.
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn evict_idle(&self, sessions: &mut HashMap<String, Session>) {
        let now = Instant::now();
        sessions.retain(|_, session| now.duration_since(session.last_seen) < self.idle_timeout);
    }

    /// Opens a session and returns its token, or `None` for bad credentials.
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        if !check_credentials(username, password) {
            return None;
        }
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        self.evict_idle(&mut sessions);
        sessions.insert(token.clone(), Session::new(username));
        Some(token)
    }

    /// Ends a session. Returns `false` when the token was unknown.
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.lock().await.remove(token).is_some()
    }

    /// Runs `f` against the session for `token`, or returns `None` when logged
    /// out or idle too long. Refreshes the session's idle timer.
    pub async fn with_session<R>(&self, token: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock().await;
        self.evict_idle(&mut sessions);
        sessions.get_mut(token).map(|session| {
            session.last_seen = Instant::now();
            f(session)
        })
    }

    /// Snapshot of the session for `token`.
    pub async fn get(&self, token: &str) -> Option<Session> {
        self.with_session(token, |session| session.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_hardcoded_pair_is_accepted() {
        assert!(check_credentials("admin", "password123"));
        assert!(!check_credentials("admin", "password"));
        assert!(!check_credentials("Admin", "password123"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sessions_are_isolated_per_login() {
        let store = SessionStore::new();
        assert!(store.login("admin", "nope").await.is_none());

        let first = store.login("admin", "password123").await.expect("token");
        let second = store.login("admin", "password123").await.expect("token");
        assert_ne!(first, second);

        store
            .with_session(&first, |session| session.record_chat("q", "a"))
            .await
            .expect("session");
        assert_eq!(store.get(&first).await.unwrap().chat_history.len(), 1);
        assert!(store.get(&second).await.unwrap().chat_history.is_empty());

        assert!(store.logout(&first).await);
        assert!(store.get(&first).await.is_none());
        assert!(!store.logout(&first).await);
    }

    #[test]
    fn chat_history_keeps_the_newest_turns() {
        let mut session = Session::new("admin");
        for turn in 0..MAX_CHAT_HISTORY + 5 {
            session.record_chat(format!("q{turn}"), "a");
        }
        assert_eq!(session.chat_history.len(), MAX_CHAT_HISTORY);
        assert_eq!(session.chat_history[0].question, "q5");
        assert_eq!(
            session.chat_history.last().map(|turn| turn.question.as_str()),
            Some(format!("q{}", MAX_CHAT_HISTORY + 4).as_str())
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn idle_sessions_are_evicted() {
        let store = SessionStore::with_idle_timeout(Duration::ZERO);
        let token = store.login("admin", "password123").await.expect("token");
        assert!(store.get(&token).await.is_none());
        assert!(!store.logout(&token).await);

        let store = SessionStore::with_idle_timeout(Duration::from_secs(3600));
        let token = store.login("admin", "password123").await.expect("token");
        assert!(store.get(&token).await.is_some());
    }

    #[test]
    fn search_replaces_previous() {
        let mut session = Session::new("admin");
        session.record_search("axle", Vec::new());
        session.record_search("hub", Vec::new());
        assert_eq!(session.last_search.unwrap().query, "hub");
    }
}
