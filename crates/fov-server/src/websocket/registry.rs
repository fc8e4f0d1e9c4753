//! Tracking of live streaming sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::connection::StreamConnection;

/// Live streaming sessions indexed by session ID.
///
/// Sessions never talk to each other; the registry only feeds `/health` and
/// lets shutdown report how many clients were dropped.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<StreamConnection>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session.
    pub async fn add(&self, connection: Arc<StreamConnection>) {
        let mut sessions = self.sessions.write().await;
        let _ = sessions.insert(connection.id.clone(), connection);
    }

    /// Remove a session by ID.
    pub async fn remove(&self, session_id: &str) -> Option<Arc<StreamConnection>> {
        self.sessions.write().await.remove(session_id)
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::super::connection::test_support::RecordingSink;
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn make(id: &str) -> Arc<StreamConnection> {
        let (sink, _rx) = RecordingSink::new();
        Arc::new(StreamConnection::new(
            id.into(),
            None,
            Box::new(sink),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn add_and_count() {
        let reg = SessionRegistry::new();
        assert_eq!(reg.count().await, 0);
        reg.add(make("a")).await;
        reg.add(make("b")).await;
        assert_eq!(reg.count().await, 2);
    }

    #[tokio::test]
    async fn remove_returns_session() {
        let reg = SessionRegistry::new();
        reg.add(make("a")).await;
        let removed = reg.remove("a").await.unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(reg.count().await, 0);
        assert!(reg.remove("a").await.is_none());
    }

    #[tokio::test]
    async fn duplicate_id_replaces() {
        let reg = SessionRegistry::new();
        reg.add(make("a")).await;
        reg.add(make("a")).await;
        assert_eq!(reg.count().await, 1);
    }
}
