use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cartsync_engine::{
    Analytics, AnalyticsEvent, CartEngine, EngineConfig, Notifier, NoticeLevel,
};
use cartsync_storage::{SqliteStore, StorageError};

use crate::server::MockCartApi;

/// Captures every notice for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn messages_at(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn emit(&self, level: NoticeLevel, message: &str) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

/// Captures every analytics event for assertions.
#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Analytics for RecordingAnalytics {
    fn record(&self, event: AnalyticsEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// A cart engine wired to the mock server, an in-memory store, and
/// recording notification/analytics sinks.
pub struct TestClient {
    pub api: Arc<MockCartApi>,
    pub engine: CartEngine<Arc<MockCartApi>>,
    pub notifier: Arc<RecordingNotifier>,
    pub analytics: Arc<RecordingAnalytics>,
}

impl TestClient {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_config(Self::fast_config())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, StorageError> {
        let store = SqliteStore::open_in_memory()?;
        Ok(Self::with_store(store, config))
    }

    /// Build against a caller-provided store, e.g. an on-disk database for
    /// restart tests.
    pub fn with_store(store: SqliteStore, config: EngineConfig) -> Self {
        let api = Arc::new(MockCartApi::new());
        Self::against(api, store, config)
    }

    /// Build against an existing mock server (shared across "restarts").
    pub fn against(api: Arc<MockCartApi>, store: SqliteStore, config: EngineConfig) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let analytics = Arc::new(RecordingAnalytics::default());
        let notifier_sink: Arc<dyn Notifier> = notifier.clone();
        let analytics_sink: Arc<dyn Analytics> = analytics.clone();
        let engine = CartEngine::new(Arc::clone(&api), store, config)
            .with_notifier(notifier_sink)
            .with_analytics(analytics_sink);
        Self {
            api,
            engine,
            notifier,
            analytics,
        }
    }

    /// Production shape, but with millisecond delays so tests stay fast.
    pub fn fast_config() -> EngineConfig {
        EngineConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            reconnect_delay: Duration::from_millis(1),
            max_queue_attempts: 3,
        }
    }
}
