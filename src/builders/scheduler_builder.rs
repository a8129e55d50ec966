//! Assemble a [`NotificationSchedulerImpl`] from configuration.

use std::sync::Arc;

use crate::config::{SchedulerConfig, StoreBackendConfig};
use crate::core::{
    BackgroundTaskScheduler, ClientRegistrar, ClientState, ImpressionHistoryTracker,
    InitAwareNotificationScheduler, NoopBackgroundTaskScheduler, NotificationEntry,
    NotificationSchedulerClient, NotificationSchedulerImpl, ScheduledNotificationManager,
    SchedulerClientType, SchedulerContext, SchedulerError,
};
use crate::infra::store::{CollectionStore, InMemoryStore, JsonlStore};
use crate::util::clock::{Clock, SystemClock};

/// File name of the pending notification store under a file backend.
pub const NOTIFICATION_STORE_FILE: &str = "notifications.jsonl";
/// File name of the impression store under a file backend.
pub const IMPRESSION_STORE_FILE: &str = "impressions.jsonl";

/// Collects clients and collaborators, then builds a scheduler.
///
/// Stores default to the backend selected by [`SchedulerConfig::store`];
/// the clock defaults to [`SystemClock`] and the background task scheduler
/// to [`NoopBackgroundTaskScheduler`].
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    clients: ClientRegistrar,
    clock: Arc<dyn Clock>,
    background_task: Arc<dyn BackgroundTaskScheduler>,
    notification_store: Option<Arc<dyn CollectionStore<NotificationEntry>>>,
    impression_store: Option<Arc<dyn CollectionStore<ClientState>>>,
}

impl SchedulerBuilder {
    /// Start from `config`.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            clients: ClientRegistrar::new(),
            clock: Arc::new(SystemClock),
            background_task: Arc::new(NoopBackgroundTaskScheduler),
            notification_store: None,
            impression_store: None,
        }
    }

    /// Register a display client.
    #[must_use]
    pub fn with_client(
        mut self,
        client_type: SchedulerClientType,
        client: Arc<dyn NotificationSchedulerClient>,
    ) -> Self {
        self.clients.register_client(client_type, client);
        self
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the background task scheduler.
    #[must_use]
    pub fn with_background_task_scheduler(
        mut self,
        background_task: Arc<dyn BackgroundTaskScheduler>,
    ) -> Self {
        self.background_task = background_task;
        self
    }

    /// Override the pending notification store.
    #[must_use]
    pub fn with_notification_store(
        mut self,
        store: Arc<dyn CollectionStore<NotificationEntry>>,
    ) -> Self {
        self.notification_store = Some(store);
        self
    }

    /// Override the impression store.
    #[must_use]
    pub fn with_impression_store(mut self, store: Arc<dyn CollectionStore<ClientState>>) -> Self {
        self.impression_store = Some(store);
        self
    }

    /// Validate the configuration and build an uninitialized scheduler.
    pub fn build(self) -> Result<NotificationSchedulerImpl, SchedulerError> {
        self.config
            .validate()
            .map_err(|e| SchedulerError::Backend(format!("config invalid: {e}")))?;
        if self.clients.is_empty() {
            tracing::warn!("building a notification scheduler without clients");
        }

        let (default_notifications, default_impressions) = default_stores(&self.config.store);
        let notification_store = self.notification_store.unwrap_or(default_notifications);
        let impression_store = self.impression_store.unwrap_or(default_impressions);

        let tracker = ImpressionHistoryTracker::new(
            impression_store,
            self.config.clone(),
            self.clients.registered_types(),
        );
        let manager = ScheduledNotificationManager::new(notification_store);
        tracing::debug!(
            clients = self.clients.len(),
            store = ?self.config.store,
            "notification scheduler built"
        );

        Ok(NotificationSchedulerImpl::new(SchedulerContext {
            config: self.config,
            clients: self.clients,
            tracker,
            manager,
            background_task: self.background_task,
            clock: self.clock,
        }))
    }

    /// Like [`build`](Self::build), wrapped so that calls made before
    /// `init` completes are buffered.
    pub fn build_init_aware(
        self,
    ) -> Result<InitAwareNotificationScheduler<NotificationSchedulerImpl>, SchedulerError> {
        self.build().map(InitAwareNotificationScheduler::new)
    }
}

fn default_stores(
    backend: &StoreBackendConfig,
) -> (Arc<dyn CollectionStore<NotificationEntry>>, Arc<dyn CollectionStore<ClientState>>) {
    match backend {
        StoreBackendConfig::InMemory => (
            Arc::new(InMemoryStore::<NotificationEntry>::new()),
            Arc::new(InMemoryStore::<ClientState>::new()),
        ),
        StoreBackendConfig::File { dir } => (
            Arc::new(JsonlStore::<NotificationEntry>::new(dir.join(NOTIFICATION_STORE_FILE))),
            Arc::new(JsonlStore::<ClientState>::new(dir.join(IMPRESSION_STORE_FILE))),
        ),
    }
}
