//! Display client interface and registry.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::types::{DisplayData, SchedulerClientType, UserActionData};

/// Implemented by each feature that schedules notifications. The scheduler
/// calls into it to surface anything user visible.
#[async_trait]
pub trait NotificationSchedulerClient: Send + Sync {
    /// Display a notification now.
    async fn show_notification(&self, data: DisplayData);

    /// Initialization finished. `guids` lists this client's pending
    /// notifications and is empty on failure.
    async fn on_scheduler_initialized(&self, success: bool, guids: BTreeSet<String>);

    /// The user interacted with one of this client's notifications.
    async fn on_user_action(&self, action: &UserActionData);
}

/// Registered clients keyed by type.
#[derive(Clone, Default)]
pub struct ClientRegistrar {
    clients: BTreeMap<SchedulerClientType, Arc<dyn NotificationSchedulerClient>>,
}

impl ClientRegistrar {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` for `client_type`, replacing any previous one.
    pub fn register_client(
        &mut self,
        client_type: SchedulerClientType,
        client: Arc<dyn NotificationSchedulerClient>,
    ) {
        self.clients.insert(client_type, client);
    }

    /// Client registered for `client_type`.
    pub fn get_client(
        &self,
        client_type: SchedulerClientType,
    ) -> Option<Arc<dyn NotificationSchedulerClient>> {
        self.clients.get(&client_type).cloned()
    }

    /// Registered client types in order.
    pub fn registered_types(&self) -> Vec<SchedulerClientType> {
        self.clients.keys().copied().collect()
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for ClientRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistrar")
            .field("clients", &self.registered_types())
            .finish()
    }
}
