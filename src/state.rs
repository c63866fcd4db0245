use std::sync::Arc;

use crate::db::{DbPool, OrmConn};
use crate::events::{self, EventSender};
use crate::notify::{LogNotifier, NotificationSink};
use crate::status::StatusRegistry;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub registry: Arc<StatusRegistry>,
    pub events: EventSender,
    pub notifier: Arc<dyn NotificationSink>,
}

impl AppState {
    /// Wire up shared state: load (or seed) the status catalog into the
    /// immutable registry and start the domain event consumer.
    pub async fn build(pool: DbPool, orm: OrmConn) -> anyhow::Result<Self> {
        let registry = Arc::new(StatusRegistry::load_or_seed(&orm).await?);
        let notifier: Arc<dyn NotificationSink> = Arc::new(LogNotifier);
        let (sender, receiver) = events::channel(256);
        events::spawn_consumer(receiver, notifier.clone());
        Ok(Self {
            pool,
            orm,
            registry,
            events: sender,
            notifier,
        })
    }
}
