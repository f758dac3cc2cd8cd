//! Explicit active-event context.
//!
//! Engine calls that depend on "the current event" take an [`EventContext`]
//! argument instead of reading process-wide state. [`ActiveEventCache`]
//! memoizes the lookup for long-running callers (the HTTP server) and is
//! invalidated whenever the active event is switched through
//! [`activate_event`].

use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use summerjob_db::models::SummerJobEvent;
use summerjob_db::queries::events;

use crate::error::{EngineError, EngineResult, Entity};

/// The event an engine call operates within.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub event: SummerJobEvent,
}

impl EventContext {
    /// Look up the active event. Fails with [`EngineError::NoActiveEvent`]
    /// when none is active.
    pub async fn resolve(pool: &PgPool) -> EngineResult<Self> {
        let event = events::get_active_event(pool)
            .await?
            .ok_or(EngineError::NoActiveEvent)?;
        Ok(Self { event })
    }

    pub fn event_id(&self) -> Uuid {
        self.event.id
    }
}

/// Memoized active event.
#[derive(Debug, Default)]
pub struct ActiveEventCache {
    current: RwLock<Option<EventContext>>,
}

impl ActiveEventCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached context, loading it on first use.
    pub async fn get(&self, pool: &PgPool) -> EngineResult<EventContext> {
        if let Some(ctx) = self.current.read().await.as_ref() {
            return Ok(ctx.clone());
        }

        let mut slot = self.current.write().await;
        // Another caller may have filled it while we waited for the lock.
        if let Some(ctx) = slot.as_ref() {
            return Ok(ctx.clone());
        }
        let ctx = EventContext::resolve(pool).await?;
        *slot = Some(ctx.clone());
        Ok(ctx)
    }

    /// Forget the cached event; the next [`Self::get`] reloads it.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }
}

/// Switch the active event and invalidate `cache`.
pub async fn activate_event(
    pool: &PgPool,
    cache: &ActiveEventCache,
    event_id: Uuid,
) -> EngineResult<EventContext> {
    let event = events::set_active_event(pool, event_id)
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Event, event_id))?;
    cache.invalidate().await;
    info!(event_id = %event.id, name = %event.name, "active event switched");
    Ok(EventContext { event })
}
