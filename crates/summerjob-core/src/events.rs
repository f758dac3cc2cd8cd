//! Event management.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::info;

use summerjob_db::models::SummerJobEvent;
use summerjob_db::queries::events;

use crate::error::{EngineError, EngineResult};

pub use crate::context::activate_event;

/// Create an inactive event spanning `start_date..=end_date`.
pub async fn create_event(
    pool: &PgPool,
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> EngineResult<SummerJobEvent> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidInput("event name must not be empty".to_string()));
    }
    if start_date > end_date {
        return Err(EngineError::InvalidRange(format!(
            "event starts {start_date} after it ends {end_date}"
        )));
    }

    let event = events::insert_event(pool, name, start_date, end_date).await?;
    info!(event_id = %event.id, %name, "event created");
    Ok(event)
}

/// All events, most recent first.
pub async fn list_events(pool: &PgPool) -> EngineResult<Vec<SummerJobEvent>> {
    Ok(events::list_events(pool).await?)
}
