use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Catalogue rows
// ---------------------------------------------------------------------------

/// A summer job event -- the season that plans and adoration slots belong to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SummerJobEvent {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl SummerJobEvent {
    /// Whether `day` falls inside the event's date range (inclusive).
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

/// A volunteer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Worker {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub is_strong: bool,
    pub created_at: DateTime<Utc>,
}

/// The slice of a worker shown to other workers: name and phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WorkerContact {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl WorkerContact {
    /// `"First Last"`.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A car owned by a worker.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub seats: i32,
}

/// A job definition not yet tied to a day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProposedJob {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub public_description: String,
    pub private_description: String,
    pub address: String,
    pub contact: String,
    pub has_food: bool,
    pub has_shower: bool,
}

// ---------------------------------------------------------------------------
// Plan rows
// ---------------------------------------------------------------------------

/// One calendar day of one event.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub event_id: Uuid,
    pub day: NaiveDate,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// A proposed job scheduled into a plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActiveJob {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub proposed_job_id: Uuid,
    pub public_description: String,
    pub private_description: String,
    pub responsible_worker_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// An active job joined with its proposed job's name, for display.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActiveJobSummary {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub proposed_job_id: Uuid,
    pub name: String,
    pub public_description: String,
    pub responsible_worker_id: Option<Uuid>,
}

/// A carpool attached to one active job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ride {
    pub id: Uuid,
    pub job_id: Uuid,
    pub driver_id: Uuid,
    pub car_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A ride together with its passenger ids.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RideWithPassengers {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ride: Ride,
    pub passenger_ids: Vec<Uuid>,
}

impl RideWithPassengers {
    /// Whether `worker_id` drives or rides in this ride.
    pub fn carries(&self, worker_id: Uuid) -> bool {
        self.ride.driver_id == worker_id || self.passenger_ids.contains(&worker_id)
    }
}

// ---------------------------------------------------------------------------
// Adoration rows
// ---------------------------------------------------------------------------

/// A bookable adoration time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AdorationSlot {
    pub id: Uuid,
    pub event_id: Uuid,
    pub date_start: NaiveDateTime,
    pub length_minutes: i32,
    pub location: String,
    pub capacity: i32,
}

impl AdorationSlot {
    /// Wall-clock end of the slot.
    pub fn date_end(&self) -> NaiveDateTime {
        self.date_start + Duration::minutes(i64::from(self.length_minutes))
    }
}

/// A slot with the contacts of everyone signed up for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotWithWorkers {
    #[serde(flatten)]
    pub slot: AdorationSlot,
    pub workers: Vec<WorkerContact>,
}

impl SlotWithWorkers {
    pub fn has_worker(&self, worker_id: Uuid) -> bool {
        self.workers.iter().any(|w| w.id == worker_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(start: &str, length_minutes: i32) -> AdorationSlot {
        AdorationSlot {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            date_start: NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M").unwrap(),
            length_minutes,
            location: "chapel".to_string(),
            capacity: 2,
        }
    }

    #[test]
    fn slot_end_adds_length() {
        let s = slot("2026-07-14 09:30", 45);
        assert_eq!(s.date_end().format("%H:%M").to_string(), "10:15");
    }

    #[test]
    fn slot_end_crosses_midnight() {
        let s = slot("2026-07-14 23:30", 60);
        assert_eq!(
            s.date_end().format("%Y-%m-%d %H:%M").to_string(),
            "2026-07-15 00:30"
        );
    }

    #[test]
    fn event_contains_day_is_inclusive() {
        let event = SummerJobEvent {
            id: Uuid::new_v4(),
            name: "Summer".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 7, 7).unwrap(),
            is_active: true,
            created_at: Utc::now(),
        };
        assert!(event.contains_day(NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()));
        assert!(event.contains_day(NaiveDate::from_ymd_opt(2026, 7, 7).unwrap()));
        assert!(!event.contains_day(NaiveDate::from_ymd_opt(2026, 7, 8).unwrap()));
    }

    #[test]
    fn ride_carries_driver_and_passengers() {
        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let ride = RideWithPassengers {
            ride: Ride {
                id: Uuid::new_v4(),
                job_id: Uuid::new_v4(),
                driver_id: driver,
                car_id: Uuid::new_v4(),
                created_at: Utc::now(),
            },
            passenger_ids: vec![passenger],
        };
        assert!(ride.carries(driver));
        assert!(ride.carries(passenger));
        assert!(!ride.carries(Uuid::new_v4()));
    }
}
