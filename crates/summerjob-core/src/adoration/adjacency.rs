//! Neighbor lists for a worker's adoration slots: who prays at the same time,
//! who hands over to them, and whom they hand over to.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use summerjob_db::models::{SlotWithWorkers, WorkerContact};

use super::{AdjacencyConfig, NeighborDedup, slots_for_day_admin};
use crate::error::EngineResult;

/// One slot a worker is signed up for, with its neighbors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdorationAssignment {
    pub slot_id: Uuid,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub location: String,
    pub same_time_workers: Vec<WorkerContact>,
    /// Workers of slots ending shortly before this one starts.
    pub previous_workers: Vec<WorkerContact>,
    /// Workers of slots starting shortly after this one ends.
    pub next_workers: Vec<WorkerContact>,
}

/// Load the day's slots of an event and resolve neighbors for `worker_id`.
pub async fn for_worker_day(
    pool: &PgPool,
    event_id: Uuid,
    worker_id: Uuid,
    day: NaiveDate,
    config: &AdjacencyConfig,
) -> EngineResult<Vec<AdorationAssignment>> {
    let slots = slots_for_day_admin(pool, event_id, day).await?;
    Ok(resolve_adjacency(&slots, worker_id, config))
}

/// Neighbor resolution over one day's slots.
///
/// A slot is "previous" when it ends within the window before this slot's
/// start, and "next" when it starts within the window after this slot's end.
/// Both bounds are inclusive. The worker is never listed as their own
/// neighbor. Quadratic in the number of slots.
pub fn resolve_adjacency(
    slots: &[SlotWithWorkers],
    worker_id: Uuid,
    config: &AdjacencyConfig,
) -> Vec<AdorationAssignment> {
    let window = Duration::minutes(config.window_minutes);

    slots
        .iter()
        .filter(|s| s.has_worker(worker_id))
        .map(|mine| {
            let start = mine.slot.date_start;
            let end = mine.slot.date_end();

            let others = || slots.iter().filter(|s| s.slot.id != mine.slot.id);

            let previous = others().filter(|s| {
                let other_end = s.slot.date_end();
                other_end >= start - window && other_end <= start
            });
            let next = others().filter(|s| {
                let other_start = s.slot.date_start;
                other_start >= end && other_start <= end + window
            });

            AdorationAssignment {
                slot_id: mine.slot.id,
                start_time: start,
                end_time: end,
                location: mine.slot.location.clone(),
                same_time_workers: collect_neighbors(std::iter::once(mine), worker_id, config.dedup),
                previous_workers: collect_neighbors(previous, worker_id, config.dedup),
                next_workers: collect_neighbors(next, worker_id, config.dedup),
            }
        })
        .collect()
}

fn collect_neighbors<'a>(
    slots: impl Iterator<Item = &'a SlotWithWorkers>,
    worker_id: Uuid,
    dedup: NeighborDedup,
) -> Vec<WorkerContact> {
    let mut seen = HashSet::new();
    slots
        .flat_map(|s| s.workers.iter())
        .filter(|w| w.id != worker_id)
        .filter(|w| {
            let key = match dedup {
                NeighborDedup::ByName => w.full_name(),
                NeighborDedup::ByIdentity => w.id.to_string(),
            };
            seen.insert(key)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use summerjob_db::models::AdorationSlot;

    use super::*;

    fn at(hm: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("2026-07-14 {hm}"), "%Y-%m-%d %H:%M").unwrap()
    }

    fn person(first: &str, last: &str) -> WorkerContact {
        WorkerContact {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: format!("+420 {first}"),
        }
    }

    fn slot(start: &str, length_minutes: i32, workers: &[&WorkerContact]) -> SlotWithWorkers {
        SlotWithWorkers {
            slot: AdorationSlot {
                id: Uuid::new_v4(),
                event_id: Uuid::nil(),
                date_start: at(start),
                length_minutes,
                location: "chapel".to_string(),
                capacity: 4,
            },
            workers: workers.iter().map(|w| (*w).clone()).collect(),
        }
    }

    fn names(list: &[WorkerContact]) -> Vec<String> {
        list.iter().map(WorkerContact::full_name).collect()
    }

    #[test]
    fn ten_minute_gap_links_both_directions() {
        let anna = person("Anna", "Malá");
        let ben = person("Ben", "Velký");
        // A: 09:30-10:00, B: 10:10-10:40
        let slots = vec![slot("09:30", 30, &[&anna]), slot("10:10", 30, &[&ben])];
        let config = AdjacencyConfig::default();

        let for_ben = resolve_adjacency(&slots, ben.id, &config);
        assert_eq!(for_ben.len(), 1);
        assert_eq!(names(&for_ben[0].previous_workers), vec!["Anna Malá"]);
        assert!(for_ben[0].next_workers.is_empty());

        let for_anna = resolve_adjacency(&slots, anna.id, &config);
        assert_eq!(names(&for_anna[0].next_workers), vec!["Ben Velký"]);
        assert!(for_anna[0].previous_workers.is_empty());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let me = person("Me", "Self");
        let edge = person("Edge", "Case");
        let far = person("Too", "Far");
        let slots = vec![
            slot("08:45", 60, &[&edge]), // ends 09:45, exactly 15 min before
            slot("08:00", 104, &[&far]), // ends 09:44
            slot("10:00", 30, &[&me]),
        ];
        let result = resolve_adjacency(&slots, me.id, &AdjacencyConfig::default());
        assert_eq!(names(&result[0].previous_workers), vec!["Edge Case"]);
    }

    #[test]
    fn same_time_excludes_self() {
        let me = person("Me", "Self");
        let other = person("Other", "Person");
        let slots = vec![slot("10:00", 30, &[&me, &other])];
        let result = resolve_adjacency(&slots, me.id, &AdjacencyConfig::default());
        assert_eq!(names(&result[0].same_time_workers), vec!["Other Person"]);
    }

    #[test]
    fn worker_not_listed_as_own_neighbor() {
        let me = person("Me", "Self");
        let slots = vec![slot("09:30", 30, &[&me]), slot("10:00", 30, &[&me])];
        let result = resolve_adjacency(&slots, me.id, &AdjacencyConfig::default());
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|a| a.previous_workers.is_empty()));
        assert!(result.iter().all(|a| a.next_workers.is_empty()));
    }

    #[test]
    fn namesakes_collapse_by_name_but_not_by_identity() {
        let me = person("Me", "Self");
        let jan_one = person("Jan", "Novák");
        let jan_two = person("Jan", "Novák");
        let slots = vec![
            slot("09:30", 30, &[&jan_one]),
            slot("09:40", 20, &[&jan_two]),
            slot("10:00", 30, &[&me]),
        ];

        let by_name = resolve_adjacency(&slots, me.id, &AdjacencyConfig::default());
        assert_eq!(by_name[0].previous_workers.len(), 1);

        let config = AdjacencyConfig {
            dedup: NeighborDedup::ByIdentity,
            ..AdjacencyConfig::default()
        };
        let by_identity = resolve_adjacency(&slots, me.id, &config);
        assert_eq!(by_identity[0].previous_workers.len(), 2);
    }

    #[test]
    fn unrelated_worker_gets_nothing() {
        let anna = person("Anna", "Malá");
        let slots = vec![slot("10:00", 30, &[&anna])];
        assert!(resolve_adjacency(&slots, Uuid::new_v4(), &AdjacencyConfig::default()).is_empty());
    }
}
