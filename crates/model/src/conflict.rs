use std::collections::{BTreeSet, HashSet};

use bson::oid::ObjectId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    class_session::{ClassSession, ResourceKind},
    slot::TimeRange,
};

/// Overlap between a candidate and a session already holding the resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub resource: ResourceKind,
    pub existing: ClassSession,
    pub candidate: ClassSession,
}

impl Conflict {
    pub fn description(&self) -> String {
        format!(
            "{} conflict on {} {} - already booked {}",
            self.resource,
            self.candidate.day_id().date().format("%d/%m/%Y"),
            self.candidate.get_slot().time_range(),
            self.existing.get_slot().time_range(),
        )
    }
}

/// Conflicts collected in discovery order, one per (resource, candidate, existing).
#[derive(Debug, Default)]
pub struct Conflicts {
    seen: HashSet<(ResourceKind, ObjectId, ObjectId)>,
    list: Vec<Conflict>,
}

impl Conflicts {
    pub fn push(
        &mut self,
        resource: ResourceKind,
        candidate: &ClassSession,
        existing: &ClassSession,
    ) {
        if self.seen.insert((resource, candidate.id, existing.id)) {
            self.list.push(Conflict {
                resource,
                existing: existing.clone(),
                candidate: candidate.clone(),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn into_vec(self) -> Vec<Conflict> {
        self.list
    }
}

/// Conflicts between candidates of the same batch.
pub fn batch_conflicts(candidates: &[ClassSession], conflicts: &mut Conflicts) {
    for (idx, candidate) in candidates.iter().enumerate() {
        for earlier in &candidates[..idx] {
            if !candidate.get_slot().has_conflict(&earlier.get_slot()) {
                continue;
            }
            for kind in ResourceKind::ALL {
                if earlier.uses(candidate.resource(kind)) {
                    conflicts.push(kind, candidate, earlier);
                }
            }
        }
    }
}

/// Presentation-ready view of one conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub resource: ResourceKind,
    pub resource_name: String,
    pub class_name: String,
    pub date: NaiveDate,
    pub time_range: TimeRange,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub entries: Vec<ConflictEntry>,
    pub room_conflicts: usize,
    pub trainer_conflicts: usize,
    /// Distinct affected dates, ascending.
    pub dates: Vec<NaiveDate>,
}

impl ConflictReport {
    pub fn new(entries: Vec<ConflictEntry>) -> ConflictReport {
        let count = |kind| entries.iter().filter(|e| e.resource == kind).count();
        let room_conflicts = count(ResourceKind::Room);
        let trainer_conflicts = count(ResourceKind::Trainer);
        let dates = entries
            .iter()
            .map(|e| e.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        ConflictReport {
            entries,
            room_conflicts,
            trainer_conflicts,
            dates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} room and {} trainer conflicts on {} dates",
            self.room_conflicts,
            self.trainer_conflicts,
            self.dates.len()
        )
    }
}
