//! Participant directory built from a fetched record set.
//!
//! Maps each participant ID to the first name seen for it and to the role
//! it held on each date. The network view labels nodes from it and the
//! analyses panel uses it to name centrality rows.

use log::warn;
use std::collections::{BTreeMap, HashMap};

use crate::ActivityRecord;

/// What the dashboard knows about one participant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantInfo {
    pub name: String,
    /// Date string -> role held on that date (last record of the day wins)
    pub roles: BTreeMap<String, String>,
}

/// ID -> participant info for one record set.
#[derive(Debug, Clone, Default)]
pub struct ParticipantDirectory {
    entries: HashMap<String, ParticipantInfo>,
}

impl ParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the directory from records. Records whose participant lists
    /// disagree in length are skipped.
    pub fn from_records(records: &[ActivityRecord]) -> Self {
        let mut directory = Self::new();
        for record in records {
            directory.add_record(record);
        }
        directory
    }

    /// Fold one record into the directory.
    pub fn add_record(&mut self, record: &ActivityRecord) {
        let participants = match record.participants() {
            Ok(p) => p,
            Err(e) => {
                warn!("[ParticipantDirectory] Skipping record: {}", e);
                return;
            }
        };

        for participant in participants {
            let entry = self
                .entries
                .entry(participant.id)
                .or_insert_with(|| ParticipantInfo {
                    name: participant.name,
                    roles: BTreeMap::new(),
                });
            entry.roles.insert(record.date.clone(), participant.role);
        }
    }

    pub fn get(&self, id: &str) -> Option<&ParticipantInfo> {
        self.entries.get(id)
    }

    /// Display name for an ID; the ID itself when unknown or unnamed.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        match self.entries.get(id) {
            Some(info) if !info.name.is_empty() => &info.name,
            _ => id,
        }
    }

    /// Role held on a date, if recorded.
    pub fn role_on(&self, id: &str, date: &str) -> Option<&str> {
        self.entries
            .get(id)
            .and_then(|info| info.roles.get(date))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
