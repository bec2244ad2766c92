// src/models.rs
use serde::{Deserialize, Serialize};

/// Whether resale offers are currently shown for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[serde(alias = "Voir les offres")]
    Available,
    #[serde(alias = "Non disponible")]
    Unavailable,
}

/// One match as observed on the resale page.
///
/// Identity is the ordered `teams` sequence; there is no separate match id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub teams: Vec<String>,
    pub availability: Availability,
    #[serde(rename = "phaseName", alias = "nameMatch")]
    pub phase_name: String,
}

impl MatchRecord {
    pub fn new<T: Into<String>>(
        teams: impl IntoIterator<Item = T>,
        availability: Availability,
        phase_name: impl Into<String>,
    ) -> Self {
        Self {
            teams: teams.into_iter().map(Into::into).collect(),
            availability,
            phase_name: phase_name.into(),
        }
    }

    /// "France vs All Blacks"
    pub fn display_teams(&self) -> String {
        self.teams.join(" vs ")
    }
}

/// All matches observed in the last completed scrape, in page order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Vec<MatchRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot, keeping one record per `teams` identity.
    /// A later duplicate replaces the earlier one in place.
    pub fn from_records(records: impl IntoIterator<Item = MatchRecord>) -> Self {
        let mut deduped: Vec<MatchRecord> = Vec::new();
        for record in records {
            match deduped.iter_mut().find(|r| r.teams == record.teams) {
                Some(existing) => *existing = record,
                None => deduped.push(record),
            }
        }
        Self { records: deduped }
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MatchRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
