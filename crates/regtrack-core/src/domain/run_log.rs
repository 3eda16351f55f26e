use std::fmt::{Display, Formatter};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Named entries of a run log, in log-table column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunLogKey {
    RunStart,
    CompaniesCollected,
    DataCollectionDone,
    ValidatedCompanies,
    ValidationDone,
    InterimUpdate,
    FollowUpDone,
    RunFinished,
}

impl RunLogKey {
    pub const ALL: [Self; 8] = [
        Self::RunStart,
        Self::CompaniesCollected,
        Self::DataCollectionDone,
        Self::ValidatedCompanies,
        Self::ValidationDone,
        Self::InterimUpdate,
        Self::FollowUpDone,
        Self::RunFinished,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunStart => "run_start_ts",
            Self::CompaniesCollected => "companies_collected",
            Self::DataCollectionDone => "data_collection_done_ts",
            Self::ValidatedCompanies => "validated_companies",
            Self::ValidationDone => "validation_done_ts",
            Self::InterimUpdate => "interim_update_ts",
            Self::FollowUpDone => "follow_up_done_ts",
            Self::RunFinished => "run_finished_ts",
        }
    }
}

impl Display for RunLogKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLogValue {
    Timestamp(OffsetDateTime),
    Count(usize),
}

impl Display for RunLogValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timestamp(ts) => f.write_str(&format_timestamp(*ts)),
            Self::Count(count) => write!(f, "{count}"),
        }
    }
}

/// RFC 3339 rendering used for every exported timestamp.
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

/// Ordered, append-only record of one run's stage timestamps and counters.
///
/// Timestamps never go backwards: a wall clock that steps back is clamped
/// to the latest recorded timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLog {
    entries: Vec<(RunLogKey, RunLogValue)>,
    started_at: OffsetDateTime,
    last_timestamp: OffsetDateTime,
}

impl RunLog {
    pub fn start() -> Self {
        Self::start_at(OffsetDateTime::now_utc())
    }

    pub fn start_at(started_at: OffsetDateTime) -> Self {
        Self {
            entries: vec![(RunLogKey::RunStart, RunLogValue::Timestamp(started_at))],
            started_at,
            last_timestamp: started_at,
        }
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    pub fn record_timestamp(&mut self, key: RunLogKey) -> OffsetDateTime {
        self.record_timestamp_at(key, OffsetDateTime::now_utc())
    }

    pub fn record_timestamp_at(&mut self, key: RunLogKey, at: OffsetDateTime) -> OffsetDateTime {
        let at = at.max(self.last_timestamp);
        self.last_timestamp = at;
        self.entries.push((key, RunLogValue::Timestamp(at)));
        at
    }

    pub fn record_count(&mut self, key: RunLogKey, count: usize) {
        self.entries.push((key, RunLogValue::Count(count)));
    }

    /// Latest value recorded under `key`.
    pub fn get(&self, key: RunLogKey) -> Option<RunLogValue> {
        self.entries
            .iter()
            .rev()
            .find(|(entry_key, _)| *entry_key == key)
            .map(|(_, value)| *value)
    }

    pub fn count(&self, key: RunLogKey) -> Option<usize> {
        match self.get(key) {
            Some(RunLogValue::Count(count)) => Some(count),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[(RunLogKey, RunLogValue)] {
        &self.entries
    }

    /// One cell per log-table column; unrecorded entries are empty.
    pub fn to_row(&self) -> Vec<String> {
        RunLogKey::ALL
            .iter()
            .map(|key| self.get(*key).map(|value| value.to_string()).unwrap_or_default())
            .collect()
    }

    pub fn summary(&self) -> String {
        RunLogKey::ALL
            .iter()
            .filter_map(|key| self.get(*key).map(|value| format!("{key}: {value}")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
