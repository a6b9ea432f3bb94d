use chrono::NaiveDate;

use crate::models::{AssessmentRecord, AuditLogEntry, Portfolio};

/// Exposes the fields the filter pipeline looks at.
pub trait Filterable {
    /// Up to two free-text fields searched by the `search` criterion.
    fn search_fields(&self) -> [Option<&str>; 2];
    fn status(&self) -> Option<&str> {
        None
    }
    fn kind(&self) -> Option<&str> {
        None
    }
    fn date(&self) -> Option<NaiveDate>;
}

impl Filterable for AuditLogEntry {
    fn search_fields(&self) -> [Option<&str>; 2] {
        [self.user.as_deref(), self.description.as_deref()]
    }

    fn kind(&self) -> Option<&str> {
        self.action_type.as_ref().map(|a| a.as_str())
    }

    fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date_naive())
    }
}

impl Filterable for AssessmentRecord {
    fn search_fields(&self) -> [Option<&str>; 2] {
        [self.course.as_deref(), self.trainer.as_deref()]
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn kind(&self) -> Option<&str> {
        self.course.as_deref()
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

impl Filterable for Portfolio {
    fn search_fields(&self) -> [Option<&str>; 2] {
        [self.learner_name.as_deref(), self.qualification.as_deref()]
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn kind(&self) -> Option<&str> {
        self.qualification.as_deref()
    }

    fn date(&self) -> Option<NaiveDate> {
        self.submitted_at.map(|ts| ts.date_naive())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub search: Option<String>,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn matches<T: Filterable>(&self, record: &T) -> bool {
        self.matches_search(record)
            && matches_choice(self.status.as_deref(), record.status())
            && matches_choice(self.kind.as_deref(), record.kind())
            && self.matches_dates(record)
    }

    /// Keeps the records matching every active criterion, in their original order.
    pub fn retain<T: Filterable>(&self, records: Vec<T>) -> Vec<T> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }

    /// Human-readable summary of the active criteria, `None` when nothing narrows the set.
    pub fn describe(&self) -> Option<String> {
        let choice = |value: Option<&str>| {
            active(value).filter(|v| !v.eq_ignore_ascii_case("all")).map(str::to_string)
        };
        let parts: Vec<String> = [
            active(self.search.as_deref()).map(|s| format!("search \"{s}\"")),
            choice(self.status.as_deref()).map(|s| format!("status {s}")),
            choice(self.kind.as_deref()).map(|k| format!("type {k}")),
            self.from.map(|d| format!("from {d}")),
            self.to.map(|d| format!("to {d}")),
        ]
        .into_iter()
        .flatten()
        .collect();

        (!parts.is_empty()).then(|| parts.join(", "))
    }

    fn matches_search<T: Filterable>(&self, record: &T) -> bool {
        let Some(term) = active(self.search.as_deref()) else {
            return true;
        };
        let term = term.to_lowercase();
        record
            .search_fields()
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term))
    }

    fn matches_dates<T: Filterable>(&self, record: &T) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(date) = record.date() else {
            return false;
        };
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

fn active(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `all` or an empty value disables the choice filter.
fn matches_choice(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match active(wanted) {
        None => true,
        Some(w) if w.eq_ignore_ascii_case("all") => true,
        Some(w) => actual.is_some_and(|a| a.trim().eq_ignore_ascii_case(w)),
    }
}
