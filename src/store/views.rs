//! Read-only views over event snapshots
//!
//! Filtering, sorting and the summary counts shown on dashboards. These
//! operate on borrowed records and never touch a projection.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use chrono::{DateTime, Datelike, Utc};
use crate::models::{Event, EventCategory, EventStatus};

/// Label used for events without a category
pub const UNCATEGORIZED: &str = "Other";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub category: Option<EventCategory>,
    pub status: Option<EventStatus>,
    /// Case-insensitive substring matched against title and description
    pub search: Option<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: EventCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        if self.category.is_some() && event.category != self.category {
            return false;
        }
        if self.status.is_some_and(|status| event.status != status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                event.title.to_lowercase().contains(&needle)
                    || event.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }

    /// Matching events, in their original order
    pub fn apply<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        events.iter().filter(|e| self.matches(e)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    DateTime,
    Title,
    Category,
    Status,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Clicking the active key flips direction; a new key starts ascending
    pub fn select(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.direction.toggled())
        } else {
            Self::new(key, SortDirection::Ascending)
        }
    }

    fn compare(&self, a: &Event, b: &Event) -> Ordering {
        let ordering = match self.key {
            SortKey::DateTime => a.date_time.cmp(&b.date_time),
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            // Uncategorized events sort last
            SortKey::Category => match (a.category, b.category) {
                (Some(x), Some(y)) => x.as_str().cmp(y.as_str()),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    /// Sort in place; ties keep their relative order
    pub fn sort(&self, events: &mut [&Event]) {
        events.sort_by(|a, b| self.compare(a, b));
    }
}

/// Filter then sort, the way list pages present a snapshot
pub fn select_events<'a>(events: &'a [Event], filter: &EventFilter, order: SortOrder) -> Vec<&'a Event> {
    let mut selected = filter.apply(events);
    order.sort(&mut selected);
    selected
}

/// Number of events per category label, uncategorized ones under [`UNCATEGORIZED`]
pub fn category_counts(events: &[Event]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        let label = event
            .category
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected
    }
}

pub fn status_counts(events: &[Event]) -> StatusCounts {
    events.iter().fold(StatusCounts::default(), |mut acc, event| {
        match event.status {
            EventStatus::Pending => acc.pending += 1,
            EventStatus::Approved => acc.approved += 1,
            EventStatus::Rejected => acc.rejected += 1,
        }
        acc
    })
}

/// Number of events per `(year, month)` of their date, in calendar order
pub fn monthly_counts(events: &[Event]) -> BTreeMap<(i32, u32), usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry((event.date_time.year(), event.date_time.month())).or_insert(0) += 1;
    }
    counts
}

/// Events dated strictly after `now`
pub fn upcoming_count(events: &[Event], now: DateTime<Utc>) -> usize {
    events.iter().filter(|e| e.date_time > now).count()
}
