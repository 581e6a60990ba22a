//! Local projection of one remote table
//!
//! A projection is the ordered, id-unique collection of records a client
//! currently believes to be true, plus the `loading` and `error` status
//! fields that go with it.

use crate::models::{Record, RecordId};

/// Result of an [`Projection::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record with that id existed; appended at the end
    Inserted,
    /// An existing record was replaced in place
    Replaced,
    /// An equal record was already present
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection<T> {
    records: Vec<T>,
    in_flight: usize,
    error: Option<String>,
}

impl<T> Default for Projection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            in_flight: 0,
            error: None,
        }
    }
}

impl<T: Record> Projection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.position(id).is_some()
    }

    /// True while at least one operation is in flight
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Message of the most recent failed operation
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    /// Replace the whole collection with a fresh snapshot, keeping its order.
    /// Should a snapshot repeat an id, the first occurrence wins.
    pub fn replace(&mut self, records: Vec<T>) {
        let mut unique: Vec<T> = Vec::with_capacity(records.len());
        for record in records {
            if !unique.iter().any(|r| r.id() == record.id()) {
                unique.push(record);
            }
        }
        self.records = unique;
    }

    /// Replace the record with the same id in place, or append it
    pub fn upsert(&mut self, record: T) -> UpsertOutcome {
        match self.position(record.id()) {
            Some(index) if self.records[index] == record => UpsertOutcome::Unchanged,
            Some(index) => {
                self.records[index] = record;
                UpsertOutcome::Replaced
            }
            None => {
                self.records.push(record);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Append the record unless its id is already present
    pub fn insert_if_absent(&mut self, record: T) -> bool {
        if self.contains(record.id()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Drop the record with that id. Absent ids are a no-op.
    pub fn remove(&mut self, id: &RecordId) -> Option<T> {
        self.position(id).map(|index| self.records.remove(index))
    }

    /// An operation started: it is now in flight and the previous error is stale
    pub(crate) fn begin(&mut self) {
        self.in_flight += 1;
        self.error = None;
    }

    pub(crate) fn settle(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.settle();
        self.error = Some(message.into());
    }
}
