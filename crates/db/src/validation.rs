//! Field rules applied to task bodies before anything is written.

use std::{collections::BTreeMap, str::FromStr};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{TaskPriority, TaskStatus};

pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 255;
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Per-field error messages, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("validation failed")]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// The writable part of a task, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    /// Overlays the recognised keys of `body` and validates the result.
    ///
    /// Keys that are absent keep their current value; unknown and
    /// server-managed keys are ignored.
    pub fn apply(mut self, body: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match body.get("title") {
            None => {}
            Some(Value::Null) => self.title = String::new(),
            Some(Value::String(title)) => self.title = title.clone(),
            Some(_) => errors.add("title", "Title must be a string."),
        }

        match body.get("description") {
            None => {}
            Some(Value::Null) => self.description = None,
            Some(Value::String(text)) if text.is_empty() => self.description = None,
            Some(Value::String(text)) => self.description = Some(text.clone()),
            Some(_) => errors.add("description", "Description must be a string."),
        }

        match enum_field::<TaskStatus>(body.get("status")) {
            Ok(Some(status)) => self.status = status,
            Ok(None) => {}
            Err(()) => errors.add("status", "Status is invalid."),
        }

        match enum_field::<TaskPriority>(body.get("priority")) {
            Ok(Some(priority)) => self.priority = priority,
            Ok(None) => {}
            Err(()) => errors.add("priority", "Priority is invalid."),
        }

        match body.get("due_date") {
            None => {}
            Some(Value::Null) => self.due_date = None,
            Some(Value::String(raw)) if raw.is_empty() => self.due_date = None,
            Some(Value::String(raw)) => match parse_due_date(raw) {
                Some(date) => self.due_date = Some(date),
                None => errors.add("due_date", "The format of Due Date is invalid."),
            },
            Some(_) => errors.add("due_date", "The format of Due Date is invalid."),
        }

        if errors.get("title").is_none() {
            title_errors(&self.title, &mut errors);
        }

        errors.into_result().map(|_| self)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        title_errors(&self.title, &mut errors);
        errors.into_result()
    }
}

fn title_errors(title: &str, errors: &mut ValidationErrors) {
    if title.trim().is_empty() {
        errors.add("title", "Title cannot be blank.");
        return;
    }
    let chars = title.chars().count();
    if chars < TITLE_MIN_CHARS {
        errors.add(
            "title",
            format!("Title should contain at least {TITLE_MIN_CHARS} characters."),
        );
    } else if chars > TITLE_MAX_CHARS {
        errors.add(
            "title",
            format!("Title should contain at most {TITLE_MAX_CHARS} characters."),
        );
    }
}

/// `null` and `""` leave the current value in place.
fn enum_field<T: FromStr>(value: Option<&Value>) -> Result<Option<T>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) if raw.is_empty() => Ok(None),
        Some(Value::String(raw)) => T::from_str(raw).map(Some).map_err(|_| ()),
        Some(_) => Err(()),
    }
}

/// Strict `YYYY-MM-DD`, rejecting impossible calendar dates.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, DUE_DATE_FORMAT).ok()
}
