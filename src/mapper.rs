// src/mapper.rs
//
// Conversions between request/response shapes and the stored entity.
// Nothing in here touches the store or the clock.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::errors::ValidationError;
use crate::models::{
    CreateTodoRequest, PatchTodoRequest, TodoEntity, TodoFields, TodoResponse, UpdateTodoRequest,
};

pub const NAME_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;
pub const STATUS_MAX: usize = 50;
pub const ASSIGNEE_MAX: usize = 100;
pub const CREATOR_MAX: usize = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a due date into midnight UTC of that day.
///
/// Plain `YYYY-MM-DD` is the canonical form. RFC 3339 timestamps and
/// offset-less `YYYY-MM-DDTHH:MM:SS` are also accepted: they are
/// normalized to UTC first and the time of day is dropped.
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = raw.trim();
    let invalid = || ValidationError::InvalidDate {
        value: raw.to_string(),
    };

    // chrono accepts "2024-3-1", which would not format back the same
    if !has_padded_date_prefix(value) {
        return Err(invalid());
    }

    let day = NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .ok_or_else(invalid)?;

    Ok(day.and_time(NaiveTime::MIN).and_utc())
}

/// `YYYY-MM-DD` with every digit present.
fn has_padded_date_prefix(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 10
        && bytes[..10].iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
        && bytes.get(10).map_or(true, |b| !b.is_ascii_digit())
}

pub fn format_due_date(due_date: &DateTime<Utc>) -> String {
    due_date.format(DATE_FORMAT).to_string()
}

// Lengths are counted in UTF-16 code units to match the column limits.
fn code_units(value: &str) -> usize {
    value.encode_utf16().count()
}

fn check_required(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    check_length(field, value, max)
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if code_units(value) > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Checks every field bound. Description is the only field allowed to be empty.
pub fn validate_fields(fields: &TodoFields) -> Result<(), ValidationError> {
    check_required("name", &fields.name, NAME_MAX)?;
    check_length("description", &fields.description, DESCRIPTION_MAX)?;
    check_required("status", &fields.status, STATUS_MAX)?;
    check_required("assignee", &fields.assignee, ASSIGNEE_MAX)?;
    check_required("creator", &fields.creator, CREATOR_MAX)?;
    Ok(())
}

fn build_fields(
    name: &str,
    description: &str,
    status: &str,
    date: &str,
    assignee: &str,
    creator: &str,
) -> Result<TodoFields, ValidationError> {
    let fields = TodoFields {
        name: name.to_string(),
        description: description.to_string(),
        status: status.to_string(),
        due_date: parse_due_date(date)?,
        assignee: assignee.to_string(),
        creator: creator.to_string(),
    };
    validate_fields(&fields)?;
    Ok(fields)
}

/// Create payload -> validated entity fields.
pub fn to_entity(payload: &CreateTodoRequest) -> Result<TodoFields, ValidationError> {
    build_fields(
        &payload.name,
        &payload.description,
        &payload.status,
        &payload.date,
        &payload.assignee,
        &payload.creator,
    )
}

/// Full-update payload -> the complete replacement field set.
pub fn to_replacement(payload: &UpdateTodoRequest) -> Result<TodoFields, ValidationError> {
    build_fields(
        &payload.name,
        &payload.description,
        &payload.status,
        &payload.date,
        &payload.assignee,
        &payload.creator,
    )
}

/// Applies the present fields of `patch` on top of `current`.
///
/// Returns a new field set; `current` is never touched, so a rejected
/// patch leaves nothing half-applied.
pub fn merge_patch(
    current: &TodoFields,
    patch: &PatchTodoRequest,
) -> Result<TodoFields, ValidationError> {
    let mut merged = current.clone();

    if let Some(name) = patch.name.as_set() {
        merged.name = name.clone();
    }
    if let Some(description) = patch.description.as_set() {
        merged.description = description.clone();
    }
    if let Some(status) = patch.status.as_set() {
        merged.status = status.clone();
    }
    if let Some(date) = patch.date.as_set() {
        merged.due_date = parse_due_date(date)?;
    }
    if let Some(assignee) = patch.assignee.as_set() {
        merged.assignee = assignee.clone();
    }
    if let Some(creator) = patch.creator.as_set() {
        merged.creator = creator.clone();
    }

    validate_fields(&merged)?;
    Ok(merged)
}

pub fn to_output(entity: &TodoEntity) -> TodoResponse {
    TodoResponse {
        id: entity.id,
        name: entity.fields.name.clone(),
        description: entity.fields.description.clone(),
        status: entity.fields.status.clone(),
        date: format_due_date(&entity.fields.due_date),
        assignee: entity.fields.assignee.clone(),
        creator: entity.fields.creator.clone(),
        created_at: entity.created_at,
        updated_at: entity.updated_at,
    }
}
