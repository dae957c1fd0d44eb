use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The mutable part of a todo. Every full update replaces all of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoFields {
    pub name: String,
    pub description: String,
    /// Free-form label such as "todo" or "done".
    pub status: String,
    /// Midnight UTC of the due day.
    pub due_date: DateTime<Utc>,
    pub assignee: String,
    pub creator: String,
}

/// A persisted todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoEntity {
    pub id: i64,
    pub fields: TodoFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A todo that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub fields: TodoFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewTodo {
    pub fn with_id(self, id: i64) -> TodoEntity {
        TodoEntity {
            id,
            fields: self.fields,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTodoRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: String,
    pub date: String,
    pub assignee: String,
    pub creator: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTodoRequest {
    pub name: String,
    pub description: String,
    pub status: String,
    pub date: String,
    pub assignee: String,
    pub creator: String,
}

/// A field of a partial update: either left alone or set to a value.
///
/// Unlike a bare `Option`, `Set(String::new())` is a real value and is
/// written through. A missing key or a JSON `null` both read as `Absent`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Absent,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Absent => None,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Absent,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchTodoRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub status: Patch<String>,
    #[serde(default)]
    pub date: Patch<String>,
    #[serde(default)]
    pub assignee: Patch<String>,
    #[serde(default)]
    pub creator: Patch<String>,
}

impl PatchTodoRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_absent()
            && self.description.is_absent()
            && self.status.is_absent()
            && self.date.is_absent()
            && self.assignee.is_absent()
            && self.creator.is_absent()
    }
}

/// What clients see. `date` is always `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: String,
    pub date: String,
    pub assignee: String,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_missing_from_empty() {
        let patch: PatchTodoRequest =
            serde_json::from_str(r#"{"description": "", "status": null}"#).unwrap();

        assert_eq!(patch.description, Patch::Set(String::new()));
        assert_eq!(patch.status, Patch::Absent);
        assert_eq!(patch.name, Patch::Absent);
        assert!(!patch.is_empty());
    }

    #[test]
    fn empty_patch_object_is_empty() {
        let patch: PatchTodoRequest = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn create_request_defaults_description() {
        let req: CreateTodoRequest = serde_json::from_str(
            r#"{"name":"a","status":"todo","date":"2024-03-01","assignee":"x","creator":"y"}"#,
        )
        .unwrap();
        assert_eq!(req.description, "");
    }

    #[test]
    fn update_request_requires_description() {
        let res = serde_json::from_str::<UpdateTodoRequest>(
            r#"{"name":"a","status":"todo","date":"2024-03-01","assignee":"x","creator":"y"}"#,
        );
        assert!(res.is_err());
    }
}
