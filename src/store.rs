// src/store.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::models::{NewTodo, TodoEntity};

/// Durable keyed storage for todos.
///
/// Each call is its own unit of work: single-record writes are atomic, but
/// nothing spans calls, so two writers racing on one id means the later
/// write wins.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<TodoEntity>, StoreError>;

    /// Assigns a fresh id. Ids are never handed out twice.
    async fn insert(&self, todo: NewTodo) -> Result<TodoEntity, StoreError>;

    /// Overwrites the stored record. `Ok(false)` if it no longer exists.
    async fn update(&self, todo: &TodoEntity) -> Result<bool, StoreError>;

    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Every record, ascending by id.
    async fn list_all(&self) -> Result<Vec<TodoEntity>, StoreError>;
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    todos: BTreeMap<i64, TodoEntity>,
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct InMemoryTodoStore {
    inner: RwLock<Inner>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<TodoEntity>, StoreError> {
        Ok(self.inner.read().await.todos.get(&id).cloned())
    }

    async fn insert(&self, todo: NewTodo) -> Result<TodoEntity, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let entity = todo.with_id(inner.last_id);
        inner.todos.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, todo: &TodoEntity) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.todos.get_mut(&todo.id) {
            Some(slot) => {
                *slot = todo.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.todos.remove(&id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<TodoEntity>, StoreError> {
        Ok(self.inner.read().await.todos.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TodoFields;
    use chrono::{TimeZone, Utc};

    fn new_todo(name: &str) -> NewTodo {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        NewTodo {
            fields: TodoFields {
                name: name.to_string(),
                description: String::new(),
                status: "todo".to_string(),
                due_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                assignee: "alice".to_string(),
                creator: "bob".to_string(),
            },
            created_at: at,
            updated_at: at,
        }
    }

    #[actix_web::test]
    async fn ids_are_sequential_and_never_reused() {
        let store = InMemoryTodoStore::new();
        let first = store.insert(new_todo("a")).await.unwrap();
        let second = store.insert(new_todo("b")).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        assert!(store.delete(second.id).await.unwrap());
        let third = store.insert(new_todo("c")).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[actix_web::test]
    async fn list_is_in_id_order() {
        let store = InMemoryTodoStore::new();
        for name in ["a", "b", "c"] {
            store.insert(new_todo(name)).await.unwrap();
        }
        let names: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.fields.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[actix_web::test]
    async fn update_and_delete_report_missing_records() {
        let store = InMemoryTodoStore::new();
        let ghost = new_todo("ghost").with_id(42);
        assert!(!store.update(&ghost).await.unwrap());
        assert!(!store.delete(42).await.unwrap());
        assert!(store.find_by_id(42).await.unwrap().is_none());
    }
}
