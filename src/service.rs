// src/service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info};

use crate::errors::{TodoError, TodoResult};
use crate::mapper;
use crate::models::{
    CreateTodoRequest, NewTodo, PatchTodoRequest, TodoEntity, TodoFields, TodoResponse,
    UpdateTodoRequest,
};
use crate::store::TodoStore;

/// Source of "now" for audit timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fetch/merge/validate/persist for every todo operation.
///
/// Holds no locks of its own. Concurrent updates of the same id race and
/// the last write wins; there is no version check.
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
    clock: Arc<dyn Clock>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn TodoStore>, clock: Arc<dyn Clock>) -> Self {
        TodoService { store, clock }
    }

    /// All todos, ascending by id.
    pub async fn list_records(&self) -> TodoResult<Vec<TodoResponse>> {
        let todos = self.store.list_all().await.map_err(|e| {
            error!("Error listing todos: {}", e);
            e
        })?;
        Ok(todos.iter().map(mapper::to_output).collect())
    }

    pub async fn get_record(&self, id: i64) -> TodoResult<TodoResponse> {
        let entity = self.fetch(id).await?;
        Ok(mapper::to_output(&entity))
    }

    pub async fn create_record(&self, payload: &CreateTodoRequest) -> TodoResult<TodoResponse> {
        let fields = mapper::to_entity(payload)?;
        let now = self.clock.now();
        let new_todo = NewTodo {
            fields,
            created_at: now,
            updated_at: now,
        };

        let entity = self.store.insert(new_todo).await.map_err(|e| {
            error!("Error inserting todo: {}", e);
            e
        })?;
        info!("Todo created: {}", entity.id);
        Ok(mapper::to_output(&entity))
    }

    /// Overwrites every mutable field. `created_at` is kept.
    pub async fn replace_record(&self, id: i64, payload: &UpdateTodoRequest) -> TodoResult<()> {
        let fields = mapper::to_replacement(payload)?;
        let current = self.fetch(id).await?;
        self.save(current, fields).await?;
        info!("Todo replaced: {}", id);
        Ok(())
    }

    /// Applies only the fields present in `payload`. A bad field rejects the
    /// whole patch before anything is written.
    pub async fn merge_record(&self, id: i64, payload: &PatchTodoRequest) -> TodoResult<()> {
        if payload.is_empty() {
            debug!("Empty patch for todo {}, only updated_at changes", id);
        }
        let current = self.fetch(id).await?;
        let fields = mapper::merge_patch(&current.fields, payload)?;
        self.save(current, fields).await?;
        info!("Todo patched: {}", id);
        Ok(())
    }

    pub async fn delete_record(&self, id: i64) -> TodoResult<()> {
        let removed = self.store.delete(id).await.map_err(|e| {
            error!("Error deleting todo {}: {}", id, e);
            e
        })?;
        if !removed {
            debug!("Delete of missing todo {}", id);
            return Err(TodoError::NotFound(id));
        }
        info!("Todo deleted: {}", id);
        Ok(())
    }

    async fn fetch(&self, id: i64) -> TodoResult<TodoEntity> {
        match self.store.find_by_id(id).await {
            Ok(Some(entity)) => Ok(entity),
            Ok(None) => {
                debug!("Todo {} not found", id);
                Err(TodoError::NotFound(id))
            }
            Err(e) => {
                error!("Error fetching todo {}: {}", id, e);
                Err(e.into())
            }
        }
    }

    async fn save(&self, current: TodoEntity, fields: TodoFields) -> TodoResult<()> {
        let id = current.id;
        // a clock stepping backwards must not break created_at <= updated_at
        let updated_at = self.clock.now().max(current.created_at);
        let entity = TodoEntity {
            fields,
            updated_at,
            ..current
        };

        let matched = self.store.update(&entity).await.map_err(|e| {
            error!("Error updating todo {}: {}", id, e);
            e
        })?;
        if !matched {
            // deleted between fetch and write
            debug!("Todo {} vanished before update", id);
            return Err(TodoError::NotFound(id));
        }
        Ok(())
    }
}
