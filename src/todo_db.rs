// src/todo_db.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{debug, info};
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::models::{NewTodo, TodoEntity, TodoFields};
use crate::store::TodoStore;

const TODOS: &str = "todos";
const COUNTERS: &str = "counters";

pub struct MongoDB {
    pub client: Client,
    pub db: Database,
}

impl MongoDB {
    /// Connects and pings once so a bad URI fails at startup.
    pub async fn init(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client_options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::database("parsing connection string", e))?;
        let client = Client::with_options(client_options)
            .map_err(|e| StoreError::database("initializing client", e))?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        info!("Connected to MongoDB database {}", db_name);
        Ok(MongoDB { client, db })
    }
}

/// Row layout of the `todos` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TodoDocument {
    #[serde(rename = "_id")]
    id: i64,
    name: String,
    description: String,
    status: String,
    date: BsonDateTime,
    assignee: String,
    creator: String,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

fn to_bson(at: &DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

fn from_bson(field: &str, at: BsonDateTime) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(at.timestamp_millis())
        .ok_or_else(|| StoreError::Corrupt(format!("{} out of range", field)))
}

impl TodoDocument {
    fn from_entity(entity: &TodoEntity) -> Self {
        TodoDocument {
            id: entity.id,
            name: entity.fields.name.clone(),
            description: entity.fields.description.clone(),
            status: entity.fields.status.clone(),
            date: to_bson(&entity.fields.due_date),
            assignee: entity.fields.assignee.clone(),
            creator: entity.fields.creator.clone(),
            created_at: to_bson(&entity.created_at),
            updated_at: to_bson(&entity.updated_at),
        }
    }

    fn into_entity(self) -> Result<TodoEntity, StoreError> {
        Ok(TodoEntity {
            id: self.id,
            fields: TodoFields {
                name: self.name,
                description: self.description,
                status: self.status,
                due_date: from_bson("date", self.date)?,
                assignee: self.assignee,
                creator: self.creator,
            },
            created_at: from_bson("created_at", self.created_at)?,
            updated_at: from_bson("updated_at", self.updated_at)?,
        })
    }
}

/// The document to write, and the entity exactly as later reads will see it.
/// BSON dates only keep milliseconds.
fn for_insert(todo: NewTodo, id: i64) -> Result<(TodoDocument, TodoEntity), StoreError> {
    let document = TodoDocument::from_entity(&todo.with_id(id));
    let entity = document.clone().into_entity()?;
    Ok((document, entity))
}

/// `TodoStore` over MongoDB. Integer ids come from a counter document,
/// bumped atomically, so a deleted id is never handed out again.
pub struct MongoTodoStore {
    todos: Collection<TodoDocument>,
    counters: Collection<Document>,
}

impl MongoTodoStore {
    pub fn new(mongodb: &MongoDB) -> Self {
        MongoTodoStore {
            todos: mongodb.db.collection::<TodoDocument>(TODOS),
            counters: mongodb.db.collection::<Document>(COUNTERS),
        }
    }

    async fn next_id(&self) -> Result<i64, StoreError> {
        let counter = self
            .counters
            .find_one_and_update(doc! { "_id": TODOS }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| StoreError::database("allocating id", e))?
            .ok_or_else(|| StoreError::Corrupt("id counter missing after upsert".to_string()))?;

        counter
            .get_i64("seq")
            .map_err(|e| StoreError::Corrupt(format!("id counter: {}", e)))
    }
}

#[async_trait]
impl TodoStore for MongoTodoStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<TodoEntity>, StoreError> {
        self.todos
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| StoreError::database("fetching todo", e))?
            .map(TodoDocument::into_entity)
            .transpose()
    }

    async fn insert(&self, todo: NewTodo) -> Result<TodoEntity, StoreError> {
        let (document, entity) = for_insert(todo, self.next_id().await?)?;
        self.todos
            .insert_one(document)
            .await
            .map_err(|e| StoreError::database("inserting todo", e))?;
        debug!("Inserted todo document {}", entity.id);
        Ok(entity)
    }

    async fn update(&self, todo: &TodoEntity) -> Result<bool, StoreError> {
        let res = self
            .todos
            .replace_one(doc! { "_id": todo.id }, TodoDocument::from_entity(todo))
            .await
            .map_err(|e| StoreError::database("updating todo", e))?;
        Ok(res.matched_count > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let res = self
            .todos
            .delete_one(doc! { "_id": id })
            .await
            .map_err(|e| StoreError::database("deleting todo", e))?;
        Ok(res.deleted_count > 0)
    }

    async fn list_all(&self) -> Result<Vec<TodoEntity>, StoreError> {
        let mut cursor = self
            .todos
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|e| StoreError::database("listing todos", e))?;

        let mut todos = Vec::new();
        while let Some(res) = cursor.next().await {
            let document = res.map_err(|e| StoreError::database("reading todos", e))?;
            todos.push(document.into_entity()?);
        }
        Ok(todos)
    }
}
