// src/todo.rs

use actix_web::{error, http::header, web, HttpRequest, HttpResponse};
use log::{debug, warn};

use crate::app_state::AppState;
use crate::errors::{ErrorResponse, TodoError};
use crate::models::{CreateTodoRequest, PatchTodoRequest, UpdateTodoRequest};

/// Mounts the todo resource under `/api/todos`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/todos")
            .app_data(json_config())
            .route("", web::get().to(list_todos))
            .route("", web::post().to(create_todo))
            .route("/{id}", web::get().to(get_todo))
            .route("/{id}", web::put().to(update_todo))
            .route("/{id}", web::patch().to(patch_todo))
            .route("/{id}", web::delete().to(delete_todo)),
    );
}

/// Malformed or mistyped JSON bodies become 400s in the usual error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        warn!("Rejected request body: {}", err);
        let status = actix_web::http::StatusCode::BAD_REQUEST;
        let body = ErrorResponse::new(status, err.to_string());
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

/// GET /api/todos
pub async fn list_todos(data: web::Data<AppState>) -> Result<HttpResponse, TodoError> {
    let todos = data.todos.list_records().await?;
    Ok(HttpResponse::Ok().json(todos))
}

/// GET /api/todos/{id}
pub async fn get_todo(
    data: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, TodoError> {
    let todo = data.todos.get_record(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(todo))
}

/// POST /api/todos
/// Responds 201 with the created todo and its location.
pub async fn create_todo(
    data: web::Data<AppState>,
    payload: web::Json<CreateTodoRequest>,
) -> Result<HttpResponse, TodoError> {
    debug!("Received create_todo request: {:?}", payload);
    let created = data.todos.create_record(&payload).await?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/api/todos/{}", created.id)))
        .json(created))
}

/// PUT /api/todos/{id}
pub async fn update_todo(
    data: web::Data<AppState>,
    id: web::Path<i64>,
    payload: web::Json<UpdateTodoRequest>,
) -> Result<HttpResponse, TodoError> {
    data.todos.replace_record(id.into_inner(), &payload).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// PATCH /api/todos/{id}
/// Only the fields present in the body are written.
pub async fn patch_todo(
    data: web::Data<AppState>,
    id: web::Path<i64>,
    payload: web::Json<PatchTodoRequest>,
) -> Result<HttpResponse, TodoError> {
    data.todos.merge_record(id.into_inner(), &payload).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/todos/{id}
pub async fn delete_todo(
    data: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, TodoError> {
    data.todos.delete_record(id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
