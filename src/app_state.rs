use crate::service::TodoService;

#[derive(Clone)]
pub struct AppState {
    pub todos: TodoService,
}
