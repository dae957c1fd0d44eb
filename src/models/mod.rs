pub mod todo;

pub use todo::{
    CreateTodoRequest, NewTodo, PatchTodoRequest, TodoEntity, TodoFields, TodoResponse,
    UpdateTodoRequest,
};
