mod handler;
mod model;

pub use handler::{delete_message, get_message, list_messages, mark_as_read};
pub use model::Message;
