mod handler;
mod model;

pub use handler::{bind_phone, login, me, refresh_token, update_me};
pub use model::{ROLE_WORKER, WeChatUser};
