pub mod catalog;
pub mod community;
pub mod health;
pub mod info;
pub mod message;
pub mod staff;
pub mod system;
pub mod upload;
pub mod user;
pub mod work;
