pub mod chat;
pub mod directory;
pub mod executors;
pub mod health;
pub mod sessions;
