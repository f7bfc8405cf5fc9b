pub mod ask;
pub mod chat;
pub mod keys;
pub mod members;
