pub mod chat;
pub mod classify;
pub mod serve;
pub mod status;
