pub mod catalog;
pub mod event;
pub mod user;
