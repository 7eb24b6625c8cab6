pub mod db;
pub mod mailer;
pub mod users;
