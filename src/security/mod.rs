pub mod config;
pub mod google;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod session;
