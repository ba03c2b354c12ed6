pub mod admin;
pub mod auth;
pub mod professor;
pub mod student;
