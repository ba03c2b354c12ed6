pub mod admin;
pub mod auth;
pub mod entities;
pub mod professor;
pub mod student;
