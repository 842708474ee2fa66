pub mod admin;
pub mod local;
