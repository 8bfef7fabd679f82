pub mod mood;
pub mod user;
