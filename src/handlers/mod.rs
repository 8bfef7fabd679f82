pub mod health;
pub mod scheduler;
