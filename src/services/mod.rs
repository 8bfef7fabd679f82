pub mod dispatcher;
pub mod jobs;
pub mod recipients;
pub mod scheduler;
pub mod stats;
