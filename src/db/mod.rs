pub mod gateway;
pub mod pool;

pub use gateway::{DataGateway, PgGateway};
pub use pool::create_pool;
