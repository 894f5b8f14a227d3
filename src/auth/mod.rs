pub mod context;
pub mod memory_provider;
pub mod model;
pub mod mongo_provider;
pub mod provider;
