pub mod extractors;
pub mod identity;
pub mod middleware;
pub mod store;
