pub mod backend;
pub mod mapping;

pub use backend::{HttpOrderBackend, OrderBackend};
pub use mapping::{HttpMappingProvider, MappingError, MappingProvider};
