pub mod format;
pub mod http_client;
pub mod validation;
