// Shared library untuk semua crate BANTU JEG
pub mod utils;

pub use utils::http_client::{HttpClientError, ServiceClient};
