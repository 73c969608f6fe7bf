pub mod endpoint;
pub mod locale_tables;
pub mod settings;

pub use crate::endpoint::{DEFAULT_API_BASE_URL, HttpMessageEndpoint};
pub use crate::locale_tables::StaticLocaleTables;
pub use crate::settings::JsonSettingsStore;
