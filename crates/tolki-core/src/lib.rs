pub mod command;
pub mod error;
pub mod history;
pub mod item;
pub mod locale;
pub mod scroll;
pub mod session;
pub mod storefront;

// Re-export common error type
pub use error::TolkiError;
