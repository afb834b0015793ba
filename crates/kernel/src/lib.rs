pub mod config;
pub mod credentials;
pub mod error;

pub use config::Settings;
pub use credentials::{CredentialStore, Removal};
