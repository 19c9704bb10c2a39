pub mod config;
pub mod error;
pub mod store;

pub use error::{CryptextError, CryptextResult};
