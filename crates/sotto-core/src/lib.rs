pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::SottoConfig;
pub use error::{Result, SottoError};
pub use events::DictationEvent;
pub use types::*;
