pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::MentorConfig;
pub use error::{MentorError, Result};
pub use events::SessionEvent;
pub use types::*;
