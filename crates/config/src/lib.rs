// Configuration loading

pub mod error;
pub mod session;
pub mod settings;

pub use error::ConfigError;
pub use session::{Role, SessionCapabilities};
pub use settings::Settings;
