pub mod error;
pub mod options;

pub use error::{RepositoryError, Result};
pub use options::{ClientOptions, DEFAULT_DATABASE_ID, RepositoryOptions};
