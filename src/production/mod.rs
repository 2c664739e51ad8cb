//! Production implementations of traits

mod file_backend;
mod keyring_backend;
mod sqlite_backend;

pub use file_backend::FileBackend;
pub use keyring_backend::KeyringBackend;
pub use sqlite_backend::SqliteBackend;
