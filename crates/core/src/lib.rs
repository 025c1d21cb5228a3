//! Simulador core types: session model, storage and the credential store

pub mod credentials;
pub mod error;
pub mod session;
pub mod storage;

pub use credentials::CredentialStore;
pub use error::{CoreError, CoreResult};
pub use session::{Session, UserProfile};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
