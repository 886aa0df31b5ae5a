pub mod credentials;
pub mod error;
pub mod oauth;

pub use credentials::CredentialStore;
pub use error::LifehubError;
pub use oauth::{acquire_tokens, refresh_tokens, FlowConfig, TokenSet};
