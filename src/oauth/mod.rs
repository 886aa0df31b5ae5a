pub mod callback;
pub mod config;
pub mod flow;
pub mod token;

pub use callback::{CallbackOutcome, CallbackServer};
pub use config::{FlowConfig, DEFAULT_CALLBACK_PORT, DEFAULT_FLOW_TIMEOUT};
pub use flow::acquire_tokens;
pub use token::{exchange_code, refresh_tokens, TokenSet};
