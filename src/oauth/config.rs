use std::time::Duration;

/// Default local port for the callback listener.
pub const DEFAULT_CALLBACK_PORT: u16 = 8765;

/// Default deadline for one authorization flow, browser round-trip included.
pub const DEFAULT_FLOW_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything one authorization flow needs to know about a provider.
///
/// Built by the calling integration, immutable for the duration of the flow.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Display label, used only in logs and user-facing text.
    pub service_name: String,
    pub authorization_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Joined with `scope_separator` in the order given; some providers are
    /// sensitive to scope ordering.
    pub scopes: Vec<String>,
    pub scope_separator: String,
    pub callback_port: u16,
    /// Extra query parameters appended to the authorization URL. A key that
    /// collides with a standard parameter overwrites it; intentional escape
    /// hatch for providers with non-standard requirements.
    pub additional_params: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FlowConfig {
    pub fn new(
        service_name: impl Into<String>,
        authorization_url: impl Into<String>,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            authorization_url: authorization_url.into(),
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: Vec::new(),
            scope_separator: " ".to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            additional_params: Vec::new(),
            timeout: DEFAULT_FLOW_TIMEOUT,
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Most providers want space-separated scopes; some (e.g. Strava) want
    /// commas.
    pub fn with_scope_separator(mut self, separator: impl Into<String>) -> Self {
        self.scope_separator = separator.into();
        self
    }

    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_params.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
