use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LifehubError {
    #[error("Could not start callback listener on port {port}: {source}")]
    ListenerStartup {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Authorization was denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Callback arrived with neither an authorization code nor an error")]
    MissingCode,

    #[error("Timed out waiting for the OAuth callback after {}s", waited.as_secs())]
    FlowTimeout { waited: Duration },

    #[error("Token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Token refresh failed with status {status}: {body}")]
    TokenRefresh { status: u16, body: String },

    #[error("Callback listener stopped before the flow completed")]
    ListenerClosed,

    #[error("Error in credential store {}: {detail}", path.display())]
    Credential { path: PathBuf, detail: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_listener_startup() {
        let err = LifehubError::ListenerStartup {
            port: 8765,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(
            err.to_string(),
            "Could not start callback listener on port 8765: address in use"
        );
    }

    #[test]
    fn display_authorization_denied() {
        let err = LifehubError::AuthorizationDenied {
            reason: "User denied".into(),
        };
        assert_eq!(err.to_string(), "Authorization was denied: User denied");
    }

    #[test]
    fn display_missing_code() {
        assert_eq!(
            LifehubError::MissingCode.to_string(),
            "Callback arrived with neither an authorization code nor an error"
        );
    }

    #[test]
    fn display_flow_timeout() {
        let err = LifehubError::FlowTimeout {
            waited: Duration::from_secs(300),
        };
        assert_eq!(
            err.to_string(),
            "Timed out waiting for the OAuth callback after 300s"
        );
    }

    #[test]
    fn display_token_exchange() {
        let err = LifehubError::TokenExchange {
            status: 400,
            body: "invalid_grant".into(),
        };
        assert_eq!(
            err.to_string(),
            "Token exchange failed with status 400: invalid_grant"
        );
    }

    #[test]
    fn display_token_refresh() {
        let err = LifehubError::TokenRefresh {
            status: 401,
            body: "invalid_client".into(),
        };
        assert_eq!(
            err.to_string(),
            "Token refresh failed with status 401: invalid_client"
        );
    }

    #[test]
    fn display_credential() {
        let err = LifehubError::Credential {
            path: PathBuf::from("/home/user/.lifehub/strava/credentials.json"),
            detail: "Invalid JSON".into(),
        };
        assert_eq!(
            err.to_string(),
            "Error in credential store /home/user/.lifehub/strava/credentials.json: Invalid JSON"
        );
    }

    #[test]
    fn io_error_converts() {
        fn bind() -> Result<(), LifehubError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))?;
            Ok(())
        }
        assert!(matches!(bind(), Err(LifehubError::Io(_))));
    }
}
