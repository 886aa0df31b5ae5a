use tokio::sync::oneshot;

use crate::error::LifehubError;
use crate::oauth::callback::{CallbackOutcome, CallbackServer};
use crate::oauth::config::FlowConfig;
use crate::oauth::token::{exchange_code, TokenSet};

/// Run the full browser authorization flow described by `config`.
///
/// Binds the local callback listener, opens the authorization URL in the
/// user's browser, waits for the redirect, and exchanges the code for tokens.
/// The listener is torn down on every exit path; persisting the returned
/// tokens is the caller's job.
pub async fn acquire_tokens(config: &FlowConfig) -> Result<TokenSet, LifehubError> {
    let server = CallbackServer::bind(config.callback_port).await?;
    let redirect_uri = server.redirect_uri();
    let auth_url = build_authorization_url(config, &redirect_uri);
    let (listener_task, outcome) = server.spawn();

    if webbrowser::open(&auth_url).is_err() {
        // Not fatal: the user can still complete the flow by hand.
        tracing::warn!(
            "Could not open browser automatically. Please visit:\n{auth_url}"
        );
    } else {
        tracing::debug!(service = %config.service_name, "opened browser for authorization");
    }

    let result = settle(config, &redirect_uri, outcome).await;

    // Release the port on every path, and wait for the task to actually end
    // so the listener is no longer accepting connections when we return.
    listener_task.abort();
    let _ = listener_task.await;

    result
}

async fn settle(
    config: &FlowConfig,
    redirect_uri: &str,
    outcome: oneshot::Receiver<CallbackOutcome>,
) -> Result<TokenSet, LifehubError> {
    let outcome = match tokio::time::timeout(config.timeout, outcome).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => return Err(LifehubError::ListenerClosed),
        Err(_) => {
            return Err(LifehubError::FlowTimeout {
                waited: config.timeout,
            })
        }
    };

    match outcome {
        CallbackOutcome::Code(code) => {
            tracing::debug!(service = %config.service_name, "authorization code received");
            exchange_code(
                &config.token_url,
                &config.client_id,
                &config.client_secret,
                &code,
                redirect_uri,
            )
            .await
        }
        CallbackOutcome::Denied { reason } => Err(LifehubError::AuthorizationDenied { reason }),
        CallbackOutcome::MissingCode => Err(LifehubError::MissingCode),
    }
}

/// Copy the configured authorization URL and append the standard parameters,
/// the joined scopes (omitted when empty), and any additional parameters.
/// An additional parameter whose key collides with a standard one overwrites
/// it (last write wins).
fn build_authorization_url(config: &FlowConfig, redirect_uri: &str) -> String {
    let mut params: Vec<(String, String)> = vec![
        ("client_id".into(), config.client_id.clone()),
        ("redirect_uri".into(), redirect_uri.to_string()),
        ("response_type".into(), "code".into()),
    ];
    if !config.scopes.is_empty() {
        params.push(("scope".into(), config.scopes.join(&config.scope_separator)));
    }
    for (key, value) in &config.additional_params {
        match params.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.clone(),
            None => params.push((key.clone(), value.clone())),
        }
    }

    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoded(k), urlencoded(v)))
        .collect();
    let joiner = if config.authorization_url.contains('?') {
        '&'
    } else {
        '?'
    };
    format!("{}{}{}", config.authorization_url, joiner, query.join("&"))
}

fn urlencoded(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(b as char);
            }
            _ => {
                result.push('%');
                result.push_str(&format!("{b:02X}"));
            }
        }
    }
    result
}
