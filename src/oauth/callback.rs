use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::LifehubError;

/// What the provider's redirect told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The user completed consent; carry the one-time authorization code.
    Code(String),
    /// The provider reported an error (`error_description` when present,
    /// else the `error` code itself).
    Denied { reason: String },
    /// A `/callback` request with neither `code` nor `error`.
    MissingCode,
}

/// Short-lived local listener receiving the provider's redirect.
///
/// One listener per flow, torn down by the coordinator on every exit path.
#[derive(Debug)]
pub struct CallbackServer {
    listener: TcpListener,
    port: u16,
}

impl CallbackServer {
    pub async fn bind(port: u16) -> Result<Self, LifehubError> {
        let listener = TcpListener::bind(format!("127.0.0.1:{port}"))
            .await
            .map_err(|source| LifehubError::ListenerStartup { port, source })?;
        // Resolve the real port so binding port 0 still yields a usable
        // redirect URI.
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The redirect URI registered with the provider; must match the one
    /// sent on the token exchange exactly.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.port)
    }

    /// Move the listener into a background accept loop. The first decisive
    /// `/callback` request settles the returned receiver; later requests
    /// (favicon probes, stray browser retries) are still answered but cannot
    /// change the outcome. The loop runs until the task is aborted.
    pub fn spawn(self) -> (JoinHandle<()>, oneshot::Receiver<CallbackOutcome>) {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(serve(self.listener, tx));
        (handle, rx)
    }
}

async fn serve(listener: TcpListener, tx: oneshot::Sender<CallbackOutcome>) {
    let mut tx = Some(tx);
    loop {
        let (mut stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!("callback accept failed: {e}");
                continue;
            }
        };

        let mut buf = vec![0u8; 4096];
        let n = match stream.read(&mut buf).await {
            Ok(n) => n,
            Err(_) => continue,
        };
        let request = String::from_utf8_lossy(&buf[..n]);

        let reply = route(&request);
        let response = http_response(reply.status, &reply.body);
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;

        if let Some(outcome) = reply.outcome {
            if let Some(sender) = tx.take() {
                let _ = sender.send(outcome);
            }
        }
    }
}

struct Reply {
    status: &'static str,
    body: String,
    outcome: Option<CallbackOutcome>,
}

fn route(request: &str) -> Reply {
    let Some((path, query)) = parse_request_target(request) else {
        return Reply {
            status: "400 Bad Request",
            body: page("Bad request", "The request could not be understood."),
            outcome: None,
        };
    };

    if path != "/callback" {
        return Reply {
            status: "404 Not Found",
            body: page("Not found", "Nothing is served at this address."),
            outcome: None,
        };
    }

    let params = parse_query(query);

    if let Some(error) = param(&params, "error") {
        let reason = param(&params, "error_description").unwrap_or(error);
        return Reply {
            status: "200 OK",
            body: page(
                "Authorization failed",
                "The provider reported an error. You can close this window; \
                 details are in the terminal.",
            ),
            outcome: Some(CallbackOutcome::Denied { reason }),
        };
    }

    match param(&params, "code") {
        Some(code) if !code.is_empty() => Reply {
            status: "200 OK",
            body: page(
                "Authentication successful!",
                "You can close this window and return to the terminal.",
            ),
            outcome: Some(CallbackOutcome::Code(code)),
        },
        _ => Reply {
            status: "400 Bad Request",
            body: page(
                "Authorization incomplete",
                "The callback carried no authorization code. You can close \
                 this window and retry from the terminal.",
            ),
            outcome: Some(CallbackOutcome::MissingCode),
        },
    }
}

/// Extract path and query from "GET /callback?code=... HTTP/1.1".
fn parse_request_target(request: &str) -> Option<(&str, &str)> {
    let first_line = request.lines().next()?;
    let target = first_line.split_whitespace().nth(1)?;
    match target.split_once('?') {
        Some((path, query)) => Some((path, query)),
        None => Some((target, "")),
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (urldecode(key), urldecode(value)),
            None => (urldecode(pair), String::new()),
        })
        .collect()
}

fn param(params: &[(String, String)], key: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

pub(crate) fn urldecode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut bytes = s.bytes();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let hi = bytes.next();
            let lo = bytes.next();
            if let (Some(h), Some(l)) = (hi, lo) {
                let hex = [h, l];
                if let Ok(s) = std::str::from_utf8(&hex) {
                    if let Ok(val) = u8::from_str_radix(s, 16) {
                        result.push(val as char);
                        continue;
                    }
                }
            }
            result.push('%');
        } else if b == b'+' {
            result.push(' ');
        } else {
            result.push(b as char);
        }
    }
    result
}

fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn page(heading: &str, detail: &str) -> String {
    format!("<!DOCTYPE html><html><body><h1>{heading}</h1><p>{detail}</p></body></html>")
}
