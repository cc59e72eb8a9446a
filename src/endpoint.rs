//! Model server endpoint handling
//!
//! Base URLs are typed on phone keyboards, which often produce full-width
//! characters (`ｈｔｔｐ：／／…`) and stray spaces. [`normalize_base_url`] folds
//! those into a canonical `scheme://host:port/` form.
//!
//! The active endpoint is published through [`active_endpoint`]: exactly one
//! [`EndpointWriter`] updates it and any number of [`EndpointView`]s observe it.

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

/// Message shown whenever a base URL cannot be resolved
pub const PORT_ERROR_MESSAGE: &str =
    "URL must include scheme, host and port (e.g. http://192.168.0.2:11434)";

/// Endpoint errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// Scheme, host or port could not be resolved
    #[error("{}", PORT_ERROR_MESSAGE)]
    MissingPort,
    /// The writer was dropped while a view was waiting for changes
    #[error("Endpoint writer closed")]
    WriterClosed,
}

/// Map full-width ASCII variants and the ideographic space to plain ASCII.
fn fold_full_width(c: char) -> char {
    match c {
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        '\u{3000}' => ' ',
        _ => c,
    }
}

/// Whether the authority section of `url` spells out a port.
///
/// `Url::port` hides ports equal to the scheme default, so `http://host:80`
/// needs this check to count as explicit.
fn has_explicit_port(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let after_host = match host_port.rfind(']') {
        Some(end) => &host_port[end + 1..],
        None => host_port,
    };
    after_host.split_once(':').is_some_and(|(_, port)| !port.is_empty())
}

/// Normalize a user-entered base URL to `scheme://host:port/`.
///
/// - Full-width characters are folded to ASCII and all whitespace is removed
/// - `http://` is assumed when no scheme is given
/// - Only `http` and `https` are accepted, and the port must be explicit
///
/// Paths, queries and fragments are dropped.
pub fn normalize_base_url(input: &str) -> Result<String, EndpointError> {
    let folded: String =
        input.chars().map(fold_full_width).filter(|c| !c.is_whitespace()).collect();
    if folded.is_empty() {
        return Err(EndpointError::MissingPort);
    }

    let candidate =
        if folded.contains("://") { folded } else { format!("http://{}", folded) };
    let url = Url::parse(&candidate).map_err(|_| EndpointError::MissingPort)?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(EndpointError::MissingPort);
    }

    let host = url.host_str().filter(|h| !h.is_empty()).ok_or(EndpointError::MissingPort)?;
    let port = match url.port() {
        Some(port) => port,
        None if has_explicit_port(&candidate) => {
            url.port_or_known_default().ok_or(EndpointError::MissingPort)?
        }
        None => return Err(EndpointError::MissingPort),
    };

    Ok(format!("{}://{}:{}/", scheme, host, port))
}

/// Whether a string normalizes to a usable base URL
pub fn is_valid_base_url(input: &str) -> bool {
    normalize_base_url(input).is_ok()
}

/// Sole writer of the active endpoint. Not `Clone`.
#[derive(Debug)]
pub struct EndpointWriter {
    tx: watch::Sender<Option<String>>,
}

/// Read-only view of the active endpoint
#[derive(Debug, Clone)]
pub struct EndpointView {
    rx: watch::Receiver<Option<String>>,
}

/// Create the active endpoint holder.
///
/// An invalid `initial` value is logged and treated as unset.
pub fn active_endpoint(initial: Option<&str>) -> (EndpointWriter, EndpointView) {
    let initial = initial.and_then(|raw| match normalize_base_url(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(url = raw, error = %e, "ignoring invalid initial endpoint");
            None
        }
    });
    let (tx, rx) = watch::channel(initial);
    (EndpointWriter { tx }, EndpointView { rx })
}

impl EndpointWriter {
    /// Normalize and publish a new endpoint. The last write wins.
    ///
    /// Invalid input leaves the current value untouched.
    pub fn set(&self, raw: &str) -> Result<String, EndpointError> {
        let url = normalize_base_url(raw)?;
        info!(url = %url, "active endpoint updated");
        self.tx.send_replace(Some(url.clone()));
        Ok(url)
    }

    /// Clear the active endpoint
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Create another read-only view
    pub fn view(&self) -> EndpointView {
        EndpointView { rx: self.tx.subscribe() }
    }
}

impl EndpointView {
    /// Current endpoint, if any
    pub fn current(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// Wait until the endpoint changes and return the new value.
    pub async fn changed(&mut self) -> Result<Option<String>, EndpointError> {
        self.rx.changed().await.map_err(|_| EndpointError::WriterClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_url() {
        assert_eq!(normalize_base_url("http://192.168.0.2:11434").unwrap(), "http://192.168.0.2:11434/");
    }

    #[test]
    fn test_full_width_and_whitespace_collapse() {
        let input = " ｈｔｔｐ：／／１９２．１６８．０．２：１１４３４　";
        assert_eq!(normalize_base_url(input).unwrap(), "http://192.168.0.2:11434/");
        assert_eq!(normalize_base_url("http:// localhost : 8080 /v1").unwrap(), "http://localhost:8080/");
    }

    #[test]
    fn test_scheme_defaults_to_http() {
        assert_eq!(normalize_base_url("10.0.0.5:11434").unwrap(), "http://10.0.0.5:11434/");
        assert_eq!(normalize_base_url("Model-Host:9000").unwrap(), "http://model-host:9000/");
    }

    #[test]
    fn test_explicit_default_port_is_kept() {
        assert_eq!(normalize_base_url("http://example.com:80").unwrap(), "http://example.com:80/");
        assert_eq!(normalize_base_url("https://example.com:443/api").unwrap(), "https://example.com:443/");
    }

    #[test]
    fn test_ipv6_host() {
        assert_eq!(normalize_base_url("http://[::1]:11434").unwrap(), "http://[::1]:11434/");
        assert_eq!(normalize_base_url("http://[::1]"), Err(EndpointError::MissingPort));
    }

    #[test]
    fn test_unresolvable_inputs_fail_with_port_message() {
        for input in ["", "   ", "localhost", "http://localhost", "ftp://host:21", "http://:8080", "http://host:"] {
            let err = normalize_base_url(input).unwrap_err();
            assert_eq!(err, EndpointError::MissingPort, "input {:?}", input);
            assert_eq!(err.to_string(), PORT_ERROR_MESSAGE);
        }
        assert!(!is_valid_base_url("localhost"));
    }

    #[test]
    fn test_writer_publishes_to_views() {
        let (writer, view) = active_endpoint(Some("127.0.0.1:11434"));
        assert_eq!(view.current().as_deref(), Some("http://127.0.0.1:11434/"));

        let other = writer.view();
        writer.set("http://10.0.0.1:8000").unwrap();
        writer.set("http://10.0.0.2:8000").unwrap();
        assert_eq!(view.current().as_deref(), Some("http://10.0.0.2:8000/"));
        assert_eq!(other.current().as_deref(), Some("http://10.0.0.2:8000/"));

        assert!(writer.set("nonsense").is_err());
        assert_eq!(view.current().as_deref(), Some("http://10.0.0.2:8000/"));

        writer.clear();
        assert_eq!(view.current(), None);
    }

    #[test]
    fn test_invalid_initial_is_unset() {
        let (_writer, view) = active_endpoint(Some("no port here"));
        assert_eq!(view.current(), None);
    }

    #[tokio::test]
    async fn test_view_observes_changes() {
        let (writer, mut view) = active_endpoint(None);
        let task = tokio::spawn(async move { view.changed().await });
        tokio::task::yield_now().await;
        writer.set("localhost:1234").unwrap();
        let seen = task.await.unwrap().unwrap();
        assert_eq!(seen.as_deref(), Some("http://localhost:1234/"));
    }

    #[tokio::test]
    async fn test_view_reports_closed_writer() {
        let (writer, mut view) = active_endpoint(None);
        drop(writer);
        assert_eq!(view.changed().await, Err(EndpointError::WriterClosed));
    }
}
