//! Fire-and-forget diagnostic transport.
//!
//! A [`Transport`] takes a fully built URL and sends it somewhere without
//! blocking the caller. There is no acknowledgement, no retry and no
//! ordering: two pings dispatched back to back may arrive in either order.

use tokio::runtime::Handle;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, VigilError};

/// Best-effort delivery of one diagnostic request.
pub trait Transport: Send + Sync {
    /// Dispatch `url`. Must return immediately and never fail.
    fn dispatch(&self, url: Url);
}

/// Issues a plain `GET` for every dispatched URL on a tokio runtime.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpTransport {
    /// Create a transport bound to the current tokio runtime.
    ///
    /// No request timeout is configured; the client's defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error outside a runtime or if the HTTP client cannot be
    /// built.
    pub fn new() -> Result<Self> {
        let runtime =
            Handle::try_current().map_err(|e| VigilError::RuntimeUnavailable(e.to_string()))?;
        Self::with_runtime(runtime)
    }

    /// Create a transport that spawns onto `runtime`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_runtime(runtime: Handle) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VigilError::TransportInit(e.to_string()))?;
        Ok(Self { client, runtime })
    }
}

impl Transport for HttpTransport {
    fn dispatch(&self, url: Url) {
        let client = self.client.clone();
        self.runtime.spawn(async move {
            match client.get(url.clone()).send().await {
                Ok(response) => {
                    debug!(%url, status = %response.status(), "diagnostic ping delivered");
                }
                Err(e) => {
                    warn!(%url, error = %e, "no response; is the diagnostic listener running?");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Port that nothing listens on: bound, then released.
    fn dead_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    /// Accept one connection, answer `200 OK` and return the request head.
    async fn accept_one(listener: &TcpListener) -> String {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before request head");
            head.extend_from_slice(&buf[..n]);
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .await
            .unwrap();
        String::from_utf8(head).unwrap()
    }

    async fn next_request(listener: &TcpListener) -> String {
        tokio::time::timeout(Duration::from_secs(5), accept_one(listener))
            .await
            .expect("no request reached the listener")
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let result = HttpTransport::new();
        assert!(matches!(result, Err(VigilError::RuntimeUnavailable(_))));
    }

    #[tokio::test]
    async fn test_dispatch_sends_get_with_query() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let transport = HttpTransport::new().unwrap();

        let url = Url::parse(&format!("http://127.0.0.1:{port}/?accel&x=1&y=2&z=3")).unwrap();
        transport.dispatch(url);

        let head = next_request(&listener).await;
        let request_line = head.lines().next().unwrap_or_default();
        assert_eq!(request_line, "GET /?accel&x=1&y=2&z=3 HTTP/1.1");
        assert!(head
            .to_ascii_lowercase()
            .contains(concat!("user-agent: vigil/", env!("CARGO_PKG_VERSION"))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_does_not_block_later_pings() {
        let transport = HttpTransport::new().unwrap();
        let dead = Url::parse(&format!("http://127.0.0.1:{}/?accel", dead_port())).unwrap();
        transport.dispatch(dead.clone());
        transport.dispatch(dead);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let live = Url::parse(&format!("http://127.0.0.1:{port}/?STOP_UPDATES")).unwrap();
        transport.dispatch(live);

        let head = next_request(&listener).await;
        assert!(head.starts_with("GET /?STOP_UPDATES HTTP/1.1\r\n"), "{head}");
    }
}
