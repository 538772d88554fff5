//! One-shot TCP reachability probe.

use crate::error::CheckError;
use std::time::Duration;
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;

/// Open and immediately discard a connection to `host:port`.
///
/// A connect failure or timeout is a routine probe failure. A hostname that
/// does not resolve is a broken registration, reported as a fatal error so it
/// is never recorded as a failed sample.
pub async fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<(), CheckError> {
    let addr = lookup_host((host, port))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| CheckError::Unresolved(host.to_string()))?;

    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            Ok(())
        }
        Ok(Err(source)) => Err(CheckError::Connect(source)),
        Err(_) => Err(CheckError::ConnectTimeout(connect_timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connects_to_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let result = connect("127.0.0.1", addr.port(), Duration::from_secs(1)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn refused_connection_is_transient() {
        let err = connect("127.0.0.1", 1, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, CheckError::Connect(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn unresolved_host_is_fatal() {
        let err = connect("no-such-host.invalid", 443, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Unresolved(_)));
        assert!(err.is_fatal());
    }
}
