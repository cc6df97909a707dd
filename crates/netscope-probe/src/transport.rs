//! Network primitives used by probe attempts
//!
//! Each primitive measures one connection, handshake, query or download
//! and returns its elapsed time. Deadlines are enforced by the caller.

use futures_util::StreamExt;
use netscope_common::{NetscopeError, NetscopeResult};
use std::net::{IpAddr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::Instant;
use tokio_rustls::rustls::{self, OwnedTrustAnchor, RootCertStore, ServerName};
use tokio_rustls::TlsConnector;

/// DNS transaction id used by every query
const DNS_TX_ID: [u8; 2] = [0xaa, 0xbb];

/// Largest payload written by the MTU probe
const MAX_PROBE_PAYLOAD: usize = 1400;

pub(crate) fn http_error(err: reqwest::Error) -> NetscopeError {
    NetscopeError::Http(err.to_string())
}

/// Run `fut` with a deadline, mapping expiry to [`NetscopeError::Timeout`].
pub async fn within<T, F>(timeout: Duration, fut: F) -> NetscopeResult<T>
where
    F: std::future::Future<Output = NetscopeResult<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| NetscopeError::Timeout(timeout.as_millis() as u64))?
}

/// TCP connect time to `host:port`.
pub async fn tcp_connect(host: &str, port: u16) -> NetscopeResult<Duration> {
    let start = Instant::now();
    let _stream = TcpStream::connect((host, port)).await?;
    Ok(start.elapsed())
}

/// Connect and push `size` zero bytes (capped at 1400) with Nagle disabled.
pub async fn tcp_send_payload(host: &str, port: u16, size: usize) -> NetscopeResult<()> {
    let mut stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    let payload = vec![0u8; size.min(MAX_PROBE_PAYLOAD)];
    stream.write_all(&payload).await?;
    Ok(())
}

/// Client connector trusting the bundled web PKI roots.
pub fn tls_connector() -> TlsConnector {
    let mut root_store = RootCertStore::empty();
    root_store.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// TCP connect plus full TLS handshake time.
pub async fn tls_handshake(connector: &TlsConnector, host: &str, port: u16) -> NetscopeResult<Duration> {
    let domain =
        ServerName::try_from(host).map_err(|err| NetscopeError::Tls(format!("{host}: {err}")))?;

    let start = Instant::now();
    let stream = TcpStream::connect((host, port)).await?;
    let _tls = connector
        .connect(domain, stream)
        .await
        .map_err(|err| NetscopeError::Tls(err.to_string()))?;
    Ok(start.elapsed())
}

/// HTTP client for timing requests.
pub fn http_client(timeout: Duration, follow_redirects: bool) -> NetscopeResult<reqwest::Client> {
    let redirect = if follow_redirects {
        reqwest::redirect::Policy::default()
    } else {
        reqwest::redirect::Policy::none()
    };

    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(redirect)
        .build()
        .map_err(http_error)
}

/// Time to issue a GET and read the whole body. Any status counts.
pub async fn http_get(client: &reqwest::Client, url: &str) -> NetscopeResult<Duration> {
    let start = Instant::now();
    let response = client.get(url).send().await.map_err(http_error)?;
    response.bytes().await.map_err(http_error)?;
    Ok(start.elapsed())
}

/// Stream a download to completion, returning bytes read and elapsed time.
pub async fn download(client: &reqwest::Client, url: &str) -> NetscopeResult<(u64, Duration)> {
    let start = Instant::now();
    let response = client.get(url).send().await.map_err(http_error)?;
    let mut stream = response.bytes_stream();
    let mut total = 0u64;
    while let Some(chunk) = stream.next().await {
        total += chunk.map_err(http_error)?.len() as u64;
    }
    Ok((total, start.elapsed()))
}

async fn bind_udp_for(host: &str) -> NetscopeResult<UdpSocket> {
    let local = match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => (IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        _ => (IpAddr::from([0, 0, 0, 0]), 0),
    };
    Ok(UdpSocket::bind(local).await?)
}

/// Send a datagram and wait up to `reply_window` for an answer.
///
/// A send with no reply inside the window still counts as success;
/// only a send or receive error fails the attempt.
pub async fn udp_exchange(
    host: &str,
    port: u16,
    payload: &[u8],
    reply_window: Duration,
) -> NetscopeResult<Duration> {
    let start = Instant::now();
    let socket = bind_udp_for(host).await?;
    socket.send_to(payload, (host, port)).await?;

    let mut buf = [0u8; 512];
    if let Ok(Err(err)) = tokio::time::timeout(reply_window, socket.recv_from(&mut buf)).await {
        return Err(err.into());
    }
    Ok(start.elapsed())
}

/// Fire-and-forget single-byte datagram.
pub async fn udp_send(host: &str, port: u16) -> NetscopeResult<()> {
    let socket = bind_udp_for(host).await?;
    socket.send_to(&[0u8], (host, port)).await?;
    Ok(())
}

/// Build a recursive A/IN query for `domain`.
pub fn dns_query_packet(domain: &str) -> Vec<u8> {
    let mut packet = Vec::with_capacity(18 + domain.len());
    packet.extend_from_slice(&DNS_TX_ID);
    // standard query, recursion desired
    packet.extend_from_slice(&[0x01, 0x00]);
    for count in [1u16, 0, 0, 0] {
        packet.extend_from_slice(&count.to_be_bytes());
    }
    for label in domain.split('.').filter(|l| !l.is_empty()) {
        packet.push(label.len().min(63) as u8);
        packet.extend_from_slice(&label.as_bytes()[..label.len().min(63)]);
    }
    packet.push(0);
    packet.extend_from_slice(&1u16.to_be_bytes());
    packet.extend_from_slice(&1u16.to_be_bytes());
    packet
}

/// Round trip of one A query against `server` on UDP 53.
///
/// Any reply counts; the answer itself is not inspected.
pub async fn dns_query(server: &str, domain: &str) -> NetscopeResult<Duration> {
    dns_query_at(server, 53, domain).await
}

pub(crate) async fn dns_query_at(server: &str, port: u16, domain: &str) -> NetscopeResult<Duration> {
    let packet = dns_query_packet(domain);
    let start = Instant::now();
    let socket = bind_udp_for(server).await?;
    socket.send_to(&packet, (server, port)).await?;

    let mut buf = [0u8; 512];
    socket.recv_from(&mut buf).await?;
    Ok(start.elapsed())
}

/// Local address the OS would route public traffic from.
pub async fn local_ip() -> NetscopeResult<IpAddr> {
    let socket = UdpSocket::bind((IpAddr::from([0, 0, 0, 0]), 0)).await?;
    socket.connect(("8.8.8.8", 80)).await?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_dns_query_packet_layout() {
        let packet = dns_query_packet("github.com");
        assert_eq!(&packet[..4], &[0xaa, 0xbb, 0x01, 0x00]);
        assert_eq!(&packet[4..12], &[0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(packet[12], 6);
        assert_eq!(&packet[13..19], b"github");
        assert_eq!(packet[19], 3);
        assert_eq!(&packet[20..23], b"com");
        assert_eq!(&packet[23..], &[0, 0, 1, 0, 1]);
    }

    #[tokio::test]
    async fn test_tcp_connect_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let elapsed = tcp_connect("127.0.0.1", port).await.unwrap();
        assert!(elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_within_maps_timeout() {
        let result: NetscopeResult<()> =
            within(Duration::from_millis(10), std::future::pending()).await;
        assert!(matches!(result, Err(NetscopeError::Timeout(10))));
    }

    #[tokio::test]
    async fn test_udp_exchange_without_reply_succeeds() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();
        let result = udp_exchange("127.0.0.1", port, &[0], Duration::from_millis(50)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_dns_query_counts_any_reply() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&[0u8; 4], peer).await.unwrap();
        });

        let result = dns_query_at("127.0.0.1", addr.port(), "example.com").await;
        assert!(result.is_ok());
        responder.await.unwrap();
    }
}
