//! Internal module for establishing connections to the mail server.
//!
//! Supports TLS (the default) and plain TCP, selected by the configured
//! transport-security flag.

use crate::error::{Error, Result};
use rustls::ClientConfig;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument};
use webpki_roots::TLS_SERVER_ROOTS;

/// A TLS stream over TCP, used for IMAP communication.
pub(crate) type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Stream to the mail server, either TLS-wrapped or plain TCP.
pub(crate) enum MailStream {
    /// TLS-wrapped connection (port 993 by convention).
    Tls(TlsStream),
    /// Plain TCP connection (port 143 by convention).
    Plain(TcpStream),
}

impl std::fmt::Debug for MailStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailStream::Tls(_) => f.write_str("MailStream::Tls"),
            MailStream::Plain(_) => f.write_str("MailStream::Plain"),
        }
    }
}

impl AsyncRead for MailStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MailStream::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
            MailStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MailStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MailStream::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
            MailStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MailStream::Tls(stream) => Pin::new(stream).poll_flush(cx),
            MailStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MailStream::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
            MailStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Opens a stream to the mail server, TLS-wrapped when `tls` is set.
#[instrument(
    name = "connection::open",
    skip_all,
    fields(host = %host, target_addr = %target_addr, tls)
)]
pub(crate) async fn open_stream(host: &str, target_addr: &str, tls: bool) -> Result<MailStream> {
    let tcp_stream = connect_tcp(target_addr).await?;

    if tls {
        let tls_stream = establish_tls(host, target_addr, tcp_stream).await?;
        Ok(MailStream::Tls(tls_stream))
    } else {
        Ok(MailStream::Plain(tcp_stream))
    }
}

/// Performs the TLS handshake over an established TCP stream.
async fn establish_tls(host: &str, target_addr: &str, tcp_stream: TcpStream) -> Result<TlsStream> {
    let connector = create_tls_connector();
    let server_name = parse_server_name(host)?;

    debug!("Performing TLS handshake");

    connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|source| Error::TlsConnect {
            target: target_addr.to_string(),
            source,
        })
}

/// Creates a TLS connector with system root certificates.
fn create_tls_connector() -> TlsConnector {
    let mut root_cert_store = rustls::RootCertStore::empty();
    root_cert_store.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    let tls_config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(tls_config))
}

/// Parses server name for TLS SNI.
fn parse_server_name(host: &str) -> Result<rustls::ServerName> {
    rustls::ServerName::try_from(host).map_err(|source| Error::InvalidDnsName {
        host: host.to_string(),
        source,
    })
}

/// Direct TCP connection.
#[instrument(name = "connection::tcp", skip_all, fields(target = %target_addr))]
async fn connect_tcp(target_addr: &str) -> Result<TcpStream> {
    debug!("Establishing TCP connection");

    TcpStream::connect(target_addr)
        .await
        .map_err(|source| Error::TcpConnect {
            target: target_addr.to_string(),
            source,
        })
}
