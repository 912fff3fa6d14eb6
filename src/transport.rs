//! The mail transport seam.
//!
//! [`MailTransport`] is the protocol-level interface the watch session
//! drives: authenticate, select a folder, search unseen messages, fetch raw
//! content, hold an IDLE wait and send keepalives. [`TransportConnector`]
//! produces a fresh transport for each connection attempt, which is how the
//! Connecting state re-establishes a dropped session.
//!
//! The production implementation ([`ImapConnector`] / [`ImapTransport`])
//! wraps async-imap over a TLS or plain TCP stream. Tests substitute
//! scripted implementations of the same traits.

use crate::config::WatchConfig;
use crate::connection::{self, MailStream};
use crate::error::{Error, Result};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Protocol-level operations over one live, exclusively-owned connection.
#[allow(async_fn_in_trait)]
pub trait MailTransport {
    /// Submits the login name and secret.
    async fn authenticate(&mut self, login: &str, secret: &str) -> Result<()>;

    /// Selects the folder to watch.
    async fn select_folder(&mut self, folder: &str) -> Result<()>;

    /// Returns the identifiers of currently unseen messages, in the order
    /// the transport defines (ascending uid for IMAP).
    async fn search_unseen(&mut self) -> Result<Vec<u32>>;

    /// Fetches the raw content of one message.
    async fn fetch(&mut self, uid: u32) -> Result<Vec<u8>>;

    /// Holds a blocking wait on the mailbox until the server signals
    /// activity or the timeout elapses. Returns `true` when activity was
    /// signaled.
    async fn idle_wait(&mut self, timeout: Duration) -> Result<bool>;

    /// Sends a lightweight no-op to keep the session alive.
    async fn keepalive(&mut self) -> Result<()>;
}

/// Produces a fresh transport for each connection attempt.
#[allow(async_fn_in_trait)]
pub trait TransportConnector {
    /// The transport type produced on success.
    type Transport: MailTransport;

    /// Opens a new connection to the mail server.
    async fn connect(&self) -> Result<Self::Transport>;
}

/// Type alias for the IMAP session over the connection stream.
type ImapSession = async_imap::Session<MailStream>;

/// Connection state of an [`ImapTransport`].
///
/// The handle moves from `Connected` to `Authenticated` on login; a failed
/// IDLE round leaves it `Defunct`, after which the session reconnects.
enum ImapState {
    Connected(async_imap::Client<MailStream>),
    Authenticated(ImapSession),
    Defunct,
}

impl ImapState {
    fn name(&self) -> &'static str {
        match self {
            ImapState::Connected(_) => "connected",
            ImapState::Authenticated(_) => "authenticated",
            ImapState::Defunct => "defunct",
        }
    }
}

fn state_error(expected: &str, actual: &str) -> async_imap::error::Error {
    async_imap::error::Error::Bad(format!(
        "transport in state '{actual}', expected '{expected}'"
    ))
}

/// [`TransportConnector`] implementation for IMAP over TLS or plain TCP.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    host: String,
    target_addr: String,
    tls: bool,
}

impl ImapConnector {
    /// Creates a connector from the watch configuration.
    #[must_use]
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            host: config.host.clone(),
            target_addr: config.server_address(),
            tls: config.tls,
        }
    }
}

impl TransportConnector for ImapConnector {
    type Transport = ImapTransport;

    #[instrument(
        name = "ImapConnector::connect",
        skip_all,
        fields(target = %self.target_addr, tls = self.tls)
    )]
    async fn connect(&self) -> Result<ImapTransport> {
        let stream = connection::open_stream(&self.host, &self.target_addr, self.tls).await?;
        debug!("Connection established");
        Ok(ImapTransport {
            state: ImapState::Connected(async_imap::Client::new(stream)),
        })
    }
}

/// [`MailTransport`] implementation over async-imap.
pub struct ImapTransport {
    state: ImapState,
}

impl std::fmt::Debug for ImapTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapTransport")
            .field("state", &self.state.name())
            .finish()
    }
}

impl ImapTransport {
    fn session(&mut self) -> std::result::Result<&mut ImapSession, async_imap::error::Error> {
        match &mut self.state {
            ImapState::Authenticated(session) => Ok(session),
            other => Err(state_error("authenticated", other.name())),
        }
    }
}

impl MailTransport for ImapTransport {
    #[instrument(name = "ImapTransport::authenticate", skip_all, fields(login = %login))]
    async fn authenticate(&mut self, login: &str, secret: &str) -> Result<()> {
        let state = std::mem::replace(&mut self.state, ImapState::Defunct);
        let client = match state {
            ImapState::Connected(client) => client,
            other => {
                return Err(Error::ImapLogin {
                    login: login.to_string(),
                    source: state_error("connected", other.name()),
                })
            }
        };

        debug!("Authenticating to IMAP server");

        match client.login(login, secret).await {
            Ok(session) => {
                self.state = ImapState::Authenticated(session);
                Ok(())
            }
            Err((source, _client)) => Err(Error::ImapLogin {
                login: login.to_string(),
                source,
            }),
        }
    }

    #[instrument(name = "ImapTransport::select_folder", skip(self), fields(folder = %folder))]
    async fn select_folder(&mut self, folder: &str) -> Result<()> {
        let wrap = |source| Error::SelectFolder {
            folder: folder.to_string(),
            source,
        };
        let session = self.session().map_err(wrap)?;

        debug!("Selecting folder");

        session.select(folder).await.map_err(wrap)?;
        Ok(())
    }

    #[instrument(name = "ImapTransport::search_unseen", skip(self))]
    async fn search_unseen(&mut self) -> Result<Vec<u32>> {
        let wrap = |source| Error::ImapSearch { source };
        let session = self.session().map_err(wrap)?;

        let uids = session.uid_search("UNSEEN").await.map_err(wrap)?;

        // The protocol returns an unordered set; present it ascending so the
        // session processes oldest-first.
        let mut uids: Vec<u32> = uids.into_iter().collect();
        uids.sort_unstable();

        debug!(count = uids.len(), "Unseen search complete");

        Ok(uids)
    }

    #[instrument(name = "ImapTransport::fetch", skip(self), fields(uid))]
    async fn fetch(&mut self, uid: u32) -> Result<Vec<u8>> {
        let session = self
            .session()
            .map_err(|source| Error::ImapFetch { uid, source })?;

        let mut body = None;
        {
            let mut stream = session
                .uid_fetch(uid.to_string(), "BODY[]")
                .await
                .map_err(|source| Error::ImapFetch { uid, source })?;

            while let Some(result) = stream.next().await {
                let fetched = result.map_err(|source| Error::FetchMessage { source })?;
                if let Some(content) = fetched.body() {
                    body = Some(content.to_vec());
                }
            }
        }

        body.ok_or_else(|| Error::FetchMessage {
            source: async_imap::error::Error::Bad(format!("fetch for uid {uid} returned no body")),
        })
    }

    #[instrument(name = "ImapTransport::idle_wait", skip(self), fields(timeout_secs = timeout.as_secs()))]
    async fn idle_wait(&mut self, timeout: Duration) -> Result<bool> {
        use async_imap::extensions::idle::IdleResponse;

        let state = std::mem::replace(&mut self.state, ImapState::Defunct);
        let session = match state {
            ImapState::Authenticated(session) => session,
            other => {
                return Err(Error::Idle {
                    source: state_error("authenticated", other.name()),
                })
            }
        };

        // IDLE takes ownership of the session; it is returned by done() and
        // stored back only when the whole round succeeds. On failure the
        // transport stays defunct and the watch session reconnects.
        let mut handle = session.idle();
        handle
            .init()
            .await
            .map_err(|source| Error::Idle { source })?;

        let (wait, interrupt) = handle.wait_with_timeout(timeout);
        let response = wait.await.map_err(|source| Error::Idle { source })?;
        drop(interrupt);

        let session = handle
            .done()
            .await
            .map_err(|source| Error::Idle { source })?;
        self.state = ImapState::Authenticated(session);

        match response {
            IdleResponse::NewData(_) => {
                debug!("Server signaled mailbox activity");
                Ok(true)
            }
            IdleResponse::Timeout | IdleResponse::ManualInterrupt => Ok(false),
        }
    }

    #[instrument(name = "ImapTransport::keepalive", skip(self))]
    async fn keepalive(&mut self) -> Result<()> {
        let wrap = |source| Error::ImapNoop { source };
        let session = self.session().map_err(wrap)?;
        session.noop().await.map_err(wrap)?;
        Ok(())
    }
}
