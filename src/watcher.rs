//! The mailbox watch session.
//!
//! [`WatchSession`] owns one attempt at holding an authenticated,
//! folder-selected connection and drives the
//! connect/authenticate/select/sweep/idle cycle:
//!
//! ```text
//! Connecting -> Connected -> Authenticating -> Authenticated
//!     -> SelectingFolder -> Watching { Sweeping <-> Idling } -> Terminated
//! ```
//!
//! Failure handling is deliberately asymmetric. Connection failures are
//! retried forever with a fixed backoff; a failed unseen-search re-attempts
//! the same sweep; a failed per-message fetch skips that one message. But
//! authentication and folder-selection failures terminate the session
//! without retry, and a per-message processing failure propagates and
//! aborts the whole run. A login rejection carrying the known
//! credential-rotation phrase is the primary detection event: it raises the
//! structured alert before terminating.

use crate::classifier::MessageClassifier;
use crate::config::WatchConfig;
use crate::error::{Error, FailureClass, Result};
use crate::notify::{notification_timestamp, Alert, NotificationSink};
use crate::parser;
use crate::retry::{ConnectRetry, SweepRetry};
use crate::transport::{MailTransport, TransportConnector};
use std::convert::Infallible;
use tracing::{debug, error, info, warn};

/// States of the watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Opening a transport to the server.
    Connecting,
    /// Transport established, not yet authenticated.
    Connected,
    /// Submitting credentials.
    Authenticating,
    /// Credentials accepted.
    Authenticated,
    /// Selecting the watched folder.
    SelectingFolder,
    /// Querying and processing the unread set.
    Sweeping,
    /// Holding the blocking idle wait.
    Idling,
    /// Session over; no state follows.
    Terminated,
}

impl std::fmt::Display for WatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WatchState::Connecting => "connecting",
            WatchState::Connected => "connected",
            WatchState::Authenticating => "authenticating",
            WatchState::Authenticated => "authenticated",
            WatchState::SelectingFolder => "selecting-folder",
            WatchState::Sweeping => "sweeping",
            WatchState::Idling => "idling",
            WatchState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// How a watch session ended.
#[derive(Debug)]
pub enum WatchOutcome {
    /// Login was rejected with the credential-rotation phrase; the
    /// structured alert was sent. This is a graceful termination.
    CredentialRotation,
    /// The session ended on a terminal failure with no alert.
    Failed(Error),
}

/// One mailbox watch: the connect/authenticate/select/sweep/idle state machine.
///
/// The transport handle is exclusively owned by the running session; at most
/// one exists at a time. Construction injects the connector, classifier and
/// notification sink, so the session carries no process-wide state.
pub struct WatchSession<C, N> {
    config: WatchConfig,
    connector: C,
    classifier: MessageClassifier,
    sink: N,
    connect_retry: ConnectRetry,
    sweep_retry: SweepRetry,
    state: WatchState,
}

impl<C, N> WatchSession<C, N>
where
    C: TransportConnector,
    N: NotificationSink,
{
    /// Creates a session over the given collaborators.
    #[must_use]
    pub fn new(config: WatchConfig, connector: C, classifier: MessageClassifier, sink: N) -> Self {
        let connect_retry = ConnectRetry::new(config.timing.connect_retry_delay);
        Self {
            config,
            connector,
            classifier,
            sink,
            connect_retry,
            sweep_retry: SweepRetry::default(),
            state: WatchState::Connecting,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Runs the session to termination.
    ///
    /// Blocks (asynchronously) until a terminal failure or the credential
    /// rotation event; steady-state operation never returns. The final
    /// "watch ended" notification is sent on every terminal path.
    pub async fn run(&mut self) -> WatchOutcome {
        info!(host = %self.config.host, folder = %self.config.folder, "mailbox watch starting");

        let outcome = self.drive().await;

        self.transition(WatchState::Terminated);
        self.sink
            .send_text(&format!("mailbox watch ended {}", notification_timestamp()))
            .await;

        outcome
    }

    fn transition(&mut self, next: WatchState) {
        debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    /// The connect loop; returns only on a terminal event.
    async fn drive(&mut self) -> WatchOutcome {
        loop {
            self.transition(WatchState::Connecting);
            let mut transport = match self.connector.connect().await {
                Ok(transport) => transport,
                Err(err) => {
                    error!(error = %err, class = %err.failure_class(), "failed to connect to server");
                    self.connect_retry.pause().await;
                    continue;
                }
            };
            self.transition(WatchState::Connected);
            info!("server connection established");

            self.transition(WatchState::Authenticating);
            match transport
                .authenticate(&self.config.login, self.config.secret())
                .await
            {
                Ok(()) => {
                    self.transition(WatchState::Authenticated);
                    info!(login = %self.config.login, "login successful");
                    self.sink
                        .send_text(&format!(
                            "mailbox watch started {}",
                            notification_timestamp()
                        ))
                        .await;
                }
                Err(err) if err.failure_class() == FailureClass::TerminalCredential => {
                    // The primary detection event: the account secret was rotated.
                    error!(error = %err, "login rejected: mailbox password was changed");
                    self.sink.send_alert(&Alert::credential_rotation()).await;
                    return WatchOutcome::CredentialRotation;
                }
                Err(err) => {
                    error!(error = %err, "failed to login to server");
                    return WatchOutcome::Failed(err);
                }
            }

            self.transition(WatchState::SelectingFolder);
            if let Err(err) = transport.select_folder(&self.config.folder).await {
                error!(error = %err, folder = %self.config.folder, "failed to select folder");
                return WatchOutcome::Failed(err);
            }
            info!(folder = %self.config.folder, "folder selected");

            match self.watch_folder(&mut transport).await {
                Ok(never) => match never {},
                Err(err) if err.is_transient() => {
                    // Dropped connection mid-watch: return control to the
                    // connect loop rather than terminating.
                    warn!(error = %err, "transport failure while watching; reconnecting");
                }
                Err(err) => {
                    error!(error = %err, "processing failure while watching");
                    return WatchOutcome::Failed(err);
                }
            }
        }
    }

    /// The steady-state Sweeping/Idling cycle. Never returns `Ok`.
    async fn watch_folder<T: MailTransport>(&mut self, transport: &mut T) -> Result<Infallible> {
        self.sweep(transport).await?;

        loop {
            self.transition(WatchState::Idling);
            let activity = transport
                .idle_wait(self.config.timing.idle_timeout)
                .await?;

            if activity {
                self.sweep(transport).await?;
            } else {
                transport.keepalive().await?;
                info!("no new messages seen");
            }
        }
    }

    /// One full query-and-process pass over the currently unread messages.
    async fn sweep<T: MailTransport>(&mut self, transport: &mut T) -> Result<()> {
        self.transition(WatchState::Sweeping);

        // The unseen query re-attempts on its own policy, without reconnecting.
        let uids = loop {
            match transport.search_unseen().await {
                Ok(uids) => break uids,
                Err(err) => {
                    warn!(error = %err, "unseen search failed; re-attempting sweep");
                    self.sweep_retry.pause().await;
                }
            }
        };
        info!(count = uids.len(), "unread messages seen");

        for uid in uids {
            let raw = match transport.fetch(uid).await {
                Ok(raw) => raw,
                Err(err) => {
                    // One message failing to fetch does not halt the rest.
                    error!(uid, error = %err, "failed to fetch message; skipping");
                    continue;
                }
            };

            let message = match parser::parse_message(uid, &raw) {
                Ok(message) => message,
                Err(err) => {
                    // Processing failures are not isolated: log and propagate.
                    error!(uid, error = %err, "failed to process message");
                    return Err(err);
                }
            };

            let classification = self.classifier.classify(&message);
            info!(uid, subject = %message.subject, %classification, "processed message");
        }

        Ok(())
    }
}
