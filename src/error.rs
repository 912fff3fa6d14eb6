//! Error types for the mail-sentinel crate.
//!
//! All errors implement [`std::error::Error`] and provide context about what went wrong.
//! Every error maps onto a [`FailureClass`] which drives the watch session's
//! retry-versus-terminate decision - see [`Error::failure_class`].

use thiserror::Error;

/// The authentication-rejection phrase that identifies a credential rotation.
///
/// Matched case-sensitively as a substring of the server's login failure text.
/// This is the primary detection event the whole system exists to surface.
pub const CREDENTIAL_REJECTION_PHRASE: &str = "Invalid credentials";

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while watching a mailbox.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration errors (fatal, pre-session)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid or incomplete configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Connection errors (retried forever with fixed backoff)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to establish TCP connection.
    #[error("failed to connect to {target}")]
    TcpConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to establish TLS connection.
    #[error("failed to establish TLS connection to {target}")]
    TlsConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        /// The invalid hostname.
        host: String,
        /// The underlying DNS name error.
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Session-terminating IMAP errors
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP login failed.
    ///
    /// When the server's rejection text contains [`CREDENTIAL_REJECTION_PHRASE`]
    /// this classifies as [`FailureClass::TerminalCredential`]; any other login
    /// failure is [`FailureClass::TerminalOther`]. Neither is retried.
    #[error("IMAP login failed for {login}")]
    ImapLogin {
        /// The login name used for authentication.
        login: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to select the watched folder.
    #[error("failed to select folder '{folder}'")]
    SelectFolder {
        /// The folder name.
        folder: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Transient protocol errors (absorbed by the watch loop)
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP UNSEEN search failed.
    #[error("IMAP search for unseen messages failed")]
    ImapSearch {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP fetch failed for one message.
    #[error("IMAP fetch failed for uid {uid}")]
    ImapFetch {
        /// The message uid that failed.
        uid: u32,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to read a fetched message from the response stream.
    #[error("failed to read fetched message from stream")]
    FetchMessage {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP NOOP keepalive failed.
    #[error("IMAP NOOP command failed")]
    ImapNoop {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP IDLE wait failed.
    #[error("IMAP IDLE wait failed")]
    Idle {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Per-message processing errors (propagate and abort the session)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to parse a fetched message.
    #[error("failed to parse message uid {uid}")]
    ParseMessage {
        /// The message uid that failed to parse.
        uid: u32,
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },
}

impl Error {
    /// Derives the [`FailureClass`] driving the retry-versus-terminate decision.
    #[must_use]
    pub fn failure_class(&self) -> FailureClass {
        match self {
            // All connection-open failures retry forever with fixed backoff.
            Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::InvalidDnsName { .. } => FailureClass::TransientConnect,

            // Login rejection containing the known phrase is the detection event.
            Error::ImapLogin { source, .. } => {
                if source.to_string().contains(CREDENTIAL_REJECTION_PHRASE) {
                    FailureClass::TerminalCredential
                } else {
                    FailureClass::TerminalOther
                }
            }

            Error::InvalidConfig { .. }
            | Error::SelectFolder { .. }
            | Error::ParseMessage { .. } => FailureClass::TerminalOther,

            Error::ImapSearch { .. }
            | Error::ImapFetch { .. }
            | Error::FetchMessage { .. }
            | Error::ImapNoop { .. }
            | Error::Idle { .. } => FailureClass::TransientProtocol,
        }
    }

    /// Returns `true` if this error is absorbed locally rather than ending the session.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.failure_class(),
            FailureClass::TransientConnect | FailureClass::TransientProtocol
        )
    }
}

/// Failure classification driving the watch session's control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Connection establishment failed; retried indefinitely with fixed backoff.
    TransientConnect,
    /// A protocol operation failed on a live session; absorbed by the watch loop.
    TransientProtocol,
    /// Login was rejected with the credential-rotation phrase; terminal, alerted.
    TerminalCredential,
    /// Any other terminal failure; ends the session without an alert.
    TerminalOther,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureClass::TransientConnect => write!(f, "transient-connect"),
            FailureClass::TransientProtocol => write!(f, "transient-protocol"),
            FailureClass::TerminalCredential => write!(f, "terminal-credential"),
            FailureClass::TerminalOther => write!(f, "terminal-other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imap_err(text: &str) -> async_imap::error::Error {
        async_imap::error::Error::Bad(text.to_string())
    }

    #[test]
    fn test_connect_failures_are_transient_connect() {
        let err = Error::TcpConnect {
            target: "imap.example.com:993".into(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.failure_class(), FailureClass::TransientConnect);
        assert!(err.is_transient());

        let err = Error::TlsConnect {
            target: "imap.example.com:993".into(),
            source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"),
        };
        assert_eq!(err.failure_class(), FailureClass::TransientConnect);
    }

    #[test]
    fn test_login_rejection_with_phrase_is_terminal_credential() {
        let err = Error::ImapLogin {
            login: "user@example.com".into(),
            source: imap_err("[AUTHENTICATIONFAILED] Invalid credentials (Failure)"),
        };
        assert_eq!(err.failure_class(), FailureClass::TerminalCredential);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_login_rejection_without_phrase_is_terminal_other() {
        let err = Error::ImapLogin {
            login: "user@example.com".into(),
            source: imap_err("server busy, try again later"),
        };
        assert_eq!(err.failure_class(), FailureClass::TerminalOther);
    }

    #[test]
    fn test_phrase_match_is_case_sensitive() {
        let err = Error::ImapLogin {
            login: "user@example.com".into(),
            source: imap_err("invalid credentials"),
        };
        // Lowercase server text does not match the known phrase.
        assert_eq!(err.failure_class(), FailureClass::TerminalOther);
    }

    #[test]
    fn test_sweep_errors_are_transient_protocol() {
        let err = Error::ImapSearch {
            source: imap_err("search failed"),
        };
        assert_eq!(err.failure_class(), FailureClass::TransientProtocol);

        let err = Error::Idle {
            source: imap_err("connection reset"),
        };
        assert_eq!(err.failure_class(), FailureClass::TransientProtocol);
        assert!(err.is_transient());
    }

    #[test]
    fn test_parse_failure_is_terminal() {
        let err = Error::ParseMessage {
            uid: 7,
            source: mailparse::MailParseError::Generic("not a message"),
        };
        assert_eq!(err.failure_class(), FailureClass::TerminalOther);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_failure_class_display() {
        assert_eq!(
            FailureClass::TerminalCredential.to_string(),
            "terminal-credential"
        );
        assert_eq!(
            FailureClass::TransientConnect.to_string(),
            "transient-connect"
        );
    }
}
