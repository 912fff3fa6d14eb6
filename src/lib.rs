//! # mail-sentinel
//!
//! Unattended IMAP mailbox watcher that detects account-credential rotation
//! and reports it through a webhook.
//!
//! The watcher holds a persistent connection to one mailbox, sweeps unread
//! messages, and parks in IMAP IDLE between sweeps. Its real purpose is the
//! login path: when the server rejects authentication with an
//! invalid-credentials response, the account password was rotated out from
//! under the watcher, and that event is surfaced as a structured webhook
//! alert before the session terminates.
//!
//! This crate provides a high-level, async API for:
//! - Connecting to IMAP servers over TLS or plain TCP
//! - Watching a folder through a sweep/IDLE cycle with keepalives
//! - Classifying unread messages by sender (provider security notices)
//! - Delivering lifecycle notifications and the credential-rotation alert
//!   to a webhook endpoint
//!
//! ## Quick Start
//!
//! ```no_run
//! use mail_sentinel::{
//!     ImapConnector, MessageClassifier, WatchConfig, WatchSession, WebhookSink,
//! };
//!
//! # async fn example() -> mail_sentinel::Result<()> {
//! // Configure the watch
//! let config = WatchConfig::builder()
//!     .host("imap.gmail.com")
//!     .login("user@gmail.com")
//!     .secret("app-password")  // Use app-specific password for Gmail
//!     .webhook_url("https://discord.com/api/webhooks/...")
//!     .build()?;
//!
//! // Wire up the session and run it to termination
//! let connector = ImapConnector::new(&config);
//! let sink = WebhookSink::new(config.webhook_url.clone());
//! let mut session = WatchSession::new(config, connector, MessageClassifier::default(), sink);
//!
//! let outcome = session.run().await;
//! println!("watch ended: {outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All errors implement `std::error::Error` and provide context. Every error
//! carries a [`FailureClass`] that drives the session's retry-versus-terminate
//! decision:
//!
//! ```
//! use mail_sentinel::{Error, FailureClass};
//!
//! fn handle_error(error: &Error) {
//!     match error.failure_class() {
//!         FailureClass::TerminalCredential => println!("password rotated: {error}"),
//!         class if error.is_transient() => println!("absorbed ({class}): {error}"),
//!         _ => println!("terminal: {error}"),
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. All major operations emit
//! spans with structured fields.
//!
//! ### Span Naming Convention
//!
//! - `ImapConnector::connect` - Connection establishment
//! - `ImapTransport::authenticate` - IMAP authentication
//! - `ImapTransport::select_folder` - Folder selection
//! - `ImapTransport::search_unseen` - Unseen query
//! - `ImapTransport::fetch` - Message fetch
//! - `ImapTransport::idle_wait` - IDLE wait
//! - `connection::open` - Stream establishment (TCP, then TLS when enabled)
//!
//! ### Standard Fields
//!
//! - `target` - Server address as host:port
//! - `login` - Login name
//! - `folder` - Watched folder
//! - `uid` - Message uid
//! - `class` - Failure classification

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod classifier;
pub mod config;
pub mod error;
pub mod notify;
pub mod retry;
pub mod transport;
pub mod watcher;

// Internal modules
mod connection;
mod parser;

// Re-exports for ergonomic API
pub use classifier::{Classification, MessageClassifier};
pub use config::{TimingConfig, WatchConfig, WatchConfigBuilder};
pub use error::{Error, FailureClass, Result, CREDENTIAL_REJECTION_PHRASE};
pub use notify::{Alert, NotificationSink, WebhookSink};
pub use parser::ParsedMessage;
pub use transport::{ImapConnector, ImapTransport, MailTransport, TransportConnector};
pub use watcher::{WatchOutcome, WatchSession, WatchState};
