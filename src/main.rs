//! Binary entry point: configure from the environment, run one watch
//! session to termination, exit.
//!
//! Only a configuration failure exits non-zero; a terminated session,
//! including the credential-rotation event, is a normal outcome the
//! notifications already reported.

use mail_sentinel::{
    ImapConnector, MessageClassifier, WatchConfig, WatchOutcome, WatchSession, WebhookSink,
};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mail_sentinel=info")),
        )
        .init();

    let config = match WatchConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::from(1);
        }
    };

    let connector = ImapConnector::new(&config);
    let sink = WebhookSink::new(config.webhook_url.clone());
    let mut session = WatchSession::new(config, connector, MessageClassifier::default(), sink);

    match session.run().await {
        WatchOutcome::CredentialRotation => {
            info!("watch ended: mailbox credentials were rotated");
        }
        WatchOutcome::Failed(err) => {
            error!(error = %err, "watch ended on failure");
        }
    }

    ExitCode::SUCCESS
}
