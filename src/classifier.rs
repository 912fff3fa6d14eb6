//! Message classification.
//!
//! [`MessageClassifier`] tags each processed message by its sender header:
//! mail from the account provider's security-notice address is flagged as a
//! credential-rotation indicator, everything else is ordinary. The result
//! is logged per message but deliberately never triggers an alert - only
//! the login-rejection path does that.

use crate::parser::ParsedMessage;

/// Default sender marker identifying the provider's security-notice address.
pub const DEFAULT_SENDER_MARKER: &str = "accounts.google.com";

/// Classification of one processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// A regular message with no special meaning to the watcher.
    Ordinary,
    /// Sender suggests an account security or password-change notice.
    CredentialRotationIndicator,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Ordinary => write!(f, "ordinary"),
            Classification::CredentialRotationIndicator => {
                write!(f, "credential-rotation-indicator")
            }
        }
    }
}

/// Classifies messages by their sender header.
///
/// Pure and total: any input, including a missing sender, yields
/// [`Classification::Ordinary`] unless the sender contains the marker.
#[derive(Debug, Clone)]
pub struct MessageClassifier {
    sender_marker: String,
}

impl MessageClassifier {
    /// Creates a classifier with a custom sender marker.
    #[must_use]
    pub fn new(sender_marker: impl Into<String>) -> Self {
        Self {
            sender_marker: sender_marker.into(),
        }
    }

    /// Returns the marker this classifier looks for.
    #[must_use]
    pub fn sender_marker(&self) -> &str {
        &self.sender_marker
    }

    /// Classifies one parsed message.
    #[must_use]
    pub fn classify(&self, message: &ParsedMessage) -> Classification {
        match &message.sender {
            Some(sender) if sender.contains(&self.sender_marker) => {
                Classification::CredentialRotationIndicator
            }
            _ => Classification::Ordinary,
        }
    }
}

impl Default for MessageClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SENDER_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: Option<&str>) -> ParsedMessage {
        ParsedMessage {
            sender: sender.map(str::to_string),
            subject: "subject".into(),
        }
    }

    #[test]
    fn test_security_notice_sender_is_flagged() {
        let classifier = MessageClassifier::default();
        let msg = message(Some("Google <no-reply@accounts.google.com>"));
        assert_eq!(
            classifier.classify(&msg),
            Classification::CredentialRotationIndicator
        );
    }

    #[test]
    fn test_other_sender_is_ordinary() {
        let classifier = MessageClassifier::default();
        let msg = message(Some("Alice <alice@example.com>"));
        assert_eq!(classifier.classify(&msg), Classification::Ordinary);
    }

    #[test]
    fn test_missing_sender_is_ordinary() {
        let classifier = MessageClassifier::default();
        assert_eq!(classifier.classify(&message(None)), Classification::Ordinary);
    }

    #[test]
    fn test_custom_marker() {
        let classifier = MessageClassifier::new("security.example.org");
        let msg = message(Some("notices@security.example.org"));
        assert_eq!(
            classifier.classify(&msg),
            Classification::CredentialRotationIndicator
        );
        let msg = message(Some("no-reply@accounts.google.com"));
        assert_eq!(classifier.classify(&msg), Classification::Ordinary);
    }

    #[test]
    fn test_classification_is_idempotent() {
        // Re-classifying the same message always yields the same result.
        let classifier = MessageClassifier::default();
        let msg = message(Some("no-reply@accounts.google.com"));
        let first = classifier.classify(&msg);
        for _ in 0..3 {
            assert_eq!(classifier.classify(&msg), first);
        }
    }

    #[test]
    fn test_classification_display() {
        assert_eq!(Classification::Ordinary.to_string(), "ordinary");
        assert_eq!(
            Classification::CredentialRotationIndicator.to_string(),
            "credential-rotation-indicator"
        );
    }
}
