//! Internal module for parsing fetched messages.
//!
//! The watch session only consumes two fields of each message: the sender
//! header (for classification) and the subject line (for logging).

use crate::error::{Error, Result};
use mailparse::{parse_mail, MailHeaderMap};

/// The header fields the session consumes from one fetched message.
///
/// Transient - exists only for the duration of one fetch-and-process step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Raw `From` header value, if present.
    pub sender: Option<String>,
    /// Subject line; empty when the header is missing.
    pub subject: String,
}

/// Parses the raw content of one fetched message.
///
/// A parse failure here is a per-message *processing* error: it is not
/// isolated and aborts the watch session.
///
/// # Errors
///
/// Returns [`Error::ParseMessage`] when the raw bytes are not a parseable
/// message.
pub fn parse_message(uid: u32, raw: &[u8]) -> Result<ParsedMessage> {
    let parsed = parse_mail(raw).map_err(|source| Error::ParseMessage { uid, source })?;

    let sender = parsed.headers.get_first_value("From");
    let subject = parsed
        .headers
        .get_first_value("Subject")
        .unwrap_or_default();

    Ok(ParsedMessage { sender, subject })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sender_and_subject() {
        let raw = b"From: Security <no-reply@accounts.google.com>\r\n\
                    To: user@example.com\r\n\
                    Subject: Security alert\r\n\
                    \r\n\
                    Your password was changed.";
        let message = parse_message(1, raw).unwrap();

        assert_eq!(
            message.sender.as_deref(),
            Some("Security <no-reply@accounts.google.com>")
        );
        assert_eq!(message.subject, "Security alert");
    }

    #[test]
    fn test_missing_from_header_yields_none() {
        let raw = b"To: user@example.com\r\nSubject: hi\r\n\r\nbody";
        let message = parse_message(2, raw).unwrap();
        assert_eq!(message.sender, None);
        assert_eq!(message.subject, "hi");
    }

    #[test]
    fn test_missing_subject_yields_empty_string() {
        let raw = b"From: a@b.c\r\nTo: user@example.com\r\n\r\nbody";
        let message = parse_message(3, raw).unwrap();
        assert_eq!(message.subject, "");
    }

    #[test]
    fn test_unparseable_content_is_error() {
        // A header line with no colon is not a valid message.
        let raw = b"this is not a header\r\n\r\nbody";
        let err = parse_message(9, raw).unwrap_err();
        assert!(matches!(err, Error::ParseMessage { uid: 9, .. }));
    }

    #[test]
    fn test_encoded_subject_is_decoded() {
        let raw = b"From: a@b.c\r\nSubject: =?utf-8?q?S=C3=A9curit=C3=A9?=\r\n\r\nbody";
        let message = parse_message(4, raw).unwrap();
        assert_eq!(message.subject, "S\u{e9}curit\u{e9}");
    }
}
