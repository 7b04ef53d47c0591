//! Confirmation email content.

use legalfooter_core::{PolicyRecord, RecordId};
use serde::{Deserialize, Serialize};

/// Default sender for confirmation emails.
pub const DEFAULT_SENDER: &str = "LegalFooter <onboarding@resend.dev>";

/// Subject line of the confirmation email.
pub const CONFIRMATION_SUBJECT: &str = "Your LegalFooter Policy is Active";

/// What a confirmation email needs to know about a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Purchaser email address.
    pub recipient: Option<String>,
    /// Protected domain, rendered empty when absent.
    pub domain: Option<String>,
    /// Generated record id, rendered as the policy number.
    pub record_id: RecordId,
}

impl NotificationRequest {
    /// Builds the request from a persisted policy.
    pub fn from_record(record: &PolicyRecord) -> Self {
        Self { recipient: record.email.clone(), domain: record.domain.clone(), record_id: record.id }
    }

    /// Renders the email sent from `sender`.
    ///
    /// # Errors
    ///
    /// Returns `MailError::MissingRecipient` when there is no non-blank
    /// recipient address.
    pub fn render(&self, sender: &str) -> crate::Result<OutboundEmail> {
        let recipient = self
            .recipient
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .ok_or_else(|| crate::MailError::MissingRecipient {
                record_id: self.record_id.to_string(),
            })?;

        Ok(OutboundEmail {
            from: sender.to_string(),
            to: vec![recipient.to_string()],
            subject: CONFIRMATION_SUBJECT.to_string(),
            html: self.html_body(),
        })
    }

    fn html_body(&self) -> String {
        let domain = html_escape::encode_text(self.domain.as_deref().unwrap_or_default());
        let policy_number = self.record_id.policy_number();

        format!(
            "<h2>Welcome to LegalFooter</h2>\n\
             <p>Thank you for protecting your website.</p>\n\
             <ul>\n  \
             <li><strong>Domain:</strong> {domain}</li>\n  \
             <li><strong>Policy Number:</strong> {policy_number}</li>\n\
             </ul>\n\
             <p>If you have any questions, just reply to this email.</p>\n"
        )
    }
}

/// A rendered email, in the shape the email API accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    /// Sender, `Name <address>` form allowed.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}
