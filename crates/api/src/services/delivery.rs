//! Getting verification codes to the user.
//!
//! There is no mail integration. [`LogDelivery`] writes the code to the log,
//! which is enough for development and for operators to relay codes by hand.

use std::sync::Mutex;

use sundry_core::VerificationPurpose;

/// Sends an issued code to its recipient.
pub trait CodeDelivery: Send + Sync {
    fn deliver(&self, email: &str, purpose: VerificationPurpose, code: &str);
}

/// Logs codes instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDelivery;

impl CodeDelivery for LogDelivery {
    fn deliver(&self, email: &str, purpose: VerificationPurpose, code: &str) {
        tracing::warn!(
            email = %email,
            purpose = %purpose,
            code = %code,
            "Email delivery not configured, verification code logged"
        );
    }
}

/// A code handed to [`RecordingDelivery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredCode {
    pub email: String,
    pub purpose: VerificationPurpose,
    pub code: String,
}

/// Keeps every delivered code in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    sent: Mutex<Vec<DeliveredCode>>,
}

impl RecordingDelivery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent code sent to `email` for `purpose`.
    #[must_use]
    pub fn last_code(&self, email: &str, purpose: VerificationPurpose) -> Option<String> {
        self.sent
            .lock()
            .map(|sent| {
                sent.iter()
                    .rev()
                    .find(|d| d.email == email && d.purpose == purpose)
                    .map(|d| d.code.clone())
            })
            .unwrap_or_default()
    }

    /// Everything delivered so far, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<DeliveredCode> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl CodeDelivery for RecordingDelivery {
    fn deliver(&self, email: &str, purpose: VerificationPurpose, code: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(DeliveredCode {
                email: email.to_owned(),
                purpose,
                code: code.to_owned(),
            });
        }
    }
}
