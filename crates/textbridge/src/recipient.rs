//! Recipient normalization and resolution.
//!
//! A recipient is accepted when its digits form a 10-digit national number,
//! or an 11-digit number with a leading `1` country code. Two recipients are
//! the same target when their trailing 10 digits match, so `5551234567` and
//! `+1 (555) 123-4567` collapse to one send.

use crate::error::{BridgeError, BridgeResult};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

const NATIONAL_LEN: usize = 10;
const COUNTRY_CODE: char = '1';

/// A phone number reduced to 10 digits, or 11 digits starting with `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecipient(String);

impl NormalizedRecipient {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing 10 digits, used as the de-duplication identity.
    pub fn national(&self) -> &str {
        &self.0[self.0.len() - NATIONAL_LEN..]
    }
}

impl fmt::Display for NormalizedRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a raw token could not be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The token contained no digits at all.
    NoDigits,
    /// Digit count was neither 10 nor 11.
    WrongLength { digits: usize },
    /// 11 digits, but the first one is not the `1` country code.
    BadCountryCode { leading: char },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NoDigits => write!(f, "no digits"),
            RejectionReason::WrongLength { digits } => {
                write!(f, "expected 10 or 11 digits, found {digits}")
            }
            RejectionReason::BadCountryCode { leading } => {
                write!(f, "11-digit number must start with 1, found {leading}")
            }
        }
    }
}

impl std::error::Error for RejectionReason {}

/// A user-entered token that failed normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejected {
    pub token: String,
    pub reason: RejectionReason,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self.token, self.reason)
    }
}

/// Reduce a raw phone string to its canonical digit-only form.
pub fn normalize_recipient(raw: &str) -> Result<NormalizedRecipient, RejectionReason> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        0 => Err(RejectionReason::NoDigits),
        NATIONAL_LEN => Ok(NormalizedRecipient(digits)),
        11 if digits.starts_with(COUNTRY_CODE) => Ok(NormalizedRecipient(digits)),
        11 => Err(RejectionReason::BadCountryCode {
            leading: digits.chars().next().unwrap_or_default(),
        }),
        n => Err(RejectionReason::WrongLength { digits: n }),
    }
}

/// Split a free-form block on commas and newlines, dropping empty tokens.
pub fn split_recipient_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split([',', '\n', '\r'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Outcome of merging default and user-entered recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// De-duplicated delivery list, in first-seen order (defaults first).
    pub recipients: Vec<NormalizedRecipient>,
    /// User tokens that failed normalization. Non-fatal.
    pub rejected: Vec<Rejected>,
}

impl Resolution {
    /// The comma-joined `to` field the bridge expects.
    pub fn to_field(&self) -> String {
        self.recipients
            .iter()
            .map(NormalizedRecipient::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// Merge session defaults with user-typed recipients into one delivery list.
///
/// Defaults that fail normalization are dropped without being reported;
/// user tokens that fail are listed in [`Resolution::rejected`]. Fails with
/// [`BridgeError::NoValidRecipients`] when nothing survives.
pub fn resolve(defaults: &[String], additional: &str) -> BridgeResult<Resolution> {
    let mut seen = HashSet::new();
    let mut recipients = Vec::new();
    let mut rejected = Vec::new();

    for raw in defaults {
        match normalize_recipient(raw) {
            Ok(r) => {
                if seen.insert(r.national().to_string()) {
                    recipients.push(r);
                }
            }
            Err(reason) => {
                tracing::debug!(recipient = %raw, %reason, "dropping invalid default recipient");
            }
        }
    }

    for token in split_recipient_tokens(additional) {
        match normalize_recipient(token) {
            Ok(r) => {
                if seen.insert(r.national().to_string()) {
                    recipients.push(r);
                }
            }
            Err(reason) => rejected.push(Rejected {
                token: token.to_string(),
                reason,
            }),
        }
    }

    if recipients.is_empty() {
        return Err(BridgeError::NoValidRecipients { rejected });
    }
    if !rejected.is_empty() {
        tracing::warn!(count = rejected.len(), "ignoring invalid recipients");
    }

    Ok(Resolution {
        recipients,
        rejected,
    })
}
