// 11.0 kyc.rs: identity verification submissions and the admin review flow.
// one submission per user; a new submission replaces the old one in any
// state short of Approved. a rejection must carry a reason.

use crate::error::LedgerError;
use crate::types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycFields {
    pub full_name: String,
    pub date_of_birth: String,
    pub country: String,
    pub document_type: String,
    pub document_number: String,
}

impl KycFields {
    pub fn validate(&self) -> Result<(), LedgerError> {
        let required = [
            ("full name", &self.full_name),
            ("date of birth", &self.date_of_birth),
            ("country", &self.country),
            ("document type", &self.document_type),
            ("document number", &self.document_number),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(LedgerError::validation(format!("{label} is required")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KycDecision {
    Approve,
    Reject { reason: String },
    UnderReview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycVerification {
    pub user_id: UserId,
    pub status: KycStatus,
    pub fields: KycFields,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub submitted_at: Timestamp,
    pub reviewed_at: Option<Timestamp>,
}

impl KycVerification {
    pub fn submit(user_id: UserId, fields: KycFields, now: Timestamp) -> Result<Self, LedgerError> {
        fields.validate()?;
        Ok(Self {
            user_id,
            status: KycStatus::Pending,
            fields,
            rejection_reason: None,
            reviewed_by: None,
            submitted_at: now,
            reviewed_at: None,
        })
    }

    /// A new submission may replace anything not yet approved: corrected
    /// documents overwrite a Pending or UnderReview record, and a rejection
    /// reopens the door. Approved is final.
    pub fn can_resubmit(&self) -> bool {
        self.status != KycStatus::Approved
    }

    // 11.1: review replaces the status wholesale. rejection without a reason
    // is a validation error, not a silent empty string.
    pub fn review(
        &mut self,
        reviewer: UserId,
        decision: KycDecision,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if self.status == KycStatus::Approved {
            return Err(LedgerError::InvalidTransition {
                from: "APPROVED",
                action: "review",
            });
        }
        match decision {
            KycDecision::Approve => {
                self.status = KycStatus::Approved;
                self.rejection_reason = None;
            }
            KycDecision::Reject { reason } => {
                if reason.trim().is_empty() {
                    return Err(LedgerError::validation("rejection requires a reason"));
                }
                self.status = KycStatus::Rejected;
                self.rejection_reason = Some(reason);
            }
            KycDecision::UnderReview => {
                self.status = KycStatus::UnderReview;
                self.rejection_reason = None;
            }
        }
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(now);
        Ok(())
    }

    pub fn is_approved(&self) -> bool {
        self.status == KycStatus::Approved
    }
}
