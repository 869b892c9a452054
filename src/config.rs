// 14.0 config.rs: all settings in one place. identifier lengths, expiry
// windows, TOTP parameters, hashing cost.

use crate::types::Currency;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    // Base currency for conversion pivoting
    pub base_currency: Currency,
    // Digits in a generated account number
    pub account_number_len: usize,
    // Attempts to find an unused account number before giving up
    pub id_retry_attempts: usize,
    // Pending deposits expire after this many hours
    pub deposit_expiry_hours: i64,
    // Email 2FA codes are valid for this many seconds
    pub email_code_max_age_secs: i64,
    // TOTP step, drift tolerance, and code length
    pub totp_step_secs: u64,
    pub totp_drift_steps: u64,
    pub totp_digits: u32,
    // bcrypt work factor for passwords and PINs
    pub bcrypt_cost: u32,
    // Rates older than this are considered stale
    pub rate_refresh_secs: i64,
    // Event buffer cap; oldest events drop first
    pub max_events: usize,
    // Log ledger mutations at info level
    pub verbose: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_currency: Currency::usd(),
            account_number_len: 10,
            id_retry_attempts: 10,
            deposit_expiry_hours: 24,
            email_code_max_age_secs: 600, // 10 minutes
            totp_step_secs: 30,
            totp_drift_steps: 2,
            totp_digits: 6,
            bcrypt_cost: 10,
            rate_refresh_secs: 3600,
            max_events: 10_000,
            verbose: false,
        }
    }
}

impl LedgerConfig {
    // Preset with tighter windows, for environments that favor safety over
    // convenience
    pub fn strict() -> Self {
        let mut config = Self::default();
        config.email_code_max_age_secs = 300;
        config.totp_drift_steps = 1;
        config.deposit_expiry_hours = 12;
        config.bcrypt_cost = 12;
        config
    }

    // Preset for tests and local simulation
    pub fn development() -> Self {
        let mut config = Self::default();
        config.bcrypt_cost = 4;
        config.verbose = true;
        config
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_number_len < 8 || self.account_number_len > 20 {
            return Err(ConfigError::InvalidIdentifiers {
                reason: "account number length must be between 8 and 20".to_string(),
            });
        }
        if self.id_retry_attempts == 0 {
            return Err(ConfigError::InvalidIdentifiers {
                reason: "need at least one allocation attempt".to_string(),
            });
        }
        if self.deposit_expiry_hours <= 0 {
            return Err(ConfigError::InvalidWindows {
                reason: "deposit expiry must be positive".to_string(),
            });
        }
        if self.email_code_max_age_secs <= 0 {
            return Err(ConfigError::InvalidWindows {
                reason: "email code max age must be positive".to_string(),
            });
        }
        if self.totp_step_secs == 0 || self.totp_digits < 6 || self.totp_digits > 8 {
            return Err(ConfigError::InvalidTotp {
                reason: "TOTP step must be positive and digits between 6 and 8".to_string(),
            });
        }
        if self.bcrypt_cost < 4 || self.bcrypt_cost > 31 {
            return Err(ConfigError::InvalidHashing {
                reason: "bcrypt cost must be between 4 and 31".to_string(),
            });
        }
        if self.max_events == 0 {
            return Err(ConfigError::InvalidWindows {
                reason: "event buffer cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidIdentifiers { reason: String },
    InvalidWindows { reason: String },
    InvalidTotp { reason: String },
    InvalidHashing { reason: String },
}
