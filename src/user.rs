// 6.0 user.rs: the user aggregate. identity, role, lifecycle state,
// and the credentials the authorization gate checks (password, transfer PIN,
// two-factor enrollment).

use crate::types::{AccountNumber, Currency, Email, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    StaffAdmin,
    Admin,
}

// 6.1: lifecycle as a tagged state, not a scattered boolean. every query path
// has to say which state it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountState {
    Active,
    Deleted { at: Timestamp },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailCode {
    pub code: String,
    pub issued_at: Timestamp,
}

// 6.2: two-factor enrollment as a variant type. APP carries the TOTP secret
// (unconfirmed until the first valid code), EMAIL carries at most one pending
// single-use code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TwoFactor {
    Disabled,
    App { secret: Vec<u8>, confirmed: bool },
    Email { enabled: bool, pending: Option<EmailCode> },
}

impl TwoFactor {
    pub fn is_enabled(&self) -> bool {
        match self {
            TwoFactor::Disabled => false,
            TwoFactor::App { confirmed, .. } => *confirmed,
            TwoFactor::Email { enabled, .. } => *enabled,
        }
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            TwoFactor::Disabled => "NONE",
            TwoFactor::App { .. } => "APP",
            TwoFactor::Email { .. } => "EMAIL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: Role,
    pub state: AccountState,
    /// Unique once assigned; receiver identifier for P2P transfers.
    pub account_number: Option<AccountNumber>,
    pub preferred_currency: Currency,
    pub password_hash: String,
    /// bcrypt hash of the 4-digit transfer PIN.
    pub transfer_pin_hash: Option<String>,
    pub two_factor: TwoFactor,
    /// Manual verification by an admin; feeds is_verified alongside KYC.
    pub admin_verified: bool,
    /// Staff admins may only top up users assigned to them.
    pub assigned_staff: Option<UserId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn new(
        id: UserId,
        email: Email,
        password_hash: String,
        preferred_currency: Currency,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            email,
            name: None,
            role: Role::User,
            state: AccountState::Active,
            account_number: None,
            preferred_currency,
            password_hash,
            transfer_pin_hash: None,
            two_factor: TwoFactor::Disabled,
            admin_verified: false,
            assigned_staff: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == AccountState::Active
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.state, AccountState::Deleted { .. })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_pin(&self) -> bool {
        self.transfer_pin_hash.is_some()
    }

    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn soft_delete(&mut self, at: Timestamp) {
        self.state = AccountState::Deleted { at };
        self.updated_at = at;
    }

    pub fn restore(&mut self, at: Timestamp) {
        self.state = AccountState::Active;
        self.updated_at = at;
    }

    pub fn touch(&mut self, at: Timestamp) {
        self.updated_at = at;
    }
}
