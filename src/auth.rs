// 9.0 auth.rs: credential management. transfer PIN, password changes, and
// two-factor enrollment/verification. bcrypt for anything we store, TOTP or
// single-use email codes for the second factor. all functions mutate the
// user aggregate in place; persistence and events are the engine's job.
//
// oracle rule: a failed credential check always surfaces as InvalidCredential,
// never as a more specific error, so callers cannot probe which factor missed.

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::idgen;
use crate::totp;
use crate::types::Timestamp;
use crate::user::{EmailCode, TwoFactor, User};

pub const PIN_LEN: usize = 4;
pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_pin_format(pin: &str) -> Result<(), LedgerError> {
    if pin.len() == PIN_LEN && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(LedgerError::validation("PIN must be exactly 4 digits"))
    }
}

fn hash(secret: &str, cost: u32) -> Result<String, LedgerError> {
    bcrypt::hash(secret, cost).map_err(|e| LedgerError::validation(format!("hashing failed: {e}")))
}

// 9.1: setting a PIN when one already exists requires the current PIN.
pub fn set_pin(
    user: &mut User,
    new_pin: &str,
    current_pin: Option<&str>,
    config: &LedgerConfig,
    now: Timestamp,
) -> Result<(), LedgerError> {
    validate_pin_format(new_pin)?;
    if let Some(existing) = &user.transfer_pin_hash {
        let provided = current_pin.ok_or(LedgerError::InvalidCredential)?;
        if !bcrypt::verify(provided, existing).unwrap_or(false) {
            return Err(LedgerError::InvalidCredential);
        }
    }
    user.transfer_pin_hash = Some(hash(new_pin, config.bcrypt_cost)?);
    user.touch(now);
    Ok(())
}

pub fn verify_pin(user: &User, pin: &str) -> Result<(), LedgerError> {
    let stored = user
        .transfer_pin_hash
        .as_ref()
        .ok_or_else(|| LedgerError::validation("no transfer PIN set"))?;
    if bcrypt::verify(pin, stored).unwrap_or(false) {
        Ok(())
    } else {
        Err(LedgerError::InvalidCredential)
    }
}

pub fn change_password(
    user: &mut User,
    current: &str,
    new: &str,
    config: &LedgerConfig,
    now: Timestamp,
) -> Result<(), LedgerError> {
    if !user.verify_password(current) {
        return Err(LedgerError::InvalidCredential);
    }
    if new.len() < MIN_PASSWORD_LEN {
        return Err(LedgerError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    user.password_hash = hash(new, config.bcrypt_cost)?;
    user.touch(now);
    Ok(())
}

// 9.2: APP enrollment is two-phase. setup stores an unconfirmed secret and
// returns it base32-encoded for the provisioning URI; the enrollment only
// counts once the user echoes back one valid code.
pub fn setup_app_2fa(user: &mut User, now: Timestamp) -> String {
    let secret = totp::generate_secret();
    let encoded = totp::secret_to_base32(&secret);
    user.two_factor = TwoFactor::App {
        secret,
        confirmed: false,
    };
    user.touch(now);
    encoded
}

pub fn confirm_app_2fa(
    user: &mut User,
    code: &str,
    config: &LedgerConfig,
    now: Timestamp,
) -> Result<(), LedgerError> {
    let TwoFactor::App { secret, confirmed } = &mut user.two_factor else {
        return Err(LedgerError::InvalidTransition {
            from: "no pending APP enrollment",
            action: "confirm APP 2FA",
        });
    };
    if !totp::verify(
        secret,
        code,
        now.as_unix_secs(),
        config.totp_step_secs,
        config.totp_drift_steps,
        config.totp_digits,
    ) {
        return Err(LedgerError::InvalidCredential);
    }
    *confirmed = true;
    user.touch(now);
    Ok(())
}

pub fn setup_email_2fa(user: &mut User, now: Timestamp) {
    user.two_factor = TwoFactor::Email {
        enabled: true,
        pending: None,
    };
    user.touch(now);
}

/// Mints a fresh single-use code, replacing any outstanding one. The caller
/// delivers it out of band.
pub fn issue_email_code(user: &mut User, now: Timestamp) -> Result<String, LedgerError> {
    let TwoFactor::Email { enabled: true, pending } = &mut user.two_factor else {
        return Err(LedgerError::InvalidTransition {
            from: "email 2FA not enabled",
            action: "issue email code",
        });
    };
    let code = idgen::email_code();
    *pending = Some(EmailCode {
        code: code.clone(),
        issued_at: now,
    });
    user.touch(now);
    Ok(code)
}

// 9.3: the gate every 2FA-protected operation calls. no enrollment means no
// second factor is demanded. email codes are single-use and age-limited;
// a consumed or expired code never verifies twice.
pub fn verify_two_factor(
    user: &mut User,
    code: Option<&str>,
    config: &LedgerConfig,
    now: Timestamp,
) -> Result<(), LedgerError> {
    match &mut user.two_factor {
        TwoFactor::Disabled => Ok(()),
        TwoFactor::App { confirmed: false, .. } => Ok(()),
        TwoFactor::App { secret, confirmed: true } => {
            let code = code.ok_or(LedgerError::InvalidCredential)?;
            if totp::verify(
                secret,
                code,
                now.as_unix_secs(),
                config.totp_step_secs,
                config.totp_drift_steps,
                config.totp_digits,
            ) {
                Ok(())
            } else {
                Err(LedgerError::InvalidCredential)
            }
        }
        TwoFactor::Email { enabled: false, .. } => Ok(()),
        TwoFactor::Email { enabled: true, pending } => {
            let code = code.ok_or(LedgerError::InvalidCredential)?;
            let issued = pending.take().ok_or(LedgerError::InvalidCredential)?;
            let fresh = issued.issued_at.elapsed_secs(&now) <= config.email_code_max_age_secs;
            if fresh && issued.code == code {
                Ok(())
            } else {
                Err(LedgerError::InvalidCredential)
            }
        }
    }
}

/// Disabling 2FA requires both the password and a final valid code.
pub fn disable_two_factor(
    user: &mut User,
    password: &str,
    code: Option<&str>,
    config: &LedgerConfig,
    now: Timestamp,
) -> Result<(), LedgerError> {
    if !user.verify_password(password) {
        return Err(LedgerError::InvalidCredential);
    }
    verify_two_factor(user, code, config, now)?;
    user.two_factor = TwoFactor::Disabled;
    user.touch(now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, Email, UserId};

    fn test_config() -> LedgerConfig {
        let mut config = LedgerConfig::default();
        config.bcrypt_cost = 4; // keep the test suite fast
        config
    }

    fn test_user() -> User {
        let hash = bcrypt::hash("password123", 4).unwrap();
        User::new(
            UserId(1),
            Email::parse("alice@example.com").unwrap(),
            hash,
            Currency::usd(),
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn pin_format() {
        assert!(validate_pin_format("1234").is_ok());
        assert!(validate_pin_format("0000").is_ok());
        assert!(validate_pin_format("123").is_err());
        assert!(validate_pin_format("12345").is_err());
        assert!(validate_pin_format("12a4").is_err());
    }

    #[test]
    fn first_pin_needs_no_current() {
        let mut user = test_user();
        let config = test_config();
        set_pin(&mut user, "1234", None, &config, Timestamp::from_millis(1)).unwrap();
        assert!(verify_pin(&user, "1234").is_ok());
        assert_eq!(verify_pin(&user, "4321"), Err(LedgerError::InvalidCredential));
    }

    #[test]
    fn changing_pin_requires_current() {
        let mut user = test_user();
        let config = test_config();
        let now = Timestamp::from_millis(1);
        set_pin(&mut user, "1234", None, &config, now).unwrap();

        assert_eq!(
            set_pin(&mut user, "9999", None, &config, now),
            Err(LedgerError::InvalidCredential)
        );
        assert_eq!(
            set_pin(&mut user, "9999", Some("0000"), &config, now),
            Err(LedgerError::InvalidCredential)
        );
        set_pin(&mut user, "9999", Some("1234"), &config, now).unwrap();
        assert!(verify_pin(&user, "9999").is_ok());
    }

    #[test]
    fn password_change() {
        let mut user = test_user();
        let config = test_config();
        let now = Timestamp::from_millis(1);

        assert_eq!(
            change_password(&mut user, "wrong", "newpassword", &config, now),
            Err(LedgerError::InvalidCredential)
        );
        assert!(change_password(&mut user, "password123", "short", &config, now).is_err());
        change_password(&mut user, "password123", "newpassword", &config, now).unwrap();
        assert!(user.verify_password("newpassword"));
        assert!(!user.verify_password("password123"));
    }

    #[test]
    fn app_2fa_enrollment_and_verification() {
        let mut user = test_user();
        let config = test_config();
        let now = Timestamp::from_millis(1_700_000_000_000);

        let encoded = setup_app_2fa(&mut user, now);
        let secret = crate::totp::secret_from_base32(&encoded).unwrap();
        assert!(!user.two_factor.is_enabled());

        // unconfirmed enrollment demands nothing yet
        verify_two_factor(&mut user, None, &config, now).unwrap();

        assert_eq!(
            confirm_app_2fa(&mut user, "000000", &config, now),
            Err(LedgerError::InvalidCredential)
        );
        let code = crate::totp::code_at(
            &secret,
            now.as_unix_secs(),
            config.totp_step_secs,
            config.totp_digits,
        );
        confirm_app_2fa(&mut user, &code, &config, now).unwrap();
        assert!(user.two_factor.is_enabled());

        verify_two_factor(&mut user, Some(&code), &config, now).unwrap();
        assert_eq!(
            verify_two_factor(&mut user, None, &config, now),
            Err(LedgerError::InvalidCredential)
        );
    }

    #[test]
    fn email_code_is_single_use() {
        let mut user = test_user();
        let config = test_config();
        let now = Timestamp::from_millis(0);

        setup_email_2fa(&mut user, now);
        let code = issue_email_code(&mut user, now).unwrap();

        verify_two_factor(&mut user, Some(&code), &config, now).unwrap();
        // consumed
        assert_eq!(
            verify_two_factor(&mut user, Some(&code), &config, now),
            Err(LedgerError::InvalidCredential)
        );
    }

    #[test]
    fn email_code_expires() {
        let mut user = test_user();
        let config = test_config();
        let issued_at = Timestamp::from_millis(0);

        setup_email_2fa(&mut user, issued_at);
        let code = issue_email_code(&mut user, issued_at).unwrap();

        let late = issued_at.add_millis((config.email_code_max_age_secs + 1) * 1000);
        assert_eq!(
            verify_two_factor(&mut user, Some(&code), &config, late),
            Err(LedgerError::InvalidCredential)
        );
    }

    #[test]
    fn reissue_replaces_pending_code() {
        let mut user = test_user();
        let config = test_config();
        let now = Timestamp::from_millis(0);

        setup_email_2fa(&mut user, now);
        let first = issue_email_code(&mut user, now).unwrap();
        let second = issue_email_code(&mut user, now).unwrap();

        if first != second {
            assert_eq!(
                verify_two_factor(&mut user, Some(&first), &config, now),
                Err(LedgerError::InvalidCredential)
            );
        } else {
            verify_two_factor(&mut user, Some(&second), &config, now).unwrap();
        }
    }

    #[test]
    fn disable_requires_password_and_code() {
        let mut user = test_user();
        let config = test_config();
        let now = Timestamp::from_millis(0);

        setup_email_2fa(&mut user, now);
        let code = issue_email_code(&mut user, now).unwrap();

        assert_eq!(
            disable_two_factor(&mut user, "wrong", Some(&code), &config, now),
            Err(LedgerError::InvalidCredential)
        );
        disable_two_factor(&mut user, "password123", Some(&code), &config, now).unwrap();
        assert_eq!(user.two_factor, TwoFactor::Disabled);
    }
}
