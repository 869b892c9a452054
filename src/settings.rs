// 15.0 settings.rs: small operator-tunable values that live outside the
// static config. currently just the displayed signal strength, which only
// admins may change.

use crate::error::LedgerError;
use crate::types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStrength(u8);

impl SignalStrength {
    /// Percentage, 0..=100.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (value <= 100).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsStore {
    signal_strength: SignalStrength,
    updated_by: Option<UserId>,
    updated_at: Option<Timestamp>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self {
            signal_strength: SignalStrength(100),
            updated_by: None,
            updated_at: None,
        }
    }
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal_strength(&self) -> SignalStrength {
        self.signal_strength
    }

    pub fn last_update(&self) -> Option<(UserId, Timestamp)> {
        self.updated_by.zip(self.updated_at)
    }

    pub fn set_signal_strength(
        &mut self,
        value: u8,
        by: UserId,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let strength = SignalStrength::new(value)
            .ok_or_else(|| LedgerError::validation("signal strength must be between 0 and 100"))?;
        self.signal_strength = strength;
        self.updated_by = Some(by);
        self.updated_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_full_strength() {
        let s = SettingsStore::new();
        assert_eq!(s.signal_strength().value(), 100);
        assert!(s.last_update().is_none());
    }

    #[test]
    fn rejects_out_of_range() {
        let mut s = SettingsStore::new();
        assert!(s
            .set_signal_strength(101, UserId(1), Timestamp::from_millis(0))
            .is_err());
        s.set_signal_strength(55, UserId(1), Timestamp::from_millis(5))
            .unwrap();
        assert_eq!(s.signal_strength().value(), 55);
        assert_eq!(
            s.last_update(),
            Some((UserId(1), Timestamp::from_millis(5)))
        );
    }
}
