use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// club lending policy
///
/// Missing keys in a settings file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// flat interest charged over the whole term, in percent
    pub loan_interest_rate_percent: Decimal,
    /// how many times their savings a member may borrow
    pub max_loan_multiplier: Decimal,
    /// savings a member must hold before borrowing at all
    pub min_required_savings: Money,
    /// length of a savings cycle, used as the default loan term
    pub cycle_tenure_months: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            loan_interest_rate_percent: dec!(15.0),
            max_loan_multiplier: dec!(3.0),
            min_required_savings: Money::from_major(100),
            cycle_tenure_months: 12,
        }
    }
}

impl LedgerSettings {
    pub fn new(
        loan_interest_rate_percent: Decimal,
        max_loan_multiplier: Decimal,
        min_required_savings: Money,
        cycle_tenure_months: u32,
    ) -> Result<Self> {
        let settings = Self {
            loan_interest_rate_percent,
            max_loan_multiplier,
            min_required_savings,
            cycle_tenure_months,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// interest rate as a fraction
    pub fn interest_rate(&self) -> Rate {
        Rate::from_percent(self.loan_interest_rate_percent)
    }

    pub fn validate(&self) -> Result<()> {
        if self.loan_interest_rate_percent < Decimal::ZERO {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "loan interest rate must not be negative, got {}",
                    self.loan_interest_rate_percent
                ),
            });
        }

        if self.max_loan_multiplier < Decimal::ZERO {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "max loan multiplier must not be negative, got {}",
                    self.max_loan_multiplier
                ),
            });
        }

        if self.min_required_savings.is_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "minimum required savings must not be negative, got {}",
                    self.min_required_savings
                ),
            });
        }

        if self.cycle_tenure_months == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "cycle tenure must be at least one month".to_string(),
            });
        }

        Ok(())
    }

    /// parse and validate settings from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: LedgerSettings =
            toml::from_str(contents).map_err(|e| LedgerError::InvalidConfiguration {
                message: format!("failed to parse settings: {e}"),
            })?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Loads club settings from a TOML file.
///
/// # Errors
/// Returns `InvalidConfiguration` if the file cannot be read, is not valid
/// TOML, or holds values that fail validation.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<LedgerSettings> {
    let contents =
        std::fs::read_to_string(path.as_ref()).map_err(|e| LedgerError::InvalidConfiguration {
            message: format!("failed to read settings file {}: {e}", path.as_ref().display()),
        })?;

    LedgerSettings::from_toml_str(&contents)
}

/// one row of the settings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsVersion {
    pub settings: LedgerSettings,
    pub created_at: DateTime<Utc>,
}

/// settings rows in insertion order; the most recently created row wins
#[derive(Debug, Clone, Default)]
pub struct SettingsHistory {
    versions: Vec<SettingsVersion>,
}

impl SettingsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, version: SettingsVersion) {
        self.versions.push(version);
    }

    /// latest row by creation time; ties go to the row inserted last
    pub fn latest(&self) -> Option<&SettingsVersion> {
        self.versions
            .iter()
            .enumerate()
            .max_by_key(|(i, v)| (v.created_at, *i))
            .map(|(_, v)| v)
    }
}
