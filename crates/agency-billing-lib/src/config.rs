use crate::data_structures::{Money, PricingTier, ProjectCategory, MAX_AMOUNT};
use crate::error::{BillingError, BillingResult};
use crate::free_hours::FreeHoursPolicy;
use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Agency-wide billing constants, injected into every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Hourly rate per urgency tier.
    pub tier_rates: BTreeMap<PricingTier, Money>,
    /// Free support hours granted per calendar month.
    pub monthly_free_hours: Decimal,
    pub free_hours_policy: FreeHoursPolicy,
    /// Flat hosting fee for one full site-month.
    pub standard_mrr: Money,
    /// One free hosting credit is earned per this many billed sites.
    pub sites_per_free_credit: u32,
    /// Categories whose first delivery in a month is free.
    pub credit_eligible_categories: BTreeSet<ProjectCategory>,
    pub min_hours: Decimal,
    pub max_hours: Decimal,
}

impl Default for BillingConfig {
    fn default() -> Self {
        let tier_rates = BTreeMap::from([
            (PricingTier::Promotion, dec!(100)),
            (PricingTier::Low, dec!(150)),
            (PricingTier::Medium, dec!(175)),
            (PricingTier::High, dec!(250)),
        ]);
        let credit_eligible_categories = BTreeSet::from([
            ProjectCategory::LandingPage,
            ProjectCategory::MultiForm,
            ProjectCategory::BasicForm,
        ]);

        Self {
            tier_rates,
            monthly_free_hours: dec!(10),
            free_hours_policy: FreeHoursPolicy::default(),
            standard_mrr: dec!(99),
            sites_per_free_credit: 21,
            credit_eligible_categories,
            min_hours: Decimal::ZERO,
            max_hours: dec!(99.99),
        }
    }
}

impl BillingConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let config: BillingConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn rate_for(&self, tier: PricingTier) -> BillingResult<Money> {
        self.tier_rates
            .get(&tier)
            .copied()
            .ok_or(BillingError::MissingRate(tier))
    }

    pub fn validate(&self) -> BillingResult<()> {
        for tier in PricingTier::ALL {
            let rate = self.rate_for(tier)?;
            if rate < Decimal::ZERO {
                return Err(BillingError::InvalidConfig(format!(
                    "rate for tier {} is negative",
                    tier
                )));
            }
            if rate > MAX_AMOUNT {
                return Err(BillingError::InvalidConfig(format!(
                    "rate for tier {} exceeds {}",
                    tier, MAX_AMOUNT
                )));
            }
        }

        if self.monthly_free_hours < Decimal::ZERO {
            return Err(BillingError::InvalidConfig(
                "monthly_free_hours must not be negative".to_string(),
            ));
        }
        if self.standard_mrr < Decimal::ZERO || self.standard_mrr > MAX_AMOUNT {
            return Err(BillingError::InvalidConfig(format!(
                "standard_mrr must be between 0 and {}",
                MAX_AMOUNT
            )));
        }
        if self.sites_per_free_credit == 0 {
            return Err(BillingError::InvalidConfig(
                "sites_per_free_credit must be at least 1".to_string(),
            ));
        }
        if self.min_hours < Decimal::ZERO || self.min_hours > self.max_hours {
            return Err(BillingError::InvalidConfig(format!(
                "hour bounds [{}, {}] are not a valid range",
                self.min_hours, self.max_hours
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = BillingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sites_per_free_credit, 21);
        assert_eq!(config.standard_mrr, dec!(99));
    }

    #[test]
    fn test_missing_rate_is_fatal() {
        let mut config = BillingConfig::default();
        config.tier_rates.remove(&PricingTier::High);
        assert_eq!(
            config.validate(),
            Err(BillingError::MissingRate(PricingTier::High))
        );
        assert!(config.rate_for(PricingTier::High).is_err());
    }

    #[test]
    fn test_zero_credit_threshold_rejected() {
        let config = BillingConfig {
            sites_per_free_credit: 0,
            ..BillingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BillingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_oversized_amounts_rejected() {
        let mut config = BillingConfig::default();
        config.tier_rates.insert(PricingTier::High, Decimal::MAX);
        assert!(matches!(config.validate(), Err(BillingError::InvalidConfig(_))));

        let config = BillingConfig {
            standard_mrr: Decimal::MAX,
            ..BillingConfig::default()
        };
        assert!(matches!(config.validate(), Err(BillingError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_partial_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = r#"{"monthly_free_hours": 2.5, "standard_mrr": "120", "free_hours_policy": "highest_rate_first"}"#;
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = BillingConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.monthly_free_hours, dec!(2.5));
        assert_eq!(config.standard_mrr, dec!(120));
        assert_eq!(config.free_hours_policy, FreeHoursPolicy::HighestRateFirst);
        assert_eq!(config.rate_for(PricingTier::Low).unwrap(), dec!(150));
    }

    #[test]
    fn test_load_config_with_incomplete_rates_fails() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = r#"{"tier_rates": {"low": 150}}"#;
        temp_file.write_all(content.as_bytes()).unwrap();

        assert!(BillingConfig::load_from_file(temp_file.path()).is_err());
    }
}
