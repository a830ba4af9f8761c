use crate::config::BillingConfig;
use crate::data_structures::{Money, PricedLineItem, PricingTier, TimeBasedRequest};
use crate::error::{BillingError, BillingResult};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

const QUARTER_HOUR: Decimal = dec!(0.25);

/// Prices a single ticket: hours snapped to the quarter hour, times the tier rate.
#[derive(Debug, Clone)]
pub struct TieredCostCalculator {
    rates: BTreeMap<PricingTier, Money>,
    min_hours: Decimal,
    max_hours: Decimal,
}

impl TieredCostCalculator {
    pub fn new(config: &BillingConfig) -> BillingResult<Self> {
        config.validate()?;

        let mut rates = BTreeMap::new();
        for tier in PricingTier::ALL {
            rates.insert(tier, config.rate_for(tier)?);
        }

        Ok(Self {
            rates,
            min_hours: config.min_hours,
            max_hours: config.max_hours,
        })
    }

    pub fn rate(&self, tier: PricingTier) -> BillingResult<Money> {
        self.rates
            .get(&tier)
            .copied()
            .ok_or(BillingError::MissingRate(tier))
    }

    /// Snaps `hours` to the nearest 0.25 and clamps it into the configured bounds.
    ///
    /// Zero and exact quarter-hour values are kept as-is rather than re-rounded.
    /// Expects validated, non-negative hours; see [`TimeBasedRequest::validate`].
    pub fn round_hours(&self, hours: Decimal) -> Decimal {
        let on_quarter = hours
            .checked_rem(QUARTER_HOUR)
            .is_some_and(|remainder| remainder.is_zero());
        let snapped = if hours.is_zero() || on_quarter {
            hours
        } else {
            match hours.checked_div(QUARTER_HOUR) {
                Some(quarters) => {
                    quarters.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                        * QUARTER_HOUR
                }
                None => self.max_hours,
            }
        };

        snapped.clamp(self.min_hours, self.max_hours)
    }

    /// Same as [`round_hours`](Self::round_hours) for raw floating-point input.
    pub fn round_hours_f64(&self, hours: f64) -> BillingResult<Decimal> {
        if !hours.is_finite() {
            return Err(BillingError::NonFiniteHours { value: hours });
        }
        if hours < 0.0 {
            return Err(BillingError::NegativeHoursValue { value: hours });
        }

        let hours = Decimal::from_f64(hours).unwrap_or(self.max_hours);
        Ok(self.round_hours(hours))
    }

    pub fn price(&self, request: &TimeBasedRequest) -> BillingResult<PricedLineItem> {
        request.validate()?;

        let tier = request.urgency_tier();
        let rate = self.rate(tier)?;
        let rounded_hours = self.round_hours(request.hours());
        let gross_amount = rounded_hours * rate;

        Ok(PricedLineItem {
            request: request.clone(),
            tier,
            rate,
            rounded_hours,
            gross_amount,
            free_hours_applied: Decimal::ZERO,
            net_amount: gross_amount,
        })
    }

    pub fn price_all(&self, requests: &[TimeBasedRequest]) -> BillingResult<Vec<PricedLineItem>> {
        requests.iter().map(|request| self.price(request)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn calculator() -> TieredCostCalculator {
        TieredCostCalculator::new(&BillingConfig::default()).unwrap()
    }

    fn ticket(hours: Decimal, tier: PricingTier) -> TimeBasedRequest {
        TimeBasedRequest::new(
            "T-1",
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            tier,
            hours,
        )
    }

    #[test]
    fn test_round_to_nearest_quarter() {
        let calculator = calculator();
        assert_eq!(calculator.round_hours(dec!(1.1)), dec!(1.0));
        assert_eq!(calculator.round_hours(dec!(1.13)), dec!(1.25));
        assert_eq!(calculator.round_hours(dec!(1.125)), dec!(1.25));
        assert_eq!(calculator.round_hours(dec!(2.9)), dec!(3.0));
    }

    #[test]
    fn test_exact_quarters_pass_through() {
        let calculator = calculator();
        for hours in [dec!(0), dec!(0.25), dec!(0.5), dec!(0.75), dec!(4), dec!(12.25)] {
            assert_eq!(calculator.round_hours(hours), hours);
        }
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let calculator = calculator();
        assert_eq!(calculator.round_hours(dec!(150)), dec!(99.99));
        assert_eq!(calculator.round_hours(Decimal::MAX), dec!(99.99));
    }

    #[test]
    fn test_round_hours_f64_rejects_negative() {
        let calculator = calculator();
        assert!(matches!(
            calculator.round_hours_f64(-3.0),
            Err(BillingError::NegativeHoursValue { .. })
        ));
        assert!(calculator.round_hours_f64(-0.25).is_err());
        assert_eq!(calculator.round_hours_f64(0.0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_round_hours_f64_rejects_non_numeric() {
        let calculator = calculator();
        assert!(matches!(
            calculator.round_hours_f64(f64::NAN),
            Err(BillingError::NonFiniteHours { .. })
        ));
        assert!(calculator.round_hours_f64(f64::INFINITY).is_err());
        assert_eq!(calculator.round_hours_f64(0.25).unwrap(), dec!(0.25));
        assert_eq!(calculator.round_hours_f64(1e40).unwrap(), dec!(99.99));
    }

    #[test]
    fn test_price_uses_tier_rate() {
        let calculator = calculator();
        let item = calculator.price(&ticket(dec!(2.1), PricingTier::High)).unwrap();
        assert_eq!(item.rounded_hours, dec!(2.0));
        assert_eq!(item.rate, dec!(250));
        assert_eq!(item.gross_amount, dec!(500));
        assert_eq!(item.net_amount, item.gross_amount);
        assert_eq!(item.free_hours_applied, Decimal::ZERO);
    }

    #[test]
    fn test_price_rejects_negative_hours() {
        let calculator = calculator();
        assert!(matches!(
            calculator.price(&ticket(dec!(-0.5), PricingTier::Low)),
            Err(BillingError::NegativeHours { .. })
        ));
    }

    #[test]
    fn test_missing_rate_fails_construction() {
        let mut config = BillingConfig::default();
        config.tier_rates.remove(&PricingTier::Promotion);
        assert!(matches!(
            TieredCostCalculator::new(&config),
            Err(BillingError::MissingRate(PricingTier::Promotion))
        ));
    }
}
