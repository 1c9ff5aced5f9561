use std::str::FromStr;

use rust_decimal::{ Decimal, RoundingStrategy };

use crate::error::AppError;

/// One band of a tiered fee schedule. `up_to = None` is the catch-all band.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeTier {
    pub up_to: Option<Decimal>,
    pub fee: Decimal,
}

/// Withdrawal fee, charged in tokens on top of the withdrawn amount.
#[derive(Debug, Clone, PartialEq)]
pub enum FeePolicy {
    Flat(Decimal),
    /// `rate` is a fraction (0.015 = 1.5%), clamped to the optional bounds.
    Percentage {
        rate: Decimal,
        min: Option<Decimal>,
        max: Option<Decimal>,
    },
    /// Bands sorted by ascending `up_to`.
    Tiered(Vec<FeeTier>),
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy::Flat(Decimal::from(5))
    }
}

impl FeePolicy {
    /// Fee for withdrawing `amount` tokens, rounded to `decimal_places`.
    pub fn fee_for(&self, amount: Decimal, decimal_places: u32) -> Decimal {
        let fee = match self {
            FeePolicy::Flat(fee) => *fee,
            FeePolicy::Percentage { rate, min, max } => {
                let mut fee = amount * *rate;
                if let Some(min) = min {
                    fee = fee.max(*min);
                }
                if let Some(max) = max {
                    fee = fee.min(*max);
                }
                fee
            }
            FeePolicy::Tiered(tiers) =>
                tiers
                    .iter()
                    .find(|tier| tier.up_to.map_or(true, |limit| amount <= limit))
                    .or_else(|| tiers.last())
                    .map(|tier| tier.fee)
                    .unwrap_or(Decimal::ZERO),
        };

        fee.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
    }

    fn parse_amount(raw: &str) -> Result<Decimal, AppError> {
        let value = Decimal::from_str(raw.trim()).map_err(|_|
            AppError::InvalidInput(format!("Invalid fee amount: {}", raw))
        )?;
        if value.is_sign_negative() {
            return Err(AppError::InvalidInput(format!("Fee amount cannot be negative: {}", raw)));
        }
        Ok(value)
    }

    fn parse_optional(raw: Option<&str>) -> Result<Option<Decimal>, AppError> {
        match raw {
            Some(value) if !value.trim().is_empty() => Self::parse_amount(value).map(Some),
            _ => Ok(None),
        }
    }
}

/// Parses `flat:5`, `percent:1.5[:min[:max]]` or `tiered:1000=5,10000=20,*=50`.
impl FromStr for FeePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, body) = s
            .split_once(':')
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid fee policy: {}", s)))?;

        match kind.trim().to_lowercase().as_str() {
            "flat" => Ok(FeePolicy::Flat(Self::parse_amount(body)?)),
            "percent" | "percentage" => {
                let mut parts = body.split(':');
                let percent = Self::parse_amount(parts.next().unwrap_or_default())?;
                let min = Self::parse_optional(parts.next())?;
                let max = Self::parse_optional(parts.next())?;

                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(AppError::InvalidInput("Fee minimum exceeds maximum".into()));
                    }
                }

                Ok(FeePolicy::Percentage {
                    rate: percent / Decimal::ONE_HUNDRED,
                    min,
                    max,
                })
            }
            "tiered" => {
                let mut tiers = Vec::new();
                for band in body.split(',').filter(|b| !b.trim().is_empty()) {
                    let (limit, fee) = band
                        .split_once('=')
                        .ok_or_else(|| AppError::InvalidInput(format!("Invalid fee tier: {}", band)))?;
                    let up_to = match limit.trim() {
                        "*" => None,
                        limit => Some(Self::parse_amount(limit)?),
                    };
                    tiers.push(FeeTier { up_to, fee: Self::parse_amount(fee)? });
                }

                if tiers.is_empty() {
                    return Err(AppError::InvalidInput("Tiered fee policy has no tiers".into()));
                }

                // Catch-all band sorts last
                tiers.sort_by(|a, b| {
                    match (a.up_to, b.up_to) {
                        (Some(a), Some(b)) => a.cmp(&b),
                        (Some(_), None) => std::cmp::Ordering::Less,
                        (None, Some(_)) => std::cmp::Ordering::Greater,
                        (None, None) => std::cmp::Ordering::Equal,
                    }
                });

                Ok(FeePolicy::Tiered(tiers))
            }
            other => Err(AppError::InvalidInput(format!("Unknown fee policy kind: {}", other))),
        }
    }
}
