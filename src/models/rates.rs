use crate::models::config::RateSettings;
use thiserror::Error;

/// Rates applied by the cost calculator.
///
/// Only constructed through [`RateConfig::new`], so an instance always satisfies
/// `exchange_rate > 0` and `shipping_rate >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateConfig {
    exchange_rate: f64,
    shipping_rate: f64,
}

/// Errors raised when a rate update is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    #[error("Exchange rate must be greater than zero (got {0})")]
    InvalidExchangeRate(f64),

    #[error("Shipping rate must be zero or more (got {0})")]
    InvalidShippingRate(f64),

    #[error("'{0}' is not a number")]
    NotANumber(String),
}

impl RateConfig {
    pub fn new(exchange_rate: f64, shipping_rate: f64) -> Result<Self, RateError> {
        if !exchange_rate.is_finite() || exchange_rate <= 0.0 {
            return Err(RateError::InvalidExchangeRate(exchange_rate));
        }
        if !shipping_rate.is_finite() || shipping_rate < 0.0 {
            return Err(RateError::InvalidShippingRate(shipping_rate));
        }

        Ok(Self {
            exchange_rate,
            shipping_rate,
        })
    }

    /// Parse the two settings form fields.
    pub fn parse(exchange_rate: &str, shipping_rate: &str) -> Result<Self, RateError> {
        Self::new(parse_field(exchange_rate)?, parse_field(shipping_rate)?)
    }

    pub fn exchange_rate(&self) -> f64 {
        self.exchange_rate
    }

    pub fn shipping_rate(&self) -> f64 {
        self.shipping_rate
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        let settings = RateSettings::default();
        Self {
            exchange_rate: settings.exchange_rate,
            shipping_rate: settings.shipping_rate,
        }
    }
}

impl TryFrom<&RateSettings> for RateConfig {
    type Error = RateError;

    fn try_from(settings: &RateSettings) -> Result<Self, Self::Error> {
        Self::new(settings.exchange_rate, settings.shipping_rate)
    }
}

fn parse_field(input: &str) -> Result<f64, RateError> {
    let trimmed = input.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| RateError::NotANumber(trimmed.to_string()))
}
