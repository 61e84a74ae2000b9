//! Records consumed from the application and the payment provider

use serde::{Deserialize, Deserializer, Serialize};

/// Status reported by the provider once a payment intent has been paid
pub const PAYMENT_SUCCEEDED: &str = "succeeded";

/// Last payment intent recorded by the application's webhook handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentRecord {
    pub id: String,

    #[serde(default)]
    pub status: String,

    /// Amount in minor units; the backend may send it as a number or a string
    #[serde(default, deserialize_with = "lenient_i64")]
    pub amount_received: i64,
}

impl PaymentIntentRecord {
    pub fn is_succeeded(&self) -> bool {
        self.status == PAYMENT_SUCCEEDED
    }
}

/// Event record from the provider's events API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub id: String,

    /// Webhook deliveries the provider has not yet seen acknowledged
    pub pending_webhooks: u64,
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(n) => Ok(n),
        NumberOrString::Float(f) if f.fract() == 0.0 => Ok(f as i64),
        NumberOrString::Float(f) => Err(serde::de::Error::custom(format!(
            "amount is not a whole number of minor units: {}",
            f
        ))),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid amount {:?}: {}", s, e))),
    }
}
