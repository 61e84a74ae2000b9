//! Post-checkout side-effect checks
//!
//! Reads the payment intent the application recorded from its webhook and
//! asks the provider whether every webhook delivery for it was acknowledged.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use cartcheck_common::{HarnessConfig, PaymentIntentRecord, ProviderEvent, PAYMENT_SUCCEEDED};

use crate::error::{E2eError, E2eResult};

/// HTTP client for the application and provider endpoints
pub struct WebhookVerifier {
    client: reqwest::Client,
    payment_intent_url: Url,
    config: HarnessConfig,
}

impl WebhookVerifier {
    pub fn new(config: &HarnessConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.browser.wait_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            payment_intent_url: config.payment_intent_url()?,
            config: config.clone(),
        })
    }

    /// Latest payment intent recorded by the application
    pub async fn fetch_payment_intent(&self) -> E2eResult<PaymentIntentRecord> {
        let request = self.client.get(self.payment_intent_url.clone());
        let record: PaymentIntentRecord = self.fetch_json(request, self.payment_intent_url.as_str()).await?;
        debug!(
            "Payment intent {}: status={} amount_received={}",
            record.id, record.status, record.amount_received
        );
        Ok(record)
    }

    /// Event record from the provider, authenticated with the secret key
    pub async fn retrieve_event(&self, event_id: &str) -> E2eResult<ProviderEvent> {
        let secret = self.config.provider_secret()?;
        let url = self.config.provider_event_url(event_id)?;
        let request = self.client.get(url.clone()).bearer_auth(secret);
        self.fetch_json(request, url.as_str()).await
    }

    /// The recorded payment succeeded for the expected amount
    pub async fn verify_payment(&self, expected_minor: i64) -> E2eResult<PaymentIntentRecord> {
        let record = self.fetch_payment_intent().await?;

        if !record.is_succeeded() {
            return Err(E2eError::AssertionFailed(format!(
                "payment intent {} has status {:?}, expected {:?}",
                record.id, record.status, PAYMENT_SUCCEEDED
            )));
        }
        if record.amount_received != expected_minor {
            return Err(E2eError::AssertionFailed(format!(
                "payment intent {} received {} but the page showed {}",
                record.id, record.amount_received, expected_minor
            )));
        }

        info!("Payment intent {} succeeded for {}", record.id, expected_minor);
        Ok(record)
    }

    /// The provider reports no pending webhook deliveries for this id
    pub async fn verify_settled(&self, event_id: &str) -> E2eResult<ProviderEvent> {
        let event = self.retrieve_event(event_id).await?;

        if event.pending_webhooks != 0 {
            return Err(E2eError::AssertionFailed(format!(
                "event {} still has {} pending webhook deliveries",
                event.id, event.pending_webhooks
            )));
        }

        info!("Event {} has no pending webhooks", event.id);
        Ok(event)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> E2eResult<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(E2eError::UnexpectedResponse {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
