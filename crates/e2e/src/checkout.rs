//! Scripted checkout through the hosted payment page
//!
//! The flow is linear: each step blocks until the page reaches the
//! expected state before the next one runs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cartcheck_common::parse_minor_units;

use crate::browser::{Locator, PageDriver};
use crate::error::{E2eError, E2eResult};

/// Element ids on the order page
pub const PRODUCT_AMOUNT_ID: &str = "productAmount";
pub const SESSION_ID_ID: &str = "sessionId";

/// Element ids and classes on the hosted checkout page
pub const EMAIL_ID: &str = "email";
pub const CARD_NUMBER_ID: &str = "cardNumber";
pub const CARD_EXPIRY_ID: &str = "cardExpiry";
pub const CARD_CVC_ID: &str = "cardCvc";
pub const BILLING_NAME_ID: &str = "billingName";
pub const SUBMIT_COMPLETE_CLASS: &str = "SubmitButton--complete";

const SUCCESS_URL_PATTERN: &str = r"^https://(?P<host>[^/?#]+)/order_success\?session_id=(?P<session>.+)$";

/// Test payment details typed into the hosted form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub email: String,

    /// Digits typed before focusing the card field again
    pub card_padding: String,

    /// Final card digits
    pub card_tail: String,

    /// MMYY, the form inserts the separator
    pub expiry: String,

    pub cvc: String,
    pub billing_name: String,
}

impl Default for PaymentDetails {
    fn default() -> Self {
        Self {
            email: "assessment@test.com.br".to_string(),
            card_padding: "555555555555".to_string(),
            card_tail: "4444".to_string(),
            expiry: "0439".to_string(),
            cvc: "424".to_string(),
            billing_name: "Selenium Test WebDriver".to_string(),
        }
    }
}

/// What the flow observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOutcome {
    /// Price text shown on the order page before checkout
    pub displayed_price: String,

    /// The displayed price in minor units
    pub amount_minor: i64,

    /// Text of the session id element on the success page
    pub session_id: String,

    /// Browser URL after the redirect back to the application
    pub final_url: String,
}

impl CheckoutOutcome {
    /// The redirect landed on the success route with a non-empty session id
    pub fn assert_redirected(&self) -> E2eResult<()> {
        assert_success_url(&self.final_url)?;
        if self.session_id.trim().is_empty() {
            return Err(E2eError::AssertionFailed(
                "session id element on the success page is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Check the success URL shape and return its session id
pub fn assert_success_url(url: &str) -> E2eResult<String> {
    let re = Regex::new(SUCCESS_URL_PATTERN)?;
    re.captures(url)
        .and_then(|caps| caps.name("session"))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            E2eError::AssertionFailed(format!(
                "expected redirect to https://<host>/order_success?session_id=<id>, got {}",
                url
            ))
        })
}

/// The fixed checkout script
#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    base_url: String,
    button_id: String,
    details: PaymentDetails,
}

impl CheckoutFlow {
    pub fn new(base_url: impl Into<String>, button_id: impl Into<String>, details: PaymentDetails) -> Self {
        Self {
            base_url: base_url.into(),
            button_id: button_id.into(),
            details,
        }
    }

    pub fn button_id(&self) -> &str {
        &self.button_id
    }

    /// Drive the page from the order form to the success page
    pub async fn run(&self, page: &dyn PageDriver) -> E2eResult<CheckoutOutcome> {
        let d = &self.details;

        info!("Starting checkout at {}", self.base_url);
        page.goto(&self.base_url).await?;

        let displayed_price = page.text(&Locator::id(PRODUCT_AMOUNT_ID)).await?;
        let amount_minor = parse_minor_units(&displayed_price)?;
        debug!("Displayed price {:?} = {} minor units", displayed_price, amount_minor);

        let button = Locator::id(self.button_id.as_str());
        page.wait_for(&button).await?;
        page.click(&button).await?;

        let email = Locator::id(EMAIL_ID);
        page.wait_for(&email).await?;

        let card_number = Locator::id(CARD_NUMBER_ID);
        page.send_keys(&email, &d.email).await?;
        page.send_keys(&card_number, &d.card_padding).await?;
        page.click(&card_number).await?;
        page.send_keys(&card_number, &d.card_tail).await?;
        page.send_keys(&Locator::id(CARD_EXPIRY_ID), &d.expiry).await?;
        page.send_keys(&Locator::id(CARD_CVC_ID), &d.cvc).await?;
        page.send_keys(&Locator::id(BILLING_NAME_ID), &d.billing_name).await?;

        let submit = Locator::class(SUBMIT_COMPLETE_CLASS);
        page.wait_for(&submit).await?;
        page.click(&submit).await?;

        let session = Locator::id(SESSION_ID_ID);
        page.wait_for(&session).await?;
        let session_id = page.text(&session).await?;
        let final_url = page.current_url().await?;

        info!("Checkout finished at {}", final_url);

        Ok(CheckoutOutcome {
            displayed_price,
            amount_minor,
            session_id,
            final_url,
        })
    }
}
