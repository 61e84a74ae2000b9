//! cartcheck acceptance harness
//!
//! Verifies that a checkout demo (an order page plus a thin backend)
//! integrates a hosted payment provider correctly:
//! - static pattern checks against the page and backend sources
//! - a scripted checkout in headless Chrome over WebDriver
//! - webhook side effects read back from the app and the provider
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    AcceptanceRunner                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  static_checks                                              │
//! │    ├── SourceFiles::load(order.html, app.py)                │
//! │    └── catalog() -> [PatternCheck] -> evaluate()            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  checkout (one browser session per case)                    │
//! │    ├── with_session(BrowserConfig)                          │
//! │    │     ├── DriverProcess (chromedriver)                   │
//! │    │     └── BrowserSession: PageDriver                     │
//! │    └── CheckoutFlow::run -> CheckoutOutcome                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  webhook                                                    │
//! │    ├── GET <app>/payment_intent                             │
//! │    └── GET <provider>/v1/events/<id>                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod checkout;
pub mod driver;
pub mod error;
pub mod runner;
pub mod static_checks;
pub mod wait;
pub mod webhook;

pub use browser::{with_session, BrowserSession, Locator, PageDriver};
pub use checkout::{CheckoutFlow, CheckoutOutcome, PaymentDetails};
pub use error::{E2eError, E2eResult};
pub use runner::{AcceptanceRunner, CaseResult, CaseStatus, Suite, SuiteResult};
pub use static_checks::{PatternCheck, SourceFiles};
pub use webhook::WebhookVerifier;
