//! Acceptance runner that sequences static and browser-driven cases

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use cartcheck_common::{BrowserConfig, HarnessConfig};

use crate::browser::with_session;
use crate::checkout::{CheckoutFlow, CheckoutOutcome, PaymentDetails};
use crate::error::{E2eError, E2eResult};
use crate::static_checks::{catalog, discover_button_id, PatternCheck, SourceFiles};
use crate::webhook::WebhookVerifier;

/// Group of cases that can be selected together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    /// Integration fragments present, secrets absent
    Static,
    /// The assigned product and amount are used
    Ast,
    /// Browser-driven checkout and its side effects
    Checkout,
}

impl Suite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suite::Static => "static",
            Suite::Ast => "ast",
            Suite::Checkout => "checkout",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Suite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Suite::Static),
            "ast" => Ok(Suite::Ast),
            "checkout" => Ok(Suite::Checkout),
            other => Err(format!("unknown suite '{}' (static, ast, checkout)", other)),
        }
    }
}

/// Browser-driven cases; each one runs the checkout in its own session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutCase {
    RedirectsToOrderSuccess,
    CreatesPaymentIntent,
    LeavesNoPendingWebhooks,
}

impl CheckoutCase {
    pub const ALL: [CheckoutCase; 3] = [
        CheckoutCase::RedirectsToOrderSuccess,
        CheckoutCase::CreatesPaymentIntent,
        CheckoutCase::LeavesNoPendingWebhooks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CheckoutCase::RedirectsToOrderSuccess => "checkout_redirects_to_order_success",
            CheckoutCase::CreatesPaymentIntent => "checkout_creates_payment_intent",
            CheckoutCase::LeavesNoPendingWebhooks => "checkout_leaves_no_pending_webhooks",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CheckoutCase::RedirectsToOrderSuccess => {
                "A successful payment redirects to /order_success with a session id"
            }
            CheckoutCase::CreatesPaymentIntent => {
                "A successful payment is recorded as succeeded for the displayed amount"
            }
            CheckoutCase::LeavesNoPendingWebhooks => {
                "The provider reports no pending webhook deliveries after payment"
            }
        }
    }
}

/// Listing entry for a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseInfo {
    pub name: String,
    pub suite: Suite,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    /// An expectation did not hold
    Failed,
    /// The case could not complete (timeout, HTTP, driver)
    Errored,
}

/// Result of running a single case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub name: String,
    pub suite: Suite,
    pub status: CaseStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
}

impl CaseResult {
    fn from_outcome(name: &str, suite: Suite, started: Instant, outcome: E2eResult<()>) -> Self {
        let (status, message) = match outcome {
            Ok(()) => (CaseStatus::Passed, None),
            Err(e) if e.is_assertion() => (CaseStatus::Failed, Some(e.to_string())),
            Err(e) => (CaseStatus::Errored, Some(e.to_string())),
        };
        Self {
            name: name.to_string(),
            suite,
            status,
            duration_ms: started.elapsed().as_millis() as u64,
            message,
        }
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub duration_ms: u64,
    pub results: Vec<CaseResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// Runs the checkout script against some browser
#[async_trait]
pub trait FlowExecutor: Send + Sync {
    async fn execute(&self, flow: &CheckoutFlow) -> E2eResult<CheckoutOutcome>;
}

/// Executes each flow in a fresh headless Chrome session
pub struct BrowserExecutor {
    config: BrowserConfig,
}

impl BrowserExecutor {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FlowExecutor for BrowserExecutor {
    async fn execute(&self, flow: &CheckoutFlow) -> E2eResult<CheckoutOutcome> {
        let flow = flow.clone();
        with_session(&self.config, move |session| {
            async move { flow.run(session).await }.boxed()
        })
        .await
    }
}

enum Case {
    Static(PatternCheck),
    Checkout(CheckoutCase),
}

impl Case {
    fn name(&self) -> &'static str {
        match self {
            Case::Static(check) => check.name,
            Case::Checkout(case) => case.name(),
        }
    }

    fn suite(&self) -> Suite {
        match self {
            Case::Static(check) => check.suite,
            Case::Checkout(_) => Suite::Checkout,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Case::Static(check) => check.description,
            Case::Checkout(case) => case.description(),
        }
    }
}

fn all_cases() -> E2eResult<Vec<Case>> {
    let mut cases: Vec<Case> = catalog()?.into_iter().map(Case::Static).collect();
    cases.extend(CheckoutCase::ALL.into_iter().map(Case::Checkout));
    Ok(cases)
}

/// Main acceptance runner
pub struct AcceptanceRunner {
    config: HarnessConfig,
    details: PaymentDetails,
    executor: Box<dyn FlowExecutor>,
}

impl AcceptanceRunner {
    /// Runner that drives a real browser
    pub fn new(config: HarnessConfig) -> Self {
        let executor = Box::new(BrowserExecutor::new(config.browser.clone()));
        Self::with_executor(config, executor)
    }

    /// Runner with a custom flow executor
    pub fn with_executor(config: HarnessConfig, executor: Box<dyn FlowExecutor>) -> Self {
        Self {
            config,
            details: PaymentDetails::default(),
            executor,
        }
    }

    pub fn with_payment_details(mut self, details: PaymentDetails) -> Self {
        self.details = details;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Every case in reporting order
    pub fn list_cases() -> E2eResult<Vec<CaseInfo>> {
        Ok(all_cases()?
            .iter()
            .map(|c| CaseInfo {
                name: c.name().to_string(),
                suite: c.suite(),
                description: c.description().to_string(),
            })
            .collect())
    }

    /// Run every case
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        self.run_matching(|_| true).await
    }

    /// Run the cases of one suite
    pub async fn run_suite(&self, suite: Suite) -> E2eResult<SuiteResult> {
        self.run_matching(|case| case.suite() == suite).await
    }

    /// Run a single case by name
    pub async fn run_case(&self, name: &str) -> E2eResult<CaseResult> {
        let result = self.run_named(name).await?;
        result
            .results
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::UnknownCase(name.to_string()))
    }

    /// Run a single case by name, keeping the run summary
    pub async fn run_named(&self, name: &str) -> E2eResult<SuiteResult> {
        if !all_cases()?.iter().any(|case| case.name() == name) {
            return Err(E2eError::UnknownCase(name.to_string()));
        }
        self.run_matching(|case| case.name() == name).await
    }

    async fn run_matching<P>(&self, predicate: P) -> E2eResult<SuiteResult>
    where
        P: Fn(&Case) -> bool,
    {
        let started_at = Utc::now();
        let start = Instant::now();

        let cases: Vec<Case> = all_cases()?.into_iter().filter(|c| predicate(c)).collect();

        // Both files are an implicit contract with the demo project
        let sources = SourceFiles::load(&self.config.sources)?;

        info!("Running {} case(s)...", cases.len());

        let mut results = Vec::with_capacity(cases.len());
        for case in &cases {
            let case_start = Instant::now();
            debug!("Running case: {}", case.name());

            let outcome = match case {
                Case::Static(check) => {
                    let outcome = check.evaluate(&sources);
                    if outcome.passed {
                        Ok(())
                    } else {
                        Err(E2eError::AssertionFailed(
                            outcome.message.unwrap_or_else(|| check.failure_message.to_string()),
                        ))
                    }
                }
                Case::Checkout(kind) => self.run_checkout_case(*kind, &sources).await,
            };

            let result = CaseResult::from_outcome(case.name(), case.suite(), case_start, outcome);
            match result.status {
                CaseStatus::Passed => info!("✓ {} ({} ms)", result.name, result.duration_ms),
                _ => error!(
                    "✗ {} - {}",
                    result.name,
                    result.message.as_deref().unwrap_or("unknown error")
                ),
            }
            results.push(result);
        }

        let count = |status: CaseStatus| results.iter().filter(|r| r.status == status).count();
        let passed = count(CaseStatus::Passed);
        let failed = count(CaseStatus::Failed);
        let errored = count(CaseStatus::Errored);
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Acceptance results: {} passed, {} failed, {} errored ({} ms)",
            passed, failed, errored, duration_ms
        );

        Ok(SuiteResult {
            started_at,
            total: results.len(),
            passed,
            failed,
            errored,
            duration_ms,
            results,
        })
    }

    async fn run_checkout_case(&self, case: CheckoutCase, sources: &SourceFiles) -> E2eResult<()> {
        self.config.validate()?;

        let button_id = discover_button_id(&sources.order_html)?;
        let flow = CheckoutFlow::new(
            self.config.base_url()?.as_str(),
            button_id,
            self.details.clone(),
        );

        let outcome = self.executor.execute(&flow).await?;

        match case {
            CheckoutCase::RedirectsToOrderSuccess => outcome.assert_redirected(),
            CheckoutCase::CreatesPaymentIntent => {
                let verifier = WebhookVerifier::new(&self.config)?;
                verifier.verify_payment(outcome.amount_minor).await.map(|_| ())
            }
            CheckoutCase::LeavesNoPendingWebhooks => {
                let verifier = WebhookVerifier::new(&self.config)?;
                let record = verifier.fetch_payment_intent().await?;
                verifier.verify_settled(&record.id).await.map(|_| ())
            }
        }
    }

    /// Write results as JSON into the output directory
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("acceptance-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_parse() {
        assert_eq!("static".parse::<Suite>().unwrap(), Suite::Static);
        assert_eq!("Checkout".parse::<Suite>().unwrap(), Suite::Checkout);
        assert!("visual".parse::<Suite>().is_err());
    }

    #[test]
    fn test_list_cases() {
        let cases = AcceptanceRunner::list_cases().unwrap();
        assert_eq!(cases.len(), 15);
        assert_eq!(cases.iter().filter(|c| c.suite == Suite::Checkout).count(), 3);
        assert_eq!(cases.last().unwrap().name, "checkout_leaves_no_pending_webhooks");
    }

    #[test]
    fn test_case_status_from_error_kind() {
        let start = Instant::now();
        let failed = CaseResult::from_outcome(
            "x",
            Suite::Static,
            start,
            Err(E2eError::AssertionFailed("missing".to_string())),
        );
        assert_eq!(failed.status, CaseStatus::Failed);

        let errored = CaseResult::from_outcome(
            "x",
            Suite::Checkout,
            start,
            Err(E2eError::Timeout {
                what: "#email".to_string(),
                seconds: 20,
            }),
        );
        assert_eq!(errored.status, CaseStatus::Errored);
        assert!(errored.message.unwrap().contains("#email"));
    }
}
