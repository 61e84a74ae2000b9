//! Static pattern checks against the order page and backend sources
//!
//! Every check is a set of regular expressions applied to one source file.
//! Patterns are compiled case-insensitive and multi-line, and accept either
//! quote style wherever the page author could pick one.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use cartcheck_common::SourcesConfig;

use crate::error::{E2eError, E2eResult};
use crate::runner::Suite;

/// Which of the two source files a check reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    OrderPage,
    Backend,
}

/// Contents of the checked sources, read once per run
#[derive(Debug, Clone)]
pub struct SourceFiles {
    pub order_html: String,
    pub backend: String,
}

impl SourceFiles {
    /// Read both sources; a missing file is fatal for the run
    pub fn load(config: &SourcesConfig) -> E2eResult<Self> {
        Ok(Self {
            order_html: read_source(&config.order_html)?,
            backend: read_source(&config.backend)?,
        })
    }

    pub fn get(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::OrderPage => &self.order_html,
            SourceKind::Backend => &self.backend,
        }
    }
}

fn read_source(path: &Path) -> E2eResult<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => E2eError::SourceMissing {
            path: path.to_path_buf(),
        },
        _ => E2eError::Io(e),
    })
}

/// What a rule requires of its pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Matches at least once
    Present,
    /// Never matches
    Absent,
    /// Matches exactly once
    ExactlyOnce,
}

/// One pattern and what it must do
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub regex: Regex,
    pub expectation: Expectation,
}

/// A single static assertion; every rule must hold
#[derive(Debug, Clone)]
pub struct PatternCheck {
    pub name: &'static str,
    pub suite: Suite,
    pub description: &'static str,
    pub source: SourceKind,
    pub rules: Vec<PatternRule>,
    pub failure_message: &'static str,
}

/// Result of evaluating a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub message: Option<String>,
}

impl PatternCheck {
    fn new(
        name: &'static str,
        suite: Suite,
        description: &'static str,
        source: SourceKind,
        patterns: &[&str],
        expectation: Expectation,
        failure_message: &'static str,
    ) -> E2eResult<Self> {
        let rules = patterns
            .iter()
            .map(|p| {
                Ok(PatternRule {
                    regex: compile(p)?,
                    expectation,
                })
            })
            .collect::<E2eResult<Vec<_>>>()?;

        Ok(Self {
            name,
            suite,
            description,
            source,
            rules,
            failure_message,
        })
    }

    /// Add a rule with its own expectation
    fn and(mut self, pattern: &str, expectation: Expectation) -> E2eResult<Self> {
        self.rules.push(PatternRule {
            regex: compile(pattern)?,
            expectation,
        });
        Ok(self)
    }

    /// Apply the check to the loaded sources
    pub fn evaluate(&self, sources: &SourceFiles) -> CheckOutcome {
        let text = sources.get(self.source);

        let detail = self.rules.iter().find_map(|rule| rule.violation(text));

        debug!(check = self.name, passed = detail.is_none(), "evaluated static check");

        match detail {
            None => CheckOutcome {
                passed: true,
                message: None,
            },
            Some(detail) => CheckOutcome {
                passed: false,
                message: Some(format!("{} ({})", self.failure_message, detail)),
            },
        }
    }
}

impl PatternRule {
    fn violation(&self, text: &str) -> Option<String> {
        let re = &self.regex;
        match self.expectation {
            Expectation::Present => {
                (!re.is_match(text)).then(|| format!("pattern not found: {}", re.as_str()))
            }
            Expectation::Absent => re
                .find(text)
                .map(|m| format!("forbidden pattern found on line {}", line_of(text, m.start()))),
            Expectation::ExactlyOnce => {
                let count = re.find_iter(text).count();
                (count != 1).then(|| format!("expected exactly one match, found {}", count))
            }
        }
    }
}

fn compile(pattern: &str) -> E2eResult<Regex> {
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()?)
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// Opening or closing quote, either style
const Q: &str = r#"(?:"|')"#;

/// All static checks, in reporting order
pub fn catalog() -> E2eResult<Vec<PatternCheck>> {
    use Expectation::*;
    use SourceKind::*;

    Ok(vec![
        PatternCheck::new(
            "public_key_not_hardcoded_in_order_html",
            Suite::Static,
            "Publishable test key is not hardcoded in order.html",
            OrderPage,
            &[format!(r"Stripe\({Q}pk_test_\w+{Q}\);").as_str()],
            Absent,
            "You shouldn't hardcode the Stripe key in order.html.",
        )?,
        PatternCheck::new(
            "public_key_not_hardcoded_in_backend",
            Suite::Static,
            "Publishable test key is not assigned as the API key in the backend",
            Backend,
            &[format!(r"stripe\.api_key = {Q}pk_test_\w+{Q}").as_str()],
            Absent,
            "You shouldn't hardcode the Stripe key in app.py.",
        )?,
        PatternCheck::new(
            "secret_key_not_hardcoded_in_backend",
            Suite::Static,
            "Secret test key does not appear as a string literal in the backend",
            Backend,
            &[format!(r"{Q}sk_test_\w+{Q}").as_str()],
            Absent,
            "You shouldn't hardcode the Stripe secret key in app.py.",
        )?,
        PatternCheck::new(
            "provider_script_included",
            Suite::Static,
            "The hosted Stripe.js script is included exactly once",
            OrderPage,
            &[format!(r"<script src={Q}https://js\.stripe\.com/v3/?{Q}></script>").as_str()],
            Present,
            "You didn't insert a Stripe script file.",
        )?
        .and(
            format!(r"\bsrc\s*=\s*{Q}?(?:https?:)?//js\.stripe\.com/v3/?").as_str(),
            ExactlyOnce,
        )?,
        PatternCheck::new(
            "checkout_button_wired",
            Suite::Static,
            "The checkout button element is looked up by id",
            OrderPage,
            &[format!(r"document\.getElementById\({Q}checkout-button{Q}\);").as_str()],
            Present,
            "You didn't add a checkout button.",
        )?,
        PatternCheck::new(
            "product_threaded_into_checkout",
            Suite::Static,
            "The product name is defined and sent in the checkout request body",
            OrderPage,
            &[
                format!(r"product = {Q}Chocolate Cupcake \w{{5}}{Q}").as_str(),
                r"name: product",
            ],
            Present,
            "You didn't add the product in the checkout.",
        )?,
        PatternCheck::new(
            "amount_threaded_into_checkout",
            Suite::Static,
            "The amount is defined and sent in the checkout request body",
            OrderPage,
            &[
                r"amount = -?(?:0|[1-9]\d{0,2}(?:,?\d{3})*)(?:\.\d{1,2})?",
                r"amount: amount",
            ],
            Present,
            "You didn't add the amount code in the checkout.",
        )?,
        PatternCheck::new(
            "redirect_to_checkout_called",
            Suite::Static,
            "The page redirects to the hosted checkout",
            OrderPage,
            &[r"\.redirectToCheckout"],
            Present,
            "No checkout redirection was found.",
        )?,
        PatternCheck::new(
            "success_url_defined",
            Suite::Static,
            "success_url points at /order_success with the session id placeholder",
            Backend,
            &[format!(
                r"success_url=domain_url \+ {Q}/order_success\?session_id=\{{CHECKOUT_SESSION_ID\}}{Q}"
            )
            .as_str()],
            Present,
            "You didn't define a success URL.",
        )?,
        PatternCheck::new(
            "cancel_url_defined",
            Suite::Static,
            "cancel_url points back at the index route",
            Backend,
            &[format!(r"cancel_url=domain_url \+ {Q}/{Q}").as_str()],
            Present,
            "You didn't define a cancel URL.",
        )?,
        PatternCheck::new(
            "uses_assigned_product",
            Suite::Ast,
            "The assigned product name is used",
            OrderPage,
            &[format!(r"product = {Q}Chocolate Cupcake oT3NE{Q}").as_str()],
            Present,
            "The product is not the assigned Chocolate Cupcake oT3NE.",
        )?,
        PatternCheck::new(
            "uses_assigned_amount",
            Suite::Ast,
            "The assigned amount is used",
            OrderPage,
            &[r"amount = 9\.42"],
            Present,
            "The amount is not the assigned 9.42.",
        )?,
    ])
}

/// Find the checkout button id in the order page markup.
///
/// The `checkout-button` lookup wins when present. Otherwise the first
/// element whose id mentions `checkout` and that gets a click listener,
/// either chained onto the lookup or through the variable it is bound to.
pub fn discover_button_id(order_html: &str) -> E2eResult<String> {
    let wired = compile(&format!(
        r"document\.getElementById\({Q}(checkout-button){Q}\);"
    ))?;
    if let Some(m) = wired.captures(order_html).and_then(|caps| caps.get(1)) {
        return Ok(m.as_str().to_string());
    }

    let lookup = compile(&format!(
        r"(?:\b(?P<var>[A-Za-z_$][\w$]*)\s*=\s*)?(?:document\.)?getElementById\(\s*{Q}(?P<id>[\w-]*checkout[\w-]*){Q}\s*\)(?P<chained>\s*\.addEventListener\(\s*{Q}click{Q})?"
    ))?;
    for caps in lookup.captures_iter(order_html) {
        let Some(id) = caps.name("id") else { continue };
        if caps.name("chained").is_some() {
            return Ok(id.as_str().to_string());
        }
        if let Some(var) = caps.name("var") {
            let listener = compile(&format!(
                r"\b{}\.addEventListener\(\s*{Q}click{Q}",
                regex::escape(var.as_str())
            ))?;
            if listener.is_match(order_html) {
                return Ok(id.as_str().to_string());
            }
        }
    }

    Err(E2eError::ButtonNotFound)
}
