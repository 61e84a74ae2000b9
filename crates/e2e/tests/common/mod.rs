//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use cartcheck_common::{HarnessConfig, SourcesConfig};
use cartcheck_e2e::browser::{Locator, PageDriver};
use cartcheck_e2e::checkout::{CheckoutFlow, CheckoutOutcome};
use cartcheck_e2e::runner::FlowExecutor;
use cartcheck_e2e::{E2eError, E2eResult};

pub fn fixture_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn fixture_sources(name: &str) -> SourcesConfig {
    let dir = fixture_dir(name);
    SourcesConfig {
        order_html: dir.join("client/order.html"),
        backend: dir.join("app.py"),
    }
}

/// Config for the named fixture project with a temporary output dir
pub fn fixture_config(name: &str, output_dir: &std::path::Path) -> HarnessConfig {
    let mut config = HarnessConfig::with_defaults();
    config.sources = fixture_sources(name);
    config.output_dir = output_dir.to_path_buf();
    config
}

/// Page interaction recorded by [`ScriptedPage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Goto(String),
    WaitFor(String),
    Text(String),
    Click(String),
    SendKeys(String, String),
    CurrentUrl,
}

/// In-memory page that answers from fixed values and records every call
pub struct ScriptedPage {
    pub price: String,
    pub session_id: String,
    pub final_url: String,
    /// Locator that never appears, if any
    pub missing: Option<String>,
    pub actions: Mutex<Vec<Action>>,
}

impl ScriptedPage {
    pub fn new(price: &str, final_url: &str) -> Self {
        Self {
            price: price.to_string(),
            session_id: "cs_test_a1b2c3".to_string(),
            final_url: final_url.to_string(),
            missing: None,
            actions: Mutex::new(Vec::new()),
        }
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.record(Action::Goto(url.to_string()));
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator) -> E2eResult<()> {
        self.record(Action::WaitFor(locator.to_string()));
        if self.missing.as_deref() == Some(locator.to_string().as_str()) {
            return Err(E2eError::Timeout {
                what: locator.to_string(),
                seconds: 20,
            });
        }
        Ok(())
    }

    async fn text(&self, locator: &Locator) -> E2eResult<String> {
        self.record(Action::Text(locator.to_string()));
        match locator {
            Locator::Id(id) if id == "productAmount" => Ok(self.price.clone()),
            Locator::Id(id) if id == "sessionId" => Ok(self.session_id.clone()),
            other => Err(E2eError::ElementMissing(other.to_string())),
        }
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.record(Action::Click(locator.to_string()));
        Ok(())
    }

    async fn send_keys(&self, locator: &Locator, keys: &str) -> E2eResult<()> {
        self.record(Action::SendKeys(locator.to_string(), keys.to_string()));
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        self.record(Action::CurrentUrl);
        Ok(self.final_url.clone())
    }
}

/// Flow executor that runs every flow against a fresh [`ScriptedPage`]
pub struct ScriptedExecutor {
    pub price: String,
    pub final_url: String,
    pub seen_buttons: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(price: &str, final_url: &str) -> Self {
        Self {
            price: price.to_string(),
            final_url: final_url.to_string(),
            seen_buttons: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FlowExecutor for ScriptedExecutor {
    async fn execute(&self, flow: &CheckoutFlow) -> E2eResult<CheckoutOutcome> {
        self.seen_buttons
            .lock()
            .unwrap()
            .push(flow.button_id().to_string());
        let page = ScriptedPage::new(&self.price, &self.final_url);
        flow.run(&page).await
    }
}

/// What the mock app and provider report
#[derive(Debug, Clone)]
pub struct MockState {
    pub intent: serde_json::Value,
    pub pending_webhooks: u64,
    pub secret: String,
}

impl MockState {
    pub fn succeeded(amount: i64) -> Self {
        Self {
            intent: serde_json::json!({
                "id": "pi_3Ntest",
                "object": "payment_intent",
                "status": "succeeded",
                "amount_received": amount,
                "currency": "usd"
            }),
            pending_webhooks: 0,
            secret: "sk_test_mock".to_string(),
        }
    }
}

/// Serve `/payment_intent` and `/v1/events/:id` on a local port
pub async fn spawn_mock(state: MockState) -> String {
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};

    async fn payment_intent(State(state): State<MockState>) -> Json<serde_json::Value> {
        Json(state.intent)
    }

    async fn event(
        State(state): State<MockState>,
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let expected = format!("Bearer {}", state.secret);
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == expected)
            .unwrap_or(false);
        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": {"type": "invalid_request_error"}})),
            );
        }
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": id,
                "object": "event",
                "pending_webhooks": state.pending_webhooks
            })),
        )
    }

    let app = Router::new()
        .route("/payment_intent", get(payment_intent))
        .route("/v1/events/:id", get(event))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Config whose app and provider both point at a mock server
pub fn mock_config(fixture: &str, output_dir: &std::path::Path, mock_url: &str, secret: &str) -> HarnessConfig {
    let mut config = fixture_config(fixture, output_dir);
    config.app.base_url = Some(format!("{}/", mock_url));
    config.provider.api_base = mock_url.to_string();
    config.provider.secret_key = Some(secret.to_string());
    config
}
