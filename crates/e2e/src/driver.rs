//! Browser driver process - spawning and health checking chromedriver

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use cartcheck_common::BrowserConfig;

use crate::error::{E2eError, E2eResult};

/// How long the driver gets to exit after SIGTERM
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Handle to a running chromedriver process
pub struct DriverProcess {
    child: Option<Child>,
    url: String,
    pub port: u16,
}

impl DriverProcess {
    /// Spawn chromedriver and wait until it reports ready
    pub async fn spawn(config: &BrowserConfig) -> E2eResult<Self> {
        let port = match config.driver_port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let url = format!("http://127.0.0.1:{}", port);

        info!("Spawning {} on port {}", config.chromedriver_path.display(), port);

        let child = Command::new(&config.chromedriver_path)
            .arg(format!("--port={}", port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                E2eError::DriverStartup(format!(
                    "Failed to spawn {}: {}",
                    config.chromedriver_path.display(),
                    e
                ))
            })?;

        let mut handle = DriverProcess {
            child: Some(child),
            url,
            port,
        };

        // Dropping the handle on failure reaps the process
        handle.wait_for_ready(config.startup_timeout()).await?;

        info!("Browser driver is ready at {}", handle.url);
        Ok(handle)
    }

    /// Poll the WebDriver status endpoint until the driver accepts sessions
    async fn wait_for_ready(&mut self, timeout_duration: Duration) -> E2eResult<()> {
        let status_url = format!("{}/status", self.url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            if let Some(child) = self.child.as_mut() {
                if let Some(status) = child.try_wait()? {
                    return Err(E2eError::DriverStartup(format!(
                        "driver exited during startup with {}",
                        status
                    )));
                }
            }

            match client.get(&status_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let body: serde_json::Value = resp.json().await.unwrap_or_default();
                    // Older drivers omit the ready flag
                    let ready = body
                        .pointer("/value/ready")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(true);
                    if ready {
                        return Ok(());
                    }
                    debug!("Driver answered but is not ready yet");
                }
                Ok(resp) => {
                    warn!("Driver status returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for browser driver to start...");
                    }
                    // Connection refused is expected while the driver boots
                    if !e.is_connect() {
                        warn!("Driver status error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::DriverHealthCheck(attempts))
    }

    /// WebDriver endpoint of this process
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ask the driver to exit, waiting on the runtime timer, then force it
    pub async fn shutdown(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };

        debug!("Stopping browser driver (pid: {})", child.id());

        if terminate(child) {
            let start = std::time::Instant::now();
            while start.elapsed() < SHUTDOWN_GRACE {
                match child.try_wait() {
                    Ok(Some(_)) | Err(_) => break,
                    Ok(None) => sleep(SHUTDOWN_POLL).await,
                }
            }
        }

        self.stop();
    }

    /// Kill and reap the driver process without waiting; safe to call more than once
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Err(e) = child.kill() {
            // Already exited after SIGTERM
            debug!("Driver kill: {}", e);
        }
        if let Err(e) = child.wait() {
            warn!("Failed to reap browser driver: {}", e);
        }
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn terminate(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).is_ok()
}

#[cfg(not(unix))]
fn terminate(_child: &Child) -> bool {
    false
}

/// Find a free local port for the driver
fn find_free_port() -> E2eResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
