// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xcodebuild` driven build and launch of the agent.
//!
//! [`XcodeBuild`] owns at most one live `xcodebuild` process. Its output is
//! scanned while it runs; its exit is interpreted by a monitor task that
//! turns a failed run into [`AgentError::BuildFailed`] carrying the collected
//! toolchain output.

pub mod command;
pub mod derived_data;
pub mod output;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, OnceCell};
use tokio::task::JoinHandle;
use tracing::Instrument;
use wda_adapters::{
    HttpMethod, NoSessionProxy, ProcessAdapter, ProcessExit, ProcessStopper, ProxyTransport,
    SpawnSpec, SpawnedProcess,
};
use wda_core::constants::{STATUS_PATH, WDA_RUNNER_BUNDLE_ID};
use wda_core::{AgentStatus, BuildConfig};

pub use command::{build_command, CommandOptions, XcodeCommand};
pub use output::{classify, LineKind, OutputScanner};

use crate::error::AgentError;
use crate::project;
use crate::timestamp::UpgradeTimestampSource;

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);
const STATUS_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared between the runner and the monitor of one process
struct RunState {
    scanner: OutputScanner,
    exited: bool,
    failure: Option<(Option<i32>, String)>,
}

struct RunningBuild {
    stopper: ProcessStopper,
    monitor: JoinHandle<()>,
}

/// Builds, launches and stops the agent through `xcodebuild`
pub struct XcodeBuild<P, T> {
    config: BuildConfig,
    process: P,
    timestamps: Arc<dyn UpgradeTimestampSource>,
    proxy: Mutex<Option<NoSessionProxy<T>>>,
    derived_data: OnceCell<Option<PathBuf>>,
    use_prebuilt: AtomicBool,
    xcode_config_file: Mutex<Option<PathBuf>>,
    xctestrun_path: Mutex<Option<PathBuf>>,
    agent_url: Mutex<Option<String>>,
    running: Mutex<Option<RunningBuild>>,
}

impl<P, T> XcodeBuild<P, T>
where
    P: ProcessAdapter,
    T: ProxyTransport,
{
    pub fn new(
        config: BuildConfig,
        process: P,
        timestamps: Arc<dyn UpgradeTimestampSource>,
    ) -> Self {
        Self {
            use_prebuilt: AtomicBool::new(config.use_prebuilt_wda),
            xcode_config_file: Mutex::new(config.xcode_config_file.clone()),
            config,
            process,
            timestamps,
            proxy: Mutex::new(None),
            derived_data: OnceCell::new(),
            xctestrun_path: Mutex::new(None),
            agent_url: Mutex::new(None),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Device address reported by the agent's last successful status
    pub fn agent_url(&self) -> Option<String> {
        self.agent_url.lock().clone()
    }

    pub fn xctestrun_path(&self) -> Option<PathBuf> {
        self.xctestrun_path.lock().clone()
    }

    /// Derived data path, either configured or discovered so far
    pub fn derived_data_path(&self) -> Option<PathBuf> {
        self.config
            .derived_data_path
            .clone()
            .or_else(|| self.derived_data.get().cloned().flatten())
    }

    /// Whether a started `xcodebuild` has not exited yet
    pub fn has_live_process(&self) -> bool {
        self.running.lock().as_ref().is_some_and(|running| !running.monitor.is_finished())
    }

    /// Prepare build inputs before the first start.
    ///
    /// With a test-run descriptor only the descriptor is resolved. Otherwise a
    /// real-device project is first reset and then, if requested, pointed at
    /// the custom bundle id.
    pub async fn init(&self, proxy: NoSessionProxy<T>) -> Result<(), AgentError> {
        *self.proxy.lock() = Some(proxy);

        if self.config.use_xctestrun_file {
            let path = project::set_xctestrun_file(&self.process, &self.config).await?;
            *self.xctestrun_path.lock() = Some(path);
            return Ok(());
        }

        if self.config.real_device {
            project::reset_project_file(&self.config.agent_path).await;
            if let Some(bundle_id) = &self.config.updated_wda_bundle_id {
                project::update_project_file(&self.config.agent_path, bundle_id).await;
            }
        }
        Ok(())
    }

    /// Derived data root of the agent project, `None` if it cannot be found.
    ///
    /// The toolchain is asked at most once; concurrent callers share the
    /// same lookup.
    pub async fn retrieve_derived_data_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config.derived_data_path {
            return Some(path.clone());
        }
        self.derived_data.get_or_init(|| self.query_derived_data_path()).await.clone()
    }

    async fn query_derived_data_path(&self) -> Option<PathBuf> {
        let command = command::show_build_settings_command(&self.config.agent_path);
        let stdout = match self.process.exec(&command.program, &command.args, None).await {
            Ok(output) => output.stdout,
            Err(e) => {
                tracing::warn!(error = %e, "cannot retrieve WDA build settings");
                return None;
            }
        };
        let Some(root) = derived_data::parse_derived_data_root(&stdout) else {
            let excerpt: String = stdout.chars().take(300).collect();
            tracing::warn!(output = %excerpt, "cannot parse WDA build dir");
            return None;
        };
        tracing::debug!(path = %root.display(), "got derived data root");
        Some(root)
    }

    /// Undo the bundle id rewrite of a real-device project
    pub async fn reset(&self) {
        if self.config.real_device && self.config.updated_wda_bundle_id.is_some() {
            project::reset_project_file(&self.config.agent_path).await;
        }
    }

    /// Build once up front so the following start only runs the tests.
    pub async fn prebuild(&self) -> Result<(), AgentError> {
        tracing::debug!("pre-building WDA before launching test");
        self.use_prebuilt.store(true, Ordering::SeqCst);
        self.start(true).await?;
        self.running.lock().take();
        tokio::time::sleep(self.config.prebuild_delay).await;
        Ok(())
    }

    /// Clean the library and runner schemes of the platform
    pub async fn clean_project(&self) -> Result<(), AgentError> {
        let platform = self.config.platform;
        for scheme in [platform.lib_scheme(), platform.runner_scheme()] {
            tracing::debug!(
                scheme,
                "cleaning the project scheme to remove leftovers of previous installs"
            );
            let command = command::clean_command(&self.config.agent_path, scheme);
            self.process.exec(&command.program, &command.args, None).await?;
        }
        Ok(())
    }

    /// The invocation `start(build_only)` would run
    pub fn command(&self, build_only: bool) -> XcodeCommand {
        let derived_data = self.derived_data_path();
        let xctestrun = self.xctestrun_path();
        let xcode_config_file = self.xcode_config_file.lock().clone();
        build_command(
            &self.config,
            CommandOptions {
                build_only,
                use_prebuilt: self.use_prebuilt.load(Ordering::SeqCst),
                xctestrun: xctestrun.as_deref(),
                derived_data: derived_data.as_deref(),
                xcode_config_file: xcode_config_file.as_deref(),
                treat_warnings_as_errors: wda_core::env::treat_warnings_as_errors(),
            },
        )
    }

    async fn prepare_signing(&self) -> Result<(), AgentError> {
        if self.config.use_xctestrun_file || !self.config.real_device {
            return Ok(());
        }
        if let (Some(path), Some(password)) =
            (&self.config.keychain_path, &self.config.keychain_password)
        {
            project::set_real_device_security(&self.process, path, password).await?;
        }
        let Some(org_id) = &self.config.xcode_org_id else {
            return Ok(());
        };
        if self.xcode_config_file.lock().is_none() {
            let path =
                project::generate_xcode_config_file(org_id, &self.config.xcode_signing_id).await?;
            *self.xcode_config_file.lock() = Some(path);
        }
        Ok(())
    }

    async fn spawn_spec(&self, build_only: bool) -> SpawnSpec {
        let command = self.command(build_only);
        tracing::debug!(
            command = %command.display(),
            cwd = %self.config.bootstrap_path.display(),
            "beginning {}",
            if build_only { "build" } else { "test" }
        );

        let mut env = vec![
            ("USE_PORT".to_string(), self.config.wda_remote_port.to_string()),
            (
                "WDA_PRODUCT_BUNDLE_IDENTIFIER".to_string(),
                self.config
                    .updated_wda_bundle_id
                    .clone()
                    .unwrap_or_else(|| WDA_RUNNER_BUNDLE_ID.to_string()),
            ),
        ];
        if let Some(port) = self.config.mjpeg_server_port {
            env.push(("MJPEG_SERVER_PORT".to_string(), port.to_string()));
        }
        if let Some(timestamp) = self.timestamps.current(&self.config.bootstrap_path).await {
            env.push(("UPGRADE_TIMESTAMP".to_string(), timestamp));
        }

        SpawnSpec {
            program: command.program,
            args: command.args,
            cwd: Some(self.config.bootstrap_path.clone()),
            env,
        }
    }

    /// Run `xcodebuild`.
    ///
    /// With `build_only` this resolves when the build exits. Otherwise it
    /// resolves once the agent answers `/status`, or with the last known
    /// status once the launch timeout runs out.
    pub async fn start(&self, build_only: bool) -> Result<Option<AgentStatus>, AgentError> {
        let span = tracing::info_span!("xcodebuild.start", udid = %self.config.udid, build_only);
        self.start_inner(build_only).instrument(span).await
    }

    async fn start_inner(&self, build_only: bool) -> Result<Option<AgentStatus>, AgentError> {
        self.prepare_signing().await?;
        let spec = self.spawn_spec(build_only).await;
        let started = Instant::now();

        let spawned = match self.process.spawn(spec).await {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::error!(error = %e, "unable to start WebDriverAgent");
                return Err(AgentError::LaunchFailed(e.to_string()));
            }
        };
        match self.config.show_xcode_log {
            Some(true) => tracing::debug!("output from xcodebuild will be logged"),
            Some(false) => tracing::debug!("output from xcodebuild will not be logged"),
            None => tracing::debug!("output from xcodebuild will only be logged if errors show up"),
        }

        let SpawnedProcess { output, exit, stopper, .. } = spawned;
        let state = Arc::new(Mutex::new(RunState {
            scanner: OutputScanner::new(self.config.show_xcode_log),
            exited: false,
            failure: None,
        }));
        let (done_tx, mut done_rx) = oneshot::channel();
        let monitor = tokio::spawn(
            monitor_build(output, exit, Arc::clone(&state), self.config.echo_xcode_log(), done_tx)
                .in_current_span(),
        );
        *self.running.lock() = Some(RunningBuild { stopper, monitor });

        if build_only {
            return match done_rx.await {
                Ok(result) => result.map(|()| None),
                Err(_) => Err(AgentError::LaunchFailed("xcodebuild monitor stopped".to_string())),
            };
        }

        let wait = self.wait_for_start(started, &state);
        tokio::pin!(wait);
        let status = tokio::select! {
            outcome = &mut done_rx => {
                if let Ok(Err(e)) = outcome {
                    return Err(e);
                }
                wait.await
            }
            status = &mut wait => status,
        };

        let failure = state.lock().failure.clone();
        if let Some((code, message)) = failure {
            return Err(AgentError::BuildFailed { code, message });
        }
        Ok(status)
    }

    async fn wait_for_start(
        &self,
        started: Instant,
        state: &Mutex<RunState>,
    ) -> Option<AgentStatus> {
        let timeout = self.config.launch_timeout;
        let timeout_ms = timeout.as_millis() as u64;
        tracing::debug!(timeout_ms, "waiting for WebDriverAgent to start");
        let proxy = self.proxy.lock().clone();
        let Some(proxy) = proxy else {
            tracing::warn!("no status proxy configured, not waiting for WebDriverAgent");
            return None;
        };

        let retries = timeout_ms / 500;
        let mut current = None;
        let mut connected = false;
        for attempt in 1..=retries {
            if state.lock().exited {
                break;
            }
            let result = {
                let _timeout = proxy.override_timeout(STATUS_POLL_TIMEOUT);
                proxy.command(STATUS_PATH, HttpMethod::Get, None).await
            };
            match result {
                Ok(value) => {
                    tracing::debug!(status = %value, "WebDriverAgent information");
                    current = AgentStatus::from_value(value);
                    if let Some(ip) = current.as_ref().and_then(AgentStatus::device_ip) {
                        *self.agent_url.lock() = Some(ip.to_string());
                    }
                    connected = true;
                    break;
                }
                Err(e) => {
                    tracing::debug!(
                        attempt,
                        error = %e,
                        "unable to connect to running WebDriverAgent"
                    );
                    if attempt < retries {
                        tokio::time::sleep(STATUS_POLL_INTERVAL).await;
                    }
                }
            }
        }

        if state.lock().exited {
            return current;
        }
        if connected {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::info!(elapsed_ms, "WebDriverAgent successfully started");
        } else {
            tracing::warn!("getting status of WebDriverAgent on device timed out, continuing");
        }
        current
    }

    /// Stop the running `xcodebuild`, if any
    pub async fn quit(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return;
        };
        running.stopper.stop();
        if let Err(e) = running.monitor.await {
            tracing::warn!(error = %e, "xcodebuild monitor failed");
        }
    }

    /// Path to a simulator build of the runner app, building it if needed
    pub async fn bundle_for_simulator(&self) -> Result<PathBuf, AgentError> {
        let Some(derived_data) = self.retrieve_derived_data_path().await else {
            return Err(AgentError::BundleNotFound(self.config.bootstrap_path.clone()));
        };
        let app = command::simulator_app_path(&derived_data);
        if tokio::fs::try_exists(&app).await.unwrap_or(false) {
            return Ok(app);
        }
        tracing::info!(path = %app.display(), "building WebDriverAgent for simulator");
        self.start(true).await?;
        Ok(app)
    }
}

async fn monitor_build(
    mut output: mpsc::UnboundedReceiver<String>,
    exit: oneshot::Receiver<ProcessExit>,
    state: Arc<Mutex<RunState>>,
    echo_log_file: bool,
    done: oneshot::Sender<Result<(), AgentError>>,
) {
    while let Some(line) = output.recv().await {
        state.lock().scanner.scan(&line);
    }
    let exit = exit.await.unwrap_or_default();
    tracing::error!(
        code = ?exit.code,
        signal = ?exit.signal_name(),
        "xcodebuild exited"
    );

    let log_location = state.lock().scanner.log_location.clone();
    if echo_log_file {
        if let Some(path) = log_location {
            echo_file(&path).await;
        }
    }

    let failure = {
        let mut state = state.lock();
        state.exited = true;
        let failed =
            state.scanner.error_occurred || (exit.signal.is_none() && exit.code != Some(0));
        if failed {
            let code = exit.code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string());
            let message = format!(
                "xcodebuild failed with code {code}\nxcodebuild error message:\n{}",
                state.scanner.error_message
            );
            state.failure = Some((exit.code, message.clone()));
            Some(AgentError::BuildFailed { code: exit.code, message })
        } else {
            None
        }
    };
    let _ = done.send(failure.map_or(Ok(()), Err));
}

async fn echo_file(path: &Path) {
    tracing::error!(target: "xcode", path = %path.display(), "contents of xcodebuild log file");
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            for line in content.split('\n') {
                tracing::error!(target: "xcode", "{line}");
            }
        }
        Err(e) => tracing::error!(error = %e, "unable to access xcodebuild log file"),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
