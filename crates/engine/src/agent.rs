// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent lifecycle manager

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::Instrument;
use wda_adapters::{
    plist, DeviceAdapter, HttpMethod, NoSessionProxy, ProcessAdapter, ProxyTransport,
    SessionProxy, XcTestRunner,
};
use wda_core::constants::{
    STATUS_PATH, STATUS_TIMEOUT, WDA_CF_BUNDLE_NAME, WDA_RUNNER_APP, WDA_RUNNER_BUNDLE_ID,
    WDA_RUNNER_XCTEST,
};
use wda_core::{AgentArgs, AgentEndpoint, AgentStatus, BuildConfig};

use crate::error::AgentError;
use crate::guard::{bootstrap_locks, normalize_path};
use crate::processes::{pids_listening_on_port, reset_test_processes};
use crate::timestamp::{cleanup_project_if_fresh, ManifestTimestamp, UpgradeTimestampSource};
use crate::xcodebuild::XcodeBuild;

/// External collaborators of a [`WebDriverAgent`]
#[derive(Clone)]
pub struct AgentDeps<D, P, T> {
    pub device: D,
    pub process: P,
    pub transport: T,
}

/// Installed agent bundle ready for an on-device test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedWda {
    pub bundle_path: PathBuf,
    pub bundle_id: String,
    pub test_bundle_id: String,
}

/// Builds, launches, reuses and tears down the agent on one device.
///
/// Without an explicit agent URL the endpoint is derived from the base URL
/// and local port on first use and cached until [`WebDriverAgent::set_url`]
/// or [`WebDriverAgent::invalidate_url`].
pub struct WebDriverAgent<D, P, T> {
    args: AgentArgs,
    device: D,
    process: P,
    transport: T,
    xcodebuild: XcodeBuild<P, T>,
    xctest: Option<Arc<dyn XcTestRunner>>,
    timestamps: Arc<dyn UpgradeTimestampSource>,
    home: Option<PathBuf>,
    endpoint: Mutex<Option<AgentEndpoint>>,
    web_driver_agent_url: Mutex<Option<String>>,
    no_session_proxy: Mutex<Option<NoSessionProxy<T>>>,
    session_proxy: Mutex<Option<SessionProxy<T>>>,
    started: AtomicBool,
}

impl<D, P, T> WebDriverAgent<D, P, T>
where
    D: DeviceAdapter,
    P: ProcessAdapter,
    T: ProxyTransport,
{
    pub fn new(args: AgentArgs, deps: AgentDeps<D, P, T>) -> Self {
        let AgentDeps { device, process, transport } = deps;
        let config = BuildConfig::from_args(&args, device.udid());
        tracing::info!(path = %config.bootstrap_path.display(), "using WDA path");
        tracing::info!(path = %config.agent_path.display(), "using WDA agent");

        let timestamps: Arc<dyn UpgradeTimestampSource> = Arc::new(ManifestTimestamp);
        let xcodebuild = XcodeBuild::new(config, process.clone(), Arc::clone(&timestamps));
        let web_driver_agent_url = args.web_driver_agent_url.clone().filter(|url| !url.is_empty());
        Self {
            args,
            device,
            process,
            transport,
            xcodebuild,
            xctest: None,
            timestamps,
            home: wda_core::env::home_dir(),
            endpoint: Mutex::new(None),
            web_driver_agent_url: Mutex::new(web_driver_agent_url),
            no_session_proxy: Mutex::new(None),
            session_proxy: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Launch through an on-device test runner instead of `xcodebuild`
    pub fn with_xctest(mut self, runner: Arc<dyn XcTestRunner>) -> Self {
        self.xctest = Some(runner);
        self
    }

    pub fn with_timestamp_source(mut self, source: Arc<dyn UpgradeTimestampSource>) -> Self {
        let config = self.xcodebuild.config().clone();
        self.xcodebuild = XcodeBuild::new(config, self.process.clone(), Arc::clone(&source));
        self.timestamps = source;
        self
    }

    /// Home directory holding the persisted upgrade timestamp
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn args(&self) -> &AgentArgs {
        &self.args
    }

    pub fn xcodebuild(&self) -> &XcodeBuild<P, T> {
        &self.xcodebuild
    }

    fn config(&self) -> &BuildConfig {
        self.xcodebuild.config()
    }

    /// Current endpoint, materialized on first read
    pub fn url(&self) -> Result<AgentEndpoint, AgentError> {
        let mut endpoint = self.endpoint.lock();
        if let Some(endpoint) = endpoint.as_ref() {
            return Ok(endpoint.clone());
        }
        let resolved = match self.web_driver_agent_url.lock().as_deref() {
            Some(url) => AgentEndpoint::parse(url)?,
            None => {
                AgentEndpoint::derive(self.args.wda_base_url.as_deref(), self.args.wda_local_port)?
            }
        };
        *endpoint = Some(resolved.clone());
        Ok(resolved)
    }

    pub fn set_url(&self, url: &str) -> Result<(), AgentError> {
        let parsed = AgentEndpoint::parse(url)?;
        *self.endpoint.lock() = Some(parsed);
        Ok(())
    }

    /// Forget the cached endpoint so the next read derives it again
    pub fn invalidate_url(&self) {
        self.endpoint.lock().take();
    }

    /// URL of a running agent that `launch` will reuse instead of building
    pub fn web_driver_agent_url(&self) -> Option<String> {
        self.web_driver_agent_url.lock().clone()
    }

    pub fn fully_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn set_fully_started(&self, started: bool) {
        self.started.store(started, Ordering::SeqCst);
    }

    pub fn no_session_proxy(&self) -> Option<NoSessionProxy<T>> {
        self.no_session_proxy.lock().clone()
    }

    pub fn session_proxy(&self) -> Option<SessionProxy<T>> {
        self.session_proxy.lock().clone()
    }

    /// Bind both command proxies to the current endpoint
    pub fn setup_proxies(&self, session_id: Option<&str>) -> Result<(), AgentError> {
        self.bind_proxies(session_id).map(|_| ())
    }

    fn bind_proxies(&self, session_id: Option<&str>) -> Result<NoSessionProxy<T>, AgentError> {
        let endpoint = self.url()?;
        let timeout = self.args.connection_timeout();
        let session =
            SessionProxy::new(NoSessionProxy::new(self.transport.clone(), &endpoint, timeout));
        session.set_session_id(session_id.map(str::to_string));
        let no_session = NoSessionProxy::new(self.transport.clone(), &endpoint, timeout);
        *self.session_proxy.lock() = Some(session);
        *self.no_session_proxy.lock() = Some(no_session.clone());
        Ok(no_session)
    }

    /// Get the agent running and return its status.
    ///
    /// With a known agent URL nothing is built; the status of that agent is
    /// returned as is.
    pub async fn launch(
        &self,
        session_id: Option<&str>,
    ) -> Result<Option<AgentStatus>, AgentError> {
        let span = tracing::info_span!("wda.launch", udid = %self.device.udid());
        async {
            let started = Instant::now();
            let result = self.launch_inner(session_id).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "launch finished"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "launch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn launch_inner(
        &self,
        session_id: Option<&str>,
    ) -> Result<Option<AgentStatus>, AgentError> {
        if let Some(url) = self.web_driver_agent_url() {
            tracing::info!(url = %url, "using provided WebDriverAgent");
            self.set_url(&url)?;
            self.bind_proxies(session_id)?;
            return Ok(self.get_status().await);
        }

        tracing::info!("launching WebDriverAgent on the device");
        let proxy = self.bind_proxies(session_id)?;

        let config = self.config();
        if !config.use_xctestrun_file
            && !tokio::fs::try_exists(&config.agent_path).await.unwrap_or(false)
        {
            return Err(AgentError::MissingProject(config.agent_path.clone()));
        }

        if self.xctest.is_some()
            || config.use_xctestrun_file
            || (config.derived_data_path.is_some() && config.use_prebuilt_wda)
        {
            tracing::info!("skipped WDA project cleanup according to the provided capabilities");
        } else {
            let key = normalize_path(&config.bootstrap_path).display().to_string();
            let outcome = bootstrap_locks()
                .run(
                    &key,
                    cleanup_project_if_fresh(
                        self.home.as_deref(),
                        &config.bootstrap_path,
                        self.timestamps.as_ref(),
                        || self.xcodebuild.clean_project(),
                    ),
                )
                .await;
            tracing::debug!(?outcome, "project cleanup");
        }

        reset_test_processes(&self.process, self.device.udid(), !config.real_device).await;
        self.cleanup_obsolete_processes().await;

        if let Some(runner) = &self.xctest {
            return self.start_with_xctest(runner.as_ref()).await;
        }

        self.xcodebuild.init(proxy).await?;
        if self.args.prebuild_wda {
            self.xcodebuild.prebuild().await?;
        }
        self.xcodebuild.start(false).await
    }

    /// Kill runner processes of other devices still listening on our port
    pub async fn cleanup_obsolete_processes(&self) {
        let port = match self.url() {
            Ok(endpoint) => endpoint.port(),
            Err(e) => {
                tracing::warn!(error = %e, "cannot resolve agent port, skipping process cleanup");
                return;
            }
        };
        let udid = self.device.udid().to_lowercase();
        let pids = pids_listening_on_port(&self.process, port, |command_line| {
            command_line.contains("/WebDriverAgentRunner")
                && !command_line.to_lowercase().contains(&udid)
        })
        .await;

        if pids.is_empty() {
            tracing::debug!(port, "no obsolete cached processes from previous WDA sessions");
            return;
        }
        tracing::info!(
            count = pids.len(),
            "cleaning up obsolete processes from previous WDA sessions"
        );
        if let Err(e) = self.process.exec("kill", &pids, None).await {
            tracing::warn!(?pids, error = %e, "failed to kill obsolete cached processes");
        }
    }

    /// Status of the agent at the current endpoint, `None` when unreachable
    pub async fn get_status(&self) -> Option<AgentStatus> {
        let endpoint = match self.url() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::debug!(error = %e, "no usable WDA endpoint");
                return None;
            }
        };
        let proxy = NoSessionProxy::new(self.transport.clone(), &endpoint, Some(STATUS_TIMEOUT));
        match proxy.command(STATUS_PATH, HttpMethod::Get, None).await {
            Ok(value) => AgentStatus::from_value(value),
            Err(e) => {
                tracing::debug!(url = %endpoint.href(), error = %e, "WDA is not listening");
                None
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.get_status().await.is_some()
    }

    /// Remove every installed agent build from the device
    pub async fn uninstall(&self) {
        let bundle_ids =
            match self.device.user_installed_bundle_ids_by_bundle_name(WDA_CF_BUNDLE_NAME).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot list installed WDAs");
                    return;
                }
            };
        if bundle_ids.is_empty() {
            tracing::debug!("no WDAs on the device");
            return;
        }

        tracing::debug!(?bundle_ids, "uninstalling WDAs");
        for bundle_id in &bundle_ids {
            if let Err(e) = self.device.remove_app(bundle_id).await {
                tracing::warn!(
                    bundle_id,
                    error = %e,
                    "WebDriverAgent uninstall failed, perhaps it is already uninstalled"
                );
            }
        }
    }

    /// Decide whether an agent already running at the endpoint can be reused.
    ///
    /// A mismatching bundle id or upgrade timestamp uninstalls it; otherwise
    /// its URL is remembered so the next [`launch`](Self::launch) adopts it.
    pub async fn setup_caching(&self) {
        let Some(build) = self.get_status().await.and_then(|status| status.build) else {
            tracing::debug!("WDA is currently not running, there is nothing to cache");
            return;
        };

        let actual_id = build.product_bundle_identifier.as_deref().filter(|id| !id.is_empty());
        let wanted_id = self.args.updated_wda_bundle_id.as_deref().filter(|id| !id.is_empty());
        match (actual_id, wanted_id) {
            (Some(actual), Some(wanted)) if actual != wanted => {
                tracing::info!(
                    actual,
                    wanted,
                    "will uninstall running WDA since it has a different bundle id"
                );
                self.uninstall().await;
                return;
            }
            (Some(actual), None) if actual != WDA_RUNNER_BUNDLE_ID => {
                tracing::info!(
                    actual,
                    expected = WDA_RUNNER_BUNDLE_ID,
                    "will uninstall running WDA since its bundle id is not the default"
                );
                self.uninstall().await;
                return;
            }
            _ => {}
        }

        let current = self
            .timestamps
            .current(&self.config().bootstrap_path)
            .await
            .filter(|timestamp| !timestamp.is_empty());
        let upgraded_at = build.upgraded_at();
        tracing::debug!(?current, ?upgraded_at, "comparing WDA upgrade timestamps");
        if let (Some(current), Some(upgraded_at)) = (&current, &upgraded_at) {
            if current.to_lowercase() != upgraded_at.to_lowercase() {
                tracing::info!(
                    current = %current,
                    installed = %upgraded_at,
                    "will uninstall running WDA since it is from a different version"
                );
                self.uninstall().await;
                return;
            }
        }

        let endpoint = match self.url() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(error = %e, "cannot resolve WDA endpoint, not caching");
                return;
            }
        };
        tracing::info!(
            url = %endpoint.href(),
            bundle_id = ?actual_id,
            "will reuse previously cached WDA instance, \
             set wdaLocalPort to a different value if this is undesired"
        );
        *self.web_driver_agent_url.lock() = Some(endpoint.href().to_string());
    }

    pub async fn quit(&self) {
        tracing::info!("shutting down sub-processes");
        self.xcodebuild.quit().await;
        self.xcodebuild.reset().await;
        if let Some(proxy) = self.session_proxy.lock().as_ref() {
            proxy.set_session_id(None);
        }
        self.set_fully_started(false);
        if !self.args.has_agent_url() {
            self.web_driver_agent_url.lock().take();
            self.invalidate_url();
        }
    }

    pub async fn quit_and_uninstall(&self) {
        self.quit().await;
        self.uninstall().await;
    }

    pub async fn retrieve_derived_data_path(&self) -> Option<PathBuf> {
        self.xcodebuild.retrieve_derived_data_path().await
    }

    /// `CFBundleIdentifier` of an app bundle
    pub async fn parse_bundle_id(&self, bundle_path: &Path) -> Result<String, AgentError> {
        let info_plist = bundle_path.join("Info.plist");
        plist::extract_value(&self.process, &info_plist, "CFBundleIdentifier")
            .await?
            .ok_or(AgentError::BundleIdNotFound(info_plist))
    }

    /// Locate the agent bundle built under derived data
    pub async fn fetch_wda_bundle(&self) -> Result<PathBuf, AgentError> {
        let Some(derived_data) = self.config().derived_data_path.clone() else {
            return self.xcodebuild.bundle_for_simulator().await;
        };
        let pattern = format!("{}/**/*{WDA_RUNNER_APP}", derived_data.display());
        let found = tokio::task::spawn_blocking(move || {
            glob::glob(&pattern).ok().and_then(|paths| paths.filter_map(Result::ok).next())
        })
        .await
        .ok()
        .flatten();
        found.ok_or(AgentError::BundleNotFound(derived_data))
    }

    /// Make sure the agent app and its test bundle are on the device
    pub async fn prepare_wda(&self, runner: &dyn XcTestRunner) -> Result<PreparedWda, AgentError> {
        let bundle_path = match &self.args.wda_bundle_path {
            Some(path) => path.clone(),
            None => self.fetch_wda_bundle().await?,
        };
        let bundle_id = self.parse_bundle_id(&bundle_path).await?;
        if !self.device.is_app_installed(&bundle_id).await? {
            self.device.install_app(&bundle_path).await?;
        }
        let xctest = bundle_path.join("PlugIns").join(WDA_RUNNER_XCTEST);
        let test_bundle_id = runner.install_xctest_bundle(&xctest).await?;
        Ok(PreparedWda { bundle_path, bundle_id, test_bundle_id })
    }

    /// Run the agent as an XCUITest through the on-device runner
    pub async fn start_with_xctest(
        &self,
        runner: &dyn XcTestRunner,
    ) -> Result<Option<AgentStatus>, AgentError> {
        tracing::info!("launching WDA through the on-device test runner instead of xcodebuild");
        let prepared = self.prepare_wda(runner).await?;

        let config = self.config();
        let mut env = BTreeMap::new();
        env.insert("USE_PORT".to_string(), config.wda_remote_port.to_string());
        env.insert(
            "WDA_PRODUCT_BUNDLE_IDENTIFIER".to_string(),
            config
                .updated_wda_bundle_id
                .clone()
                .unwrap_or_else(|| WDA_RUNNER_BUNDLE_ID.to_string()),
        );
        if let Some(port) = config.mjpeg_server_port {
            env.insert("MJPEG_SERVER_PORT".to_string(), port.to_string());
        }
        runner
            .run_xcui_test(&prepared.bundle_id, &prepared.bundle_id, &prepared.test_bundle_id, &env)
            .await?;
        Ok(self.get_status().await)
    }

    /// Whether the checkout lacks its bundled resources
    pub async fn is_source_fresh(&self) -> bool {
        let bootstrap = &self.config().bootstrap_path;
        let resources = bootstrap.join("Resources");
        let bundle = resources.join("WebDriverAgent.bundle");
        let (resources, bundle) =
            tokio::join!(tokio::fs::try_exists(&resources), tokio::fs::try_exists(&bundle));
        !resources.unwrap_or(false) || !bundle.unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
