//! Test harness: stage a project, serve it, tear it down.
//!
//! ```no_run
//! # async fn demo() -> stagehand_server::Result<()> {
//! use stagehand_server::{Context, ToolkitOptions};
//!
//! let ctx = Context::start(ToolkitOptions {
//!     files: [("config/auth.yml", "auth:\n  filterPassword: truthy\n")]
//!         .into_iter()
//!         .collect(),
//!     ..Default::default()
//! })
//! .await?;
//!
//! let response = ctx.get("/health").send().await?;
//! assert!(response.status.is_success());
//!
//! ctx.stop(false).await?;
//! # Ok(())
//! # }
//! ```

use crate::client::{Client, RequestBuilder};
use crate::error::Result;
use crate::instance::{Instance, InstanceOptions, RunningServer};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stagehand_core::{FileSeedSet, StageOptions};
use stagehand_fs::{StagedProject, Stager, StagerConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Listener arguments for the started instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerArgs {
    /// Address to bind.
    #[serde(default = "default_ip")]
    pub ip: IpAddr,

    /// Port to bind, 0 for any free port.
    #[serde(default)]
    pub port: u16,
}

const fn default_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            port: 0,
        }
    }
}

/// How to set up the project a test runs against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolkitOptions {
    /// Existing project copied into a temporary workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_project_folder: Option<PathBuf>,

    /// Plugin under test, loaded into the instance in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins_folder: Option<PathBuf>,

    /// Options forwarded to the instance.
    #[serde(default)]
    pub options: InstanceOptions,

    /// Listener arguments.
    #[serde(default)]
    pub args: ServerArgs,

    /// Files written into the temporary workspace.
    #[serde(default, skip_serializing_if = "FileSeedSet::is_empty")]
    pub files: FileSeedSet,

    /// Stage a temporary workspace even without files or a project to copy.
    #[serde(default)]
    pub use_tmp_path: bool,
}

/// A running instance on a staged project.
#[derive(Debug)]
pub struct Context {
    server: RunningServer,
    project: StagedProject,
    options: InstanceOptions,
    args: ServerArgs,
    client: Client,
}

impl Context {
    /// Start an instance using the scratch root from the environment.
    ///
    /// # Errors
    /// See [`Context::start_with`].
    pub async fn start(toolkit: ToolkitOptions) -> Result<Self> {
        Self::start_with(toolkit, StagerConfig::from_env()).await
    }

    /// Stage the project below the configured scratch root and start an
    /// instance serving it.
    ///
    /// # Errors
    /// Returns the stager's configuration error if there is no project to
    /// serve, or any staging, loading or binding failure. A workspace staged
    /// before the failure is removed again.
    pub async fn start_with(toolkit: ToolkitOptions, config: StagerConfig) -> Result<Self> {
        let ToolkitOptions {
            test_project_folder,
            plugins_folder,
            mut options,
            args,
            files,
            use_tmp_path,
        } = toolkit;

        let stage_options = StageOptions {
            test_project_folder,
            files,
            use_tmp_path,
            project_folder: options.project_folder.clone(),
        };
        let stager = Stager::new(config);
        let project = tokio::task::spawn_blocking(move || stager.stage(&stage_options)).await??;

        options.project_folder = Some(project.root().to_path_buf());
        if let Some(plugins) = plugins_folder {
            options.extensions_folder = Some(plugins.clone());
            options.explicit_extensions = vec![plugins];
        }

        match launch(options.clone(), args).await {
            Ok((server, client)) => {
                info!(
                    project = %project.root().display(),
                    address = %server.addr(),
                    "Started test instance"
                );
                Ok(Self {
                    server,
                    project,
                    options,
                    args,
                    client,
                })
            }
            Err(e) => {
                let root = project.root().to_path_buf();
                match tokio::task::spawn_blocking(move || project.teardown(false)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(cleanup)) => {
                        warn!(path = %root.display(), error = %cleanup, "Failed to remove workspace");
                    }
                    Err(join) => {
                        warn!(path = %root.display(), error = %join, "Failed to remove workspace");
                    }
                }
                Err(e)
            }
        }
    }

    /// The served instance.
    #[must_use]
    pub fn instance(&self) -> &Arc<Instance> {
        self.server.instance()
    }

    /// Merged configuration of the served instance.
    #[must_use]
    pub fn config(&self) -> &Value {
        self.instance().config()
    }

    /// Effective project root.
    #[must_use]
    pub fn project_folder(&self) -> &Path {
        self.project.root()
    }

    /// Temporary workspace, if one was staged.
    #[must_use]
    pub fn temporary_folder(&self) -> Option<&Path> {
        self.project.temporary_folder()
    }

    /// Options the instance was started with.
    #[must_use]
    pub const fn options(&self) -> &InstanceOptions {
        &self.options
    }

    /// Listener arguments.
    #[must_use]
    pub const fn args(&self) -> &ServerArgs {
        &self.args
    }

    /// Address the instance listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.server.addr()
    }

    /// Client bound to the instance.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Start a request with any method.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Start a GET request.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Start a POST request.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Start a PUT request.
    pub fn put(&self, url: &str) -> RequestBuilder {
        self.client.put(url)
    }

    /// Start a PATCH request.
    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.client.patch(url)
    }

    /// Start a DELETE request.
    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.client.delete(url)
    }

    /// Start a HEAD request.
    pub fn head(&self, url: &str) -> RequestBuilder {
        self.client.head(url)
    }

    /// Start an OPTIONS request.
    pub fn options_request(&self, url: &str) -> RequestBuilder {
        self.client.options(url)
    }

    /// Start a TRACE request.
    pub fn trace(&self, url: &str) -> RequestBuilder {
        self.client.trace(url)
    }

    /// Stop the instance and remove the temporary workspace.
    ///
    /// With `keep_files` set the workspace stays on disk.
    ///
    /// # Errors
    /// Returns the first failure of stopping the server or removing the
    /// workspace. The workspace is torn down even if stopping failed.
    pub async fn stop(self, keep_files: bool) -> Result<()> {
        let Self {
            server, project, ..
        } = self;

        let stopped = server.stop().await;
        tokio::task::spawn_blocking(move || project.teardown(keep_files)).await??;
        stopped
    }
}

async fn launch(options: InstanceOptions, args: ServerArgs) -> Result<(RunningServer, Client)> {
    let instance = tokio::task::spawn_blocking(move || Instance::load(options)).await??;
    let server = instance.serve(SocketAddr::new(args.ip, args.port)).await?;

    let host = if server.addr().ip().is_unspecified() {
        SocketAddr::new(default_ip(), server.addr().port())
    } else {
        server.addr()
    };
    let client = Client::new(&format!("http://{host}"))?;

    Ok((server, client))
}
