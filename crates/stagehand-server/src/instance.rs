//! The framework instance serving a project folder.
//!
//! Loading an instance discovers its plugins, merges configuration from
//! every plugin and then the project, and builds the route table. Serving
//! binds a listener and runs the router until [`RunningServer::stop`].

use crate::error::{Result, ServerError};
use crate::routes::RouteTable;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use stagehand_core::{lookup, merge_document, PluginManifest, MANIFEST_FILE};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Directory holding configuration documents.
const CONFIG_DIR: &str = "config";
/// Directory holding installed plugins.
const MODULES_DIR: &str = "node_modules";
/// Directory holding static files.
const PUBLIC_DIR: &str = "public";

/// Options an instance is started with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceOptions {
    /// Project served by the instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_folder: Option<PathBuf>,

    /// Folder whose `node_modules` is searched for plugins. Defaults to the
    /// project folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions_folder: Option<PathBuf>,

    /// Plugin folders loaded regardless of discovery.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub explicit_extensions: Vec<PathBuf>,
}

/// A discovered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plugin {
    /// Plugin name from its manifest or folder.
    pub name: String,
    /// Plugin folder.
    pub folder: PathBuf,
}

impl Plugin {
    /// Open a plugin folder, or `None` if it holds no manifest.
    fn open(folder: &Path) -> Result<Option<Self>> {
        let manifest_path = folder.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Ok(None);
        }

        let content = read(&manifest_path)?;
        let manifest = PluginManifest::from_json(&content)?;
        let name = manifest.name.unwrap_or_else(|| {
            folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Ok(Some(Self {
            name,
            folder: folder.to_path_buf(),
        }))
    }
}

/// A loaded project ready to serve.
#[derive(Debug)]
pub struct Instance {
    options: InstanceOptions,
    project_folder: PathBuf,
    plugins: Vec<Plugin>,
    config: Value,
    routes: RouteTable,
}

impl Instance {
    /// Load plugins, configuration and routes for a project.
    ///
    /// # Errors
    /// Returns error if no project folder is given, an explicit extension
    /// is not a plugin, or a configuration document cannot be read.
    pub fn load(options: InstanceOptions) -> Result<Self> {
        let project_folder = options
            .project_folder
            .clone()
            .ok_or(ServerError::MissingProjectFolder)?;

        let plugins = discover_plugins(&options, &project_folder)?;

        let mut config = Value::Object(Map::new());
        for plugin in &plugins {
            load_config_dir(&plugin.folder, &mut config)?;
        }
        load_config_dir(&project_folder, &mut config)?;

        let routes = RouteTable::from_config(&config)?;

        info!(
            project = %project_folder.display(),
            plugins = plugins.len(),
            routes = routes.len(),
            "Loaded instance"
        );

        Ok(Self {
            options,
            project_folder,
            plugins,
            config,
            routes,
        })
    }

    /// Get the options the instance was loaded with.
    #[must_use]
    pub const fn options(&self) -> &InstanceOptions {
        &self.options
    }

    /// Get the project folder.
    #[must_use]
    pub fn project_folder(&self) -> &Path {
        &self.project_folder
    }

    /// Get the discovered plugins in load order.
    #[must_use]
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Get the merged configuration.
    #[must_use]
    pub const fn config(&self) -> &Value {
        &self.config
    }

    /// Look up a configuration value by dot-separated path.
    #[must_use]
    pub fn config_value(&self, path: &str) -> Option<&Value> {
        lookup(&self.config, path)
    }

    /// Build the router serving this instance.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/health", get(health))
            .fallback(dispatch)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(self))
    }

    /// Bind to `addr` and serve until stopped.
    ///
    /// # Errors
    /// Returns error if binding fails.
    pub async fn serve(self, addr: SocketAddr) -> Result<RunningServer> {
        let instance = Arc::new(self);
        let app = instance.router();

        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });

        info!(address = %addr, "Instance listening");

        Ok(RunningServer {
            addr,
            instance,
            shutdown,
            task,
        })
    }
}

/// Handle of a serving instance.
#[derive(Debug)]
pub struct RunningServer {
    addr: SocketAddr,
    instance: Arc<Instance>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    /// Address the server listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The instance being served.
    #[must_use]
    pub const fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Stop accepting requests and wait for open connections to finish.
    ///
    /// # Errors
    /// Returns error if the server task failed.
    pub async fn stop(self) -> Result<()> {
        let Self {
            addr,
            shutdown,
            task,
            ..
        } = self;

        // The task may already have ended, dropping the receiver.
        let _ = shutdown.send(());
        task.await??;

        info!(address = %addr, "Instance stopped");
        Ok(())
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn dispatch(State(instance): State<Arc<Instance>>, req: Request) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if let Some(response) = instance.routes.respond(&method, &path) {
        return response;
    }

    let public = instance.project_folder.join(PUBLIC_DIR);
    if public.is_dir() {
        let response = match ServeDir::new(public).oneshot(req).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if response.status() != StatusCode::NOT_FOUND
            && response.status() != StatusCode::METHOD_NOT_ALLOWED
        {
            return response.into_response();
        }
    }

    debug!(%method, %path, "No route");
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("no route for {method} {path}") })),
    )
        .into_response()
}

/// Find plugins: installed modules first, then explicit extensions.
fn discover_plugins(options: &InstanceOptions, project_folder: &Path) -> Result<Vec<Plugin>> {
    let extensions_folder = options
        .extensions_folder
        .as_deref()
        .unwrap_or(project_folder);
    let modules = extensions_folder.join(MODULES_DIR);

    let mut plugins = Vec::new();

    if modules.is_dir() {
        let mut folders = fs::read_dir(&modules)
            .map_err(|source| ServerError::Read {
                path: modules.clone(),
                source,
            })?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect::<Vec<_>>();
        folders.sort();

        for folder in folders {
            if let Some(plugin) = Plugin::open(&folder)? {
                debug!(name = %plugin.name, folder = %folder.display(), "Discovered plugin");
                plugins.push(plugin);
            }
        }
    }

    for folder in &options.explicit_extensions {
        if plugins.iter().any(|p| same_folder(&p.folder, folder)) {
            continue;
        }
        let plugin = Plugin::open(folder)?.ok_or_else(|| ServerError::NotAPlugin(folder.clone()))?;
        debug!(name = %plugin.name, folder = %folder.display(), "Loaded explicit plugin");
        plugins.push(plugin);
    }

    Ok(plugins)
}

fn same_folder(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Merge every configuration document of `folder` into `config`.
fn load_config_dir(folder: &Path, config: &mut Value) -> Result<()> {
    let dir = folder.join(CONFIG_DIR);
    if !dir.is_dir() {
        return Ok(());
    }

    let mut files = fs::read_dir(&dir)
        .map_err(|source| ServerError::Read {
            path: dir.clone(),
            source,
        })?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    files.sort();

    for path in files {
        let document: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&read(&path)?)?,
            Some("yml" | "yaml") => serde_yaml::from_str(&read(&path)?)?,
            _ => {
                debug!(file = %path.display(), "Ignoring non-configuration file");
                continue;
            }
        };

        merge_document(config, &document, &path.display().to_string())?;
        debug!(file = %path.display(), "Merged configuration");
    }

    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ServerError::Read {
        path: path.to_path_buf(),
        source,
    })
}
