//! Running stagehand projects for tests.
//!
//! - [`Instance`]: loads a project's plugins and configuration and serves it
//! - [`Client`]: HTTP request helpers returning pre-parsed responses
//! - [`Context`]: stages a project, starts an instance on it and tears both
//!   down again

pub mod client;
pub mod error;
pub mod harness;
pub mod instance;
pub mod routes;

pub use client::{Client, RequestBody, RequestBuilder, Response};
pub use error::{Result, ServerError};
pub use harness::{Context, ServerArgs, ToolkitOptions};
pub use instance::{Instance, InstanceOptions, Plugin, RunningServer};
pub use routes::RouteTable;
