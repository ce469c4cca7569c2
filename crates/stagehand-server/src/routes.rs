//! Configured routes.
//!
//! The `routes` configuration key maps `"METHOD /path"` or `"/path"` (any
//! method) to a response:
//!
//! ```yaml
//! routes:
//!   "GET /hello": "Hello, world!"
//!   "/status":
//!     json: { ok: true }
//!   "POST /items":
//!     status: 201
//!     json: { id: 7 }
//!     headers: { x-item-id: "7" }
//! ```

use crate::error::{Result, ServerError};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// A route definition as written in configuration.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RouteSpec {
    Text(String),
    Detailed(DetailedRoute),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetailedRoute {
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    json: Option<Value>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

const fn default_status() -> u16 {
    200
}

#[derive(Debug, Clone)]
enum RouteBody {
    Empty,
    Text(String),
    Json(Value),
}

/// Canned response for one route.
#[derive(Debug, Clone)]
struct RouteResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: RouteBody,
}

impl RouteResponse {
    fn parse(key: &str, value: &Value) -> Result<Self> {
        let invalid = |reason: String| ServerError::InvalidRoute {
            key: key.to_string(),
            reason,
        };

        let parsed: RouteSpec =
            serde_json::from_value(value.clone()).map_err(|e| invalid(e.to_string()))?;

        let detailed = match parsed {
            RouteSpec::Text(text) => {
                return Ok(Self {
                    status: StatusCode::OK,
                    headers: Vec::new(),
                    body: RouteBody::Text(text),
                });
            }
            RouteSpec::Detailed(detailed) => detailed,
        };

        let status = StatusCode::from_u16(detailed.status)
            .map_err(|_| invalid(format!("bad status {}", detailed.status)))?;

        let body = match (detailed.text, detailed.json) {
            (Some(_), Some(_)) => return Err(invalid("both text and json given".to_string())),
            (Some(text), None) => RouteBody::Text(text),
            (None, Some(json)) => RouteBody::Json(json),
            (None, None) => RouteBody::Empty,
        };

        let headers = detailed
            .headers
            .iter()
            .map(|(name, value)| {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| invalid(format!("bad header name '{name}'")))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|_| invalid(format!("bad value for header '{name}'")))?;
                Ok((name, value))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    fn to_response(&self) -> Response {
        let mut response = match &self.body {
            RouteBody::Empty => ().into_response(),
            RouteBody::Text(text) => text.clone().into_response(),
            RouteBody::Json(json) => Json(json.clone()).into_response(),
        };

        *response.status_mut() = self.status;
        for (name, value) in &self.headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }

        response
    }
}

/// Routes keyed by method (`None` for any) and exact path.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<(Option<Method>, String), RouteResponse>,
}

impl RouteTable {
    /// Build the table from the `routes` key of a merged configuration.
    ///
    /// # Errors
    /// Returns `ServerError::InvalidRoute` for malformed keys or responses.
    pub fn from_config(config: &Value) -> Result<Self> {
        let Some(routes) = config.get("routes") else {
            return Ok(Self::default());
        };

        let Value::Object(entries) = routes else {
            return Err(ServerError::InvalidRoute {
                key: "routes".to_string(),
                reason: "expected a mapping".to_string(),
            });
        };

        let mut table = Self::default();
        for (key, value) in entries {
            let route = parse_key(key)?;
            table.routes.insert(route, RouteResponse::parse(key, value)?);
        }

        Ok(table)
    }

    /// Number of configured routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Respond to a request, or `None` if no route matches.
    #[must_use]
    pub fn respond(&self, method: &Method, path: &str) -> Option<Response> {
        self.find(method, path).map(RouteResponse::to_response)
    }

    fn find(&self, method: &Method, path: &str) -> Option<&RouteResponse> {
        let path = path.to_string();
        self.routes
            .get(&(Some(method.clone()), path.clone()))
            .or_else(|| {
                (*method == Method::HEAD)
                    .then(|| self.routes.get(&(Some(Method::GET), path.clone())))
                    .flatten()
            })
            .or_else(|| self.routes.get(&(None, path)))
    }
}

fn parse_key(key: &str) -> Result<(Option<Method>, String)> {
    let invalid = |reason: &str| ServerError::InvalidRoute {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let (method, path) = match key.trim().split_once(char::is_whitespace) {
        Some((method, path)) => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| invalid("bad method"))?;
            (Some(method), path.trim())
        }
        None => (None, key.trim()),
    };

    if !path.starts_with('/') {
        return Err(invalid("path must start with '/'"));
    }

    Ok((method, path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_keys() {
        assert_eq!(
            parse_key("GET /hello").unwrap(),
            (Some(Method::GET), "/hello".to_string())
        );
        assert_eq!(
            parse_key("post   /items").unwrap(),
            (Some(Method::POST), "/items".to_string())
        );
        assert_eq!(parse_key("/any").unwrap(), (None, "/any".to_string()));
        assert!(parse_key("GET hello").is_err());
    }

    #[test]
    fn test_lookup_prefers_exact_method() {
        let config = json!({
            "routes": {
                "GET /items": "list",
                "/items": { "status": 405 },
            }
        });
        let table = RouteTable::from_config(&config).unwrap();

        assert_eq!(table.len(), 2);
        let get = table.respond(&Method::GET, "/items").unwrap();
        assert_eq!(get.status(), StatusCode::OK);
        let head = table.respond(&Method::HEAD, "/items").unwrap();
        assert_eq!(head.status(), StatusCode::OK);
        let post = table.respond(&Method::POST, "/items").unwrap();
        assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(table.respond(&Method::GET, "/other").is_none());
    }

    #[test]
    fn test_detailed_route_headers() {
        let config = json!({
            "routes": {
                "POST /items": {
                    "status": 201,
                    "json": { "id": 7 },
                    "headers": { "x-item-id": "7" }
                }
            }
        });
        let table = RouteTable::from_config(&config).unwrap();

        let response = table.respond(&Method::POST, "/items").unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-item-id"], "7");
        assert_eq!(response.headers()["content-type"], "application/json");
    }

    #[test]
    fn test_rejects_malformed_routes() {
        for routes in [
            json!(["GET /x"]),
            json!({ "GET /x": 42 }),
            json!({ "GET /x": { "text": "a", "json": {} } }),
            json!({ "GET /x": { "status": 1000 } }),
            json!({ "GET /x": { "body": "unknown field" } }),
        ] {
            let config = json!({ "routes": routes });
            assert!(
                matches!(RouteTable::from_config(&config), Err(ServerError::InvalidRoute { .. })),
                "expected {config} to be rejected"
            );
        }
    }

    #[test]
    fn test_missing_routes_key() {
        let table = RouteTable::from_config(&json!({ "auth": {} })).unwrap();
        assert!(table.is_empty());
    }
}
