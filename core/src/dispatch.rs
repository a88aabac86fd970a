//! Call construction and response classification.
//!
//! # Design
//! Dispatch is split the same way as the rest of the crate: [`build_request`]
//! turns a [`Call`] into an `HttpRequest` and [`classify`] turns an
//! `HttpResponse` into an [`ApiReturn`] or an [`ApiError`]. Neither touches
//! the network; `ChargifyClient::call` runs a `Transport` in between.
//!
//! Status handling:
//! - 200/201 decode the body as JSON (an empty body becomes `{}`);
//! - 204 is an empty success;
//! - 401/403, 404, 422 and 500 map to their own error variants;
//! - anything else is logged and handed back to the mapper untouched.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::endpoints::{EndpointName, Root};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query;

/// One request against a registry endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: EndpointName,
    pub root: Root,
    pub path_params: Vec<(&'static str, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Call {
    pub fn new(endpoint: EndpointName) -> Self {
        Self {
            endpoint,
            root: endpoint.root(),
            path_params: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Supplies the value for `{name}` in the endpoint template.
    pub fn path(mut self, name: &'static str, value: impl ToString) -> Self {
        let value = value.to_string();
        match self.path_params.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.path_params.push((name, value)),
        }
        self
    }

    pub fn query_pair(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends every field of a `Serialize` parameter struct, see [`query::to_pairs`].
    pub fn query<Q: Serialize + ?Sized>(mut self, params: &Q) -> Result<Self, ApiError> {
        self.query.extend(query::to_pairs(params)?);
        Ok(self)
    }

    pub fn body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Normalized outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiReturn {
    pub status: u16,
    pub body: Value,
}

impl ApiReturn {
    /// Decodes the whole body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        T::deserialize(&self.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Decodes the resource inside a single-key envelope, `{"customer": {...}}`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T, ApiError> {
        let inner = self
            .body
            .get(key)
            .ok_or_else(|| ApiError::UnexpectedResponse(format!("missing \"{key}\" in body")))?;
        T::deserialize(inner).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Decodes an array of enveloped resources, `[{"customer": {...}}, ...]`.
    pub fn list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, ApiError> {
        let items = self
            .body
            .as_array()
            .ok_or_else(|| ApiError::UnexpectedResponse("expected a JSON array".to_string()))?;
        items
            .iter()
            .map(|item| {
                let inner = item.get(key).ok_or_else(|| {
                    ApiError::UnexpectedResponse(format!("missing \"{key}\" in list item"))
                })?;
                T::deserialize(inner).map_err(|e| ApiError::DeserializationError(e.to_string()))
            })
            .collect()
    }

    /// Fails with `HttpError` unless the response carried `expected`.
    pub fn expect_status(self, expected: u16) -> Result<Self, ApiError> {
        if self.status == expected {
            return Ok(self);
        }
        Err(ApiError::HttpError {
            status: self.status,
            body: self.body.to_string(),
        })
    }

    /// Fails with `HttpError` for anything outside 2xx. Statuses `classify`
    /// passes through (429, 502, 503) land here.
    pub fn expect_success(self) -> Result<Self, ApiError> {
        if (200..300).contains(&self.status) {
            return Ok(self);
        }
        Err(ApiError::HttpError {
            status: self.status,
            body: self.body.to_string(),
        })
    }
}

/// Resolves the absolute URL for `call` against the configured roots.
pub fn resolve_url(config: &Config, call: &Call) -> Result<Url, ApiError> {
    resolve(config, call, &call.query)
}

fn resolve(config: &Config, call: &Call, query: &[(String, String)]) -> Result<Url, ApiError> {
    config.validate()?;
    let endpoint = call.endpoint.endpoint();
    for required in endpoint.path_params {
        if !call.path_params.iter().any(|(k, _)| k == required) {
            return Err(ApiError::MissingPathParam {
                endpoint: endpoint.name.as_str(),
                param: required,
            });
        }
    }

    let root = match call.root {
        Root::Api => &config.base_url,
        Root::Events => &config.events_url,
    };
    let mut url = Url::parse(root)?;

    let (path_template, query_template) = match endpoint.uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (endpoint.uri, None),
    };

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| ApiError::InvalidConfig(format!("{root} cannot be a base url")))?;
        segments.pop_if_empty();
        for segment in path_template.split('/').filter(|s| !s.is_empty()) {
            segments.push(&substitute(segment, &call.path_params));
        }
    }

    let mut pairs: Vec<(String, String)> = Vec::new();
    if let Some(template) = query_template {
        for pair in template.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            pairs.push((key.to_string(), substitute(value, &call.path_params)));
        }
    }
    pairs.extend_from_slice(query);
    if !pairs.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url)
}

fn substitute(template: &str, params: &[(&'static str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Builds the complete request for `call`: URL, JSON and basic-auth headers,
/// and the body.
///
/// GET requests carry no body; an object body is merged into the query
/// string instead, overriding caller pairs with the same key.
pub fn build_request(config: &Config, call: &Call) -> Result<HttpRequest, ApiError> {
    let method = call.endpoint.endpoint().method;

    let (url, body) = match (method, &call.body) {
        (HttpMethod::Get, Some(body)) => {
            let from_body = query::value_to_pairs(body)?;
            let mut merged: Vec<(String, String)> = call
                .query
                .iter()
                .filter(|(k, _)| !from_body.iter().any(|(bk, _)| bk == k))
                .cloned()
                .collect();
            merged.extend(from_body);
            (resolve(config, call, &merged)?, None)
        }
        (_, Some(body)) => {
            let encoded = serde_json::to_string(body)
                .map_err(|e| ApiError::SerializationError(e.to_string()))?;
            (resolve_url(config, call)?, Some(encoded))
        }
        (_, None) => (resolve_url(config, call)?, None),
    };

    debug!(endpoint = %call.endpoint, %method, %url, "built request");

    Ok(HttpRequest {
        method,
        url: url.into(),
        headers: vec![
            ("accept".to_string(), "application/json".to_string()),
            ("content-type".to_string(), "application/json".to_string()),
            ("authorization".to_string(), basic_auth(&config.api_key)),
        ],
        body,
    })
}

/// The API authenticates with the key as user name and a throwaway password.
fn basic_auth(api_key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{api_key}:x")))
}

/// Maps a response to its outcome.
pub fn classify(response: HttpResponse) -> Result<ApiReturn, ApiError> {
    let status = response.status;
    match status {
        200 | 201 => Ok(ApiReturn {
            status,
            body: decode_body(&response.body)?,
        }),
        204 => Ok(ApiReturn {
            status,
            body: Value::Null,
        }),
        401 | 403 => Err(ApiError::PermissionDenied { status }),
        404 => Err(ApiError::NotFound),
        422 => Err(ApiError::Validation {
            errors: parse_validation_errors(&response.body),
        }),
        500 => Err(ApiError::Server {
            status,
            body: response.body,
        }),
        _ => {
            warn!(status, body = %response.body, "unexpected status from billing api");
            let body = serde_json::from_str(&response.body)
                .unwrap_or_else(|_| Value::String(response.body));
            Ok(ApiReturn { status, body })
        }
    }
}

// The API occasionally answers 200 with no body at all.
fn decode_body(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Extracts messages from a 422 body. The `errors` key may hold a list, a
/// single string, or an object of per-field lists.
pub fn parse_validation_errors(body: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    match value.get("errors") {
        Some(Value::Array(items)) => items.iter().map(render).collect(),
        Some(Value::String(message)) => vec![message.clone()],
        Some(Value::Object(fields)) => fields
            .iter()
            .flat_map(|(field, messages)| match messages {
                Value::Array(items) => items
                    .iter()
                    .map(|m| format!("{field}: {}", render(m)))
                    .collect::<Vec<_>>(),
                other => vec![format!("{field}: {}", render(other))],
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
