//! Check request building and response classification against the JSON
//! vectors in `test-vectors/`.
//!
//! Outcomes are compared as JSON values so a failing case prints both sides
//! in full.

use std::str::FromStr;

use chargify_core::dispatch::{build_request, classify};
use chargify_core::{ApiError, Call, Config, EndpointName, HttpResponse};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn config(vectors: &Value) -> Config {
    Config::new(
        vectors["config"]["subdomain"].as_str().unwrap(),
        vectors["config"]["api_key"].as_str().unwrap(),
    )
}

/// Builds the call a case describes. Path parameter names are taken from the
/// endpoint's own declaration so they carry the registry's lifetime.
fn call_for(case: &Value) -> Result<Call, String> {
    let name = case["endpoint"].as_str().unwrap();
    let endpoint = EndpointName::from_str(name).map_err(|e| e.to_string())?;
    let mut call = Call::new(endpoint);
    for param in endpoint.endpoint().path_params {
        if let Some(value) = case["path"][*param].as_str() {
            call = call.path(*param, value);
        }
    }
    if let Some(pairs) = case["query"].as_array() {
        for pair in pairs {
            call = call.query_pair(pair[0].as_str().unwrap(), pair[1].as_str().unwrap());
        }
    }
    Ok(call)
}

fn error_kind(err: &ApiError) -> &'static str {
    match err {
        ApiError::PermissionDenied { .. } => "permission_denied",
        ApiError::NotFound => "not_found",
        ApiError::Validation { .. } => "validation",
        ApiError::Server { .. } => "server",
        ApiError::DeserializationError(_) => "deserialization",
        ApiError::MissingPathParam { .. } => "missing_path_param",
        _ => "other",
    }
}

#[test]
fn endpoint_test_vectors() {
    let raw = include_str!("../../test-vectors/endpoints.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let config = config(&vectors);

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        let call = match call_for(case) {
            Ok(call) => call,
            Err(_) => {
                assert_eq!(
                    case["expected_error"]["kind"], "unknown_endpoint",
                    "case {name}: endpoint should have resolved"
                );
                continue;
            }
        };

        match build_request(&config, &call) {
            Ok(req) => {
                assert_eq!(
                    json!({"method": req.method.as_str(), "url": req.url}),
                    case["expected_request"],
                    "case {name}"
                );
                assert_eq!(req.header("accept"), Some("application/json"), "case {name}");
                assert!(req.body.is_none(), "case {name}");
            }
            Err(err) => {
                let expected = &case["expected_error"];
                assert_eq!(error_kind(&err), expected["kind"], "case {name}: {err}");
                if let ApiError::MissingPathParam { param, .. } = err {
                    assert_eq!(param, expected["param"], "case {name}");
                }
            }
        }
    }
}

#[test]
fn classify_test_vectors() {
    let raw = include_str!("../../test-vectors/classify.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let body = case["body"].as_str().unwrap();

        let outcome = match classify(HttpResponse::new(status, body)) {
            Ok(ret) => json!({"ok": {"status": ret.status, "body": ret.body}}),
            Err(err) => {
                let mut error = json!({"kind": error_kind(&err), "status": err.status()});
                if let ApiError::Validation { errors } = &err {
                    error["errors"] = json!(errors);
                }
                json!({ "error": error })
            }
        };

        assert_eq!(outcome, case["expected"], "case {name}");
    }
}

#[test]
fn every_registry_name_round_trips() {
    for name in EndpointName::ALL {
        assert_eq!(EndpointName::from_str(name.as_str()), Ok(*name));
    }
}
