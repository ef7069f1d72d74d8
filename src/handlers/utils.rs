use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;

/// `?email=` on collection reads
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

impl EmailQuery {
    pub fn required(self) -> Result<String, ApiError> {
        match self.email {
            Some(email) if !email.trim().is_empty() => Ok(email),
            _ => Err(ApiError::bad_request("email query parameter is required")),
        }
    }
}

/// `?id=` on payment status updates
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// Parse a path or query id
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("invalid id: {}", raw)))
}

/// Request body as document fields. Client-supplied `_id` is dropped.
pub fn document_fields(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(mut fields) => {
            fields.remove("_id");
            Ok(fields)
        }
        _ => Err(ApiError::bad_request("request body must be a JSON object")),
    }
}

/// Like [`document_fields`], also dropping `role`; only admin promotion may set it
pub fn profile_fields(body: Value) -> Result<Map<String, Value>, ApiError> {
    let mut fields = document_fields(body)?;
    if fields.remove("role").is_some() {
        tracing::warn!("Ignored client-supplied role on a public user write");
    }
    Ok(fields)
}

/// `Number(x)` for the values payments carry: numbers and numeric strings, else 0
pub fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}
