//! The mutable request-scoped state threaded through the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Response, StatusCode};
use serde_json::Value;

use crate::error::StepError;
use crate::step::stage::Stage;

/// Opaque transport-supplied request handle.
///
/// Only adapter-owned stages (`fill_request_info`, `extract_body`, header
/// checks, `create_response`) look inside it; everything else reads the
/// fields those stages copy into the context.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestHandle {
    pub fn new(method: Method, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            headers,
            body,
        }
    }
}

/// Basic request information based on request headers.
///
/// `method`, `content_type` and `content_encoding` stay `None` until the
/// `fill_request_info` stage has run.
#[derive(Debug)]
pub struct RequestInfo {
    /// The transport request this dispatch is serving.
    pub request: RequestHandle,
    /// HTTP request method.
    pub method: Option<Method>,
    /// Request content type.
    pub content_type: Option<String>,
    /// Request content encoding.
    pub content_encoding: Option<String>,
}

impl RequestInfo {
    /// Whether the request method carries an input body (POST/PUT).
    pub fn expects_body(&self) -> bool {
        self.method
            .as_ref()
            .is_some_and(|m| *m == Method::POST || *m == Method::PUT)
    }
}

/// Processing context: one instance per request, exclusively owned by the
/// executor and mutated in place by each stage.
#[derive(Debug)]
pub struct StepContext {
    /// Basic request information.
    pub request_info: RequestInfo,
    /// Raw request body.
    pub request_body: Bytes,
    /// Raw parsed input based on the request body.
    pub input_raw: Option<Value>,
    /// Business input based on the raw input.
    pub input_business: Option<Value>,
    /// Business output produced by the business stage.
    pub output_business: Option<Value>,
    /// Raw output to be serialized.
    pub output_raw: Option<Value>,
    /// Serialized response body.
    pub response_body: Bytes,
    /// Error captured from a failed processing stage.
    pub exception: Option<StepError>,
    /// Name of the most recently started stage, kept even when that stage
    /// failed so the exception handler can dispatch on it.
    pub current_step: Option<Stage>,
    /// Application error status; 0 means no error.
    pub error_status: i64,
    /// Mapping from application error status to HTTP status, fixed for the
    /// pipeline's lifetime.
    pub error_status_to_http: Arc<HashMap<i64, u16>>,
    /// Additional response headers.
    pub response_headers: HeaderMap,
    /// Final response object.
    pub response: Option<Response<Bytes>>,
    /// Route-extracted parameters; read-only after construction.
    pub custom_info: HashMap<String, String>,
}

impl StepContext {
    /// Fresh context seeded with the incoming request and route parameters.
    pub fn new(
        request: RequestHandle,
        custom_info: HashMap<String, String>,
        error_status_to_http: Arc<HashMap<i64, u16>>,
    ) -> Self {
        Self {
            request_info: RequestInfo {
                request,
                method: None,
                content_type: None,
                content_encoding: None,
            },
            request_body: Bytes::new(),
            input_raw: None,
            input_business: None,
            output_business: None,
            output_raw: None,
            response_body: Bytes::new(),
            exception: None,
            current_step: None,
            error_status: 0,
            error_status_to_http,
            response_headers: HeaderMap::new(),
            response: None,
            custom_info,
        }
    }

    /// HTTP status for the current `error_status`, 500 when unmapped.
    pub fn http_error_status(&self) -> StatusCode {
        let code = self
            .error_status_to_http
            .get(&self.error_status)
            .copied()
            .unwrap_or(500);
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_table(table: HashMap<i64, u16>) -> StepContext {
        StepContext::new(
            RequestHandle::new(Method::GET, HeaderMap::new(), Bytes::new()),
            HashMap::new(),
            Arc::new(table),
        )
    }

    #[test]
    fn test_expects_body_by_method() {
        let mut ctx = context_with_table(HashMap::new());
        assert!(!ctx.request_info.expects_body());

        ctx.request_info.method = Some(Method::POST);
        assert!(ctx.request_info.expects_body());
        ctx.request_info.method = Some(Method::PUT);
        assert!(ctx.request_info.expects_body());
        ctx.request_info.method = Some(Method::DELETE);
        assert!(!ctx.request_info.expects_body());
    }

    #[test]
    fn test_http_error_status_mapping() {
        let mut ctx = context_with_table(HashMap::from([(3, 400), (10, 404)]));
        ctx.error_status = 3;
        assert_eq!(ctx.http_error_status(), StatusCode::BAD_REQUEST);
        ctx.error_status = 10;
        assert_eq!(ctx.http_error_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_http_error_status_unmapped_defaults_to_500() {
        let mut ctx = context_with_table(HashMap::new());
        ctx.error_status = 42;
        assert_eq!(ctx.http_error_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
