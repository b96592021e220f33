//! Axum transport adapter: transport-facing stages and router glue.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::RawPathParams;
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::routing::{any, MethodRouter};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_ENCODING, CONTENT_TYPE};
use http::{HeaderMap, Method, Response, StatusCode};

use crate::error::StepError;
use crate::mapping::MapperRegistry;
use crate::step::compose::{StepDeclaration, StepsDefinition};
use crate::step::context::{RequestHandle, StepContext};
use crate::step::dispatch::MethodDispatcher;
use crate::step::handler::{Step, StepHandler, StepResult};
use crate::step::stage::Stage;
use crate::steps::defaults::{default_json_steps, JsonStepParams};
use crate::steps::json::CheckContentTypeJson;
use crate::validation::ValidatorRegistry;

/// Copies method and content headers out of the transport request.
///
/// Later stages read these copies instead of reaching into the request.
pub struct FillRequestInfo;

#[async_trait]
impl Step for FillRequestInfo {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        let request = &context.request_info.request;
        context.request_info.method = Some(request.method.clone());
        context.request_info.content_type = header_string(&request.headers, CONTENT_TYPE);
        context.request_info.content_encoding = header_string(&request.headers, CONTENT_ENCODING);
        Ok(false)
    }
}

fn header_string(headers: &HeaderMap, name: http::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Pulls the raw body into the context for body-carrying methods.
pub struct ExtractBody;

#[async_trait]
impl Step for ExtractBody {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        if context.request_info.expects_body() {
            context.request_body = context.request_info.request.body.clone();
        }
        Ok(false)
    }
}

/// Rejects requests whose `Accept` header excludes JSON.
///
/// No header means no preference and passes.
pub struct CheckAcceptsJson;

#[async_trait]
impl Step for CheckAcceptsJson {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        let Some(accept) = header_string(&context.request_info.request.headers, ACCEPT) else {
            return Ok(false);
        };
        let acceptable = accept.split(',').any(|entry| {
            let essence = entry.split(';').next().unwrap_or("").trim();
            matches!(essence, "application/json" | "application/*" | "*/*")
        });
        if acceptable {
            Ok(false)
        } else {
            Err(StepError::Invalid(format!(
                "client does not accept JSON: `{accept}`"
            )))
        }
    }
}

/// Builds the final JSON response from the context.
///
/// An application error status picks its mapped HTTP status; otherwise an
/// empty body, or any DELETE, yields 204 and everything else 200.
pub struct CreateJsonResponse;

#[async_trait]
impl Step for CreateJsonResponse {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        let status = if context.error_status != 0 {
            context.http_error_status()
        } else if context.response_body.is_empty()
            || context.request_info.method == Some(Method::DELETE)
        {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::OK
        };

        let body = if status == StatusCode::NO_CONTENT {
            Bytes::new()
        } else {
            context.response_body.clone()
        };

        let mut builder = Response::builder().status(status);
        if !body.is_empty() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let mut response = builder
            .body(body)
            .map_err(|e| StepError::Other(e.into()))?;
        for (name, value) in &context.response_headers {
            response.headers_mut().append(name, value.clone());
        }
        context.response = Some(response);
        Ok(false)
    }
}

/// Default JSON step set wired for the axum transport.
///
/// Extends [`default_json_steps`] with the transport-facing stages; every
/// entry lands in the default slot, so endpoint definitions override
/// individual stages without losing the rest.
pub fn axum_json_steps(
    params: JsonStepParams,
    mappers: &MapperRegistry,
    validators: &ValidatorRegistry,
) -> StepsDefinition {
    let header_checks: Vec<StepHandler> =
        vec![Arc::new(CheckContentTypeJson), Arc::new(CheckAcceptsJson)];
    default_json_steps(params, mappers, validators)
        .default_for(
            Stage::FillRequestInfo,
            StepDeclaration::single(FillRequestInfo),
        )
        .default_for(Stage::CheckHeaders, StepDeclaration::List(header_checks))
        .default_for(Stage::ExtractBody, StepDeclaration::single(ExtractBody))
        .default_for(
            Stage::CreateResponse,
            StepDeclaration::single(CreateJsonResponse),
        )
}

/// Mount a dispatcher as an axum method router for one path.
pub fn method_router(dispatcher: Arc<MethodDispatcher>) -> MethodRouter {
    any(
        move |method: Method, params: RawPathParams, headers: HeaderMap, body: Bytes| async move {
            let custom_info: HashMap<String, String> = params
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            let request = RequestHandle::new(method, headers, body);
            match dispatcher.dispatch(request, custom_info).await {
                Ok(response) => response.map(Body::from),
                Err(err) => {
                    tracing::error!(error = %err, "request failed");
                    internal_error()
                }
            }
        },
    )
}

fn internal_error() -> AxumResponse {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
