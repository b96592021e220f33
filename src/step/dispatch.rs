//! Per-method pipeline dispatch for one endpoint path.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::ALLOW;
use http::{HeaderValue, Method, Response, StatusCode};

use crate::error::StepError;
use crate::step::compose::StepsDefinition;
use crate::step::context::RequestHandle;
use crate::step::pipeline::Pipeline;

/// Routes a request to the pipeline registered for its HTTP method.
///
/// One dispatcher per endpoint path; methods without a pipeline get a 405
/// with an `Allow` header listing the supported ones.
pub struct MethodDispatcher {
    pipelines: HashMap<Method, Pipeline>,
    allow: HeaderValue,
}

/// Builder collecting one step definition per method.
pub struct MethodDispatcherBuilder {
    error_status_to_http: Arc<HashMap<i64, u16>>,
    pipelines: HashMap<Method, Pipeline>,
}

impl MethodDispatcher {
    pub fn builder(error_status_to_http: HashMap<i64, u16>) -> MethodDispatcherBuilder {
        MethodDispatcherBuilder {
            error_status_to_http: Arc::new(error_status_to_http),
            pipelines: HashMap::new(),
        }
    }

    /// Serve one request with the pipeline matching its method.
    pub async fn dispatch(
        &self,
        request: RequestHandle,
        custom_info: HashMap<String, String>,
    ) -> Result<Response<Bytes>, StepError> {
        match self.pipelines.get(&request.method) {
            Some(pipeline) => pipeline.handle(request, custom_info).await,
            None => {
                tracing::debug!(method = %request.method, "method not allowed");
                let response = Response::builder()
                    .status(StatusCode::METHOD_NOT_ALLOWED)
                    .header(ALLOW, self.allow.clone())
                    .body(Bytes::new())
                    .map_err(|e| StepError::Other(e.into()))?;
                Ok(response)
            }
        }
    }

    /// Methods this endpoint serves.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.pipelines.keys()
    }
}

impl MethodDispatcherBuilder {
    /// Register the pipeline for one method, replacing any previous one.
    pub fn method(mut self, method: Method, definition: StepsDefinition) -> Self {
        let pipeline = Pipeline::new(
            definition.resolve(),
            Arc::clone(&self.error_status_to_http),
        );
        self.pipelines.insert(method, pipeline);
        self
    }

    pub fn build(self) -> MethodDispatcher {
        let mut names: Vec<&str> = self.pipelines.keys().map(Method::as_str).collect();
        names.sort_unstable();
        let allow = HeaderValue::from_str(&names.join(", "))
            .unwrap_or_else(|_| HeaderValue::from_static(""));
        MethodDispatcher {
            pipelines: self.pipelines,
            allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use http::HeaderMap;

    use super::*;
    use crate::step::compose::StepDeclaration;
    use crate::step::context::StepContext;
    use crate::step::handler::{Step, StepResult};
    use crate::step::stage::Stage;

    struct FixedStatus(StatusCode);

    #[async_trait]
    impl Step for FixedStatus {
        async fn run(&self, context: &mut StepContext) -> StepResult {
            let response = Response::builder()
                .status(self.0)
                .body(Bytes::new())
                .map_err(|e| StepError::Other(e.into()))?;
            context.response = Some(response);
            Ok(false)
        }
    }

    fn endpoint(status: StatusCode) -> StepsDefinition {
        StepsDefinition::new().base(
            Stage::CreateResponse,
            StepDeclaration::single(FixedStatus(status)),
        )
    }

    fn request(method: Method) -> RequestHandle {
        RequestHandle::new(method, HeaderMap::new(), Bytes::new())
    }

    #[tokio::test]
    async fn test_dispatch_by_method() {
        let dispatcher = MethodDispatcher::builder(HashMap::new())
            .method(Method::GET, endpoint(StatusCode::OK))
            .method(Method::POST, endpoint(StatusCode::CREATED))
            .build();

        let get = dispatcher
            .dispatch(request(Method::GET), HashMap::new())
            .await
            .unwrap();
        assert_eq!(get.status(), StatusCode::OK);

        let post = dispatcher
            .dispatch(request(Method::POST), HashMap::new())
            .await
            .unwrap();
        assert_eq!(post.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_unregistered_method_gets_405_with_allow() {
        let dispatcher = MethodDispatcher::builder(HashMap::new())
            .method(Method::GET, endpoint(StatusCode::OK))
            .method(Method::POST, endpoint(StatusCode::OK))
            .build();

        let response = dispatcher
            .dispatch(request(Method::DELETE), HashMap::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(ALLOW).unwrap().to_str().unwrap(),
            "GET, POST"
        );
    }
}
