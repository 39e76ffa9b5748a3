//! Outer service the transport drives.
//!
//! `LanguageServer::initialize` can only answer with a typed
//! `InitializeResult`, which has no room for `awsServerCapabilities` or other
//! top-level fields feature servers return. [`MuxService`] forwards every
//! request to the inner [`LspService`] and swaps the body of a successful
//! `initialize` response for the merged document the coordinator cached.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tower_lsp_server::jsonrpc::{Request, Response};
use tower_lsp_server::{ExitedError, LspService};

use crate::server::{Coordinator, InitializeResponse};

const INITIALIZE: &str = "initialize";

pub struct MuxService {
    inner: LspService<Coordinator>,
    initialize_response: InitializeResponse,
}

impl MuxService {
    pub(crate) fn new(inner: LspService<Coordinator>) -> Self {
        let initialize_response = inner.inner().initialize_response_handle();
        Self {
            inner,
            initialize_response,
        }
    }

    pub fn inner(&self) -> &Coordinator {
        self.inner.inner()
    }
}

impl Service<Request> for MuxService {
    type Response = Option<Response>;
    type Error = ExitedError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let is_initialize = request.method() == INITIALIZE;
        let response = self.inner.call(request);
        if !is_initialize {
            return response;
        }

        let merged = Arc::clone(&self.initialize_response);
        async move {
            let Some(response) = response.await? else {
                return Ok(None);
            };
            let (id, result) = response.into_parts();
            let result = match result {
                Ok(typed) => Ok(merged.read().await.clone().unwrap_or(typed)),
                Err(e) => Err(e),
            };
            Ok(Some(Response::from_parts(id, result)))
        }
        .boxed()
    }
}
