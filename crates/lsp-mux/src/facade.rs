//! Per feature server facade.
//!
//! A [`ServerFacade`] is what a feature server sees of the runtime: it installs
//! handlers for the protocol verbs it cares about and talks back to the client
//! through the facade's sink. The coordinator offers every inbound message to
//! the facades it owns and decides, per verb, how their answers combine.
//!
//! A facade never errors for a verb it has no handler for; it answers
//! [`Routed::Unhandled`] and lets the coordinator move on.

use futures::FutureExt;
use lsp_mux_core::protocol::{
    CredentialsType, GetConfigurationFromServerParams, NotificationFollowupParams,
    NotificationId, NotificationParams, PartialInitializeResult, UpdateConfigurationParams,
};
use lsp_mux_core::{ClientSink, MuxError, ResponseError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tower_lsp_server::ls_types::{
    CreateFilesParams, DeleteFilesParams, DidChangeConfigurationParams,
    DidChangeWorkspaceFoldersParams, DidSaveTextDocumentParams, ExecuteCommandParams,
    InitializeParams, InitializedParams, RenameFilesParams,
};

use crate::config::InitializationOptions;
use crate::handler::{HandlerFuture, HandlerSlot, NotificationHandler, RequestHandler, Routed};
use crate::notification::{FollowupHandler, NotificationRouter};

#[derive(Default)]
struct Handlers {
    initialize: HandlerSlot<RequestHandler<InitializeParams, PartialInitializeResult>>,
    initialized: HandlerSlot<NotificationHandler<InitializedParams>>,
    execute_command: HandlerSlot<RequestHandler<ExecuteCommandParams, Option<Value>>>,
    did_change_configuration: HandlerSlot<NotificationHandler<DidChangeConfigurationParams>>,
    get_configuration: HandlerSlot<RequestHandler<GetConfigurationFromServerParams, Value>>,
    update_configuration: HandlerSlot<RequestHandler<UpdateConfigurationParams, ()>>,
    credentials_delete: HandlerSlot<NotificationHandler<CredentialsType>>,
    did_change_workspace_folders: HandlerSlot<NotificationHandler<DidChangeWorkspaceFoldersParams>>,
    did_create_files: HandlerSlot<NotificationHandler<CreateFilesParams>>,
    did_delete_files: HandlerSlot<NotificationHandler<DeleteFilesParams>>,
    did_rename_files: HandlerSlot<NotificationHandler<RenameFilesParams>>,
    did_save: HandlerSlot<NotificationHandler<DidSaveTextDocumentParams>>,
    requests: HashMap<String, RequestHandler<Value, Value>>,
}

/// What the facade learned from its own initialize handler.
#[derive(Default)]
struct FacadeState {
    name: Option<String>,
    client_supports_notifications: bool,
    result: PartialInitializeResult,
}

fn request_handler<P, R, F, Fut>(handler: F) -> RequestHandler<P, R>
where
    P: 'static,
    R: 'static,
    F: Fn(P, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ResponseError>> + Send + 'static,
{
    Arc::new(move |params, token| handler(params, token).boxed())
}

fn notification_handler<P, F, Fut>(handler: F) -> NotificationHandler<P>
where
    P: 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ResponseError>> + Send + 'static,
{
    Arc::new(move |params| handler(params).boxed())
}

/// Wraps a typed request handler so it can sit in the untyped vendor table.
fn erased_request_handler<P, R, F, Fut>(handler: F) -> RequestHandler<Value, Value>
where
    P: DeserializeOwned + 'static,
    R: Serialize + Send + 'static,
    F: Fn(P, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ResponseError>> + Send + 'static,
{
    Arc::new(move |params: Value, token: CancellationToken| -> HandlerFuture<Value> {
        let call = match serde_json::from_value::<P>(params) {
            Ok(params) => handler(params, token),
            Err(e) => {
                let error = ResponseError::invalid_params(format!("invalid params: {e}"));
                return futures::future::ready(Err(error)).boxed();
            }
        };

        async move {
            match call.await {
                Ok(result) => serde_json::to_value(result)
                    .map_err(|e| ResponseError::from(MuxError::from(e))),
                Err(e) => Err(e),
            }
        }
        .boxed()
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Runs a handler, turning a panic in either the call or the future into an
/// error.
async fn guarded<T>(call: impl FnOnce() -> HandlerFuture<T>) -> Result<T, ResponseError> {
    let future = std::panic::catch_unwind(AssertUnwindSafe(call))
        .map_err(|payload| MuxError::HandlerPanicked(panic_message(payload.as_ref())))?;

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(MuxError::HandlerPanicked(panic_message(payload.as_ref())).into()),
    }
}

macro_rules! request_setter {
    ($(#[$meta:meta])* $setter:ident, $slot:ident, $params:ty => $result:ty) => {
        $(#[$meta])*
        pub fn $setter<F, Fut>(&self, handler: F)
        where
            F: Fn($params, CancellationToken) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<$result, ResponseError>> + Send + 'static,
        {
            self.handlers_mut().$slot.replace(request_handler(handler));
        }
    };
}

macro_rules! notification_setter {
    ($(#[$meta:meta])* $setter:ident, $slot:ident, $params:ty) => {
        $(#[$meta])*
        pub fn $setter<F, Fut>(&self, handler: F)
        where
            F: Fn($params) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<(), ResponseError>> + Send + 'static,
        {
            self.handlers_mut().$slot.replace(notification_handler(handler));
        }
    };
}

macro_rules! notification_dispatch {
    ($(#[$meta:meta])* $method:ident, $slot:ident, $params:ty) => {
        $(#[$meta])*
        pub async fn $method(&self, params: $params) -> Result<Routed<()>, ResponseError> {
            let handler = self.handlers().$slot.get();
            self.notify(handler, params).await
        }
    };
}

/// Handle a feature server uses to plug into the shared connection.
///
/// # Examples
///
/// ```
/// use lsp_mux::facade::ServerFacade;
/// use lsp_mux_core::protocol::PartialInitializeResult;
/// use serde_json::json;
///
/// # fn setup(facade: &ServerFacade) {
/// facade.on_initialize(|_params, _token| async {
///     Ok(serde_json::from_value::<PartialInitializeResult>(json!({
///         "serverInfo": {"name": "Chat Server"},
///         "capabilities": {"executeCommandProvider": {"commands": ["chat.clear"]}}
///     }))
///     .unwrap_or_default())
/// });
/// facade.on_execute_command(|params, _token| async move {
///     Ok(Some(json!({"cleared": params.command})))
/// });
/// # }
/// ```
pub struct ServerFacade {
    client: Arc<dyn ClientSink>,
    handlers: RwLock<Handlers>,
    state: tokio::sync::RwLock<FacadeState>,
    notification: NotificationRouter,
}

impl ServerFacade {
    pub fn new(client: Arc<dyn ClientSink>) -> Self {
        Self {
            notification: NotificationRouter::new(Arc::clone(&client)),
            client,
            handlers: RwLock::new(Handlers::default()),
            state: tokio::sync::RwLock::new(FacadeState::default()),
        }
    }

    fn handlers(&self) -> RwLockReadGuard<'_, Handlers> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn handlers_mut(&self) -> RwLockWriteGuard<'_, Handlers> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Outbound channel to the client, for logs, telemetry and identity events.
    pub fn client(&self) -> &Arc<dyn ClientSink> {
        &self.client
    }

    /// Name declared by the initialize handler, if any.
    pub async fn name(&self) -> Option<String> {
        self.state.read().await.name.clone()
    }

    /// This server's own slice of the initialize result.
    pub async fn initialize_result(&self) -> PartialInitializeResult {
        self.state.read().await.result.clone()
    }

    request_setter!(
        /// Contributes to the handshake. The declared `serverInfo.name` becomes
        /// this server's identity for routing follow-ups.
        on_initialize, initialize, InitializeParams => PartialInitializeResult
    );
    notification_setter!(on_initialized, initialized, InitializedParams);
    request_setter!(
        /// Only consulted for commands this server advertised in
        /// `executeCommandProvider.commands`.
        on_execute_command, execute_command, ExecuteCommandParams => Option<Value>
    );
    notification_setter!(
        on_did_change_configuration,
        did_change_configuration,
        DidChangeConfigurationParams
    );
    request_setter!(
        /// Only consulted for sections this server advertised in
        /// `awsServerCapabilities.configurationProvider.sections`.
        on_get_server_configuration, get_configuration,
        GetConfigurationFromServerParams => Value
    );
    request_setter!(
        on_update_configuration, update_configuration, UpdateConfigurationParams => ()
    );
    notification_setter!(on_credentials_deleted, credentials_delete, CredentialsType);
    notification_setter!(
        on_did_change_workspace_folders,
        did_change_workspace_folders,
        DidChangeWorkspaceFoldersParams
    );
    notification_setter!(on_did_create_files, did_create_files, CreateFilesParams);
    notification_setter!(on_did_delete_files, did_delete_files, DeleteFilesParams);
    notification_setter!(on_did_rename_files, did_rename_files, RenameFilesParams);
    notification_setter!(on_did_save_text_document, did_save, DidSaveTextDocumentParams);

    /// Installs a handler for a vendor request such as
    /// `aws/identity/getSsoToken`. Params and result go through serde.
    pub fn on_request<P, R, F, Fut>(&self, method: impl Into<String>, handler: F)
    where
        P: DeserializeOwned + 'static,
        R: Serialize + Send + 'static,
        F: Fn(P, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ResponseError>> + Send + 'static,
    {
        self.handlers_mut()
            .requests
            .insert(method.into(), erased_request_handler(handler));
    }

    pub fn handles_request(&self, method: &str) -> bool {
        self.handlers().requests.contains_key(method)
    }

    /// Installs the handler for follow-up actions on this server's
    /// notifications, returning the one it replaces.
    pub fn on_notification_followup<F, Fut>(&self, handler: F) -> Option<FollowupHandler>
    where
        F: Fn(NotificationFollowupParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ResponseError>> + Send + 'static,
    {
        self.notification.on_followup(handler)
    }

    /// Sends `aws/window/showNotification` on behalf of this server.
    ///
    /// Does nothing unless the client declared notification support and this
    /// server declared a name; returns the id the notification went out with.
    pub async fn show_notification(&self, params: NotificationParams) -> Option<NotificationId> {
        let enabled = {
            let state = self.state.read().await;
            state.client_supports_notifications && state.name.is_some()
        };

        if !enabled {
            tracing::debug!("notifications disabled for this server, dropping notification");
            return None;
        }

        Some(self.notification.send(params).await)
    }

    pub(crate) async fn process_followup(&self, params: NotificationFollowupParams) {
        self.notification.process_followup(params).await;
    }

    /// Runs the initialize handler and records the declared identity.
    ///
    /// Without a handler the server contributes an empty fragment.
    pub async fn initialize(
        &self,
        params: InitializeParams,
        token: CancellationToken,
    ) -> Result<PartialInitializeResult, ResponseError> {
        let supports_notifications =
            InitializationOptions::from_params(&params).client_supports_notifications();

        let handler = self.handlers().initialize.get();
        let result = match handler {
            Some(handler) => guarded(|| handler(params, token)).await?,
            None => PartialInitializeResult::default(),
        };

        let name = result.server_name().map(str::to_string);
        self.notification.bind(name.clone().unwrap_or_default());

        let mut state = self.state.write().await;
        state.name = name;
        state.client_supports_notifications = supports_notifications;
        state.result = result.clone();

        Ok(result)
    }

    /// Whether this server listed `command` in `executeCommandProvider`.
    pub async fn advertises_command(&self, command: &str) -> bool {
        self.state
            .read()
            .await
            .result
            .commands()
            .iter()
            .any(|c| c == command)
    }

    /// Whether this server listed `section` in its configuration provider.
    pub async fn advertises_section(&self, section: &str) -> bool {
        self.state
            .read()
            .await
            .result
            .configuration_sections()
            .iter()
            .any(|s| s == section)
    }

    /// Executes `params.command` if this server advertised it.
    pub async fn execute_command(
        &self,
        params: ExecuteCommandParams,
        token: CancellationToken,
    ) -> Result<Routed<Option<Value>>, ResponseError> {
        if !self.advertises_command(&params.command).await {
            return Ok(Routed::Unhandled);
        }

        let handler = self.handlers().execute_command.get();
        let Some(handler) = handler else {
            return Ok(Routed::Unhandled);
        };

        guarded(|| handler(params, token)).await.map(Routed::Handled)
    }

    /// Answers a configuration lookup if this server advertised the section.
    pub async fn get_server_configuration(
        &self,
        params: GetConfigurationFromServerParams,
        token: CancellationToken,
    ) -> Result<Routed<Value>, ResponseError> {
        if !self.advertises_section(&params.section).await {
            return Ok(Routed::Unhandled);
        }

        let handler = self.handlers().get_configuration.get();
        let Some(handler) = handler else {
            return Ok(Routed::Unhandled);
        };

        guarded(|| handler(params, token)).await.map(Routed::Handled)
    }

    pub async fn update_configuration(
        &self,
        params: UpdateConfigurationParams,
        token: CancellationToken,
    ) -> Result<Routed<()>, ResponseError> {
        let handler = self.handlers().update_configuration.get();
        let Some(handler) = handler else {
            return Ok(Routed::Unhandled);
        };

        guarded(|| handler(params, token)).await.map(Routed::Handled)
    }

    /// Dispatches a vendor request to the handler registered for `method`.
    pub async fn request(
        &self,
        method: &str,
        params: Value,
        token: CancellationToken,
    ) -> Result<Routed<Value>, ResponseError> {
        let handler = self.handlers().requests.get(method).cloned();
        let Some(handler) = handler else {
            return Ok(Routed::Unhandled);
        };

        guarded(|| handler(params, token)).await.map(Routed::Handled)
    }

    async fn notify<P>(
        &self,
        handler: Option<NotificationHandler<P>>,
        params: P,
    ) -> Result<Routed<()>, ResponseError> {
        let Some(handler) = handler else {
            return Ok(Routed::Unhandled);
        };

        guarded(|| handler(params)).await.map(Routed::Handled)
    }

    notification_dispatch!(initialized, initialized, InitializedParams);
    notification_dispatch!(
        did_change_configuration,
        did_change_configuration,
        DidChangeConfigurationParams
    );
    notification_dispatch!(credentials_deleted, credentials_delete, CredentialsType);
    notification_dispatch!(
        did_change_workspace_folders,
        did_change_workspace_folders,
        DidChangeWorkspaceFoldersParams
    );
    notification_dispatch!(did_create_files, did_create_files, CreateFilesParams);
    notification_dispatch!(did_delete_files, did_delete_files, DeleteFilesParams);
    notification_dispatch!(did_rename_files, did_rename_files, RenameFilesParams);
    notification_dispatch!(did_save_text_document, did_save, DidSaveTextDocumentParams);
}
