use futures::future::join_all;
use lsp_mux_core::merge::fold;
use lsp_mux_core::protocol::identity::{
    GetIamCredential, GetMfaCode, GetSsoToken, InvalidateSsoToken, InvalidateStsCredential,
    ListProfiles, UpdateProfile,
};
use lsp_mux_core::protocol::{
    CredentialsType, GetConfigurationFromServerParams, NotificationFollowupParams,
    NotificationId, PartialInitializeResult, SERVER_CAPABILITIES_CONFIGURATION_SECTION,
    UpdateConfigurationParams, methods,
};
use lsp_mux_core::{ClientSink, MuxError, ResponseError};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_lsp_server::ls_types::request::Request;
use tower_lsp_server::ls_types::{
    CreateFilesParams, DeleteFilesParams, DidChangeConfigurationParams,
    DidChangeWorkspaceFoldersParams, DidSaveTextDocumentParams, ExecuteCommandParams,
    InitializeParams, InitializeResult, InitializedParams, MessageType, RenameFilesParams,
    WorkspaceFolder,
};
use tower_lsp_server::{Client, ClientSocket, LanguageServer, LspService, jsonrpc};

use crate::config::{InitializationOptions, RuntimeConfig};
use crate::facade::ServerFacade;
use crate::handler::Routed;
use crate::service::MuxService;
use crate::workspace::WorkspaceFolderSet;

const NO_WORKSPACE_FOLDERS: &str = "No workspace folders found in initialization parameters";

#[derive(Default)]
struct CoordinatorState {
    client_params: Option<InitializeParams>,
    workspace_folders: WorkspaceFolderSet,
    merged: Option<PartialInitializeResult>,
}

/// Runs `f` with a token that is cancelled if the returned future is dropped
/// before completing.
async fn with_cancellation<T, Fut>(f: impl FnOnce(CancellationToken) -> Fut) -> T
where
    Fut: Future<Output = T>,
{
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    let output = f(token).await;
    guard.disarm();
    output
}

/// Names declared more than once, each listed once in order of first collision.
fn duplicate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut duplicates: Vec<String> = Vec::new();

    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        } else if !duplicates.iter().any(|d| d == name) {
            duplicates.push(name.to_string());
        }
    }

    duplicates
}

/// The object bound to the client connection.
///
/// Owns the ordered registry of feature servers and decides, per protocol
/// verb, how their answers combine. Registration order is the tie-break
/// everywhere: the earliest registered server that can handle a request wins.
pub struct Coordinator {
    client: Arc<dyn ClientSink>,
    config: RuntimeConfig,
    servers: Vec<Arc<ServerFacade>>,
    state: RwLock<CoordinatorState>,
    initialize_response: InitializeResponse,
}

/// Merged initialize document as sent to the client, shared with
/// [`crate::service::MuxService`].
pub(crate) type InitializeResponse = Arc<RwLock<Option<Value>>>;

impl Coordinator {
    pub fn new(client: Arc<dyn ClientSink>, config: RuntimeConfig) -> Self {
        Self {
            client,
            config,
            servers: Vec::new(),
            state: RwLock::new(CoordinatorState::default()),
            initialize_response: Arc::new(RwLock::new(None)),
        }
    }

    pub fn client(&self) -> &Arc<dyn ClientSink> {
        &self.client
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Appends `facade` to the registry.
    pub fn register(&mut self, facade: ServerFacade) -> Arc<ServerFacade> {
        let facade = Arc::new(facade);
        self.servers.push(Arc::clone(&facade));
        facade
    }

    /// Registers a new facade sharing this coordinator's client sink.
    pub fn add_server(&mut self) -> Arc<ServerFacade> {
        let facade = ServerFacade::new(Arc::clone(&self.client));
        self.register(facade)
    }

    /// Registered facades in registration order.
    pub fn servers(&self) -> &[Arc<ServerFacade>] {
        &self.servers
    }

    pub async fn workspace_folders(&self) -> Vec<WorkspaceFolder> {
        self.state.read().await.workspace_folders.to_vec()
    }

    pub async fn client_params(&self) -> Option<InitializeParams> {
        self.state.read().await.client_params.clone()
    }

    /// Merged initialize result, once the handshake succeeded.
    pub async fn merged_result(&self) -> Option<PartialInitializeResult> {
        self.state.read().await.merged.clone()
    }

    /// The merged document the client receives in the `initialize` response,
    /// including `awsServerCapabilities` and any extra top-level fields.
    pub async fn initialize_response(&self) -> Option<Value> {
        self.initialize_response.read().await.clone()
    }

    pub(crate) fn initialize_response_handle(&self) -> InitializeResponse {
        Arc::clone(&self.initialize_response)
    }

    /// Runs the initialize handshake across every registered server.
    ///
    /// Servers are initialized one at a time in registration order; the first
    /// failure aborts the handshake and is returned as is. On success the
    /// partial results are folded over the runtime defaults and cached.
    pub async fn initialize_servers(
        &self,
        params: InitializeParams,
        token: CancellationToken,
    ) -> Result<PartialInitializeResult, ResponseError> {
        let folders = WorkspaceFolderSet::from_initialize_params(&params);
        if folders.is_empty() {
            self.client
                .log_message(MessageType::INFO, NO_WORKSPACE_FOLDERS.to_string())
                .await;
        }

        {
            let mut state = self.state.write().await;
            state.client_params = Some(params.clone());
            state.workspace_folders = folders;
        }

        let options = InitializationOptions::from_params(&params);
        if options.aws.is_none() {
            self.report_missing_aws_options(&params).await;
        }

        let mut results = Vec::with_capacity(self.servers.len());
        for server in &self.servers {
            match server.initialize(params.clone(), token.clone()).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    self.report_initialize_error(&params, &e).await;
                    return Err(e);
                }
            }
        }

        let names: Vec<&str> = results
            .iter()
            .filter_map(PartialInitializeResult::server_name)
            .collect();
        let duplicates = duplicate_names(names);
        if !duplicates.is_empty() {
            let error: ResponseError = MuxError::DuplicateServers(duplicates).into();
            self.report_initialize_error(&params, &error).await;
            return Err(error);
        }

        let document = self.merge_results(results)?;
        let merged: PartialInitializeResult =
            serde_json::from_value(document.clone()).map_err(MuxError::from)?;
        self.state.write().await.merged = Some(merged.clone());
        *self.initialize_response.write().await = Some(document);

        tracing::info!(
            "initialized {} feature server(s) as {}",
            self.servers.len(),
            self.config.name
        );

        Ok(merged)
    }

    /// Folds `results` over the runtime defaults.
    fn merge_results(&self, results: Vec<PartialInitializeResult>) -> Result<Value, ResponseError> {
        let defaults =
            PartialInitializeResult::runtime_defaults(&self.config.name, &self.config.version);
        let base = serde_json::to_value(defaults).map_err(MuxError::from)?;
        let parts = results
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(MuxError::from)?;

        Ok(fold(base, parts))
    }

    async fn report_missing_aws_options(&self, params: &InitializeParams) {
        let options = params
            .initialization_options
            .as_ref()
            .map_or_else(|| "{}".to_string(), Value::to_string);

        tracing::warn!("initialization options carry no aws block: {}", options);

        self.client
            .telemetry_event(json!({
                "name": "runtimeInitialization_validation",
                "result": "Failed",
                "data": {"hasAwsConfig": false},
                "errorData": {"reason": "aws field is not defined in InitializeResult"}
            }))
            .await;
        self.client
            .log_message(
                MessageType::LOG,
                format!("Unknown initialization error\nwith initialization options: {options}"),
            )
            .await;
    }

    async fn report_initialize_error(&self, params: &InitializeParams, error: &ResponseError) {
        let options = params
            .initialization_options
            .as_ref()
            .map_or_else(|| "null".to_string(), Value::to_string);
        let message = format!(
            "Runtime Initialization Error\nInitializationOptions: {options}\nError: {error}"
        );

        tracing::error!("{}", message);
        self.client.log_message(MessageType::ERROR, message).await;
    }

    /// Hands the command to the earliest registered server advertising it.
    ///
    /// That server's answer is final: without a handler the command is
    /// unhandled even if a later server advertises it too.
    pub async fn dispatch_command(
        &self,
        params: ExecuteCommandParams,
        token: CancellationToken,
    ) -> Result<Routed<Option<Value>>, ResponseError> {
        for server in &self.servers {
            if server.advertises_command(&params.command).await {
                return server.execute_command(params, token).await;
            }
        }

        tracing::debug!("no server advertises command {}", params.command);
        Ok(Routed::Unhandled)
    }

    /// Resolves a configuration section.
    ///
    /// The reserved server-capabilities section is answered from the cached
    /// merge result; any other section goes to the first server advertising it,
    /// whose answer is final.
    pub async fn lookup_configuration(
        &self,
        params: GetConfigurationFromServerParams,
        token: CancellationToken,
    ) -> Result<Routed<Value>, ResponseError> {
        if params.section == SERVER_CAPABILITIES_CONFIGURATION_SECTION {
            let state = self.state.read().await;
            let Some(merged) = state.merged.as_ref() else {
                return Ok(Routed::Unhandled);
            };
            let capabilities = serde_json::to_value(&merged.aws_server_capabilities)
                .map_err(MuxError::from)?;
            return Ok(Routed::Handled(capabilities));
        }

        for server in &self.servers {
            if server.advertises_section(&params.section).await {
                return server.get_server_configuration(params, token).await;
            }
        }

        tracing::debug!("no server provides configuration section {}", params.section);
        Ok(Routed::Unhandled)
    }

    /// Sends a configuration update to every server concurrently.
    ///
    /// Fails with the error of the earliest registered server that rejected it.
    pub async fn broadcast_configuration_update(
        &self,
        params: UpdateConfigurationParams,
        token: CancellationToken,
    ) -> Result<(), ResponseError> {
        let futures: Vec<_> = self
            .servers
            .iter()
            .map(|server| server.update_configuration(params.clone(), token.clone()))
            .collect();

        let results = join_all(futures).await;

        let mut first_error = None;
        for (index, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                tracing::warn!(
                    "server #{} rejected configuration update for {}: {}",
                    index,
                    params.section,
                    e
                );
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Routes a vendor request to the first server with a handler for `method`.
    pub async fn route_request(
        &self,
        method: &str,
        params: Value,
        token: CancellationToken,
    ) -> Result<Routed<Value>, ResponseError> {
        let Some(server) = self.servers.iter().find(|s| s.handles_request(method)) else {
            tracing::debug!("no server handles {}", method);
            return Ok(Routed::Unhandled);
        };

        server.request(method, params, token).await
    }

    /// Delivers a client follow-up to the server named in the notification id.
    pub async fn route_followup(&self, params: NotificationFollowupParams) {
        let id: NotificationId = match params.source.id.parse() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("dropping notification follow-up: {}", e);
                return;
            }
        };

        for server in &self.servers {
            if server.name().await.as_deref() == Some(id.server_name.as_str()) {
                server.process_followup(params).await;
                return;
            }
        }

        tracing::warn!(
            "dropping notification follow-up for unknown server {}",
            id.server_name
        );
    }

    pub async fn credentials_deleted(&self, kind: CredentialsType) {
        let futures: Vec<_> = self
            .servers
            .iter()
            .map(|server| server.credentials_deleted(kind))
            .collect();
        let results = join_all(futures).await;
        Self::log_broadcast_failures("credentials deleted", results);
    }

    fn log_broadcast_failures(event: &str, results: Vec<Result<Routed<()>, ResponseError>>) {
        for (index, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                tracing::warn!("server #{} failed to handle {}: {}", index, event, e);
            }
        }
    }

    async fn get_configuration_from_server(
        &self,
        params: GetConfigurationFromServerParams,
    ) -> jsonrpc::Result<Value> {
        let section = params.section.clone();
        with_cancellation(|token| self.lookup_configuration(params, token))
            .await?
            .into_response(format!("configuration section '{section}'"))
    }

    async fn update_configuration(&self, params: UpdateConfigurationParams) -> jsonrpc::Result<()> {
        with_cancellation(|token| self.broadcast_configuration_update(params, token))
            .await
            .map_err(Into::into)
    }

    async fn iam_credentials_deleted(&self) {
        self.credentials_deleted(CredentialsType::Iam).await;
    }

    async fn bearer_credentials_deleted(&self) {
        self.credentials_deleted(CredentialsType::Bearer).await;
    }

    async fn notification_followup(&self, params: NotificationFollowupParams) {
        self.route_followup(params).await;
    }

    async fn vendor_request<R: Request>(&self, params: R::Params) -> jsonrpc::Result<Value> {
        let params = serde_json::to_value(params).map_err(|e| {
            jsonrpc::Error::from(ResponseError::from(MuxError::from(e)))
        })?;
        with_cancellation(|token| self.route_request(R::METHOD, params, token))
            .await?
            .into_response(R::METHOD)
    }
}

impl LanguageServer for Coordinator {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        tracing::info!("initializing {}", self.config.name);

        let merged = with_cancellation(|token| self.initialize_servers(params, token)).await?;
        Ok(merged.into_initialize_result())
    }

    async fn initialized(&self, params: InitializedParams) {
        tracing::info!("{} initialized", self.config.name);

        let futures: Vec<_> = self
            .servers
            .iter()
            .map(|server| server.initialized(params.clone()))
            .collect();
        Self::log_broadcast_failures("initialized", join_all(futures).await);
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        tracing::info!("shutting down {}", self.config.name);
        Ok(())
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> jsonrpc::Result<Option<Value>> {
        let command = params.command.clone();
        with_cancellation(|token| self.dispatch_command(params, token))
            .await?
            .into_response(format!("command '{command}'"))
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let futures: Vec<_> = self
            .servers
            .iter()
            .map(|server| server.did_change_configuration(params.clone()))
            .collect();
        Self::log_broadcast_failures("configuration change", join_all(futures).await);
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        self.state
            .write()
            .await
            .workspace_folders
            .apply(&params.event);

        let futures: Vec<_> = self
            .servers
            .iter()
            .map(|server| server.did_change_workspace_folders(params.clone()))
            .collect();
        Self::log_broadcast_failures("workspace folder change", join_all(futures).await);
    }

    async fn did_create_files(&self, params: CreateFilesParams) {
        let futures: Vec<_> = self
            .servers
            .iter()
            .map(|server| server.did_create_files(params.clone()))
            .collect();
        Self::log_broadcast_failures("files created", join_all(futures).await);
    }

    async fn did_delete_files(&self, params: DeleteFilesParams) {
        let futures: Vec<_> = self
            .servers
            .iter()
            .map(|server| server.did_delete_files(params.clone()))
            .collect();
        Self::log_broadcast_failures("files deleted", join_all(futures).await);
    }

    async fn did_rename_files(&self, params: RenameFilesParams) {
        let futures: Vec<_> = self
            .servers
            .iter()
            .map(|server| server.did_rename_files(params.clone()))
            .collect();
        Self::log_broadcast_failures("files renamed", join_all(futures).await);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let futures: Vec<_> = self
            .servers
            .iter()
            .map(|server| server.did_save_text_document(params.clone()))
            .collect();
        Self::log_broadcast_failures("document saved", join_all(futures).await);
    }
}

/// Builds the service for a coordinator whose feature servers are registered
/// by `setup`, with every vendor method wired in.
pub fn build_service<F>(config: RuntimeConfig, setup: F) -> (MuxService, ClientSocket)
where
    F: FnOnce(&mut Coordinator),
{
    let (service, socket) = LspService::build(move |client: Client| {
        let mut coordinator = Coordinator::new(Arc::new(client), config);
        setup(&mut coordinator);
        coordinator
    })
    .custom_method(
        methods::GET_CONFIGURATION_FROM_SERVER,
        Coordinator::get_configuration_from_server,
    )
    .custom_method(methods::UPDATE_CONFIGURATION, Coordinator::update_configuration)
    .custom_method(methods::IAM_CREDENTIALS_DELETE, Coordinator::iam_credentials_deleted)
    .custom_method(
        methods::BEARER_CREDENTIALS_DELETE,
        Coordinator::bearer_credentials_deleted,
    )
    .custom_method(methods::NOTIFICATION_FOLLOWUP, Coordinator::notification_followup)
    .custom_method(ListProfiles::METHOD, Coordinator::vendor_request::<ListProfiles>)
    .custom_method(UpdateProfile::METHOD, Coordinator::vendor_request::<UpdateProfile>)
    .custom_method(GetSsoToken::METHOD, Coordinator::vendor_request::<GetSsoToken>)
    .custom_method(
        GetIamCredential::METHOD,
        Coordinator::vendor_request::<GetIamCredential>,
    )
    .custom_method(GetMfaCode::METHOD, Coordinator::vendor_request::<GetMfaCode>)
    .custom_method(
        InvalidateSsoToken::METHOD,
        Coordinator::vendor_request::<InvalidateSsoToken>,
    )
    .custom_method(
        InvalidateStsCredential::METHOD,
        Coordinator::vendor_request::<InvalidateStsCredential>,
    )
    .finish();
    (MuxService::new(service), socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSink;

    #[test]
    fn test_duplicate_names_in_order_of_first_collision() {
        assert_eq!(
            duplicate_names(["A", "B", "C", "B", "A", "B"]),
            vec!["B".to_string(), "A".to_string()]
        );
        assert!(duplicate_names(["A", "B"]).is_empty());
    }

    #[tokio::test]
    async fn test_with_cancellation_cancels_on_drop() {
        let observed = Arc::new(std::sync::Mutex::new(None::<CancellationToken>));
        let slot = Arc::clone(&observed);

        let future = with_cancellation(move |token| {
            *slot.lock().unwrap() = Some(token);
            futures::future::pending::<()>()
        });
        let mut future = Box::pin(future);
        assert!(futures::poll!(future.as_mut()).is_pending());
        drop(future);

        let token = observed.lock().unwrap().clone().unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_with_cancellation_completes_without_cancelling() {
        let token = with_cancellation(|token| async move { token }).await;
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_build_service_registers_servers() {
        let (service, _socket) = build_service(RuntimeConfig::default(), |coordinator| {
            coordinator.add_server();
            coordinator.add_server();
        });
        assert_eq!(service.inner().servers().len(), 2);
    }

    #[tokio::test]
    async fn test_register_keeps_order() {
        let sink = Arc::new(RecordingSink::default());
        let mut coordinator = Coordinator::new(sink.clone(), RuntimeConfig::default());
        let first = coordinator.register(ServerFacade::new(sink.clone()));
        let second = coordinator.add_server();

        assert!(Arc::ptr_eq(&coordinator.servers()[0], &first));
        assert!(Arc::ptr_eq(&coordinator.servers()[1], &second));
    }
}
