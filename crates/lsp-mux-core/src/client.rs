//! Outbound side of the shared connection.
//!
//! Feature servers and the router never hold the transport directly. They talk
//! to the client through [`ClientSink`], which the binary backs with the
//! `tower_lsp_server::Client` and tests back with a recorder.

use async_trait::async_trait;
use serde_json::Value;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::MessageType;

use crate::protocol::identity::{
    GetSsoTokenProgress, SsoTokenChanged, SsoTokenChangedParams, SsoTokenProgress,
    SsoTokenProgressParams, StsCredentialChanged, StsCredentialChangedParams,
};
use crate::protocol::{NotificationParams, ShowNotification};

/// Messages the router and its feature servers may push to the client.
///
/// All methods are fire-and-forget; delivery failures are the transport's
/// concern.
#[async_trait]
pub trait ClientSink: Send + Sync {
    /// `window/logMessage`.
    async fn log_message(&self, kind: MessageType, message: String);

    /// `telemetry/event`.
    async fn telemetry_event(&self, event: Value);

    /// `aws/window/showNotification`.
    async fn show_notification(&self, params: NotificationParams);

    /// `aws/identity/ssoTokenChanged`.
    async fn sso_token_changed(&self, params: SsoTokenChangedParams);

    /// `aws/identity/stsCredentialChanged`.
    async fn sts_credential_changed(&self, params: StsCredentialChangedParams);

    /// `$/progress` for the SSO login token.
    async fn sso_token_progress(&self, progress: GetSsoTokenProgress);
}

#[async_trait]
impl ClientSink for Client {
    async fn log_message(&self, kind: MessageType, message: String) {
        Client::log_message(self, kind, message).await;
    }

    async fn telemetry_event(&self, event: Value) {
        // allowed before `initialized`, unlike `send_notification`
        Client::telemetry_event(self, event).await;
    }

    async fn show_notification(&self, params: NotificationParams) {
        self.send_notification::<ShowNotification>(params).await;
    }

    async fn sso_token_changed(&self, params: SsoTokenChangedParams) {
        self.send_notification::<SsoTokenChanged>(params).await;
    }

    async fn sts_credential_changed(&self, params: StsCredentialChangedParams) {
        self.send_notification::<StsCredentialChanged>(params).await;
    }

    async fn sso_token_progress(&self, progress: GetSsoTokenProgress) {
        self.send_notification::<SsoTokenProgress>(SsoTokenProgressParams::new(progress))
            .await;
    }
}
