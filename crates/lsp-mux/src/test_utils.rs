//! Test utilities: a client sink that records everything sent to it.

#[cfg(test)]
pub(crate) mod test_helpers {
    use async_trait::async_trait;
    use lsp_mux_core::ClientSink;
    use lsp_mux_core::protocol::NotificationParams;
    use lsp_mux_core::protocol::identity::{
        GetSsoTokenProgress, SsoTokenChangedParams, StsCredentialChangedParams,
    };
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tower_lsp_server::ls_types::MessageType;

    /// Every outbound message, in the order it was sent.
    #[derive(Default)]
    pub struct RecordingSink {
        logs: Mutex<Vec<(MessageType, String)>>,
        telemetry: Mutex<Vec<Value>>,
        notifications: Mutex<Vec<NotificationParams>>,
        identity: Mutex<Vec<(&'static str, Value)>>,
    }

    impl RecordingSink {
        pub fn logs(&self) -> Vec<(MessageType, String)> {
            self.logs.lock().unwrap().clone()
        }

        pub fn telemetry(&self) -> Vec<Value> {
            self.telemetry.lock().unwrap().clone()
        }

        pub fn notifications(&self) -> Vec<NotificationParams> {
            self.notifications.lock().unwrap().clone()
        }

        pub fn identity(&self) -> Vec<(&'static str, Value)> {
            self.identity.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClientSink for RecordingSink {
        async fn log_message(&self, kind: MessageType, message: String) {
            self.logs.lock().unwrap().push((kind, message));
        }

        async fn telemetry_event(&self, event: Value) {
            self.telemetry.lock().unwrap().push(event);
        }

        async fn show_notification(&self, params: NotificationParams) {
            self.notifications.lock().unwrap().push(params);
        }

        async fn sso_token_changed(&self, params: SsoTokenChangedParams) {
            self.identity
                .lock()
                .unwrap()
                .push(("ssoTokenChanged", json!(params)));
        }

        async fn sts_credential_changed(&self, params: StsCredentialChangedParams) {
            self.identity
                .lock()
                .unwrap()
                .push(("stsCredentialChanged", json!(params)));
        }

        async fn sso_token_progress(&self, progress: GetSsoTokenProgress) {
            self.identity
                .lock()
                .unwrap()
                .push(("progress", json!(progress)));
        }
    }
}

#[cfg(test)]
pub(crate) use test_helpers::RecordingSink;
