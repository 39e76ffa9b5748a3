//! Per-server notification routing.
//!
//! Each feature server owns one [`NotificationRouter`]. Outbound notifications
//! are stamped with a [`NotificationId`] naming the server and a local sequence
//! number; when the client later reports a follow-up action carrying that id,
//! the coordinator finds the server by name and hands the follow-up to its
//! router.

use futures::FutureExt;
use lsp_mux_core::ClientSink;
use lsp_mux_core::ResponseError;
use lsp_mux_core::protocol::{NotificationFollowupParams, NotificationId, NotificationParams};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::handler::{HandlerSlot, NotificationHandler};

/// Handler invoked for client follow-up actions.
pub type FollowupHandler = NotificationHandler<NotificationFollowupParams>;

pub struct NotificationRouter {
    sink: Arc<dyn ClientSink>,
    server_name: RwLock<String>,
    sequence: AtomicU64,
    followup: RwLock<HandlerSlot<FollowupHandler>>,
}

impl NotificationRouter {
    pub fn new(sink: Arc<dyn ClientSink>) -> Self {
        Self {
            sink,
            server_name: RwLock::new(String::new()),
            sequence: AtomicU64::new(0),
            followup: RwLock::new(HandlerSlot::Unset),
        }
    }

    /// Scopes the router to the name its server declared at initialization.
    pub fn bind(&self, server_name: impl Into<String>) {
        *self
            .server_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = server_name.into();
    }

    pub fn server_name(&self) -> String {
        self.server_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sends `params` with a freshly allocated id and returns that id.
    ///
    /// Any id already present in `params` is replaced.
    pub async fn send(&self, mut params: NotificationParams) -> NotificationId {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let id = NotificationId::new(self.server_name(), sequence);
        params.id = Some(id.clone());

        tracing::debug!("sending notification {}", id);
        self.sink.show_notification(params).await;
        id
    }

    /// Installs the follow-up handler, returning the one it replaces.
    pub fn on_followup<F, Fut>(&self, handler: F) -> Option<FollowupHandler>
    where
        F: Fn(NotificationFollowupParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ResponseError>> + Send + 'static,
    {
        let handler: FollowupHandler = Arc::new(move |params| handler(params).boxed());
        self.followup
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handler)
            .into_inner()
    }

    /// Runs the installed follow-up handler, whatever sequence number the
    /// follow-up refers to.
    pub async fn process_followup(&self, params: NotificationFollowupParams) {
        let handler = self
            .followup
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get();

        let Some(handler) = handler else {
            tracing::debug!(
                "no follow-up handler on {}, dropping {}",
                self.server_name(),
                params.source.id
            );
            return;
        };

        if let Err(e) = handler(params).await {
            tracing::warn!("follow-up handler on {} failed: {}", self.server_name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSink;
    use lsp_mux_core::protocol::{
        FollowupActionType, FollowupSource, NotificationContent,
    };
    use std::sync::atomic::AtomicUsize;
    use tower_lsp_server::ls_types::MessageType;

    fn params() -> NotificationParams {
        NotificationParams {
            id: None,
            kind: MessageType::INFO,
            content: NotificationContent {
                title: None,
                text: "Update happened".into(),
            },
            actions: None,
        }
    }

    fn followup(id: &str) -> NotificationFollowupParams {
        NotificationFollowupParams {
            source: FollowupSource { id: id.into() },
            action: FollowupActionType::Acknowledge,
        }
    }

    #[tokio::test]
    async fn test_send_allocates_increasing_ids() {
        let sink = Arc::new(RecordingSink::default());
        let router = NotificationRouter::new(sink.clone());
        router.bind("Notification Server");

        let first = router.send(params()).await;
        let second = router.send(params()).await;

        assert_eq!(first, NotificationId::new("Notification Server", 1));
        assert_eq!(second, NotificationId::new("Notification Server", 2));

        let sent = sink.notifications();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].id, Some(second));
    }

    #[tokio::test]
    async fn test_send_overwrites_caller_id() {
        let sink = Arc::new(RecordingSink::default());
        let router = NotificationRouter::new(sink.clone());
        router.bind("A");

        let mut with_id = params();
        with_id.id = Some(NotificationId::new("B", 99));
        router.send(with_id).await;

        assert_eq!(sink.notifications()[0].id, Some(NotificationId::new("A", 1)));
    }

    #[tokio::test]
    async fn test_followup_replaces_previous_handler() {
        let router = NotificationRouter::new(Arc::new(RecordingSink::default()));
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first_calls);
        let previous = router.on_followup(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });
        assert!(previous.is_none());

        let counter = Arc::clone(&second_calls);
        let previous = router.on_followup(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });
        assert!(previous.is_some());

        router.process_followup(followup("anything")).await;

        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_followup_without_handler_is_dropped() {
        let router = NotificationRouter::new(Arc::new(RecordingSink::default()));
        tokio_test::block_on(router.process_followup(followup("id")));
    }

    #[tokio::test]
    async fn test_followup_handler_error_is_swallowed() {
        let router = NotificationRouter::new(Arc::new(RecordingSink::default()));
        router.on_followup(|_| async { Err(ResponseError::internal("boom")) });
        router.process_followup(followup("id")).await;
    }
}
