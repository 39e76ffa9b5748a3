use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tower_lsp_server::ls_types::MessageType;
use tower_lsp_server::ls_types::notification::Notification;

use crate::error::MuxError;

/// Correlation key attached to an outbound notification.
///
/// Identifies the feature server that sent the notification and the sequence
/// number its router allocated. Clients treat the id as an opaque string and echo
/// it back in follow-up actions; [`fmt::Display`] and [`FromStr`] are the only
/// places the string form is produced or read.
///
/// # Examples
///
/// ```
/// use lsp_mux_core::protocol::NotificationId;
///
/// let id = NotificationId::new("Chat Server", 7);
/// let wire = id.to_string();
/// assert_eq!(wire.parse::<NotificationId>().unwrap(), id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationId {
    pub server_name: String,
    pub sequence: u64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireKey {
    server_name: String,
    id: WireSequence,
}

/// Sequence as echoed by the client: sent as a string, accepted either way.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireSequence {
    Number(u64),
    Text(String),
}

impl NotificationId {
    pub fn new(server_name: impl Into<String>, sequence: u64) -> Self {
        Self {
            server_name: server_name.into(),
            sequence,
        }
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = WireKey {
            server_name: self.server_name.clone(),
            id: WireSequence::Text(self.sequence.to_string()),
        };
        let encoded = serde_json::to_string(&key).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for NotificationId {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: WireKey = serde_json::from_str(s)
            .map_err(|e| MuxError::InvalidNotificationId(format!("{s}: {e}")))?;
        let sequence = match key.id {
            WireSequence::Number(sequence) => sequence,
            WireSequence::Text(text) => text.parse().map_err(|_| {
                MuxError::InvalidNotificationId(format!("{s}: non-numeric id"))
            })?,
        };
        Ok(Self {
            server_name: key.server_name,
            sequence,
        })
    }
}

impl Serialize for NotificationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NotificationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Action a client may offer for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowupActionType {
    Acknowledge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: FollowupActionType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
}

/// Params of `aws/window/showNotification`.
///
/// `id` is assigned by the sending server's notification router; whatever a
/// feature server puts there is overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NotificationId>,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: NotificationContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<NotificationAction>>,
}

/// Source of a follow-up: the id the client received with the notification.
///
/// Kept as the raw string so that an id the router cannot decode is dropped
/// quietly instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupSource {
    pub id: String,
}

/// Params of `aws/window/notificationFollowup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFollowupParams {
    pub source: FollowupSource,
    pub action: FollowupActionType,
}

/// `aws/window/showNotification`, server to client.
#[derive(Debug)]
pub enum ShowNotification {}

impl Notification for ShowNotification {
    type Params = NotificationParams;
    const METHOD: &'static str = super::methods::SHOW_NOTIFICATION;
}
