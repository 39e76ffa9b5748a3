//! Wire contracts for the vendor extensions the router speaks.
//!
//! Standard LSP types come from `tower_lsp_server::ls_types`; this module only
//! defines the additional `aws/*` requests and notifications together with the
//! partial initialize result that feature servers return.

pub mod configuration;
pub mod identity;
pub mod initialize;
pub mod notification;

/// Vendor method names.
pub mod methods {
    pub const GET_CONFIGURATION_FROM_SERVER: &str = "aws/getConfigurationFromServer";
    pub const UPDATE_CONFIGURATION: &str = "aws/updateConfiguration";
    pub const IAM_CREDENTIALS_DELETE: &str = "aws/credentials/iam/delete";
    pub const BEARER_CREDENTIALS_DELETE: &str = "aws/credentials/token/delete";
    pub const SHOW_NOTIFICATION: &str = "aws/window/showNotification";
    pub const NOTIFICATION_FOLLOWUP: &str = "aws/window/notificationFollowup";
}

pub use configuration::{
    CredentialsType, GetConfigurationFromServerParams, SERVER_CAPABILITIES_CONFIGURATION_SECTION,
    UpdateConfigurationParams,
};
pub use initialize::{AwsServerCapabilities, ConfigurationProvider, PartialInitializeResult};
pub use notification::{
    FollowupActionType, FollowupSource, NotificationAction, NotificationContent,
    NotificationFollowupParams, NotificationId, NotificationParams, ShowNotification,
};
