use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved section answered from the merged initialize result instead of a
/// feature server.
pub const SERVER_CAPABILITIES_CONFIGURATION_SECTION: &str = "aws.serverCapabilities";

/// Params of `aws/getConfigurationFromServer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetConfigurationFromServerParams {
    pub section: String,
}

/// Params of `aws/updateConfiguration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfigurationParams {
    pub section: String,
    #[serde(default)]
    pub settings: Value,
}

/// Kind of credentials the client deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialsType {
    Iam,
    Bearer,
}
