//! Identity and credential management sub-protocol.
//!
//! These are wire contracts only. The router forwards them to whichever feature
//! server registered a handler for the method and never looks inside.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_lsp_server::ls_types::notification::Notification;
use tower_lsp_server::ls_types::request::Request;

pub const LIST_PROFILES: &str = "aws/identity/listProfiles";
pub const UPDATE_PROFILE: &str = "aws/identity/updateProfile";
pub const GET_SSO_TOKEN: &str = "aws/identity/getSsoToken";
pub const GET_IAM_CREDENTIAL: &str = "aws/identity/getIamCredential";
pub const GET_MFA_CODE: &str = "aws/identity/getMfaCode";
pub const INVALIDATE_SSO_TOKEN: &str = "aws/identity/invalidateSsoToken";
pub const INVALIDATE_STS_CREDENTIAL: &str = "aws/identity/invalidateStsCredential";
pub const SSO_TOKEN_CHANGED: &str = "aws/identity/ssoTokenChanged";
pub const STS_CREDENTIAL_CHANGED: &str = "aws/identity/stsCredentialChanged";

/// Progress token used while an SSO login is in flight.
pub const GET_SSO_TOKEN_PROGRESS_TOKEN: &str = "aws/identity/getSsoToken/progressToken";

/// Every identity request method, in declaration order.
pub const REQUEST_METHODS: [&str; 7] = [
    LIST_PROFILES,
    UPDATE_PROFILE,
    GET_SSO_TOKEN,
    GET_IAM_CREDENTIAL,
    GET_MFA_CODE,
    INVALIDATE_SSO_TOKEN,
    INVALIDATE_STS_CREDENTIAL,
];

/// Default permission sets requested for IAM credentials.
pub mod permission_sets {
    pub const Q: &[&str] = &[
        "q:StartConversation",
        "q:SendMessage",
        "q:GetConversation",
        "q:ListConversations",
        "q:UpdateConversation",
        "q:DeleteConversation",
        "q:PassRequest",
        "q:StartTroubleshootingAnalysis",
        "q:StartTroubleshootingResolutionExplanation",
        "q:GetTroubleshootingResults",
        "q:UpdateTroubleshootingCommandResult",
        "q:GetIdentityMetaData",
        "q:GenerateCodeFromCommands",
        "q:UsePlugin",
        "codewhisperer:GenerateRecommendations",
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileKind {
    Unknown,
    SsoTokenProfile,
    IamCredentialsProfile,
    IamSourceProfileProfile,
    IamCredentialSourceProfile,
    IamCredentialProcessProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_secret_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_session_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_cache: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_cache_location: Option<String>,
}

/// A profile from the shared config files.
///
/// Settings live under `settings` so they never clash with `kinds` or `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub kinds: Vec<ProfileKind>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ProfileSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoSessionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_start_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_registration_scopes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoSession {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SsoSessionSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListProfilesParams {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProfilesResult {
    pub profiles: Vec<Profile>,
    pub sso_sessions: Vec<SsoSession>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileOptions {
    #[serde(default = "default_true")]
    pub create_nonexistent_profile: bool,
    #[serde(default = "default_true")]
    pub create_nonexistent_sso_session: bool,
    #[serde(default)]
    pub update_shared_sso_session: bool,
}

impl Default for UpdateProfileOptions {
    fn default() -> Self {
        Self {
            create_nonexistent_profile: true,
            create_nonexistent_sso_session: true,
            update_shared_sso_session: false,
        }
    }
}

/// Settings set to `null` are deleted; settings not provided are left as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileParams {
    pub profile: Profile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_session: Option<SsoSession>,
    #[serde(default)]
    pub options: UpdateProfileOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfileResult {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SsoTokenSourceKind {
    IamIdentityCenter,
    AwsBuilderId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SsoTokenSource {
    #[serde(rename_all = "camelCase")]
    IamIdentityCenter { profile_name: String },
    #[serde(rename_all = "camelCase")]
    AwsBuilderId { sso_registration_scopes: Vec<String> },
}

impl SsoTokenSource {
    pub const fn kind(&self) -> SsoTokenSourceKind {
        match self {
            Self::IamIdentityCenter { .. } => SsoTokenSourceKind::IamIdentityCenter,
            Self::AwsBuilderId { .. } => SsoTokenSourceKind::AwsBuilderId,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationFlowKind {
    DeviceCode,
    #[default]
    Pkce,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSsoTokenOptions {
    #[serde(default = "default_true")]
    pub login_on_invalid_token: bool,
    /// Ignored when `login_on_invalid_token` is false.
    #[serde(default)]
    pub authorization_flow: AuthorizationFlowKind,
}

impl Default for GetSsoTokenOptions {
    fn default() -> Self {
        Self {
            login_on_invalid_token: true,
            authorization_flow: AuthorizationFlowKind::Pkce,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSsoTokenParams {
    pub source: SsoTokenSource,
    pub client_name: String,
    #[serde(default)]
    pub options: GetSsoTokenOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoToken {
    pub id: String,
    pub access_token: String,
}

/// Payload the client forwards to its credential update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCredentialsParams {
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSsoTokenResult {
    pub sso_token: SsoToken,
    pub update_credentials_params: UpdateCredentialsParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GetSsoTokenProgressState {
    InProgress,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSsoTokenProgress {
    pub state: GetSsoTokenProgressState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetIamCredentialOptions {
    #[serde(default = "default_true")]
    pub call_sts_on_invalid_iam_credential: bool,
    #[serde(default = "default_permission_set")]
    pub permission_set: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_override: Option<IamCredentials>,
}

impl Default for GetIamCredentialOptions {
    fn default() -> Self {
        Self {
            call_sts_on_invalid_iam_credential: true,
            permission_set: default_permission_set(),
            credential_override: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetIamCredentialParams {
    pub profile_name: String,
    #[serde(default)]
    pub options: GetIamCredentialOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamCredential {
    pub id: String,
    pub kinds: Vec<ProfileKind>,
    pub credentials: IamCredentials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetIamCredentialResult {
    pub credential: IamCredential,
    pub update_credentials_params: UpdateCredentialsParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMfaCodeParams {
    pub profile_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_serial: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMfaCodeResult {
    pub code: String,
    pub mfa_serial: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateSsoTokenParams {
    pub sso_token_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateSsoTokenResult {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateStsCredentialParams {
    pub iam_credential_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateStsCredentialResult {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialChangedKind {
    Expired,
    Refreshed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoTokenChangedParams {
    pub kind: CredentialChangedKind,
    pub sso_token_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StsCredentialChangedParams {
    pub kind: CredentialChangedKind,
    pub sts_credential_id: String,
}

/// `$/progress` payload for an in-flight SSO login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoTokenProgressParams {
    pub token: String,
    pub value: GetSsoTokenProgress,
}

impl SsoTokenProgressParams {
    pub fn new(value: GetSsoTokenProgress) -> Self {
        Self {
            token: GET_SSO_TOKEN_PROGRESS_TOKEN.to_string(),
            value,
        }
    }
}

#[derive(Debug)]
pub enum SsoTokenChanged {}

impl Notification for SsoTokenChanged {
    type Params = SsoTokenChangedParams;
    const METHOD: &'static str = SSO_TOKEN_CHANGED;
}

#[derive(Debug)]
pub enum StsCredentialChanged {}

impl Notification for StsCredentialChanged {
    type Params = StsCredentialChangedParams;
    const METHOD: &'static str = STS_CREDENTIAL_CHANGED;
}

/// `$/progress` carrying a [`GetSsoTokenProgress`] instead of work-done progress.
#[derive(Debug)]
pub enum SsoTokenProgress {}

impl Notification for SsoTokenProgress {
    type Params = SsoTokenProgressParams;
    const METHOD: &'static str = "$/progress";
}

macro_rules! identity_request {
    ($(#[$meta:meta])* $name:ident, $method:expr, $params:ty => $result:ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub enum $name {}

        impl Request for $name {
            type Params = $params;
            type Result = $result;
            const METHOD: &'static str = $method;
        }
    };
}

identity_request!(ListProfiles, LIST_PROFILES, ListProfilesParams => ListProfilesResult);
identity_request!(UpdateProfile, UPDATE_PROFILE, UpdateProfileParams => UpdateProfileResult);
identity_request!(
    /// Returns a cached token or, when allowed, starts a login flow that reports
    /// through [`SsoTokenProgress`].
    GetSsoToken, GET_SSO_TOKEN, GetSsoTokenParams => GetSsoTokenResult
);
identity_request!(
    GetIamCredential,
    GET_IAM_CREDENTIAL,
    GetIamCredentialParams => GetIamCredentialResult
);
identity_request!(GetMfaCode, GET_MFA_CODE, GetMfaCodeParams => GetMfaCodeResult);
identity_request!(
    InvalidateSsoToken,
    INVALIDATE_SSO_TOKEN,
    InvalidateSsoTokenParams => InvalidateSsoTokenResult
);
identity_request!(
    InvalidateStsCredential,
    INVALIDATE_STS_CREDENTIAL,
    InvalidateStsCredentialParams => InvalidateStsCredentialResult
);

fn default_true() -> bool {
    true
}

fn default_permission_set() -> Vec<String> {
    permission_sets::Q.iter().map(ToString::to_string).collect()
}
