use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tower_lsp_server::jsonrpc;

/// JSON-RPC `MethodNotFound`.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC `InvalidParams`.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC `InternalError`.
pub const INTERNAL_ERROR: i64 = -32603;
/// LSP `RequestFailed`, the default code for vendor errors.
pub const REQUEST_FAILED: i64 = -32803;

macro_rules! aws_error_codes {
    ($($variant:ident => $code:literal,)+) => {
        /// Vendor error codes carried in `data.awsErrorCode` of a structured error.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[non_exhaustive]
        pub enum AwsErrorCode {
            $(
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl AwsErrorCode {
            /// Returns the wire form of the code (e.g. `E_TIMEOUT`).
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }
        }
    };
}

aws_error_codes! {
    CannotCreateProfile => "E_CANNOT_CREATE_PROFILE",
    CannotCreateSsoSession => "E_CANNOT_CREATE_SSO_SESSION",
    CannotOverwriteProfile => "E_CANNOT_OVERWRITE_PROFILE",
    CannotOverwriteSsoSession => "E_CANNOT_OVERWRITE_SSO_SESSION",
    CannotReadSharedConfig => "E_CANNOT_READ_SHARED_CONFIG",
    CannotReadSsoCache => "E_CANNOT_READ_SSO_CACHE",
    CannotReadStsCache => "E_CANNOT_READ_STS_CACHE",
    CannotRefreshSsoToken => "E_CANNOT_REFRESH_SSO_TOKEN",
    CannotRefreshStsCredential => "E_CANNOT_REFRESH_STS_CREDENTIAL",
    CannotRegisterClient => "E_CANNOT_REGISTER_CLIENT",
    CannotCreateSsoToken => "E_CANNOT_CREATE_SSO_TOKEN",
    CannotCreateStsCredential => "E_CANNOT_CREATE_STS_CREDENTIAL",
    CannotWriteSharedConfig => "E_CANNOT_WRITE_SHARED_CONFIG",
    CannotWriteSsoCache => "E_CANNOT_WRITE_SSO_CACHE",
    CannotWriteStsCache => "E_CANNOT_WRITE_STS_CACHE",
    EncryptionRequired => "E_ENCRYPTION_REQUIRED",
    InvalidProfile => "E_INVALID_PROFILE",
    InvalidSsoClient => "E_INVALID_SSO_CLIENT",
    InvalidSsoSession => "E_INVALID_SSO_SESSION",
    InvalidSsoToken => "E_INVALID_SSO_TOKEN",
    InvalidStsCredential => "E_INVALID_STS_CREDENTIAL",
    ProfileNotFound => "E_PROFILE_NOT_FOUND",
    RuntimeNotSupported => "E_RUNTIME_NOT_SUPPORTED",
    SsoSessionNotFound => "E_SSO_SESSION_NOT_FOUND",
    SsoTokenExpired => "E_SSO_TOKEN_EXPIRED",
    StsCredentialExpired => "E_STS_CREDENTIAL_EXPIRED",
    SsoTokenSourceNotSupported => "E_SSO_TOKEN_SOURCE_NOT_SUPPORTED",
    CallerIdentityNotFound => "E_CALLER_IDENTITY_NOT_FOUND",
    MfaRequired => "E_MFA_REQUIRED",
    PermissionDenied => "E_PERMISSION_DENIED",
    Timeout => "E_TIMEOUT",
    Unknown => "E_UNKNOWN",
    Cancelled => "E_CANCELLED",
}

impl std::fmt::Display for AwsErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured protocol error returned by feature servers and by the router.
///
/// This is the error shape every handler speaks: a numeric JSON-RPC code, a
/// human readable message, an optional vendor code and optional structured data.
/// Converting into [`jsonrpc::Error`] folds the vendor code into
/// `data.awsErrorCode`.
///
/// # Examples
///
/// ```
/// use lsp_mux_core::error::{AwsErrorCode, ResponseError};
///
/// let err = ResponseError::aws("token expired", AwsErrorCode::SsoTokenExpired);
/// assert_eq!(err.to_string(), "token expired");
/// assert_eq!(err.aws_error_code, Some(AwsErrorCode::SsoTokenExpired));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_error_code: Option<AwsErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            aws_error_code: None,
            data: None,
        }
    }

    /// Vendor error with the `RequestFailed` code.
    pub fn aws(message: impl Into<String>, aws_error_code: AwsErrorCode) -> Self {
        Self {
            aws_error_code: Some(aws_error_code),
            ..Self::new(REQUEST_FAILED, message)
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(METHOD_NOT_FOUND, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<ResponseError> for jsonrpc::Error {
    fn from(err: ResponseError) -> Self {
        let data = match (err.aws_error_code, err.data) {
            (None, data) => data,
            (Some(code), Some(Value::Object(mut map))) => {
                map.insert("awsErrorCode".into(), code.as_str().into());
                Some(Value::Object(map))
            }
            (Some(code), other) => {
                let mut map = Map::new();
                map.insert("awsErrorCode".into(), code.as_str().into());
                if let Some(details) = other {
                    map.insert("details".into(), details);
                }
                Some(Value::Object(map))
            }
        };

        Self {
            code: jsonrpc::ErrorCode::from(err.code),
            message: err.message.into(),
            data,
        }
    }
}

/// Error types for the lsp-mux router.
///
/// Router-level failures that are not produced by a feature server. All of them
/// can be lowered into a [`ResponseError`] for the client.
#[derive(Error, Debug)]
pub enum MuxError {
    #[error("Duplicate servers defined: {}", .0.join(", "))]
    DuplicateServers(Vec<String>),

    #[error("invalid notification id: {0}")]
    InvalidNotificationId(String),

    #[error("server handler panicked: {0}")]
    HandlerPanicked(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl From<MuxError> for ResponseError {
    fn from(err: MuxError) -> Self {
        match err {
            MuxError::Response(inner) => inner,
            other => Self::internal(other.to_string()),
        }
    }
}

/// Convenience type alias for `Result<T, MuxError>`.
pub type Result<T> = std::result::Result<T, MuxError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_servers_display() {
        let error = MuxError::DuplicateServers(vec!["A".into(), "B".into()]);
        assert_eq!(error.to_string(), "Duplicate servers defined: A, B");
    }

    #[test]
    fn test_aws_error_code_wire_form() {
        assert_eq!(AwsErrorCode::Timeout.as_str(), "E_TIMEOUT");
        assert_eq!(
            serde_json::to_value(AwsErrorCode::MfaRequired).unwrap(),
            json!("E_MFA_REQUIRED")
        );
        let parsed: AwsErrorCode = serde_json::from_value(json!("E_CANCELLED")).unwrap();
        assert_eq!(parsed, AwsErrorCode::Cancelled);
    }

    #[test]
    fn test_response_error_into_jsonrpc_without_vendor_code() {
        let err = ResponseError::new(111, "failed").with_data(json!({"retry": false}));
        let rpc: jsonrpc::Error = err.into();
        assert_eq!(rpc.code, jsonrpc::ErrorCode::from(111));
        assert_eq!(rpc.message, "failed");
        assert_eq!(rpc.data, Some(json!({"retry": false})));
    }

    #[test]
    fn test_response_error_into_jsonrpc_merges_vendor_code() {
        let err = ResponseError::aws("denied", AwsErrorCode::PermissionDenied)
            .with_data(json!({"profile": "default"}));
        let rpc: jsonrpc::Error = err.into();
        assert_eq!(rpc.code, jsonrpc::ErrorCode::from(REQUEST_FAILED));
        assert_eq!(
            rpc.data,
            Some(json!({"profile": "default", "awsErrorCode": "E_PERMISSION_DENIED"}))
        );
    }

    #[test]
    fn test_response_error_vendor_code_with_scalar_data() {
        let err = ResponseError::aws("timed out", AwsErrorCode::Timeout).with_data(json!(30));
        let rpc: jsonrpc::Error = err.into();
        assert_eq!(
            rpc.data,
            Some(json!({"awsErrorCode": "E_TIMEOUT", "details": 30}))
        );
    }

    #[test]
    fn test_mux_error_lowering_keeps_response_verbatim() {
        let original = ResponseError::new(111, "failed");
        let lowered: ResponseError = MuxError::Response(original.clone()).into();
        assert_eq!(lowered, original);

        let lowered: ResponseError = MuxError::DuplicateServers(vec!["A".into()]).into();
        assert_eq!(lowered.code, INTERNAL_ERROR);
        assert_eq!(lowered.message, "Duplicate servers defined: A");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Value>("{").unwrap_err();
        let error: MuxError = json_err.into();
        assert!(error.to_string().contains("JSON error"));
    }
}
