use serde::Deserialize;
use serde_json::{Map, Value};
use tower_lsp_server::ls_types::InitializeParams;

/// Environment variable overriding the advertised server name.
pub const SERVER_NAME_ENV: &str = "LSP_MUX_SERVER_NAME";

/// Identity of the runtime, advertised in the default initialize fragment.
///
/// # Examples
///
/// ```
/// use lsp_mux::config::RuntimeConfig;
///
/// let config = RuntimeConfig::new("Q Language Server", "1.2.0");
/// assert_eq!(config.name, "Q Language Server");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub name: String,
    pub version: String,
}

impl RuntimeConfig {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Package name and version, with the name overridable through
    /// [`SERVER_NAME_ENV`].
    pub fn from_env() -> Self {
        let name = std::env::var(SERVER_NAME_ENV)
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
        Self::new(name, env!("CARGO_PKG_VERSION"))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// Client supplied `initializationOptions`.
///
/// Only the `aws` block is interpreted; anything else is kept for feature
/// servers, which receive the raw initialize params anyway.
///
/// # Examples
///
/// ```
/// use lsp_mux::config::InitializationOptions;
///
/// let json = r#"{
///     "aws": {
///         "clientInfo": {"name": "vscode"},
///         "awsClientCapabilities": {"window": {"notifications": true}}
///     }
/// }"#;
///
/// let options: InitializationOptions = serde_json::from_str(json).unwrap();
/// assert!(options.client_supports_notifications());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitializationOptions {
    #[serde(default)]
    pub aws: Option<AwsInitializationOptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsInitializationOptions {
    #[serde(default)]
    pub client_info: Option<Value>,
    #[serde(default)]
    pub aws_client_capabilities: AwsClientCapabilities,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsClientCapabilities {
    #[serde(default)]
    pub window: WindowCapabilities,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowCapabilities {
    #[serde(default)]
    pub notifications: bool,
}

impl InitializationOptions {
    /// Parses the options carried by `params`.
    ///
    /// Malformed options are treated as absent.
    pub fn from_params(params: &InitializeParams) -> Self {
        let Some(raw) = params.initialization_options.clone() else {
            return Self::default();
        };

        serde_json::from_value(raw).unwrap_or_else(|e| {
            tracing::debug!("ignoring malformed initialization options: {}", e);
            Self::default()
        })
    }

    pub fn client_supports_notifications(&self) -> bool {
        self.aws
            .as_ref()
            .is_some_and(|aws| aws.aws_client_capabilities.window.notifications)
    }
}
