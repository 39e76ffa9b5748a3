use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_lsp_server::ls_types::{
    InitializeResult, SaveOptions, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions,
};

/// Initialize result as returned by a single feature server.
///
/// Every field is optional: a server only declares what it contributes. Unknown
/// top-level fields are preserved in `extra` so the merge can carry them through.
///
/// # Examples
///
/// ```
/// use lsp_mux_core::protocol::PartialInitializeResult;
/// use serde_json::json;
///
/// let partial: PartialInitializeResult = serde_json::from_value(json!({
///     "serverInfo": {"name": "Chat Server"},
///     "capabilities": {"executeCommandProvider": {"commands": ["chat.clear"]}},
///     "awsServerCapabilities": {"configurationProvider": {"sections": ["aws.q"]}}
/// }))
/// .unwrap();
///
/// assert_eq!(partial.server_name(), Some("Chat Server"));
/// assert_eq!(partial.commands(), ["chat.clear".to_string()]);
/// assert_eq!(partial.configuration_sections(), ["aws.q".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialInitializeResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_server_capabilities: Option<AwsServerCapabilities>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Vendor capability block advertised next to the standard capabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_provider: Option<ConfigurationProvider>,
    /// Feature specific blocks such as `chatOptions`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Configuration sections a server answers for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationProvider {
    #[serde(default)]
    pub sections: Vec<String>,
}

impl PartialInitializeResult {
    /// The fragment every merge starts from: runtime identity and text sync.
    pub fn runtime_defaults(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            server_info: Some(ServerInfo {
                name: name.into(),
                version: Some(version.into()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Declared server name, if present and non-empty.
    pub fn server_name(&self) -> Option<&str> {
        self.server_info
            .as_ref()
            .map(|info| info.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Commands advertised through `executeCommandProvider`.
    pub fn commands(&self) -> &[String] {
        self.capabilities
            .execute_command_provider
            .as_ref()
            .map_or(&[], |provider| provider.commands.as_slice())
    }

    /// Sections advertised through `awsServerCapabilities.configurationProvider`.
    pub fn configuration_sections(&self) -> &[String] {
        self.aws_server_capabilities
            .as_ref()
            .and_then(|aws| aws.configuration_provider.as_ref())
            .map_or(&[], |provider| provider.sections.as_slice())
    }

    /// Standard-only projection of this result.
    ///
    /// `awsServerCapabilities` and unknown top-level fields have no slot in
    /// `InitializeResult`; the full document is the serialized form of `self`.
    pub fn into_initialize_result(self) -> InitializeResult {
        InitializeResult {
            capabilities: self.capabilities,
            server_info: self.server_info,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tower_lsp_server::ls_types::ExecuteCommandOptions;

    #[test]
    fn test_runtime_defaults_wire_shape() {
        let defaults = PartialInitializeResult::runtime_defaults("mux", "1.0.0");
        assert_eq!(
            serde_json::to_value(defaults).unwrap(),
            json!({
                "serverInfo": {"name": "mux", "version": "1.0.0"},
                "capabilities": {
                    "textDocumentSync": {
                        "openClose": true,
                        "change": 2,
                        "save": {"includeText": true}
                    }
                }
            })
        );
    }

    #[test]
    fn test_empty_object_deserializes_to_default() {
        let partial: PartialInitializeResult = serde_json::from_value(json!({})).unwrap();
        assert_eq!(partial, PartialInitializeResult::default());
        assert_eq!(partial.server_name(), None);
        assert!(partial.commands().is_empty());
        assert!(partial.configuration_sections().is_empty());
    }

    #[test]
    fn test_empty_server_name_is_absent() {
        let partial = PartialInitializeResult {
            server_info: Some(ServerInfo {
                name: String::new(),
                version: None,
            }),
            ..Default::default()
        };
        assert_eq!(partial.server_name(), None);
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let value = json!({"extraField": "extraValue"});
        let partial: PartialInitializeResult = serde_json::from_value(value).unwrap();
        assert_eq!(partial.extra.get("extraField"), Some(&json!("extraValue")));
        let back = serde_json::to_value(&partial).unwrap();
        assert_eq!(back["extraField"], "extraValue");
    }

    #[test]
    fn test_commands_from_typed_capabilities() {
        let partial = PartialInitializeResult {
            capabilities: ServerCapabilities {
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec!["run".into()],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(partial.commands(), ["run".to_string()]);
    }

    #[test]
    fn test_serialized_form_keeps_vendor_block_and_extra_fields() {
        let partial: PartialInitializeResult = serde_json::from_value(json!({
            "serverInfo": {"name": "mux"},
            "capabilities": {"hoverProvider": true},
            "awsServerCapabilities": {
                "configurationProvider": {"sections": ["aws.q"]},
                "chatOptions": {"history": true}
            },
            "extraField": "extraValue"
        }))
        .unwrap();

        let wire = serde_json::to_value(&partial).unwrap();
        assert_eq!(wire["extraField"], "extraValue");
        assert_eq!(
            wire["awsServerCapabilities"]["chatOptions"],
            json!({"history": true})
        );

        let result = partial.into_initialize_result();
        assert_eq!(result.server_info.unwrap().name, "mux");
        assert_eq!(result.capabilities.experimental, None);
    }
}
