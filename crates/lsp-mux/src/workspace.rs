//! Workspace folder tracking.

use tower_lsp_server::ls_types::{
    InitializeParams, Uri, WorkspaceFolder, WorkspaceFoldersChangeEvent,
};

/// Ordered set of workspace folders, unique by normalized URI.
///
/// URIs are compared with any trailing `/` removed, so `file:///a` and
/// `file:///a/` name the same folder. The first spelling seen is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceFolderSet {
    folders: Vec<WorkspaceFolder>,
}

fn normalize(uri: &Uri) -> &str {
    uri.as_str().trim_end_matches('/')
}

/// Folder name derived from the last path segment of `uri`.
fn folder_name(uri: &Uri) -> String {
    uri.to_file_path()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| {
            normalize(uri)
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

#[allow(deprecated)]
fn root_uri(params: &InitializeParams) -> Option<Uri> {
    params.root_uri.clone()
}

impl WorkspaceFolderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the set from the initialize handshake.
    ///
    /// An explicit, non-empty folder list wins; otherwise a single folder is
    /// synthesized from `rootUri` when present.
    pub fn from_initialize_params(params: &InitializeParams) -> Self {
        let mut set = Self::new();

        match params.workspace_folders.as_deref() {
            Some(folders) if !folders.is_empty() => set.extend(folders.iter().cloned()),
            _ => {
                if let Some(root) = root_uri(params) {
                    set.insert(WorkspaceFolder {
                        name: folder_name(&root),
                        uri: root,
                    });
                }
            }
        }

        set
    }

    pub fn contains(&self, uri: &Uri) -> bool {
        let key = normalize(uri);
        self.folders.iter().any(|f| normalize(&f.uri) == key)
    }

    /// Appends `folder` unless an equivalent URI is already present.
    pub fn insert(&mut self, folder: WorkspaceFolder) -> bool {
        if self.contains(&folder.uri) {
            return false;
        }
        self.folders.push(folder);
        true
    }

    pub fn extend(&mut self, folders: impl IntoIterator<Item = WorkspaceFolder>) {
        for folder in folders {
            self.insert(folder);
        }
    }

    /// Applies a `workspace/didChangeWorkspaceFolders` event: removals first,
    /// then additions in event order.
    pub fn apply(&mut self, event: &WorkspaceFoldersChangeEvent) {
        let removed: Vec<&str> = event.removed.iter().map(|f| normalize(&f.uri)).collect();
        self.folders
            .retain(|folder| !removed.contains(&normalize(&folder.uri)));
        self.extend(event.added.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkspaceFolder> {
        self.folders.iter()
    }

    pub fn to_vec(&self) -> Vec<WorkspaceFolder> {
        self.folders.clone()
    }
}
