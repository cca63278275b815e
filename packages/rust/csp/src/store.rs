//! Persisted allow-list stores.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};
use vanbuilder_shared::{Result, VanBuilderError};

use crate::allowlist::AllowList;
use crate::policy::PolicyDocument;

/// Where the `img-src` allow-list lives.
pub trait PolicyStore {
    /// Read the current allow-list.
    fn load(&self) -> Result<AllowList>;

    /// Append origins that are not yet listed; returns the ones added.
    /// Existing entries keep their order.
    fn append(&self, origins: &[String]) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// FilePolicyStore
// ---------------------------------------------------------------------------

/// A policy file on disk, rewritten through a sibling temp file and a rename.
#[derive(Debug, Clone)]
pub struct FilePolicyStore {
    path: PathBuf,
}

impl FilePolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<PolicyDocument> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| VanBuilderError::io(&self.path, e))?;
        PolicyDocument::parse(text)
    }

    fn write_atomic(&self, text: &str) -> Result<()> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "policy".into());
        let tmp = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));

        std::fs::write(&tmp, text).map_err(|e| VanBuilderError::io(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(VanBuilderError::io(&self.path, e));
        }
        Ok(())
    }
}

impl PolicyStore for FilePolicyStore {
    fn load(&self) -> Result<AllowList> {
        let list = self.read()?.allow_list();
        debug!(path = %self.path.display(), entries = list.len(), "policy loaded");
        Ok(list)
    }

    fn append(&self, origins: &[String]) -> Result<Vec<String>> {
        let mut doc = self.read()?;
        let added = doc.append(origins)?;
        if added.is_empty() {
            return Ok(added);
        }
        self.write_atomic(doc.text())?;
        info!(path = %self.path.display(), added = ?added, "policy amended");
        Ok(added)
    }
}

// ---------------------------------------------------------------------------
// MemoryPolicyStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct MemoryState {
    text: String,
    read_only: bool,
    writes: usize,
}

/// In-memory policy text. Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct MemoryPolicyStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPolicyStore {
    /// Store holding `text`, which must contain an `img-src` list.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                text: text.into(),
                read_only: false,
                writes: 0,
            })),
        }
    }

    /// Store with a plain `img-src` list of the given entries.
    pub fn with_entries(entries: &[&str]) -> Self {
        let body = entries
            .iter()
            .map(|e| format!("    \"{e}\",\n"))
            .collect::<String>();
        Self::new(format!("export const cspPolicy = {{\n  'img-src': [\n{body}  ],\n}};\n"))
    }

    /// Reject every append, as an unwritable file would.
    pub fn read_only(self) -> Self {
        self.lock().read_only = true;
        self
    }

    pub fn text(&self) -> String {
        self.lock().text.clone()
    }

    /// Number of appends that changed the text.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn load(&self) -> Result<AllowList> {
        Ok(PolicyDocument::parse(self.text())?.allow_list())
    }

    fn append(&self, origins: &[String]) -> Result<Vec<String>> {
        let mut state = self.lock();
        let mut doc = PolicyDocument::parse(state.text.clone())?;
        let added = doc.append(origins)?;
        if added.is_empty() {
            return Ok(added);
        }
        if state.read_only {
            return Err(VanBuilderError::CspRemediation("policy store is read-only".into()));
        }
        state.text = doc.into_text();
        state.writes += 1;
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_policy(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vanbuilder-csp-{}.js", uuid::Uuid::now_v7()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn file_store_appends_and_reloads() {
        let path = temp_policy("module.exports = {\n  imgSrc: [\n    \"'self'\",\n    \"data:\"\n  ]\n};\n");
        let store = FilePolicyStore::new(&path);

        let added = store.append(&["https://cdn.example-van.test".into()]).unwrap();
        assert_eq!(added, vec!["https://cdn.example-van.test"]);
        assert!(store.load().unwrap().allows("https://cdn.example-van.test"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "module.exports = {\n  imgSrc: [\n    \"'self'\",\n    \"data:\",\n    \"https://cdn.example-van.test\"\n  ]\n};\n"
        );

        // Second call leaves the file alone.
        assert!(store.append(&["https://cdn.example-van.test".into()]).unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let store = FilePolicyStore::new(std::env::temp_dir().join("vanbuilder-no-such-policy.js"));
        assert!(matches!(store.load().unwrap_err(), VanBuilderError::Io { .. }));
    }

    #[test]
    fn memory_store_clones_share_state() {
        let store = MemoryPolicyStore::with_entries(&["'self'", "data:"]);
        let handle = store.clone();
        store.append(&["https://a.test".into()]).unwrap();
        assert!(handle.load().unwrap().allows("https://a.test"));
        assert_eq!(handle.writes(), 1);
    }

    #[test]
    fn read_only_store_rejects_new_origins() {
        let store = MemoryPolicyStore::with_entries(&["'self'"]).read_only();
        let err = store.append(&["https://a.test".into()]).unwrap_err();
        assert!(matches!(err, VanBuilderError::CspRemediation(_)));
        // Nothing to add is not a write.
        assert!(store.append(&[]).unwrap().is_empty());
    }
}
