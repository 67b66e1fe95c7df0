//! Load-request identity resolution
//!
//! Every load request is classified as a builtin unit, an external package,
//! or a relative/absolute file, then turned into the absolute identity the
//! dependency tree deduplicates on.

use crate::error::{Result, VigiaError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Units provided by the platform itself
pub const BUILTIN_UNITS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "stream/promises",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Directory holding vendored packages
pub const PACKAGES_DIR: &str = "node_modules";

/// Package manifest file inside a package directory
pub const MANIFEST_FILE: &str = "package.json";

/// Entry point used when a manifest declares none
pub const DEFAULT_ENTRY: &str = "index.js";

/// Identity of the process entry unit as seen by requesters
pub const ENTRY_ID: &str = ".";

/// What kind of unit a request names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Builtin,
    Package,
    RelativeFile,
}

/// The unit performing a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// Identity used to locate the requester in the tree (`.` for the entry unit)
    pub id: String,
    /// File backing the requester
    pub filename: PathBuf,
}

impl Requester {
    pub fn new(id: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
        }
    }

    /// A requester identified by its own file path
    pub fn from_file(filename: impl Into<PathBuf>) -> Self {
        let filename = filename.into();
        Self {
            id: filename.to_string_lossy().into_owned(),
            filename,
        }
    }

    /// The process entry unit
    pub fn entry(filename: impl Into<PathBuf>) -> Self {
        Self::new(ENTRY_ID, filename)
    }

    fn dir(&self) -> &Path {
        self.filename.parent().unwrap_or_else(|| Path::new("/"))
    }
}

/// A classified request with its absolute identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRequest {
    pub kind: RequestKind,
    pub identity: String,
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    main: Option<String>,
}

/// Classify a raw request string
pub fn classify(request: &str) -> RequestKind {
    if BUILTIN_UNITS.contains(&request) {
        return RequestKind::Builtin;
    }
    let has_marker = request == "."
        || request == ".."
        || request.starts_with("./")
        || request.starts_with("../")
        || request.starts_with('/');
    let has_extension = Path::new(request).extension().is_some();
    if has_marker || has_extension {
        RequestKind::RelativeFile
    } else {
        RequestKind::Package
    }
}

/// Stripped form of an identity: a trailing `index.<ext>` names its
/// directory, otherwise the file extension is dropped.
pub fn unit_stem(identity: &str) -> Cow<'_, str> {
    let path = Path::new(identity);
    if path.extension().is_none() {
        return Cow::Borrowed(identity);
    }
    if path.file_stem().is_some_and(|stem| stem == "index") {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            return Cow::Owned(dir.to_string_lossy().into_owned());
        }
    }
    Cow::Owned(path.with_extension("").to_string_lossy().into_owned())
}

/// Whether two identities name the same unit: equal, or one is the other
/// without its extension, or one is the directory of the other's `index.*`.
/// Two files that only share a stem (`a.js`, `a.json`) stay distinct.
pub fn same_unit(a: &str, b: &str) -> bool {
    a == b || names_bare(a, b) || names_bare(b, a)
}

fn names_bare(bare: &str, full: &str) -> bool {
    let (bare, full) = (Path::new(bare), Path::new(full));
    if bare.extension().is_some() || full.extension().is_none() {
        return false;
    }
    full.with_extension("") == bare
        || (full.file_stem().is_some_and(|stem| stem == "index") && full.parent() == Some(bare))
}

/// Resolves load requests relative to a fixed entry unit
#[derive(Debug, Clone)]
pub struct Resolver {
    entry: PathBuf,
}

impl Resolver {
    /// `entry` is the absolute path of the process entry unit
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
        }
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    fn entry_dir(&self) -> &Path {
        self.entry.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// Classify `request` and compute its identity
    ///
    /// # Errors
    /// `VigiaError::Resolution` when a package cannot be found in any
    /// candidate directory.
    pub fn resolve(&self, request: &str, requester: Option<&Requester>) -> Result<ResolvedRequest> {
        let kind = classify(request);
        let identity = match kind {
            RequestKind::Builtin => request.to_string(),
            RequestKind::Package => self
                .resolve_package(request, requester)?
                .to_string_lossy()
                .into_owned(),
            RequestKind::RelativeFile => {
                let base = requester.map(Requester::dir).unwrap_or_else(|| self.entry_dir());
                normalize(&base.join(request)).to_string_lossy().into_owned()
            }
        };
        debug!(request, identity = %identity, ?kind, "resolved load request");
        Ok(ResolvedRequest { kind, identity })
    }

    fn resolve_package(&self, request: &str, requester: Option<&Requester>) -> Result<PathBuf> {
        for root in self.lookup_roots(requester) {
            let candidate = root.join(PACKAGES_DIR).join(request);
            if let Some(found) = entry_point(&candidate) {
                return Ok(normalize(&found));
            }
        }
        Err(VigiaError::Resolution {
            request: request.to_string(),
            requester: requester
                .map(|r| r.id.clone())
                .unwrap_or_else(|| ENTRY_ID.to_string()),
        })
    }

    /// Directories whose `node_modules` are searched, in order: the entry
    /// unit's directory, the requester's directory, then every ancestor of
    /// the requester's directory up to the root.
    fn lookup_roots(&self, requester: Option<&Requester>) -> Vec<PathBuf> {
        let requester_dir = requester.map(Requester::dir).unwrap_or_else(|| self.entry_dir());
        let mut roots: Vec<PathBuf> = Vec::new();
        let candidates = std::iter::once(self.entry_dir()).chain(requester_dir.ancestors());
        for dir in candidates {
            // Skip `node_modules` directories themselves, their parent covers them
            if dir.file_name().is_some_and(|name| name == PACKAGES_DIR) {
                continue;
            }
            if !roots.iter().any(|r| r == dir) {
                roots.push(dir.to_path_buf());
            }
        }
        roots
    }
}

/// Entry file of a package candidate, if it exists on disk
fn entry_point(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    let with_js = candidate.with_extension("js");
    if candidate.extension().is_none() && with_js.is_file() {
        return Some(with_js);
    }
    if !candidate.is_dir() {
        return None;
    }

    let manifest = candidate.join(MANIFEST_FILE);
    let main = fs::read_to_string(&manifest)
        .ok()
        .and_then(|content| serde_json::from_str::<PackageManifest>(&content).ok())
        .and_then(|m| m.main)
        .filter(|m| !m.is_empty());

    if let Some(main) = main {
        let declared = candidate.join(&main);
        for path in [
            declared.clone(),
            declared.with_extension("js"),
            declared.join(DEFAULT_ENTRY),
        ] {
            if path.is_file() {
                return Some(path);
            }
        }
    }

    let index = candidate.join(DEFAULT_ENTRY);
    index.is_file().then_some(index)
}

/// Lexically normalize a path: drop `.` components and fold `..`
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("fs"), RequestKind::Builtin);
        assert_eq!(classify("fs/promises"), RequestKind::Builtin);
        assert_eq!(classify("lodash"), RequestKind::Package);
        assert_eq!(classify("@scope/pkg"), RequestKind::Package);
        assert_eq!(classify("./a"), RequestKind::RelativeFile);
        assert_eq!(classify("../lib/b"), RequestKind::RelativeFile);
        assert_eq!(classify("/abs/c"), RequestKind::RelativeFile);
        assert_eq!(classify("data.json"), RequestKind::RelativeFile);
    }

    #[test]
    fn test_unit_stem() {
        assert_eq!(unit_stem("/p/lib/index.js"), "/p/lib");
        assert_eq!(unit_stem("/p/lib/util.js"), "/p/lib/util");
        assert_eq!(unit_stem("/p/lib/util"), "/p/lib/util");
        assert_eq!(unit_stem("."), ".");
    }

    #[test]
    fn test_same_unit_tolerates_index_and_extension() {
        assert!(same_unit("/p/lib", "/p/lib/index.js"));
        assert!(same_unit("/p/a.js", "/p/a"));
        assert!(!same_unit("/p/a.js", "/p/b.js"));
    }

    #[test]
    fn test_same_unit_keeps_shared_stems_apart() {
        assert!(!same_unit("/p/a.js", "/p/a.json"));
        assert!(!same_unit("/p/lib.js", "/p/lib/index.js"));
        assert!(!same_unit("/p/lib/index.js", "/p/lib/index.json"));
        assert!(same_unit("/p/lib/index.js", "/p/lib"));
    }

    #[test]
    fn test_builtin_identity_is_name() {
        let resolver = Resolver::new("/app/main.js");
        let resolved = resolver.resolve("path", None).unwrap();
        assert_eq!(resolved.kind, RequestKind::Builtin);
        assert_eq!(resolved.identity, "path");
    }

    #[test]
    fn test_relative_file_joins_requester_dir() {
        let resolver = Resolver::new("/app/main.js");
        let requester = Requester::from_file("/app/lib/a.js");
        let resolved = resolver.resolve("../util/b.js", Some(&requester)).unwrap();
        assert_eq!(resolved.identity, "/app/util/b.js");
        assert_eq!(resolved.kind, RequestKind::RelativeFile);
    }

    #[test]
    fn test_relative_file_without_requester_uses_entry_dir() {
        let resolver = Resolver::new("/app/main.js");
        let resolved = resolver.resolve("./b", None).unwrap();
        assert_eq!(resolved.identity, "/app/b");
    }

    #[test]
    fn test_package_resolves_manifest_main() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("main.js"), "");
        write(
            &root.join("node_modules/lodash/package.json"),
            r#"{"name": "lodash", "main": "lodash.js"}"#,
        );
        write(&root.join("node_modules/lodash/lodash.js"), "");

        let resolver = Resolver::new(root.join("main.js"));
        let requester = Requester::entry(root.join("main.js"));
        let resolved = resolver.resolve("lodash", Some(&requester)).unwrap();
        assert_eq!(resolved.kind, RequestKind::Package);
        assert_eq!(
            PathBuf::from(resolved.identity),
            root.join("node_modules/lodash/lodash.js")
        );
    }

    #[test]
    fn test_package_defaults_to_index() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("node_modules/tiny/package.json"), r#"{"name": "tiny"}"#);
        write(&root.join("node_modules/tiny/index.js"), "");

        let resolver = Resolver::new(root.join("main.js"));
        let resolved = resolver.resolve("tiny", None).unwrap();
        assert_eq!(
            PathBuf::from(resolved.identity),
            root.join("node_modules/tiny/index.js")
        );
    }

    #[test]
    fn test_package_found_in_ancestor_of_requester() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("node_modules/dep/index.js"), "");
        write(&root.join("app/src/deep/file.js"), "");

        let resolver = Resolver::new(root.join("app/main.js"));
        let requester = Requester::from_file(root.join("app/src/deep/file.js"));
        let resolved = resolver.resolve("dep", Some(&requester)).unwrap();
        assert_eq!(PathBuf::from(resolved.identity), root.join("node_modules/dep/index.js"));
    }

    #[test]
    fn test_entry_dir_searched_before_requester_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("node_modules/dup/index.js"), "");
        write(&root.join("node_modules/other/node_modules/dup/index.js"), "");

        let resolver = Resolver::new(root.join("main.js"));
        let requester = Requester::from_file(root.join("node_modules/other/index.js"));
        let resolved = resolver.resolve("dup", Some(&requester)).unwrap();
        assert_eq!(PathBuf::from(resolved.identity), root.join("node_modules/dup/index.js"));
    }

    #[test]
    fn test_missing_package_is_resolution_error() {
        let dir = TempDir::new().unwrap();
        let resolver = Resolver::new(dir.path().join("main.js"));
        let err = resolver.resolve("does-not-exist", None).unwrap_err();
        assert!(matches!(err, VigiaError::Resolution { .. }));
        assert!(err.to_string().contains("does-not-exist"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/../../..")), PathBuf::from("/"));
    }
}
