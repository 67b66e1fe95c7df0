//! Watch session: configuration, installed hooks and explicit shutdown
//!
//! A session is created once per observed process. Facades built from it
//! share one registry and one probe, so installing a facade twice reuses
//! the hooks already in place.

use crate::config::Config;
use crate::dependency_tree::DependencyTree;
use crate::error::Result;
use crate::export;
use crate::intercept::{Loader, Registry};
use crate::json_output::TreeDocument;
use crate::platform::{Network, OutboundRequest, Processes, Storage};
use crate::probe::Probe;
use crate::resolver::Requester;
use crate::stats::AggregatedSummary;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// What shutdown produced
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub summary: AggregatedSummary,
    pub tree: TreeDocument,
    /// Where the summary went, if it was written to a file
    pub summary_path: Option<PathBuf>,
    /// Where the dependency tree was written, if anywhere
    pub tree_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Session {
    probe: Arc<Probe>,
    registry: Registry,
}

impl Session {
    /// Start watching the process whose entry unit is `entry`
    pub fn new(config: Config, entry: impl Into<PathBuf>) -> Self {
        let entry = entry.into();
        info!(
            "Watching {} ({})",
            entry.display(),
            config.modules.iter().map(|s| s.key()).collect::<Vec<_>>().join(",")
        );
        let probe = Arc::new(Probe::new(config, entry));
        Self {
            registry: Registry::new(Arc::clone(&probe)),
            probe,
        }
    }

    pub fn config(&self) -> &Config {
        self.probe.config()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn probe(&self) -> &Arc<Probe> {
        &self.probe
    }

    /// The entry unit as a requester
    pub fn entry(&self) -> Requester {
        Requester::entry(self.probe.entry())
    }

    pub fn storage(&self) -> Result<Storage> {
        Storage::install(&self.registry)
    }

    pub fn processes(&self) -> Result<Processes> {
        Processes::install(&self.registry)
    }

    pub fn network<R, P, S>(&self, plain: P, secure: S) -> Result<Network<R>>
    where
        R: 'static,
        P: Fn(OutboundRequest) -> R + Send + Sync + 'static,
        S: Fn(OutboundRequest) -> R + Send + Sync + 'static,
    {
        Network::install(&self.registry, plain, secure)
    }

    /// Wrap the caller's module loader
    pub fn loader<R, F>(&self, original: F) -> Result<Loader<R>>
    where
        R: 'static,
        F: Fn(&str, Option<&Requester>) -> R + Send + Sync + 'static,
    {
        self.registry.install_loader(original)
    }

    pub fn tree(&self) -> DependencyTree {
        self.probe.tree()
    }

    /// Finalize the summary and write the shutdown artifacts.
    ///
    /// The summary record is written only when aggregation is on; the tree
    /// document only when a tree output path is configured. Later calls
    /// return `AlreadyFinalized` and write nothing.
    ///
    /// Both artifacts are attempted even when the first one fails, since
    /// nothing can be written once the probe is finalized.
    ///
    /// # Errors
    /// `AlreadyFinalized` after the first call, or the first export failure.
    pub fn shutdown(&self) -> Result<ShutdownReport> {
        let (summary, tree) = self.probe.finalize()?;
        let config = self.probe.config();

        let summary_written = if config.summary {
            self.probe.exporter().write_summary(&summary)
        } else {
            Ok(())
        };
        let tree_path = config.require_tree_output.as_deref().map(Path::to_path_buf);
        let tree_written = match &tree_path {
            Some(path) => export::write_tree(path, &tree),
            None => Ok(()),
        };
        summary_written.and(tree_written)?;

        debug!(subsystems = summary.subsystems().count(), "shutdown complete");
        Ok(ShutdownReport {
            summary_path: config.output.clone().filter(|_| config.summary),
            tree_path,
            summary,
            tree,
        })
    }

    pub fn is_shut_down(&self) -> bool {
        self.probe.is_finalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VigiaError;
    use crate::filter::Subsystem;
    use std::fs;
    use tempfile::TempDir;

    fn session(dir: &TempDir, config: Config) -> Session {
        Session::new(config, dir.path().join("main.js"))
    }

    #[test]
    fn test_shutdown_writes_summary_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("summary.log");
        let session = session(
            &dir,
            Config {
                output: Some(out.clone()),
                ..Config::default()
            },
        );
        let storage = session.storage().unwrap();
        storage.write(dir.path().join("a.txt"), "x").unwrap();

        let report = session.shutdown().unwrap();
        assert_eq!(report.summary_path.as_deref(), Some(out.as_path()));
        let content = fs::read_to_string(&out).unwrap();
        assert!(content.contains("a.txt"));
        assert!(content.ends_with("\r\n"));
        assert!(session.is_shut_down());
    }

    #[test]
    fn test_second_shutdown_fails_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("summary.log");
        let session = session(
            &dir,
            Config {
                output: Some(out.clone()),
                ..Config::default()
            },
        );
        session.shutdown().unwrap();
        let first = fs::read_to_string(&out).unwrap();

        assert!(matches!(session.shutdown(), Err(VigiaError::AlreadyFinalized)));
        assert_eq!(fs::read_to_string(&out).unwrap(), first);
    }

    #[test]
    fn test_shutdown_writes_tree_when_configured() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.js"), "").unwrap();
        let tree_out = dir.path().join("tree.json");
        let session = session(
            &dir,
            Config {
                output: Some(dir.path().join("summary.log")),
                require_tree_output: Some(tree_out.clone()),
                ..Config::default()
            },
        );
        let loader = session
            .loader(|request: &str, _: Option<&Requester>| request.len())
            .unwrap();
        assert_eq!(loader.load("./b.js", Some(&session.entry())).unwrap(), 6);

        let report = session.shutdown().unwrap();
        assert_eq!(report.tree_path.as_deref(), Some(tree_out.as_path()));
        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&tree_out).unwrap()).unwrap();
        assert_eq!(doc["name"], &*dir.path().join("main.js").to_string_lossy());
        assert_eq!(doc["children"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_live_mode_writes_no_summary() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("live.log");
        let session = session(
            &dir,
            Config {
                output: Some(out.clone()),
                summary: false,
                ..Config::default()
            },
        );
        let storage = session.storage().unwrap();
        storage.exists(dir.path().join("nothing"));

        let report = session.shutdown().unwrap();
        assert!(report.summary_path.is_none());
        let content = fs::read_to_string(&out).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("fs.exists | "));
        assert!(report.summary.get(Subsystem::Storage, Some("exists")).is_none());
    }

    #[test]
    fn test_tree_written_when_summary_export_fails() {
        let dir = TempDir::new().unwrap();
        let tree_out = dir.path().join("tree.json");
        let session = session(
            &dir,
            Config {
                // A directory cannot be opened for appending
                output: Some(dir.path().to_path_buf()),
                require_tree_output: Some(tree_out.clone()),
                ..Config::default()
            },
        );

        let err = session.shutdown().unwrap_err();
        assert!(matches!(err, VigiaError::Export { .. }), "{:?}", err);
        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&tree_out).unwrap()).unwrap();
        assert_eq!(doc["children"], serde_json::json!([]));
        assert!(session.is_shut_down());
    }

    #[test]
    fn test_facades_share_hooks() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir, Config::default());
        let first = session.storage().unwrap();
        let second = session.storage().unwrap();
        first.exists(dir.path());
        second.exists(dir.path());
        assert_eq!(session.probe().recorded(Subsystem::Storage, Some("exists")), 2);
    }
}
