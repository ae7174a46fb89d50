//! `tether watch`: rebuild on change with one long-lived bundler
//!
//! Events are queued through an mpsc channel. After the first relevant event
//! the loop waits for a quiet period before rebuilding, so a burst of writes
//! triggers one build. Events below the output directory are ignored.

use super::build::summary;
use super::{BuildArgs, Session};
use anyhow::Context;
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tether_bundler::{Bundler, DirectoryTree};
use tracing::{debug, error, info, warn};

pub fn execute(args: &BuildArgs, debounce: Duration) -> anyhow::Result<()> {
    let Session {
        mut bundler,
        mut tree,
        output_root,
    } = args.session()?;

    rebuild(&mut bundler, &mut tree, &output_root);

    let watched = fs::canonicalize(tree.root())
        .with_context(|| format!("Cannot watch {}", tree.root().display()))?;
    fs::create_dir_all(&output_root)
        .with_context(|| format!("Cannot create {}", output_root.display()))?;
    let ignored = fs::canonicalize(&output_root)
        .with_context(|| format!("Cannot resolve {}", output_root.display()))?;

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    watcher.watch(&watched, RecursiveMode::Recursive)?;
    info!(input = %watched.display(), "watching for changes");

    while let Ok(res) = rx.recv() {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "watch error");
                continue;
            }
        };
        if !is_relevant(&event, &ignored) {
            continue;
        }
        debug!(paths = ?event.paths, "change detected");

        // Coalesce the rest of the burst
        while rx.recv_timeout(debounce).is_ok() {}

        rebuild(&mut bundler, &mut tree, &output_root);
    }

    Ok(())
}

/// Run one build; a failure is reported and the previous artifact stays
fn rebuild(bundler: &mut Bundler, tree: &mut DirectoryTree, output_root: &Path) {
    match bundler.build(tree, output_root) {
        Ok(report) => println!("{}", summary(&report)),
        Err(e) => error!(error = %e, "build failed"),
    }
}

/// Whether an event may change the build input
fn is_relevant(event: &Event, ignored: &Path) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|path: &PathBuf| !path.starts_with(ignored))
}
