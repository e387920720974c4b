//! Document watcher: prints links on startup, then reprints whenever the
//! document or the settings file changes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands::{self, Context};
use crate::diagnostics;
use crate::error::Error;

/// Debounce delay between filesystem events and rescan.
const DEBOUNCE_MS: u64 = 100;

/// Directories holding the document and the settings file.
fn collect_watch_dirs(document: &Path, settings_path: &Path) -> HashSet<PathBuf> {
    return [document, settings_path]
        .iter()
        .filter_map(|path| {
            let absolute = std::path::absolute(path).ok()?;
            return absolute.parent().map(Path::to_path_buf);
        })
        .collect();
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<()>) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return Error::WatchFailed {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Entry point for the watch command.
///
/// Each rescan reopens the document and reloads settings, so the printed
/// links always reflect the latest snapshot.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if no directory can be watched.
pub fn run(ctx: &Context, file: &Path, json: bool) -> Result<ExitCode, Error> {
    let mut last_code = rescan(ctx, file, json);

    let watch_dirs = collect_watch_dirs(file, &ctx.settings_path);
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;

    let mut watched = 0_usize;
    for dir in &watch_dirs {
        match watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => watched = watched.saturating_add(1),
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "cannot watch directory"),
        }
    }
    if watched == 0 {
        return Err(Error::WatchFailed {
            reason: format!("nothing to watch for {}", file.display()),
        });
    }

    tracing::info!(directories = watched, "watching, press Ctrl+C to stop");
    eprintln!("watch: monitoring {watched} directories, press Ctrl+C to stop");

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        tracing::info!(document = %file.display(), "change detected, rescanning");
        last_code = rescan(ctx, file, json);
    }

    return Ok(last_code);
}

/// Reopen the document with fresh settings and print its links.
fn rescan(ctx: &Context, file: &Path, json: bool) -> ExitCode {
    return match ctx.open(file) {
        Ok(session) => {
            commands::print_links(&session, json);
            ExitCode::SUCCESS
        },
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3_u8)
        },
    };
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    clippy::missing_assert_message,
    clippy::missing_docs_in_private_items,
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    reason = "tests"
)]
mod tests {
    use super::*;

    #[test]
    fn shared_directory_watched_once() {
        let dirs = collect_watch_dirs(Path::new("/ws/main.yml"), Path::new("/ws/.pipenav.toml"));
        assert_eq!(dirs.len(), 1);
        assert!(dirs.contains(Path::new("/ws")));
    }

    #[test]
    fn settings_elsewhere_adds_directory() {
        let dirs = collect_watch_dirs(Path::new("/ws/ci/main.yml"), Path::new("/etc/pipenav/.pipenav.toml"));
        assert_eq!(dirs.len(), 2);
    }
}
