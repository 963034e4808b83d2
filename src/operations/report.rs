//! Presentation of progress events on the terminal

use crate::fetch::FolderNode;
use crate::progress::{ProgressEvent, ProgressKind};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write as _};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// How events reach the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// Spinner on stderr, errors printed above it
    Spinner,
    /// One JSON object per line on stdout
    JsonLines,
}

/// Closing line of a JSON-lines report
#[derive(Serialize)]
struct TreeLine<'a> {
    kind: &'static str,
    tree: &'a FolderNode,
}

/// Consume events until every sender is dropped
///
/// Returns the number of events presented.
pub fn spawn_reporter(
    mut receiver: UnboundedReceiver<ProgressEvent>,
    style: ReportStyle,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let spinner = (style == ReportStyle::Spinner).then(new_spinner);
        let mut presented = 0;

        while let Some(event) = receiver.recv().await {
            presented += 1;
            match spinner.as_ref() {
                Some(bar) => show_on_spinner(bar, &event),
                None => write_json_line(&event),
            }
        }

        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
        return presented;
    })
}

fn new_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} [{elapsed}] {pos} files {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn show_on_spinner(bar: &ProgressBar, event: &ProgressEvent) {
    match event.kind {
        ProgressKind::FileDownloaded => {
            bar.inc(1);
            bar.set_message(event.to_string());
        }
        ProgressKind::Error => bar.println(format!("\u{2717} {event}")),
        ProgressKind::StatusMessage | ProgressKind::FolderEntered => {
            bar.set_message(event.to_string());
        }
    }
}

/// Write the fetched tree as the last JSON line
pub fn write_tree_json_line(tree: &FolderNode) {
    write_json_line(&TreeLine { kind: "tree", tree });
}

fn write_json_line<T: Serialize>(value: &T) {
    let Ok(line) = serde_json::to_string(value) else {
        return;
    };
    let mut stdout = io::stdout().lock();
    // A closed stdout (e.g. `| head`) must not abort the fetch
    let _ = writeln!(stdout, "{line}");
    let _ = stdout.flush();
}
