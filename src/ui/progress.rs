use crate::indexer::IndexStats;
use crate::ui::progress_message::{ProgressMessage, ProgressPhase};
use crate::ui::{theme, Icons};
use crate::FileStatus;
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

fn interactive() -> bool {
    console::Term::stdout().is_term() && !crate::output::is_quiet()
}

/// Progress display for an indexing run, fed through a channel so worker
/// threads never touch the terminal directly.
pub struct IndexProgress {
    bars: MultiProgress,
    scan: ProgressBar,
    files: ProgressBar,
    render: Option<thread::JoinHandle<()>>,
}

impl IndexProgress {
    pub fn new() -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();
        let bars = MultiProgress::new();

        let (scan, files) = if interactive() {
            let scan = bars.add(ProgressBar::new_spinner().with_message("Scanning"));
            let files = bars.add(ProgressBar::new(0));
            if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {wide_msg}") {
                files.set_style(style);
            }
            (scan, files)
        } else {
            (ProgressBar::hidden(), ProgressBar::hidden())
        };

        let scan_bar = scan.clone();
        let file_bar = files.clone();
        let render = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ProgressMessage::Started { phase: ProgressPhase::Scanning, .. } => {
                        scan_bar.enable_steady_tick(TICK);
                    }
                    ProgressMessage::Finished { phase: ProgressPhase::Scanning } => {
                        scan_bar.finish_with_message("Scan complete");
                    }
                    ProgressMessage::Started { phase: ProgressPhase::Indexing, total } => {
                        file_bar.set_length(total as u64);
                    }
                    ProgressMessage::Started { phase: ProgressPhase::Pruning, .. } => {
                        file_bar.set_message("Pruning vanished files");
                    }
                    ProgressMessage::Finished { .. } => {}
                    ProgressMessage::Advanced { file } => {
                        file_bar.inc(1);
                        file_bar.set_message(file);
                    }
                    ProgressMessage::Changed { status, path } => {
                        let icon = match status {
                            FileStatus::New => Icons::NEW,
                            FileStatus::Modified => Icons::MOD,
                            FileStatus::Deleted => Icons::DEL,
                            FileStatus::Unchanged => Icons::SKIP,
                        };
                        file_bar.println(format!("{} {}", icon, path));
                    }
                    ProgressMessage::Error(msg) => {
                        file_bar.println(format!("{} {}", Icons::WARN, msg.style(theme().warn.clone())));
                    }
                }
            }
        });

        (
            Self {
                bars,
                scan,
                files,
                render: Some(render),
            },
            tx,
        )
    }

    /// Wait for the render thread (all senders must be dropped) and clear bars
    pub fn finish(mut self) {
        if let Some(render) = self.render.take() {
            render.join().ok();
        }
        self.scan.finish_and_clear();
        self.files.finish_and_clear();
        self.bars.clear().ok();
    }

    pub fn summary(stats: &IndexStats) {
        println!();
        println!(
            "{} {}",
            Icons::CHECK,
            format!("{} files in {}", stats.scanned, HumanDuration(stats.duration()))
                .style(theme().success.clone())
        );
        println!(
            "  {} {} new  {} {} modified  {} {} unchanged  {} {} deleted",
            Icons::NEW,
            stats.new,
            Icons::MOD,
            stats.modified,
            Icons::SKIP,
            stats.unchanged,
            Icons::DEL,
            stats.deleted
        );
    }
}

/// Spinner for single long-running steps (backups, restores)
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let bar = if interactive() {
            let bar = ProgressBar::new_spinner();
            bar.enable_steady_tick(TICK);
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(message.to_string());
        Self { bar }
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}
