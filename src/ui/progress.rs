use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Progress for an ingest run: a bar over transcripts, then a spinner
/// while pending references are resolved. Hidden when stdout is not a terminal.
pub struct ProgressManager {
    mp: MultiProgress,
    transcripts: ProgressBar,
    resolving: ProgressBar,
}

impl ProgressManager {
    pub fn new(total_files: usize) -> Self {
        let mp = MultiProgress::new();
        let is_term = console::Term::stdout().is_term();

        let transcripts = if is_term {
            let pb = mp.add(ProgressBar::new(total_files as u64));
            if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}") {
                pb.set_style(style);
            }
            pb.set_message("Parsing transcripts");
            pb
        } else {
            ProgressBar::hidden()
        };

        let resolving = if is_term {
            mp.add(ProgressBar::new_spinner().with_message("Resolving references"))
        } else {
            ProgressBar::hidden()
        };

        Self {
            mp,
            transcripts,
            resolving,
        }
    }

    pub fn set_transcript(&self, filename: &str) {
        self.transcripts.set_message(format!("Parsing: {}", filename));
    }

    pub fn inc_transcripts(&self) {
        self.transcripts.inc(1);
    }

    pub fn finish_transcripts(&self) {
        self.transcripts.finish_with_message("Done");
    }

    pub fn start_resolving(&self) {
        self.resolving.enable_steady_tick(Duration::from_millis(100));
    }

    pub fn finish_resolving(&self) {
        self.resolving.finish_with_message("Done");
    }

    /// Print outside the bars without tearing them
    pub fn println(&self, line: &str) {
        if self.transcripts.is_hidden() {
            println!("{}", line);
        } else {
            self.mp.println(line).ok();
        }
    }

    pub fn clear(&self) {
        self.mp.clear().ok();
    }

    pub fn finish_with_summary(&self, duration: Duration, transcripts: usize, appliances: usize, orphaned: usize) {
        self.clear();
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {}  {} {}  {} {}",
            Icons::FILE.style(theme().info.clone()),
            transcripts,
            Icons::PACKAGE.style(theme().info.clone()),
            appliances,
            Icons::HOURGLASS.style(theme().info.clone()),
            orphaned
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_message(message.to_string());
        if console::Term::stdout().is_term() {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        Self { pb }
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_with_message(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}
