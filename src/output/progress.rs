use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{toned, Tone};

/// Spinner for one mining stage of one project.
pub struct StageProgress {
    pb: ProgressBar,
    label: String,
}

impl StageProgress {
    pub fn start(project: &str, stage: &str) -> Self {
        let label = format!("{project}: {stage}");
        let pb = create_spinner(toned(&label, Tone::Pending).to_string());
        Self { pb, label }
    }

    pub fn succeed(self) {
        self.pb
            .finish_with_message(toned(format!("{} ✓", self.label), Tone::Done).to_string());
    }

    pub fn fail(self) {
        self.pb
            .finish_with_message(toned(format!("{} ✗", self.label), Tone::Failed).to_string());
    }
}

/// Counting bar over a known number of items.
pub struct ItemProgress {
    pb: ProgressBar,
}

impl ItemProgress {
    pub fn new(len: usize, message: &str) -> Self {
        let pb = ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::default_bar().template("  {msg} |{bar:40}| {pos}/{len} {percent}%")
        {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        Self { pb }
    }

    pub fn advance(&self) {
        self.pb.inc(1);
    }

    pub fn finish(self) {
        self.pb.finish();
    }

    pub fn abandon(&self) {
        self.pb.abandon();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
