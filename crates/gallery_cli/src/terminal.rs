//! Terminal front end for the gallery sink

use gallery_core::{Choice, ConfirmRequest, GallerySink, Notice, NoticeLevel, ViewSummary};
use std::io::{self, BufRead, Write};

/// Prints notices and answers confirmations from stdin (or `--yes`)
pub struct TerminalSink {
    assume_yes: bool,
    request: Option<ConfirmRequest>,
}

impl TerminalSink {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            request: None,
        }
    }

    /// Forget the outstanding request without answering it
    pub fn take_request(&mut self) -> Option<ConfirmRequest> {
        self.request.take()
    }

    /// Answer the outstanding request, if any
    pub fn answer(&mut self) -> Option<Choice> {
        let request = self.take_request()?;

        if self.assume_yes {
            tracing::debug!(?request, "Confirmed by --yes");
            return Some(Choice::Confirm);
        }

        Some(prompt(&request.message()))
    }
}

impl GallerySink for TerminalSink {
    fn render(&mut self, view: &ViewSummary) {
        tracing::trace!(
            visible = view.visible.len(),
            selected = view.selected_count(),
            "View updated"
        );
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => println!("{}", notice),
            NoticeLevel::Warning => eprintln!("warning: {}", notice),
            NoticeLevel::Error => eprintln!("error: {}", notice),
        }
    }

    fn request_confirmation(&mut self, request: &ConfirmRequest) {
        self.request = Some(request.clone());
    }
}

fn prompt(question: &str) -> Choice {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return Choice::Decline;
    }

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => parse_answer(&line),
        Err(e) => {
            tracing::warn!("Failed to read answer: {}", e);
            Choice::Decline
        }
    }
}

/// Anything but an explicit yes declines
pub fn parse_answer(line: &str) -> Choice {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Choice::Confirm,
        _ => Choice::Decline,
    }
}
