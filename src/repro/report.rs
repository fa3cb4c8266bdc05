//! Transcripts and reports
//!
//! A `Transcript` collects what a reproducer prints (`lines`, the output the
//! standalone program would have written to stdout) separately from what we
//! add around it (`notes`), plus any binary data worth showing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::fmt::Write as FmtWrite;

/// Raw bytes captured during a run, base64 encoded for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub label: String,
    pub length: usize,
    pub base64: String,
}

impl Attachment {
    pub fn new(label: &str, bytes: &[u8]) -> Self {
        Self {
            label: label.to_string(),
            length: bytes.len(),
            base64: STANDARD.encode(bytes),
        }
    }
}

/// Output collected while a reproducer runs
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Vec<String>,
    notes: Vec<String>,
    attachments: Vec<Attachment>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line of program output
    pub fn line(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!("| {}", line);
        self.lines.push(line);
    }

    /// Record a blank separator line
    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Record an observation about the output
    pub fn note(&mut self, note: impl Into<String>) {
        let note = note.into();
        debug!("# {}", note);
        self.notes.push(note);
    }

    pub fn attach(&mut self, label: &str, bytes: &[u8]) {
        self.attachments.push(Attachment::new(label, bytes));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

/// Whether the status is the one the reproducer documents as expected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Expected,
    Deviation,
}

impl Verdict {
    pub fn from_status(status: i32) -> Self {
        if status == 0 {
            Verdict::Expected
        } else {
            Verdict::Deviation
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Expected => write!(f, "expected"),
            Verdict::Deviation => write!(f, "deviation"),
        }
    }
}

/// Outcome of one reproducer run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub case: String,
    pub bug: String,
    pub status: i32,
    pub verdict: Verdict,
    pub lines: Vec<String>,
    pub notes: Vec<String>,
    pub attachments: Vec<Attachment>,
    /// The libudev call whose negative status became `status`
    pub failed_call: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        case: &str,
        bug: &str,
        status: i32,
        transcript: Transcript,
        failed_call: Option<&str>,
    ) -> Self {
        Self {
            case: case.to_string(),
            bug: bug.to_string(),
            status,
            verdict: Verdict::from_status(status),
            lines: transcript.lines,
            notes: transcript.notes,
            attachments: transcript.attachments,
            failed_call: failed_call.map(String::from),
            finished_at: Utc::now(),
        }
    }

    /// Exit status as a process would report it (low eight bits)
    pub fn exit_code(&self) -> u8 {
        (self.status & 0xff) as u8
    }

    /// Plain text rendering: output lines, notes, attachments, status
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "== {} (bug {})", self.case, self.bug);
        for line in &self.lines {
            let _ = writeln!(text, "{}", line);
        }
        for note in &self.notes {
            let _ = writeln!(text, "# {}", note);
        }
        for attachment in &self.attachments {
            let _ = writeln!(
                text,
                "# {}: {} bytes, base64 {}",
                attachment.label, attachment.length, attachment.base64
            );
        }
        if let Some(call) = &self.failed_call {
            let _ = writeln!(text, "# failed call: {}", call);
        }
        let _ = writeln!(text, "status: {} ({})", self.status, self.verdict);
        text
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// True if any output line contains `fragment`
    pub fn mentions(&self, fragment: &str) -> bool {
        self.lines
            .iter()
            .chain(self.notes.iter())
            .any(|line| line.contains(fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report(status: i32) -> Report {
        let mut transcript = Transcript::new();
        transcript.line("/sys/devices/system/memory/memory0");
        transcript.note("1 device listed");
        transcript.attach("vpd_pg83", &[0x00, 0x83, 0x00, 0x08]);
        Report::new("match-parent", "1255191", status, transcript, None)
    }

    #[test]
    fn test_verdict_from_status() {
        assert_eq!(Verdict::from_status(0), Verdict::Expected);
        assert_eq!(Verdict::from_status(2), Verdict::Deviation);
        assert_eq!(Verdict::from_status(-22), Verdict::Deviation);
    }

    #[test]
    fn test_attachment_encodes_binary() {
        let attachment = Attachment::new("vpd_pg83", &[0x00, 0x83, 0x00, 0x08]);
        assert_eq!(attachment.length, 4);
        assert_eq!(attachment.base64, "AIMACA==");
    }

    #[test]
    fn test_exit_code_wraps_negative_status() {
        assert_eq!(sample_report(0).exit_code(), 0);
        assert_eq!(sample_report(3).exit_code(), 3);
        assert_eq!(sample_report(-1).exit_code(), 255);
        assert_eq!(sample_report(-22).exit_code(), 234);
    }

    #[test]
    fn test_render_text() {
        let text = sample_report(0).render_text();
        assert!(text.starts_with("== match-parent (bug 1255191)\n"));
        assert!(text.contains("/sys/devices/system/memory/memory0\n"));
        assert!(text.contains("# 1 device listed\n"));
        assert!(text.contains("# vpd_pg83: 4 bytes, base64 AIMACA==\n"));
        assert!(text.ends_with("status: 0 (expected)\n"));
    }

    #[test]
    fn test_render_json() {
        let json = sample_report(2).render_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["case"], "match-parent");
        assert_eq!(value["status"], 2);
        assert_eq!(value["verdict"], "deviation");
        assert_eq!(value["attachments"][0]["base64"], "AIMACA==");
        assert!(value["failed_call"].is_null());
    }

    #[test]
    fn test_mentions_searches_lines_and_notes() {
        let report = sample_report(0);
        assert!(report.mentions("memory0"));
        assert!(report.mentions("device listed"));
        assert!(!report.mentions("event0"));
    }
}
