use chrono::NaiveDate;
use std::fs;
use tracing::{info, warn};

use crate::error::DigestResult;

/// One rendered block of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub lines: Vec<String>,
}

impl Section {
    pub fn new(heading: &str, lines: Vec<String>) -> Self {
        Self {
            heading: heading.to_string(),
            lines,
        }
    }

    /// A section whose source produced nothing
    pub fn empty(heading: &str, placeholder: &str) -> Self {
        Self::new(heading, vec![format!("- {}", placeholder)])
    }
}

/// Heading with an em-dash underline of matching width
fn underlined(heading: &str) -> String {
    format!("\n{}\n{}\n", heading, "—".repeat(heading.chars().count()))
}

/// Assemble the full report text
pub fn render(date: NaiveDate, sections: &[Section]) -> String {
    let mut out = vec![format!("Daily digest — {}\n", date)];
    for section in sections {
        out.push(underlined(&section.heading));
        for line in &section.lines {
            out.push(line.clone());
        }
    }
    out.join("\n")
}

/// Write the report alongside printing it; a write failure only warns
pub fn write_report(path: &str, content: &str) -> DigestResult<()> {
    fs::write(path, content)?;
    info!(path, "report written");
    Ok(())
}

/// Default output path for a report date
pub fn default_output_path(date: NaiveDate) -> String {
    format!("daily_report_{}.txt", date)
}

/// Print and persist the final report
pub fn emit(date: NaiveDate, content: &str, output_file: Option<&str>) {
    println!("{}", content);
    let path = output_file
        .map(str::to_string)
        .unwrap_or_else(|| default_output_path(date));
    if let Err(e) = write_report(&path, content) {
        warn!(path, error = %e, "failed to write report file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_header_and_sections() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();
        let sections = vec![
            Section::new("GitHub PRs", vec!["- [o/r] Fix bug (open)".to_string()]),
            Section::empty("Calendar", "(no events)"),
        ];
        let text = render(date, &sections);
        assert!(text.starts_with("Daily digest — 2025-09-19"));
        assert!(text.contains("GitHub PRs\n————"));
        assert!(text.contains("- [o/r] Fix bug (open)"));
        assert!(text.contains("- (no events)"));
    }

    #[test]
    fn underline_matches_heading_width() {
        let text = underlined("Jira Status");
        let mut parts = text.trim().lines();
        let heading = parts.next().unwrap();
        let underline = parts.next().unwrap();
        assert_eq!(heading.chars().count(), underline.chars().count());
    }

    #[test]
    fn default_output_path_embeds_date() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();
        assert_eq!(default_output_path(date), "daily_report_2025-09-19.txt");
    }
}
