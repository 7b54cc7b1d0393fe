//! Markdown report generation
//!
//! This module renders a session report as a markdown document, including
//! run information, outcome totals and the per-reason breakdowns.

use crate::output::report::{format_duration, SessionReport};
use crate::output::OutputResult;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown report to `output_path`
///
/// # Arguments
///
/// * `report` - The session report
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_markdown_report(report: &SessionReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn push_breakdown<K: std::fmt::Display>(
    md: &mut String,
    heading: &str,
    column: &str,
    counts: &BTreeMap<K, u64>,
) {
    if counts.is_empty() {
        return;
    }

    md.push_str(&format!("## {}\n\n", heading));
    md.push_str(&format!("| {} | Count |\n", column));
    md.push_str("|------|-------|\n");
    for (key, count) in counts {
        md.push_str(&format!("| {} | {} |\n", key, count));
    }
    md.push('\n');
}

/// Formats a session report as markdown
pub fn format_markdown_report(report: &SessionReport) -> String {
    let stats = &report.statistics;
    let mut md = String::new();

    md.push_str("# Crawl Report\n\n");

    // Run metadata
    md.push_str("## Session Information\n\n");
    md.push_str(&format!("- **Session ID**: {}\n", report.session_id));
    md.push_str(&format!("- **Base URL**: {}\n", report.base_url));
    md.push_str(&format!("- **Status**: {}\n", report.status));
    md.push_str(&format!("- **Started**: {}\n", report.start_time.to_rfc3339()));
    if let Some(end) = report.end_time {
        md.push_str(&format!("- **Finished**: {}\n", end.to_rfc3339()));
    }
    md.push_str(&format!(
        "- **Duration**: {}\n\n",
        format_duration(report.duration_seconds)
    ));

    // Totals
    md.push_str("## Overall Statistics\n\n");
    md.push_str("| Outcome | Pages |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Total | {} |\n", stats.total_pages));
    md.push_str(&format!("| Successful | {} |\n", stats.successful_pages));
    md.push_str(&format!("| Failed | {} |\n", stats.failed_pages));
    md.push_str(&format!("| Skipped | {} |\n", stats.skipped_pages));
    md.push_str(&format!("| Duplicates | {} |\n", stats.duplicate_pages));
    md.push_str(&format!("| Pending | {} |\n\n", report.pages_queued));

    md.push_str(&format!("- **Success Rate**: {:.2}%\n", stats.success_rate()));
    md.push_str(&format!(
        "- **Total Size**: {:.2} MB\n",
        report.total_megabytes()
    ));
    md.push_str(&format!(
        "- **Average Page Size**: {:.2} KB\n",
        report.average_page_kilobytes()
    ));
    md.push_str(&format!(
        "- **Pages/Second**: {:.2}\n",
        report.pages_per_second
    ));
    md.push_str(&format!(
        "- **Bytes/Second**: {:.0}\n\n",
        report.bytes_per_second
    ));

    push_breakdown(&mut md, "Status Codes", "Code", &stats.status_codes);
    push_breakdown(&mut md, "Failure Reasons", "Reason", &stats.error_types);
    push_breakdown(&mut md, "Skip Reasons", "Reason", &stats.skip_reasons);
    push_breakdown(&mut md, "Content Types", "Type", &stats.content_types);

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlerConfig;
    use crate::manifest::{ConfigSnapshot, Manifest, PageRecord};
    use tempfile::TempDir;

    fn create_test_report() -> SessionReport {
        let mut manifest = Manifest::new(
            "https://example.com/",
            "example.com",
            "example_com",
            ConfigSnapshot::from(&CrawlerConfig::default()),
        );
        for page in [
            PageRecord::completed("https://example.com/", "Home", "h1", "index.md", 500)
                .with_response(200, Some("text/html".to_string())),
            PageRecord::failed("https://example.com/gone", "410 Gone").with_response(410, None),
        ] {
            manifest.pages.insert(page.url.clone(), page);
        }
        SessionReport::from_manifest(&manifest)
    }

    #[test]
    fn test_format_markdown_report() {
        let markdown = format_markdown_report(&create_test_report());

        assert!(markdown.contains("# Crawl Report"));
        assert!(markdown.contains("**Base URL**: https://example.com/"));
        assert!(markdown.contains("| Total | 2 |"));
        assert!(markdown.contains("| Successful | 1 |"));
        assert!(markdown.contains("## Status Codes"));
        assert!(markdown.contains("| 410 | 1 |"));
        assert!(markdown.contains("| 410 Gone | 1 |"));
    }

    #[test]
    fn test_empty_breakdowns_are_omitted() {
        let markdown = format_markdown_report(&create_test_report());
        assert!(!markdown.contains("## Skip Reasons"));
    }

    #[test]
    fn test_write_markdown_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.md");

        write_markdown_report(&create_test_report(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# Crawl Report"));
    }
}
