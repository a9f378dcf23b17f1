//! Terminal rendering shared by the analysis and history commands.

use colored::{ColoredString, Colorize};

use crate::records::{AnalysisRecord, Verdict};

/// Print one analysis: verdict, scores, extracted fields with their local
/// format checks, problems and recommendations.
pub fn print_analysis(record: &AnalysisRecord) {
    println!("{}", "Compliance Analysis".bold().cyan());
    println!("{}", "=".repeat(60));
    println!();

    println!("  {} {}", "Decision:  ".bold(), colorize_decision(record.decision_label()));
    if let Some(confidence) = record.confidence {
        println!("  {} {:.1}%", "Confidence:".bold(), confidence * 100.0);
    }
    if let Some(score) = record.compliance_score {
        println!("  {} {:.0}/100", "Compliance:".bold(), score);
    }
    if let Some(company) = &record.company_name {
        println!("  {} {}", "Company:   ".bold(), company);
    }
    if let Some(count) = record.document_count {
        println!("  {} {}", "Documents: ".bold(), count);
    }
    if let Some(ts) = record.timestamp {
        println!("  {} {}", "Analyzed:  ".bold(), ts.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(secs) = record.processing_time {
        println!("  {} {:.1}s", "Took:      ".bold(), secs);
    }
    println!("  {} {}", "Session:   ".bold(), record.session_id.dimmed());

    if !record.extracted_fields.is_empty() {
        println!();
        println!("{}", "Extracted Fields".bold().cyan());
        let checks = record.field_checks();
        for (field, value) in &record.extracted_fields {
            let marker = match checks.get(field) {
                Some(true) => "✓".green().bold(),
                Some(false) => "✗".red().bold(),
                None => "·".dimmed(),
            };
            let shown = if value.is_empty() {
                "not found".dimmed().to_string()
            } else {
                value.clone()
            };
            println!("  {} {:<22} {}", marker, humanize(field), shown);
        }
    }

    if !record.detailed_errors.is_empty() {
        println!();
        println!("{}", "Issues".bold().cyan());
        for issue in &record.detailed_errors {
            println!("  {} {}: {}", "✗".red().bold(), humanize(&issue.field).bold(), issue.error);
            if let Some(expected) = &issue.expected_format {
                println!("      {} {}", "expected:".dimmed(), expected.dimmed());
            }
            if let Some(help) = &issue.help {
                println!("      {}", help.dimmed());
            }
        }
    }

    if !record.recommendations.is_empty() {
        println!();
        println!("{}", "Recommendations".bold().cyan());
        for rec in &record.recommendations {
            println!("  • {rec}");
        }
    }
}

/// Colorize a decision label.
pub fn colorize_decision(decision: &str) -> ColoredString {
    match Verdict::classify(decision) {
        Some(Verdict::Approve) => decision.green().bold(),
        Some(Verdict::NeedsMoreDocuments) => decision.yellow().bold(),
        Some(Verdict::Reject) => decision.red().bold(),
        None => decision.dimmed(),
    }
}

/// `gst_number` → `Gst Number`.
pub fn humanize(field: &str) -> String {
    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Human-readable byte size.
pub fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    let n = n as f64;
    if n < KB {
        format!("{n} B")
    } else if n < KB * KB {
        format!("{:.1} KB", n / KB)
    } else {
        format!("{:.1} MB", n / (KB * KB))
    }
}

/// Quote a CSV field when it needs it.
pub fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("ab", 2), "ab");
        assert_eq!(truncate("₹₹₹₹", 3), "₹₹…");
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("gst_number"), "Gst Number");
        assert_eq!(humanize("company_name"), "Company Name");
        assert_eq!(humanize("signature"), "Signature");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(16 * 1024 * 1024), "16.0 MB");
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field("Acme"), "Acme");
        assert_eq!(csv_field("Acme, Pvt Ltd"), "\"Acme, Pvt Ltd\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
