//! Console summary of a finished crawl

use crate::output::CrawlReport;
use crate::storage::CrawlSummaryRow;

/// Number of failed pages listed individually
const MAX_LISTED_FAILURES: usize = 10;

/// Formats the crawl summary printed after a run
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Summary ===\n\n");
    out.push_str(&format!("Seed: {}\n", report.seed_url));
    out.push_str(&format!("Origin: {}\n", report.base_url));
    out.push_str(&format!(
        "Duration: {:.1}s\n\n",
        report.total_duration_ms as f64 / 1000.0
    ));

    out.push_str("Pages:\n");
    out.push_str(&format!("  Total: {}\n", report.total));
    out.push_str(&format!("  Successful: {}\n", report.successful));
    out.push_str(&format!("  Failed: {}\n", report.failed));
    out.push_str(&format!("  Rendered in browser: {}\n", report.rendered_count()));
    out.push_str(&format!("  Max depth reached: {}\n", report.max_depth_reached));
    out.push_str(&format!("  Average load time: {:.0} ms\n\n", report.average_load_ms));

    let breakdown = report.error_breakdown();
    if !breakdown.is_empty() {
        out.push_str("Error Summary:\n");
        let mut counts: Vec<_> = breakdown.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (class, count) in counts {
            out.push_str(&format!("  {}: {}\n", class, count));
        }
        out.push('\n');

        out.push_str("Failed Pages:\n");
        for page in report.failed_pages().take(MAX_LISTED_FAILURES) {
            out.push_str(&format!(
                "  - {} ({})\n",
                page.url,
                page.error_class.as_deref().unwrap_or("unknown")
            ));
        }
        if report.failed > MAX_LISTED_FAILURES {
            out.push_str(&format!(
                "  ... and {} more\n",
                report.failed - MAX_LISTED_FAILURES
            ));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} pages)\n",
        report.success_rate(),
        report.successful,
        report.total
    ));

    out
}

/// Prints the crawl summary to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

/// Formats the crawl history listing
pub fn format_history(crawls: &[CrawlSummaryRow]) -> String {
    if crawls.is_empty() {
        return "No crawls recorded yet.\n".to_string();
    }

    let mut out = String::from("=== Crawl History ===\n\n");
    for crawl in crawls {
        out.push_str(&format!(
            "#{:<4} {}  {}  {} pages ({} ok, {} failed, {:.1}s)\n",
            crawl.id,
            crawl.created_at.format("%Y-%m-%d %H:%M:%S"),
            crawl.start_url,
            crawl.total_pages,
            crawl.successful_pages,
            crawl.failed_pages,
            crawl.total_duration_ms as f64 / 1000.0
        ));
    }
    out
}
