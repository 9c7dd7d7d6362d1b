//! Terminal output for sync cycles.

use arrow::util::pretty::pretty_format_batches;

use crate::sync::CycleReport;

/// Print the feed-language table to stdout and the cycle summary to stderr.
pub fn print_report(report: &CycleReport) -> anyhow::Result<()> {
    if report.feeds.is_empty() {
        println!("(no feeds with labelled articles)");
    } else {
        let batch = report.feeds.to_record_batch()?;
        println!("{}", pretty_format_batches(&[batch])?);
    }

    eprintln!(
        "  Classified {} articles, {} failed, {} feeds updated in {:.1}s",
        report.classified,
        report.failed.len(),
        report.feeds_updated,
        report.elapsed_secs
    );
    for (id, error) in &report.failed {
        eprintln!("    {id}: {error}");
    }
    Ok(())
}
