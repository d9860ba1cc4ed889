//! Formatted terminal output.
//!
//! Formatting lives in one place so output changes stay localized.

use crate::binning::BinPartition;
use crate::models::BuiltModel;
use crate::params::ParameterKind;
use crate::report::ModelSummary;

/// Format the per-model summary: bin states, totals and transfer coefficients.
pub fn format_model_summary(summary: &ModelSummary, model: &BuiltModel) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== rpf - {} ===\n", summary.name));
    out.push_str(&format!(
        "Binning: {} x {} bins | x=[{}, {}] y=[{}, {}]\n",
        model.n_bins_x(),
        model.n_bins_y(),
        model.partition.axis().low,
        model.partition.axis().high,
        model.y_axis.low,
        model.y_axis.high,
    ));
    out.push_str(&format!(
        "Transfer function: {} ({} coefficients)\n",
        summary.family, summary.n_transfer_coeffs
    ));
    out.push_str(&format!(
        "Parameters: {} declared, {} floating\n",
        summary.n_parameters, summary.n_floating
    ));
    out.push_str(&format!(
        "Bins: blinded={} zero={} low-stat={} normal={}\n",
        summary.blinded, summary.zero_or_negative, summary.low_statistics, summary.normal
    ));
    out.push_str(&format!(
        "Unblinded totals: fail={:.2} pass(pred)={:.4}\n",
        summary.fail_total, summary.pass_total
    ));

    out.push_str("\nTransfer coefficients:\n");
    out.push_str(&format_coefficients(model));
    out.push('\n');
    out.push_str(&format_partition(&model.partition));

    out
}

/// Format categories and the channel labels derived from them.
pub fn format_partition(partition: &BinPartition) -> String {
    let mut out = String::new();
    out.push_str(
        format!("{:<6} {:>6} {:>6} {:>10} {:>10}", "cat", "first", "last", "low", "high").trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<6} {:-<6} {:-<10} {:-<10}", "", "", "", "", "").trim_end());
    out.push('\n');
    for c in partition.categories() {
        out.push_str(
            format!("{:<6} {:>6} {:>6} {:>10.4} {:>10.4}", c.name, c.first, c.last, c.low, c.high).trim_end(),
        );
        out.push('\n');
    }
    if let Some((lo, hi)) = partition.blind_window() {
        out.push_str(&format!("Blind window: [{lo}, {hi}]\n"));
    }
    out.push_str(&format!("Labels: {}\n", partition.labels().join(", ")));
    out
}

fn format_coefficients(model: &BuiltModel) -> String {
    let mut out = String::new();
    for handle in model.transfer.parameters() {
        let Some(p) = model.store.get(handle.name()) else {
            continue;
        };
        let range = match (p.kind, p.low, p.high) {
            (ParameterKind::Floating, Some(lo), Some(hi)) => format!("[{lo}, {hi}]"),
            _ => "constant".to_string(),
        };
        out.push_str(&format!("  {:<28} {:>12.6} {range}\n", truncate(&p.name, 28), p.value));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_table_lists_categories_and_labels() {
        let p = BinPartition::build(0.0, 10.0, 10, Some(4.0), Some(6.0)).unwrap();
        let text = format_partition(&p);
        assert!(text.contains("LOW"));
        assert!(text.contains("SIG"));
        assert!(text.contains("HIGH"));
        assert!(text.contains("pass_SIG"));
        assert!(text.contains("fail_HIGH"));
        assert!(text.contains("Blind window: [4, 6]"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
