use std::fs;
use std::path::Path;

use deckstress_core::AnalysisReport;
use deckstress_core::model::Codes;

/// Writes a Markdown table of baseline vs. stressed probabilities.
pub fn write_markdown(path: impl AsRef<Path>, run_id: &str, report: &AnalysisReport) -> std::io::Result<()> {
    fs::write(path, render_markdown(run_id, report))
}

fn codes_line(codes: &Codes) -> String {
    let codes = codes.to_sorted_vec();
    if codes.is_empty() {
        "-".to_string()
    } else {
        codes.join(", ")
    }
}

pub fn render_markdown(run_id: &str, report: &AnalysisReport) -> String {
    let stress = &report.stress;
    let mut output = String::new();
    output.push_str(&format!("# Stress Summary: {run_id}\n\n"));
    output.push_str(&format!("- Engine: {} {}\n", report.engine, report.version));
    output.push_str(&format!(
        "- Checkpoint layer: {} ({})\n",
        report.checkpoint.status.as_str(),
        codes_line(&report.checkpoint.codes)
    ));
    output.push_str(&format!(
        "- Selection: {} ({})\n",
        report.selection.status.as_str(),
        codes_line(&report.selection.codes)
    ));
    output.push_str(&format!(
        "- Stress: {} ({})\n",
        stress.status.as_str(),
        codes_line(&stress.codes)
    ));
    if let Some(reason) = stress.reason_code.as_deref() {
        output.push_str(&format!("- Skip reason: {reason}\n"));
    }
    if let (Some(model_id), Some(source)) = (stress.selected_model_id.as_deref(), stress.selection_source) {
        output.push_str(&format!("- Model: `{model_id}` via {}\n", source.as_str()));
    }
    output.push('\n');

    output.push_str("## Operators\n");
    if stress.operators_applied.is_empty() {
        output.push_str("- <none>\n");
    } else {
        for (index, operator) in stress.operators_applied.iter().enumerate() {
            output.push_str(&format!(
                "{}. {} (turn {})\n",
                index + 1,
                operator.kind(),
                operator
                    .by_turn()
                    .map(|turn| turn.to_string())
                    .unwrap_or_else(|| "?".to_string())
            ));
        }
    }
    output.push('\n');

    output.push_str("## Effective K\n\n");
    output.push_str("| Bucket | K before | K_int before | K after | K_int after |\n");
    output.push_str("|--------|----------|--------------|---------|-------------|\n");
    for entry in &stress.stress_adjusted_effective_k {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            entry.bucket,
            entry.effective_k_before,
            entry.k_int_before,
            entry.effective_k_after,
            entry.k_int_after
        ));
    }
    output.push('\n');

    output.push_str("## P(at least one) by checkpoint\n\n");
    output.push_str("| Bucket | Checkpoint | Baseline | Stressed | Δ |\n");
    output.push_str("|--------|------------|----------|----------|---|\n");
    for bucket in &stress.probability_deltas_by_bucket {
        for delta in &bucket.deltas_by_checkpoint {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                bucket.bucket, delta.checkpoint, delta.p_before, delta.p_after, delta.delta
            ));
        }
    }
    output
}
