//! Run a full export.

use seamcut_common::config::AppConfig;
use seamcut_edit_model::request::EditParams;

pub async fn run(config: AppConfig, params: EditParams) -> anyhow::Result<()> {
    let pipeline = super::pipeline(config);

    println!("Exporting {}", params.video1.as_deref().unwrap_or_default());
    let report = pipeline.export(&params, &super::stdout_sink()).await?;

    let elapsed = report.finished_at - report.started_at;
    println!();
    println!("Export complete: {}", report.output.display());
    println!("  Duration: {:.3}s", report.duration_secs);
    println!("  Took: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    for warning in &report.cleanup_warnings {
        println!("  [WARN] {warning}");
    }

    Ok(())
}
