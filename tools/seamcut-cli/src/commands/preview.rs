//! Render one preview window.

use seamcut_common::config::AppConfig;
use seamcut_common::timecode::format_timecode;
use seamcut_edit_model::request::EditParams;

pub async fn run(config: AppConfig, params: EditParams, at: f64) -> anyhow::Result<()> {
    let pipeline = super::pipeline(config);

    match pipeline
        .preview_fragment(&params, at, &super::stdout_sink())
        .await?
    {
        Some(fragment) => {
            println!(
                "Preview at {}: {} ({:.2}s)",
                format_timecode(fragment.start_time),
                fragment.path.display(),
                fragment.duration
            );
        }
        None => println!("Nothing to preview at {}", format_timecode(at)),
    }

    Ok(())
}
