//! Build or load a keyframe index and optionally resolve split points.

use std::path::PathBuf;

use seamcut_common::config::AppConfig;
use seamcut_common::timecode::{format_timecode, parse_timecode};
use seamcut_edit_model::segment::Segment;

pub async fn run(
    config: AppConfig,
    path: PathBuf,
    start: Option<String>,
    end: Option<String>,
) -> anyhow::Result<()> {
    let pipeline = super::pipeline(config);
    let cache = pipeline.keyframes();

    let index = cache.load_or_build(&path).await?;
    println!("Keyframes for {}", path.display());
    println!("  Sidecar: {}", cache.sidecar_path(&path).display());
    println!("  Count: {}", index.len());
    if let (Some(first), Some(last)) = (index.timestamps().first(), index.timestamps().last()) {
        println!(
            "  Range: {} - {}",
            format_timecode(*first),
            format_timecode(*last)
        );
    }

    if start.is_none() && end.is_none() {
        return Ok(());
    }

    let segment = Segment {
        index: 1,
        video: path.clone(),
        audio: path,
        start: parse_timecode("start", start.as_deref().unwrap_or(""))?,
        end: parse_timecode("end", end.as_deref().unwrap_or(""))?,
    };
    let resolved = pipeline.resolve_segment(&segment).await?;

    println!();
    println!(
        "Segment {} - {} (fade {:.2}s)",
        format_timecode(resolved.segment().start),
        format_timecode(resolved.segment().end),
        pipeline.resolver().fade_duration()
    );
    println!("  Start split: {:.3}", resolved.start_split());
    println!("  End split:   {:.3}", resolved.end_split());
    println!("  Output length: {:.3}s", resolved.duration());

    Ok(())
}
