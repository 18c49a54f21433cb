//! Check external tools.

use seamcut_common::config::AppConfig;
use seamcut_render_engine::transcoder::{FfmpegTranscoder, Transcoder};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("SeamCut System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = FfmpegTranscoder::from_config(&config.tools)
        .is_available()
        .await;
    report("ffmpeg", &config.tools.ffmpeg, ffmpeg);

    let ffprobe = tokio::process::Command::new(&config.tools.ffprobe)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .is_ok_and(|s| s.success());
    report("ffprobe", &config.tools.ffprobe, ffprobe);

    let intro_dir = &config.intro.directory;
    if intro_dir.is_dir() {
        println!("[OK] Intro directory: {}", intro_dir.display());
    } else {
        println!("[WARN] Intro directory missing: {}", intro_dir.display());
    }

    println!();
    if ffmpeg && ffprobe {
        println!("All required tools are available. SeamCut is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg or fix `tools` in the config.");
    }

    Ok(())
}

fn report(name: &str, binary: &str, available: bool) {
    if available {
        println!("[OK] {name}: {binary}");
    } else {
        println!("[MISSING] {name}: {binary}");
    }
}
