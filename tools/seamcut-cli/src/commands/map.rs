//! Print the timeline map as JSON.

use seamcut_common::config::AppConfig;
use seamcut_edit_model::request::EditParams;

pub async fn run(config: AppConfig, params: EditParams) -> anyhow::Result<()> {
    let map = super::pipeline(config).timeline_map(&params).await?;
    println!("{}", serde_json::to_string_pretty(&map)?);
    Ok(())
}
