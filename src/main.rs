use chrono::Local;
use prodscrap::{info_time, process::process_site, Config, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Local::now();
    let summary = process_site(Config::default()).await?;
    info_time!(start_time, "Script completed. {summary:?}");

    Ok(())
}
