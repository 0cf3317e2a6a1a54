//! Run command handler.

use super::commands::RunArgs;
use super::fetch::{print_fetch_report, request_from};
use super::upload::{print_upload_report, resolve_target, uploader_with_bars};
use tagrelay::{Pipeline, RelayConfig, RelayResult, SearchCredentials, build_fetcher};
use tokio::sync::watch;

/// Handle the `run` command: fetch, then upload what was downloaded.
///
/// Both sets of credentials are checked before any network call.
pub async fn handle_run(
    config: &RelayConfig,
    args: &RunArgs,
    cancel: watch::Receiver<bool>,
) -> RelayResult<()> {
    let (category_id, max_retries) = resolve_target(config, &args.target);
    let request = request_from(&args.fetch, category_id, max_retries)?;

    let fetcher = build_fetcher(config, SearchCredentials::from_env()?)?;
    let uploader = uploader_with_bars(config)?;
    let pipeline = Pipeline::new(fetcher)
        .with_uploader(uploader)
        .with_cancellation(cancel);

    let report = pipeline.run(&request).await?;
    print_fetch_report(report.fetch());
    if *report.cancelled() {
        println!("Interrupted before uploading; downloaded files are kept and recorded.");
    } else {
        print_upload_report(report.uploads());
    }
    Ok(())
}
