//! Fetch command handler.

use super::commands::FetchArgs;
use tagrelay::{
    FetchReport, Pipeline, RelayConfig, RelayResult, RunRequest, SearchCredentials, build_fetcher,
    parse_tags,
};
use tokio::sync::watch;

/// Build a validated request from fetch flags.
pub(crate) fn request_from(
    args: &FetchArgs,
    category_id: u32,
    max_retries: u32,
) -> RelayResult<RunRequest> {
    Ok(RunRequest::builder()
        .tags(parse_tags(&args.tags))
        .max_items(args.max_items as usize)
        .kind(args.kind)
        .category_id(category_id)
        .max_retries(max_retries)
        .build()?)
}

/// Handle the `fetch` command.
pub async fn handle_fetch(
    config: &RelayConfig,
    args: &FetchArgs,
    cancel: watch::Receiver<bool>,
) -> RelayResult<()> {
    let request = request_from(
        args,
        *config.upload().default_category_id(),
        *config.upload().max_retries(),
    )?;
    let fetcher = build_fetcher(config, SearchCredentials::from_env()?)?;
    let pipeline = Pipeline::new(fetcher).with_cancellation(cancel);

    let report = pipeline.fetch(&request).await;
    print_fetch_report(&report);
    Ok(())
}

pub(crate) fn print_fetch_report(report: &FetchReport) {
    println!("Fetch summary:");
    for tag in report.tags() {
        println!(
            "  #{:<20} downloaded {:>3}  already had {:>3}  skipped {:>3}  failed {:>3}",
            tag.tag(),
            tag.downloaded_count(),
            tag.already_downloaded().len(),
            tag.skipped(),
            tag.failed()
        );
    }
    for (tag, cause) in report.failed_tags() {
        println!("  #{:<20} failed: {}", tag, cause);
    }
    for tag in report.cancelled_tags() {
        println!("  #{:<20} not started (interrupted)", tag);
    }
    println!(
        "Downloaded {} file(s) across {} tag(s)",
        report.downloaded_count(),
        report.succeeded_tag_count()
    );
    for path in report.paths() {
        println!("  {}", path.display());
    }
}
