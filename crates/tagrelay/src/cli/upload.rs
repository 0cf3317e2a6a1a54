//! Upload command handler.

use super::commands::{UploadArgs, UploadTarget};
use super::progress::BarProgress;
use std::sync::Arc;
use tagrelay::{
    RelayConfig, RelayResult, UploadClient, UploadCredentials, UploadOutcome, UploadSummary,
    build_uploader,
};

/// Resolve the category and attempt count against configuration.
pub(crate) fn resolve_target(config: &RelayConfig, target: &UploadTarget) -> (u32, u32) {
    (
        target
            .category_id
            .unwrap_or(*config.upload().default_category_id()),
        target.max_retries.unwrap_or(*config.upload().max_retries()),
    )
}

/// Upload client drawing terminal progress bars.
pub(crate) fn uploader_with_bars(config: &RelayConfig) -> RelayResult<UploadClient> {
    let uploader = build_uploader(config, UploadCredentials::from_env()?)?;
    Ok(uploader.with_progress(Arc::new(BarProgress::new())))
}

/// Handle the `upload` command.
pub async fn handle_upload(config: &RelayConfig, args: &UploadArgs) -> RelayResult<()> {
    let (category_id, max_retries) = resolve_target(config, &args.target);
    let uploader = uploader_with_bars(config)?;

    let outcomes = uploader
        .upload_batch(&args.files, category_id, max_retries)
        .await;
    print_upload_report(&outcomes);
    Ok(())
}

pub(crate) fn print_upload_report(outcomes: &[UploadOutcome]) {
    println!("Upload summary:");
    for outcome in outcomes {
        match outcome.error() {
            None => println!("  ok      {}", outcome.path().display()),
            Some(e) => println!("  failed  {} ({})", outcome.path().display(), e.kind),
        }
    }
    println!("{}", UploadSummary::from(outcomes));
}
