//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load configuration from `PAGENOTE_*` variables.
//! - Open (and migrate) the configured database and probe the public
//!   timeline, printing a deterministic summary.

use log::error;
use pagenote_core::{init_from_config, open_db, CoreConfig, FeedService, Viewer};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    println!("pagenote_core ping={}", pagenote_core::ping());
    println!("pagenote_core version={}", pagenote_core::core_version());

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    if let Err(err) = open_db(&config.db_path) {
        error!("event=cli_probe module=cli status=error stage=open error={}", err);
        eprintln!("database error: {err}");
        return ExitCode::FAILURE;
    }
    println!("db_path={}", config.db_path.display());

    let feed = FeedService::sqlite(&config.db_path, config.feed.clone());
    match feed.get_timeline(Viewer::Anonymous, 0, 0).await {
        Ok(timeline) => {
            println!("public_timeline items={} total={}", timeline.items.len(), timeline.total);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                "event=cli_probe module=cli status=error stage=timeline code={}",
                err.code()
            );
            eprintln!("timeline error: {err}");
            ExitCode::FAILURE
        }
    }
}
