//! `mdpdf watch` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use mdpdf_batch::{WatchOptions, watch};
use mdpdf_config::{ConfigLayer, WatchLayer};

use super::{GlobalArgs, build_converter};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Input files or glob patterns (e.g. "docs/**/*.md").
    #[arg(required = true)]
    patterns: Vec<String>,

    /// Output directory (default: next to each input).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Quiet period in milliseconds before a changed file is converted (overrides config).
    #[arg(long)]
    debounce: Option<u64>,
}

impl WatchArgs {
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let config = global.load_config(ConfigLayer {
            watch: WatchLayer {
                debounce_ms: self.debounce,
            },
            ..ConfigLayer::default()
        })?;

        let options = WatchOptions {
            output_dir: self.output_dir,
            debounce: config.watch.debounce(),
        };
        let converter = Arc::new(build_converter(config));
        let mut session = watch(converter, &self.patterns, options)?;

        for dir in session.watched_dirs() {
            output.info(&format!("Watching {}", dir.display()));
        }
        output.highlight("Press Ctrl+C to stop");

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    break;
                }
                next = session.next_result() => match next {
                    Some(result) => output.conversion(&result),
                    None => break,
                },
            }
        }

        session.close();
        output.info("Stopped watching");
        Ok(())
    }
}
