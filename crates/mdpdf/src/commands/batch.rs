//! `mdpdf batch` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use mdpdf_batch::{BatchOptions, BatchOrchestrator, expand_patterns};
use mdpdf_config::{BatchLayer, ConfigLayer};

use super::{GlobalArgs, build_converter};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the batch command.
#[derive(Args)]
pub(crate) struct BatchArgs {
    /// Input files or glob patterns (e.g. "docs/**/*.md").
    #[arg(required = true)]
    patterns: Vec<String>,

    /// Output directory (default: next to each input).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of files converted at once (overrides config).
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Keep converting after a file fails.
    #[arg(long)]
    continue_on_error: bool,
}

impl BatchArgs {
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let config = global.load_config(ConfigLayer {
            batch: BatchLayer {
                concurrency: self.concurrency,
                continue_on_error: self.continue_on_error.then_some(true),
            },
            ..ConfigLayer::default()
        })?;

        let files = expand_patterns(&self.patterns);
        if files.is_empty() {
            return Err(CliError::Validation(format!(
                "No files matched: {}",
                self.patterns.join(" ")
            )));
        }

        let total = files.len();
        let options = BatchOptions {
            output_dir: self.output_dir,
            concurrency: config.batch.concurrency,
            continue_on_error: config.batch.continue_on_error,
        };
        output.info(&format!(
            "Converting {total} file(s), {} at a time",
            options.concurrency
        ));

        let orchestrator = BatchOrchestrator::new(Arc::new(build_converter(config)));
        let result = orchestrator
            .run_files(files, &options, |r| output.conversion(r))
            .await;

        if result.stopped_early {
            output.warning(&format!(
                "Stopped after a failure; {} file(s) not converted",
                total - result.results.len()
            ));
        }
        output.highlight(&format!(
            "{} succeeded, {} failed",
            result.succeeded, result.failed
        ));

        if result.failed > 0 {
            return Err(CliError::Conversion(format!(
                "{} of {total} file(s) failed",
                result.failed
            )));
        }
        Ok(())
    }
}
