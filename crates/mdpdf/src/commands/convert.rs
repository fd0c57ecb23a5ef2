//! `mdpdf convert` command implementation.

use std::path::PathBuf;

use clap::Args;
use mdpdf_config::ConfigLayer;
use mdpdf_pdf::output_path_for;

use super::{GlobalArgs, build_converter};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Markdown file to convert.
    input: PathBuf,

    /// Output PDF path (default: input path with a .pdf extension).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ConvertArgs {
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let config = global.load_config(ConfigLayer::default())?;

        if !self.input.is_file() {
            return Err(CliError::Validation(format!(
                "Input file not found: {}",
                self.input.display()
            )));
        }

        let target = self
            .output
            .unwrap_or_else(|| output_path_for(&self.input, None));
        let result = build_converter(config)
            .convert_to(&self.input, &target)
            .await;

        if !result.success {
            return Err(CliError::Conversion(format!(
                "{}: {}",
                self.input.display(),
                result.error.as_deref().unwrap_or("conversion failed")
            )));
        }
        output.conversion(&result);
        Ok(())
    }
}
