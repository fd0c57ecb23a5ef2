//! CLI command implementations.

mod batch;
mod convert;
mod init;
mod watch;

use std::path::PathBuf;

use clap::Args;
use mdpdf_batch::{Converter, render_options};
use mdpdf_config::{
    Config, ConfigLayer, DiagramsLayer, ImageFormat, MermaidTheme, PdfLayer, StyleLayer,
};
use mdpdf_diagrams::MermaidRenderer;
use mdpdf_pdf::WkhtmltopdfGenerator;

use crate::error::CliError;

pub(crate) use batch::BatchArgs;
pub(crate) use convert::ConvertArgs;
pub(crate) use init::InitArgs;
pub(crate) use watch::WatchArgs;

/// Options shared by every command.
#[derive(Args)]
pub(crate) struct GlobalArgs {
    /// Path to configuration file (default: auto-discover mdpdf.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output (per-document and per-diagram logs).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Mermaid theme: default, forest, dark, neutral or base (overrides config).
    #[arg(long, global = true)]
    theme: Option<MermaidTheme>,

    /// Diagram image format: png or svg (overrides config).
    #[arg(long, global = true)]
    format: Option<ImageFormat>,

    /// Use landscape pages.
    #[arg(long, global = true)]
    landscape: bool,

    /// Additional stylesheet (overrides config).
    #[arg(long, global = true)]
    css_file: Option<PathBuf>,

    /// Keep per-document working directories for inspection.
    #[arg(long, global = true)]
    keep_temp: bool,
}

impl GlobalArgs {
    /// Overrides from the global flags.
    fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            pdf: PdfLayer {
                landscape: self.landscape.then_some(true),
                ..PdfLayer::default()
            },
            diagrams: DiagramsLayer {
                theme: self.theme,
                output_format: self.format,
                ..DiagramsLayer::default()
            },
            style: StyleLayer {
                css_file: self.css_file.clone(),
                ..StyleLayer::default()
            },
            keep_temp: self.keep_temp.then_some(true),
            ..ConfigLayer::default()
        }
    }

    /// Load configuration with the global flags and `command` overrides applied.
    pub(crate) fn load_config(&self, command: ConfigLayer) -> Result<Config, CliError> {
        let overrides = self.overrides().merge(command);
        Ok(Config::load(self.config.as_deref(), Some(&overrides))?)
    }
}

/// Converter driving `mmdc` and `wkhtmltopdf` with the given configuration.
pub(crate) fn build_converter(
    config: Config,
) -> Converter<WkhtmltopdfGenerator, impl Fn() -> MermaidRenderer + Send + Sync + 'static> {
    let options = render_options(&config);
    Converter::new(config, WkhtmltopdfGenerator::new(), move || {
        MermaidRenderer::new(options.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        global: GlobalArgs,
    }

    #[test]
    fn test_overrides_from_flags() {
        let cli = TestCli::parse_from([
            "mdpdf",
            "--theme",
            "dark",
            "--format",
            "svg",
            "--landscape",
            "--css-file",
            "print.css",
        ]);

        let layer = cli.global.overrides();

        assert_eq!(layer.diagrams.theme, Some(MermaidTheme::Dark));
        assert_eq!(layer.diagrams.output_format, Some(ImageFormat::Svg));
        assert_eq!(layer.pdf.landscape, Some(true));
        assert_eq!(layer.style.css_file, Some(PathBuf::from("print.css")));
        assert_eq!(layer.keep_temp, None);
    }

    #[test]
    fn test_unset_flags_leave_layer_empty() {
        let cli = TestCli::parse_from(["mdpdf"]);

        let layer = cli.global.overrides();

        assert_eq!(layer.pdf.landscape, None);
        assert_eq!(layer.diagrams.theme, None);
        assert_eq!(layer.style.css_file, None);
    }

    #[test]
    fn test_invalid_theme_is_rejected() {
        let result = TestCli::try_parse_from(["mdpdf", "--theme", "sepia"]);
        assert!(result.is_err());
    }
}
