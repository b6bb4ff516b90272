use crate::commands::paths::{validate_input, validate_output};
use crate::context::Context;
use crate::diff::{
    DiffRenderer, MarkdownRenderer, PlanDocument, PlanFormat, PlanParser, detect_format,
};
use anyhow::{Context as _, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// Input format selection on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FormatChoice {
    /// Detect from the first non-blank line
    #[default]
    Auto,
    /// Newline-delimited `terraform plan -json` events
    Streaming,
    /// Single `terraform show -json` document
    Show,
}

impl FormatChoice {
    fn resolve(self, content: &str) -> PlanFormat {
        match self {
            FormatChoice::Auto => detect_format(content),
            FormatChoice::Streaming => PlanFormat::Streaming,
            FormatChoice::Show => PlanFormat::Show,
        }
    }
}

/// Options for a single conversion
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: FormatChoice,
    pub quiet: bool,
}

/// Handles the conversion of a plan JSON file into a Markdown report
pub struct ConvertCommand;

impl ConvertCommand {
    /// Execute the conversion
    pub fn execute(ctx: &Context, options: &ConvertOptions) -> Result<()> {
        let input = validate_input(ctx.fs.as_ref(), &options.input)
            .context("Invalid input file")?;
        let output = validate_output(ctx.fs.as_ref(), &options.output)
            .context("Invalid output file")?;

        if !options.quiet {
            ctx.output.info(&format!("Reading {}", input.display()));
        }

        let content = ctx.fs.read_to_string(&input)?;

        let format = options.format.resolve(&content);
        Self::report_format(ctx, format, options.quiet);

        let plan = PlanParser::new()
            .parse(&content, format)
            .with_context(|| format!("Failed to convert {}", input.display()))?;

        if plan.skipped_lines > 0 {
            ctx.output.warning(&format!(
                "Skipped {} line(s) that were not valid JSON objects",
                plan.skipped_lines
            ));
        }

        let markdown = MarkdownRenderer::new().render(&plan);
        ctx.fs
            .write(&output, &markdown)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;

        if !options.quiet {
            Self::report_summary(ctx, &plan);
            ctx.output
                .success(&format!("Markdown report written to {}", output.display()));
        }

        Ok(())
    }

    fn report_format(ctx: &Context, format: PlanFormat, quiet: bool) {
        match format {
            PlanFormat::Unknown => {
                ctx.output.warning(
                    "Could not detect the plan format; reading it as streaming output",
                );
                ctx.output
                    .warning("Streaming format cannot distinguish tag-only updates");
                if !quiet {
                    ctx.output
                        .dimmed("Use --format to choose the parser explicitly");
                }
            }
            PlanFormat::Streaming => {
                if !quiet {
                    ctx.output
                        .info(&format!("Detected {}", format.description()));
                }
                ctx.output
                    .warning("Streaming format cannot distinguish tag-only updates");
                if !quiet {
                    ctx.output.dimmed(
                        "For tag change detection run: terraform plan -out=tfplan && terraform show -json tfplan > tf-out.json",
                    );
                }
            }
            PlanFormat::Show if !quiet => {
                ctx.output
                    .info(&format!("Detected {}", format.description()));
            }
            _ => {}
        }
    }

    fn report_summary(ctx: &Context, plan: &PlanDocument) {
        let summary = plan.summary();

        ctx.output.section("Plan Summary");
        if !summary.has_changes() {
            ctx.output.dimmed("No resource changes detected");
        }
        ctx.output.key_value("Create", &summary.create.to_string());
        ctx.output.key_value("Update", &summary.update.to_string());
        if summary.update_tags_only > 0 {
            ctx.output.key_value(
                "Update (tags only)",
                &summary.update_tags_only.to_string(),
            );
        }
        ctx.output.key_value("Replace", &summary.replace.to_string());
        ctx.output.key_value("Delete", &summary.delete.to_string());
        if summary.read > 0 {
            ctx.output.key_value("Read", &summary.read.to_string());
        }
        if !plan.errors.is_empty() {
            ctx.output.key_value("Errors", &plan.errors.len().to_string());
        }
        ctx.output.blank();
    }
}
