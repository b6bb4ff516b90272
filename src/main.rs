mod commands;
mod context;
mod diff;
mod output;
mod traits;

use clap::Parser;
use clap::error::ErrorKind;
use commands::{ConvertCommand, ConvertOptions, FormatChoice};
use context::Context;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "planmd")]
#[command(about = "Convert Terraform/OpenTofu plan JSON into a Markdown change report", long_about = None)]
#[command(version)]
struct Cli {
    /// Plan JSON file (`terraform plan -json` or `terraform show -json` output)
    input: PathBuf,

    /// Report file to write (.md or .json)
    output: PathBuf,

    /// Input format; `auto` detects it from the first non-blank line
    #[arg(long, value_enum, env = "PLANMD_FORMAT", default_value_t = FormatChoice::Auto)]
    format: FormatChoice,

    /// Only print warnings and errors
    #[arg(short, long, env = "PLANMD_QUIET")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    let ctx = Context::new();
    let options = ConvertOptions {
        input: cli.input,
        output: cli.output,
        format: cli.format,
        quiet: cli.quiet,
    };

    match ConvertCommand::execute(&ctx, &options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ctx.output.error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
