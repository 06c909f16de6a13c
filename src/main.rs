use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod report;

#[derive(Parser, Debug)]
#[clap(author = "Simon Zeng", version, about = "Plot report utilities")]
struct Args {
    /// Enable verbose output
    #[arg(short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an HTML report by filling template placeholders with plot data
    Render {
        /// Serialized plot list artifact
        #[arg()]
        plots: Option<PathBuf>,

        /// HTML template containing {{plots[i][0]}} / {{plots[i][1]}} placeholders
        #[arg()]
        template: Option<PathBuf>,

        /// Where to write the rendered report (default: analysis_report.html)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// TOML file providing plots, template, output and format
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Artifact format: 'json', 'cbor' or 'pickle' (default: from the file extension)
        #[arg(long, value_parser = ["json", "cbor", "pickle"])]
        format: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    log::debug!("{args:?}");

    match args.command {
        Command::Render {
            plots,
            template,
            output,
            config,
            format,
        } => {
            let format = format.map(|name| {
                report::ArtifactFormat::from_name(&name)
                    .unwrap_or_else(|| unreachable!("Invalid format validated by clap"))
            });

            let from_cli = config::RenderConfig {
                plots,
                template,
                output,
                format,
            };

            let merged = match config {
                Some(config_path) => from_cli.or(config::RenderConfig::load(&config_path)?),
                None => from_cli,
            };

            let summary = merged.into_renderer()?.run()?;
            log::debug!(
                "Substituted {} placeholders from {} plot records",
                summary.substituted,
                summary.records
            );

            println!("HTML report generated: {}", summary.output.display());
        }
    }

    Ok(())
}
