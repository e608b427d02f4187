//! RustWeaver CLI Entry Point
//!
//! Provides a command-line interface for checking and translating
//! workflow manifests.
//!
//! # Usage
//!
//! ```bash
//! # Translate the main workflow of a manifest to CWL
//! rustweaver translate somatic.yaml
//!
//! # Pick a workflow, include container requirements, choose the output
//! rustweaver translate somatic.yaml --workflow somatic_subpipeline --with-docker --output-dir cwl/
//!
//! # Print the main document instead of writing files
//! rustweaver translate somatic.yaml --stdout
//!
//! # Compile every workflow and report lint findings
//! rustweaver check somatic.yaml
//!
//! # List the tools available to manifests
//! rustweaver tools --catalog extra_tools.yaml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{error, info, warn};

use rustweaver::translation::{translate_to_disk, TranslationFormat, TranslationOptions};
use rustweaver::workflow::{load_manifest, HasPortSchema};
use rustweaver::{ToolCatalog, APP_NAME, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "rustweaver",
    about = "Typed workflow graph builder with CWL translation",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a workflow from a manifest.
    Translate {
        /// Path to the workflow manifest YAML file
        manifest: PathBuf,

        /// Workflow to translate (defaults to the manifest's main workflow)
        #[arg(long)]
        workflow: Option<String>,

        /// Target format
        #[arg(long, default_value = "cwl")]
        format: String,

        /// Directory for the generated documents
        #[arg(long, env = "RUSTWEAVER_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Emit DockerRequirement for tools that declare a container
        #[arg(long)]
        with_docker: bool,

        /// Print the main document instead of writing files
        #[arg(long)]
        stdout: bool,
    },
    /// Compile every workflow of a manifest and report findings.
    Check {
        /// Path to the workflow manifest YAML file
        manifest: PathBuf,
    },
    /// List catalog tools and their ports.
    Tools {
        /// Extra catalog YAML file, merged over the built-in tools
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    eprintln!();
    eprintln!("{} v{}", APP_NAME.bold(), VERSION);
    eprintln!("Typed Workflow Graph Builder");
    eprintln!();
}

fn run_translate(
    manifest: PathBuf,
    workflow: Option<String>,
    format: String,
    output_dir: Option<PathBuf>,
    with_docker: bool,
    stdout: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_manifest(&manifest)?;
    let compiled = match workflow {
        Some(name) => loaded.workflow(&name)?,
        None => loaded.main()?,
    };
    let format: TranslationFormat = format.parse()?;

    let options = TranslationOptions {
        with_docker,
        to_disk: !stdout,
        output_dir,
    };

    let (translation, written) = translate_to_disk(&compiled, format, &options)?;

    if stdout {
        print!("{}", translation.main.content);
        return Ok(());
    }

    println!(
        "{} Translated '{}' to {}",
        "✓".green(),
        compiled.name().bold(),
        format
    );
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}

fn run_check(manifest: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_manifest(&manifest)?;
    let mut findings_total = 0;

    for workflow in loaded.workflows() {
        let order = workflow.topological_steps()?;
        println!(
            "{} {} ({} steps, {} edges)",
            "✓".green(),
            workflow.name().bold(),
            order.len(),
            workflow.edges().len()
        );
        println!("  Order: {}", order.join(" -> "));

        for finding in workflow.lint() {
            findings_total += 1;
            println!("  {} {}", "!".yellow(), finding);
        }
    }

    if findings_total > 0 {
        warn!("{} findings", findings_total);
    } else {
        info!("No findings");
    }
    Ok(())
}

fn run_tools(catalog: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut tools = ToolCatalog::builtin();
    if let Some(path) = catalog {
        tools.extend(ToolCatalog::load(path)?)?;
    }

    for tool in tools.iter() {
        match &tool.version {
            Some(version) => println!("{} {}", tool.id.bold(), version.dimmed()),
            None => println!("{}", tool.id.bold()),
        }
        for port in tool.input_ports() {
            let marker = if port.is_required() { "" } else { "?" };
            println!("  in   {}: {}{}", port.name, port.data_type, marker);
        }
        for port in tool.output_ports() {
            println!("  out  {}: {}", port.name, port.data_type);
        }
    }
    Ok(())
}

/// Main application entry point.
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Translate {
            manifest,
            workflow,
            format,
            output_dir,
            with_docker,
            stdout,
        } => run_translate(manifest, workflow, format, output_dir, with_docker, stdout),
        Command::Check { manifest } => run_check(manifest),
        Command::Tools { catalog } => run_tools(catalog),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    print_banner();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
