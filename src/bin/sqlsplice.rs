//! sqlsplice: render SQL templates from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Render a template
//! sqlsplice "SELECT * FROM users WHERE id = {}" --arg 42
//!
//! # Typed string and JSON output
//! sqlsplice "SELECT * FROM t WHERE code = {:varchar(10)}" --arg '"A1"' --format json
//!
//! # Show the skeleton and captured parameters
//! sqlsplice explain "SELECT {} + {}" --arg 1 --arg 1 --reuse
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use sqlsplice::prelude::*;
use sqlsplice::render::reference_name;

#[derive(Parser)]
#[command(name = "sqlsplice")]
#[command(version)]
#[command(about = "Render injection-safe SQL templates", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlsplice 'SELECT * FROM users WHERE id = {}' --arg 42
    sqlsplice 'SELECT * FROM t WHERE name = {:nvarchar(50)}' --arg bob --format json
    sqlsplice 'SELECT * FROM t WHERE id IN {}' --arg '[1,2,3]' --symbol ':'")]
struct Cli {
    /// Format string: `{}`, `{N}`, `{:annotation}`, `{{`/`}}` for braces
    template: Option<String>,

    /// Argument values, JSON if it parses, text otherwise
    #[arg(short, long = "arg", global = true)]
    args: Vec<String>,

    /// Map equal values to one parameter
    #[arg(long, global = true)]
    reuse: bool,

    /// Parameter symbol (default `@`)
    #[arg(long, global = true)]
    symbol: Option<String>,

    /// Generated parameter name prefix (default `p`)
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Options file (TOML)
    #[arg(long, env = "SQLSPLICE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Also print the query with values inlined (debugging only)
    #[arg(long, global = true)]
    preview: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the skeleton and captured parameters of a template
    Explain {
        /// The template to explain
        template: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Explain { template }) => explain(template, &cli),
        None => match &cli.template {
            Some(template) => render(template, &cli),
            None => {
                println!("{}", "sqlsplice: injection-safe SQL templates".cyan().bold());
                println!();
                println!("Usage: sqlsplice <TEMPLATE> [--arg <VALUE>]...");
                println!();
                println!("Try: sqlsplice --help");
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sqlsplice=debug" } else { "sqlsplice=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(cli: &Cli) -> anyhow::Result<Arc<Options>> {
    let base = match &cli.config {
        Some(path) => Options::load(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => Options::discover()?,
    };
    let options = Options::builder()
        .reuse_identical_parameters(cli.reuse || base.reuse_identical_parameters)
        .parameter_symbol(cli.symbol.clone().unwrap_or(base.parameter_symbol))
        .auto_parameter_prefix(cli.prefix.clone().unwrap_or(base.auto_parameter_prefix))
        .array_suffix(base.array_suffix)
        .auto_spacing(base.auto_spacing)
        .auto_strip_quotes(base.auto_strip_quotes)
        .auto_dedent(base.auto_dedent)
        .build();
    Ok(options)
}

/// `42` → Int, `"x"` → String, `[1,2]` → Array, `bob` → String.
fn parse_arg(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from_json(json),
        Err(_) => Value::String(raw.to_string()),
    }
}

fn build(template: &str, cli: &Cli) -> anyhow::Result<SqlBuilder> {
    let options = load_options(cli)?;
    let args = cli.args.iter().map(|a| Arg::from(parse_arg(a))).collect();
    let template = Template::format(template, args).context("invalid template")?;
    if cli.verbose {
        eprintln!("{} {} part(s)", "Template:".dimmed(), template.parts().len());
    }
    Ok(SqlBuilder::parse_with(options, template))
}

fn render(template: &str, cli: &Cli) -> anyhow::Result<()> {
    let builder = build(template, cli)?;
    let rendered = builder.render();

    match cli.format {
        OutputFormat::Json => {
            let mut json = serde_json::to_value(rendered)?;
            if cli.preview {
                json["preview"] = serde_json::Value::String(builder.preview().to_string());
            }
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{}", "SQL:".green().bold());
            println!("  {}", rendered.sql.white());

            if !rendered.parameters.is_empty() {
                println!();
                println!("{}", "Parameters:".cyan());
                for p in &rendered.parameters {
                    println!(
                        "  {}{} = {}",
                        builder.options().parameter_symbol,
                        p.name.yellow(),
                        p.value
                    );
                }
            }

            if cli.preview {
                println!();
                println!("{}", "Preview (not for execution):".yellow());
                println!("  {}", builder.preview().dimmed());
            }
        }
    }
    Ok(())
}

fn explain(template: &str, cli: &Cli) -> anyhow::Result<()> {
    let builder = build(template, cli)?;
    let options = builder.options();

    println!("{}", "sqlsplice template explanation".cyan().bold());
    println!();
    println!("{} {}", "Template:".dimmed(), template.yellow());
    println!("{} {}", "Skeleton:".dimmed(), builder.skeleton().white());
    println!();

    if builder.params().is_empty() {
        println!("{}", "(no captured parameters)".dimmed());
        return Ok(());
    }

    println!(
        "{:6} {:12} {:30} {}",
        "Index".white().bold(),
        "Name".white().bold(),
        "Value".white().bold(),
        "Annotation".white().bold()
    );
    println!("{}", "─".repeat(64).dimmed());
    for (i, p) in builder.params().iter().enumerate() {
        let name = format!(
            "{}{}",
            options.parameter_symbol,
            reference_name(i, &p.value, options)
        );
        println!(
            "{:6} {:12} {:30} {}",
            i.to_string().cyan(),
            name.yellow(),
            p.value.to_string(),
            p.annotation.as_deref().unwrap_or("-").dimmed()
        );
    }
    Ok(())
}
