//! oascheck CLI - check live HTTP exchanges against an OpenAPI contract

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use oascheck_core::{Config, HttpRequest};
use oascheck_runner::{ContractGuard, HttpExecutor, Outcome, SpecCache};

const CONFIG_FILE: &str = ".oascheck.toml";

#[derive(Parser)]
#[command(name = "oascheck")]
#[command(about = "Check live HTTP exchanges against an OpenAPI contract")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request and check both sides against the spec
    Check {
        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Path as declared in the spec, optionally with `?query`
        #[arg(short, long)]
        path: String,

        /// Query parameter (repeatable)
        #[arg(long = "query", value_name = "NAME=VALUE", value_parser = key_value)]
        query: Vec<(String, String)>,

        /// Header (repeatable)
        #[arg(long = "header", value_name = "NAME:VALUE", value_parser = header)]
        headers: Vec<(String, String)>,

        /// Value for a `{name}` path placeholder (repeatable)
        #[arg(long = "path-param", value_name = "NAME=VALUE", value_parser = key_value)]
        path_params: Vec<(String, String)>,

        /// Request body
        #[arg(long)]
        body: Option<String>,

        /// Content type of the body
        #[arg(long, default_value = "application/json")]
        content_type: String,

        #[command(flatten)]
        target: Target,

        /// Server to send the request to (overrides config)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// List the operations declared by a spec
    Operations {
        #[command(flatten)]
        target: Target,
    },

    /// Initialize config file
    Init,

    /// Export JSON Schema for the failure payload
    Schema,
}

/// Which spec to use and how paths are mounted.
#[derive(clap::Args)]
struct Target {
    /// Config file (default: .oascheck.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Spec name (overrides `default_spec`)
    #[arg(short, long)]
    spec: Option<String>,

    /// Spec source name (overrides `default_source`)
    #[arg(long)]
    source: Option<String>,

    /// Mount prefix (overrides `path_prefix`)
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if result.is_err() {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))
}

fn header(raw: &str) -> Result<(String, String), String> {
    raw.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected NAME:VALUE, got '{raw}'"))
}

impl Target {
    fn load(&self) -> Result<(Config, ContractGuard)> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(Path::new(path))?,
            None => Config::load_default()?,
        };
        if let Some(spec) = &self.spec {
            cfg.default_spec = Some(spec.clone());
        }
        if let Some(source) = &self.source {
            cfg.default_source = source.clone();
        }
        if let Some(prefix) = &self.prefix {
            cfg.path_prefix = prefix.clone();
        }
        debug!(
            source = %cfg.default_source,
            spec = ?cfg.default_spec,
            prefix = %cfg.path_prefix,
            "configuration loaded"
        );

        // Failures are reported as data and mapped to the exit code
        let guard = ContractGuard::from_config(&cfg, SpecCache::new())?.with_capture(true);
        Ok((cfg, guard))
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Check {
            method,
            path,
            query,
            headers,
            path_params,
            body,
            content_type,
            target,
            base_url,
        } => {
            let (cfg, guard) = target.load()?;
            let base_url = base_url
                .or_else(|| cfg.base_url.clone())
                .context("no base_url configured (set it in the config or pass --base-url)")?;
            let executor = HttpExecutor::new(base_url)?;

            let mut request = HttpRequest::new(method, &path);
            request.query.extend(query);
            for (name, value) in headers {
                request.headers.append(name, value);
            }
            request.path_params.extend(path_params);
            if let Some(body) = body {
                request = request.with_body(&content_type, body);
            }

            if cfg.default_spec.is_none() && cli.output != OutputFormat::Silent {
                eprintln!("No spec selected: request is sent unchecked.");
            }

            let outcome = guard.run(&request, |req| executor.execute(req))?;
            print_outcome(&outcome, cli.output, cfg.suppress_pretty_errors)?;
            Ok(i32::from(outcome.is_failure()))
        }

        Commands::Operations { target } => {
            let (_, guard) = target.load()?;
            let Some(document) = guard.document()? else {
                bail!("no spec selected (set default_spec or pass --spec)");
            };

            match cli.output {
                OutputFormat::Terminal => {
                    println!("OpenAPI {}", document.version);
                    for (template, method, operation) in document.operations() {
                        println!(
                            "  {:<7} {template}  {}",
                            method.to_string(),
                            operation.operation_id.as_deref().unwrap_or("-")
                        );
                    }
                }
                OutputFormat::Json => {
                    let operations: Vec<_> = document
                        .operations()
                        .map(|(template, method, operation)| {
                            serde_json::json!({
                                "method": method.to_string(),
                                "path": template,
                                "operation_id": operation.operation_id,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&operations)?);
                }
                OutputFormat::Silent => {}
            }
            Ok(0)
        }

        Commands::Init => {
            if Path::new(CONFIG_FILE).exists() {
                eprintln!("{CONFIG_FILE} already exists");
                return Ok(1);
            }

            std::fs::write(CONFIG_FILE, Config::example())?;
            println!("Created {CONFIG_FILE}");
            println!("\nEdit the file to configure:");
            println!("  - default_spec: spec checked when none is chosen");
            println!("  - sources: where specs are loaded from (local, remote, github)");
            println!("  - base_url: server `oascheck check` talks to");
            Ok(0)
        }

        Commands::Schema => {
            let schema = oascheck_core::error::generate_schema();
            println!("{schema}");
            Ok(0)
        }
    }
}

fn print_outcome(outcome: &Outcome, output: OutputFormat, suppress_pretty: bool) -> Result<()> {
    match output {
        OutputFormat::Terminal => match outcome {
            Outcome::Unchecked(response) => {
                println!("UNCHECKED: {}", response.status);
            }
            Outcome::Passed {
                operation,
                response,
            } => {
                println!("PASS: {operation} -> {}", response.status);
            }
            Outcome::Failed(failure) if suppress_pretty => {
                println!("{}", serde_json::to_string(&failure.payload)?);
            }
            Outcome::Failed(failure) => {
                println!("FAIL: [{}] {}", failure.payload.exception, failure.payload.message);
                println!("  Status: {}", failure.status);
                for error in failure.payload.errors.iter().flatten() {
                    println!("  - {error}");
                }
            }
        },
        OutputFormat::Json => {
            let json = match outcome {
                Outcome::Unchecked(response) => serde_json::json!({
                    "outcome": "unchecked",
                    "status": response.status,
                }),
                Outcome::Passed {
                    operation,
                    response,
                } => serde_json::json!({
                    "outcome": "passed",
                    "operation": operation,
                    "status": response.status,
                }),
                Outcome::Failed(failure) => serde_json::json!({
                    "outcome": "failed",
                    "status": failure.status,
                    "failure": failure.payload,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Silent => {}
    }
    Ok(())
}
