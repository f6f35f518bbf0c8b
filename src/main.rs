//! Hostplate CLI
//!
//! Usage:
//!   hostplate [OPTIONS] [FILE]
//!
//! Options:
//!   -g, --group <FILE>         Group file defining named templates
//!   -d, --definition <TEXT>    Inline template definition
//!   -n, --name <NAME>          Template to render from the group
//!   -c, --config <FILE>        Invocation config (TOML: locale, [parameters])
//!   -s, --set <KEY=VALUE>      Template parameter, may be repeated
//!   -l, --list                 List the group's templates
//!   -v, --verbose              More logging (-vv for trace)
//!   -h, --help                 Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hostplate::{
    invoke, invoke_definition, CollectingSink, Diagnostic, InvokeConfig, TemplateGroup, Value,
};

#[derive(Parser)]
#[command(name = "hostplate")]
#[command(about = "Render text templates from host objects and parameters")]
struct Cli {
    /// Template definition file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Group file defining named templates
    #[arg(short, long, conflicts_with_all = ["input", "definition"])]
    group: Option<PathBuf>,

    /// Inline template definition
    #[arg(short, long, conflicts_with = "input")]
    definition: Option<String>,

    /// Template to render from the group (defaults to the first one)
    #[arg(short, long, requires = "group")]
    name: Option<String>,

    /// Invocation config file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template parameter as KEY=VALUE; values are read as TOML when they parse
    #[arg(short, long = "set", value_name = "KEY=VALUE", value_parser = parse_parameter)]
    set: Vec<(String, toml::Value)>,

    /// List the group's templates and their parameters
    #[arg(short, long, requires = "group")]
    list: bool,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => match InvokeConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => InvokeConfig::default(),
    };

    // Explicit parameters replace the config table entry by entry
    let explicit = !cli.set.is_empty();
    for (key, value) in cli.set.iter().cloned() {
        config = config.with_parameter(key, Value::from(value));
    }
    let params = if explicit {
        config.parameters_value()
    } else {
        None
    };

    let invocation = match &cli.group {
        Some(path) => {
            let source = match read_file(path) {
                Ok(s) => s,
                Err(code) => return code,
            };
            let sink = CollectingSink::new();
            let group = TemplateGroup::from_group_source(group_name(path), &source, &sink);
            let filename = path.display().to_string();
            print_diagnostics(&sink.take(), &filename);

            if cli.list {
                list_templates(&group);
                return ExitCode::SUCCESS;
            }
            invoke(&group, cli.name.as_deref(), params, &config)
                .map(|invocation| (invocation, filename))
        }
        None => {
            let (source, filename) = match (&cli.definition, &cli.input) {
                (Some(text), _) => (text.clone(), "<definition>".to_string()),
                (None, Some(path)) => match read_file(path) {
                    Ok(s) => (s, path.display().to_string()),
                    Err(code) => return code,
                },
                (None, None) => {
                    if io::stdin().is_terminal() {
                        print_intro();
                        return ExitCode::SUCCESS;
                    }
                    let mut buffer = String::new();
                    if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                        eprintln!("Error reading from stdin: {}", e);
                        return ExitCode::FAILURE;
                    }
                    (buffer, "<stdin>".to_string())
                }
            };
            invoke_definition(&source, params, &config).map(|invocation| (invocation, filename))
        }
    };

    match invocation {
        Ok((invocation, filename)) => {
            print_diagnostics(&invocation.diagnostics, &filename);
            match invocation.output {
                Some(output) => {
                    println!("{}", output);
                    ExitCode::SUCCESS
                }
                None => ExitCode::FAILURE,
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hostplate={}", default)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn parse_parameter(raw: &str) -> Result<(String, toml::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }

    // `--set count=3` is an integer, `--set name=World` stays a string
    let value = format!("value = {}", value)
        .parse::<toml::Table>()
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()));

    Ok((key.to_string(), value))
}

fn read_file(path: &Path) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading file '{}': {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn group_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "group".to_string())
}

fn print_diagnostics(diagnostics: &[Diagnostic], filename: &str) {
    for diagnostic in diagnostics {
        eprint!("{}", diagnostic.format(filename));
    }
}

fn list_templates(group: &TemplateGroup) {
    for template in group.templates() {
        println!(
            "{}({})",
            template.name,
            template.formal_parameters.join(", ")
        );
    }
}

fn print_intro() {
    println!(
        r#"Hostplate - render text templates from host objects

USAGE:
    hostplate [OPTIONS] [FILE]
    echo 'Hello, <name>!' | hostplate --set name=World

OPTIONS:
    -g, --group <FILE>       Group file with named templates
    -d, --definition <TEXT>  Inline template definition
    -n, --name <NAME>        Template to render from the group
    -c, --config <FILE>      TOML config (locale, [parameters])
    -s, --set <KEY=VALUE>    Template parameter (repeatable)
    -l, --list               List the group's templates
    -v, --verbose            More logging (-vv for trace)

QUICK START:
    hostplate -d '<items:{{it | * <it>}}; separator="\n">' --set 'items=["a", "b"]'

Run --help for the full option reference."#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parameter_values() {
        let (key, value) = parse_parameter("count=3").unwrap();
        assert_eq!(key, "count");
        assert_eq!(value, toml::Value::Integer(3));

        let (_, value) = parse_parameter("name=World").unwrap();
        assert_eq!(value.as_str(), Some("World"));

        let (_, value) = parse_parameter("items=[\"a\", \"b\"]").unwrap();
        assert!(matches!(Value::from(value), Value::List(ref items) if items.len() == 2));
    }

    #[test]
    fn test_cli_accepts_repeated_parameters() {
        let cli = Cli::try_parse_from([
            "hostplate",
            "--definition",
            "<name> <count>",
            "--set",
            "name=World",
            "-s",
            "count=2",
        ])
        .unwrap();
        assert_eq!(
            cli.set,
            vec![
                ("name".to_string(), toml::Value::String("World".to_string())),
                ("count".to_string(), toml::Value::Integer(2)),
            ]
        );
    }

    #[test]
    fn test_parse_parameter_rejects_malformed() {
        assert!(parse_parameter("novalue").is_err());
        assert!(parse_parameter("=x").is_err());
    }
}
