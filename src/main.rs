use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use exifacet::config::Config;
use exifacet::db::Database;
use exifacet::export::{self, ExportFormat};
use exifacet::facets::{FacetEngine, FailureMode, FilterState};
use exifacet::logging;

#[derive(Debug, PartialEq)]
enum Command {
    Import(PathBuf),
    Sessions,
    SetRaw { session_id: i64, count: Option<i64> },
    DeleteSession(i64),
    Analyze(AnalyzeArgs),
    Help,
    Version,
}

#[derive(Debug, Default, PartialEq)]
struct AnalyzeArgs {
    filters: Vec<(String, Vec<String>)>,
    strict: bool,
    format: ExportFormat,
    output: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
struct Cli {
    config_path: Option<PathBuf>,
    command: Command,
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(value) => Ok(value.as_str()),
        None => bail!("{} requires an argument", flag),
    }
}

fn parse_filter(raw: &str) -> Result<(String, Vec<String>)> {
    let Some((dimension, values)) = raw.split_once('=') else {
        bail!("Filter '{}' must look like dimension=value[,value...]", raw);
    };
    let values: Vec<String> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() {
        bail!("Filter '{}' has no values", raw);
    }
    Ok((dimension.trim().to_string(), values))
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut analyze = AnalyzeArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                return Ok(Cli { config_path, command: Command::Help });
            }
            "--version" | "-V" => {
                return Ok(Cli { config_path, command: Command::Version });
            }
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(next_value(args, &mut i, "--config")?));
            }
            "--filter" | "-f" => {
                analyze.filters.push(parse_filter(next_value(args, &mut i, "--filter")?)?);
            }
            "--strict" => analyze.strict = true,
            "--format" => {
                analyze.format = next_value(args, &mut i, "--format")?.parse()?;
            }
            "--output" | "-o" => {
                analyze.output = Some(PathBuf::from(next_value(args, &mut i, "--output")?));
            }
            other if other.starts_with('-') && other.len() > 1 && other.parse::<i64>().is_err() => {
                bail!("Unknown argument: {}", other);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let analyze_only = !analyze.filters.is_empty() || analyze.strict || analyze.output.is_some();
    let command = match positional.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["import", file] => Command::Import(PathBuf::from(file)),
        ["sessions"] => Command::Sessions,
        ["set-raw", id, count] => Command::SetRaw {
            session_id: id.parse().with_context(|| format!("Invalid session id '{}'", id))?,
            count: match *count {
                "none" | "-" => None,
                n => Some(n.parse().with_context(|| format!("Invalid RAW count '{}'", n))?),
            },
        },
        ["delete-session", id] => {
            Command::DeleteSession(id.parse().with_context(|| format!("Invalid session id '{}'", id))?)
        }
        ["analyze"] => Command::Analyze(analyze),
        [] => Command::Help,
        other => bail!("Unknown command: {}", other.join(" ")),
    };

    if analyze_only && !matches!(command, Command::Analyze(_)) {
        bail!("--filter, --strict and --output only apply to 'analyze'");
    }

    Ok(Cli { config_path, command })
}

fn print_help() {
    println!(
        r#"exifacet - faceted analysis of photography EXIF metadata

USAGE:
    exifacet [OPTIONS] <COMMAND>

COMMANDS:
    import <file>               Import a JSON corpus produced by the extractor
    sessions                    List sessions with their hit rates
    set-raw <id> <count|none>   Set or clear a session's RAW photo count
    delete-session <id>         Delete a session and its photos
    analyze                     Compute the applied filter and every facet

ANALYZE OPTIONS:
    --filter, -f DIM=V1[,V2]    Constrain a dimension (repeatable)
    --strict                    Fail on invalid values and failed facets
    --format json|csv|text      Output format (default: text)
    --output, -o PATH           Write to a file instead of stdout

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

DIMENSIONS:
    category, group, camera, lens, lens_type, aperture, shutter_speed,
    iso, focal_length, time_of_day

ENVIRONMENT:
    EXIFACET_CONFIG     Path to config file (overrides default location)
    EXIFACET_LOG        Log filter (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/exifacet/config.toml"#
    );
}

fn open_database(config: &Config) -> Result<Database> {
    let db = Database::open(&config.db_path)?;
    db.initialize()?;
    Ok(db)
}

fn list_sessions(db: &Database) -> Result<()> {
    let sessions = db.list_sessions()?;
    if sessions.is_empty() {
        println!("No sessions imported.");
        return Ok(());
    }

    println!("{:>5}  {:<30}  {:<15}  {:<15}  {:>6}  {:>6}  {:>7}", "id", "name", "category", "group", "photos", "raw", "hit");
    for session in sessions {
        println!(
            "{:>5}  {:<30}  {:<15}  {:<15}  {:>6}  {:>6}  {:>7}",
            session.id,
            session.name,
            session.category,
            session.group,
            session.total_photos,
            session.total_raw_photos.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
            session.hit_rate().map(|r| format!("{:.1}%", r)).unwrap_or_else(|| "n/a".to_string()),
        );
    }
    Ok(())
}

async fn analyze(config: &Config, db: &Database, args: AnalyzeArgs) -> Result<()> {
    let parsed = FilterState::from_raw(args.filters, args.strict)?;
    for rejected in &parsed.rejected {
        eprintln!("Skipping: {}", rejected);
    }

    let engine = FacetEngine::new(Arc::new(db.corpus()), config);
    let mode = if args.strict { FailureMode::Strict } else { engine.mode() };
    let result = engine.resolve_with_mode(parsed.state, mode).await?;

    for dimension in result.degraded_facets() {
        eprintln!("Warning: {} facet is degraded", dimension);
    }

    export::export_result(&result, args.format, args.output.as_deref())
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!(db = %config.db_path.display(), "Config loaded");

    let mut db = open_database(&config)?;

    match cli.command {
        Command::Import(path) => {
            let summary = db.import_file(&path)?;
            println!("Imported {} sessions, {} photos", summary.sessions, summary.photos);
        }
        Command::Sessions => list_sessions(&db)?,
        Command::SetRaw { session_id, count } => {
            if !db.set_raw_count(session_id, count)? {
                bail!("No session with id {}", session_id);
            }
        }
        Command::DeleteSession(session_id) => match db.delete_session(session_id)? {
            Some(photos) => println!("Deleted session {} ({} photos)", session_id, photos),
            None => bail!("No session with id {}", session_id),
        },
        Command::Analyze(args) => analyze(&config, &db, args).await?,
        Command::Help | Command::Version => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("exifacet {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // journald on Linux, rolling file otherwise
    let _ = logging::init(None);

    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        std::iter::once("exifacet")
            .chain(line.split_whitespace())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_parse_analyze() {
        let cli = parse_args(&args(
            "-c /tmp/c.toml analyze --filter camera=A,B -f lens=L1 --strict --format csv -o out.csv",
        ))
        .unwrap();
        assert_eq!(cli.config_path, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(
            cli.command,
            Command::Analyze(AnalyzeArgs {
                filters: vec![
                    ("camera".to_string(), vec!["A".to_string(), "B".to_string()]),
                    ("lens".to_string(), vec!["L1".to_string()]),
                ],
                strict: true,
                format: ExportFormat::Csv,
                output: Some(PathBuf::from("out.csv")),
            })
        );
    }

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(parse_args(&args("sessions")).unwrap().command, Command::Sessions);
        assert_eq!(
            parse_args(&args("set-raw 3 240")).unwrap().command,
            Command::SetRaw { session_id: 3, count: Some(240) }
        );
        assert_eq!(
            parse_args(&args("set-raw 3 none")).unwrap().command,
            Command::SetRaw { session_id: 3, count: None }
        );
        assert_eq!(
            parse_args(&args("delete-session 7")).unwrap().command,
            Command::DeleteSession(7)
        );
        assert_eq!(
            parse_args(&args("import corpus.json")).unwrap().command,
            Command::Import(PathBuf::from("corpus.json"))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args("analyze --filter camera")).is_err());
        assert!(parse_args(&args("analyze --format html")).is_err());
        assert!(parse_args(&args("sessions --strict")).is_err());
        assert!(parse_args(&args("set-raw x 1")).is_err());
        assert!(parse_args(&args("frobnicate")).is_err());
        assert!(parse_args(&args("analyze --bogus")).is_err());
    }
}
