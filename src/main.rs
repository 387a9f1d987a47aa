use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use season_extractor::converter::{StatusKind, COPIED_LABEL};
use season_extractor::prompt::load_instruction;
use season_extractor::{
    ApiServer, Config, ConvertInput, Converter, GeminiProvider, Osc52Clipboard, RenderOp,
};

fn cli() -> Command {
    Command::new("season-extractor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turn a list of video URLs into season/episode JSON with Gemini")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (TOML)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert a pasted URL list using your own API key")
                .arg(
                    Arg::new("api-key")
                        .short('k')
                        .long("api-key")
                        .value_name("KEY")
                        .env("GEMINI_API_KEY")
                        .hide_env_values(true)
                        .help("Gemini API key"),
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE")
                        .help("File with the URL list (reads stdin when omitted)"),
                )
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .value_name("MODEL")
                        .help("Override the configured model"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Also write the JSON result to this file"),
                )
                .arg(
                    Arg::new("copy")
                        .long("copy")
                        .help("Copy the result to the clipboard (OSC 52)")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Run the generate proxy with the server-held key (GOOGLE_API_KEY)")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Address to bind"),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .value_parser(clap::value_parser!(u16))
                        .help("Port to listen on"),
                )
                .arg(
                    Arg::new("static-dir")
                        .long("static-dir")
                        .value_name("DIR")
                        .help("Serve the converter front-end from this directory"),
                ),
        )
}

fn init_logging(config: &Config, verbose: bool) {
    let default_filter = if verbose {
        "season_extractor=debug,info"
    } else {
        config.logging.filter.as_str()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Terminal rendering of converter updates: status on stderr, JSON on stdout
fn render_terminal(op: &RenderOp) {
    match op {
        RenderOp::SetStatus(status) => match status.kind {
            StatusKind::Error => eprintln!("\x1b[31m{}\x1b[0m", status.text),
            StatusKind::Success => eprintln!("\x1b[32m{}\x1b[0m", status.text),
            StatusKind::Normal => eprintln!("{}", status.text),
        },
        RenderOp::ShowResults(json) => println!("{}", json),
        RenderOp::SetCopyLabel(label) if label == COPIED_LABEL => eprintln!("{}", label),
        RenderOp::HideResults | RenderOp::SetCopyLabel(_) => {}
    }
}

async fn read_input(path: Option<&String>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input file {}", path)),
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            Ok(text)
        }
    }
}

/// Returns whether the conversion succeeded. A failure has already been
/// rendered as the status line, so it is not repeated as an error.
async fn run_convert(config: Config, matches: &ArgMatches) -> Result<bool> {
    let model = matches
        .get_one::<String>("model")
        .cloned()
        .unwrap_or_else(|| config.llm.model.clone());

    let input = ConvertInput {
        api_key: matches.get_one::<String>("api-key").cloned().unwrap_or_default(),
        raw_text: read_input(matches.get_one::<String>("input")).await?,
    };

    let instruction = load_instruction(config.llm.prompt_file.as_deref()).await;
    let provider = GeminiProvider::new(&config.llm)?;
    let mut converter = Converter::new(provider, Osc52Clipboard::stderr(), model, instruction)
        .with_copy_feedback(config.ui.copy_feedback());

    if converter.convert(&input, render_terminal).await.is_err() {
        return Ok(false);
    }

    if let Some(path) = matches.get_one::<String>("output") {
        tokio::fs::write(path, &converter.state().output)
            .await
            .with_context(|| format!("Failed to write {}", path))?;
        info!("💾 Result written to {}", path);
    }

    if matches.get_flag("copy") {
        converter.copy(render_terminal).await?;
    }

    Ok(true)
}

async fn run_serve(mut config: Config, matches: &ArgMatches) -> Result<()> {
    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    if let Some(dir) = matches.get_one::<String>("static-dir") {
        config.server.static_dir = Some(PathBuf::from(dir));
    }
    config.validate()?;

    ApiServer::new(Arc::new(config)).start().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    init_logging(&config, matches.get_flag("verbose"));
    debug!("{}", config.summary());

    match matches.subcommand() {
        Some(("convert", sub)) => {
            if !run_convert(config, sub).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(("serve", sub)) => run_serve(config, sub).await,
        _ => Err(anyhow!("No subcommand given")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_serve_args() {
        let matches = cli()
            .try_get_matches_from(["season-extractor", "serve", "--port", "9000", "--host", "127.0.0.1"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "serve");
        assert_eq!(sub.get_one::<u16>("port"), Some(&9000));
        assert_eq!(sub.get_one::<String>("host").map(String::as_str), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_failed_conversion_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("urls.txt");
        std::fs::write(&input, "https://cdn.example/Show.S01E01.mp4").unwrap();

        let matches = cli()
            .try_get_matches_from([
                "season-extractor",
                "convert",
                "--api-key",
                "  ",
                "--input",
                input.to_str().unwrap(),
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();

        let succeeded = run_convert(Config::default(), sub).await.unwrap();
        assert!(!succeeded);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["season-extractor", "convert", "--copy", "-v", "-c", "x.toml"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
        assert_eq!(matches.get_one::<String>("config").map(String::as_str), Some("x.toml"));
        let (_, sub) = matches.subcommand().unwrap();
        assert!(sub.get_flag("copy"));
    }
}
