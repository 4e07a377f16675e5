use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_lsp::{LspService, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rdfls::config::Settings;
use rdfls::engine::Engine;
use rdfls::graph::Syntax;
use rdfls::server::Backend;

const DEFAULT_TCP_ADDR: &str = "127.0.0.1:7612";

/// Language server for RDF vocabularies. Serves LSP over stdio unless a
/// subcommand is given.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Vocabulary cache directory (default: the shared rdf-graph-cache)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Serve one client over TCP instead of stdio (default: 127.0.0.1:7612)
    #[arg(long, value_name = "ADDR", num_args = 0..=1, default_missing_value = DEFAULT_TCP_ADDR)]
    tcp: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a prefix and list the terms of its vocabulary
    Lookup { prefix: String },
    /// Show where a prefixed term is defined
    Define { curie: String },
    /// Report syntax errors and unknown terms in a file
    Check {
        file: PathBuf,
        /// turtle, trig, jsonld or rdf; guessed from the file otherwise
        #[arg(long)]
        syntax: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("RDFLS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        None => serve(cli.cache_dir, cli.tcp),
        Some(command) => run(command, cli.cache_dir),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn serve(cache_dir: Option<PathBuf>, tcp: Option<SocketAddr>) -> anyhow::Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Could not start the async runtime")?;

    runtime.block_on(async {
        let (service, socket) = LspService::new(|client| Backend::new(client, cache_dir));
        match tcp {
            None => {
                let stdin = tokio::io::stdin();
                let stdout = tokio::io::stdout();
                Server::new(stdin, stdout, socket).serve(service).await;
            }
            Some(addr) => {
                let listener = TcpListener::bind(addr)
                    .await
                    .with_context(|| format!("Could not listen on {addr}"))?;
                info!("Waiting for a client on {}", addr);
                let (stream, peer) = listener.accept().await?;
                info!("Client connected from {}", peer);
                let (read, write) = tokio::io::split(stream);
                Server::new(read, write, socket).serve(service).await;
            }
        }
        anyhow::Ok(())
    })?;
    Ok(ExitCode::SUCCESS)
}

fn engine(cache_dir: Option<PathBuf>) -> anyhow::Result<Engine> {
    let root = std::env::current_dir()?;
    let mut settings = Settings::new(&root)?;
    if let Some(cache_dir) = cache_dir {
        settings.cache_dir = Some(cache_dir.to_string_lossy().into_owned());
    }
    Engine::new(settings)
}

fn run(command: Command, cache_dir: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let mut engine = engine(cache_dir)?;

    match command {
        Command::Lookup { prefix } => {
            let namespace = engine
                .prefixes()
                .lookup(&prefix)
                .ok_or_else(|| anyhow!("Unknown prefix {prefix}:"))?;
            println!("{prefix}: <{namespace}>");

            let lines = [format!("@prefix {prefix}: <{namespace}> ."), format!("{prefix}:")];
            for completion in engine.completions(&lines, 1, prefix.len() + 1, Syntax::Turtle) {
                println!(
                    "  {prefix}:{:<32} {}",
                    completion.label,
                    completion.detail.unwrap_or_default()
                );
            }
        }
        Command::Define { curie } => {
            let (prefix, _) = curie
                .split_once(':')
                .ok_or_else(|| anyhow!("Expected prefix:name, got {curie}"))?;
            let namespace = engine
                .prefixes()
                .lookup(prefix)
                .ok_or_else(|| anyhow!("Unknown prefix {prefix}:"))?;

            let lines = [format!("@prefix {prefix}: <{namespace}> ."), curie.clone()];
            let definition = engine
                .definition(&lines, 1, 0)
                .ok_or_else(|| anyhow!("No definition found for {curie}"))?;
            println!(
                "{}:{}:{}",
                definition.source.display(),
                definition.line + 1,
                definition.column + 1
            );
        }
        Command::Check { file, syntax } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Could not read {}", file.display()))?;
            let syntax = detect_syntax(&file, syntax.as_deref(), &text)?;
            let lines: Vec<&str> = text.lines().collect();

            let diagnostics = engine.check(&lines, syntax);
            for diagnostic in &diagnostics {
                println!(
                    "{}:{}:{}: {}",
                    file.display(),
                    diagnostic.line + 1,
                    diagnostic.column + 1,
                    diagnostic.message
                );
            }
            if !diagnostics.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn detect_syntax(file: &Path, requested: Option<&str>, text: &str) -> anyhow::Result<Syntax> {
    match requested {
        Some(name) => {
            Syntax::from_language_id(name).ok_or_else(|| anyhow!("Unknown syntax {name}"))
        }
        None => Ok(Syntax::from_path(file).unwrap_or_else(|| Syntax::guess(text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_flag_defaults_to_local_port() {
        let cli = Cli::try_parse_from(["rdfls", "--tcp"]).unwrap();
        assert_eq!(cli.tcp, Some(DEFAULT_TCP_ADDR.parse().unwrap()));
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["rdfls", "--tcp", "0.0.0.0:9000"]).unwrap();
        assert_eq!(cli.tcp, Some("0.0.0.0:9000".parse().unwrap()));

        let cli = Cli::try_parse_from(["rdfls"]).unwrap();
        assert!(cli.tcp.is_none());
    }
}
