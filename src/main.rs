//! Reel CLI

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use futures_util::future::join_all;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use reel::config::Config;
use reel::network::{ContentDecoder, HttpClient, HyperClient, RedirectFollower};
use reel::{CassetteAgent, HeaderCollection};

fn print_usage() {
    eprintln!("Reel v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("Usage: reel [URI ...] CASSETTE");
    eprintln!("       reel --config FILE [URI ...]");
    eprintln!();
    eprintln!("Make GET requests to one or more HTTP or HTTPS URIs and record the interactions");
    eprintln!("in a cassette. If the cassette already exists, it is replayed instead.");
    eprintln!("If no URIs are given, they are read from standard input, one per line.");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reel=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print_usage();
        process::exit(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

/// Parse arguments into a configuration and the URIs given on the command line
fn parse_args(mut args: Vec<String>) -> anyhow::Result<(Config, Vec<String>)> {
    if args.first().map(String::as_str) == Some("--config") {
        let Some(path) = args.get(1) else {
            bail!("--config requires a file argument");
        };
        let config = Config::from_file(&PathBuf::from(path))
            .with_context(|| format!("loading {path}"))?;
        return Ok((config, args.split_off(2)));
    }

    let Some(cassette) = args.pop() else {
        bail!("missing CASSETTE argument");
    };
    let config = Config::new(cassette);
    config.validate()?;
    Ok((config, args))
}

async fn read_uris_from_stdin() -> anyhow::Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut uris = Vec::new();
    while let Some(line) = lines.next_line().await.context("reading URIs from stdin")? {
        let uri = line.trim();
        if !uri.is_empty() {
            uris.push(uri.to_string());
        }
    }
    Ok(uris)
}

/// Fetch every URI, then save the cassette. Returns whether everything succeeded.
async fn run(args: Vec<String>) -> anyhow::Result<bool> {
    let (config, mut uris) = parse_args(args)?;
    if uris.is_empty() {
        uris = read_uris_from_stdin().await?;
    }

    let agent = Arc::new(
        CassetteAgent::from_config(HyperClient::new(), &config)
            .with_context(|| format!("opening cassette {}", config.cassette_path.display()))?,
    );
    let client = ContentDecoder::new(RedirectFollower::new(
        Arc::clone(&agent),
        config.limits.max_redirects,
    ));

    let headers = HeaderCollection::new();
    let fetches = uris.iter().map(|uri| {
        let client = &client;
        let headers = &headers;
        async move {
            let response = client.request("GET", uri, headers, None).await?;
            let status = response.status;
            let body = response.into_bytes().await?;
            Ok::<_, reel::ReelError>((status, body.len()))
        }
    });

    let mut all_ok = true;
    for (uri, result) in uris.iter().zip(join_all(fetches).await) {
        match result {
            Ok((status, length)) => println!("{uri}: {status} ({length} bytes)"),
            Err(e) => {
                all_ok = false;
                eprintln!("{uri}: {e}");
            }
        }
    }

    agent
        .save(())
        .with_context(|| format!("saving cassette {}", config.cassette_path.display()))?;

    Ok(all_ok)
}
