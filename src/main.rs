mod cli;
mod config;
mod input;
mod remote;

use std::time::Instant;

use anyhow::{bail, Context};
use chrono::{Datelike, Utc};
use log::debug;

use pgn_insights::{analyze, analyzer, parse};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::parse();
    init_logging(args.verbose);

    if args.help {
        cli::print_help();
        return Ok(());
    }
    let cfg = config::Config::load();

    if let Some(n) = cfg.rayon_threads {
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    }

    // pick username: CLI override > config
    let username = match args.username.clone().or_else(|| cfg.username.clone()) {
        Some(u) if !u.trim().is_empty() => u.trim().to_string(),
        _ => bail!("missing required fields: username"),
    };

    let pgn_text = if args.lichess {
        let this_year = Utc::now().year();
        let since = args.since.unwrap_or(this_year);
        let until = args.until.unwrap_or(this_year);
        let req = remote::build_request(&cfg.lichess_url, &username, since, until)?;
        let token = std::env::var("LICHESS_TOKEN").ok().filter(|t| !t.is_empty());
        remote::fetch_games_pgn(req, token).await?
    } else if let Some(path) = args.file.as_deref() {
        input::read_file(path)?
    } else {
        match input::read_stdin()? {
            Some(text) => text,
            None => bail!("missing required fields: file"),
        }
    };

    let t0 = Instant::now();
    let games = parse(&pgn_text);
    debug!("parse: {} games in {:.3}s", games.len(), t0.elapsed().as_secs_f64());
    if games.is_empty() {
        bail!("no valid games found in PGN file");
    }

    let t1 = Instant::now();
    let mut stats = analyze(&games, &username);
    debug!("analyze: {:.3}s", t1.elapsed().as_secs_f64());

    if let Some(out) = args.out.as_deref() {
        analyzer::write_openings_csv(&stats.openings, out)
            .with_context(|| format!("writing {}", out.display()))?;
        debug!("csv: wrote {}", out.display());
    }
    if let Some(n) = cfg.top_openings {
        stats.openings.truncate(n);
    }

    let json = if args.pretty || cfg.pretty {
        serde_json::to_string_pretty(&stats)?
    } else {
        serde_json::to_string(&stats)?
    };
    println!("{}", json);
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}
