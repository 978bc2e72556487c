use std::path::PathBuf;

#[derive(Debug, Default, PartialEq)]
pub struct Cli {
    pub username: Option<String>,
    pub file: Option<PathBuf>,   // .pgn or .pgn.zst; stdin when absent
    pub out: Option<PathBuf>,    // openings CSV
    pub lichess: bool,
    pub since: Option<i32>,      // year, inclusive
    pub until: Option<i32>,      // year, inclusive
    pub pretty: bool,
    pub verbose: bool,
    pub help: bool,
}

pub fn parse() -> Cli {
    parse_from(std::env::args().skip(1))
}

pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Cli {
    let mut cli = Cli::default();

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--username" | "-u" => {
                if let Some(u) = it.next() { cli.username = Some(u); }
            }
            "--out" | "-o" => {
                if let Some(p) = it.next() { cli.out = Some(PathBuf::from(p)); }
            }
            "--lichess" | "--remote" => cli.lichess = true,
            "--since" | "--from" => {
                cli.since = it.next().and_then(|y| y.parse().ok());
            }
            "--until" => {
                cli.until = it.next().and_then(|y| y.parse().ok());
            }
            "--pretty" => cli.pretty = true,
            "--verbose" | "-v" => cli.verbose = true,
            "--help" | "-h" => cli.help = true,
            other if !other.starts_with('-') && cli.file.is_none() => {
                cli.file = Some(PathBuf::from(other));
            }
            _ => {}
        }
    }

    cli
}

pub fn print_help() {
    eprintln!(
r#"PGN Insights

Usage:
  From a file (or stdin when FILE is omitted):
    pgn-insights --username NAME [FILE.pgn | FILE.pgn.zst] [--out openings.csv] [--pretty] [-v]

  From Lichess (games export API):
    pgn-insights --username NAME --lichess [--since YYYY] [--until YYYY] [--out openings.csv] [-v]

Options:
  -u, --username NAME         Whose games these are (falls back to config.toml).
  --lichess, --remote         Download the user's games instead of reading a file.
  --since YYYY, --from        First year to fetch (inclusive, default: this year).
  --until YYYY                Last year to fetch (inclusive, default: this year).
  -o, --out PATH              Also write the opening table as CSV.
  --pretty                    Pretty-print the JSON report.
  -v, --verbose               Debug logging (RUST_LOG overrides).
  -h, --help                  Show this help.

Notes:
  • The report is printed to stdout as JSON.
  • lichess_url, top_openings and rayon_threads are read from config.toml.
  • LICHESS_TOKEN (env or .env) is sent as a bearer token when set.
"#);
}
