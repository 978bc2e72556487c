use std::time::Instant;

use anyhow::Context;
use chrono::NaiveDate;
use log::debug;
use reqwest::header::ACCEPT;
use tokio::task;

/// One export request: whose games, and the [since, until] window in epoch ms.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub url: String,
    pub since_ms: i64,
    pub until_ms: i64,
}

/// Jan 1 00:00:00 of `since` through Dec 31 23:59:59 of `until`, UTC, in ms.
pub fn year_window_ms(since: i32, until: i32) -> anyhow::Result<(i64, i64)> {
    let start = NaiveDate::from_ymd_opt(since, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .with_context(|| format!("invalid start year {}", since))?;
    let end = NaiveDate::from_ymd_opt(until, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .with_context(|| format!("invalid end year {}", until))?;
    if end < start {
        anyhow::bail!("--until {} is before --since {}", until, since);
    }
    Ok((start.and_utc().timestamp_millis(), end.and_utc().timestamp_millis()))
}

pub fn build_request(
    base_url: &str,
    username: &str,
    since: i32,
    until: i32,
) -> anyhow::Result<ExportRequest> {
    let (since_ms, until_ms) = year_window_ms(since, until)?;
    Ok(ExportRequest {
        url: format!("{}/api/games/user/{}", base_url.trim_end_matches('/'), username),
        since_ms,
        until_ms,
    })
}

/// Download the user's games as PGN text.
pub async fn fetch_games_pgn(req: ExportRequest, token: Option<String>) -> anyhow::Result<String> {
    debug!("remote: GET {} since={} until={}", req.url, req.since_ms, req.until_ms);
    let t0 = Instant::now();

    let text = task::spawn_blocking(move || -> anyhow::Result<String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()?;
        let mut rb = client
            .get(&req.url)
            .header(ACCEPT, "application/x-chess-pgn")
            .query(&[
                ("since", req.since_ms.to_string()),
                ("until", req.until_ms.to_string()),
                ("opening", "true".to_string()),
            ]);
        if let Some(t) = token.as_deref() {
            rb = rb.bearer_auth(t);
        }
        let resp = rb.send()?.error_for_status()?;
        Ok(resp.text()?)
    })
    .await?
    .context("fetching games from Lichess")?;

    debug!("remote: {} bytes in {:.3}s", text.len(), t0.elapsed().as_secs_f64());
    Ok(text)
}
