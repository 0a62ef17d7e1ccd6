// src/fetch/mod.rs

pub mod browser;

use anyhow::{Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE},
    Client,
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::{SourceConfig, SourceKind};
use self::browser::{render_page, RenderOptions};
use crate::table::{
    csv_reader::read_csv_table,
    html::{extract_data_date, page_text, read_html_tables},
    normalize_table, select_holdings_table, NormalizedTable,
};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/123.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// What one fetch cycle yields before it is dated and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedHoldings {
    /// Date printed on the page, `YYYY/MM/DD`.
    pub data_date: Option<String>,
    pub table: NormalizedTable,
}

/// A client that looks like a desktop browser in Taiwan.
pub fn build_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.8"),
    );
    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .cookie_store(true)
        .gzip(true)
        .build()
        .context("building HTTP client")
}

async fn get_text_core(client: &Client, url: &Url) -> Result<String> {
    debug!("Fetching text from {}", url);
    client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .text()
        .await
        .with_context(|| format!("Reading text from {}", url))
}

async fn get_text_with_retry(
    client: &Client,
    url: &Url,
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<String> {
    let mut attempts = 0;
    loop {
        match get_text_core(client, url).await {
            Ok(t) => return Ok(t),
            Err(e) if attempts < max_retries => {
                attempts += 1;
                let backoff = initial_backoff_ms * 2u64.pow(attempts - 1);
                warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                error!(%url, error = %e, "Exhausted retries");
                return Err(e);
            }
        }
    }
}

/// Pick and clean the holdings table out of a full HTML page.
pub fn parse_html_holdings(html: &str) -> Result<FetchedHoldings> {
    let data_date = extract_data_date(&page_text(html));
    let tables = read_html_tables(html);
    let table = select_holdings_table(&tables)?;
    Ok(FetchedHoldings {
        data_date,
        table: normalize_table(table),
    })
}

/// CSV exports carry one table and no page text, so there is no data date.
pub fn parse_csv_holdings(text: &str) -> Result<FetchedHoldings> {
    let raw = read_csv_table(text)?;
    Ok(FetchedHoldings {
        data_date: None,
        table: normalize_table(&raw),
    })
}

/// Fetch one source and turn it into a normalized table.
///
/// `playwright_html` sources are rendered in headless Chromium; `html` and
/// `csv` are plain GETs.
pub async fn fetch_holdings(
    client: &Client,
    render: &RenderOptions,
    source: &SourceConfig,
) -> Result<FetchedHoldings> {
    let kind = source.kind()?;
    let url =
        Url::parse(&source.url).with_context(|| format!("parsing source URL {}", source.url))?;
    let body = match kind {
        SourceKind::RenderedHtml => render_page(&url, render).await?,
        SourceKind::Html | SourceKind::Csv => {
            get_text_with_retry(client, &url, MAX_RETRIES, INITIAL_BACKOFF_MS).await?
        }
    };
    debug!(kind = kind.as_str(), bytes = body.len(), "fetched source body");

    match kind {
        SourceKind::RenderedHtml | SourceKind::Html => parse_html_holdings(&body),
        SourceKind::Csv => parse_csv_holdings(&body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HoldingsError;
    use crate::table::Cell;

    #[test]
    fn test_parse_html_holdings() -> Result<()> {
        let html = r#"<html><body>
            <p>Data Date: 2024-05-17</p>
            <table><tr><th>NAV</th></tr><tr><td>18.2</td></tr></table>
            <table>
              <tr><th> Ticker </th><th>Name</th><th>Weight (%)</th><th>Note</th></tr>
              <tr><td>AAPL</td><td>Apple</td><td>7.1</td><td></td></tr>
              <tr><td>MSFT</td><td>Microsoft</td><td>6.9</td><td></td></tr>
            </table>
        </body></html>"#;
        let got = parse_html_holdings(html)?;
        assert_eq!(got.data_date.as_deref(), Some("2024/05/17"));
        // "Note" is empty everywhere and gets dropped
        assert_eq!(got.table.columns, vec!["Ticker", "Name", "Weight (%)"]);
        assert_eq!(got.table.rows[1]["Ticker"], Some(Cell::text("MSFT")));
        Ok(())
    }

    #[test]
    fn test_parse_html_without_tables() {
        let err = parse_html_holdings("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert_eq!(
            err.downcast_ref::<HoldingsError>(),
            Some(&HoldingsError::NoTablesFound)
        );
    }

    #[test]
    fn test_parse_csv_holdings() -> Result<()> {
        let got = parse_csv_holdings("代號,名稱,權重(%)\n2330,台積電,10.1\n")?;
        assert_eq!(got.data_date, None);
        assert_eq!(got.table.columns, vec!["代號", "名稱", "權重(%)"]);
        assert_eq!(got.table.row_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_type_fails_before_network() {
        let client = build_client().unwrap();
        let source = SourceConfig {
            source_type: "ftp".into(),
            url: "https://example.invalid/".into(),
        };
        let err = fetch_holdings(&client, &RenderOptions::default(), &source)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<HoldingsError>(),
            Some(&HoldingsError::UnknownSourceType("ftp".into()))
        );
    }

    #[tokio::test]
    async fn test_rendered_source_goes_through_browser() {
        let client = build_client().unwrap();
        let render = RenderOptions {
            executable: Some("/nonexistent/holdscraper-chromium".into()),
            ..RenderOptions::default()
        };
        let source = SourceConfig {
            source_type: "playwright_html".into(),
            url: "https://example.invalid/holdings".into(),
        };
        // no silent fallback to a static GET
        let err = fetch_holdings(&client, &render, &source).await.unwrap_err();
        assert!(format!("{:#}", err).contains("headless browser"), "{:#}", err);
    }
}
