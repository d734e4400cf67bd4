//! APKPure listing scraper
//!
//! Two page fetches per app: the search page (to find the listing path) and
//! the listing itself. Both bodies are memoised in the TTL cache; the search
//! result practically never moves, the listing changes with each release.

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client as HttpClient;
use scraper::{ElementRef, Html, Selector};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::AppSource;
use crate::cache::{CacheTtl, TtlCache};
use crate::error::{Result, SourceError};
use crate::models::{AppRecord, play_store_url};
use crate::store::keys;

/// APKPure site root
const BASE_URL: &str = "https://apkpure.com";

const SOURCE_NAME: &str = "apkpure";

/// Page fetches per second; scraping is polite or it gets blocked
const REQUESTS_PER_SECOND: u32 = 2;

const USER_AGENT: &str = concat!("stapler/", env!("CARGO_PKG_VERSION"));

/// Primary source scraping APKPure listing pages
pub struct ApkPureSource {
    http: HttpClient,
    base_url: String,
    cache: TtlCache,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl ApkPureSource {
    pub fn new(cache: TtlCache) -> Result<Self> {
        let http = HttpClient::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(SourceError::from)?;

        let quota = Quota::per_second(NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            http,
            base_url: BASE_URL.to_string(),
            cache,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Point at a different site root (tests, mirrors)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.rate_limiter.until_ready().await;

        let response = self.http.get(url).send().await.map_err(SourceError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable {
                source_name: SOURCE_NAME,
                reason: format!("HTTP {} for {}", status.as_u16(), url),
            }
            .into());
        }

        let body = response.text().await.map_err(SourceError::from)?;
        Ok(body)
    }

    /// Listing path for `app_id`, from the (cached) search page
    async fn find_listing_path(&self, app_id: &str) -> Result<Option<String>> {
        let search_url =
            reqwest::Url::parse_with_params(&format!("{}/search", self.base_url), &[("q", app_id)])
                .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
        let body = self
            .cache
            .wrap(&keys::apkpure_search(app_id), CacheTtl::APKPURE_SEARCH, || async {
                self.fetch_text(search_url.as_str()).await.map(Some)
            })
            .await?;

        match body {
            Some(html) => parse_listing_path(&html),
            None => Ok(None),
        }
    }

    /// Listing page body, `None` when the search found nothing
    async fn listing_page(&self, app_id: &str) -> Result<Option<String>> {
        let Some(path) = self.find_listing_path(app_id).await? else {
            return Ok(None);
        };

        let url = format!("{}{}", self.base_url, path);
        self.cache
            .wrap(&keys::apkpure_detail(app_id), CacheTtl::APKPURE_DETAIL, || async {
                self.fetch_text(&url).await.map(Some)
            })
            .await
    }
}

#[async_trait]
impl AppSource for ApkPureSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn attempt(&self, app_id: &str) -> Result<AppRecord> {
        let Some(html) = self.listing_page(app_id).await? else {
            return Err(SourceError::Unavailable {
                source_name: SOURCE_NAME,
                reason: format!("no search result for {}", app_id),
            }
            .into());
        };

        parse_listing(app_id, &html)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SourceError::InvalidResponse(format!("bad selector {css}: {e:?}")).into())
}

fn first<'a>(document: &'a Html, css: &str) -> Result<Option<ElementRef<'a>>> {
    Ok(document.select(&selector(css)?).next())
}

fn first_text(document: &Html, css: &str) -> Result<Option<String>> {
    Ok(first(document, css)?
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// First search hit's href
fn parse_listing_path(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    Ok(first(&document, "p.search-title > a")?
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string))
}

/// Build a record from a listing page
fn parse_listing(app_id: &str, html: &str) -> Result<AppRecord> {
    let document = Html::parse_document(html);

    let version = first_text(&document, r#"span[itemprop="version"]"#)?.ok_or_else(|| {
        SourceError::InvalidResponse(format!("{} listing has no version", app_id))
    })?;

    let updated = first_text(&document, r#"p[itemprop="datePublished"]"#)?
        .as_deref()
        .and_then(parse_publish_date);

    let size = first_text(&document, "span.fsize > span")?
        .as_deref()
        .map(parse_size);

    Ok(AppRecord {
        id: app_id.to_string(),
        name: first_text(&document, "div.title-like > h1")?,
        version: Some(version),
        updated,
        changelog: first_text(&document, "div#whatsnew")?,
        size,
        icon: first(&document, "div.icon > img")?
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string),
        url: Some(play_store_url(app_id)),
        last_changed: None,
    })
}

/// `YYYY-MM-DD...` at midnight UTC
fn parse_publish_date(text: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let date = text.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// "12.5 MB" / "830 KB" / raw bytes to bytes; unparsable sizes are 0
fn parse_size(text: &str) -> u64 {
    let text = text.trim();
    let (number, multiplier) = if let Some(idx) = text.find("MB") {
        (&text[..idx], 1024.0 * 1024.0)
    } else if let Some(idx) = text.find("KB") {
        (&text[..idx], 1024.0)
    } else {
        (text, 1.0)
    };

    number
        .trim()
        .parse::<f64>()
        .map(|n| (n * multiplier).floor() as u64)
        .unwrap_or(0)
}
