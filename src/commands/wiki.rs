// wiki.rs - Wikipedia Lookup
// Finds the best matching article with the opensearch API, then posts its
// REST summary as an embed.
//
// Used by: main.rs (command registration)

use crate::commands::{bot_config, get_http_client};
use crate::utils::random_colour;
use log::{error, info};
use serde::Deserialize;
use serde_json::Value;
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::channel::Message,
};

const SUMMARY_LIMIT: usize = 1500;

#[derive(Debug, Clone, Deserialize)]
pub struct WikiSummary {
    pub title: String,
    #[serde(default)]
    pub extract: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<WikiImage>,
    #[serde(default)]
    pub content_urls: Option<ContentUrls>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WikiImage {
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentUrls {
    pub desktop: PageUrl,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageUrl {
    pub page: String,
}

/// Title and URL of the first opensearch hit: `[query, [titles], [descriptions], [urls]]`
pub fn first_opensearch_hit(response: &Value) -> Option<(String, String)> {
    let title = response.get(1)?.get(0)?.as_str()?;
    let url = response.get(3)?.get(0)?.as_str()?;
    Some((title.to_string(), url.to_string()))
}

/// Cut at a sentence boundary when the extract is too long for the embed
pub fn shorten(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    match cut.rfind(". ") {
        Some(end) => cut[..=end].to_string(),
        None => format!("{}…", cut.trim_end()),
    }
}

fn api_base(language: &str) -> String {
    format!("https://{}.wikipedia.org", language)
}

async fn lookup(language: &str, query: &str) -> Result<Option<(WikiSummary, String)>, reqwest::Error> {
    let client = get_http_client().await;
    let base = api_base(language);

    let search: Value = client
        .get(format!("{}/w/api.php", base))
        .query(&[
            ("action", "opensearch"),
            ("search", query),
            ("limit", "1"),
            ("namespace", "0"),
            ("format", "json"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let (title, url) = match first_opensearch_hit(&search) {
        Some(hit) => hit,
        None => return Ok(None),
    };

    let mut summary_url = match reqwest::Url::parse(&format!("{}/api/rest_v1/page/summary/", base)) {
        Ok(url) => url,
        Err(_) => return Ok(None),
    };
    if let Ok(mut segments) = summary_url.path_segments_mut() {
        segments.pop_if_empty().push(&title.replace(' ', "_"));
    }

    let summary: WikiSummary = client
        .get(summary_url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(Some((summary, url)))
}

#[command]
#[aliases("wikipedia")]
/// Look something up on Wikipedia
pub async fn wiki(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let query = args.rest().trim();
    if query.is_empty() {
        msg.reply(ctx, "❌ Usage: `wiki <search terms>`").await?;
        return Ok(());
    }
    let config = bot_config(ctx).await?;

    match lookup(&config.wiki_language, query).await {
        Ok(Some((summary, url))) => {
            info!("[WIKI] '{}' -> {}", query, summary.title);
            let link = summary
                .content_urls
                .as_ref()
                .map(|c| c.desktop.page.clone())
                .unwrap_or(url);
            let colour = random_colour();
            msg.channel_id
                .send_message(&ctx.http, |m| {
                    m.embed(|e| {
                        e.title(&summary.title);
                        e.url(&link);
                        e.colour(colour);
                        e.description(shorten(&summary.extract, SUMMARY_LIMIT));
                        if let Some(description) = &summary.description {
                            e.footer(|f| f.text(description));
                        }
                        if let Some(thumb) = &summary.thumbnail {
                            e.thumbnail(&thumb.source);
                        }
                        e
                    })
                })
                .await?;
        }
        Ok(None) => {
            msg.reply(ctx, "I couldn't find an article for that.").await?;
        }
        Err(e) => {
            error!("[WIKI] Lookup of '{}' failed: {}", query, e);
            msg.reply(ctx, "❌ Sorry, Wikipedia isn't answering right now.").await?;
        }
    }
    Ok(())
}

#[group]
#[commands(wiki)]
pub struct Wiki;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_opensearch_hit() {
        let response = json!([
            "rust",
            ["Rust (programming language)"],
            [""],
            ["https://en.wikipedia.org/wiki/Rust_(programming_language)"]
        ]);
        assert_eq!(
            first_opensearch_hit(&response),
            Some((
                "Rust (programming language)".to_string(),
                "https://en.wikipedia.org/wiki/Rust_(programming_language)".to_string()
            ))
        );
        assert_eq!(first_opensearch_hit(&json!(["zzzz", [], [], []])), None);
    }

    #[test]
    fn test_summary_parses_with_missing_fields() {
        let summary: WikiSummary = serde_json::from_value(json!({
            "title": "Ferris",
            "extract": "A crab.",
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Ferris"}}
        }))
        .unwrap();
        assert_eq!(summary.title, "Ferris");
        assert!(summary.thumbnail.is_none());
        assert_eq!(summary.content_urls.unwrap().desktop.page, "https://en.wikipedia.org/wiki/Ferris");
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("short", 10), "short");
        assert_eq!(shorten("One. Two. Three four five", 12), "One. Two.");
        assert_eq!(shorten("abcdefghij", 4), "abcd…");
    }
}
