// youtube.rs - YouTube Search Command
// Scrapes the YouTube results page for the first video id and posts its
// watch link. Links pasted directly are normalised instead of searched.
//
// Used by: main.rs (command registration)

use crate::commands::get_http_client;
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::channel::Message,
};

const RESULTS_URL: &str = "https://www.youtube.com/results";
const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// Results are embedded as JSON in the page; the first videoId is the top hit
static VIDEO_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""videoId":"([A-Za-z0-9_-]{11})""#).expect("Invalid YouTube video id regex pattern")
});

// Older markup only carried plain watch links
static WATCH_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/watch\?v=([A-Za-z0-9_-]{11})").expect("Invalid YouTube watch link regex pattern")
});

/// First video id in a results page
pub fn extract_first_video_id(html: &str) -> Option<String> {
    VIDEO_ID_RE
        .captures(html)
        .or_else(|| WATCH_LINK_RE.captures(html))
        .map(|caps| caps[1].to_string())
}

/// Video id from a youtube.com or youtu.be link
pub fn extract_video_id(url: &str) -> Option<String> {
    let id = if url.contains("youtube.com/watch") {
        let start = url.find("v=")? + 2;
        let rest = &url[start..];
        &rest[..rest.find('&').unwrap_or(rest.len())]
    } else if url.contains("youtu.be/") {
        let start = url.rfind('/')? + 1;
        let rest = &url[start..];
        &rest[..rest.find('?').unwrap_or(rest.len())]
    } else {
        return None;
    };
    (id.len() == 11).then(|| id.to_string())
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

async fn search_first_video(query: &str) -> Result<Option<String>, reqwest::Error> {
    let client = get_http_client().await;
    let html = client
        .get(RESULTS_URL)
        .query(&[("search_query", query)])
        .header("User-Agent", BROWSER_AGENT)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    debug!("[YOUTUBE] Results page for '{}' is {} bytes", query, html.len());
    Ok(extract_first_video_id(&html))
}

#[command]
#[aliases("yt")]
/// Search YouTube and post the top result
pub async fn youtube(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let query = args.rest().trim();
    if query.is_empty() {
        msg.reply(ctx, "❌ Usage: `youtube <search terms>`").await?;
        return Ok(());
    }

    if let Some(id) = extract_video_id(query) {
        msg.channel_id.say(&ctx.http, watch_url(&id)).await?;
        return Ok(());
    }

    let typing = msg.channel_id.start_typing(&ctx.http);
    let found = search_first_video(query).await;
    if let Ok(typing) = typing {
        let _ = typing.stop();
    }

    match found {
        Ok(Some(id)) => {
            msg.channel_id.say(&ctx.http, watch_url(&id)).await?;
        }
        Ok(None) => {
            msg.reply(ctx, "Your search terms gave no results.").await?;
        }
        Err(e) => {
            error!("[YOUTUBE] Search for '{}' failed: {}", query, e);
            msg.reply(ctx, "❌ Sorry, I couldn't reach YouTube right now.").await?;
        }
    }
    Ok(())
}

#[group]
#[commands(youtube)]
pub struct Youtube;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_video_id_from_json() {
        let page = r#"<script>var ytInitialData = {"contents":[{"videoRenderer":{"videoId":"dQw4w9WgXcQ","title":{}}},{"videoRenderer":{"videoId":"9bZkp7q19f0"}}]};</script>"#;
        assert_eq!(extract_first_video_id(page).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_extract_first_video_id_from_links() {
        let page = r#"<a href="/watch?v=9bZkp7q19f0">Gangnam Style</a>"#;
        assert_eq!(extract_first_video_id(page).as_deref(), Some("9bZkp7q19f0"));
        assert_eq!(extract_first_video_id("<html>no results</html>"), None);
    }

    #[test]
    fn test_extract_video_id_from_urls() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(extract_video_id("never gonna give you up"), None);
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
    }
}
