// image.rs - Image Commands
// Imgur gallery search and subreddit browsing, plus random memes from the
// meme API. NSFW posts are only shown in NSFW channels.
//
// Key Features:
// - ^imgur search <term> - up to 3 links from a gallery search
// - ^imgur subreddit <sub> [new|top] [day|week|month|year|all]
// - ^meme [subreddit] and ^viper
//
// Used by: main.rs (command registration)

use crate::commands::{bot_config, get_http_client};
use log::{error, warn};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::channel::{Channel, Message},
};

const IMGUR_API: &str = "https://api.imgur.com/3";
const IMGUR_RESULTS: usize = 3;
const MEME_ATTEMPTS: usize = 3;
const VIPER_SUBREDDIT: &str = "snakes";
const WINDOWS: [&str; 5] = ["day", "week", "month", "year", "all"];

#[derive(Debug, Clone, Deserialize)]
pub struct ImgurResponse {
    #[serde(default)]
    pub data: Vec<ImgurItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImgurItem {
    #[serde(default)]
    pub title: Option<String>,
    pub link: String,
    #[serde(default)]
    pub gifv: Option<String>,
    #[serde(default)]
    pub nsfw: Option<bool>,
}

impl ImgurItem {
    /// Prefer the gifv page for animated posts
    pub fn best_link(&self) -> &str {
        self.gifv.as_deref().unwrap_or(&self.link)
    }

    fn is_nsfw(&self) -> bool {
        self.nsfw.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    pub title: String,
    pub url: String,
    pub post_link: String,
    pub subreddit: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub ups: Option<i64>,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub spoiler: bool,
}

/// Map user-facing sort names to Imgur's, validating the time window
pub fn subreddit_query(sort: &str, window: &str) -> Result<(&'static str, &'static str), String> {
    let sort = match sort.to_lowercase().as_str() {
        "new" => "time",
        "top" => "top",
        _ => return Err("Only 'new' and 'top' are valid sort types.".to_string()),
    };
    let window = window.to_lowercase();
    match WINDOWS.iter().find(|w| **w == window) {
        Some(window) => Ok((sort, *window)),
        None => Err(format!("Time window must be one of: {}.", WINDOWS.join(", "))),
    }
}

/// Subreddit names are letters, digits and underscores
pub fn valid_subreddit(name: &str) -> bool {
    !name.is_empty() && name.len() <= 21 && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

async fn channel_is_nsfw(ctx: &Context, msg: &Message) -> bool {
    match msg.channel_id.to_channel(ctx).await {
        Ok(Channel::Guild(channel)) => channel.nsfw,
        _ => false,
    }
}

async fn imgur_get(client_id: &str, url: &str) -> Result<Vec<ImgurItem>, reqwest::Error> {
    let response: ImgurResponse = get_http_client()
        .await
        .get(url)
        .header("Authorization", format!("Client-ID {}", client_id))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(response.data)
}

async fn imgur_search(ctx: &Context, msg: &Message, client_id: &str, term: &str) -> CommandResult {
    if term.is_empty() {
        msg.reply(ctx, "❌ Usage: `imgur search <term>`").await?;
        return Ok(());
    }
    let url = format!(
        "{}/gallery/search/time/all/0?q={}",
        IMGUR_API,
        url_escape(term)
    );
    let nsfw_ok = channel_is_nsfw(ctx, msg).await;

    match imgur_get(client_id, &url).await {
        Ok(items) => {
            let mut items: Vec<ImgurItem> = items.into_iter().filter(|i| nsfw_ok || !i.is_nsfw()).collect();
            items.shuffle(&mut rand::thread_rng());
            if items.is_empty() {
                msg.reply(ctx, "Your search terms gave no results.").await?;
                return Ok(());
            }
            let mut reply = "Search results...\n".to_string();
            for item in items.iter().take(IMGUR_RESULTS) {
                reply.push_str(item.best_link());
                reply.push('\n');
            }
            msg.channel_id.say(&ctx.http, reply).await?;
        }
        Err(e) => {
            error!("[IMGUR] Search for '{}' failed: {}", term, e);
            msg.reply(ctx, "❌ Sorry, Imgur isn't answering right now.").await?;
        }
    }
    Ok(())
}

async fn imgur_subreddit(ctx: &Context, msg: &Message, client_id: &str, args: &[&str]) -> CommandResult {
    let subreddit = match args.first() {
        Some(sub) if valid_subreddit(sub) => *sub,
        _ => {
            msg.reply(ctx, "❌ Usage: `imgur subreddit <subreddit> [new|top] [day|week|month|year|all]`")
                .await?;
            return Ok(());
        }
    };
    let (sort, window) = match subreddit_query(
        args.get(1).copied().unwrap_or("top"),
        args.get(2).copied().unwrap_or("day"),
    ) {
        Ok(query) => query,
        Err(e) => {
            msg.reply(ctx, format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    let url = format!("{}/gallery/r/{}/{}/{}/0", IMGUR_API, subreddit, sort, window);
    let nsfw_ok = channel_is_nsfw(ctx, msg).await;
    match imgur_get(client_id, &url).await {
        Ok(items) => {
            let links: Vec<String> = items
                .iter()
                .filter(|i| nsfw_ok || !i.is_nsfw())
                .take(IMGUR_RESULTS)
                .map(|i| format!("{}\n{}", i.title.as_deref().unwrap_or(""), i.best_link()))
                .collect();
            if links.is_empty() {
                msg.reply(ctx, "No results found.").await?;
            } else {
                msg.channel_id.say(&ctx.http, links.join("\n")).await?;
            }
        }
        Err(e) => {
            error!("[IMGUR] Subreddit {} lookup failed: {}", subreddit, e);
            msg.reply(ctx, "❌ Sorry, Imgur isn't answering right now.").await?;
        }
    }
    Ok(())
}

fn url_escape(term: &str) -> String {
    reqwest::Url::parse_with_params("https://x/", &[("q", term)])
        .ok()
        .and_then(|u| u.query().map(|q| q.trim_start_matches("q=").to_string()))
        .unwrap_or_default()
}

#[command]
#[only_in(guilds)]
/// Imgur gallery search and subreddit browsing
pub async fn imgur(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let config = bot_config(ctx).await?;
    let client_id = match &config.imgur_client_id {
        Some(id) => id.clone(),
        None => {
            msg.reply(ctx, "❌ Imgur is not configured. Set `IMGUR_CLIENT_ID` in botconfig.txt.")
                .await?;
            return Ok(());
        }
    };

    let words: Vec<&str> = args.rest().split_whitespace().collect();
    match words.first().map(|w| w.to_lowercase()).as_deref() {
        Some("search") => imgur_search(ctx, msg, &client_id, &words[1..].join(" ")).await,
        Some("subreddit") => imgur_subreddit(ctx, msg, &client_id, &words[1..]).await,
        _ => {
            msg.reply(
                ctx,
                "**Imgur**\n`imgur search <term>`\n`imgur subreddit <subreddit> [new|top] [day|week|month|year|all]`",
            )
            .await?;
            Ok(())
        }
    }
}

async fn fetch_meme(base: &str, subreddit: Option<&str>) -> Result<Meme, reqwest::Error> {
    let url = match subreddit {
        Some(sub) => format!("{}/{}", base.trim_end_matches('/'), sub),
        None => base.to_string(),
    };
    get_http_client()
        .await
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<Meme>()
        .await
}

async fn post_meme(ctx: &Context, msg: &Message, subreddit: Option<&str>) -> CommandResult {
    let config = bot_config(ctx).await?;
    let nsfw_ok = channel_is_nsfw(ctx, msg).await;

    for _ in 0..MEME_ATTEMPTS {
        let meme = match fetch_meme(&config.meme_api_url, subreddit).await {
            Ok(meme) => meme,
            Err(e) => {
                error!("[MEME] Fetch from {:?} failed: {}", subreddit, e);
                msg.reply(ctx, "❌ Sorry, I couldn't fetch a meme right now.").await?;
                return Ok(());
            }
        };
        if (meme.nsfw || meme.spoiler) && !nsfw_ok {
            warn!("[MEME] Skipping NSFW post from r/{} in a SFW channel", meme.subreddit);
            continue;
        }
        let footer = format!(
            "r/{} | 👍 {} | u/{}",
            meme.subreddit,
            meme.ups.unwrap_or(0),
            meme.author.as_deref().unwrap_or("unknown")
        );
        msg.channel_id
            .send_message(&ctx.http, |m| {
                m.embed(|e| {
                    e.title(&meme.title);
                    e.url(&meme.post_link);
                    e.image(&meme.url);
                    e.colour(crate::utils::random_colour());
                    e.footer(|f| f.text(footer));
                    e
                })
            })
            .await?;
        return Ok(());
    }

    msg.reply(ctx, "I only found NSFW posts there. Try again in an NSFW channel.")
        .await?;
    Ok(())
}

#[command]
/// Random meme, optionally from a subreddit
pub async fn meme(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let subreddit = args.rest().trim().trim_start_matches("r/");
    if subreddit.is_empty() {
        return post_meme(ctx, msg, None).await;
    }
    if !valid_subreddit(subreddit) {
        msg.reply(ctx, "❌ That doesn't look like a subreddit name.").await?;
        return Ok(());
    }
    post_meme(ctx, msg, Some(subreddit)).await
}

#[command]
/// A random snake
pub async fn viper(ctx: &Context, msg: &Message) -> CommandResult {
    post_meme(ctx, msg, Some(VIPER_SUBREDDIT)).await
}

#[group]
#[commands(imgur, meme, viper)]
pub struct Image;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subreddit_query() {
        assert_eq!(subreddit_query("new", "week"), Ok(("time", "week")));
        assert_eq!(subreddit_query("TOP", "ALL"), Ok(("top", "all")));
        assert!(subreddit_query("hot", "day").is_err());
        assert!(subreddit_query("top", "decade").is_err());
    }

    #[test]
    fn test_valid_subreddit() {
        assert!(valid_subreddit("rust_gamedev"));
        assert!(!valid_subreddit("../etc"));
        assert!(!valid_subreddit(""));
    }

    #[test]
    fn test_imgur_prefers_gifv() {
        let response: ImgurResponse = serde_json::from_value(json!({
            "data": [
                {"title": "cat", "link": "https://i.imgur.com/a.gif", "gifv": "https://i.imgur.com/a.gifv"},
                {"title": "dog", "link": "https://i.imgur.com/b.jpg", "nsfw": true}
            ],
            "success": true,
            "status": 200
        }))
        .unwrap();
        assert_eq!(response.data[0].best_link(), "https://i.imgur.com/a.gifv");
        assert_eq!(response.data[1].best_link(), "https://i.imgur.com/b.jpg");
        assert!(response.data[1].is_nsfw());
    }

    #[test]
    fn test_meme_parses_api_shape() {
        let meme: Meme = serde_json::from_value(json!({
            "postLink": "https://redd.it/abc",
            "subreddit": "snakes",
            "title": "danger noodle",
            "url": "https://i.redd.it/abc.jpg",
            "nsfw": false,
            "spoiler": false,
            "author": "someone",
            "ups": 42
        }))
        .unwrap();
        assert_eq!(meme.subreddit, VIPER_SUBREDDIT);
        assert_eq!(meme.ups, Some(42));
        assert!(!meme.nsfw);
    }

    #[test]
    fn test_url_escape() {
        assert_eq!(url_escape("funny cats"), "funny+cats");
        assert_eq!(url_escape("a&b"), "a%26b");
    }
}
