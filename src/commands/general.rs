// general.rs - General Commands
// Small everyday commands: latency check, random choices, coin flips,
// the magic 8 ball, lmgtfy links, a per-user stopwatch and bot info.
//
// Used by: main.rs (command registration, StopwatchKey init)

use crate::commands::bot_config;
use crate::utils::{escape_mass_mentions, flip_text, format_clock, random_colour, version_string};
use chrono::{DateTime, Utc};
use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::{channel::Message, id::UserId},
    prelude::TypeMapKey,
};
use std::collections::HashMap;

const EIGHT_BALL: [&str; 20] = [
    "As I see it, yes",
    "It is certain",
    "It is decidedly so",
    "Most likely",
    "Outlook good",
    "Signs point to yes",
    "Without a doubt",
    "Yes",
    "Yes – definitely",
    "You may rely on it",
    "Reply hazy, try again",
    "Ask again later",
    "Better not tell you now",
    "Cannot predict now",
    "Concentrate and ask again",
    "Don't count on it",
    "My reply is no",
    "My sources say no",
    "Outlook not so good",
    "Very doubtful",
];

const FACES: [&str; 8] = ["OwO", "owo", "uwu", "UwU", "QwQ", "0w0", "✧w✧", "♡w♡"];

/// Running stopwatches, keyed by who started them
pub struct StopwatchKey;
impl TypeMapKey for StopwatchKey {
    type Value = HashMap<UserId, DateTime<Utc>>;
}

fn pick<'a>(options: &[&'a str]) -> &'a str {
    options.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}

/// The 8 ball only answers questions
pub fn is_question(text: &str) -> bool {
    let text = text.trim();
    text.ends_with('?') && text != "?"
}

#[command]
/// Measure how long a reply takes to land
pub async fn ping(ctx: &Context, msg: &Message) -> CommandResult {
    let start_time = std::time::Instant::now();
    let mut response = msg.reply(ctx, "Pong! Calculating delay...").await?;
    let elapsed = start_time.elapsed();

    let face = pick(&FACES);
    let updated = format!("**Pong {}** `{}ms`", face, elapsed.as_millis());
    if let Err(e) = response.edit(&ctx.http, |m| m.content(updated)).await {
        warn!("[PING] Failed to update ping message with delay: {}", e);
    }
    Ok(())
}

#[command]
/// Pick one of several choices. Quote choices that contain spaces.
pub async fn choose(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let choices: Vec<String> = args
        .quoted()
        .iter::<String>()
        .filter_map(Result::ok)
        .map(|c| escape_mass_mentions(&c))
        .collect();
    if choices.len() < 2 {
        msg.reply(ctx, "Not enough choices to pick from.").await?;
        return Ok(());
    }
    let chosen = choices
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_default();
    msg.channel_id.say(&ctx.http, chosen).await?;
    Ok(())
}

#[command]
/// Random number between 1 and the given number (default 100)
pub async fn roll(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let number = args.single::<u64>().unwrap_or(100);
    if number > 1 {
        let n = rand::thread_rng().gen_range(1..=number);
        msg.channel_id
            .say(&ctx.http, format!("<@{}> :game_die: {} :game_die:", msg.author.id, n))
            .await?;
    } else {
        msg.channel_id
            .say(&ctx.http, format!("<@{}> Maybe higher than 1? ;P", msg.author.id))
            .await?;
    }
    Ok(())
}

#[command]
/// Flip a coin... or a user
pub async fn flip(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let target = crate::utils::parse_user_mention(args.rest());
    let target = match target {
        Some(target) => target,
        None => {
            let side = pick(&["HEADS!*", "TAILS!*"]);
            msg.channel_id
                .say(&ctx.http, format!("*flips a coin and... {}", side))
                .await?;
            return Ok(());
        }
    };

    let mut prefix = "";
    let mut target = target;
    if target == ctx.cache.current_user_id() {
        target = msg.author.id;
        prefix = "Nice try. You think this is funny? How about *this* instead:\n\n";
    }
    let name = match target.to_user(ctx).await {
        Ok(user) => user.name,
        Err(_) => {
            msg.reply(ctx, "❌ User not found!").await?;
            return Ok(());
        }
    };
    msg.channel_id
        .say(&ctx.http, format!("{}(╯°□°）╯︵ {}", prefix, flip_text(&name)))
        .await?;
    Ok(())
}

#[command("8")]
#[aliases("8ball")]
/// Ask the 8 ball a question. It must end with a question mark.
pub async fn eight_ball(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    if is_question(args.rest()) {
        let answer = pick(&EIGHT_BALL);
        msg.channel_id.say(&ctx.http, format!("`{}`", answer)).await?;
    } else {
        msg.reply(ctx, "That doesn't look like a question.").await?;
    }
    Ok(())
}

#[command]
/// Let me google that for you
pub async fn lmgtfy(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let terms = args.rest().trim();
    if terms.is_empty() {
        msg.reply(ctx, "❌ Usage: `lmgtfy <search terms>`").await?;
        return Ok(());
    }
    let url = reqwest::Url::parse_with_params("https://lmgtfy.app/", &[("q", terms)])?;
    msg.channel_id
        .say(&ctx.http, escape_mass_mentions(url.as_str()))
        .await?;
    Ok(())
}

#[command]
#[aliases("sw")]
/// Start or stop your stopwatch
pub async fn stopwatch(ctx: &Context, msg: &Message) -> CommandResult {
    let now = Utc::now();
    let started = {
        let mut data = ctx.data.write().await;
        let watches = data
            .get_mut::<StopwatchKey>()
            .ok_or("stopwatches missing from context")?;
        match watches.remove(&msg.author.id) {
            Some(started) => Some(started),
            None => {
                watches.insert(msg.author.id, now);
                None
            }
        }
    };

    let reply = match started {
        None => format!("<@{}> Stopwatch started!", msg.author.id),
        Some(started) => format!(
            "<@{}> Stopwatch stopped! Time: **{}**",
            msg.author.id,
            format_clock(now - started)
        ),
    };
    msg.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

#[command]
#[aliases("about", "version")]
/// Version and basic facts about the bot
pub async fn info(ctx: &Context, msg: &Message) -> CommandResult {
    let config = bot_config(ctx).await?;
    let guilds = ctx.cache.guild_count();
    let bot_name = ctx.cache.current_user().name;
    let colour = random_colour();

    msg.channel_id
        .send_message(&ctx.http, |m| {
            m.embed(|e| {
                e.title(format!("{} info", bot_name));
                e.colour(colour);
                e.field("Version", version_string(), true);
                e.field("Servers", guilds, true);
                e.field("Prefix", format!("`{}`", config.prefix), true);
                e.field("Library", "serenity 0.11", true);
                e.footer(|f| f.text(format!("Requested by {}", msg.author.name)));
                e
            })
        })
        .await?;
    Ok(())
}

#[group]
#[commands(ping, choose, roll, flip, eight_ball, lmgtfy, stopwatch, info)]
pub struct General;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_question() {
        assert!(is_question("Will it rain?"));
        assert!(is_question("  really?  "));
        assert!(!is_question("?"));
        assert!(!is_question("tell me"));
    }

    #[test]
    fn test_pick_returns_an_option() {
        for _ in 0..20 {
            assert!(EIGHT_BALL.contains(&pick(&EIGHT_BALL)));
        }
        assert_eq!(pick(&[]), "");
    }
}
