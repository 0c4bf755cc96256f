// utils.rs - Shared helpers for commands
// Mention parsing, Discord message pagination, embed colours and the
// version string shown by ^info.
//
// Used by: commands/*, modlog.rs (duration display)

use once_cell::sync::Lazy;
use rand::Rng;
use serenity::model::id::{ChannelId, UserId};
use serenity::utils::Colour;
use std::process::Command;

/// Discord rejects messages longer than this
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

static VERSION: Lazy<String> = Lazy::new(|| {
    let base = env!("CARGO_PKG_VERSION");
    match git_describe() {
        Some(describe) => format!("{} ({})", base, describe),
        None => base.to_string(),
    }
});

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let describe = String::from_utf8(output.stdout).ok()?;
    let describe = describe.trim();
    (!describe.is_empty()).then(|| describe.to_string())
}

/// Package version, plus `git describe` output when run from a checkout
pub fn version_string() -> &'static str {
    VERSION.as_str()
}

pub fn random_colour() -> Colour {
    Colour::new(rand::thread_rng().gen_range(0..=0xFF_FF_FF))
}

fn strip_mention<'a>(raw: &'a str, sigil: &str) -> Option<&'a str> {
    raw.trim()
        .strip_prefix("<")?
        .strip_suffix(">")?
        .strip_prefix(sigil)
}

/// Accepts `<@id>`, `<@!id>` or a bare id
pub fn parse_user_mention(raw: &str) -> Option<UserId> {
    let raw = raw.trim();
    let id_str = match strip_mention(raw, "@") {
        Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
        None => raw,
    };
    id_str.parse::<u64>().ok().filter(|id| *id != 0).map(UserId)
}

/// Accepts `<#id>` or a bare id
pub fn parse_channel_mention(raw: &str) -> Option<ChannelId> {
    let raw = raw.trim();
    let id_str = strip_mention(raw, "#").unwrap_or(raw);
    id_str.parse::<u64>().ok().filter(|id| *id != 0).map(ChannelId)
}

/// Defuse @everyone / @here by inserting a zero-width space
pub fn escape_mass_mentions(text: &str) -> String {
    text.replace("@everyone", "@\u{200b}everyone")
        .replace("@here", "@\u{200b}here")
}

/// Split text into chunks Discord will accept, preferring line breaks
pub fn paginate(text: &str, limit: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > limit && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
        }
        if line.chars().count() > limit {
            // A single line that does not fit gets hard-wrapped
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                let piece: String = piece.iter().collect();
                if piece.chars().count() == limit {
                    pages.push(piece);
                } else {
                    current = piece;
                }
            }
        } else {
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        pages.push(current);
    }
    pages
}

/// "2 days, 3 hours, 5 minutes" style rendering; zero gives "0 seconds"
pub fn humanize_duration(duration: chrono::Duration) -> String {
    let mut secs = duration.num_seconds().max(0);
    let units = [
        ("day", 86_400),
        ("hour", 3_600),
        ("minute", 60),
        ("second", 1),
    ];
    let mut parts = Vec::new();
    for (name, size) in units {
        let count = secs / size;
        secs %= size;
        if count > 0 {
            let plural = if count == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", count, name, plural));
        }
    }
    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

/// H:MM:SS, the format ^stopwatch reports in
pub fn format_clock(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Turn a display name upside down, for flipping users instead of coins
pub fn flip_text(text: &str) -> String {
    const NORMAL: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const FLIPPED: &str = "ɐqɔpǝɟƃɥᴉɾʞlɯuodbɹsʇnʌʍxʎz∀qƆpƎℲפHIſʞ˥WNOԀQᴚS┴∩ΛMX⅄Z";
    text.chars()
        .rev()
        .map(|c| match NORMAL.chars().position(|n| n == c) {
            Some(i) => FLIPPED.chars().nth(i).unwrap_or(c),
            None => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_mention() {
        assert_eq!(parse_user_mention("<@123>"), Some(UserId(123)));
        assert_eq!(parse_user_mention("<@!123>"), Some(UserId(123)));
        assert_eq!(parse_user_mention(" 456 "), Some(UserId(456)));
        assert_eq!(parse_user_mention("<#123>"), None);
        assert_eq!(parse_user_mention("bob"), None);
        assert_eq!(parse_user_mention("0"), None);
    }

    #[test]
    fn test_parse_channel_mention() {
        assert_eq!(parse_channel_mention("<#77>"), Some(ChannelId(77)));
        assert_eq!(parse_channel_mention("77"), Some(ChannelId(77)));
        assert_eq!(parse_channel_mention("<@77>"), None);
    }

    #[test]
    fn test_escape_mass_mentions() {
        let escaped = escape_mass_mentions("hi @everyone and @here");
        assert!(!escaped.contains("@everyone"));
        assert!(!escaped.contains("@here"));
    }

    #[test]
    fn test_paginate_respects_limit() {
        let text = "line one\nline two\nline three\n";
        let pages = paginate(text, 18);
        assert_eq!(pages, vec!["line one\nline two\n", "line three\n"]);

        let long = "x".repeat(45);
        let pages = paginate(&long, 20);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.chars().count() <= 20));
        assert_eq!(pages.concat(), long);

        assert!(paginate("", 10).is_empty());
    }

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(chrono::Duration::seconds(0)), "0 seconds");
        assert_eq!(humanize_duration(chrono::Duration::seconds(61)), "1 minute, 1 second");
        assert_eq!(
            humanize_duration(chrono::Duration::hours(26)),
            "1 day, 2 hours"
        );
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(chrono::Duration::seconds(3725)), "1:02:05");
    }

    #[test]
    fn test_flip_text() {
        assert_eq!(flip_text("ab"), "qɐ");
        assert_eq!(flip_text("A!"), "!∀");
    }

    #[test]
    fn test_version_string_starts_with_package_version() {
        assert!(version_string().starts_with(env!("CARGO_PKG_VERSION")));
    }
}
