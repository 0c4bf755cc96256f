// moderation.rs - Moderation Commands
// ^timeout / ^untimeout apply and lift Discord communication timeouts after
// parsing "<duration> <reason>"; ^kick, ^ban, ^unban and ^warn cover the
// rest of the built-in case types. Every action checks the author's
// permission and the role hierarchy, and every success is filed in the
// case log.
//
// Used by: main.rs (command registration)

use crate::commands::modlog::record_case;
use crate::commands::{bot_config, grants, guild_of};
use crate::modlog::NewCase;
use crate::mutes::{
    check_hierarchy, default_timeout, mute_converter, timeout_until, HierarchyRank, MuteResponse,
};
use crate::utils::{humanize_duration, parse_user_mention};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::{
        channel::Message,
        guild::{Guild, Member},
        id::{GuildId, UserId},
        Permissions, Timestamp,
    },
};

/// Discord caps message deletion on ban at a week
const MAX_DELETE_DAYS: u8 = 7;

fn rank_of(ctx: &Context, guild: &Guild, member: &Member) -> HierarchyRank {
    HierarchyRank {
        user: member.user.id,
        is_guild_owner: guild.owner_id == member.user.id,
        top_role_position: member
            .highest_role_info(&ctx.cache)
            .map(|(_, position)| position)
            .unwrap_or(0),
    }
}

fn permission_name(needed: Permissions) -> &'static str {
    if needed == Permissions::BAN_MEMBERS {
        "Ban Members"
    } else if needed == Permissions::KICK_MEMBERS {
        "Kick Members"
    } else {
        "Moderate Members"
    }
}

/// Split an optional leading delete-days count (0-7) off a ban tail
pub fn split_delete_days(input: &str) -> Result<(u8, Option<String>), String> {
    let input = input.trim();
    let (first, tail) = match input.split_once(char::is_whitespace) {
        Some((first, tail)) => (first, tail.trim()),
        None => (input, ""),
    };
    let (days, reason) = match first.parse::<u64>() {
        Ok(days) if days <= u64::from(MAX_DELETE_DAYS) => (days as u8, tail),
        Ok(_) => return Err(format!("Message deletion days must be between 0 and {}.", MAX_DELETE_DAYS)),
        Err(_) => (0, input),
    };
    let reason = Some(reason).filter(|r| !r.is_empty()).map(str::to_string);
    Ok((days, reason))
}

fn optional_reason(args: &Args) -> Option<String> {
    Some(args.rest().trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

/// Make sure the author holds `needed`, returning the cached guild and the author
async fn checked_author(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    target: UserId,
    needed: Permissions,
) -> Result<(Guild, Member), MuteResponse> {
    let fail = |reason: String| MuteResponse::failure(target, Some(msg.channel_id), reason);

    let guild = guild_id
        .to_guild_cached(&ctx.cache)
        .ok_or_else(|| fail("I can't see this server right now, try again shortly.".to_string()))?;
    let author = guild_id
        .member(ctx, msg.author.id)
        .await
        .map_err(|_| fail("I couldn't look you up in this server.".to_string()))?;
    let perms = author
        .permissions(&ctx.cache)
        .map_err(|_| fail("I couldn't work out your permissions here.".to_string()))?;
    if !grants(perms, needed) {
        return Err(fail(format!("You need the {} permission for that.", permission_name(needed))));
    }
    Ok((guild, author))
}

/// Fetch the target and make sure both the author and the bot outrank them.
/// With `allow_absent`, a user who is not in the server passes as `None`.
async fn checked_target(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    target: UserId,
    needed: Permissions,
    allow_absent: bool,
) -> Result<Option<Member>, MuteResponse> {
    let fail = |reason: String| MuteResponse::failure(target, Some(msg.channel_id), reason);
    let (guild, author) = checked_author(ctx, msg, guild_id, target, needed).await?;

    let member = match guild_id.member(ctx, target).await {
        Ok(member) => member,
        Err(_) if allow_absent && target != msg.author.id => return Ok(None),
        Err(_) => return Err(fail("That user is not a member of this server.".to_string())),
    };

    check_hierarchy(&rank_of(ctx, &guild, &author), &rank_of(ctx, &guild, &member))
        .map_err(|e| fail(e.to_string()))?;

    let bot_id = ctx.cache.current_user_id();
    if let Ok(bot) = guild_id.member(ctx, bot_id).await {
        if check_hierarchy(&rank_of(ctx, &guild, &bot), &rank_of(ctx, &guild, &member)).is_err() {
            return Err(fail("My highest role is not above that member's, so I can't do that.".to_string()));
        }
    }
    Ok(Some(member))
}

/// Like `checked_target`, for actions that need the target in the server
async fn checked_member(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    target: UserId,
    needed: Permissions,
) -> Result<Member, MuteResponse> {
    checked_target(ctx, msg, guild_id, target, needed, false)
        .await?
        .ok_or_else(|| MuteResponse::failure(target, Some(msg.channel_id), "That user is not a member of this server."))
}

async fn apply_timeout(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    target: UserId,
    until: DateTime<Utc>,
) -> MuteResponse {
    let mut member = match checked_member(ctx, msg, guild_id, target, Permissions::MODERATE_MEMBERS).await {
        Ok(member) => member,
        Err(response) => return response,
    };
    match member
        .disable_communication_until_datetime(&ctx.http, Timestamp::from(until))
        .await
    {
        Ok(()) => MuteResponse::success(target, Some(msg.channel_id)),
        Err(e) => {
            error!("[MOD] Failed to timeout {} in {}: {}", target, guild_id, e);
            MuteResponse::failure(target, Some(msg.channel_id), "Discord refused the timeout. Do I have the Moderate Members permission?")
        }
    }
}

async fn lift_timeout(ctx: &Context, msg: &Message, guild_id: GuildId, target: UserId) -> MuteResponse {
    let mut member = match checked_member(ctx, msg, guild_id, target, Permissions::MODERATE_MEMBERS).await {
        Ok(member) => member,
        Err(response) => return response,
    };
    let timed_out = member
        .communication_disabled_until
        .map(|ts| ts.unix_timestamp() > Utc::now().timestamp())
        .unwrap_or(false);
    if !timed_out {
        return MuteResponse::failure(target, Some(msg.channel_id), "That member is not timed out.");
    }
    match member.enable_communication(&ctx.http).await {
        Ok(()) => MuteResponse::success(target, Some(msg.channel_id)),
        Err(e) => {
            error!("[MOD] Failed to lift timeout of {} in {}: {}", target, guild_id, e);
            MuteResponse::failure(target, Some(msg.channel_id), "Discord refused to lift the timeout.")
        }
    }
}

async fn target_name(ctx: &Context, user: UserId) -> String {
    match user.to_user(ctx).await {
        Ok(user) => user.tag(),
        Err(_) => user.to_string(),
    }
}

/// Reply to a failed action, or file the case for a successful one
async fn finish_action(
    ctx: &Context,
    msg: &Message,
    guild: GuildId,
    response: &MuteResponse,
    action: &str,
    reason: Option<String>,
    until: Option<DateTime<Utc>>,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    if !response.success {
        msg.reply(ctx, format!("❌ {}", response.reason.as_deref().unwrap_or("That didn't work.")))
            .await?;
        return Ok(false);
    }
    info!("[MOD] {} used {} on {} in {}", msg.author.id, action, response.user, guild);

    let new_case = NewCase {
        action_type: action.to_string(),
        user: response.user,
        user_name: target_name(ctx, response.user).await,
        moderator: Some(msg.author.id),
        moderator_name: Some(msg.author.tag()),
        reason,
        until,
        channel: response.channel,
    };
    if let Err(e) = record_case(ctx, guild, new_case).await {
        error!("[MODLOG] Could not record {} case in {}: {}", action, guild, e);
    }
    Ok(true)
}

async fn target_arg(ctx: &Context, msg: &Message, args: &mut Args, usage: &str) -> Result<Option<UserId>, serenity::Error> {
    match args.single::<String>().ok().and_then(|raw| parse_user_mention(&raw)) {
        Some(target) => Ok(Some(target)),
        None => {
            msg.reply(ctx, format!("❌ Usage: `{}`", usage)).await?;
            Ok(None)
        }
    }
}

#[command]
#[aliases("mute")]
#[only_in(guilds)]
/// Timeout a member: `timeout @user [duration] [reason]`
pub async fn timeout(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let usage = "timeout @user [duration] [reason]` e.g. `timeout @user 1h30m spamming";
    let target = match target_arg(ctx, msg, &mut args, usage).await? {
        Some(target) => target,
        None => return Ok(()),
    };

    let parsed = match mute_converter(args.rest()) {
        Ok(parsed) => parsed,
        Err(e) => {
            msg.reply(ctx, format!("❌ {}", e)).await?;
            return Ok(());
        }
    };
    let config = bot_config(ctx).await?;
    let now = Utc::now();
    let until = match timeout_until(now, parsed.duration, default_timeout(config.default_timeout_minutes)) {
        Ok(until) => until,
        Err(e) => {
            msg.reply(ctx, format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    let response = apply_timeout(ctx, msg, guild, target, until).await;
    if finish_action(ctx, msg, guild, &response, "timeout", parsed.reason, Some(until)).await? {
        msg.reply(
            ctx,
            format!("🔇 <@{}> has been timed out for {}.", response.user, humanize_duration(until - now)),
        )
        .await?;
    }
    Ok(())
}

#[command]
#[aliases("unmute")]
#[only_in(guilds)]
/// Lift a timeout: `untimeout @user [reason]`
pub async fn untimeout(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let target = match target_arg(ctx, msg, &mut args, "untimeout @user [reason]").await? {
        Some(target) => target,
        None => return Ok(()),
    };
    let reason = optional_reason(&args);

    let response = lift_timeout(ctx, msg, guild, target).await;
    if finish_action(ctx, msg, guild, &response, "untimeout", reason, None).await? {
        msg.reply(ctx, format!("🔊 <@{}> can talk again.", response.user)).await?;
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Kick a member: `kick @user [reason]`
pub async fn kick(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let target = match target_arg(ctx, msg, &mut args, "kick @user [reason]").await? {
        Some(target) => target,
        None => return Ok(()),
    };
    let reason = optional_reason(&args);

    let response = match checked_member(ctx, msg, guild, target, Permissions::KICK_MEMBERS).await {
        Err(response) => response,
        Ok(_) => {
            let result = match &reason {
                Some(reason) => guild.kick_with_reason(&ctx.http, target, reason).await,
                None => guild.kick(&ctx.http, target).await,
            };
            match result {
                Ok(()) => MuteResponse::success(target, Some(msg.channel_id)),
                Err(e) => {
                    error!("[MOD] Failed to kick {} from {}: {}", target, guild, e);
                    MuteResponse::failure(target, Some(msg.channel_id), "Discord refused the kick. Do I have the Kick Members permission?")
                }
            }
        }
    };
    if finish_action(ctx, msg, guild, &response, "kick", reason, None).await? {
        msg.reply(ctx, format!("👢 <@{}> was kicked.", target)).await?;
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Ban a user, in the server or not: `ban @user [days] [reason]`
pub async fn ban(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let target = match target_arg(ctx, msg, &mut args, "ban @user [days 0-7] [reason]").await? {
        Some(target) => target,
        None => return Ok(()),
    };
    let (days, reason) = match split_delete_days(args.rest()) {
        Ok(parsed) => parsed,
        Err(e) => {
            msg.reply(ctx, format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    let response = match checked_target(ctx, msg, guild, target, Permissions::BAN_MEMBERS, true).await {
        Err(response) => response,
        Ok(_) => {
            let result = match &reason {
                Some(reason) => guild.ban_with_reason(&ctx.http, target, days, reason).await,
                None => guild.ban(&ctx.http, target, days).await,
            };
            match result {
                Ok(()) => MuteResponse::success(target, Some(msg.channel_id)),
                Err(e) => {
                    error!("[MOD] Failed to ban {} from {}: {}", target, guild, e);
                    MuteResponse::failure(target, Some(msg.channel_id), "Discord refused the ban. Do I have the Ban Members permission?")
                }
            }
        }
    };
    if finish_action(ctx, msg, guild, &response, "ban", reason, None).await? {
        msg.reply(ctx, format!("🔨 <@{}> was banned.", target)).await?;
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Lift a ban: `unban <@user or id> [reason]`
pub async fn unban(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let target = match target_arg(ctx, msg, &mut args, "unban <@user or user id> [reason]").await? {
        Some(target) => target,
        None => return Ok(()),
    };
    let reason = optional_reason(&args);

    let response = match checked_author(ctx, msg, guild, target, Permissions::BAN_MEMBERS).await {
        Err(response) => response,
        Ok(_) => match guild.unban(&ctx.http, target).await {
            Ok(()) => MuteResponse::success(target, Some(msg.channel_id)),
            Err(e) => {
                debug!("[MOD] Unban of {} in {} failed: {}", target, guild, e);
                MuteResponse::failure(target, Some(msg.channel_id), "That user is not banned, or I lack the Ban Members permission.")
            }
        },
    };
    if finish_action(ctx, msg, guild, &response, "unban", reason, None).await? {
        msg.reply(ctx, format!("✅ <@{}> was unbanned.", target)).await?;
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Warn a member and file a warning case: `warn @user <reason>`
pub async fn warn(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let target = match target_arg(ctx, msg, &mut args, "warn @user <reason>").await? {
        Some(target) => target,
        None => return Ok(()),
    };
    let reason = match optional_reason(&args) {
        Some(reason) => reason,
        None => {
            msg.reply(ctx, "❌ A warning needs a reason.").await?;
            return Ok(());
        }
    };

    let response = match checked_member(ctx, msg, guild, target, Permissions::MODERATE_MEMBERS).await {
        Err(response) => response,
        Ok(member) => {
            let server = guild.name(&ctx.cache).unwrap_or_else(|| "the server".to_string());
            let text = format!("⚠️ You were warned in **{}**: {}", server, reason);
            if let Err(e) = member.user.direct_message(ctx, |m| m.content(text)).await {
                debug!("[MOD] Could not DM warning to {}: {}", target, e);
            }
            MuteResponse::success(target, Some(msg.channel_id))
        }
    };
    if finish_action(ctx, msg, guild, &response, "warning", Some(reason), None).await? {
        msg.reply(ctx, format!("⚠️ <@{}> has been warned.", target)).await?;
    }
    Ok(())
}

#[group]
#[only_in(guilds)]
#[commands(timeout, untimeout, kick, ban, unban, warn)]
pub struct Moderation;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_delete_days() {
        assert_eq!(split_delete_days("3 raiding"), Ok((3, Some("raiding".to_string()))));
        assert_eq!(split_delete_days("raiding"), Ok((0, Some("raiding".to_string()))));
        assert_eq!(split_delete_days("7"), Ok((7, None)));
        assert_eq!(split_delete_days(""), Ok((0, None)));
        assert!(split_delete_days("8 too many").is_err());
    }

    #[test]
    fn test_permission_names() {
        assert_eq!(permission_name(Permissions::BAN_MEMBERS), "Ban Members");
        assert_eq!(permission_name(Permissions::KICK_MEMBERS), "Kick Members");
        assert_eq!(permission_name(Permissions::MODERATE_MEMBERS), "Moderate Members");
    }
}
