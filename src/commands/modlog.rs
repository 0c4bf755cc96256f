// modlog.rs - Case Log Commands
// Lookup and editing of moderation cases plus the per-server mod log
// settings. Also owns posting cases to the mod log channel, which the
// moderation commands reuse.
//
// Used by: main.rs (command registration), commands/moderation.rs

use crate::commands::{guild_of, is_guild_admin, persist_modlog};
use crate::modlog::{Case, CaseEdit, CaseType, Editor, ModLogKey, ModlogError, NewCase};
use crate::utils::{paginate, parse_channel_mention, parse_user_mention, DISCORD_MESSAGE_LIMIT};
use chrono::Utc;
use log::{debug, error, info, warn};
use serenity::{
    builder::CreateEmbed,
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::{channel::Message, id::GuildId, Timestamp},
    utils::Colour,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn case_colour(action: &str) -> Colour {
    match action {
        "ban" => Colour::DARK_RED,
        "kick" | "timeout" => Colour::ORANGE,
        "unban" | "untimeout" => Colour::DARK_GREEN,
        "warning" => Colour::GOLD,
        _ => Colour::BLURPLE,
    }
}

pub fn case_embed<'a>(e: &'a mut CreateEmbed, case: &Case, casetype: Option<&CaseType>) -> &'a mut CreateEmbed {
    let title = match casetype {
        Some(ct) => format!("Case #{} | {} {}", case.case_number, ct.case_str, ct.image),
        None => format!("Case #{} | {}", case.case_number, case.action_type),
    };
    e.title(title.trim_end());
    e.colour(case_colour(&case.action_type));
    e.field("User", format!("{} (<@{}>)", case.user_name, case.user), true);
    let moderator = match (&case.moderator_name, case.moderator) {
        (Some(name), Some(id)) => format!("{} (<@{}>)", name, id),
        _ => "Unknown".to_string(),
    };
    e.field("Moderator", moderator, true);
    e.field("Reason", case.reason.as_deref().unwrap_or("No reason given"), false);
    if let Some(until) = case.until {
        e.field(
            "Until",
            format!(
                "<t:{}:f> ({})",
                until.timestamp(),
                crate::utils::humanize_duration(until - case.created_at)
            ),
            false,
        );
    }
    if let Some(amended_by) = case.amended_by {
        e.field("Amended by", format!("<@{}>", amended_by), true);
    }
    e.footer(|f| f.text(format!("User ID: {}", case.user)));
    e.timestamp(Timestamp::from(case.modified_at.unwrap_or(case.created_at)));
    e
}

/// File a case and post it to the mod log channel when one is set.
/// Disabled case types are skipped quietly.
pub async fn record_case(ctx: &Context, guild: GuildId, new: NewCase) -> Result<Option<u64>, BoxError> {
    let created = {
        let mut data = ctx.data.write().await;
        let modlog = data.get_mut::<ModLogKey>().ok_or("case log missing from context")?;
        modlog.create_case(guild, new, Utc::now()).map(|case| case.case_number)
    };
    let case_number = match created {
        Ok(n) => n,
        Err(ModlogError::CaseTypeNotEnabled(name)) => {
            debug!("[MODLOG] Case type {} disabled in {}, not recording", name, guild);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    info!("[MODLOG] Created case #{} in {}", case_number, guild);
    persist_modlog(ctx).await;

    if let Err(e) = post_case(ctx, guild, case_number).await {
        error!("[MODLOG] Failed to post case #{} in {}: {}", case_number, guild, e);
    }
    Ok(Some(case_number))
}

/// Send a case to the log channel, or update its existing log message
pub async fn post_case(ctx: &Context, guild: GuildId, case_number: u64) -> Result<(), BoxError> {
    let (channel, case, casetype) = {
        let data = ctx.data.read().await;
        let modlog = data.get::<ModLogKey>().ok_or("case log missing from context")?;
        let channel = match modlog.get_modlog_channel(guild) {
            Ok(channel) => channel,
            Err(ModlogError::NoModLogChannel) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let case = modlog.get_case(guild, case_number)?.clone();
        let casetype = modlog.get_casetype(&case.action_type).cloned();
        (channel, case, casetype)
    };

    if let Some(message) = case.message {
        channel
            .edit_message(&ctx.http, message, |m| m.embed(|e| case_embed(e, &case, casetype.as_ref())))
            .await?;
        return Ok(());
    }

    let posted = channel
        .send_message(&ctx.http, |m| m.embed(|e| case_embed(e, &case, casetype.as_ref())))
        .await?;
    {
        let mut data = ctx.data.write().await;
        if let Some(modlog) = data.get_mut::<ModLogKey>() {
            modlog.set_case_message(guild, case_number, posted.id)?;
        }
    }
    persist_modlog(ctx).await;
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Show one case
pub async fn case(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let number = match args.single::<u64>() {
        Ok(n) => n,
        Err(_) => {
            msg.reply(ctx, "❌ Usage: `case <number>`").await?;
            return Ok(());
        }
    };

    let found = {
        let data = ctx.data.read().await;
        let modlog = data.get::<ModLogKey>().ok_or("case log missing from context")?;
        modlog
            .get_case(guild, number)
            .map(|case| (case.clone(), modlog.get_casetype(&case.action_type).cloned()))
    };
    match found {
        Ok((case, casetype)) => {
            let sent = msg
                .channel_id
                .send_message(&ctx.http, |m| m.embed(|e| case_embed(e, &case, casetype.as_ref())))
                .await;
            // No embed permission here: plain text instead
            if let Err(e) = sent {
                debug!("[MODLOG] Embed for case #{} refused, sending text: {}", case.case_number, e);
                msg.channel_id.say(&ctx.http, case.render(casetype.as_ref())).await?;
            }
        }
        Err(e) => {
            msg.reply(ctx, format!("❌ {}", e)).await?;
        }
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
#[aliases("listcases")]
/// List every case filed against a member
pub async fn casesfor(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let user = match parse_user_mention(args.rest()) {
        Some(user) => user,
        None => {
            msg.reply(ctx, "❌ Usage: `casesfor @user`").await?;
            return Ok(());
        }
    };

    let lines: Vec<String> = {
        let data = ctx.data.read().await;
        let modlog = data.get::<ModLogKey>().ok_or("case log missing from context")?;
        modlog
            .get_cases_for_member(guild, user)
            .into_iter()
            .map(|case| {
                format!(
                    "**#{}** {} - {} ({})",
                    case.case_number,
                    case.action_type,
                    case.reason.as_deref().unwrap_or("No reason given"),
                    case.created_at.format("%Y-%m-%d")
                )
            })
            .collect()
    };

    if lines.is_empty() {
        msg.reply(ctx, format!("<@{}> has a clean record.", user)).await?;
        return Ok(());
    }
    let body = format!("**Cases for <@{}>**\n{}", user, lines.join("\n"));
    for page in paginate(&body, DISCORD_MESSAGE_LIMIT) {
        msg.channel_id.say(&ctx.http, page).await?;
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Set the reason of a case; defaults to the latest one
pub async fn reason(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let rest = args.rest().trim();
    let (number, text) = match rest.split_once(char::is_whitespace) {
        Some((first, tail)) if first.parse::<u64>().is_ok() => (first.parse::<u64>().ok(), tail.trim()),
        _ => (None, rest),
    };
    if text.is_empty() {
        msg.reply(ctx, "❌ Usage: `reason [case] <reason>`").await?;
        return Ok(());
    }

    let editor = Editor {
        user: msg.author.id,
        is_admin: is_guild_admin(ctx, msg).await,
    };
    let edited = {
        let mut data = ctx.data.write().await;
        let modlog = data.get_mut::<ModLogKey>().ok_or("case log missing from context")?;
        let number = match number.or_else(|| modlog.get_latest_case(guild).map(|c| c.case_number)) {
            Some(n) => Ok(n),
            None => Err(ModlogError::NoSuchCase(0)),
        };
        number.and_then(|n| {
            let edit = CaseEdit {
                reason: Some(text.to_string()),
                until: None,
            };
            modlog.edit_case(guild, n, editor, edit, Utc::now()).map(|c| c.case_number)
        })
    };

    match edited {
        Ok(n) => {
            info!("[MODLOG] Case #{} in {} amended by {}", n, guild, msg.author.id);
            persist_modlog(ctx).await;
            if let Err(e) = post_case(ctx, guild, n).await {
                warn!("[MODLOG] Could not update log message for case #{}: {}", n, e);
            }
            msg.reply(ctx, format!("✅ Reason for case #{} updated.", n)).await?;
        }
        Err(ModlogError::NoSuchCase(0)) => {
            msg.reply(ctx, "❌ There are no cases on this server yet.").await?;
        }
        Err(e) => {
            msg.reply(ctx, format!("❌ {}", e)).await?;
        }
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Mod log settings: `modlog [#channel]`, `cases [type]`, `resetcases`
pub async fn modlogset(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    if !is_guild_admin(ctx, msg).await {
        msg.reply(ctx, "❌ Only server admins can change mod log settings.").await?;
        return Ok(());
    }
    let guild = guild_of(msg)?;
    let sub = args.single::<String>().unwrap_or_default().to_lowercase();
    let rest = args.rest().trim().to_string();

    let reply = {
        let mut data = ctx.data.write().await;
        let modlog = data.get_mut::<ModLogKey>().ok_or("case log missing from context")?;
        match sub.as_str() {
            "modlog" if rest.is_empty() => {
                modlog.set_modlog_channel(guild, None);
                "✅ Mod log disabled.".to_string()
            }
            "modlog" => match parse_channel_mention(&rest) {
                Some(channel) => {
                    modlog.set_modlog_channel(guild, Some(channel));
                    format!("✅ Mod events will be sent to <#{}>.", channel)
                }
                None => "❌ Usage: `modlogset modlog [#channel]`".to_string(),
            },
            "cases" if rest.is_empty() => {
                let mut lines = Vec::new();
                for casetype in modlog.get_all_casetypes() {
                    let enabled = modlog.is_casetype_enabled(guild, &casetype.name).unwrap_or(false);
                    lines.push(format!(
                        "{} `{}` {}",
                        if enabled { "✅" } else { "❌" },
                        casetype.name,
                        casetype.case_str
                    ));
                }
                format!("**Case types**\n{}", lines.join("\n"))
            }
            "cases" => {
                let name = rest.to_lowercase();
                match modlog
                    .is_casetype_enabled(guild, &name)
                    .and_then(|enabled| modlog.set_casetype_enabled(guild, &name, !enabled).map(|_| !enabled))
                {
                    Ok(true) => format!("✅ Cases of type `{}` will be created.", name),
                    Ok(false) => format!("✅ Cases of type `{}` will no longer be created.", name),
                    Err(e) => format!("❌ {}", e),
                }
            }
            "resetcases" => {
                modlog.reset_cases(guild);
                warn!("[MODLOG] Cases reset in {} by {}", guild, msg.author.id);
                "✅ All cases for this server were deleted.".to_string()
            }
            _ => {
                let channel = match modlog.get_modlog_channel(guild) {
                    Ok(channel) => format!("<#{}>", channel),
                    Err(_) => "not set".to_string(),
                };
                format!(
                    "**📒 Mod log settings**\n\
                    `modlogset modlog [#channel]` - Set or clear the mod log channel\n\
                    `modlogset cases [type]` - List case types or toggle one\n\
                    `modlogset resetcases` - Delete every case on this server\n\n\
                    **Current channel:** {}",
                    channel
                )
            }
        }
    };

    if !sub.is_empty() && reply.starts_with('✅') {
        persist_modlog(ctx).await;
    }
    msg.reply(ctx, reply).await?;
    Ok(())
}

#[group]
#[only_in(guilds)]
#[commands(case, casesfor, reason, modlogset)]
pub struct CaseLog;
