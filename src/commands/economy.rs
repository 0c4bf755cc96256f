// economy.rs - Bank Commands
// Chat front-end for the bank: account registration, balances, transfers,
// paydays, the leaderboard and bank settings.
//
// Key Features:
// - ^bank register/balance/transfer/set
// - ^payday with a configurable amount and cooldown
// - ^leaderboard [n]
// - ^bankset for names, amounts, global toggle, reset and prune
// - ^slot, ^payouts and ^economyset for the slot machine
//
// Used by: main.rs (command registration)

use crate::bank::{Bank, BankError, BankKey, Holder};
use crate::commands::{bot_config, guild_of, is_guild_admin, is_owner, persist_bank};
use crate::slots::{evaluate, payouts_text, render_machine, spin};
use crate::utils::{paginate, parse_user_mention, DISCORD_MESSAGE_LIMIT};
use chrono::Utc;
use log::{debug, info, warn};
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::{channel::Message, id::GuildId, id::UserId},
};
use std::collections::HashSet;

const LEADERBOARD_DEFAULT: usize = 10;
const MEMBER_PAGE: u64 = 1000;

/// Run `f` against the bank under the write lock
async fn with_bank<T>(
    ctx: &Context,
    f: impl FnOnce(&mut Bank) -> T,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    let mut data = ctx.data.write().await;
    let bank = data.get_mut::<BankKey>().ok_or("bank missing from context")?;
    Ok(f(bank))
}

async fn bank_is_global(ctx: &Context) -> bool {
    let data = ctx.data.read().await;
    data.get::<BankKey>().map(|b| b.is_global()).unwrap_or(false)
}

/// Global settings belong to the owner, local ones to server admins
async fn may_change_settings(ctx: &Context, msg: &Message, is_global: bool) -> bool {
    if is_global {
        is_owner(ctx, msg).await
    } else {
        is_guild_admin(ctx, msg).await
    }
}

async fn currency(ctx: &Context, guild: GuildId) -> String {
    let data = ctx.data.read().await;
    data.get::<BankKey>()
        .and_then(|bank| bank.settings(Some(guild)).ok())
        .map(|s| s.currency)
        .unwrap_or_else(|| "credits".to_string())
}

/// Reply with a bank error the way users should see it
async fn reply_bank_error(ctx: &Context, msg: &Message, err: &BankError) -> CommandResult {
    let text = match err {
        BankError::NoAccount => format!("{} Use `bank register` first.", err),
        _ => err.to_string(),
    };
    msg.reply(ctx, format!("❌ {}", text)).await?;
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Open a bank account
pub async fn register(ctx: &Context, msg: &Message) -> CommandResult {
    let guild = guild_of(msg)?;
    let holder = Holder::new(Some(guild), msg.author.id);
    let name = msg.author.name.clone();

    let result = with_bank(ctx, |bank| bank.create_account(holder, &name, Utc::now())).await?;
    match result {
        Ok(account) => {
            info!("[BANK] Account opened for {} ({}) in {}", msg.author.name, msg.author.id, guild);
            persist_bank(ctx).await;
            let currency = currency(ctx, guild).await;
            msg.reply(
                ctx,
                format!("✅ Account opened. Current balance: **{}** {}", account.balance, currency),
            )
            .await?;
        }
        Err(e) => reply_bank_error(ctx, msg, &e).await?,
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
#[aliases("bal")]
/// Show your balance or someone else's
pub async fn balance(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let user = match args.rest().trim() {
        "" => msg.author.id,
        raw => match parse_user_mention(raw) {
            Some(user) => user,
            None => {
                msg.reply(ctx, "❌ Usage: `bank balance [@user]`").await?;
                return Ok(());
            }
        },
    };

    let result = with_bank(ctx, |bank| {
        let holder = Holder::new(Some(guild), user);
        bank.get_balance(holder).map(|b| (b, bank.settings(Some(guild))))
    })
    .await?;

    match result {
        Ok((balance, Ok(settings))) => {
            let whose = if user == msg.author.id {
                "Your".to_string()
            } else {
                format!("<@{}>'s", user)
            };
            msg.reply(
                ctx,
                format!("🏦 {} balance at {}: **{}** {}", whose, settings.bank_name, balance, settings.currency),
            )
            .await?;
        }
        Ok((_, Err(e))) | Err(e) => reply_bank_error(ctx, msg, &e).await?,
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Give credits to another member
pub async fn transfer(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let target = args.single::<String>().ok().and_then(|raw| parse_user_mention(&raw));
    let amount = args.single::<i64>().ok();
    let (target, amount) = match (target, amount) {
        (Some(target), Some(amount)) => (target, amount),
        _ => {
            msg.reply(ctx, "❌ Usage: `bank transfer @user <amount>`").await?;
            return Ok(());
        }
    };

    let from = Holder::new(Some(guild), msg.author.id);
    let to = Holder::new(Some(guild), target);
    let result = with_bank(ctx, |bank| bank.transfer_credits(from, to, amount)).await?;
    match result {
        Ok(_) => {
            info!("[BANK] {} transferred {} to {} in {}", msg.author.id, amount, target, guild);
            persist_bank(ctx).await;
            let currency = currency(ctx, guild).await;
            msg.reply(ctx, format!("✅ Transferred **{}** {} to <@{}>.", amount, currency, target))
                .await?;
        }
        Err(e) => reply_bank_error(ctx, msg, &e).await?,
    }
    Ok(())
}

#[command("set")]
#[only_in(guilds)]
/// Set a member's balance (admin)
pub async fn set_balance(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    if !is_guild_admin(ctx, msg).await {
        msg.reply(ctx, "❌ Only server admins can set balances.").await?;
        return Ok(());
    }
    let guild = guild_of(msg)?;
    let target = args.single::<String>().ok().and_then(|raw| parse_user_mention(&raw));
    let amount = args.single::<i64>().ok();
    let (target, amount) = match (target, amount) {
        (Some(target), Some(amount)) => (target, amount),
        _ => {
            msg.reply(ctx, "❌ Usage: `bank set @user <amount>`").await?;
            return Ok(());
        }
    };

    let holder = Holder::new(Some(guild), target);
    let result = with_bank(ctx, |bank| bank.set_balance(holder, amount)).await?;
    match result {
        Ok(balance) => {
            info!("[BANK] {} set balance of {} to {} in {}", msg.author.id, target, balance, guild);
            persist_bank(ctx).await;
            let currency = currency(ctx, guild).await;
            msg.reply(ctx, format!("✅ <@{}> now has **{}** {}.", target, balance, currency))
                .await?;
        }
        Err(e) => reply_bank_error(ctx, msg, &e).await?,
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
/// Collect free credits once per cooldown
pub async fn payday(ctx: &Context, msg: &Message) -> CommandResult {
    let guild = guild_of(msg)?;
    let config = bot_config(ctx).await?;
    let holder = Holder::new(Some(guild), msg.author.id);
    let cooldown = chrono::Duration::seconds(config.payday_cooldown_secs);
    let amount = config.payday_credits;

    let result = with_bank(ctx, |bank| bank.payday(holder, amount, cooldown, Utc::now())).await?;
    match result {
        Ok(balance) => {
            persist_bank(ctx).await;
            let currency = currency(ctx, guild).await;
            msg.reply(
                ctx,
                format!("💰 Here, take some {}. Enjoy! (+{} {})\nYou now have **{}**.", currency, amount, currency, balance),
            )
            .await?;
        }
        Err(BankError::PaydayCooldown { remaining_secs }) => {
            let wait = crate::utils::humanize_duration(chrono::Duration::seconds(remaining_secs));
            msg.reply(ctx, format!("⏳ Too soon. Wait **{}** for your next payday.", wait))
                .await?;
        }
        Err(e) => reply_bank_error(ctx, msg, &e).await?,
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
#[aliases("lb")]
/// Show the richest members
pub async fn leaderboard(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let limit = args.single::<usize>().unwrap_or(LEADERBOARD_DEFAULT).max(1);

    let result = with_bank(ctx, |bank| {
        bank.leaderboard(Some(guild), limit)
            .and_then(|rows| bank.settings(Some(guild)).map(|s| (rows, s)))
    })
    .await?;

    let (rows, settings) = match result {
        Ok(found) => found,
        Err(e) => return reply_bank_error(ctx, msg, &e).await,
    };
    if rows.is_empty() {
        msg.reply(ctx, "There are no accounts in the bank.").await?;
        return Ok(());
    }

    let mut body = format!("{:<4} {:<20} {:>12}\n", "#", "Name", "Balance");
    for (rank, (_, account)) in rows.iter().enumerate() {
        let name: String = account.name.chars().take(20).collect();
        body.push_str(&format!("{:<4} {:<20} {:>12}\n", rank + 1, name, account.balance));
    }
    let title = format!("**{} leaderboard** ({})", settings.bank_name, settings.currency);
    for (i, page) in paginate(&body, DISCORD_MESSAGE_LIMIT - 100).iter().enumerate() {
        let content = if i == 0 {
            format!("{}\n```\n{}```", title, page)
        } else {
            format!("```\n{}```", page)
        };
        msg.channel_id.say(&ctx.http, content).await?;
    }
    Ok(())
}

/// Every user id in one guild, paging through the member list
async fn guild_member_ids(ctx: &Context, guild: GuildId) -> Result<HashSet<UserId>, serenity::Error> {
    let mut ids = HashSet::new();
    let mut after: Option<UserId> = None;
    loop {
        let page = guild.members(&ctx.http, Some(MEMBER_PAGE), after).await?;
        ids.extend(page.iter().map(|m| m.user.id));
        match page.last() {
            Some(last) if page.len() as u64 == MEMBER_PAGE => after = Some(last.user.id),
            _ => break,
        }
    }
    Ok(ids)
}

const BANKSET_USAGE: &str = "**🏦 Bank settings**\n\
    `bankset toggleglobal` - Switch between a global and per-server bank (wipes all accounts)\n\
    `bankset bankname <name>` - Rename the bank\n\
    `bankset creditsname <name>` - Rename the currency\n\
    `bankset registeramount <amount>` - Starting balance for new accounts\n\
    `bankset maxbal <amount>` - Highest balance an account may hold\n\
    `bankset reset` - Delete every account\n\
    `bankset prune` - Delete accounts of users who left";

#[command]
#[only_in(guilds)]
/// Bank configuration
pub async fn bankset(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let sub = args.single::<String>().unwrap_or_default().to_lowercase();
    let rest = args.rest().trim().to_string();

    let is_global = bank_is_global(ctx).await;
    let allowed = if sub == "toggleglobal" {
        is_owner(ctx, msg).await
    } else {
        may_change_settings(ctx, msg, is_global).await
    };
    if !sub.is_empty() && !allowed {
        let who = if is_global || sub == "toggleglobal" { "the bot owner" } else { "server admins" };
        msg.reply(ctx, format!("❌ Only {} can change that setting.", who)).await?;
        return Ok(());
    }

    let reply = match sub.as_str() {
        "toggleglobal" => {
            let result = with_bank(ctx, |bank| bank.set_global(!is_global)).await?;
            match result {
                Ok(()) => {
                    warn!("[BANK] Bank switched to {} mode by {}", if is_global { "local" } else { "global" }, msg.author.id);
                    format!("✅ The bank is now {}. All accounts were wiped.", if is_global { "per-server" } else { "global" })
                }
                Err(e) => format!("❌ {}", e),
            }
        }
        "bankname" | "creditsname" if rest.is_empty() => format!("❌ Usage: `bankset {} <name>`", sub),
        "bankname" => {
            with_bank(ctx, |bank| bank.set_bank_name(Some(guild), &rest)).await?
                .map(|_| format!("✅ Bank name set to **{}**.", rest))
                .unwrap_or_else(|e| format!("❌ {}", e))
        }
        "creditsname" => {
            with_bank(ctx, |bank| bank.set_currency_name(Some(guild), &rest)).await?
                .map(|_| format!("✅ Currency name set to **{}**.", rest))
                .unwrap_or_else(|e| format!("❌ {}", e))
        }
        "registeramount" | "maxbal" => match rest.parse::<i64>() {
            Ok(amount) => {
                let result = with_bank(ctx, |bank| {
                    if sub == "maxbal" {
                        bank.set_max_balance(Some(guild), amount)
                    } else {
                        bank.set_default_balance(Some(guild), amount)
                    }
                })
                .await?;
                match result {
                    Ok(()) if sub == "maxbal" => format!("✅ Maximum balance set to **{}**.", amount),
                    Ok(()) => format!("✅ New accounts will start with **{}**.", amount),
                    Err(e) => format!("❌ {}", e),
                }
            }
            Err(_) => format!("❌ Usage: `bankset {} <amount>`", sub),
        },
        "reset" => {
            with_bank(ctx, |bank| bank.wipe_bank(Some(guild))).await?;
            warn!("[BANK] Accounts wiped by {} (guild {}, global {})", msg.author.id, guild, is_global);
            "✅ All bank accounts were deleted.".to_string()
        }
        "prune" => {
            let keep = if is_global {
                let mut keep = HashSet::new();
                for guild_id in ctx.cache.guilds() {
                    keep.extend(guild_member_ids(ctx, guild_id).await?);
                }
                keep
            } else {
                guild_member_ids(ctx, guild).await?
            };
            let result = with_bank(ctx, |bank| bank.bank_prune(Some(guild), &keep)).await?;
            match result {
                Ok(removed) => {
                    info!("[BANK] Pruned {} accounts (guild {}, global {})", removed, guild, is_global);
                    format!("✅ Pruned {} account(s).", removed)
                }
                Err(e) => format!("❌ {}", e),
            }
        }
        _ => {
            let settings = with_bank(ctx, |bank| bank.settings(Some(guild))).await?;
            match settings {
                Ok(s) => format!(
                    "{}\n\n**Current:** {} | {} | start {} | max {} | {}",
                    BANKSET_USAGE,
                    s.bank_name,
                    s.currency,
                    s.default_balance,
                    s.max_balance,
                    if is_global { "global" } else { "per-server" }
                ),
                Err(e) => format!("❌ {}", e),
            }
        }
    };

    if !sub.is_empty() && reply.starts_with('✅') {
        persist_bank(ctx).await;
    }
    msg.reply(ctx, reply).await?;
    Ok(())
}

#[group]
#[prefixes("bank")]
#[only_in(guilds)]
#[commands(register, balance, transfer, set_balance)]
pub struct BankAccounts;

#[command]
#[only_in(guilds)]
#[aliases("slots")]
/// Play the slot machine: `slot <bid>`
pub async fn slot(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let bid = match args.single::<i64>() {
        Ok(bid) => bid,
        Err(_) => {
            msg.reply(ctx, "❌ Usage: `slot <bid>`").await?;
            return Ok(());
        }
    };

    let rows = {
        let mut rng = rand::thread_rng();
        spin(&mut rng)
    };
    let payout = evaluate(rows[1]);
    let holder = Holder::new(Some(guild), msg.author.id);
    let result = with_bank(ctx, |bank| bank.play_slot(holder, bid, payout, Utc::now())).await?;

    match result {
        Ok((before, after)) => {
            persist_bank(ctx).await;
            let phrase = payout.map_or("Nothing!", |p| p.phrase());
            msg.channel_id
                .say(
                    &ctx.http,
                    format!(
                        "{}\n<@{}> {}\n\nYour bid: {}\n{} → {}!",
                        render_machine(&rows),
                        msg.author.id,
                        phrase,
                        bid,
                        before,
                        after
                    ),
                )
                .await?;
        }
        Err(BankError::InsufficientBalance { .. }) => {
            msg.reply(ctx, "❌ You ain't got enough money, friend.").await?;
        }
        Err(e) => reply_bank_error(ctx, msg, &e).await?,
    }
    Ok(())
}

#[command]
#[only_in(guilds)]
/// DM the slot machine payout table
pub async fn payouts(ctx: &Context, msg: &Message) -> CommandResult {
    let text = payouts_text();
    if let Err(e) = msg.author.direct_message(ctx, |m| m.content(&text)).await {
        debug!("[BANK] Could not DM payouts to {}: {}", msg.author.id, e);
        msg.channel_id.say(&ctx.http, text).await?;
    }
    Ok(())
}

const ECONOMYSET_USAGE: &str = "**🎰 Economy settings**\n\
    `economyset slotmin <bid>` - Minimum slot bid\n\
    `economyset slotmax <bid>` - Maximum slot bid\n\
    `economyset slottime <seconds>` - Seconds between slot pulls";

#[command]
#[only_in(guilds)]
/// Slot machine settings
pub async fn economyset(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = guild_of(msg)?;
    let sub = args.single::<String>().unwrap_or_default().to_lowercase();
    let value = args.single::<i64>().ok();

    let is_global = bank_is_global(ctx).await;
    if !may_change_settings(ctx, msg, is_global).await {
        let who = if is_global { "the bot owner" } else { "server admins" };
        msg.reply(ctx, format!("❌ Only {} can change economy settings.", who)).await?;
        return Ok(());
    }

    let reply = match (sub.as_str(), value) {
        ("slotmin" | "slotmax" | "slottime", None) => format!("❌ Usage: `economyset {} <number>`", sub),
        ("slotmin", Some(bid)) => with_bank(ctx, |bank| bank.set_slot_min(Some(guild), bid))
            .await?
            .map(|_| format!("✅ Minimum bid is now {}.", bid))
            .unwrap_or_else(|e| format!("❌ {}", e)),
        ("slotmax", Some(bid)) => with_bank(ctx, |bank| bank.set_slot_max(Some(guild), bid))
            .await?
            .map(|_| format!("✅ Maximum bid is now {}.", bid))
            .unwrap_or_else(|e| format!("❌ {}", e)),
        ("slottime", Some(seconds)) => with_bank(ctx, |bank| bank.set_slot_cooldown(Some(guild), seconds))
            .await?
            .map(|_| format!("✅ Cooldown is now {} seconds.", seconds))
            .unwrap_or_else(|e| format!("❌ {}", e)),
        _ => {
            let config = bot_config(ctx).await?;
            match with_bank(ctx, |bank| bank.settings(Some(guild))).await? {
                Ok(s) => format!(
                    "{}\n\n```\nMinimum slot bid: {}\nMaximum slot bid: {}\nSlot cooldown: {}\n\
                    Payday amount: {}\nPayday cooldown: {}\nAmount given at account registration: {}\n```",
                    ECONOMYSET_USAGE,
                    s.slots.min_bid,
                    s.slots.max_bid,
                    s.slots.cooldown_secs,
                    config.payday_credits,
                    config.payday_cooldown_secs,
                    s.default_balance
                ),
                Err(e) => format!("❌ {}", e),
            }
        }
    };

    if reply.starts_with('✅') {
        persist_bank(ctx).await;
    }
    msg.reply(ctx, reply).await?;
    Ok(())
}

#[group]
#[only_in(guilds)]
#[commands(payday, leaderboard, bankset, slot, payouts, economyset)]
pub struct Economy;
