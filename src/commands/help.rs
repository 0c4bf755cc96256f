// help.rs - Help Command Module
// Static overview of every cog and its commands, using the configured prefix

use crate::commands::bot_config;
use crate::utils::{paginate, DISCORD_MESSAGE_LIMIT};
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, CommandResult},
    model::channel::Message,
};

const HELP_TEXT: &str = r#"**🤖 Command Help**

**🎲 General**
• `{p}ping` - Check response time
• `{p}choose <a> <b> ...` - Pick one (quote choices with spaces)
• `{p}roll [n]` - Random number from 1 to n (default 100)
• `{p}flip [@user]` - Flip a coin, or a user
• `{p}8 <question>?` - Ask the magic 8 ball
• `{p}lmgtfy <terms>` - Let me google that for you
• `{p}stopwatch` - Start/stop your stopwatch
• `{p}info` - Version and bot info

**🎯 Dice**
• `{p}mroll 2d6+3 d20` - Roll dice notation (20 dice per term, 10 terms)
• `{p}dicetable <sides> <count> [modifier]` - Table of rolls (under 20 dice)

**🔎 Lookup**
• `{p}youtube <terms>` - First YouTube result
• `{p}wiki <terms>` - Wikipedia summary
• `{p}opgg <region> <summoner>` - op.gg profile link
• `{p}champion <name>` - Champion wiki and stats links

**🖼️ Images**
• `{p}imgur search <term>` - Imgur gallery search
• `{p}imgur subreddit <sub> [new|top] [day|week|month|year|all]`
• `{p}meme [subreddit]` - Random meme
• `{p}viper` - Random snake

**🏦 Bank**
• `{p}bank register` - Open an account
• `{p}bank balance [@user]` - Check a balance
• `{p}bank transfer @user <amount>` - Send credits
• `{p}bank set @user <amount>` - Set a balance (admin)
• `{p}payday` - Collect free credits
• `{p}leaderboard [n]` - Richest members
• `{p}bankset` - Bank settings (admin/owner)
• `{p}slot <bid>` - Play the slot machine
• `{p}payouts` - Slot machine payouts (sent by DM)
• `{p}economyset` - Slot machine settings (admin/owner)

**🔨 Moderation**
• `{p}timeout @user [duration] [reason]` - e.g. `{p}timeout @user 1h30m spam`
• `{p}untimeout @user [reason]` - Lift a timeout
• `{p}kick @user [reason]` - Kick a member
• `{p}ban @user [days 0-7] [reason]` - Ban a user, deleting days of messages
• `{p}unban <@user or id> [reason]` - Lift a ban
• `{p}warn @user <reason>` - Warn a member and file a case
• `{p}case <n>` - Show a case
• `{p}casesfor @user` - Cases for a member
• `{p}reason [n] <reason>` - Set a case reason (latest by default)
• `{p}modlogset` - Mod log channel and case types (admin)

**🔧 Owner**
• `{p}adminhelp` - Owner-only commands"#;

pub fn render_help(prefix: &str) -> String {
    HELP_TEXT.replace("{p}", prefix)
}

#[command]
#[aliases("h", "commands")]
/// Display help information for all available commands
pub async fn help(ctx: &Context, msg: &Message) -> CommandResult {
    let prefix = bot_config(ctx).await?.prefix.clone();
    for page in paginate(&render_help(&prefix), DISCORD_MESSAGE_LIMIT) {
        msg.channel_id.say(&ctx.http, page).await?;
    }
    Ok(())
}

#[group]
#[commands(help)]
pub struct Help;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_help_uses_prefix() {
        let text = render_help("!");
        assert!(text.contains("`!ping`"));
        assert!(!text.contains("{p}"));
        assert!(text.contains("`!slot <bid>`"));
        assert!(text.contains("`!ban @user"));
    }
}
