// admin.rs - Administrative commands for bot management
// Owner-only commands: restart and shutdown save the bank and case log
// before the process goes away.
//
// Used by: main.rs (command registration)

use crate::commands::{is_owner, persist_bank, persist_modlog};
use log::{error, info};
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, CommandResult},
    model::channel::Message,
};
use std::process::Command;
use std::time::Duration;

const ACCESS_DENIED: &str = "❌ **Access Denied**\nThis command can only be used by the bot owner.";

async fn save_everything(ctx: &Context) {
    info!("[ADMIN] Saving bank and case log...");
    persist_bank(ctx).await;
    persist_modlog(ctx).await;
}

#[command]
#[aliases("reboot", "restartbot")]
/// Restart the bot (owner only)
/// Saves data, starts a fresh copy of this executable and exits
pub async fn restart(ctx: &Context, msg: &Message) -> CommandResult {
    if !is_owner(ctx, msg).await {
        msg.reply(ctx, ACCESS_DENIED).await?;
        return Ok(());
    }

    let mut confirmation = msg
        .reply(ctx, "🔄 **Bot Restart Initiated**\n\nSaving data and shutting down gracefully...")
        .await?;
    info!("[ADMIN] Bot restart requested by owner {} ({})", msg.author.name, msg.author.id);

    save_everything(ctx).await;
    confirmation
        .edit(&ctx.http, |m| {
            m.content("✅ **Data Saved**\n\n🔄 **Restarting Bot...**\n\nPlease wait a moment for it to come back online.")
        })
        .await?;

    // Let the edit reach Discord before the process is replaced
    tokio::time::sleep(Duration::from_millis(500)).await;
    restart_bot_process().await?;
    Ok(())
}

/// Spawn this executable again with the same arguments, then exit
async fn restart_bot_process() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let current_exe = std::env::current_exe()?;
    let current_dir = std::env::current_dir()?;
    info!("[ADMIN] Restarting bot process: {}", current_exe.display());

    let mut restart_cmd = Command::new(&current_exe);
    restart_cmd.current_dir(current_dir);
    restart_cmd.args(std::env::args().skip(1));

    match restart_cmd.spawn() {
        Ok(_) => {
            info!("[ADMIN] New bot process started, exiting current process");
            tokio::time::sleep(Duration::from_millis(1000)).await;
            std::process::exit(0);
        }
        Err(e) => {
            error!("[ADMIN] Failed to restart bot process: {}", e);
            Err(format!("Failed to restart bot: {}", e).into())
        }
    }
}

#[command]
#[aliases("stopbot")]
/// Shut the bot down (owner only)
pub async fn shutdown(ctx: &Context, msg: &Message) -> CommandResult {
    if !is_owner(ctx, msg).await {
        msg.reply(ctx, ACCESS_DENIED).await?;
        return Ok(());
    }

    let mut confirmation = msg
        .reply(ctx, "🛑 **Bot Shutdown Initiated**\n\nSaving data and shutting down gracefully...")
        .await?;
    info!("[ADMIN] Bot shutdown requested by owner {} ({})", msg.author.name, msg.author.id);

    save_everything(ctx).await;
    confirmation
        .edit(&ctx.http, |m| {
            m.content("✅ **Data Saved**\n\n🛑 **Shutting Down Bot...**")
        })
        .await?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    info!("[ADMIN] Exiting bot process");
    std::process::exit(0);
}

#[command]
#[aliases("ahelp")]
/// List the owner-only commands
pub async fn adminhelp(ctx: &Context, msg: &Message) -> CommandResult {
    if !is_owner(ctx, msg).await {
        msg.reply(ctx, ACCESS_DENIED).await?;
        return Ok(());
    }

    let help_text = "**🔧 Admin Commands**\n\n\
                    `^restart` - Save data and restart the bot\n\
                    `^shutdown` - Save data and stop the bot\n\
                    `^bankset toggleglobal` - Switch the bank between global and per-server\n\
                    `^adminhelp` - Show this help message\n\n\
                    **Note:** These commands can only be used by the bot owner.";
    msg.reply(ctx, help_text).await?;
    Ok(())
}

#[group]
#[commands(restart, shutdown, adminhelp)]
pub struct Admin;
