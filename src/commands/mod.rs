// commands/mod.rs - Command Module Registry
// Declares every cog and the helpers they share: the pooled HTTP client,
// config access, permission checks and persisting the bank/case log after
// a command changes them.

pub mod admin;          // Owner-only shutdown/restart
pub mod dice;           // mroll and dicetable
pub mod economy;        // Bank accounts, payday and bank settings
pub mod general;        // ping, choose, roll, flip, 8ball, stopwatch, info
pub mod help;           // Help text
pub mod image;          // Imgur, meme and viper
pub mod league;         // op.gg and champion links
pub mod moderation;     // timeout / untimeout
pub mod modlog;         // Case lookup and mod log settings
pub mod wiki;           // Wikipedia lookup
pub mod youtube;        // YouTube search

use crate::bank::BankKey;
use crate::config::{BotConfig, ConfigKey};
use crate::modlog::ModLogKey;
use crate::storage;
use log::error;
use serenity::{
    client::Context,
    model::{channel::Message, id::GuildId, Permissions},
    prelude::{RwLock, TypeMap},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::const_new();

/// Shared HTTP client for every cog that talks to an outside API
pub async fn get_http_client() -> &'static reqwest::Client {
    HTTP_CLIENT
        .get_or_init(|| async {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .connect_timeout(Duration::from_secs(10))
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(10)
                .user_agent(concat!("cog_bot/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|e| {
                    error!("[HTTP] Failed to build tuned client, using defaults: {}", e);
                    reqwest::Client::new()
                })
        })
        .await
}

pub async fn bot_config(ctx: &Context) -> Result<Arc<BotConfig>, String> {
    let data = ctx.data.read().await;
    data.get::<ConfigKey>()
        .cloned()
        .ok_or_else(|| "bot configuration missing from context".to_string())
}

/// Whether the author is the configured bot owner
pub async fn is_owner(ctx: &Context, msg: &Message) -> bool {
    match bot_config(ctx).await {
        Ok(config) => config.is_owner(msg.author.id),
        Err(_) => false,
    }
}

/// Guild administrators, plus the bot owner everywhere
pub async fn is_guild_admin(ctx: &Context, msg: &Message) -> bool {
    if is_owner(ctx, msg).await {
        return true;
    }
    let guild = match msg.guild(&ctx.cache) {
        Some(guild) => guild,
        None => return false,
    };
    if guild.owner_id == msg.author.id {
        return true;
    }
    match msg.member(ctx).await {
        Ok(member) => member
            .permissions(&ctx.cache)
            .map(|perms| grants(perms, Permissions::ADMINISTRATOR))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Administrators pass every permission gate
pub fn grants(perms: Permissions, needed: Permissions) -> bool {
    perms.contains(Permissions::ADMINISTRATOR) || perms.contains(needed)
}

/// Write the bank to disk from a snapshot taken under the read lock
pub async fn save_bank_data(data: &RwLock<TypeMap>) {
    let (snapshot, config) = {
        let data = data.read().await;
        (data.get::<BankKey>().cloned(), data.get::<ConfigKey>().cloned())
    };
    if let (Some(bank), Some(config)) = (snapshot, config) {
        let path = config.data_dir.join(storage::BANK_FILE);
        if let Err(e) = storage::save_in_background(path.clone(), bank).await {
            error!("[BANK] Failed to save {}: {}", path.display(), e);
        }
    }
}

pub async fn save_modlog_data(data: &RwLock<TypeMap>) {
    let (snapshot, config) = {
        let data = data.read().await;
        (data.get::<ModLogKey>().cloned(), data.get::<ConfigKey>().cloned())
    };
    if let (Some(modlog), Some(config)) = (snapshot, config) {
        let path = config.data_dir.join(storage::MODLOG_FILE);
        if let Err(e) = storage::save_in_background(path.clone(), modlog).await {
            error!("[MODLOG] Failed to save {}: {}", path.display(), e);
        }
    }
}

pub async fn persist_bank(ctx: &Context) {
    save_bank_data(&ctx.data).await;
}

pub async fn persist_modlog(ctx: &Context) {
    save_modlog_data(&ctx.data).await;
}

/// Guild of a message that the framework already restricted to guilds
pub fn guild_of(msg: &Message) -> Result<GuildId, String> {
    msg.guild_id
        .ok_or_else(|| "command used outside a guild".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{Bank, Holder};
    use crate::config::parse_config;
    use serenity::model::id::UserId;

    #[tokio::test]
    async fn test_save_bank_data_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let map = parse_config(&format!("DISCORD_TOKEN=t\nDATA_DIR={}", dir.path().display()));
        let config = Arc::new(BotConfig::from_map(&map).unwrap());

        let mut bank = Bank::default();
        bank.create_account(Holder::new(Some(GuildId(1)), UserId(2)), "ferris", chrono::Utc::now())
            .unwrap();

        let mut map = TypeMap::new();
        map.insert::<ConfigKey>(config);
        map.insert::<BankKey>(bank);
        let data = RwLock::new(map);

        save_bank_data(&data).await;
        let loaded: Bank = storage::load_or_default(&dir.path().join(storage::BANK_FILE)).unwrap();
        assert_eq!(loaded.account_count(), 1);
    }

    #[test]
    fn test_grants() {
        let mods = Permissions::MODERATE_MEMBERS | Permissions::SEND_MESSAGES;
        assert!(grants(mods, Permissions::MODERATE_MEMBERS));
        assert!(!grants(mods, Permissions::BAN_MEMBERS));
        assert!(grants(Permissions::ADMINISTRATOR, Permissions::BAN_MEMBERS));
        assert!(!grants(Permissions::empty(), Permissions::ADMINISTRATOR));
        assert!(grants(Permissions::ADMINISTRATOR, Permissions::ADMINISTRATOR));
    }

    #[tokio::test]
    async fn test_save_without_state_is_a_no_op() {
        let data = RwLock::new(TypeMap::new());
        save_bank_data(&data).await;
        save_modlog_data(&data).await;
    }
}
