// bank.rs - Bank/Currency Core
// Accounts, balances and bank settings. The bank is either global (one
// account per user, one set of settings) or local (accounts and settings per
// guild). Every failure is a BankError variant so callers can tell them apart.
//
// Used by: commands/economy.rs, main.rs (load/save)

use crate::slots::{Payout, SlotSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::model::id::{GuildId, UserId};
use serenity::prelude::TypeMapKey;
use std::collections::{HashMap, HashSet};

pub const MAX_BALANCE: i64 = i64::MAX;
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error("The bank is not global.")]
    BankNotGlobal,
    #[error("The bank is already global.")]
    BankIsGlobal,
    #[error("That account already exists.")]
    AccountAlreadyExists,
    #[error("There is no account for that user.")]
    NoAccount,
    #[error("The sender does not have an account.")]
    NoSenderAccount,
    #[error("The receiver does not have an account.")]
    NoReceiverAccount,
    #[error("Insufficient funds: {amount} requested but only {balance} available.")]
    InsufficientBalance { balance: i64, amount: i64 },
    #[error("Amounts cannot be negative ({0}).")]
    NegativeValue(i64),
    #[error("Sender and receiver are the same account.")]
    SameSenderAndReceiver,
    #[error("That would exceed the maximum balance of {max_balance} {currency}.")]
    BalanceTooHigh { max_balance: i64, currency: String },
    #[error("Too soon. Next payday in {remaining_secs} seconds.")]
    PaydayCooldown { remaining_secs: i64 },
    #[error("That's an invalid bid amount. Bids run from {min} to {max}.")]
    InvalidBid { min: i64, max: i64 },
    #[error("You're on cooldown, try again in {remaining_secs} seconds.")]
    SlotCooldown { remaining_secs: i64 },
    #[error("Invalid slot setting: {0}")]
    InvalidSlotSetting(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankSettings {
    pub bank_name: String,
    pub currency: String,
    pub default_balance: i64,
    pub max_balance: i64,
    #[serde(default)]
    pub slots: SlotSettings,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            bank_name: "Twentysix bank".to_string(),
            currency: "credits".to_string(),
            default_balance: 100,
            max_balance: MAX_BALANCE,
            slots: SlotSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_payday: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_slot: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Ledger {
    #[serde(default)]
    settings: BankSettings,
    #[serde(default)]
    accounts: HashMap<u64, Account>,
}

impl Ledger {
    fn too_high(&self) -> BankError {
        BankError::BalanceTooHigh {
            max_balance: self.settings.max_balance,
            currency: self.settings.currency.clone(),
        }
    }
}

/// Who owns an account: the user, plus the guild when the bank is local
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holder {
    pub guild: Option<GuildId>,
    pub user: UserId,
}

impl Holder {
    pub fn new(guild: Option<GuildId>, user: UserId) -> Self {
        Self { guild, user }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    schema_version: u32,
    is_global: bool,
    #[serde(default)]
    global: Ledger,
    #[serde(default)]
    guilds: HashMap<u64, Ledger>,
}

impl Default for Bank {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            is_global: false,
            global: Ledger::default(),
            guilds: HashMap::new(),
        }
    }
}

pub struct BankKey;
impl TypeMapKey for BankKey {
    type Value = Bank;
}

fn check_amount(amount: i64) -> Result<(), BankError> {
    if amount < 0 {
        Err(BankError::NegativeValue(amount))
    } else {
        Ok(())
    }
}

impl Bank {
    fn ledger(&self, guild: Option<GuildId>) -> Result<Option<&Ledger>, BankError> {
        if self.is_global {
            return Ok(Some(&self.global));
        }
        let guild = guild.ok_or(BankError::BankNotGlobal)?;
        Ok(self.guilds.get(&guild.0))
    }

    fn ledger_mut(&mut self, guild: Option<GuildId>) -> Result<&mut Ledger, BankError> {
        if self.is_global {
            return Ok(&mut self.global);
        }
        let guild = guild.ok_or(BankError::BankNotGlobal)?;
        Ok(self.guilds.entry(guild.0).or_default())
    }

    fn account_mut(&mut self, holder: Holder) -> Result<&mut Account, BankError> {
        self.ledger_mut(holder.guild)?
            .accounts
            .get_mut(&holder.user.0)
            .ok_or(BankError::NoAccount)
    }

    pub fn is_global(&self) -> bool {
        self.is_global
    }

    /// Switch between global and local mode. All accounts are wiped.
    pub fn set_global(&mut self, global: bool) -> Result<(), BankError> {
        match (self.is_global, global) {
            (true, true) => return Err(BankError::BankIsGlobal),
            (false, false) => return Err(BankError::BankNotGlobal),
            _ => {}
        }
        self.wipe_all();
        self.is_global = global;
        Ok(())
    }

    fn wipe_all(&mut self) {
        self.global.accounts.clear();
        for ledger in self.guilds.values_mut() {
            ledger.accounts.clear();
        }
    }

    pub fn settings(&self, guild: Option<GuildId>) -> Result<BankSettings, BankError> {
        Ok(self
            .ledger(guild)?
            .map(|l| l.settings.clone())
            .unwrap_or_default())
    }

    pub fn set_bank_name(&mut self, guild: Option<GuildId>, name: &str) -> Result<(), BankError> {
        self.ledger_mut(guild)?.settings.bank_name = name.to_string();
        Ok(())
    }

    pub fn set_currency_name(&mut self, guild: Option<GuildId>, name: &str) -> Result<(), BankError> {
        self.ledger_mut(guild)?.settings.currency = name.to_string();
        Ok(())
    }

    pub fn set_default_balance(&mut self, guild: Option<GuildId>, amount: i64) -> Result<(), BankError> {
        check_amount(amount)?;
        let ledger = self.ledger_mut(guild)?;
        if amount > ledger.settings.max_balance {
            return Err(ledger.too_high());
        }
        ledger.settings.default_balance = amount;
        Ok(())
    }

    /// Lower or raise the ceiling. Balances above a lowered ceiling are clamped.
    pub fn set_max_balance(&mut self, guild: Option<GuildId>, amount: i64) -> Result<(), BankError> {
        if amount <= 0 {
            return Err(BankError::NegativeValue(amount));
        }
        let ledger = self.ledger_mut(guild)?;
        ledger.settings.max_balance = amount;
        if ledger.settings.default_balance > amount {
            ledger.settings.default_balance = amount;
        }
        for account in ledger.accounts.values_mut() {
            if account.balance > amount {
                account.balance = amount;
            }
        }
        Ok(())
    }

    pub fn create_account(&mut self, holder: Holder, name: &str, now: DateTime<Utc>) -> Result<Account, BankError> {
        let ledger = self.ledger_mut(holder.guild)?;
        if ledger.accounts.contains_key(&holder.user.0) {
            return Err(BankError::AccountAlreadyExists);
        }
        let account = Account {
            name: name.to_string(),
            balance: ledger.settings.default_balance,
            created_at: now,
            last_payday: None,
            last_slot: None,
        };
        ledger.accounts.insert(holder.user.0, account.clone());
        Ok(account)
    }

    pub fn get_account(&self, holder: Holder) -> Result<&Account, BankError> {
        self.ledger(holder.guild)?
            .and_then(|l| l.accounts.get(&holder.user.0))
            .ok_or(BankError::NoAccount)
    }

    pub fn get_balance(&self, holder: Holder) -> Result<i64, BankError> {
        Ok(self.get_account(holder)?.balance)
    }

    pub fn can_spend(&self, holder: Holder, amount: i64) -> bool {
        amount >= 0 && self.get_balance(holder).map(|b| b >= amount).unwrap_or(false)
    }

    pub fn set_balance(&mut self, holder: Holder, amount: i64) -> Result<i64, BankError> {
        check_amount(amount)?;
        let ledger = self.ledger_mut(holder.guild)?;
        if amount > ledger.settings.max_balance {
            return Err(ledger.too_high());
        }
        let account = ledger.accounts.get_mut(&holder.user.0).ok_or(BankError::NoAccount)?;
        account.balance = amount;
        Ok(amount)
    }

    pub fn withdraw_credits(&mut self, holder: Holder, amount: i64) -> Result<i64, BankError> {
        check_amount(amount)?;
        let account = self.account_mut(holder)?;
        if amount > account.balance {
            return Err(BankError::InsufficientBalance {
                balance: account.balance,
                amount,
            });
        }
        account.balance -= amount;
        Ok(account.balance)
    }

    pub fn deposit_credits(&mut self, holder: Holder, amount: i64) -> Result<i64, BankError> {
        check_amount(amount)?;
        let ledger = self.ledger_mut(holder.guild)?;
        let max = ledger.settings.max_balance;
        let too_high = ledger.too_high();
        let account = ledger.accounts.get_mut(&holder.user.0).ok_or(BankError::NoAccount)?;
        match account.balance.checked_add(amount) {
            Some(total) if total <= max => {
                account.balance = total;
                Ok(total)
            }
            _ => Err(too_high),
        }
    }

    /// Move credits between two accounts. Nothing changes unless every check passes.
    /// Returns the receiver's new balance.
    pub fn transfer_credits(&mut self, from: Holder, to: Holder, amount: i64) -> Result<i64, BankError> {
        check_amount(amount)?;
        if from.user == to.user {
            return Err(BankError::SameSenderAndReceiver);
        }
        let sender_balance = match self.get_account(from) {
            Ok(account) => account.balance,
            Err(BankError::NoAccount) => return Err(BankError::NoSenderAccount),
            Err(e) => return Err(e),
        };
        let receiver_balance = match self.get_account(to) {
            Ok(account) => account.balance,
            Err(BankError::NoAccount) => return Err(BankError::NoReceiverAccount),
            Err(e) => return Err(e),
        };
        if amount > sender_balance {
            return Err(BankError::InsufficientBalance {
                balance: sender_balance,
                amount,
            });
        }
        let settings = self.settings(to.guild)?;
        match receiver_balance.checked_add(amount) {
            Some(total) if total <= settings.max_balance => {}
            _ => {
                return Err(BankError::BalanceTooHigh {
                    max_balance: settings.max_balance,
                    currency: settings.currency,
                })
            }
        }

        self.withdraw_credits(from, amount)?;
        self.deposit_credits(to, amount)
    }

    /// Pay out `amount` if the last payday was at least `cooldown` ago
    pub fn payday(
        &mut self,
        holder: Holder,
        amount: i64,
        cooldown: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<i64, BankError> {
        check_amount(amount)?;
        let last = self.get_account(holder)?.last_payday;
        if let Some(last) = last {
            let ready_at = last + cooldown;
            if now < ready_at {
                return Err(BankError::PaydayCooldown {
                    remaining_secs: (ready_at - now).num_seconds().max(1),
                });
            }
        }
        let settings = self.settings(holder.guild)?;
        let account = self.account_mut(holder)?;
        // Payday tops up to the ceiling rather than failing
        account.balance = account
            .balance
            .checked_add(amount)
            .map(|b| b.min(settings.max_balance))
            .unwrap_or(settings.max_balance);
        account.last_payday = Some(now);
        Ok(account.balance)
    }

    pub fn set_slot_min(&mut self, guild: Option<GuildId>, bid: i64) -> Result<(), BankError> {
        let slots = &mut self.ledger_mut(guild)?.settings.slots;
        if bid < 1 {
            return Err(BankError::InvalidSlotSetting("the minimum bid must be at least 1"));
        }
        if bid > slots.max_bid {
            return Err(BankError::InvalidSlotSetting("the minimum bid cannot exceed the maximum"));
        }
        slots.min_bid = bid;
        Ok(())
    }

    pub fn set_slot_max(&mut self, guild: Option<GuildId>, bid: i64) -> Result<(), BankError> {
        let slots = &mut self.ledger_mut(guild)?.settings.slots;
        if bid < 1 || bid < slots.min_bid {
            return Err(BankError::InvalidSlotSetting("the maximum bid must be at least the minimum"));
        }
        slots.max_bid = bid;
        Ok(())
    }

    pub fn set_slot_cooldown(&mut self, guild: Option<GuildId>, seconds: i64) -> Result<(), BankError> {
        check_amount(seconds)?;
        self.ledger_mut(guild)?.settings.slots.cooldown_secs = seconds;
        Ok(())
    }

    /// Settle one slot pull for an already spun pay line.
    /// Returns the balance before and after.
    pub fn play_slot(
        &mut self,
        holder: Holder,
        bid: i64,
        payout: Option<Payout>,
        now: DateTime<Utc>,
    ) -> Result<(i64, i64), BankError> {
        let settings = self.settings(holder.guild)?;
        let slots = settings.slots;
        let account = self.get_account(holder)?;
        if let Some(last) = account.last_slot {
            let ready_at = last + chrono::Duration::seconds(slots.cooldown_secs);
            if now < ready_at {
                return Err(BankError::SlotCooldown {
                    remaining_secs: (ready_at - now).num_seconds().max(1),
                });
            }
        }
        if bid < slots.min_bid || bid > slots.max_bid {
            return Err(BankError::InvalidBid {
                min: slots.min_bid,
                max: slots.max_bid,
            });
        }
        if !self.can_spend(holder, bid) {
            return Err(BankError::InsufficientBalance {
                balance: account.balance,
                amount: bid,
            });
        }

        let account = self.account_mut(holder)?;
        let before = account.balance;
        let won = payout.map_or(0, |p| p.amount(bid));
        // Winnings top up to the ceiling rather than failing
        account.balance = (before - bid).saturating_add(won).min(settings.max_balance);
        account.last_slot = Some(now);
        Ok((before, account.balance))
    }

    /// Richest accounts first, ties broken by name
    pub fn leaderboard(&self, guild: Option<GuildId>, limit: usize) -> Result<Vec<(UserId, Account)>, BankError> {
        let mut rows: Vec<(UserId, Account)> = match self.ledger(guild)? {
            Some(ledger) => ledger
                .accounts
                .iter()
                .map(|(id, acc)| (UserId(*id), acc.clone()))
                .collect(),
            None => Vec::new(),
        };
        rows.sort_by(|a, b| b.1.balance.cmp(&a.1.balance).then_with(|| a.1.name.cmp(&b.1.name)));
        rows.truncate(limit);
        Ok(rows)
    }

    /// Delete accounts: the guild's on a local bank, everyone's on a global one.
    /// A local bank with no guild given wipes every guild.
    pub fn wipe_bank(&mut self, guild: Option<GuildId>) {
        if self.is_global {
            self.global.accounts.clear();
            return;
        }
        match guild {
            Some(guild) => {
                if let Some(ledger) = self.guilds.get_mut(&guild.0) {
                    ledger.accounts.clear();
                }
            }
            None => self.wipe_all(),
        }
    }

    /// Remove accounts whose users are not in `keep`. Returns how many were removed.
    pub fn bank_prune(&mut self, guild: Option<GuildId>, keep: &HashSet<UserId>) -> Result<usize, BankError> {
        let ledger = self.ledger_mut(guild)?;
        let before = ledger.accounts.len();
        ledger.accounts.retain(|id, _| keep.contains(&UserId(*id)));
        Ok(before - ledger.accounts.len())
    }

    pub fn account_count(&self) -> usize {
        self.global.accounts.len() + self.guilds.values().map(|l| l.accounts.len()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const GUILD: GuildId = GuildId(100);
    const OTHER_GUILD: GuildId = GuildId(200);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn holder(user: u64) -> Holder {
        Holder::new(Some(GUILD), UserId(user))
    }

    fn bank_with(users: &[u64]) -> Bank {
        let mut bank = Bank::default();
        for user in users {
            bank.create_account(holder(*user), &format!("user{}", user), now()).unwrap();
        }
        bank
    }

    #[test]
    fn test_new_account_gets_default_balance() {
        let mut bank = Bank::default();
        let account = bank.create_account(holder(1), "alice", now()).unwrap();
        assert_eq!(account.balance, 100);
        assert_eq!(bank.get_balance(holder(1)), Ok(100));
        assert_eq!(
            bank.create_account(holder(1), "alice", now()),
            Err(BankError::AccountAlreadyExists)
        );
    }

    #[test]
    fn test_local_bank_needs_guild_and_separates_guilds() {
        let mut bank = bank_with(&[1]);
        assert_eq!(
            bank.get_balance(Holder::new(None, UserId(1))),
            Err(BankError::BankNotGlobal)
        );
        assert_eq!(
            bank.get_balance(Holder::new(Some(OTHER_GUILD), UserId(1))),
            Err(BankError::NoAccount)
        );
        bank.set_currency_name(Some(OTHER_GUILD), "gems").unwrap();
        assert_eq!(bank.settings(Some(GUILD)).unwrap().currency, "credits");
        assert_eq!(bank.settings(Some(OTHER_GUILD)).unwrap().currency, "gems");
    }

    #[test]
    fn test_set_global_wipes_and_rejects_no_op() {
        let mut bank = bank_with(&[1, 2]);
        assert_eq!(bank.set_global(false), Err(BankError::BankNotGlobal));
        bank.set_global(true).unwrap();
        assert!(bank.is_global());
        assert_eq!(bank.account_count(), 0);
        assert_eq!(bank.set_global(true), Err(BankError::BankIsGlobal));

        // Global accounts ignore the guild
        bank.create_account(Holder::new(None, UserId(1)), "alice", now()).unwrap();
        assert_eq!(bank.get_balance(holder(1)), Ok(100));
    }

    #[test]
    fn test_withdraw_and_deposit() {
        let mut bank = bank_with(&[1]);
        assert_eq!(bank.withdraw_credits(holder(1), 40), Ok(60));
        assert_eq!(
            bank.withdraw_credits(holder(1), 61),
            Err(BankError::InsufficientBalance { balance: 60, amount: 61 })
        );
        assert_eq!(bank.withdraw_credits(holder(1), -5), Err(BankError::NegativeValue(-5)));
        assert_eq!(bank.deposit_credits(holder(1), 15), Ok(75));
        assert_eq!(bank.deposit_credits(holder(2), 15), Err(BankError::NoAccount));
    }

    #[test]
    fn test_max_balance_is_enforced_and_clamps() {
        let mut bank = bank_with(&[1]);
        bank.set_balance(holder(1), 500).unwrap();
        bank.set_max_balance(Some(GUILD), 300).unwrap();
        assert_eq!(bank.get_balance(holder(1)), Ok(300));
        assert!(matches!(
            bank.deposit_credits(holder(1), 1),
            Err(BankError::BalanceTooHigh { max_balance: 300, .. })
        ));
        assert!(matches!(bank.set_balance(holder(1), 301), Err(BankError::BalanceTooHigh { .. })));
        assert_eq!(bank.set_max_balance(Some(GUILD), 0), Err(BankError::NegativeValue(0)));
    }

    #[test]
    fn test_deposit_cannot_overflow() {
        let mut bank = bank_with(&[1]);
        bank.set_balance(holder(1), MAX_BALANCE).unwrap();
        assert!(matches!(bank.deposit_credits(holder(1), 1), Err(BankError::BalanceTooHigh { .. })));
    }

    #[test]
    fn test_transfer_conserves_credits() {
        let mut bank = bank_with(&[1, 2]);
        assert_eq!(bank.transfer_credits(holder(1), holder(2), 30), Ok(130));
        assert_eq!(bank.get_balance(holder(1)), Ok(70));
        assert_eq!(bank.get_balance(holder(1)).unwrap() + bank.get_balance(holder(2)).unwrap(), 200);
    }

    #[test]
    fn test_transfer_errors_leave_balances_untouched() {
        let mut bank = bank_with(&[1, 2]);
        assert_eq!(
            bank.transfer_credits(holder(1), holder(1), 10),
            Err(BankError::SameSenderAndReceiver)
        );
        assert_eq!(bank.transfer_credits(holder(3), holder(1), 10), Err(BankError::NoSenderAccount));
        assert_eq!(bank.transfer_credits(holder(1), holder(3), 10), Err(BankError::NoReceiverAccount));
        assert_eq!(
            bank.transfer_credits(holder(1), holder(2), 101),
            Err(BankError::InsufficientBalance { balance: 100, amount: 101 })
        );

        bank.set_max_balance(Some(GUILD), 150).unwrap();
        assert!(matches!(
            bank.transfer_credits(holder(1), holder(2), 60),
            Err(BankError::BalanceTooHigh { .. })
        ));
        assert_eq!(bank.get_balance(holder(1)), Ok(100));
        assert_eq!(bank.get_balance(holder(2)), Ok(100));
    }

    #[test]
    fn test_can_spend() {
        let bank = bank_with(&[1]);
        assert!(bank.can_spend(holder(1), 100));
        assert!(!bank.can_spend(holder(1), 101));
        assert!(!bank.can_spend(holder(1), -1));
        assert!(!bank.can_spend(holder(9), 1));
    }

    #[test]
    fn test_slot_wins_and_losses() {
        let mut bank = bank_with(&[1]);
        assert_eq!(bank.play_slot(holder(1), 10, None, now()), Ok((100, 90)));
        assert_eq!(
            bank.play_slot(holder(1), 10, Some(Payout::TwoSymbols), now()),
            Ok((90, 110))
        );

        bank.set_max_balance(Some(GUILD), 1_000).unwrap();
        assert_eq!(
            bank.play_slot(holder(1), 100, Some(Payout::Jackpot), now()),
            Ok((110, 1_000))
        );
    }

    #[test]
    fn test_slot_checks_bid_funds_and_cooldown() {
        let mut bank = bank_with(&[1]);
        assert_eq!(
            bank.play_slot(holder(1), 4, None, now()),
            Err(BankError::InvalidBid { min: 5, max: 100 })
        );
        assert_eq!(bank.play_slot(holder(9), 10, None, now()), Err(BankError::NoAccount));

        bank.set_balance(holder(1), 20).unwrap();
        assert_eq!(
            bank.play_slot(holder(1), 50, None, now()),
            Err(BankError::InsufficientBalance { balance: 20, amount: 50 })
        );

        bank.set_slot_cooldown(Some(GUILD), 60).unwrap();
        assert_eq!(bank.play_slot(holder(1), 10, None, now()), Ok((20, 10)));
        assert_eq!(
            bank.play_slot(holder(1), 5, None, now() + chrono::Duration::seconds(45)),
            Err(BankError::SlotCooldown { remaining_secs: 15 })
        );
        assert_eq!(bank.get_balance(holder(1)), Ok(10));
        assert!(bank.play_slot(holder(1), 5, None, now() + chrono::Duration::seconds(60)).is_ok());
    }

    #[test]
    fn test_slot_settings() {
        let mut bank = bank_with(&[1]);
        assert!(matches!(bank.set_slot_min(Some(GUILD), 0), Err(BankError::InvalidSlotSetting(_))));
        assert!(matches!(bank.set_slot_min(Some(GUILD), 500), Err(BankError::InvalidSlotSetting(_))));
        assert!(matches!(bank.set_slot_max(Some(GUILD), 2), Err(BankError::InvalidSlotSetting(_))));
        assert_eq!(bank.set_slot_cooldown(Some(GUILD), -1), Err(BankError::NegativeValue(-1)));

        bank.set_slot_max(Some(GUILD), 1_000).unwrap();
        bank.set_slot_min(Some(GUILD), 500).unwrap();
        let slots = bank.settings(Some(GUILD)).unwrap().slots;
        assert_eq!((slots.min_bid, slots.max_bid), (500, 1_000));
        assert_eq!(bank.settings(Some(OTHER_GUILD)).unwrap().slots, SlotSettings::default());
    }

    #[test]
    fn test_payday_cooldown() {
        let mut bank = bank_with(&[1]);
        let cooldown = chrono::Duration::seconds(300);
        assert_eq!(bank.payday(holder(1), 120, cooldown, now()), Ok(220));
        assert_eq!(
            bank.payday(holder(1), 120, cooldown, now() + chrono::Duration::seconds(100)),
            Err(BankError::PaydayCooldown { remaining_secs: 200 })
        );
        assert_eq!(
            bank.payday(holder(1), 120, cooldown, now() + chrono::Duration::seconds(300)),
            Ok(340)
        );
    }

    #[test]
    fn test_leaderboard_order_and_limit() {
        let mut bank = bank_with(&[1, 2, 3]);
        bank.set_balance(holder(2), 500).unwrap();
        bank.set_balance(holder(3), 500).unwrap();
        let top = bank.leaderboard(Some(GUILD), 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, UserId(2));
        assert_eq!(top[1].0, UserId(3));
        assert!(bank.leaderboard(Some(OTHER_GUILD), 10).unwrap().is_empty());
    }

    #[test]
    fn test_wipe_and_prune() {
        let mut bank = bank_with(&[1, 2, 3]);
        bank.create_account(Holder::new(Some(OTHER_GUILD), UserId(1)), "alice", now()).unwrap();

        let keep: HashSet<UserId> = [UserId(1)].into_iter().collect();
        assert_eq!(bank.bank_prune(Some(GUILD), &keep), Ok(2));
        assert_eq!(bank.account_count(), 2);

        bank.wipe_bank(Some(GUILD));
        assert_eq!(bank.account_count(), 1);
        bank.wipe_bank(None);
        assert_eq!(bank.account_count(), 0);
    }

    #[test]
    fn test_bank_survives_json() {
        let mut bank = bank_with(&[1]);
        bank.payday(holder(1), 5, chrono::Duration::seconds(1), now()).unwrap();
        let text = crate::json::dumps(&bank).unwrap();
        let back: Bank = crate::json::loads(&text).unwrap();
        assert_eq!(back.get_account(holder(1)), bank.get_account(holder(1)));
        assert!(!back.is_global());
    }
}
