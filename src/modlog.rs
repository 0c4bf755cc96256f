// modlog.rs - Moderation Case Log
// Keeps numbered, per-guild records of moderation actions together with the
// registry of case types they are filed under.
//
// Key Features:
// - Case type registry with per-guild enable/disable overrides
// - Dense case numbering per guild starting at 1
// - Case edits restricted to the original moderator or an admin
// - Optional log channel per guild that cases get posted to
//
// Used by: commands/modlog.rs, commands/moderation.rs, main.rs (load/save)

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use serenity::prelude::TypeMapKey;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ModlogError {
    #[error("You are not authorized to edit case #{case_number}.")]
    UnauthorizedCaseEdit { case_number: u64 },
    #[error("No mod log channel is set for this server.")]
    NoModLogChannel,
    #[error("Case type `{0}` is disabled on this server.")]
    CaseTypeNotEnabled(String),
    #[error("Case type `{0}` is not registered.")]
    CaseTypeNotRegistered(String),
    #[error("Case type `{0}` is already registered.")]
    CaseTypeAlreadyRegistered(String),
    #[error("Invalid case type: {0}")]
    InvalidCaseType(String),
    #[error("Case #{0} does not exist.")]
    NoSuchCase(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseType {
    pub name: String,
    pub default_setting: bool,
    pub image: String,
    pub case_str: String,
}

impl CaseType {
    pub fn new(name: &str, default_setting: bool, image: &str, case_str: &str) -> Self {
        Self {
            name: name.to_string(),
            default_setting,
            image: image.to_string(),
            case_str: case_str.to_string(),
        }
    }

    fn validate(&self) -> Result<(), ModlogError> {
        if self.name.is_empty() || !self.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ModlogError::InvalidCaseType(format!(
                "name `{}` must be non-empty ASCII letters, digits or underscores",
                self.name
            )));
        }
        if self.case_str.trim().is_empty() {
            return Err(ModlogError::InvalidCaseType(format!(
                "case type `{}` needs a display string",
                self.name
            )));
        }
        Ok(())
    }
}

/// Case types every guild starts with
pub fn default_casetypes() -> Vec<CaseType> {
    vec![
        CaseType::new("ban", true, "\u{1f528}", "Ban"),
        CaseType::new("kick", true, "\u{1f462}", "Kick"),
        CaseType::new("unban", true, "\u{1f513}", "Unban"),
        CaseType::new("timeout", true, "\u{23f3}", "Timeout"),
        CaseType::new("untimeout", true, "\u{231b}", "Timeout removed"),
        CaseType::new("warning", true, "\u{26a0}\u{fe0f}", "Warning"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub guild: GuildId,
    pub case_number: u64,
    pub action_type: String,
    pub user: UserId,
    pub user_name: String,
    pub moderator: Option<UserId>,
    pub moderator_name: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
    pub channel: Option<ChannelId>,
    pub amended_by: Option<UserId>,
    pub modified_at: Option<DateTime<Utc>>,
    pub message: Option<MessageId>,
}

/// Everything needed to file a case
#[derive(Debug, Clone)]
pub struct NewCase {
    pub action_type: String,
    pub user: UserId,
    pub user_name: String,
    pub moderator: Option<UserId>,
    pub moderator_name: Option<String>,
    pub reason: Option<String>,
    pub until: Option<DateTime<Utc>>,
    pub channel: Option<ChannelId>,
}

/// Who is editing, and whether they hold admin rights in the guild
#[derive(Debug, Clone, Copy)]
pub struct Editor {
    pub user: UserId,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CaseEdit {
    pub reason: Option<String>,
    pub until: Option<DateTime<Utc>>,
}

impl Case {
    /// Plain-text rendering used for replies and embed bodies
    pub fn render(&self, casetype: Option<&CaseType>) -> String {
        let (image, title) = match casetype {
            Some(ct) => (ct.image.as_str(), ct.case_str.as_str()),
            None => ("", self.action_type.as_str()),
        };
        let mut out = format!("**Case #{} | {} {}**\n", self.case_number, title, image)
            .replace(" **\n", "**\n");
        out.push_str(&format!("**User:** {} ({})\n", self.user_name, self.user));
        match (&self.moderator_name, self.moderator) {
            (Some(name), Some(id)) => out.push_str(&format!("**Moderator:** {} ({})\n", name, id)),
            _ => out.push_str("**Moderator:** Unknown\n"),
        }
        match &self.reason {
            Some(reason) => out.push_str(&format!("**Reason:** {}\n", reason)),
            None => out.push_str("**Reason:** No reason given\n"),
        }
        if let Some(until) = self.until {
            out.push_str(&format!(
                "**Until:** {}\n**Duration:** {}\n",
                until.format("%Y-%m-%d %H:%M UTC"),
                crate::utils::humanize_duration(until - self.created_at)
            ));
        }
        if let Some(channel) = self.channel {
            out.push_str(&format!("**Channel:** <#{}>\n", channel));
        }
        if let Some(amended_by) = self.amended_by {
            out.push_str(&format!("**Amended by:** <@{}>\n", amended_by));
        }
        if let Some(modified_at) = self.modified_at {
            out.push_str(&format!("**Last modified:** {}\n", modified_at.format("%Y-%m-%d %H:%M UTC")));
        }
        out.push_str(&format!("**Created:** {}", self.created_at.format("%Y-%m-%d %H:%M UTC")));
        out
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GuildLog {
    #[serde(default)]
    mod_log: Option<ChannelId>,
    #[serde(default)]
    cases: BTreeMap<u64, Case>,
    #[serde(default)]
    casetypes: HashMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModLog {
    casetypes: BTreeMap<String, CaseType>,
    #[serde(default)]
    guilds: HashMap<u64, GuildLog>,
}

impl Default for ModLog {
    fn default() -> Self {
        let mut log = Self {
            casetypes: BTreeMap::new(),
            guilds: HashMap::new(),
        };
        log.ensure_default_casetypes();
        log
    }
}

pub struct ModLogKey;
impl TypeMapKey for ModLogKey {
    type Value = ModLog;
}

impl ModLog {
    /// Register built-in case types missing from a loaded document
    pub fn ensure_default_casetypes(&mut self) -> usize {
        match self.register_casetypes(default_casetypes()) {
            Ok(added) => added,
            Err(e) => {
                warn!("[MODLOG] Built-in case types rejected: {}", e);
                0
            }
        }
    }

    pub fn register_casetype(&mut self, casetype: CaseType) -> Result<&CaseType, ModlogError> {
        casetype.validate()?;
        if self.casetypes.contains_key(&casetype.name) {
            return Err(ModlogError::CaseTypeAlreadyRegistered(casetype.name));
        }
        let name = casetype.name.clone();
        Ok(self.casetypes.entry(name).or_insert(casetype))
    }

    /// Register several at once, skipping ones already present
    pub fn register_casetypes(&mut self, casetypes: Vec<CaseType>) -> Result<usize, ModlogError> {
        let mut added = 0;
        for casetype in casetypes {
            match self.register_casetype(casetype) {
                Ok(_) => added += 1,
                Err(ModlogError::CaseTypeAlreadyRegistered(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(added)
    }

    pub fn get_casetype(&self, name: &str) -> Option<&CaseType> {
        self.casetypes.get(name)
    }

    pub fn get_all_casetypes(&self) -> impl Iterator<Item = &CaseType> {
        self.casetypes.values()
    }

    pub fn is_casetype_enabled(&self, guild: GuildId, name: &str) -> Result<bool, ModlogError> {
        let casetype = self
            .get_casetype(name)
            .ok_or_else(|| ModlogError::CaseTypeNotRegistered(name.to_string()))?;
        Ok(self
            .guilds
            .get(&guild.0)
            .and_then(|g| g.casetypes.get(name).copied())
            .unwrap_or(casetype.default_setting))
    }

    pub fn set_casetype_enabled(&mut self, guild: GuildId, name: &str, enabled: bool) -> Result<(), ModlogError> {
        if self.get_casetype(name).is_none() {
            return Err(ModlogError::CaseTypeNotRegistered(name.to_string()));
        }
        self.guild_mut(guild).casetypes.insert(name.to_string(), enabled);
        Ok(())
    }

    fn guild_mut(&mut self, guild: GuildId) -> &mut GuildLog {
        self.guilds.entry(guild.0).or_default()
    }

    pub fn create_case(&mut self, guild: GuildId, new: NewCase, now: DateTime<Utc>) -> Result<&Case, ModlogError> {
        if !self.is_casetype_enabled(guild, &new.action_type)? {
            return Err(ModlogError::CaseTypeNotEnabled(new.action_type));
        }
        let log = self.guild_mut(guild);
        let case_number = log.cases.keys().next_back().map(|n| n + 1).unwrap_or(1);
        let case = Case {
            guild,
            case_number,
            action_type: new.action_type,
            user: new.user,
            user_name: new.user_name,
            moderator: new.moderator,
            moderator_name: new.moderator_name,
            reason: new.reason,
            created_at: now,
            until: new.until,
            channel: new.channel,
            amended_by: None,
            modified_at: None,
            message: None,
        };
        Ok(log.cases.entry(case_number).or_insert(case))
    }

    pub fn get_case(&self, guild: GuildId, case_number: u64) -> Result<&Case, ModlogError> {
        self.guilds
            .get(&guild.0)
            .and_then(|g| g.cases.get(&case_number))
            .ok_or(ModlogError::NoSuchCase(case_number))
    }

    pub fn get_latest_case(&self, guild: GuildId) -> Option<&Case> {
        self.guilds.get(&guild.0).and_then(|g| g.cases.values().next_back())
    }

    pub fn get_all_cases(&self, guild: GuildId) -> Vec<&Case> {
        self.guilds
            .get(&guild.0)
            .map(|g| g.cases.values().collect())
            .unwrap_or_default()
    }

    pub fn get_cases_for_member(&self, guild: GuildId, user: UserId) -> Vec<&Case> {
        self.get_all_cases(guild)
            .into_iter()
            .filter(|c| c.user == user)
            .collect()
    }

    /// Change a case's reason or end time. Only its moderator or an admin may do this.
    pub fn edit_case(
        &mut self,
        guild: GuildId,
        case_number: u64,
        editor: Editor,
        edit: CaseEdit,
        now: DateTime<Utc>,
    ) -> Result<&Case, ModlogError> {
        let case = self
            .guilds
            .get_mut(&guild.0)
            .and_then(|g| g.cases.get_mut(&case_number))
            .ok_or(ModlogError::NoSuchCase(case_number))?;

        let is_moderator = case.moderator == Some(editor.user);
        if !is_moderator && !editor.is_admin {
            return Err(ModlogError::UnauthorizedCaseEdit { case_number });
        }

        if let Some(reason) = edit.reason {
            case.reason = Some(reason);
        }
        if let Some(until) = edit.until {
            case.until = Some(until);
        }
        if !is_moderator {
            case.amended_by = Some(editor.user);
        }
        case.modified_at = Some(now);
        Ok(case)
    }

    /// Remember which log message shows a case so edits can update it
    pub fn set_case_message(&mut self, guild: GuildId, case_number: u64, message: MessageId) -> Result<(), ModlogError> {
        let case = self
            .guilds
            .get_mut(&guild.0)
            .and_then(|g| g.cases.get_mut(&case_number))
            .ok_or(ModlogError::NoSuchCase(case_number))?;
        case.message = Some(message);
        Ok(())
    }

    pub fn set_modlog_channel(&mut self, guild: GuildId, channel: Option<ChannelId>) {
        self.guild_mut(guild).mod_log = channel;
    }

    pub fn get_modlog_channel(&self, guild: GuildId) -> Result<ChannelId, ModlogError> {
        self.guilds
            .get(&guild.0)
            .and_then(|g| g.mod_log)
            .ok_or(ModlogError::NoModLogChannel)
    }

    pub fn reset_cases(&mut self, guild: GuildId) {
        if let Some(log) = self.guilds.get_mut(&guild.0) {
            log.cases.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const GUILD: GuildId = GuildId(10);
    const MODERATOR: UserId = UserId(1);
    const TARGET: UserId = UserId(2);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 0).unwrap()
    }

    fn new_case(action: &str) -> NewCase {
        NewCase {
            action_type: action.to_string(),
            user: TARGET,
            user_name: "target".to_string(),
            moderator: Some(MODERATOR),
            moderator_name: Some("mod".to_string()),
            reason: None,
            until: None,
            channel: None,
        }
    }

    #[test]
    fn test_defaults_are_registered() {
        let log = ModLog::default();
        for name in ["ban", "kick", "unban", "timeout", "untimeout", "warning"] {
            assert!(log.get_casetype(name).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_loaded_document_gets_missing_builtins() {
        let mut log: ModLog = crate::json::loads(r#"{"casetypes":{}}"#).unwrap();
        assert!(log.get_casetype("ban").is_none());
        assert_eq!(log.ensure_default_casetypes(), 6);
        assert!(log.get_casetype("warning").is_some());
        assert_eq!(log.ensure_default_casetypes(), 0);
    }

    #[test]
    fn test_register_casetype_validation() {
        let mut log = ModLog::default();
        assert_eq!(
            log.register_casetype(CaseType::new("ban", true, "", "Ban")).err(),
            Some(ModlogError::CaseTypeAlreadyRegistered("ban".to_string()))
        );
        assert!(matches!(
            log.register_casetype(CaseType::new("bad name", true, "", "Bad")),
            Err(ModlogError::InvalidCaseType(_))
        ));
        assert!(matches!(
            log.register_casetype(CaseType::new("softban", true, "", "  ")),
            Err(ModlogError::InvalidCaseType(_))
        ));
        assert!(log.register_casetype(CaseType::new("softban", false, "\u{1f504}", "Softban")).is_ok());

        let added = log
            .register_casetypes(vec![
                CaseType::new("softban", true, "", "Softban"),
                CaseType::new("voiceban", true, "", "Voice Ban"),
            ])
            .unwrap();
        assert_eq!(added, 1);
    }

    #[test]
    fn test_case_numbers_are_dense_per_guild() {
        let mut log = ModLog::default();
        assert_eq!(log.create_case(GUILD, new_case("ban"), now()).unwrap().case_number, 1);
        assert_eq!(log.create_case(GUILD, new_case("kick"), now()).unwrap().case_number, 2);
        assert_eq!(log.create_case(GuildId(11), new_case("kick"), now()).unwrap().case_number, 1);
        assert_eq!(log.get_latest_case(GUILD).unwrap().action_type, "kick");
        assert_eq!(log.get_all_cases(GUILD).len(), 2);

        log.reset_cases(GUILD);
        assert!(log.get_latest_case(GUILD).is_none());
        assert_eq!(log.create_case(GUILD, new_case("ban"), now()).unwrap().case_number, 1);
    }

    #[test]
    fn test_unknown_and_disabled_types() {
        let mut log = ModLog::default();
        assert_eq!(
            log.create_case(GUILD, new_case("yeet"), now()).err(),
            Some(ModlogError::CaseTypeNotRegistered("yeet".to_string()))
        );
        log.set_casetype_enabled(GUILD, "warning", false).unwrap();
        assert_eq!(
            log.create_case(GUILD, new_case("warning"), now()).err(),
            Some(ModlogError::CaseTypeNotEnabled("warning".to_string()))
        );
        // Other guilds keep the default
        assert!(log.create_case(GuildId(11), new_case("warning"), now()).is_ok());
        assert!(log.set_casetype_enabled(GUILD, "yeet", true).is_err());
    }

    #[test]
    fn test_edit_case_permissions() {
        let mut log = ModLog::default();
        log.create_case(GUILD, new_case("timeout"), now()).unwrap();

        let stranger = Editor { user: UserId(3), is_admin: false };
        assert_eq!(
            log.edit_case(GUILD, 1, stranger, CaseEdit::default(), now()).err(),
            Some(ModlogError::UnauthorizedCaseEdit { case_number: 1 })
        );

        let moderator = Editor { user: MODERATOR, is_admin: false };
        let edit = CaseEdit { reason: Some("spam".to_string()), until: None };
        let case = log.edit_case(GUILD, 1, moderator, edit, now()).unwrap();
        assert_eq!(case.reason.as_deref(), Some("spam"));
        assert_eq!(case.amended_by, None);

        let admin = Editor { user: UserId(4), is_admin: true };
        let edit = CaseEdit { reason: Some("raid".to_string()), until: None };
        let case = log.edit_case(GUILD, 1, admin, edit, now()).unwrap();
        assert_eq!(case.amended_by, Some(UserId(4)));
        assert!(case.modified_at.is_some());

        assert_eq!(
            log.edit_case(GUILD, 9, admin, CaseEdit::default(), now()).err(),
            Some(ModlogError::NoSuchCase(9))
        );
    }

    #[test]
    fn test_modlog_channel() {
        let mut log = ModLog::default();
        assert_eq!(log.get_modlog_channel(GUILD), Err(ModlogError::NoModLogChannel));
        log.set_modlog_channel(GUILD, Some(ChannelId(55)));
        assert_eq!(log.get_modlog_channel(GUILD), Ok(ChannelId(55)));
        log.set_modlog_channel(GUILD, None);
        assert_eq!(log.get_modlog_channel(GUILD), Err(ModlogError::NoModLogChannel));
    }

    #[test]
    fn test_cases_for_member_and_render() {
        let mut log = ModLog::default();
        log.create_case(GUILD, new_case("ban"), now()).unwrap();
        let mut other = new_case("kick");
        other.user = UserId(7);
        log.create_case(GUILD, other, now()).unwrap();

        let mine = log.get_cases_for_member(GUILD, TARGET);
        assert_eq!(mine.len(), 1);

        let text = mine[0].render(log.get_casetype("ban"));
        assert!(text.starts_with("**Case #1 | Ban"));
        assert!(text.contains("**Reason:** No reason given"));
        assert!(text.contains("**Moderator:** mod (1)"));
    }

    #[test]
    fn test_modlog_survives_json() {
        let mut log = ModLog::default();
        log.create_case(GUILD, new_case("ban"), now()).unwrap();
        log.set_case_message(GUILD, 1, MessageId(99)).unwrap();
        let text = crate::json::dumps(&log).unwrap();
        let back: ModLog = crate::json::loads(&text).unwrap();
        assert_eq!(back.get_case(GUILD, 1), log.get_case(GUILD, 1));
    }
}
