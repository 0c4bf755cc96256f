// mutes.rs - Mute argument parsing and mute bookkeeping
// Parses "<duration> <reason>" tails for the timeout commands, plans when a
// timeout ends and decides whether a moderator may act on a target.
//
// Used by: commands/moderation.rs

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serenity::model::id::{ChannelId, UserId};
use std::collections::BTreeMap;
use std::time::Duration;

/// Discord refuses communication timeouts longer than 28 days
pub const MAX_TIMEOUT: Duration = Duration::from_secs(28 * 24 * 60 * 60);

const UNITS: [(&str, u64); 4] = [
    ("days", 24 * 60 * 60),
    ("hours", 60 * 60),
    ("minutes", 60),
    ("seconds", 1),
];

// Units in fixed order, each optional, then whatever is left is the reason.
static MUTE_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = [
        r"(?is)^\s*",
        r"(?:(?P<days>\d+)\s?(?:days?|d))?\s*",
        r"(?:(?P<hours>\d+)\s?(?:hours?|hrs?|h))?\s*",
        r"(?:(?P<minutes>\d+)\s?(?:minutes?|mins?|m))?\s*",
        r"(?:(?P<seconds>\d+)\s?(?:seconds?|secs?|s))?\s*",
        r"(?P<reason>.*)$",
    ]
    .concat();
    Regex::new(&pattern).expect("Invalid mute duration regex pattern")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MuteError {
    #[error("The time provided is too long; use a more reasonable time.")]
    DurationTooLong,
    #[error("Discord timeouts cannot be longer than 28 days.")]
    ExceedsTimeoutLimit,
    #[error("A timeout has to last at least one second.")]
    DurationTooShort,
    #[error("You cannot use that on yourself.")]
    CannotTargetSelf,
    #[error("You cannot act on someone with an equal or higher role than you.")]
    NotAllowedByHierarchy,
}

/// Result of parsing a mute command tail
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MuteArgs {
    pub reason: Option<String>,
    pub duration: Option<Duration>,
}

/// Outcome of one mute/unmute action, handed back to the command for its reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteResponse {
    pub success: bool,
    pub reason: Option<String>,
    pub user: UserId,
    pub channel: Option<ChannelId>,
}

impl MuteResponse {
    pub fn success(user: UserId, channel: Option<ChannelId>) -> Self {
        Self {
            success: true,
            reason: None,
            user,
            channel,
        }
    }

    pub fn failure(user: UserId, channel: Option<ChannelId>, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            user,
            channel,
        }
    }
}

/// Split free text into an optional duration and an optional reason.
///
/// Units are recognised only at the start and only in the order
/// days, hours, minutes, seconds. Unit letters at the start of a reason are
/// read as a duration: `"3 dogs"` parses as three days with reason `"ogs"`.
pub fn mute_converter(input: &str) -> Result<MuteArgs, MuteError> {
    let caps = match MUTE_RE.captures(input) {
        Some(caps) => caps,
        None => return Ok(MuteArgs::default()),
    };

    let mut units: BTreeMap<&'static str, u64> = BTreeMap::new();
    for (unit, _) in UNITS.iter() {
        if let Some(m) = caps.name(unit) {
            let value = m.as_str().parse::<u64>().map_err(|_| MuteError::DurationTooLong)?;
            units.insert(*unit, value);
        }
    }

    let duration = if units.is_empty() {
        None
    } else {
        let mut total: u64 = 0;
        for (unit, scale) in UNITS.iter() {
            if let Some(value) = units.get(unit) {
                total = value
                    .checked_mul(*scale)
                    .and_then(|secs| total.checked_add(secs))
                    .ok_or(MuteError::DurationTooLong)?;
            }
        }
        Some(Duration::from_secs(total))
    };

    let reason = caps
        .name("reason")
        .map(|m| m.as_str().trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    Ok(MuteArgs { reason, duration })
}

/// When a timeout starting `now` should end
pub fn timeout_until(
    now: DateTime<Utc>,
    duration: Option<Duration>,
    default: Duration,
) -> Result<DateTime<Utc>, MuteError> {
    let duration = duration.unwrap_or(default);
    if duration.is_zero() {
        return Err(MuteError::DurationTooShort);
    }
    if duration > MAX_TIMEOUT {
        return Err(MuteError::ExceedsTimeoutLimit);
    }
    let delta = chrono::Duration::from_std(duration).map_err(|_| MuteError::DurationTooLong)?;
    now.checked_add_signed(delta).ok_or(MuteError::DurationTooLong)
}

/// Configured default length, at least a minute and never past Discord's limit
pub fn default_timeout(minutes: i64) -> Duration {
    u64::try_from(minutes.max(1))
        .ok()
        .and_then(|m| m.checked_mul(60))
        .map(Duration::from_secs)
        .map_or(MAX_TIMEOUT, |d| d.min(MAX_TIMEOUT))
}

/// Where someone sits in a guild's role hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyRank {
    pub user: UserId,
    pub is_guild_owner: bool,
    pub top_role_position: i64,
}

/// A moderator may act on a target strictly below them, the guild owner on anyone
pub fn check_hierarchy(author: &HierarchyRank, target: &HierarchyRank) -> Result<(), MuteError> {
    if author.user == target.user {
        return Err(MuteError::CannotTargetSelf);
    }
    if target.is_guild_owner {
        return Err(MuteError::NotAllowedByHierarchy);
    }
    if author.is_guild_owner || author.top_role_position > target.top_role_position {
        Ok(())
    } else {
        Err(MuteError::NotAllowedByHierarchy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mins(n: u64) -> Duration {
        Duration::from_secs(n * 60)
    }

    #[test]
    fn test_reason_only() {
        let args = mute_converter("being rude in general").unwrap();
        assert_eq!(args.reason.as_deref(), Some("being rude in general"));
        assert_eq!(args.duration, None);
    }

    #[test]
    fn test_duration_only_is_summed() {
        let args = mute_converter("1d2h").unwrap();
        assert_eq!(args.reason, None);
        assert_eq!(args.duration, Some(Duration::from_secs(26 * 60 * 60)));
    }

    #[test]
    fn test_duration_and_reason() {
        let args = mute_converter("10m spamming").unwrap();
        assert_eq!(args.reason.as_deref(), Some("spamming"));
        assert_eq!(args.duration, Some(mins(10)));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(mute_converter("").unwrap(), MuteArgs::default());
        assert_eq!(mute_converter("   ").unwrap(), MuteArgs::default());
    }

    #[test]
    fn test_unit_spellings_and_case() {
        let args = mute_converter("2 Hours 30 MINS 15secs Caps lock").unwrap();
        assert_eq!(args.duration, Some(Duration::from_secs(2 * 3600 + 30 * 60 + 15)));
        assert_eq!(args.reason.as_deref(), Some("Caps lock"));

        let args = mute_converter("3 days").unwrap();
        assert_eq!(args.duration, Some(Duration::from_secs(3 * 86400)));
        assert_eq!(args.reason, None);
    }

    #[test]
    fn test_reason_spans_lines() {
        let args = mute_converter("5m first line\nsecond line").unwrap();
        assert_eq!(args.duration, Some(mins(5)));
        assert_eq!(args.reason.as_deref(), Some("first line\nsecond line"));
    }

    #[test]
    fn test_leading_unit_letter_is_read_as_duration() {
        let args = mute_converter("3 dogs").unwrap();
        assert_eq!(args.duration, Some(Duration::from_secs(3 * 86400)));
        assert_eq!(args.reason.as_deref(), Some("ogs"));
    }

    #[test]
    fn test_overflow_is_rejected() {
        assert_eq!(
            mute_converter("99999999999999999999999d"),
            Err(MuteError::DurationTooLong)
        );
        assert_eq!(
            mute_converter("18446744073709551615d"),
            Err(MuteError::DurationTooLong)
        );
    }

    #[test]
    fn test_timeout_until() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let until = timeout_until(now, Some(mins(90)), mins(60)).unwrap();
        assert_eq!(until, Utc.with_ymd_and_hms(2024, 1, 1, 1, 30, 0).unwrap());

        let until = timeout_until(now, None, mins(60)).unwrap();
        assert_eq!(until, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());

        assert_eq!(
            timeout_until(now, Some(Duration::from_secs(29 * 86400)), mins(60)),
            Err(MuteError::ExceedsTimeoutLimit)
        );
        assert!(timeout_until(now, Some(MAX_TIMEOUT), mins(60)).is_ok());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let parsed = mute_converter("0m oops").unwrap();
        assert_eq!(parsed.duration, Some(Duration::ZERO));
        assert_eq!(
            timeout_until(now, parsed.duration, mins(60)),
            Err(MuteError::DurationTooShort)
        );
    }

    #[test]
    fn test_default_timeout_is_clamped() {
        assert_eq!(default_timeout(60), mins(60));
        assert_eq!(default_timeout(0), mins(1));
        assert_eq!(default_timeout(-5), mins(1));
        assert_eq!(default_timeout(i64::MAX), MAX_TIMEOUT);
        assert_eq!(default_timeout(40 * 24 * 60), MAX_TIMEOUT);
    }

    #[test]
    fn test_hierarchy() {
        let rank = |id, owner, pos| HierarchyRank {
            user: UserId(id),
            is_guild_owner: owner,
            top_role_position: pos,
        };
        assert_eq!(check_hierarchy(&rank(1, false, 5), &rank(2, false, 3)), Ok(()));
        assert_eq!(
            check_hierarchy(&rank(1, false, 3), &rank(2, false, 3)),
            Err(MuteError::NotAllowedByHierarchy)
        );
        assert_eq!(check_hierarchy(&rank(1, true, 0), &rank(2, false, 9)), Ok(()));
        assert_eq!(
            check_hierarchy(&rank(1, false, 9), &rank(2, true, 0)),
            Err(MuteError::NotAllowedByHierarchy)
        );
        assert_eq!(
            check_hierarchy(&rank(1, true, 9), &rank(1, true, 9)),
            Err(MuteError::CannotTargetSelf)
        );
    }

    #[test]
    fn test_mute_response_constructors() {
        let ok = MuteResponse::success(UserId(1), Some(ChannelId(2)));
        assert!(ok.success);
        assert!(ok.reason.is_none());

        let failed = MuteResponse::failure(UserId(1), None, "Missing permissions");
        assert!(!failed.success);
        assert_eq!(failed.reason.as_deref(), Some("Missing permissions"));
    }
}
