// dice.rs - Dice notation parsing and rolling
// Handles NdM+K expressions for ^mroll and the fixed-format table for
// ^dicetable. Rolling takes the RNG as a parameter so callers decide where
// it lives (never across an await).
//
// Used by: commands/dice.rs

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::fmt::Write as _;

pub const MAX_DICE_PER_TERM: u32 = 20;
pub const MAX_TERMS: usize = 10;
/// dicetable refuses this many dice or more
pub const TABLE_DICE_LIMIT: u32 = 20;
pub const MAX_SIDES: u32 = 1000;
pub const MAX_MODIFIER: i64 = 1_000_000;

static DICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<count>\d*)d(?P<sides>\d+)(?:(?P<sign>[+-])(?P<modifier>\d+))?$")
        .expect("Invalid dice notation regex pattern")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("`{0}` is not dice notation. Try something like `2d6+3`.")]
    InvalidNotation(String),
    #[error("Give me at least one die to roll.")]
    NoDice,
    #[error("You can roll at most {} dice per term.", MAX_DICE_PER_TERM)]
    TooManyDice,
    #[error("You can roll at most {} terms at once.", MAX_TERMS)]
    TooManyTerms,
    #[error("Dice need between 2 and {} sides.", MAX_SIDES)]
    InvalidSides,
    #[error("Can only roll {} dice at a time.", TABLE_DICE_LIMIT - 1)]
    TableTooLarge,
    #[error("Modifiers must stay between -{} and +{}.", MAX_MODIFIER, MAX_MODIFIER)]
    ModifierTooLarge,
}

fn check_modifier(modifier: i64) -> Result<i64, DiceError> {
    if (-MAX_MODIFIER..=MAX_MODIFIER).contains(&modifier) {
        Ok(modifier)
    } else {
        Err(DiceError::ModifierTooLarge)
    }
}

/// One `NdM±K` term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

impl DiceTerm {
    pub fn parse(raw: &str) -> Result<Self, DiceError> {
        let raw = raw.trim();
        let caps = DICE_RE
            .captures(raw)
            .ok_or_else(|| DiceError::InvalidNotation(raw.to_string()))?;

        let count = match caps.name("count").map(|m| m.as_str()) {
            None | Some("") => 1,
            Some(n) => n.parse::<u32>().map_err(|_| DiceError::TooManyDice)?,
        };
        let sides = caps["sides"].parse::<u32>().map_err(|_| DiceError::InvalidSides)?;
        let modifier = match caps.name("modifier") {
            Some(m) => {
                let value = m.as_str().parse::<i64>().map_err(|_| DiceError::ModifierTooLarge)?;
                let value = if &caps["sign"] == "-" { -value } else { value };
                check_modifier(value)?
            }
            None => 0,
        };

        if count == 0 {
            return Err(DiceError::NoDice);
        }
        if count > MAX_DICE_PER_TERM {
            return Err(DiceError::TooManyDice);
        }
        if !(2..=MAX_SIDES).contains(&sides) {
            return Err(DiceError::InvalidSides);
        }
        Ok(Self { count, sides, modifier })
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> TermRoll {
        let rolls: Vec<u32> = (0..self.count).map(|_| rng.gen_range(1..=self.sides)).collect();
        let total = rolls.iter().map(|r| i64::from(*r)).sum::<i64>() + self.modifier;
        TermRoll { term: *self, rolls, total }
    }
}

impl std::fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRoll {
    pub term: DiceTerm,
    pub rolls: Vec<u32>,
    pub total: i64,
}

/// Parse every whitespace separated term, rejecting the whole request on the first bad one
pub fn parse_terms(input: &str) -> Result<Vec<DiceTerm>, DiceError> {
    let terms: Vec<&str> = input.split_whitespace().collect();
    if terms.is_empty() {
        return Err(DiceError::NoDice);
    }
    if terms.len() > MAX_TERMS {
        return Err(DiceError::TooManyTerms);
    }
    terms.into_iter().map(DiceTerm::parse).collect()
}

/// Lines for an ^mroll reply plus the grand total
pub fn render_rolls(rolls: &[TermRoll]) -> String {
    let mut out = String::new();
    for roll in rolls {
        let faces: Vec<String> = roll.rolls.iter().map(|r| r.to_string()).collect();
        let _ = writeln!(out, "**{}**: [{}] = **{}**", roll.term, faces.join(", "), roll.total);
    }
    if rolls.len() > 1 {
        let grand: i64 = rolls.iter().map(|r| r.total).sum();
        let _ = write!(out, "Total: **{}**", grand);
    }
    out.trim_end().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub index: u32,
    pub result: u32,
    pub total: i64,
}

pub fn roll_table<R: Rng + ?Sized>(
    rng: &mut R,
    sides: u32,
    count: u32,
    modifier: i64,
) -> Result<Vec<TableRow>, DiceError> {
    if count >= TABLE_DICE_LIMIT {
        return Err(DiceError::TableTooLarge);
    }
    check_modifier(modifier)?;
    if count == 0 {
        return Err(DiceError::NoDice);
    }
    if !(2..=MAX_SIDES).contains(&sides) {
        return Err(DiceError::InvalidSides);
    }
    Ok((1..=count)
        .map(|index| {
            let result = rng.gen_range(1..=sides);
            TableRow {
                index,
                result,
                total: i64::from(result) + modifier,
            }
        })
        .collect())
}

/// Fixed-width table, wrapped in a code block by the caller
pub fn render_table(rows: &[TableRow], modifier: i64) -> String {
    let modifier = format!("{:+}", modifier);
    let mut out = format!("{:<8} {:>7} {:>8} {:>6}\n", "Roll #", "Results", "Modifier", "Totals");
    out.push_str(&format!("{:-<8} {:->7} {:->8} {:->6}\n", "", "", "", ""));
    for row in rows {
        let _ = writeln!(
            out,
            "{:<8} {:>7} {:>8} {:>6}",
            format!("Roll {}", row.index),
            row.result,
            modifier,
            row.total
        );
    }
    out
}
