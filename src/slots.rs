// slots.rs - Slot machine
// Three reels over a fixed ring of ten symbols. Each reel shows three
// consecutive symbols; only the middle row pays.
//
// Used by: bank.rs (slot settings), commands/economy.rs (^slot, ^payouts)

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reel {
    Cherries,
    Cookie,
    Two,
    FourLeafClover,
    Cyclone,
    Sunflower,
    Six,
    Mushroom,
    Heart,
    Snowflake,
}

pub const RING: [Reel; 10] = [
    Reel::Cherries,
    Reel::Cookie,
    Reel::Two,
    Reel::FourLeafClover,
    Reel::Cyclone,
    Reel::Sunflower,
    Reel::Six,
    Reel::Mushroom,
    Reel::Heart,
    Reel::Snowflake,
];

impl Reel {
    pub fn emoji(self) -> &'static str {
        match self {
            Reel::Cherries => "🍒",
            Reel::Cookie => "🍪",
            Reel::Two => "2\u{20e3}",
            Reel::FourLeafClover => "🍀",
            Reel::Cyclone => "🌀",
            Reel::Sunflower => "🌻",
            Reel::Six => "6\u{20e3}",
            Reel::Mushroom => "🍄",
            Reel::Heart => "\u{2764}",
            Reel::Snowflake => "\u{2744}",
        }
    }
}

/// Per-bank slot limits, kept with the other bank settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSettings {
    pub min_bid: i64,
    pub max_bid: i64,
    pub cooldown_secs: i64,
}

impl Default for SlotSettings {
    fn default() -> Self {
        Self {
            min_bid: 5,
            max_bid: 100,
            cooldown_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payout {
    Jackpot,
    FourLeafClovers,
    ThreeCherries,
    TwoSix,
    TwoCherries,
    ThreeSymbols,
    TwoSymbols,
}

impl Payout {
    /// Credits handed back for a winning bid, the bid included
    pub fn amount(self, bid: i64) -> i64 {
        match self {
            Payout::Jackpot => bid.saturating_mul(2500).saturating_add(bid),
            Payout::FourLeafClovers => bid.saturating_add(1000),
            Payout::ThreeCherries => bid.saturating_add(800),
            Payout::TwoSix => bid.saturating_mul(4).saturating_add(bid),
            Payout::TwoCherries => bid.saturating_mul(3).saturating_add(bid),
            Payout::ThreeSymbols => bid.saturating_add(500),
            Payout::TwoSymbols => bid.saturating_mul(2).saturating_add(bid),
        }
    }

    pub fn phrase(self) -> &'static str {
        match self {
            Payout::Jackpot => "JACKPOT! 226! Your bid has been multiplied * 2500!",
            Payout::FourLeafClovers => "4LC! +1000!",
            Payout::ThreeCherries => "Three cherries! +800!",
            Payout::TwoSix => "2 6! Your bid has been multiplied * 4!",
            Payout::TwoCherries => "Two cherries! Your bid has been multiplied * 3!",
            Payout::ThreeSymbols => "Three symbols! +500!",
            Payout::TwoSymbols => "Two consecutive symbols! Your bid has been multiplied * 2!",
        }
    }
}

pub fn payouts_text() -> String {
    let (two, six, flc, cherries) = (
        Reel::Two.emoji(),
        Reel::Six.emoji(),
        Reel::FourLeafClover.emoji(),
        Reel::Cherries.emoji(),
    );
    format!(
        "Slot machine payouts:\n\
        {two} {two} {six} Bet * 2500\n\
        {flc} {flc} {flc} +1000\n\
        {ch} {ch} {ch} +800\n\
        {two} {six} Bet * 4\n\
        {ch} {ch} Bet * 3\n\n\
        Three symbols: +500\n\
        Two symbols: Bet * 2",
        two = two,
        six = six,
        flc = flc,
        ch = cherries
    )
}

/// Rows top to bottom; `rows[1]` is the pay line
pub type Machine = [[Reel; 3]; 3];

pub fn spin<R: Rng + ?Sized>(rng: &mut R) -> Machine {
    let offsets: [usize; 3] = [
        rng.gen_range(0..RING.len()),
        rng.gen_range(0..RING.len()),
        rng.gen_range(0..RING.len()),
    ];
    let mut rows = [[Reel::Cherries; 3]; 3];
    for (column, offset) in offsets.iter().enumerate() {
        for (row, line) in rows.iter_mut().enumerate() {
            line[column] = RING[(offset + row) % RING.len()];
        }
    }
    rows
}

fn pair(a: Reel, b: Reel) -> Option<Payout> {
    match (a, b) {
        (Reel::Two, Reel::Six) => Some(Payout::TwoSix),
        (Reel::Cherries, Reel::Cherries) => Some(Payout::TwoCherries),
        _ => None,
    }
}

/// What the pay line wins, if anything. Named combinations beat generic matches.
pub fn evaluate(line: [Reel; 3]) -> Option<Payout> {
    let [a, b, c] = line;
    match line {
        [Reel::Two, Reel::Two, Reel::Six] => return Some(Payout::Jackpot),
        [Reel::FourLeafClover, Reel::FourLeafClover, Reel::FourLeafClover] => {
            return Some(Payout::FourLeafClovers)
        }
        [Reel::Cherries, Reel::Cherries, Reel::Cherries] => return Some(Payout::ThreeCherries),
        _ => {}
    }
    if let Some(payout) = pair(a, b).or_else(|| pair(b, c)) {
        return Some(payout);
    }
    if a == b && b == c {
        Some(Payout::ThreeSymbols)
    } else if a == b || b == c {
        Some(Payout::TwoSymbols)
    } else {
        None
    }
}

pub fn render_machine(rows: &Machine) -> String {
    let mut out = String::from("~~\n~~");
    for (i, row) in rows.iter().enumerate() {
        let sign = if i == 1 { ">" } else { "  " };
        out.push_str(&format!("{}{} {} {}\n", sign, row[0].emoji(), row[1].emoji(), row[2].emoji()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use Reel::*;

    #[test]
    fn test_named_combinations() {
        assert_eq!(evaluate([Two, Two, Six]), Some(Payout::Jackpot));
        assert_eq!(evaluate([FourLeafClover; 3]), Some(Payout::FourLeafClovers));
        assert_eq!(evaluate([Cherries; 3]), Some(Payout::ThreeCherries));
        assert_eq!(evaluate([Two, Six, Heart]), Some(Payout::TwoSix));
        assert_eq!(evaluate([Heart, Two, Six]), Some(Payout::TwoSix));
        assert_eq!(evaluate([Cherries, Cherries, Cookie]), Some(Payout::TwoCherries));
    }

    #[test]
    fn test_generic_matches() {
        assert_eq!(evaluate([Heart; 3]), Some(Payout::ThreeSymbols));
        assert_eq!(evaluate([Cookie, Heart, Heart]), Some(Payout::TwoSymbols));
        assert_eq!(evaluate([Heart, Cookie, Heart]), None);
        assert_eq!(evaluate([Cookie, Heart, Six]), None);
    }

    #[test]
    fn test_payout_amounts_include_bid() {
        assert_eq!(Payout::Jackpot.amount(10), 25_010);
        assert_eq!(Payout::FourLeafClovers.amount(10), 1_010);
        assert_eq!(Payout::TwoSymbols.amount(10), 30);
        assert_eq!(Payout::Jackpot.amount(i64::MAX), i64::MAX);
    }

    #[test]
    fn test_spin_shows_consecutive_ring_symbols() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let rows = spin(&mut rng);
            for column in 0..3 {
                let top = RING.iter().position(|r| *r == rows[0][column]).unwrap();
                assert_eq!(rows[1][column], RING[(top + 1) % RING.len()]);
                assert_eq!(rows[2][column], RING[(top + 2) % RING.len()]);
            }
        }
    }

    #[test]
    fn test_render_marks_pay_line() {
        let rows = [[Cookie; 3], [Two, Two, Six], [Heart; 3]];
        let text = render_machine(&rows);
        assert!(text.starts_with("~~\n~~  "));
        assert!(text.contains(">2\u{20e3} 2\u{20e3} 6\u{20e3}\n"));
        assert!(payouts_text().contains("Bet * 2500"));
    }
}
