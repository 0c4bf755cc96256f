// dice.rs - Dice Commands
// ^mroll rolls several NdM+K terms at once, ^dicetable rolls a batch of
// same-sided dice with a modifier and prints them as a table.
//
// Used by: main.rs (command registration)

use crate::dice::{parse_terms, render_rolls, render_table, roll_table, TermRoll};
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::channel::Message,
};

#[command]
#[aliases("multiroll")]
/// Roll dice notation terms: `mroll 2d6+3 d20`
pub async fn mroll(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let terms = match parse_terms(args.rest()) {
        Ok(terms) => terms,
        Err(e) => {
            msg.reply(ctx, format!("❌ {}", e)).await?;
            return Ok(());
        }
    };
    let rolls: Vec<TermRoll> = {
        let mut rng = rand::thread_rng();
        terms.iter().map(|term| term.roll(&mut rng)).collect()
    };
    msg.reply(ctx, render_rolls(&rolls)).await?;
    Ok(())
}

#[command]
/// Roll a table of dice: `dicetable <sides> <count> <modifier>`
pub async fn dicetable(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let sides = args.single::<String>().ok().and_then(|raw| {
        raw.trim_start_matches(|c| c == 'd' || c == 'D').parse::<u32>().ok()
    });
    let count = args.single::<u32>().ok();
    let modifier = args.single::<i64>().unwrap_or(0);
    let (sides, count) = match (sides, count) {
        (Some(sides), Some(count)) => (sides, count),
        _ => {
            msg.reply(ctx, "❌ Usage: `dicetable <sides> <count> [modifier]` e.g. `dicetable d20 6 2`")
                .await?;
            return Ok(());
        }
    };

    let rows = {
        let mut rng = rand::thread_rng();
        roll_table(&mut rng, sides, count, modifier)
    };
    match rows {
        Ok(rows) => {
            msg.channel_id
                .say(&ctx.http, format!("```\n{}```", render_table(&rows, modifier)))
                .await?;
        }
        Err(e) => {
            msg.channel_id.say(&ctx.http, format!("```{}```", e)).await?;
        }
    }
    Ok(())
}

#[group]
#[commands(mroll, dicetable)]
pub struct Dice;
