// league.rs - League of Legends link builders
// ^opgg <region> <summoner> and ^champion <name> just build links; no API key
// or scraping involved.
//
// Used by: main.rs (command registration)

use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::channel::Message,
};

/// Accepted region names and aliases, mapped to op.gg subdomains
const REGIONS: [(&[&str], &str); 11] = [
    (&["na"], "na"),
    (&["eune"], "eune"),
    (&["euw"], "euw"),
    (&["kr", "korea"], "www"),
    (&["jp", "japan"], "jp"),
    (&["br", "brazil"], "br"),
    (&["tr", "turkey"], "tr"),
    (&["oce", "oceania"], "oce"),
    (&["las"], "las"),
    (&["lan"], "lan"),
    (&["ru", "russia"], "ru"),
];

fn encode(text: &str) -> String {
    reqwest::Url::parse_with_params("https://x/", &[("v", text)])
        .ok()
        .and_then(|u| u.query().map(|q| q.trim_start_matches("v=").replace('+', "%20")))
        .unwrap_or_default()
}

pub fn opgg_url(region: &str, summoner: &str) -> Option<String> {
    let region = region.to_lowercase();
    let subdomain = REGIONS
        .iter()
        .find(|(names, _)| names.contains(&region.as_str()))
        .map(|(_, sub)| *sub)?;
    Some(format!("https://{}.op.gg/summoner/userName={}", subdomain, encode(summoner.trim())))
}

/// Wiki page and stats page for a champion
pub fn champion_links(champion: &str) -> (String, String) {
    let wiki = champion.trim().replace(' ', "_").replace('\'', "%27");
    let stats: String = champion
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect::<String>()
        .to_lowercase();
    (
        format!("<https://leagueoflegends.fandom.com/wiki/{}>", wiki),
        format!("<https://champion.gg/champion/{}>", stats),
    )
}

fn region_list() -> String {
    REGIONS.iter().map(|(names, _)| names[0]).collect::<Vec<_>>().join(", ")
}

#[command]
/// Link a summoner's op.gg page: `opgg <region> <summoner>`
pub async fn opgg(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let region = args.single::<String>().unwrap_or_default();
    let summoner = args.rest().trim();
    if region.is_empty() || summoner.is_empty() {
        msg.reply(ctx, format!("❌ Usage: `opgg <region> <summoner>`\nRegions: {}", region_list()))
            .await?;
        return Ok(());
    }
    match opgg_url(&region, summoner) {
        Some(url) => {
            msg.channel_id.say(&ctx.http, url).await?;
        }
        None => {
            msg.reply(ctx, format!("❌ Unknown region `{}`. Regions: {}", region, region_list()))
                .await?;
        }
    }
    Ok(())
}

#[command]
/// Wiki and stats links for a champion
pub async fn champion(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let name = args.rest().trim();
    if name.is_empty() {
        msg.reply(ctx, "❌ Usage: `champion <name>` (keep the ' in names like Kha'Zix)").await?;
        return Ok(());
    }
    let (wiki, stats) = champion_links(name);
    msg.channel_id.say(&ctx.http, format!("{}\n{}", wiki, stats)).await?;
    Ok(())
}

#[group]
#[commands(opgg, champion)]
pub struct League;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opgg_regions_and_aliases() {
        assert_eq!(
            opgg_url("NA", "Doublelift").as_deref(),
            Some("https://na.op.gg/summoner/userName=Doublelift")
        );
        assert_eq!(
            opgg_url("korea", "Hide on bush").as_deref(),
            Some("https://www.op.gg/summoner/userName=Hide%20on%20bush")
        );
        assert_eq!(opgg_url("mars", "x"), None);
    }

    #[test]
    fn test_champion_links() {
        let (wiki, stats) = champion_links("Kha'Zix");
        assert_eq!(wiki, "<https://leagueoflegends.fandom.com/wiki/Kha%27Zix>");
        assert_eq!(stats, "<https://champion.gg/champion/khazix>");

        let (wiki, _) = champion_links("Lee Sin");
        assert!(wiki.ends_with("Lee_Sin>"));
    }
}
