//! Link-safe tokens for team lists and phase names.
//!
//! Every slug in the crate goes through [`slugify`], which applies one
//! character table:
//!
//! | input                          | output            |
//! |--------------------------------|-------------------|
//! | `A`-`Z`                        | lowercased        |
//! | `à â ä á ã`                    | `a`               |
//! | `ç`                            | `c`               |
//! | `é è ê ë`                      | `e`               |
//! | `î ï í ì`                      | `i`               |
//! | `ô ö ó ò õ`                    | `o`               |
//! | `ù û ü ú`                      | `u`               |
//! | `ÿ` / `ñ`                      | `y` / `n`         |
//! | `œ` / `æ`                      | `oe` / `ae`       |
//! | run of whitespace              | one `_`           |
//! | anything else not `[a-z0-9_]`  | dropped           |
//!
//! Finally an `_` directly in front of a digit is removed, so
//! "Quart de finale 1" becomes `quart_de_finale1`.

use crate::models::MatchRecord;

/// Origin used for resale deep links
pub const LINK_BASE_URL: &str = "https://tickets.rugbyworldcup.com";

/// Team-slug tokens that mark a knockout placeholder ("winner of ...")
pub const PLACEHOLDER_TOKENS: &[&str] = &["vainqueur"];

fn fold(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' => "a",
        'ç' => "c",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'î' | 'ï' | 'í' | 'ì' => "i",
        'ô' | 'ö' | 'ó' | 'ò' | 'õ' => "o",
        'ù' | 'û' | 'ü' | 'ú' => "u",
        'ÿ' => "y",
        'ñ' => "n",
        'œ' => "oe",
        'æ' => "ae",
        _ => return None,
    };
    Some(folded)
}

/// Normalise free text into a `[a-z0-9_]` token
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_whitespace = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        if let Some(folded) = fold(c) {
            out.push_str(folded);
        } else if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut chars = out.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' && chars.peek().is_some_and(|next| next.is_ascii_digit()) {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

/// `["France", "All Blacks"]` -> `france_all_blacks`
pub fn team_slug(teams: &[String]) -> String {
    slugify(&teams.join("_"))
}

pub fn phase_slug(phase_name: &str) -> String {
    slugify(phase_name)
}

/// Whether the fixture is still a placeholder such as "Vainqueur Poule A"
pub fn is_placeholder(team_slug: &str) -> bool {
    let lowered = team_slug.to_lowercase();
    PLACEHOLDER_TOKENS.iter().any(|token| lowered.contains(token))
}

/// Resale page for a match. Placeholder fixtures link to their phase page.
pub fn resale_link(record: &MatchRecord) -> String {
    let teams = team_slug(&record.teams);
    let slug = if is_placeholder(&teams) {
        phase_slug(&record.phase_name)
    } else {
        teams
    };
    format!("{}/revente_{}", LINK_BASE_URL, slug)
}
