use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{BotError, Result};
use crate::models::{Availability, MatchRecord};

const MATCH_LABEL: &str = ".match-label";
const TEAM: &str = ".team";
const ACTION: &str = ".actions-wrapper .noloader";
const PHASE: &str = ".d-lg-none.match-info-mobile .competition-additional";

/// Class carried by the action button when resale offers are listed
const SHOW_OFFERS_CLASS: &str = "js-show-offers";

/// Turns the rendered resale page into match records.
///
/// Each match label is joined to the action and phase elements found in
/// its nearest enclosing container that holds exactly one match label,
/// so a missing or extra element in one match cannot shift the others.
pub struct Extractor {
    match_label: Selector,
    team: Selector,
    action: Selector,
    phase: Selector,
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| BotError::Extraction {
        message: format!("invalid selector '{}': {}", css, e),
    })
}

impl Extractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            match_label: parse_selector(MATCH_LABEL)?,
            team: parse_selector(TEAM)?,
            action: parse_selector(ACTION)?,
            phase: parse_selector(PHASE)?,
        })
    }

    pub fn extract(&self, html: &str) -> Result<Vec<MatchRecord>> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();

        for (index, label) in document.select(&self.match_label).enumerate() {
            let container = self.container_of(label).ok_or_else(|| BotError::Extraction {
                message: format!(
                    "match label #{} has no container with an action and a phase element",
                    index
                ),
            })?;

            let teams: Vec<String> = label
                .select(&self.team)
                .map(|team| team.text().collect::<String>().trim().to_string())
                .collect();
            if teams.is_empty() {
                return Err(BotError::Extraction {
                    message: format!("match label #{} lists no teams", index),
                });
            }

            let shows_offers = container
                .select(&self.action)
                .next()
                .is_some_and(|action| action.value().classes().any(|c| c == SHOW_OFFERS_CLASS));
            let availability = if shows_offers {
                Availability::Available
            } else {
                Availability::Unavailable
            };

            let phase_name = container
                .select(&self.phase)
                .next()
                .map(|phase| phase.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            records.push(MatchRecord::new(teams, availability, phase_name));
        }

        if records.is_empty() {
            return Err(BotError::Extraction {
                message: "no match labels found on page".to_string(),
            });
        }

        debug!("Extracted {} match records", records.len());
        Ok(records)
    }

    /// Nearest ancestor that owns this label and its sibling fields
    fn container_of<'a>(&self, label: ElementRef<'a>) -> Option<ElementRef<'a>> {
        label
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|candidate| candidate.select(&self.match_label).count() == 1)
            .find(|candidate| {
                candidate.select(&self.action).next().is_some()
                    && candidate.select(&self.phase).next().is_some()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_block(teams: &[&str], offers: bool, phase: &str) -> String {
        let team_spans: String = teams
            .iter()
            .map(|t| format!("<span class=\"team\">\n  {}  </span>", t))
            .collect();
        let action_class = if offers {
            "btn noloader js-show-offers"
        } else {
            "btn noloader disabled"
        };
        format!(
            r#"<div class="match-row">
                 <div class="d-lg-none match-info-mobile"><span class="competition-additional"> {phase} </span></div>
                 <div class="match-label">{team_spans}</div>
                 <div class="actions-wrapper"><a class="{action_class}">Voir</a></div>
               </div>"#
        )
    }

    fn page(blocks: &[String]) -> String {
        format!(
            "<html><body><section class=\"matches\">{}</section></body></html>",
            blocks.concat()
        )
    }

    #[test]
    fn test_extracts_records_in_document_order() {
        let html = page(&[
            match_block(&["France", "All Blacks"], false, "Poule A"),
            match_block(&["Irlande", "Écosse"], true, "Poule B"),
        ]);

        let records = Extractor::new().unwrap().extract(&html).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].teams, vec!["France", "All Blacks"]);
        assert_eq!(records[0].availability, Availability::Unavailable);
        assert_eq!(records[0].phase_name, "Poule A");
        assert_eq!(records[1].teams, vec!["Irlande", "Écosse"]);
        assert_eq!(records[1].availability, Availability::Available);
    }

    #[test]
    fn test_missing_action_fails_instead_of_misaligning() {
        let broken = r#"<div class="match-row">
              <div class="d-lg-none match-info-mobile"><span class="competition-additional">Poule C</span></div>
              <div class="match-label"><span class="team">Galles</span><span class="team">Fidji</span></div>
            </div>"#
            .to_string();
        let html = page(&[
            match_block(&["France", "All Blacks"], false, "Poule A"),
            broken,
            match_block(&["Irlande", "Écosse"], true, "Poule B"),
        ]);

        let err = Extractor::new().unwrap().extract(&html).unwrap_err();
        assert!(matches!(err, BotError::Extraction { .. }));
    }

    #[test]
    fn test_empty_page_is_extraction_failure() {
        let err = Extractor::new()
            .unwrap()
            .extract("<html><body><p>Maintenance</p></body></html>")
            .unwrap_err();
        assert!(matches!(err, BotError::Extraction { .. }));
    }

    #[test]
    fn test_missing_phase_element_in_container_fails() {
        let html = page(&[r#"<div class="match-row">
              <div class="match-label"><span class="team">A</span><span class="team">B</span></div>
              <div class="actions-wrapper"><a class="noloader js-show-offers">Voir</a></div>
            </div>"#
            .to_string()]);

        assert!(Extractor::new().unwrap().extract(&html).is_err());
    }
}
