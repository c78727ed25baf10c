//! Relevance scoring of station candidates against a free-text query.
//!
//! Substring search over names, cities and addresses returns many unrelated
//! partial matches (a three-letter code hits dozens of addresses), so every
//! candidate gets an additive score and the highest score wins.
//!
//! | signal                                         | points |
//! |------------------------------------------------|--------|
//! | token equals a registered alias                | +300   |
//! | token is a prefix/substring of an alias        | +80    |
//! | full query equals the name                     | +120   |
//! | name starts with token                         | +60    |
//! | short token (≤ 4) is a standalone name word    | +90    |
//! | short token (≤ 4) is only a name substring     | +25    |
//! | long token (> 4) appears in the name           | +30    |
//! | city equals token                              | +20    |
//! | station belongs to a university                | +5     |
//!
//! Finally `id / 1_000_000` is subtracted so that, among otherwise equal
//! candidates, older stations rank first.

use serde::Serialize;

use crate::domain::Station;

const EXACT_ALIAS: f64 = 300.0;
const PARTIAL_ALIAS: f64 = 80.0;
const EXACT_NAME: f64 = 120.0;
const NAME_PREFIX: f64 = 60.0;
const SHORT_TOKEN_WORD: f64 = 90.0;
const SHORT_TOKEN_SUBSTRING: f64 = 25.0;
const LONG_TOKEN_SUBSTRING: f64 = 30.0;
const CITY_EXACT: f64 = 20.0;
const UNIVERSITY_BOOST: f64 = 5.0;
const ID_TIE_BREAK_SCALE: f64 = 1_000_000.0;

/// Tokens up to this many characters are treated as acronyms.
const ACRONYM_MAX_CHARS: usize = 4;

/// A station together with its relevance for the current query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredStation {
    #[serde(flatten)]
    pub station: Station,
    pub score: f64,
}

/// The word of the query used for scoring: the first whitespace- or
/// comma-delimited word, lowercased.
pub fn scoring_token(query: &str) -> String {
    query
        .split(|c: char| c.is_whitespace() || c == ',')
        .find(|w| !w.is_empty())
        .unwrap_or("")
        .to_lowercase()
}

/// Score how likely `station` is what the user meant by `query`.
///
/// Pure and deterministic. The result is never negative.
///
/// # Examples
///
/// ```
/// use rideshare_server::domain::{Station, StationCategory, StationId, StationStatus};
/// use rideshare_server::stations::score;
///
/// let emi = Station {
///     id: StationId::new(1),
///     name: "EMI - École Mohammadia d'Ingénieurs".to_string(),
///     city: "Rabat".to_string(),
///     address: "Avenue Ibn Sina".to_string(),
///     category: StationCategory::University,
///     coordinates: None,
///     university: None,
///     aliases: vec!["emi".to_string()],
///     search_count: 0,
///     status: StationStatus::Active,
/// };
/// assert!(score(&emi, "EMI") > 300.0);
/// ```
pub fn score(station: &Station, query: &str) -> f64 {
    let token = scoring_token(query);
    let name = station.name.trim().to_lowercase();
    let mut points = 0.0;

    if !token.is_empty() {
        points += alias_points(&station.aliases, &token);

        if name.starts_with(&token) {
            points += NAME_PREFIX;
        }

        if token.chars().count() <= ACRONYM_MAX_CHARS {
            if name_words(&name).any(|word| word == token) {
                points += SHORT_TOKEN_WORD;
            } else if name.contains(&token) {
                points += SHORT_TOKEN_SUBSTRING;
            }
        } else if name.contains(&token) {
            points += LONG_TOKEN_SUBSTRING;
        }

        if station.city.trim().to_lowercase() == token {
            points += CITY_EXACT;
        }
    }

    let full_query = query.trim().to_lowercase();
    if !full_query.is_empty() && name == full_query {
        points += EXACT_NAME;
    }

    if station.university.is_some() {
        points += UNIVERSITY_BOOST;
    }

    let tie_break = station.id.get() as f64 / ID_TIE_BREAK_SCALE;
    (points - tie_break).max(0.0)
}

fn alias_points(aliases: &[String], token: &str) -> f64 {
    if aliases.iter().any(|alias| alias == token) {
        EXACT_ALIAS
    } else if aliases.iter().any(|alias| alias.contains(token)) {
        PARTIAL_ALIAS
    } else {
        0.0
    }
}

/// Words of a lowercased name, split on whitespace, hyphens and underscores.
fn name_words(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
}

/// Score every station and sort best-first.
///
/// Equal scores go to the lower id. Scores are clamped at zero, so this
/// is what orders candidates with no matching signal at all.
pub fn rank(stations: Vec<Station>, query: &str) -> Vec<ScoredStation> {
    let mut scored: Vec<ScoredStation> = stations
        .into_iter()
        .map(|station| {
            let score = score(&station, query);
            ScoredStation { station, score }
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.station.id.cmp(&b.station.id))
    });
    scored
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::{Station, StationCategory, StationId, StationStatus};

    pub fn station(id: i64, name: &str, city: &str, address: &str) -> Station {
        Station {
            id: StationId::new(id),
            name: name.to_string(),
            city: city.to_string(),
            address: address.to_string(),
            category: StationCategory::Landmark,
            coordinates: None,
            university: None,
            aliases: Vec::new(),
            search_count: 0,
            status: StationStatus::Active,
        }
    }

    pub fn with_aliases(mut station: Station, aliases: &[&str]) -> Station {
        station.aliases = aliases.iter().map(|a| a.to_string()).collect();
        station
    }
}


#[cfg(test)]
mod proptests {
    use super::fixtures::{station, with_aliases};
    use super::*;
    use proptest::prelude::*;

    fn word() -> impl Strategy<Value = String> {
        "[a-zA-Zé]{1,10}"
    }

    fn name() -> impl Strategy<Value = String> {
        prop::collection::vec(word(), 1..4).prop_map(|w| w.join(" "))
    }

    proptest! {
        #[test]
        fn score_is_never_negative(
            id in 0i64..10_000_000,
            name in name(),
            city in word(),
            aliases in prop::collection::vec("[a-z]{1,6}", 0..3),
            query in "[a-zA-Z ,]{0,20}",
        ) {
            let aliases: Vec<&str> = aliases.iter().map(String::as_str).collect();
            let st = with_aliases(station(id, &name, &city, ""), &aliases);
            prop_assert!(score(&st, &query) >= 0.0);
        }

        /// Registering the query token as an alias always beats having it
        /// merely inside the name.
        #[test]
        fn exact_alias_outscores_substring(
            id in 1i64..1_000_000,
            token in "[a-z]{2,8}",
            prefix in "[a-z]{1,5}",
            suffix in "[a-z]{0,5}",
        ) {
            let name = format!("{prefix}{token}{suffix}");
            let plain = station(id, &name, "Somewhere", "");
            let aliased = with_aliases(plain.clone(), &[token.as_str()]);
            prop_assert!(score(&aliased, &token) > score(&plain, &token));
        }

        #[test]
        fn rank_is_sorted_and_complete(
            names in prop::collection::vec(name(), 0..12),
            query in word(),
        ) {
            let stations: Vec<_> = names
                .iter()
                .enumerate()
                .map(|(i, n)| station(i as i64 + 1, n, "City", ""))
                .collect();
            let len = stations.len();
            let ranked = rank(stations, &query);
            prop_assert_eq!(ranked.len(), len);
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].station.id < pair[1].station.id);
                }
            }
        }
    }
}
