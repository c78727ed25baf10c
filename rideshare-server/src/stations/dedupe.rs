//! Collapsing near-duplicate station records.
//!
//! Station data is imported from several sources and accumulates rows that
//! describe the same place with different casing or spacing. Two stations
//! with the same [`Station::identity_key`] are one place, and only one of
//! them (the canonical representative) may appear in a result set.
//!
//! There is a single selection rule:
//! - with a query, every candidate is scored, the list is sorted by
//!   descending score (then ascending id) and the first occurrence of each
//!   key is kept, so the output preserves the global ranking order;
//! - without a query, each group is represented by its lowest id, placed
//!   where the group first appears.

use std::collections::{HashMap, HashSet};

use crate::domain::Station;

use super::score::{ScoredStation, rank};

/// Score, sort and keep the best-scoring station per identity key.
pub fn rank_and_dedupe(stations: Vec<Station>, query: &str) -> Vec<ScoredStation> {
    let mut seen = HashSet::new();
    rank(stations, query)
        .into_iter()
        .filter(|scored| seen.insert(scored.station.identity_key()))
        .collect()
}

/// Keep one station per identity key.
///
/// With a query the result is ordered by descending score; without one the
/// input order of groups is preserved and each group keeps its lowest id.
pub fn dedupe(stations: Vec<Station>, query: Option<&str>) -> Vec<Station> {
    match query {
        Some(query) => rank_and_dedupe(stations, query)
            .into_iter()
            .map(|scored| scored.station)
            .collect(),
        None => collapse_by_identity(stations, |station| station),
    }
}

/// Keep one item per station identity, choosing the lowest station id.
///
/// Groups stay at the position of their first member, so an input already
/// ordered by some criterion (distance, name) keeps that order.
pub fn collapse_by_identity<T, F>(items: Vec<T>, station_of: F) -> Vec<T>
where
    F: Fn(&T) -> &Station,
{
    // Group key → slot in the output
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut result: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        let key = station_of(&item).identity_key();
        match slots.get(&key) {
            Some(&slot) => {
                if station_of(&item).id < station_of(&result[slot]).id {
                    result[slot] = item;
                }
            }
            None => {
                slots.insert(key, result.len());
                result.push(item);
            }
        }
    }

    result
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::stations::score::{fixtures::station, score};
    use proptest::prelude::*;

    /// Few distinct names/cities/addresses plus case and spacing noise, so
    /// that duplicate groups are common.
    fn stations_strategy() -> impl Strategy<Value = Vec<Station>> {
        let base = (
            prop::sample::select(vec!["Gare Centrale", "EMI", "Campus Nord", "Marché"]),
            prop::sample::select(vec!["Rabat", "Fes"]),
            prop::sample::select(vec!["", "Avenue Hassan II"]),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(name, city, address, upper, padded)| {
                let name = if upper { name.to_uppercase() } else { name.to_string() };
                let address = if padded { format!(" {address}  ") } else { address.to_string() };
                (name, city.to_string(), address)
            });

        prop::collection::vec(base, 0..20).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (name, city, address))| station(i as i64 + 1, &name, &city, &address))
                .collect()
        })
    }

    fn query_strategy() -> impl Strategy<Value = Option<String>> {
        prop::option::of(prop::sample::select(vec!["emi", "gare", "campus", "rabat"]).prop_map(String::from))
    }

    proptest! {
        #[test]
        fn dedupe_is_idempotent(stations in stations_strategy(), query in query_strategy()) {
            let once = dedupe(stations, query.as_deref());
            let twice = dedupe(once.clone(), query.as_deref());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn dedupe_keeps_exactly_one_per_group(stations in stations_strategy(), query in query_strategy()) {
            let input_keys: HashSet<String> = stations.iter().map(Station::identity_key).collect();
            let len = stations.len();
            let result = dedupe(stations, query.as_deref());

            prop_assert!(result.len() <= len);
            let output_keys: Vec<String> = result.iter().map(Station::identity_key).collect();
            let unique: HashSet<String> = output_keys.iter().cloned().collect();
            prop_assert_eq!(unique.len(), output_keys.len());
            prop_assert_eq!(unique, input_keys);
        }

        #[test]
        fn ranked_dedupe_preserves_score_order(stations in stations_strategy(), query in "[a-z]{2,6}") {
            let result = rank_and_dedupe(stations, &query);
            for pair in result.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            for scored in &result {
                prop_assert_eq!(scored.score, score(&scored.station, &query));
            }
        }

        #[test]
        fn representative_is_best_of_group(stations in stations_strategy(), query in "[a-z]{2,6}") {
            let result = rank_and_dedupe(stations.clone(), &query);
            for kept in &result {
                let key = kept.station.identity_key();
                let best = stations
                    .iter()
                    .filter(|s| s.identity_key() == key)
                    .map(|s| score(s, &query))
                    .fold(f64::MIN, f64::max);
                prop_assert_eq!(kept.score, best);
            }
        }
    }
}
