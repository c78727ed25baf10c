//! Station types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::geo::Coordinates;
use super::ids::{StationId, UserId};

/// What kind of place a station is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationCategory {
    University,
    TrainStation,
    BusStation,
    Landmark,
    City,
}

impl StationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationCategory::University => "university",
            StationCategory::TrainStation => "train_station",
            StationCategory::BusStation => "bus_station",
            StationCategory::Landmark => "landmark",
            StationCategory::City => "city",
        }
    }
}

impl FromStr for StationCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "university" => Ok(StationCategory::University),
            "train_station" => Ok(StationCategory::TrainStation),
            "bus_station" => Ok(StationCategory::BusStation),
            "landmark" => Ok(StationCategory::Landmark),
            "city" => Ok(StationCategory::City),
            other => Err(DomainError::UnknownVariant {
                kind: "station category",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for StationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a station record.
///
/// Stations are never deleted because rides reference them by id. Only
/// `Active` stations are visible to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    #[default]
    Active,
    /// Temporarily hidden by an administrator.
    Inactive,
    /// Permanently out of service.
    Retired,
    /// Folded into another (canonical) station record.
    Merged,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationStatus::Active => "active",
            StationStatus::Inactive => "inactive",
            StationStatus::Retired => "retired",
            StationStatus::Merged => "merged",
        }
    }

    pub fn is_searchable(&self) -> bool {
        matches!(self, StationStatus::Active)
    }
}

impl FromStr for StationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StationStatus::Active),
            "inactive" => Ok(StationStatus::Inactive),
            "retired" => Ok(StationStatus::Retired),
            "merged" => Ok(StationStatus::Merged),
            other => Err(DomainError::UnknownVariant {
                kind: "station status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named pickup/drop-off point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub city: String,
    pub address: String,
    pub category: StationCategory,
    pub coordinates: Option<Coordinates>,
    /// Campus this station belongs to, if any.
    pub university: Option<StationId>,
    /// Curated short forms, lowercased (e.g. `emi`, `uca`).
    pub aliases: Vec<String>,
    /// How many times this station was picked from a suggestion list.
    pub search_count: i64,
    pub status: StationStatus,
}

impl Station {
    /// The de-duplication identity of this station.
    ///
    /// Two stations with the same key describe the same physical place.
    pub fn identity_key(&self) -> String {
        format!(
            "{}|{}|{}",
            fold_text(&self.name),
            fold_text(&self.city),
            fold_text(&self.address)
        )
    }
}

/// Lowercase, trim and collapse internal whitespace runs.
///
/// Lowercasing is Unicode-aware, so text folded here can be compared with
/// plain equality where SQLite's `NOCASE` would only fold ASCII.
///
/// # Examples
///
/// ```
/// use rideshare_server::domain::fold_text;
///
/// assert_eq!(fold_text("  École   Normale "), "école normale");
/// assert_eq!(fold_text("FÈS"), fold_text("Fès"));
/// ```
pub fn fold_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parse a comma-separated alias column into normalized aliases.
///
/// # Examples
///
/// ```
/// use rideshare_server::domain::parse_aliases;
///
/// assert_eq!(parse_aliases(Some("EMI, Mohammadia ,")), vec!["emi", "mohammadia"]);
/// assert!(parse_aliases(None).is_empty());
/// ```
pub fn parse_aliases(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Admin input for creating a station.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStation {
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub address: String,
    pub category: StationCategory,
    pub coordinates: Option<Coordinates>,
    pub university: Option<StationId>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl NewStation {
    /// Check the fields a station cannot exist without.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::MissingField("name"));
        }
        if self.city.trim().is_empty() {
            return Err(DomainError::MissingField("city"));
        }
        Ok(())
    }

    /// Aliases rendered back into the comma-separated column format.
    pub fn alias_column(&self) -> Option<String> {
        let aliases: Vec<String> = self
            .aliases
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
        if aliases.is_empty() {
            None
        } else {
            Some(aliases.join(","))
        }
    }
}

/// The identity of whoever issued a request.
///
/// Resolved by the authentication layer and passed explicitly into every
/// core call; `user` is `None` for anonymous searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RequesterContext {
    pub user: Option<UserId>,
}

impl RequesterContext {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn user(id: UserId) -> Self {
        Self { user: Some(id) }
    }
}
