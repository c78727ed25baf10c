//! Station queries and administration.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use crate::domain::{
    Coordinates, NewStation, RequesterContext, Station, StationId, StationStatus, UserId,
    fold_text, parse_aliases,
};
use crate::stations::{NearbyStation, SearchText, StationRepository};

use super::error::StoreError;
use super::{Store, contains_pattern};

const STATION_COLUMNS: &str = "s.id, s.name, s.city, s.address, s.category, s.latitude, \
     s.longitude, s.university_id, s.aliases, s.search_count, s.status";

/// Columns matched by text search, all folded with [`fold_text`] on write.
/// Aliases are stored lowercased and may be NULL.
const TEXT_COLUMNS: [&str; 4] = [
    "s.name_key",
    "s.city_key",
    "s.address_key",
    "COALESCE(s.aliases, '')",
];

#[derive(sqlx::FromRow)]
struct StationRow {
    id: i64,
    name: String,
    city: String,
    address: String,
    category: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    university_id: Option<i64>,
    aliases: Option<String>,
    search_count: i64,
    status: String,
}

impl TryFrom<StationRow> for Station {
    type Error = StoreError;

    fn try_from(row: StationRow) -> Result<Self, Self::Error> {
        let corrupt = || StoreError::corrupt("stations");
        // Half-filled or out-of-range coordinates are treated as unknown
        let coordinates = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Coordinates::new(lat, lng).ok(),
            _ => None,
        };

        Ok(Station {
            id: StationId::new(row.id),
            name: row.name,
            city: row.city,
            address: row.address,
            category: row.category.parse().map_err(corrupt())?,
            coordinates,
            university: row.university_id.map(StationId::new),
            aliases: parse_aliases(row.aliases.as_deref()),
            search_count: row.search_count,
            status: row.status.parse().map_err(corrupt())?,
        })
    }
}

fn into_stations(rows: Vec<StationRow>) -> Result<Vec<Station>, StoreError> {
    rows.into_iter().map(Station::try_from).collect()
}

impl Store {
    /// Insert a new, active station.
    pub async fn create_station(&self, station: &NewStation) -> Result<Station, StoreError> {
        station.validate().map_err(StoreError::Invalid)?;

        let row: StationRow = sqlx::query_as(
            "INSERT INTO stations
                 (name, city, address, category, latitude, longitude, university_id, aliases,
                  name_key, city_key, address_key, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?)
             RETURNING id, name, city, address, category, latitude, longitude, university_id,
                       aliases, search_count, status",
        )
        .bind(station.name.trim())
        .bind(station.city.trim())
        .bind(station.address.trim())
        .bind(station.category.as_str())
        .bind(station.coordinates.map(|c| c.lat()))
        .bind(station.coordinates.map(|c| c.lng()))
        .bind(station.university.map(|u| u.get()))
        .bind(station.alias_column())
        .bind(fold_text(&station.name))
        .bind(fold_text(&station.city))
        .bind(fold_text(&station.address))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let station = Station::try_from(row)?;
        info!(station = %station.id, name = %station.name, city = %station.city, "Station created");
        Ok(station)
    }

    /// Change a station's status. Returns the updated station, if it exists.
    pub async fn set_station_status(
        &self,
        id: StationId,
        status: StationStatus,
    ) -> Result<Option<Station>, StoreError> {
        let updated = sqlx::query("UPDATE stations SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        info!(station = %id, status = %status, "Station status changed");
        self.get(id).await
    }

    /// Fill the folded search keys of rows that predate them.
    ///
    /// Returns the number of rows updated.
    pub(super) async fn backfill_search_keys(&self) -> Result<u64, StoreError> {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, name, city, address FROM stations WHERE name_key = ''",
        )
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for (id, name, city, address) in &rows {
            sqlx::query(
                "UPDATE stations SET name_key = ?, city_key = ?, address_key = ? WHERE id = ?",
            )
            .bind(fold_text(name))
            .bind(fold_text(city))
            .bind(fold_text(address))
            .bind(*id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(stations = rows.len(), "Backfilled station search keys");
        Ok(rows.len() as u64)
    }

    /// Mark a station as one of the user's favourites.
    ///
    /// Favourites are returned first by text search for that user.
    pub async fn add_favorite(&self, user: UserId, station: StationId) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR IGNORE INTO favorite_stations (user_id, station_id, created_at)
             VALUES (?, ?, ?)",
        )
        .bind(user.get())
        .bind(station.get())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl StationRepository for Store {
    async fn find_by_text(
        &self,
        query: &SearchText,
        limit: usize,
        requester: RequesterContext,
    ) -> Result<Vec<Station>, StoreError> {
        let mut needles = vec![query.normalized()];
        for token in query.tokens() {
            if !needles.contains(&token) {
                needles.push(token);
            }
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {STATION_COLUMNS} FROM stations s \
             LEFT JOIN favorite_stations f ON f.station_id = s.id AND f.user_id = "
        ));
        qb.push_bind(requester.user.map(|u| u.get()));
        qb.push(" WHERE s.status = 'active' AND (");

        let mut first = true;
        for needle in &needles {
            let pattern = contains_pattern(needle);
            for column in TEXT_COLUMNS {
                if !first {
                    qb.push(" OR ");
                }
                first = false;
                qb.push(format_args!("{column} LIKE "));
                qb.push_bind(pattern.clone());
                qb.push(" ESCAPE '\\'");
            }
        }

        // Favourites first, then the most picked stations
        qb.push(") ORDER BY f.station_id IS NULL, s.search_count DESC, s.id LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows: Vec<StationRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        debug!(query = %query, needles = needles.len(), rows = rows.len(), "Station text lookup");
        into_stations(rows)
    }

    async fn find_nearby(
        &self,
        center: Coordinates,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStation>, StoreError> {
        // Pad the box slightly so rounding never excludes an edge station
        let (d_lat, d_lng) = center.bounding_deltas(radius_km * 1.01);
        let rows: Vec<StationRow> = sqlx::query_as(&format!(
            "SELECT {STATION_COLUMNS} FROM stations s
             WHERE s.status = 'active'
               AND s.latitude BETWEEN ? AND ?
               AND s.longitude BETWEEN ? AND ?"
        ))
        .bind(center.lat() - d_lat)
        .bind(center.lat() + d_lat)
        .bind(center.lng() - d_lng)
        .bind(center.lng() + d_lng)
        .fetch_all(&self.pool)
        .await?;

        let mut nearby = Vec::with_capacity(rows.len());
        for station in into_stations(rows)? {
            let Some(coordinates) = station.coordinates else {
                continue;
            };
            let distance_km = center.distance_km(&coordinates);
            if distance_km <= radius_km {
                nearby.push(NearbyStation {
                    station,
                    distance_km,
                });
            }
        }

        nearby.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then(a.station.id.cmp(&b.station.id))
        });
        nearby.truncate(limit);
        Ok(nearby)
    }

    async fn find_by_city(&self, city: &str) -> Result<Vec<Station>, StoreError> {
        let rows: Vec<StationRow> = sqlx::query_as(&format!(
            "SELECT {STATION_COLUMNS} FROM stations s
             WHERE s.status = 'active' AND s.city_key = ?
             ORDER BY s.search_count DESC, s.id"
        ))
        .bind(fold_text(city))
        .fetch_all(&self.pool)
        .await?;
        into_stations(rows)
    }

    async fn find_by_university(&self, university: StationId) -> Result<Vec<Station>, StoreError> {
        let rows: Vec<StationRow> = sqlx::query_as(&format!(
            "SELECT {STATION_COLUMNS} FROM stations s
             WHERE s.status = 'active' AND s.university_id = ?
             ORDER BY s.name, s.id"
        ))
        .bind(university.get())
        .fetch_all(&self.pool)
        .await?;
        into_stations(rows)
    }

    async fn get(&self, id: StationId) -> Result<Option<Station>, StoreError> {
        let row: Option<StationRow> = sqlx::query_as(&format!(
            "SELECT {STATION_COLUMNS} FROM stations s WHERE s.id = ?"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Station::try_from).transpose()
    }

    async fn record_hit(&self, id: StationId) -> Result<(), StoreError> {
        sqlx::query("UPDATE stations SET search_count = search_count + 1 WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StationCategory;
    use crate::store::testing::new_station;

    fn text(s: &str) -> SearchText {
        SearchText::parse(s).unwrap()
    }

    fn ids(stations: &[Station]) -> Vec<i64> {
        stations.iter().map(|s| s.id.get()).collect()
    }

    async fn gazetteer() -> Store {
        let store = Store::in_memory().await.unwrap();

        let mut emi = new_station("EMI - École Mohammadia d'Ingénieurs", "Rabat", "Avenue Ibn Sina");
        emi.category = StationCategory::University;
        emi.aliases = vec!["EMI".into(), " Mohammadia ".into()];
        emi.coordinates = Coordinates::new(34.0006, -6.8497).ok();
        store.create_station(&emi).await.unwrap();

        let mut agdal = new_station("Gare Rabat Agdal", "Rabat", "Avenue Haj Ahmed Cherkaoui");
        agdal.coordinates = Coordinates::new(33.9994, -6.8536).ok();
        store.create_station(&agdal).await.unwrap();

        let mut casa = new_station("Gare Casa Voyageurs", "Casablanca", "Boulevard Ba Hmad");
        casa.coordinates = Coordinates::new(33.5898, -7.5913).ok();
        store.create_station(&casa).await.unwrap();

        let mut residence = new_station("Résidence Universitaire", "Rabat", "Agdal");
        residence.university = Some(StationId::new(1));
        store.create_station(&residence).await.unwrap();

        store
    }

    #[tokio::test]
    async fn create_station_normalizes_input() {
        let store = gazetteer().await;
        let emi = store.get(StationId::new(1)).await.unwrap().unwrap();

        assert_eq!(emi.aliases, vec!["emi", "mohammadia"]);
        assert_eq!(emi.category, StationCategory::University);
        assert_eq!(emi.status, StationStatus::Active);
        assert_eq!(emi.search_count, 0);
        assert!(emi.coordinates.is_some());
    }

    #[tokio::test]
    async fn create_station_rejects_missing_name() {
        let store = Store::in_memory().await.unwrap();
        let err = store
            .create_station(&new_station("  ", "Rabat", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn text_matches_alias_and_tokens() {
        let store = gazetteer().await;

        let by_alias = store
            .find_by_text(&text("mohammadia"), 10, RequesterContext::anonymous())
            .await
            .unwrap();
        assert_eq!(ids(&by_alias), vec![1]);

        // Neither word sequence appears as a whole; each token matches
        let by_tokens = store
            .find_by_text(&text("Rabat EMI"), 10, RequesterContext::anonymous())
            .await
            .unwrap();
        assert_eq!(ids(&by_tokens), vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn text_is_case_insensitive_and_limited() {
        let store = gazetteer().await;

        let found = store
            .find_by_text(&text("GARE"), 1, RequesterContext::anonymous())
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![2]);
    }

    #[tokio::test]
    async fn accented_capitals_match_lowercase_input() {
        let store = Store::in_memory().await.unwrap();
        let ens = store
            .create_station(&new_station("École Normale Supérieure", "Fès", "Route d'Imouzzer"))
            .await
            .unwrap();

        let by_name = store
            .find_by_text(&text("école"), 10, RequesterContext::anonymous())
            .await
            .unwrap();
        assert_eq!(ids(&by_name), vec![ens.id.get()]);

        let by_words = store
            .find_by_text(&text("NORMALE SUPÉRIEURE"), 10, RequesterContext::anonymous())
            .await
            .unwrap();
        assert_eq!(ids(&by_words), vec![ens.id.get()]);

        let by_city = store.find_by_city("FÈS").await.unwrap();
        assert_eq!(ids(&by_city), vec![ens.id.get()]);

        // Stored text is returned as written
        assert_eq!(by_city[0].name, "École Normale Supérieure");
    }

    #[tokio::test]
    async fn backfill_folds_rows_without_keys() {
        let store = Store::in_memory().await.unwrap();
        let ens = store
            .create_station(&new_station("École Normale Supérieure", "Fès", ""))
            .await
            .unwrap();
        sqlx::query("UPDATE stations SET name_key = '', city_key = '', address_key = ''")
            .execute(store.pool())
            .await
            .unwrap();
        assert!(store.find_by_city("fès").await.unwrap().is_empty());

        assert_eq!(store.backfill_search_keys().await.unwrap(), 1);
        assert_eq!(store.backfill_search_keys().await.unwrap(), 0);
        assert_eq!(ids(&store.find_by_city("FÈS").await.unwrap()), vec![ens.id.get()]);
    }

    #[tokio::test]
    async fn text_treats_wildcards_literally() {
        let store = gazetteer().await;

        let found = store
            .find_by_text(&text("%%"), 10, RequesterContext::anonymous())
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn text_skips_inactive_stations() {
        let store = gazetteer().await;
        store
            .set_station_status(StationId::new(2), StationStatus::Retired)
            .await
            .unwrap();

        let found = store
            .find_by_text(&text("gare"), 10, RequesterContext::anonymous())
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![3]);
    }

    #[tokio::test]
    async fn favourites_and_hits_order_candidates() {
        let store = gazetteer().await;
        let user = UserId::new(42);

        store.record_hit(StationId::new(3)).await.unwrap();
        store.add_favorite(user, StationId::new(2)).await.unwrap();
        store.add_favorite(user, StationId::new(2)).await.unwrap();

        let anonymous = store
            .find_by_text(&text("gare"), 10, RequesterContext::anonymous())
            .await
            .unwrap();
        assert_eq!(ids(&anonymous), vec![3, 2]);

        let personal = store
            .find_by_text(&text("gare"), 10, RequesterContext::user(user))
            .await
            .unwrap();
        assert_eq!(ids(&personal), vec![2, 3]);
    }

    #[tokio::test]
    async fn nearby_filters_by_radius() {
        let store = gazetteer().await;
        let center = Coordinates::new(34.0, -6.85).unwrap();

        let nearby = store.find_nearby(center, 5.0, 10).await.unwrap();
        let found: Vec<i64> = nearby.iter().map(|n| n.station.id.get()).collect();

        assert_eq!(found.len(), 2);
        assert!(found.contains(&1) && found.contains(&2));
        assert!(nearby[0].distance_km <= nearby[1].distance_km);

        let wide = store.find_nearby(center, 100.0, 10).await.unwrap();
        assert_eq!(wide.len(), 3);
    }

    #[tokio::test]
    async fn city_and_university_lookups() {
        let store = gazetteer().await;

        let rabat = store.find_by_city(" rabat ").await.unwrap();
        assert_eq!(ids(&rabat), vec![1, 2, 4]);

        let attached = store.find_by_university(StationId::new(1)).await.unwrap();
        assert_eq!(ids(&attached), vec![4]);
    }

    #[tokio::test]
    async fn record_hit_increments_counter() {
        let store = gazetteer().await;
        store.record_hit(StationId::new(2)).await.unwrap();
        store.record_hit(StationId::new(2)).await.unwrap();

        let station = store.get(StationId::new(2)).await.unwrap().unwrap();
        assert_eq!(station.search_count, 2);
    }

    #[tokio::test]
    async fn status_change_on_missing_station() {
        let store = gazetteer().await;
        let updated = store
            .set_station_status(StationId::new(99), StationStatus::Inactive)
            .await
            .unwrap();
        assert!(updated.is_none());
    }
}
