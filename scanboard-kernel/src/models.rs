use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Compteurs à plat : clé de catégorie -> occurrences.
pub type CountMap = BTreeMap<String, u64>;

/// Document produit pour le dashboard (contrat JSON public).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SummaryResult {
    pub total_hosts: u64,
    pub total_services: u64,
    pub last_sync: String,   // RFC3339, heure de génération (pas celle de Censys)
    pub countries: CountMap,
    pub services: CountMap,
}

impl SummaryResult {
    /// Résumé vide horodaté maintenant, utilisé dans le corps des réponses 502.
    pub fn empty() -> Self {
        Self {
            total_hosts: 0,
            total_services: 0,
            last_sync: now_rfc3339(),
            countries: CountMap::new(),
            services: CountMap::new(),
        }
    }

    /// Same payload, ignoring `last_sync`.
    pub fn same_counts(&self, other: &SummaryResult) -> bool {
        self.total_hosts == other.total_hosts
            && self.total_services == other.total_services
            && self.countries == other.countries
            && self.services == other.services
    }
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

// ============ UPSTREAM (Censys v2) ============

/// Corps de POST /hosts/search
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HostSearchRequest {
    pub q: String,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_hosts: Option<String>,
}

/// Corps de POST /hosts/stats/{field}
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StatsRequest {
    pub q: String,
    pub num_buckets: u32,
}

// Censys renvoie parfois `null` là où on attend un objet ou une liste :
// même traitement qu'un champ absent, et les éléments `null` sont ignorés.

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn skip_null_items<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Vec<Option<T>> = null_as_default(d)?;
    Ok(items.into_iter().flatten().collect())
}

fn skip_null_facets<'de, D>(d: D) -> Result<HashMap<String, Vec<FacetEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let facets: HashMap<String, Option<Vec<Option<FacetEntry>>>> = null_as_default(d)?;
    Ok(facets
        .into_iter()
        .map(|(name, entries)| (name, entries.unwrap_or_default().into_iter().flatten().collect()))
        .collect())
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct HostSearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: HostSearchResult,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct HostSearchResult {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "skip_null_facets")]
    pub facets: HashMap<String, Vec<FacetEntry>>,
}

/// Entrée de facette dans une réponse de recherche : `{name, count}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FacetEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StatsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: StatsResult,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StatsResult {
    #[serde(default, deserialize_with = "skip_null_items")]
    pub buckets: Vec<FacetBucket>,
}

/// Bucket de stats : `{key, count}`. Une clé absente, nulle ou vide est ignorée.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FacetBucket {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
}

impl FacetBucket {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self { key: Some(key.into()), count }
    }
}

impl From<FacetEntry> for FacetBucket {
    fn from(entry: FacetEntry) -> Self {
        Self { key: entry.name, count: entry.count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_tolerates_missing_fields() {
        let resp: HostSearchResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.result.total, None);
        assert!(resp.result.facets.is_empty());

        let resp: HostSearchResponse =
            serde_json::from_str(r#"{"result":{"total":null}}"#).unwrap();
        assert_eq!(resp.result.total, None);
    }

    #[test]
    fn test_stats_bucket_with_null_key() {
        let resp: StatsResponse = serde_json::from_str(
            r#"{"result":{"buckets":[{"key":null,"count":3},{"count":4},{"key":"ssh","count":5}]}}"#,
        )
        .unwrap();
        let buckets = resp.result.buckets;
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].key, None);
        assert_eq!(buckets[2], FacetBucket::new("ssh", 5));
    }

    #[test]
    fn test_null_result_reads_as_empty() {
        let resp: HostSearchResponse = serde_json::from_str(r#"{"result":null}"#).unwrap();
        assert_eq!(resp.result.total, None);
        assert!(resp.result.facets.is_empty());

        let resp: StatsResponse = serde_json::from_str(r#"{"result":null}"#).unwrap();
        assert!(resp.result.buckets.is_empty());

        let resp: StatsResponse = serde_json::from_str(r#"{"result":{"buckets":null}}"#).unwrap();
        assert!(resp.result.buckets.is_empty());
    }

    #[test]
    fn test_null_buckets_are_dropped() {
        let resp: StatsResponse = serde_json::from_str(
            r#"{"result":{"buckets":[null,{"key":"http","count":80},null,{"key":"ssh","count":null}]}}"#,
        )
        .unwrap();
        assert_eq!(resp.result.buckets, vec![FacetBucket::new("http", 80), FacetBucket::new("ssh", 0)]);
    }

    #[test]
    fn test_null_facet_entries_are_dropped() {
        let resp: HostSearchResponse = serde_json::from_str(
            r#"{"result":{"total":9,"facets":{
                "services.service_name":[null,{"name":"HTTP","count":9}],
                "location.country":null
            }}}"#,
        )
        .unwrap();
        let facets = resp.result.facets;
        assert_eq!(facets["services.service_name"], vec![FacetEntry { name: Some("HTTP".into()), count: 9 }]);
        assert!(facets["location.country"].is_empty());
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let parsed = serde_json::from_str::<StatsResponse>(
            r#"{"result":{"buckets":[{"key":"http","count":-1}]}}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_search_request_skips_virtual_hosts_when_unset() {
        let req = HostSearchRequest { q: "*".into(), per_page: 1, virtual_hosts: None };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"q": "*", "per_page": 1}));
    }

    #[test]
    fn test_empty_summary_has_timestamp() {
        let s = SummaryResult::empty();
        assert!(s.last_sync.ends_with('Z'));
        assert!(s.last_sync.contains('T'));
        assert_eq!(s.total_services, 0);
        assert!(s.countries.is_empty() && s.services.is_empty());
    }
}
