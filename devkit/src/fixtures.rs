/*!
Fixtures Censys : buckets, corps JSON de réponses et identifiants de test
*/

use scanboard_kernel::models::FacetBucket;
use scanboard_kernel::Credentials;
use serde_json::{json, Value};

pub const TEST_ID: &str = "test-id";
pub const TEST_SECRET: &str = "test-secret";
/// `Basic base64("test-id:test-secret")`
pub const TEST_BASIC_AUTH: &str = "Basic dGVzdC1pZDp0ZXN0LXNlY3JldA==";

pub fn test_credentials() -> Credentials {
    Credentials::new(TEST_ID, TEST_SECRET)
}

pub fn buckets(pairs: &[(&str, u64)]) -> Vec<FacetBucket> {
    pairs.iter().map(|(k, c)| FacetBucket::new(*k, *c)).collect()
}

/// Jeu de données de référence : 500 hôtes, http/https, us/de.
pub struct ReferenceData;

impl ReferenceData {
    pub const TOTAL_HOSTS: u64 = 500;

    pub fn services() -> Vec<FacetBucket> {
        buckets(&[("http", 80), ("https", 95)])
    }

    pub fn countries() -> Vec<FacetBucket> {
        buckets(&[("us", 120), ("de", 80)])
    }
}

/// Corps JSON de /hosts/search
pub fn search_json(total: u64) -> Value {
    json!({ "code": 200, "status": "OK", "result": { "total": total, "hits": [] } })
}

/// Corps JSON de /hosts/search avec facettes `{name, count}`
pub fn search_with_facets_json(total: u64, services: &[(&str, u64)], countries: &[(&str, u64)]) -> Value {
    let facet = |pairs: &[(&str, u64)]| -> Value {
        pairs.iter().map(|(n, c)| json!({ "name": n, "count": c })).collect()
    };
    json!({
        "code": 200,
        "status": "OK",
        "result": {
            "total": total,
            "facets": {
                "services.service_name": facet(services),
                "location.country": facet(countries),
            }
        }
    })
}

/// Corps JSON de /hosts/stats/{field}
pub fn stats_json(pairs: &[(&str, u64)]) -> Value {
    let buckets: Vec<Value> = pairs.iter().map(|(k, c)| json!({ "key": k, "count": c })).collect();
    json!({ "code": 200, "status": "OK", "result": { "buckets": buckets } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanboard_kernel::models::{HostSearchResponse, StatsResponse};

    #[test]
    fn test_json_fixtures_match_models() {
        let search: HostSearchResponse = serde_json::from_value(search_json(7)).unwrap();
        assert_eq!(search.result.total, Some(7));

        let stats: StatsResponse = serde_json::from_value(stats_json(&[("ssh", 2)])).unwrap();
        assert_eq!(stats.result.buckets, buckets(&[("ssh", 2)]));

        let faceted: HostSearchResponse =
            serde_json::from_value(search_with_facets_json(3, &[("ftp", 1)], &[("France", 2)])).unwrap();
        let facets = faceted.result.facets;
        assert_eq!(facets["location.country"][0].name.as_deref(), Some("France"));
    }

    #[test]
    fn test_reference_data() {
        let total: u64 = ReferenceData::services().iter().map(|b| b.count).sum();
        assert_eq!(total, 175);
        assert!(test_credentials().validate().is_ok());
    }
}
