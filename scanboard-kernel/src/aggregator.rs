/**
 * AGRÉGATEUR DE RÉSUMÉ - Censys -> SummaryResult
 *
 * RÔLE :
 * Transforme les réponses de recherche/stats Censys en un document plat
 * (totaux + compteurs par service et par pays) pour le dashboard.
 *
 * FONCTIONNEMENT :
 * - Vérifie les identifiants avant tout appel réseau (ConfigError)
 * - BucketStats : recherche + 2 stats lancées ensemble, échec au premier Err
 * - SearchFacets : une recherche, lecture des facettes de la réponse
 * - Tout ou rien : jamais de résultat partiel, aucun retry interne
 */

use crate::config::{Credentials, Strategy, SummaryConf};
use crate::error::SummaryError;
use crate::models::{
    now_rfc3339, CountMap, FacetBucket, HostSearchRequest, HostSearchResult, StatsRequest,
    SummaryResult,
};
use crate::upstream::CensysApi;
use tracing::debug;

pub const SERVICE_FIELD: &str = "services.service_name";
pub const COUNTRY_CODE_FIELD: &str = "location.country_code";
pub const COUNTRY_FACET: &str = "location.country";

pub struct SummaryAggregator<U> {
    upstream: U,
    settings: SummaryConf,
}

impl<U: CensysApi> SummaryAggregator<U> {
    pub fn new(upstream: U, settings: SummaryConf) -> Self {
        Self { upstream, settings }
    }

    pub fn settings(&self) -> &SummaryConf {
        &self.settings
    }

    pub async fn get_summary(&self, creds: &Credentials) -> Result<SummaryResult, SummaryError> {
        creds.validate()?;
        match self.settings.strategy {
            Strategy::BucketStats => self.from_bucket_stats(creds).await,
            Strategy::SearchFacets => self.from_search_facets(creds).await,
        }
    }

    async fn from_bucket_stats(&self, creds: &Credentials) -> Result<SummaryResult, SummaryError> {
        let q = self.settings.effective_query().to_string();
        let search = HostSearchRequest {
            q: q.clone(),
            per_page: 1,
            virtual_hosts: self.settings.exclude_virtual_hosts.then(|| "EXCLUDE".to_string()),
        };
        let services_req = StatsRequest { q: q.clone(), num_buckets: self.settings.service_buckets };
        let countries_req = StatsRequest { q, num_buckets: self.settings.country_buckets };

        // try_join! : le premier Err l'emporte, les autres futures sont abandonnées
        let (hosts, services, countries) = tokio::try_join!(
            self.upstream.search_hosts(creds, &search),
            self.upstream.host_stats(creds, SERVICE_FIELD, &services_req),
            self.upstream.host_stats(creds, COUNTRY_CODE_FIELD, &countries_req),
        )?;

        let (services, total_services) = fold_buckets(services.result.buckets, |k| k.to_string());
        let (countries, _) = fold_buckets(countries.result.buckets, str::to_uppercase);

        debug!(services = services.len(), countries = countries.len(), "bucket stats folded");
        Ok(SummaryResult {
            total_hosts: hosts.result.total.unwrap_or(0),
            total_services,
            last_sync: now_rfc3339(),
            countries,
            services,
        })
    }

    async fn from_search_facets(&self, creds: &Credentials) -> Result<SummaryResult, SummaryError> {
        let search = HostSearchRequest {
            q: self.settings.effective_query().to_string(),
            per_page: 1,
            virtual_hosts: None,
        };
        let resp = self.upstream.search_hosts(creds, &search).await?;
        let HostSearchResult { total, mut facets } = resp.result;

        let mut take = |name: &str| -> Vec<FacetBucket> {
            facets
                .remove(name)
                .unwrap_or_default()
                .into_iter()
                .map(FacetBucket::from)
                .collect()
        };
        let (services, total_services) = fold_buckets(take(SERVICE_FIELD), |k| k.to_string());
        let (countries, _) = fold_buckets(take(COUNTRY_FACET), |k| k.to_string());

        Ok(SummaryResult {
            total_hosts: total.unwrap_or(0),
            total_services,
            last_sync: now_rfc3339(),
            countries,
            services,
        })
    }
}

/// Buckets -> map plate + somme. Clés vides ignorées, dernière valeur gagne
/// sur une clé répétée ; la somme est toujours celle des valeurs de la map.
///
/// La somme plafonne à `u64::MAX` au lieu de déborder : passé ce seuil,
/// `total_services` n'est plus la somme exacte.
pub fn fold_buckets<F>(buckets: Vec<FacetBucket>, normalize: F) -> (CountMap, u64)
where
    F: Fn(&str) -> String,
{
    let mut map = CountMap::new();
    for bucket in buckets {
        let Some(key) = bucket.key.as_deref().filter(|k| !k.is_empty()) else { continue };
        map.insert(normalize(key), bucket.count);
    }
    let total = map.values().fold(0u64, |acc, c| acc.saturating_add(*c));
    (map, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_skips_falsy_keys() {
        let buckets = vec![
            FacetBucket::new("http", 80),
            FacetBucket { key: None, count: 1000 },
            FacetBucket::new("", 7),
            FacetBucket::new("https", 95),
        ];
        let (map, total) = fold_buckets(buckets, |k| k.to_string());
        assert_eq!(map.len(), 2);
        assert_eq!(map["http"], 80);
        assert_eq!(map["https"], 95);
        assert_eq!(total, 175);
    }

    #[test]
    fn test_fold_empty_set() {
        let (map, total) = fold_buckets(Vec::new(), |k| k.to_string());
        assert!(map.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_fold_uppercase_collision_keeps_sum_consistent() {
        let buckets = vec![FacetBucket::new("us", 120), FacetBucket::new("US", 3), FacetBucket::new("de", 80)];
        let (map, total) = fold_buckets(buckets, str::to_uppercase);
        assert_eq!(map["US"], 3);
        assert_eq!(map["DE"], 80);
        assert_eq!(total, map.values().sum::<u64>());
    }

    #[test]
    fn test_fold_saturates() {
        let buckets = vec![FacetBucket::new("a", u64::MAX), FacetBucket::new("b", 5)];
        let (_, total) = fold_buckets(buckets, |k| k.to_string());
        assert_eq!(total, u64::MAX);
    }
}
