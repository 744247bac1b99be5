//! Per-user exploration session with a private response cache

use std::collections::HashMap;

use safer_streets_core::wire::{CountsResponse, HotspotsResponse, NationalHotspotsResponse, PfaAreaResponse};
use safer_streets_core::{Area, AreaSummary, HotspotRepetition, Month, PersistenceReport, Record};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::client::{
    counts_params, force_params, hotspot_params, national_params, persistence_params, record_params,
    repetition_params, ApiClient, RepetitionRequest,
};
use crate::error::ClientError;

/// Endpoint plus its query parameters sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl CacheKey {
    fn new(endpoint: &str, params: &[(&str, String)]) -> Self {
        let mut params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        params.sort();
        Self {
            endpoint: endpoint.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// One user's view of the API. Successful responses are cached until
/// [`Session::refresh`]; failures never are. Each session has its own cache.
pub struct Session {
    client: ApiClient,
    cache: HashMap<CacheKey, Value>,
    hits: u64,
    misses: u64,
}

impl Session {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            cache: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// GET through the cache.
    pub async fn fetch<T: DeserializeOwned>(
        &mut self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let key = CacheKey::new(endpoint, params);
        if let Some(value) = self.cache.get(&key) {
            self.hits += 1;
            debug!("Cache hit for {}", endpoint);
            return Ok(serde_json::from_value(value.clone())?);
        }

        self.misses += 1;
        let value = self.client.get_value(endpoint, params).await?;
        let decoded = serde_json::from_value(value.clone())?;
        self.cache.insert(key, value);
        Ok(decoded)
    }

    /// Drop every cached response.
    pub fn refresh(&mut self) {
        debug!("Clearing {} cached responses", self.cache.len());
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    pub async fn forces(&mut self) -> Result<Vec<AreaSummary>, ClientError> {
        self.fetch("/forces", &[]).await
    }

    pub async fn area(&mut self, force: &str) -> Result<Area, ClientError> {
        self.fetch("/area", &force_params(force)).await
    }

    pub async fn pfa_area(&mut self, force: &str) -> Result<PfaAreaResponse, ClientError> {
        self.fetch("/pfa_area", &force_params(force)).await
    }

    pub async fn record(&mut self, dataset: &str, force: &str) -> Result<Record, ClientError> {
        self.fetch("/records", &record_params(dataset, force)).await
    }

    pub async fn persistence(&mut self, force: &str, series: &str) -> Result<PersistenceReport, ClientError> {
        self.fetch("/persistence", &persistence_params(force, series)).await
    }

    pub async fn counts(&mut self, force: &str, category: &str) -> Result<CountsResponse, ClientError> {
        self.fetch("/counts", &counts_params(force, category)).await
    }

    pub async fn hotspots(
        &mut self,
        force: &str,
        category: &str,
        months: &[Month],
        n_hotspots: usize,
    ) -> Result<HotspotsResponse, ClientError> {
        self.fetch("/hotspots", &hotspot_params(force, category, months, n_hotspots))
            .await
    }

    pub async fn national_hotspots(
        &mut self,
        category: &str,
        months: &[Month],
        n_hotspots: usize,
    ) -> Result<NationalHotspotsResponse, ClientError> {
        self.fetch("/hotspots/national", &national_params(category, months, n_hotspots))
            .await
    }

    pub async fn repetition(
        &mut self,
        force: &str,
        category: &str,
        request: &RepetitionRequest,
    ) -> Result<HotspotRepetition, ClientError> {
        self.fetch("/hotspots/repetition", &repetition_params(force, category, request))
            .await
    }
}
