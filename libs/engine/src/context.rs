//! Collaborators handed to every expansion

use crate::{
    cache::LookupCache,
    config::EngineConfig,
    db::{
        ConceptStore, ExpansionStore, PgStore, RxNormStore, SnomedStore,
        TerminologyQueryService, ValueSetStore,
    },
    metrics::LOOKUP_CACHE_TOTAL,
    models::TerminologyVersion,
    Error, Result,
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Stores, the optional ECL service, the lookup cache and engine settings.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct EngineContext {
    pub value_sets: Arc<dyn ValueSetStore>,
    pub concepts: Arc<dyn ConceptStore>,
    pub snomed: Arc<dyn SnomedStore>,
    pub rxnorm: Arc<dyn RxNormStore>,
    pub expansions: Arc<dyn ExpansionStore>,
    pub query_service: Option<Arc<dyn TerminologyQueryService>>,
    pub cache: Arc<LookupCache>,
    pub config: EngineConfig,
}

impl EngineContext {
    /// Context backed by one store implementing every trait
    pub fn from_store<S>(store: Arc<S>, cache: Arc<LookupCache>, config: EngineConfig) -> Self
    where
        S: ValueSetStore + ConceptStore + SnomedStore + RxNormStore + ExpansionStore + 'static,
    {
        Self {
            value_sets: store.clone(),
            concepts: store.clone(),
            snomed: store.clone(),
            rxnorm: store.clone(),
            expansions: store,
            query_service: None,
            cache,
            config,
        }
    }

    pub fn postgres(pool: PgPool, cache: Arc<LookupCache>, config: EngineConfig) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)), cache, config)
    }

    pub fn with_query_service(mut self, service: Arc<dyn TerminologyQueryService>) -> Self {
        self.query_service = Some(service);
        self
    }

    pub fn query_service(&self) -> Result<&Arc<dyn TerminologyQueryService>> {
        self.query_service.as_ref().ok_or_else(|| {
            Error::Config(
                "ecl rules require terminology_server.base_url to be configured".to_string(),
            )
        })
    }

    /// Terminology version record, read through the lookup cache
    pub async fn terminology(&self, uuid: Uuid) -> Result<TerminologyVersion> {
        if let Some(version) = self.cache.get(&uuid) {
            LOOKUP_CACHE_TOTAL.with_label_values(&["hit"]).inc();
            return Ok(version);
        }
        LOOKUP_CACHE_TOTAL.with_label_values(&["miss"]).inc();

        let version = self
            .value_sets
            .find_terminology(uuid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Terminology version {uuid}")))?;
        self.cache.insert(version.clone());
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use std::time::Duration;

    #[tokio::test]
    async fn terminology_lookups_go_through_cache() {
        let store = Arc::new(MemoryStore::new());
        let release = TerminologyVersion {
            uuid: Uuid::new_v4(),
            terminology: "ICD-10 CM".to_string(),
            version: "2024".to_string(),
            fhir_uri: "http://hl7.org/fhir/sid/icd-10-cm".to_string(),
        };
        store.add_terminology(release.clone());

        let cache = Arc::new(LookupCache::new(16, Duration::from_secs(60)));
        let ctx = EngineContext::from_store(store.clone(), cache.clone(), EngineConfig::default());

        assert_eq!(ctx.terminology(release.uuid).await.unwrap(), release);
        assert_eq!(ctx.terminology(release.uuid).await.unwrap(), release);
        assert_eq!(store.terminology_lookups(), 1);

        cache.invalidate(&release.uuid);
        ctx.terminology(release.uuid).await.unwrap();
        assert_eq!(store.terminology_lookups(), 2);
    }

    #[tokio::test]
    async fn missing_terminology_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let ctx = EngineContext::from_store(
            store,
            Arc::new(LookupCache::new(4, Duration::from_secs(60))),
            EngineConfig::default(),
        );

        let err = ctx.terminology(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(ctx.query_service().is_err());
    }
}
