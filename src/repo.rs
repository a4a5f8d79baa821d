use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{family, QueryCache, QueryKey};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::*;
use crate::store::{Query, StoreClient};

const HISTORY_TABLE: &str = "radio_history";

/// Static description of one entity family: its collection, default server
/// order, insert/patch payload types, and the extra cache families any
/// mutation to it makes stale (its own family is always swept).
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const ORDER: &'static str;
    const INVALIDATES: &'static [&'static str];
    type New: Serialize + Send + Sync;
    type Patch: Serialize + Send + Sync;
}

impl Entity for Radio {
    const TABLE: &'static str = family::RADIOS;
    const ORDER: &'static str = "created_at.desc";
    const INVALIDATES: &'static [&'static str] = &[family::RADIO_STATS, family::DASHBOARD];
    type New = RadioForm;
    type Patch = RadioPatch;
}

impl Entity for Accessory {
    const TABLE: &'static str = family::ACCESSORIES;
    const ORDER: &'static str = "created_at.desc";
    const INVALIDATES: &'static [&'static str] = &[family::DASHBOARD];
    type New = AccessoryForm;
    type Patch = AccessoryPatch;
}

impl Entity for Issue {
    const TABLE: &'static str = family::ISSUES;
    const ORDER: &'static str = "issued_at.desc";
    const INVALIDATES: &'static [&'static str] = &[family::DASHBOARD];
    type New = NewIssue;
    type Patch = IssuePatch;
}

impl Entity for Installation {
    const TABLE: &'static str = family::INSTALLATIONS;
    const ORDER: &'static str = "installed_at.desc";
    const INVALIDATES: &'static [&'static str] = &[family::DASHBOARD];
    type New = NewInstallation;
    type Patch = InstallationPatch;
}

// Catalog mutations invalidate the whole hierarchy plus the derived
// radio-form queries, never just the parameter they touched.
const CATALOG_FAMILIES: &[&str] = &[
    family::BRANDS,
    family::CATEGORIES,
    family::MODELS,
    family::BRAND_STATS,
    family::BRANDS_WITH_RADIOS,
    family::RADIO_MODELS,
];

impl Entity for Brand {
    const TABLE: &'static str = family::BRANDS;
    const ORDER: &'static str = "name.asc";
    const INVALIDATES: &'static [&'static str] = CATALOG_FAMILIES;
    type New = BrandForm;
    type Patch = BrandPatch;
}

impl Entity for Category {
    const TABLE: &'static str = family::CATEGORIES;
    const ORDER: &'static str = "name.asc";
    const INVALIDATES: &'static [&'static str] = CATALOG_FAMILIES;
    type New = CategoryForm;
    type Patch = CategoryPatch;
}

impl Entity for Model {
    const TABLE: &'static str = family::MODELS;
    const ORDER: &'static str = "name.asc";
    const INVALIDATES: &'static [&'static str] = CATALOG_FAMILIES;
    type New = ModelForm;
    type Patch = ModelPatch;
}

/// Generic repository over one entity family. List and by-id reads go
/// through the query cache; mutations go straight to the store and sweep the
/// affected families afterwards. No optimistic local mutation: reads
/// re-fetch after invalidation.
pub struct Repo<E> {
    store: Arc<StoreClient>,
    cache: Arc<QueryCache>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for Repo<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> Repo<E> {
    pub(crate) fn new(store: Arc<StoreClient>, cache: Arc<QueryCache>) -> Self {
        Self {
            store,
            cache,
            _marker: PhantomData,
        }
    }

    /// Every record of the family, server-sorted. The store returns the full
    /// set in one reply; that ceiling is a preserved constraint.
    pub async fn list_all(&self) -> Result<Vec<E>> {
        let store = self.store.clone();
        self.cache
            .fetch(QueryKey::family(E::TABLE), move || {
                let store = store.clone();
                async move {
                    store
                        .select(E::TABLE, &Query::all().order(E::ORDER))
                        .await
                }
            })
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<E>> {
        let store = self.store.clone();
        let id = id.to_string();
        self.cache
            .fetch(QueryKey::scoped(E::TABLE, &id), move || {
                let store = store.clone();
                let id = id.clone();
                async move { store.select_one(E::TABLE, &Query::all().eq("id", &id)).await }
            })
            .await
    }

    pub async fn create(&self, new: &E::New) -> Result<E> {
        let record = self
            .cache
            .write(|| async move { self.store.insert(E::TABLE, new).await })
            .await?;
        info!(table = E::TABLE, "created record");
        self.invalidate_after_write();
        Ok(record)
    }

    /// Partial update: only the fields set in `patch` are sent.
    pub async fn update(&self, id: &str, patch: &E::Patch) -> Result<E> {
        let record = self
            .cache
            .write(|| async move {
                self.store
                    .patch(E::TABLE, &Query::all().eq("id", id), patch)
                    .await
            })
            .await?;
        info!(table = E::TABLE, id, "updated record");
        self.invalidate_after_write();
        Ok(record)
    }

    /// Delete by id. No existence check first; deleting an absent row is not
    /// an error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.cache
            .write(|| async move {
                self.store.delete(E::TABLE, &Query::new().eq("id", id)).await
            })
            .await?;
        info!(table = E::TABLE, id, "deleted record");
        self.invalidate_after_write();
        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count(E::TABLE).await
    }

    /// The `limit` most recent records by the family's default order.
    pub async fn recent(&self, limit: usize) -> Result<Vec<E>> {
        self.store
            .select(E::TABLE, &Query::all().order(E::ORDER).limit(limit))
            .await
    }

    fn invalidate_after_write(&self) {
        self.cache.invalidate(E::TABLE, None);
        for fam in E::INVALIDATES {
            self.cache.invalidate(fam, None);
        }
    }
}

#[derive(Deserialize)]
struct TypeRow {
    #[serde(rename = "type")]
    kind: RadioType,
}

fn tally(types: &[TypeRow]) -> RadioStats {
    RadioStats {
        total: types.len() as u64,
        portable: types.iter().filter(|t| t.kind == RadioType::Portable).count() as u64,
        mobile: types.iter().filter(|t| t.kind == RadioType::Mobile).count() as u64,
        base: types.iter().filter(|t| t.kind == RadioType::Base).count() as u64,
    }
}

impl Repo<Radio> {
    /// Serial numbers are compared case-normalized: the lookup always runs
    /// against the uppercase form.
    pub async fn get_by_serial(&self, serienummer: &str) -> Result<Option<Radio>> {
        let serial = serienummer.to_uppercase();
        self.store
            .select_one(
                Radio::TABLE,
                &Query::all().eq("serienummer", &serial),
            )
            .await
    }

    // Uncached lookups backing the uniqueness checks; a cached reply here
    // could vouch for a value that was taken seconds ago.
    pub async fn id_taken(&self, id: &str) -> Result<bool> {
        let found: Option<Radio> = self
            .store
            .select_one(Radio::TABLE, &Query::all().eq("id", id))
            .await?;
        Ok(found.is_some())
    }

    pub async fn serial_taken(&self, serienummer: &str) -> Result<bool> {
        Ok(self.get_by_serial(serienummer).await?.is_some())
    }

    /// Counts by radio type, derived client-side from a `type` projection.
    pub async fn stats(&self) -> Result<RadioStats> {
        let store = self.store.clone();
        self.cache
            .fetch(QueryKey::family(family::RADIO_STATS), move || {
                let store = store.clone();
                async move {
                    let types: Vec<TypeRow> =
                        store.select(Radio::TABLE, &Query::columns("type")).await?;
                    Ok(tally(&types))
                }
            })
            .await
    }

    pub async fn history(&self, radio_id: &str) -> Result<Vec<RadioHistory>> {
        let store = self.store.clone();
        let radio_id = radio_id.to_string();
        self.cache
            .fetch(QueryKey::scoped(family::RADIO_HISTORY, &radio_id), move || {
                let store = store.clone();
                let radio_id = radio_id.clone();
                async move {
                    store
                        .select(
                            HISTORY_TABLE,
                            &Query::all().eq("radio_id", &radio_id).order("timestamp.desc"),
                        )
                        .await
                }
            })
            .await
    }

    pub async fn add_history(&self, entry: NewRadioHistory) -> Result<RadioHistory> {
        let entry = &entry;
        let record = self
            .cache
            .write(|| async move { self.store.insert(HISTORY_TABLE, entry).await })
            .await?;
        self.cache.invalidate(family::RADIO_HISTORY, None);
        Ok(record)
    }

    /// The only path that may alter a radio's id after creation. The audit
    /// entry is attached to the new id so the trail follows the radio.
    pub async fn change_id(
        &self,
        radio: &Radio,
        new_id: &str,
        service_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<Radio> {
        let updated = self
            .update(
                &radio.id,
                &RadioPatch {
                    id: Some(new_id.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        self.add_history(NewRadioHistory {
            radio_id: new_id.to_string(),
            action: HistoryAction::IdChanged,
            description: format!("ID gewijzigd van {} naar {}", radio.id, new_id),
            details: Some(HistoryDetails {
                old_value: Some(radio.id.clone()),
                new_value: Some(new_id.to_string()),
                service_date: Some(service_date),
                notes,
                ..Default::default()
            }),
            timestamp: Utc::now(),
        })
        .await?;
        Ok(updated)
    }

    pub async fn change_alias(
        &self,
        radio: &Radio,
        new_alias: &str,
        service_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<Radio> {
        let updated = self
            .update(
                &radio.id,
                &RadioPatch {
                    alias: Some(new_alias.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        self.add_history(NewRadioHistory {
            radio_id: radio.id.clone(),
            action: HistoryAction::AliasChanged,
            description: format!("Alias gewijzigd van {} naar {}", radio.alias, new_alias),
            details: Some(HistoryDetails {
                old_value: Some(radio.alias.clone()),
                new_value: Some(new_alias.to_string()),
                service_date: Some(service_date),
                notes,
                ..Default::default()
            }),
            timestamp: Utc::now(),
        })
        .await?;
        Ok(updated)
    }

    pub async fn change_department(
        &self,
        radio: &Radio,
        new_afdeling: &str,
        service_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<Radio> {
        let updated = self
            .update(
                &radio.id,
                &RadioPatch {
                    afdeling: Some(new_afdeling.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        self.add_history(NewRadioHistory {
            radio_id: radio.id.clone(),
            action: HistoryAction::DepartmentChanged,
            description: format!(
                "Afdeling gewijzigd van {} naar {}",
                radio.afdeling, new_afdeling
            ),
            details: Some(HistoryDetails {
                old_value: Some(radio.afdeling.clone()),
                new_value: Some(new_afdeling.to_string()),
                service_date: Some(service_date),
                notes,
                ..Default::default()
            }),
            timestamp: Utc::now(),
        })
        .await?;
        Ok(updated)
    }

    pub async fn record_battery_replacement(
        &self,
        radio_id: &str,
        service_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<RadioHistory> {
        self.add_history(NewRadioHistory {
            radio_id: radio_id.to_string(),
            action: HistoryAction::BatteryReplaced,
            description: "Batterij vervangen".to_string(),
            details: Some(HistoryDetails {
                service_date: Some(service_date),
                notes,
                ..Default::default()
            }),
            timestamp: Utc::now(),
        })
        .await
    }

    pub async fn record_service(
        &self,
        radio_id: &str,
        service_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<RadioHistory> {
        self.add_history(NewRadioHistory {
            radio_id: radio_id.to_string(),
            action: HistoryAction::Serviced,
            description: "Radio geserviced".to_string(),
            details: Some(HistoryDetails {
                service_date: Some(service_date),
                notes,
                ..Default::default()
            }),
            timestamp: Utc::now(),
        })
        .await
    }
}

impl Repo<Issue> {
    /// Records a hand-out, stamping the issue instant.
    pub async fn record(&self, form: IssueForm) -> Result<Issue> {
        self.create(&NewIssue {
            form,
            issued_at: Utc::now(),
        })
        .await
    }
}

impl Repo<Installation> {
    /// Records a vehicle fit, stamping the installation instant.
    pub async fn record(&self, form: InstallationForm) -> Result<Installation> {
        self.create(&NewInstallation {
            form,
            installed_at: Utc::now(),
        })
        .await
    }
}

/// One handle over the whole console: every repository sharing one store
/// client and one process-wide query cache.
pub struct Fleet {
    pub radios: Repo<Radio>,
    pub accessories: Repo<Accessory>,
    pub issues: Repo<Issue>,
    pub installations: Repo<Installation>,
    pub catalog: Catalog,
    store: Arc<StoreClient>,
    cache: Arc<QueryCache>,
}

impl Fleet {
    pub fn new(store: StoreClient) -> Self {
        Self::with_cache(store, QueryCache::new())
    }

    /// Injectable cache variant; tests substitute tighter budgets.
    pub fn with_cache(store: StoreClient, cache: QueryCache) -> Self {
        let store = Arc::new(store);
        let cache = Arc::new(cache);
        Self {
            radios: Repo::new(store.clone(), cache.clone()),
            accessories: Repo::new(store.clone(), cache.clone()),
            issues: Repo::new(store.clone(), cache.clone()),
            installations: Repo::new(store.clone(), cache.clone()),
            catalog: Catalog::new(store.clone(), cache.clone()),
            store,
            cache,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(StoreClient::from_env()?))
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// The landing-page aggregate: radio counts by type, accessory total,
    /// and the five most recent installations, issues, and registrations.
    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let store = self.store.clone();
        self.cache
            .fetch(QueryKey::family(family::DASHBOARD), move || {
                let store = store.clone();
                async move { load_dashboard(&store).await }
            })
            .await
    }
}

async fn load_dashboard(store: &StoreClient) -> Result<DashboardStats> {
    let types_query = Query::columns("type");
    let installations_query = Query::all().order(Installation::ORDER).limit(5);
    let issues_query = Query::all().order(Issue::ORDER).limit(5);
    let registrations_query = Query::all().order(Radio::ORDER).limit(5);

    let types = store.select::<TypeRow>(Radio::TABLE, &types_query);
    let accessories = store.count(Accessory::TABLE);
    let installations = store.select::<Installation>(Installation::TABLE, &installations_query);
    let issues = store.select::<Issue>(Issue::TABLE, &issues_query);
    let registrations = store.select::<Radio>(Radio::TABLE, &registrations_query);

    let (types, accessories, installations, issues, registrations) =
        tokio::try_join!(types, accessories, installations, issues, registrations)?;
    let radio_stats = tally(&types);

    Ok(DashboardStats {
        total_radios: radio_stats.total,
        portable_radios: radio_stats.portable,
        mobile_radios: radio_stats.mobile,
        base_radios: radio_stats.base,
        total_accessories: accessories,
        recent_installations: installations,
        recent_issues: issues,
        recent_registrations: registrations,
    })
}
