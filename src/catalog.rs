use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::cache::{family, QueryCache, QueryKey};
use crate::error::{Error, Result};
use crate::models::{Brand, CatalogStats, Category, Id, Model};
use crate::repo::{Entity, Repo};
use crate::store::{Query, StoreClient};

// A category counts as radio equipment when its name carries one of these.
const RADIO_TOKENS: [&str; 4] = ["radio", "portable", "mobile", "base"];

fn is_radio_category(name: &str) -> bool {
    let lower = name.to_lowercase();
    RADIO_TOKENS.iter().any(|token| lower.contains(token))
}

/// Child rows removed by a completed cascade delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeOutcome {
    pub categories_deleted: usize,
    pub models_deleted: usize,
}

/// The brand → category → model hierarchy. Child levels load lazily, one
/// parent at a time, when a row is expanded; results stay cached so
/// collapsing and re-expanding within the fresh window does not re-fetch.
#[derive(Clone)]
pub struct Catalog {
    pub brands: Repo<Brand>,
    pub categories: Repo<Category>,
    pub models: Repo<Model>,
    store: Arc<StoreClient>,
    cache: Arc<QueryCache>,
}

impl Catalog {
    pub(crate) fn new(store: Arc<StoreClient>, cache: Arc<QueryCache>) -> Self {
        Self {
            brands: Repo::new(store.clone(), cache.clone()),
            categories: Repo::new(store.clone(), cache.clone()),
            models: Repo::new(store.clone(), cache.clone()),
            store,
            cache,
        }
    }

    /// Categories owned by one brand, fetched on expansion.
    pub async fn categories_for(&self, brand_id: &str) -> Result<Vec<Category>> {
        let store = self.store.clone();
        let brand_id = brand_id.to_string();
        self.cache
            .fetch(QueryKey::scoped(family::CATEGORIES, &brand_id), move || {
                let store = store.clone();
                let brand_id = brand_id.clone();
                async move {
                    store
                        .select(
                            Category::TABLE,
                            &Query::all().eq("brand_id", &brand_id).order("name.asc"),
                        )
                        .await
                }
            })
            .await
    }

    /// Models owned by one category, fetched on expansion.
    pub async fn models_for(&self, category_id: &str) -> Result<Vec<Model>> {
        let store = self.store.clone();
        let category_id = category_id.to_string();
        self.cache
            .fetch(QueryKey::scoped(family::MODELS, &category_id), move || {
                let store = store.clone();
                let category_id = category_id.clone();
                async move {
                    store
                        .select(
                            Model::TABLE,
                            &Query::all().eq("category_id", &category_id).order("name.asc"),
                        )
                        .await
                }
            })
            .await
    }

    /// Totals over the three catalog levels via the count directive.
    pub async fn stats(&self) -> Result<CatalogStats> {
        let store = self.store.clone();
        self.cache
            .fetch(QueryKey::family(family::BRAND_STATS), move || {
                let store = store.clone();
                async move {
                    let (total_brands, total_categories, total_models) = tokio::try_join!(
                        store.count(Brand::TABLE),
                        store.count(Category::TABLE),
                        store.count(Model::TABLE),
                    )?;
                    Ok(CatalogStats {
                        total_brands,
                        total_categories,
                        total_models,
                    })
                }
            })
            .await
    }

    /// Brands offering radio equipment, for the radio form's brand choice.
    /// The store has no radio-ness predicate, so every brand's categories are
    /// fetched and filtered here.
    pub async fn brands_with_radio_categories(&self) -> Result<Vec<Brand>> {
        let catalog = self.clone();
        self.cache
            .fetch(QueryKey::family(family::BRANDS_WITH_RADIOS), move || {
                let catalog = catalog.clone();
                async move {
                    let brands: Vec<Brand> =
                        catalog.store.select(Brand::TABLE, &Query::all()).await?;
                    let mut keep = Vec::new();
                    for brand in brands {
                        let categories = catalog.categories_for(&brand.id).await?;
                        if categories.iter().any(|c| is_radio_category(&c.name)) {
                            keep.push(brand);
                        }
                    }
                    Ok(keep)
                }
            })
            .await
    }

    /// Models selectable for a radio of the given brand: those under the
    /// brand's radio-relevant categories.
    pub async fn radio_models_by_brand(&self, brand_id: &str) -> Result<Vec<Model>> {
        let catalog = self.clone();
        let brand_id = brand_id.to_string();
        self.cache
            .fetch(QueryKey::scoped(family::RADIO_MODELS, &brand_id), move || {
                let catalog = catalog.clone();
                let brand_id = brand_id.clone();
                async move {
                    let categories = catalog.categories_for(&brand_id).await?;
                    let mut models = Vec::new();
                    for category in categories.iter().filter(|c| is_radio_category(&c.name)) {
                        models.extend(catalog.models_for(&category.id).await?);
                    }
                    Ok(models)
                }
            })
            .await
    }

    /// Deletes a brand and everything under it as a sequence of independent
    /// calls: models, then categories, then the brand. There is no rollback;
    /// the first failure aborts the sequence and reports how many child rows
    /// are already gone. Child listings bypass the cache so the sweep sees
    /// live state.
    pub async fn delete_brand_cascade(&self, brand_id: &str) -> Result<CascadeOutcome> {
        let mut deleted = 0usize;
        let mut outcome = CascadeOutcome {
            categories_deleted: 0,
            models_deleted: 0,
        };

        let categories: Vec<Category> = self
            .store
            .select(Category::TABLE, &Query::all().eq("brand_id", brand_id))
            .await
            .map_err(|e| cascade_abort(deleted, e))?;

        for category in &categories {
            let models: Vec<Model> = self
                .store
                .select(Model::TABLE, &Query::all().eq("category_id", &category.id))
                .await
                .map_err(|e| cascade_abort(deleted, e))?;
            for model in &models {
                self.models
                    .delete(&model.id)
                    .await
                    .map_err(|e| cascade_abort(deleted, e))?;
                deleted += 1;
                outcome.models_deleted += 1;
            }
            self.categories
                .delete(&category.id)
                .await
                .map_err(|e| cascade_abort(deleted, e))?;
            deleted += 1;
            outcome.categories_deleted += 1;
        }

        self.brands
            .delete(brand_id)
            .await
            .map_err(|e| cascade_abort(deleted, e))?;
        Ok(outcome)
    }
}

fn cascade_abort(deleted: usize, source: Error) -> Error {
    error!(deleted, %source, "cascade delete aborted; store left partially deleted");
    Error::CascadeAborted {
        deleted,
        source: Box::new(source),
    }
}

/// Expand/collapse bookkeeping for the catalog browser. Expanding a row is
/// the trigger for [`Catalog::categories_for`] / [`Catalog::models_for`];
/// collapsing only flips the flag and never evicts what was loaded.
#[derive(Debug, Default)]
pub struct TreeState {
    expanded_brands: HashSet<Id>,
    expanded_categories: HashSet<Id>,
}

impl TreeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips a brand row; returns true when the row is now expanded and its
    /// categories should be loaded.
    pub fn toggle_brand(&mut self, id: &str) -> bool {
        if self.expanded_brands.remove(id) {
            false
        } else {
            self.expanded_brands.insert(id.to_string());
            true
        }
    }

    pub fn toggle_category(&mut self, id: &str) -> bool {
        if self.expanded_categories.remove(id) {
            false
        } else {
            self.expanded_categories.insert(id.to_string());
            true
        }
    }

    pub fn brand_expanded(&self, id: &str) -> bool {
        self.expanded_brands.contains(id)
    }

    pub fn category_expanded(&self, id: &str) -> bool {
        self.expanded_categories.contains(id)
    }
}
