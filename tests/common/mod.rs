#![allow(dead_code)]

use std::time::Duration;

use riva::{Fleet, StoreClient, StoreConfig};
use serde_json::{json, Value};

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Fleet wired to a mock store, short request timeout.
pub fn fleet(base_url: &str) -> Fleet {
    init_tracing();
    let config = StoreConfig::new(base_url, "test-key").with_timeout(Duration::from_secs(5));
    Fleet::new(StoreClient::new(&config).unwrap())
}

pub fn radio_json(id: &str) -> Value {
    json!({
        "id": id,
        "merk": "Motorola",
        "model": "DP4400",
        "type": "Portable",
        "serienummer": format!("SN{id}"),
        "alias": format!("Unit-{id}"),
        "afdeling": "Ops",
        "opmerking": null,
        "registratiedatum": "2024-01-01",
        "created_at": "2024-01-01T08:00:00Z",
        "updated_at": "2024-01-01T08:00:00Z"
    })
}

pub fn accessory_json(id: &str) -> Value {
    json!({
        "id": id,
        "merk": "Motorola",
        "model": "PMNN4544",
        "serienummer": null,
        "alias": null,
        "opmerking": null,
        "created_at": "2024-02-01T08:00:00Z",
        "updated_at": "2024-02-01T08:00:00Z"
    })
}

pub fn brand_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "created_at": "2024-03-01T08:00:00Z",
        "updated_at": "2024-03-01T08:00:00Z"
    })
}

pub fn category_json(id: &str, brand_id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "brand_id": brand_id,
        "name": name,
        "description": null,
        "created_at": "2024-03-01T08:00:00Z",
        "updated_at": "2024-03-01T08:00:00Z"
    })
}

pub fn model_json(id: &str, category_id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "category_id": category_id,
        "name": name,
        "description": null,
        "created_at": "2024-03-01T08:00:00Z",
        "updated_at": "2024-03-01T08:00:00Z"
    })
}

pub fn issue_json(id: &str, item_type: &str, item_id: &str) -> Value {
    json!({
        "id": id,
        "item_type": item_type,
        "item_id": item_id,
        "afdeling": "Ops",
        "issued_to": "J. Janssen",
        "issued_at": "2024-04-01T08:00:00Z",
        "notes": null
    })
}

pub fn installation_json(id: &str, item_type: &str, item_id: &str) -> Value {
    json!({
        "id": id,
        "item_type": item_type,
        "item_id": item_id,
        "vehicle_merk": "Toyota",
        "vehicle_model": "Hilux",
        "vehicle_afdeling": "Ops",
        "installed_at": "2024-05-01T08:00:00Z",
        "notes": null
    })
}

pub fn history_json(id: &str, radio_id: &str, action: &str, old: &str, new: &str) -> Value {
    json!({
        "id": id,
        "radio_id": radio_id,
        "action": action,
        "description": format!("gewijzigd van {old} naar {new}"),
        "timestamp": "2024-06-01T08:00:00Z",
        "details": {
            "old_value": old,
            "new_value": new
        }
    })
}
