mod common;

use common::*;
use riva::catalog::TreeState;
use riva::Error;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn reexpanding_a_brand_reuses_the_cached_subtree() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/categories"))
        .and(query_param("brand_id", "eq.b1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([category_json("c1", "b1", "Portable Radios")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    let mut tree = TreeState::new();

    if tree.toggle_brand("b1") {
        fleet.catalog.categories_for("b1").await.unwrap();
    }
    assert!(!tree.toggle_brand("b1")); // collapse: nothing evicted
    if tree.toggle_brand("b1") {
        // re-expand within the fresh window: served from cache, one GET total
        let categories = fleet.catalog.categories_for("b1").await.unwrap();
        assert_eq!(categories.len(), 1);
    }
}

#[tokio::test]
async fn brand_filter_keeps_only_radio_relevant_brands() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/brands"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            brand_json("b1", "Motorola"),
            brand_json("b2", "Peltor")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/categories"))
        .and(query_param("brand_id", "eq.b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            category_json("c1", "b1", "PORTABLE radios"),
            category_json("c2", "b1", "Chargers")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/categories"))
        .and(query_param("brand_id", "eq.b2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([category_json("c3", "b2", "Headsets")])),
        )
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    let brands = fleet.catalog.brands_with_radio_categories().await.unwrap();
    assert_eq!(brands.len(), 1);
    assert_eq!(brands[0].name, "Motorola");
}

#[tokio::test]
async fn radio_models_come_only_from_radio_categories() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/categories"))
        .and(query_param("brand_id", "eq.b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            category_json("c1", "b1", "Mobile radios"),
            category_json("c2", "b1", "Chargers")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/models"))
        .and(query_param("category_id", "eq.c1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([model_json("m1", "c1", "DM4600")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    // the non-radio category's models are never requested
    Mock::given(method("GET"))
        .and(path("/rest/v1/models"))
        .and(query_param("category_id", "eq.c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    let models = fleet.catalog.radio_models_by_brand("b1").await.unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "DM4600");
}

#[tokio::test]
async fn catalog_stats_issue_three_counts() {
    let server = MockServer::start().await;
    for (table, count) in [("brands", 3), ("categories", 9), ("models", 27)] {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{table}")))
            .and(query_param("select", "count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "count": count }])))
            .expect(1)
            .mount(&server)
            .await;
    }

    let fleet = fleet(&server.uri());
    let stats = fleet.catalog.stats().await.unwrap();
    assert_eq!(stats.total_brands, 3);
    assert_eq!(stats.total_categories, 9);
    assert_eq!(stats.total_models, 27);
}

#[tokio::test]
async fn cascade_deletes_children_then_brand() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/categories"))
        .and(query_param("brand_id", "eq.b1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([category_json("c1", "b1", "Portable Radios")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/models"))
        .and(query_param("category_id", "eq.c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            model_json("m1", "c1", "DP4400"),
            model_json("m2", "c1", "DP4800")
        ])))
        .mount(&server)
        .await;
    for id in ["m1", "m2"] {
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/models"))
            .and(query_param("id", format!("eq.{id}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/categories"))
        .and(query_param("id", "eq.c1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/brands"))
        .and(query_param("id", "eq.b1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    let outcome = fleet.catalog.delete_brand_cascade("b1").await.unwrap();
    assert_eq!(outcome.models_deleted, 2);
    assert_eq!(outcome.categories_deleted, 1);
}

#[tokio::test]
async fn cascade_failure_reports_rows_already_gone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/categories"))
        .and(query_param("brand_id", "eq.b1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([category_json("c1", "b1", "Portable Radios")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/models"))
        .and(query_param("category_id", "eq.c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            model_json("m1", "c1", "DP4400"),
            model_json("m2", "c1", "DP4800")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/models"))
        .and(query_param("id", "eq.m1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/models"))
        .and(query_param("id", "eq.m2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("locked"))
        .mount(&server)
        .await;
    // the brand row must survive an aborted cascade
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/brands"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    let err = fleet.catalog.delete_brand_cascade("b1").await.unwrap_err();
    match err {
        Error::CascadeAborted { deleted, source } => {
            assert_eq!(deleted, 1);
            assert!(matches!(*source, Error::Transport { status: 500, .. }));
        }
        other => panic!("expected cascade abort, got {other:?}"),
    }
}
