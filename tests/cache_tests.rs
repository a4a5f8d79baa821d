mod common;

use common::*;
use riva::models::CategoryPatch;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn repeated_list_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/radios"))
        .and(query_param("select", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([radio_json("1001")])))
        .expect(1)
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    for _ in 0..3 {
        let radios = fleet.radios.list_all().await.unwrap();
        assert_eq!(radios.len(), 1);
    }
}

#[tokio::test]
async fn mutation_invalidates_list_and_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/accessories"))
        .and(query_param("select", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([accessory_json("a1")])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/accessories"))
        .and(query_param("id", "eq.a1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    fleet.accessories.list_all().await.unwrap();
    fleet.accessories.list_all().await.unwrap(); // cached, no second GET yet
    fleet.accessories.delete("a1").await.unwrap();
    fleet.accessories.list_all().await.unwrap(); // second GET after invalidation
}

// A category mutation must refresh the categories of *every* brand, not only
// the brand whose subtree was touched.
#[tokio::test]
async fn category_update_invalidates_all_brand_scopes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/categories"))
        .and(query_param("brand_id", "eq.b1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([category_json("c1", "b1", "Portable Radios")])),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/categories"))
        .and(query_param("brand_id", "eq.b2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([category_json("c2", "b2", "Chargers")])),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/categories"))
        .and(query_param("id", "eq.c1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([category_json("c1", "b1", "Mobile Radios")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    fleet.catalog.categories_for("b1").await.unwrap();
    fleet.catalog.categories_for("b2").await.unwrap();

    let patch = CategoryPatch {
        name: Some("Mobile Radios".into()),
        ..Default::default()
    };
    fleet.catalog.categories.update("c1", &patch).await.unwrap();

    // both scopes re-fetch after the family-wide sweep
    fleet.catalog.categories_for("b1").await.unwrap();
    fleet.catalog.categories_for("b2").await.unwrap();
}

#[tokio::test]
async fn failed_read_is_retried_twice_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/issues"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue_json("u1", "radio", "1001")])))
        .expect(1)
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    let issues = fleet.issues.list_all().await.unwrap();
    assert_eq!(issues.len(), 1);
}

#[tokio::test]
async fn read_fails_after_exhausting_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/issues"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3) // initial attempt + 2 retries
        .mount(&server)
        .await;

    let fleet = fleet(&server.uri());
    let err = fleet.issues.list_all().await.unwrap_err();
    assert!(matches!(err, riva::Error::Transport { status: 500, .. }));
}
