mod common;

use common::{test_config, token_for, with_auth, TestApp};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn apple() -> Value {
    json!({ "food_name": "Apple", "calories": 95, "protein": 0.5, "carbs": 25, "fat": 0.3 })
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::spawn_with(with_auth(test_config())).await;

    let response = app.get("/api/nutrition/food").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Authorization header missing or invalid");

    let response = app.post_json("/api/nutrition/food", &apple()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/api/fooddb?search=apple").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_tokens_are_rejected() {
    let app = TestApp::spawn_with(with_auth(test_config())).await;

    let response = app
        .client
        .get(app.url("/api/nutrition/food"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_reads_stay_public() {
    let app = TestApp::spawn_with(with_auth(test_config())).await;

    assert_eq!(app.get("/api/foods").await.status(), StatusCode::OK);
    assert_eq!(app.get("/health").await.status(), StatusCode::OK);

    let response = app
        .post_json(
            "/api/foods",
            &json!({
                "name": "Mango", "category": "Fruits", "calories": 60,
                "protein": 0.8, "carbs": 15, "fat": 0.4, "food_class": "mango"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn entries_are_scoped_to_their_owner() {
    let app = TestApp::spawn_with(with_auth(test_config())).await;
    let alice = token_for("alice");
    let bob = token_for("bob");

    let response = app
        .client
        .post(app.url("/api/nutrition/food"))
        .bearer_auth(&alice)
        .json(&apple())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry: Value = response.json().await.unwrap();

    let alice_entries: Vec<Value> = app
        .client
        .get(app.url("/api/nutrition/food"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(alice_entries.len(), 1);

    let bob_entries: Vec<Value> = app
        .client
        .get(app.url("/api/nutrition/food"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(bob_entries.is_empty());

    let response = app
        .client
        .delete(app.url(&format!(
            "/api/nutrition/food/{}",
            entry["id"].as_str().unwrap()
        )))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
