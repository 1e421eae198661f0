mod common;

use common::TestApp;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn new_food(name: &str, food_class: &str) -> Value {
    json!({
        "name": name,
        "category": "Fruits",
        "calories": 60,
        "protein": 0.8,
        "carbs": 15,
        "fat": 0.4,
        "food_class": food_class
    })
}

async fn list(app: &TestApp, query: &str) -> Vec<Value> {
    let response = app.get(&format!("/api/foods{}", query)).await;
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

#[tokio::test]
async fn lists_seeded_catalog_sorted_by_name() {
    let app = TestApp::spawn().await;

    let foods = list(&app, "").await;

    assert_eq!(foods.len(), 19);
    let names: Vec<&str> = foods.iter().map(|f| f["name"].as_str().unwrap()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert_eq!(names[0], "Apple");
}

#[tokio::test]
async fn filters_by_category_and_search() {
    let app = TestApp::spawn().await;

    let fast_food = list(&app, "?category=Fast%20Food").await;
    assert_eq!(fast_food.len(), 4);
    assert!(fast_food.iter().all(|f| f["category"] == "Fast Food"));

    let everything = list(&app, "?category=all").await;
    assert_eq!(everything.len(), 19);

    let rice = list(&app, "?search=RICE").await;
    let classes: Vec<&str> = rice.iter().map(|f| f["food_class"].as_str().unwrap()).collect();
    assert_eq!(classes, vec!["brown_rice", "rice"]);

    let fruit_search = list(&app, "?category=Fruit&search=an").await;
    let names: Vec<&str> = fruit_search.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Banana", "Orange"]);
}

#[tokio::test]
async fn unknown_category_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/foods?category=Snacks").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trailing_slash_is_accepted() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/foods/").await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn food_crud_round_trip() {
    let app = TestApp::spawn().await;

    let response = app.post_json("/api/foods", &new_food("Mango", "mango")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["image_url"], "");

    let fetched: Value = app.get(&format!("/api/foods/{}", id)).await.json().await.unwrap();
    assert_eq!(fetched["food_class"], "mango");

    let response = app
        .client
        .put(app.url(&format!("/api/foods/{}", id)))
        .json(&json!({ "calories": 65, "category": "Dessert" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["calories"], 65.0);
    assert_eq!(updated["category"], "Desserts");
    assert_eq!(updated["name"], "Mango");

    let response = app
        .client
        .delete(app.url(&format!("/api/foods/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/foods/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_food_class_conflicts() {
    let app = TestApp::spawn().await;

    let response = app.post_json("/api/foods", &new_food("Green Apple", "apple")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_food_is_rejected() {
    let app = TestApp::spawn().await;

    let mut negative = new_food("Mango", "mango");
    negative["calories"] = json!(-10);
    let response = app.post_json("/api/foods", &negative).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let bad_class = new_food("Mango", "Mango Fruit");
    let response = app.post_json("/api/foods", &bad_class).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut bad_category = new_food("Mango", "mango");
    bad_category["category"] = json!("Snacks");
    let response = app.post_json("/api/foods", &bad_category).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_food_returns_404() {
    let app = TestApp::spawn().await;

    assert_eq!(app.get("/api/foods/99999").await.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .put(app.url("/api/foods/99999"))
        .json(&json!({ "calories": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .delete(app.url("/api/foods/99999"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn renaming_to_a_taken_class_conflicts() {
    let app = TestApp::spawn().await;
    let mango: Value = app
        .post_json("/api/foods", &new_food("Mango", "mango"))
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .client
        .put(app.url(&format!("/api/foods/{}", mango["id"])))
        .json(&json!({ "food_class": "apple" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let unchanged: Value = app
        .get(&format!("/api/foods/{}", mango["id"]))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(unchanged["food_class"], "mango");
}

#[tokio::test]
async fn malformed_id_returns_json_error() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/foods/abc").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}
