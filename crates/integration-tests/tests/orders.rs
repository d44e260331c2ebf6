//! Order endpoints over HTTP.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use sundry_integration_tests::{TestApp, json_body};

async fn create_order(app: &TestApp, token: &str, body: &Value) -> reqwest::Response {
    app.client
        .post(app.url("/orders"))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .unwrap()
}

async fn list_orders(app: &TestApp, token: &str) -> Value {
    let resp = app
        .client
        .get(app.url("/orders"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await
}

async fn cancel_order(app: &TestApp, token: &str, id: &str) -> reqwest::Response {
    app.client
        .delete(app.url(&format!("/orders/{id}/cancel")))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
}

fn widget_and_gadget() -> Value {
    json!({
        "products": [
            { "product_name": "Widget", "product_price": 9.99, "quantity": 2 },
            { "product_name": "Gadget", "unit_price": "4.50", "quantity": 1 }
        ]
    })
}

#[tokio::test]
async fn test_orders_require_token() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(json_body(resp).await["message"].as_str().is_some());

    let resp = app
        .client
        .get(app.url("/orders"))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_cannot_access_orders() {
    let app = TestApp::spawn().await;
    app.register("refresh@shop.test").await;
    let tokens = app
        .login("refresh@shop.test", sundry_integration_tests::TEST_PASSWORD)
        .await;

    let resp = app
        .client
        .get(app.url("/orders"))
        .bearer_auth(tokens["refresh_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_list_orders() {
    let app = TestApp::spawn().await;
    let alice = app.signed_up("alice@shop.test").await;
    let bob = app.signed_up("bob@shop.test").await;

    let resp = create_order(&app, &alice, &widget_and_gadget()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["message"], "Order created");

    let order = &body["data"];
    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["product_name"], "Widget");
    assert_eq!(items[0]["product_price"], "9.99");
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[1]["product_name"], "Gadget");
    assert_eq!(items[1]["product_price"], "4.50");
    assert!(order["created_at"].as_str().is_some());

    let listed = list_orders(&app, &alice).await;
    let orders = listed["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], order["id"]);
    assert_eq!(orders[0]["user"], order["user"]);

    let listed = list_orders(&app, &bob).await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_order_rejects_empty_payload() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("empty@shop.test").await;

    for body in [json!({}), json!({ "products": [] })] {
        let resp = create_order(&app, &token, &body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(resp).await["message"],
            "Order creation failed, no input data"
        );
    }
}

#[tokio::test]
async fn test_create_order_with_sibling_field_and_no_items() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("sibling@shop.test").await;

    let resp = create_order(&app, &token, &json!({ "note": "gift", "products": [] })).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_order_reports_field_errors() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("invalid@shop.test").await;

    let resp = create_order(
        &app,
        &token,
        &json!({
            "products": [
                { "product_name": "Widget", "product_price": "9.99", "quantity": 1 },
                { "product_name": "", "product_price": "-1", "quantity": "many" }
            ]
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = json_body(resp).await;
    assert_eq!(
        body["message"],
        "Order creation failed, please check the submitted data"
    );
    let errors = body["errors"].as_object().unwrap();
    assert!(errors.contains_key("products[1].product_name"));
    assert!(errors.contains_key("products[1].product_price"));
    assert!(errors.contains_key("products[1].quantity"));
    assert!(!errors.keys().any(|k| k.starts_with("products[0]")));

    // Nothing was stored.
    assert_eq!(app.store.order_item_count().await, 0);
}

#[tokio::test]
async fn test_cancel_order() {
    let app = TestApp::spawn().await;
    let alice = app.signed_up("owner@shop.test").await;
    let mallory = app.signed_up("mallory@shop.test").await;

    let body = json_body(create_order(&app, &alice, &widget_and_gadget()).await).await;
    let id = body["data"]["id"].to_string();

    let resp = cancel_order(&app, &mallory, &id).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(resp).await["message"],
        "Order does not exist or you do not have permission to modify it"
    );
    assert_eq!(list_orders(&app, &alice).await["data"].as_array().unwrap().len(), 1);

    let resp = cancel_order(&app, &alice, &id).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["message"], "Order cancelled");
    assert!(list_orders(&app, &alice).await["data"].as_array().unwrap().is_empty());
    assert_eq!(app.store.order_item_count().await, 0);

    let resp = cancel_order(&app, &alice, &id).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_with_non_numeric_id() {
    let app = TestApp::spawn().await;
    let token = app.signed_up("nonnumeric@shop.test").await;

    let resp = cancel_order(&app, &token, "abc").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
