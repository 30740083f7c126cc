//! End-to-end shopping flow through the running storefront.
//!
//! The remote API is mocked; everything else is the real router, stores and
//! file storage.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use shopfront_integration_tests::{TEST_TOKEN, TestContext, catalog_json, location};

#[tokio::test]
async fn test_login_browse_add_checkout() {
    let ctx = TestContext::start().await;
    ctx.mount_catalog().await;
    ctx.mount_login().await;

    // Guarded page bounces to login, remembering where we were going
    let resp = ctx.get("/products").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login?next=%2Fproducts");

    // Log in and land back on the listing
    let resp = ctx
        .post_form(
            "/login",
            &[
                ("email", "john@mail.com"),
                ("password", "changeme"),
                ("next", "/products"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/products?success=Login%20successful%21");

    let body = ctx.get("/products").await.text().await.unwrap();
    assert!(body.contains("Classic Shirt"));
    assert!(body.contains("Wool Socks"));
    assert!(!body.contains("Placeholder Lamp"));

    // Two shirts, one pair of socks
    ctx.post_form("/cart/add", &[("product_id", "1")]).await;
    ctx.post_form("/cart/add", &[("product_id", "2")]).await;
    ctx.post_form("/cart/add", &[("product_id", "1")]).await;

    let cart: Value = ctx.get("/api/cart").await.json().await.unwrap();
    assert_eq!(cart["item_count"], 3);
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert_eq!(cart["items"][0]["quantity"], 2);

    let summary = ctx.get("/checkout").await.text().await.unwrap();
    assert!(summary.contains("$25.50"));
    assert!(summary.contains("Free"));

    // Simulated payment
    let resp = ctx.post_form("/checkout", &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/products?success=Payment%20successful"));
    assert!(ctx.state.cart().snapshot().is_empty());

    let body = ctx.get("/cart").await.text().await.unwrap();
    assert!(body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_cart_quantity_controls() {
    let ctx = TestContext::start().await;
    ctx.mount_catalog().await;
    ctx.mount_login().await;
    ctx.login().await;

    ctx.post_form("/cart/add", &[("product_id", "2")]).await;
    ctx.post_form("/cart/update", &[("product_id", "2"), ("quantity", "3")])
        .await;

    let cart: Value = ctx.get("/api/cart").await.json().await.unwrap();
    assert_eq!(cart["item_count"], 3);

    // Decrementing to zero drops the line
    let resp = ctx
        .post_form("/cart/update", &[("product_id", "2"), ("quantity", "0")])
        .await;
    assert_eq!(location(&resp), "/cart");

    let cart: Value = ctx.get("/api/cart").await.json().await.unwrap();
    assert_eq!(cart["item_count"], 0);
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_requests_carry_bearer_token() {
    let ctx = TestContext::start().await;
    ctx.mount_login().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_json()))
        .expect(1)
        .mount(&ctx.api)
        .await;

    ctx.login().await;

    let body = ctx.get("/products").await.text().await.unwrap();
    assert!(body.contains("Classic Shirt"));
}

#[tokio::test]
async fn test_api_outage_keeps_page_usable() {
    let ctx = TestContext::start().await;
    ctx.mount_login().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&ctx.api)
        .await;

    ctx.login().await;

    let resp = ctx.get("/products").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("Failed to load products"));
}
