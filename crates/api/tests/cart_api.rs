//! HTTP-level integration tests for the `/api/cart` resource.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, delete_auth, get_auth, post_auth, post_json_auth, put_auth, put_json_auth,
};
use futures::future::join_all;
use sqlx::PgPool;

fn add_body(sweet_id: i64, quantity: i32) -> serde_json::Value {
    serde_json::json!({"sweet_id": sweet_id, "quantity": quantity})
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_add_reserves_stock(pool: PgPool) {
    let token = common::user_token(&pool, "alice").await;
    let id = common::create_sweet(&pool, "Gummy Bears", "4.99", 20).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/cart/add", add_body(id, 5), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Added to cart");
    assert_eq!(json["quantity"], 5);
    assert_eq!(json["remaining_stock"], 15);

    // Quantity defaults to one.
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/cart/add",
        serde_json::json!({"sweet_id": id}),
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["quantity"], 6);
    assert_eq!(json["remaining_stock"], 14);

    let app = common::build_test_app(pool.clone());
    let cart = body_json(get_auth(app, "/api/cart", &token).await).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["sweet_name"], "Gummy Bears");
    assert_eq!(cart["items"][0]["sweet_price"], "4.99");
    assert_eq!(cart["items"][0]["quantity"], 6);
    assert_eq!(cart["items"][0]["line_total"], "29.94");
    assert_eq!(cart["total_price"], "29.94");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_add_errors(pool: PgPool) {
    let token = common::user_token(&pool, "alice").await;
    let sold_out = common::create_sweet(&pool, "Candy Corn", "2.99", 0).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/cart/add", add_body(sold_out, 1), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INSUFFICIENT_STOCK");

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/cart/add", add_body(sold_out, 0), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/cart/add", add_body(999_999, 1), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let app = common::build_test_app(pool);
    let cart = body_json(get_auth(app, "/api/cart", &token).await).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
    assert_eq!(cart["total_price"], "0");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_quantity_and_remove(pool: PgPool) {
    let token = common::user_token(&pool, "alice").await;
    let id = common::create_sweet(&pool, "Toffees", "5.99", 10).await;

    let app = common::build_test_app(pool.clone());
    let added = body_json(post_json_auth(app, "/api/cart/add", add_body(id, 4), &token).await).await;
    let line_id = added["line_id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = put_auth(
        app,
        &format!("/api/cart/{line_id}/quantity?new_quantity=7"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Quantity updated");
    assert_eq!(json["remaining_stock"], 3);

    let app = common::build_test_app(pool.clone());
    let response = put_auth(
        app,
        &format!("/api/cart/{line_id}/quantity?new_quantity=11"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::stock(&pool, id).await, 3);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/cart/{line_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["released"], 7);
    assert_eq!(json["remaining_stock"], 10);

    let app = common::build_test_app(pool);
    let response = delete_auth(app, &format!("/api/cart/{line_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_to_zero_removes_line(pool: PgPool) {
    let token = common::user_token(&pool, "alice").await;
    let id = common::create_sweet(&pool, "Marshmallows", "3.49", 25).await;

    let app = common::build_test_app(pool.clone());
    let added = body_json(post_json_auth(app, "/api/cart/add", add_body(id, 5), &token).await).await;
    let line_id = added["line_id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = put_auth(
        app,
        &format!("/api/cart/{line_id}/quantity?new_quantity=0"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Item removed from cart");
    assert_eq!(json["quantity"], 0);
    assert_eq!(json["remaining_stock"], 25);

    let app = common::build_test_app(pool);
    let response = put_auth(app, &format!("/api/cart/{line_id}/quantity"), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "new_quantity query parameter is required");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cannot_touch_another_users_line(pool: PgPool) {
    let alice = common::user_token(&pool, "alice").await;
    let mallory = common::user_token(&pool, "mallory").await;
    let id = common::create_sweet(&pool, "Swedish Fish", "4.49", 35).await;

    let app = common::build_test_app(pool.clone());
    let added = body_json(post_json_auth(app, "/api/cart/add", add_body(id, 3), &alice).await).await;
    let line_id = added["line_id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/cart/{line_id}"), &mallory).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let app = common::build_test_app(pool.clone());
    let response = put_auth(
        app,
        &format!("/api/cart/{line_id}/quantity?new_quantity=1"),
        &mallory,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let app = common::build_test_app(pool.clone());
    let cart = body_json(get_auth(app, "/api/cart", &mallory).await).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
    assert_eq!(common::stock(&pool, id).await, 32);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clear_cart_returns_stock(pool: PgPool) {
    let token = common::user_token(&pool, "alice").await;
    let a = common::create_sweet(&pool, "Malt Balls", "5.99", 25).await;
    let b = common::create_sweet(&pool, "Fudge Squares", "6.49", 14).await;
    for (id, qty) in [(a, 5), (b, 14)] {
        let app = common::build_test_app(pool.clone());
        post_json_auth(app, "/api/cart/add", add_body(id, qty), &token).await;
    }

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, "/api/cart", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Cart cleared");
    assert_eq!(json["lines_removed"], 2);
    assert_eq!(json["units_released"], 19);

    assert_eq!(common::stock(&pool, a).await, 25);
    assert_eq!(common::stock(&pool, b).await, 14);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_checkout(pool: PgPool) {
    let token = common::user_token(&pool, "alice").await;
    let a = common::create_sweet(&pool, "Gummy Bears", "4.99", 20).await;
    let b = common::create_sweet(&pool, "Lollipops", "1.99", 50).await;

    let app = common::build_test_app(pool.clone());
    let response = post_auth(app, "/api/cart/checkout", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "EMPTY_CART");

    for (id, qty) in [(a, 2), (b, 3)] {
        let app = common::build_test_app(pool.clone());
        post_json_auth(app, "/api/cart/add", add_body(id, qty), &token).await;
    }

    let app = common::build_test_app(pool.clone());
    let response = post_auth(app, "/api/cart/checkout", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let receipt = body_json(response).await;
    assert_eq!(receipt["message"], "Purchase successful");
    assert_eq!(receipt["total_items"], 2);
    assert_eq!(receipt["total_units"], 5);
    assert_eq!(receipt["total_price"], "15.95");
    assert_eq!(receipt["items"][0]["name"], "Gummy Bears");
    assert_eq!(receipt["items"][0]["quantity"], 2);

    assert_eq!(common::stock(&pool, a).await, 18);
    assert_eq!(common::stock(&pool, b).await, 47);

    let app = common::build_test_app(pool);
    let cart = body_json(get_auth(app, "/api/cart", &token).await).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleting_a_sweet_empties_carts(pool: PgPool) {
    let admin = common::admin_token(&pool).await;
    let token = common::user_token(&pool, "alice").await;
    let id = common::create_sweet(&pool, "Cotton Candy", "3.99", 28).await;

    let app = common::build_test_app(pool.clone());
    post_json_auth(app, "/api/cart/add", add_body(id, 4), &token).await;

    let app = common::build_test_app(pool.clone());
    let json = body_json(delete_auth(app, &format!("/api/sweets/{id}"), &admin).await).await;
    assert_eq!(json["released_lines"], 1);
    assert_eq!(json["released_units"], 4);

    let app = common::build_test_app(pool);
    let cart = body_json(get_auth(app, "/api/cart", &token).await).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
}

/// Several shoppers race for the last units over HTTP.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_adds_never_oversell(pool: PgPool) {
    let id = common::create_sweet(&pool, "Peppermint Bark", "7.99", 2).await;
    let mut tokens = Vec::new();
    for i in 0..5 {
        tokens.push(common::user_token(&pool, &format!("shopper{i}")).await);
    }

    let requests = tokens.iter().map(|token| {
        let app = common::build_test_app(pool.clone());
        async move { post_json_auth(app, "/api/cart/add", add_body(id, 1), token).await.status() }
    });
    let statuses = join_all(requests).await;

    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let rejected = statuses
        .iter()
        .filter(|s| **s == StatusCode::BAD_REQUEST)
        .count();
    assert_eq!((ok, rejected), (2, 3));
    assert_eq!(common::stock(&pool, id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stock_overwrite_cannot_strand_a_reservation(pool: PgPool) {
    let token = common::user_token(&pool, "alice").await;
    let admin = common::admin_token(&pool).await;
    let id = common::create_sweet(&pool, "Gummy Bears", "4.99", 20).await;

    let app = common::build_test_app(pool.clone());
    let json = body_json(post_json_auth(app, "/api/cart/add", add_body(id, 5), &token).await).await;
    let line_id = json["line_id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/sweets/{id}"),
        serde_json::json!({"quantity": i32::MAX}),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(common::stock(&pool, id).await, 15);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/cart/{line_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["remaining_stock"], 20);
}
