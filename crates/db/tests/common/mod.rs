//! Fixtures shared by the db integration tests.

#![allow(dead_code)]

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgPool;
use sweetshop_core::types::{DbId, Quantity};
use sweetshop_db::models::sweet::CreateSweet;
use sweetshop_db::models::user::CreateUser;
use sweetshop_db::repositories::{CartRepo, SweetRepo, UserRepo};

pub fn price(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Insert a user. The hash is never verified in these tests.
pub async fn user(pool: &PgPool, username: &str) -> DbId {
    let input = CreateUser {
        username: username.to_string(),
        password_hash: "$argon2id$not-a-real-hash".to_string(),
        role: "user".to_string(),
    };
    UserRepo::create(pool, &input).await.unwrap().id
}

pub async fn sweet(pool: &PgPool, name: &str, unit_price: &str, quantity: Quantity) -> DbId {
    let input = CreateSweet {
        name: name.to_string(),
        category: "Test".to_string(),
        price: price(unit_price),
        quantity,
    };
    SweetRepo::create(pool, &input).await.unwrap().id
}

pub async fn stock(pool: &PgPool, sweet_id: DbId) -> Quantity {
    SweetRepo::find_by_id(pool, sweet_id)
        .await
        .unwrap()
        .expect("sweet should exist")
        .quantity
}

/// Units of `sweet_id` held across every cart.
pub async fn reserved(pool: &PgPool, sweet_id: DbId) -> i64 {
    CartRepo::reservations_for_sweet(pool, sweet_id)
        .await
        .unwrap()
        .1
}
