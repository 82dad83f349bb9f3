//! Queries an order's status and creates an order with a form body.
//!
//! Run with: `cargo run --example order_status -- https://sb-openapi.example.com`

use http::HeaderMap;
use nap::{CallContext, Client, Error, FormBody};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct StatusQuery {
    app_id: i32,
    app_trans_id: String,
    mac: String,
}

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct OrderStatus {
    return_code: i32,
    return_message: String,
    zp_trans_id: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("nap=debug,order_status=info")
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let proxy_url = std::env::var("NAP_PROXY_URL").unwrap_or_default();

    let client = Client::builder()
        .base_url(base_url)
        .proxy_url(proxy_url)
        .timeout(Duration::from_secs(30))
        .user_agent("nap-demo/0.1")
        .build()?;

    let ctx = CallContext::background().with_timeout(Duration::from_secs(10));
    let query = StatusQuery {
        app_id: 1,
        app_trans_id: "210822_001".to_string(),
        mac: "demo-mac".to_string(),
    };

    println!("=== GET /orders/status ===");
    let mut status = OrderStatus::default();
    match client
        .get(&ctx, "/orders/status", &query, &HeaderMap::new(), Some(&mut status))
        .await
    {
        Ok(code) => println!("{}: {:?}", code, status),
        Err(e) => println!("failed with {}: {}", e.status(), e),
    }

    println!("=== POST /orders/create ===");
    let mut headers = HeaderMap::new();
    match client
        .post(
            &ctx,
            "/orders/create",
            &FormBody::new(&query),
            &mut headers,
            None::<&mut OrderStatus>,
        )
        .await
    {
        Ok(code) => println!("{} (sent with {:?})", code, headers.get("content-type")),
        Err(e) => println!("failed with {}: {}", e.status(), e),
    }

    Ok(())
}
