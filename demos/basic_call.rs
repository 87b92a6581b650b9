//! Basic example demonstrating typed GET and POST requests.
//!
//! This example shows how to:
//! - Resolve a service root URL from the environment
//! - Make GET requests decoding JSON:API documents
//! - Make POST requests sending JSON:API documents
//! - Retry transport failures and attach tenant headers
//!
//! Run with: `INVENTORY_SERVICE_URL=http://localhost:8080/api/ cargo run --example basic_call`

use courier::codec::Resource;
use courier::config::{add_header_decorator, set_retries};
use courier::service_url::root_url;
use courier::tenant::{tenant_header_decorator, Tenant};
use courier::{Client, Error};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Item {
    name: String,
    quantity: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("courier=debug,basic_call=info")
        .init();

    let client = Client::builder().base_url(root_url("inventory"))?.build()?;
    let tenant = Tenant::new(Uuid::new_v4(), "GMS", 83, 1).ok();

    println!("=== GET Request Example ===");
    let response = client
        .get::<Resource<Item>>("items/1")
        .configure(set_retries(3))
        .configure(add_header_decorator(tenant_header_decorator(tenant.clone())))
        .send()
        .await?;

    println!("Item ID: {:?}", response.data.id);
    println!("Name: {}", response.data.attributes.name);
    println!("Request latency: {:?}", response.latency);
    println!("Attempts: {}", response.attempts);
    println!();

    println!("=== POST Request Example ===");
    let new_item = Resource::new(
        "items",
        Item {
            name: "widget".to_string(),
            quantity: 3,
        },
    );

    match client
        .post::<Resource<Item>, _>("items", new_item)
        .configure(add_header_decorator(tenant_header_decorator(tenant)))
        .execute()
        .await
    {
        Ok(created) => println!("Created item ID: {:?}", created.id),
        Err(Error::BadRequest) => println!("Server rejected the item"),
        Err(e) => return Err(e),
    }

    Ok(())
}
