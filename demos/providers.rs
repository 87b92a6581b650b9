//! Example composing providers over a collection request.
//!
//! This example shows how to:
//! - Turn a request into a provider with a per-element transform and filters
//! - Materialize a provider once and derive several views from it
//!
//! Run with: `INVENTORY_SERVICE_URL=http://localhost:8080/api/ cargo run --example providers`

use courier::codec::Resource;
use courier::provider::{filter, slice_provider};
use courier::service_url::root_url;
use courier::{Client, Error};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ItemAttributes {
    name: String,
    quantity: u32,
}

#[derive(Debug, Clone)]
struct Item {
    id: u32,
    name: String,
    quantity: u32,
}

fn item(resource: Resource<ItemAttributes>) -> Result<Item, Error> {
    let id = resource
        .id
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(Error::transform)?;
    Ok(Item {
        id,
        name: resource.attributes.name,
        quantity: resource.attributes.quantity,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("courier=debug,providers=info")
        .init();

    let client = Client::builder().base_url(root_url("inventory"))?.build()?;

    let in_stock = slice_provider(
        client.get("items"),
        item,
        vec![filter(|i: &Item| i.quantity > 0)],
    );

    // One network call; every view below reuses its result.
    let in_stock = in_stock.materialize().await;

    let names = in_stock.clone().slice_map(|i| Ok(i.name)).get().await?;
    println!("In stock: {}", names.join(", "));

    let total: u32 = in_stock.get().await?.iter().map(|i| i.quantity).sum();
    println!("Total units: {}", total);

    match in_stock.first().get().await {
        Ok(first) => println!("First item: #{} {}", first.id, first.name),
        Err(Error::NotFound) => println!("Nothing in stock"),
        Err(e) => return Err(e),
    }

    Ok(())
}
