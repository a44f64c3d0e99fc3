//! End-to-end tablet wiring: document store, broker transport, and driver.
//!
//! Seeds a small catalog into an in-memory store, connects to the broker
//! from `TROLI_BROKER_URL` (or the default), binds cart #007 and waits for
//! scans and the payment confirmation.
//!
//! ```sh
//! TROLI_BROKER_URL=ws://localhost:9001/mqtt cargo run --example tablet
//! # then, from anywhere:
//! mosquitto_pub -t 007/IDProducts -m '"A01"'
//! mosquitto_pub -t 007/payment-status -m '{"status":"paid","paymentMethod":"cash","totalAmount":50000}'
//! ```

use std::sync::Arc;

use troli_core::{Money, Product};
use troli_store::{MemoryStore, ProductRepository};
use troli_sync::{
    CartEventEmitter, CatalogResolver, DriverConfig, MqttTransport, SharedCart, SyncConfig,
    SyncDriver,
};

struct ConsoleEmitter;

impl CartEventEmitter for ConsoleEmitter {
    fn payment_confirmed(&self, method: Option<&str>, total_amount: Option<u64>) {
        println!(
            "== PAID == method: {}, amount: {}",
            method.unwrap_or("-"),
            total_amount.map(|a| a.to_string()).unwrap_or_else(|| "-".into())
        );
    }

    fn product_added(&self, product: &Product, quantity: u32) {
        println!("+ {} x{} ({})", product.name, quantity, product.price);
    }

    fn resolution_failed(&self, product_id: &str) {
        println!("? unknown product id: {}", product_id);
    }

    fn store_unavailable(&self, detail: &str) {
        println!("! store unavailable: {}", detail);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,troli_sync=debug".into()),
        )
        .init();

    let config = SyncConfig::load_or_default(None)?;

    // Demo catalog
    let store = MemoryStore::new();
    let products = ProductRepository::new(store.clone());
    products
        .upsert(&Product::new("A01", "Teh Botol", Money::from_units(4_000)))
        .await?;
    products
        .upsert(&Product::new("B01", "Kopi Susu", Money::from_units(18_000)))
        .await?;

    let transport = MqttTransport::new(config.transport_config());
    transport.connect().await?;

    let cart = SharedCart::new();
    let driver = SyncDriver::spawn(
        transport.clone(),
        cart.clone(),
        CatalogResolver::new(store),
        Arc::new(ConsoleEmitter),
        DriverConfig {
            publish_interval: config.publish_interval(),
            payer_id: "demo".to_string(),
        },
    );

    let session = driver.bind(7)?;
    println!("cart #{} live; scan on {}/IDProducts", session, session);

    tokio::signal::ctrl_c().await?;

    driver.shutdown();
    transport.disconnect().await;
    Ok(())
}
