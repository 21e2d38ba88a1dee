//! Flaky Service Example
//!
//! Demonstrates retrying an unreliable dependency:
//! - retrying a closure with exponential backoff
//! - invoking a method by name on a shared object
//! - telling exhaustion apart from the service's own errors
//!
//! Run with:
//! `cargo run --example flaky_service`

use retrier::prelude::*;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
struct Timeout {
    request: u32,
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request {} timed out", self.request)
    }
}

impl std::error::Error for Timeout {}

#[derive(Debug, Default)]
struct Inventory {
    requests: u32,
    healthy_after: u32,
}

impl Inventory {
    fn stock(&mut self, sku: &str) -> Result<u32, Timeout> {
        self.requests += 1;
        if self.requests <= self.healthy_after {
            return Err(Timeout {
                request: self.requests,
            });
        }
        Ok(sku.len() as u32 * 10)
    }
}

impl Dispatch for Inventory {
    fn methods(table: &mut MethodTable<Self>) {
        table.register("Stock", 1, |inventory: &mut Inventory, call: &Call<'_>| {
            let sku: &String = call.arg(0)?;
            Ok(ReturnValue::from_result(inventory.stock(sku)).into())
        });
    }
}

fn example_retry_closure() {
    println!("\n=== Example 1: Retrying a closure ===");

    let retrier = Retrier::new(Duration::from_millis(20), 5, 2);
    let mut inventory = Inventory {
        healthy_after: 2,
        ..Inventory::default()
    };

    let outcome = retrier.execute_func_named("stock", || inventory.stock("widget"));
    for error in outcome.errors() {
        println!("  earlier failure: {}", error);
    }
    println!("  stock = {:?}", outcome.value());
}

fn example_method_by_name() {
    println!("\n=== Example 2: Invoking a method by name ===");

    let retrier = Retrier::new(Duration::from_millis(10), 4, 2);
    let mut inventory = Inventory {
        healthy_after: 3,
        ..Inventory::default()
    };

    let outcome = retrier.execute_method(&mut inventory, "Stock", args!["gadget".to_string()]);
    match outcome.value() {
        Some(values) => println!(
            "  stock = {:?} after {} failed attempt(s)",
            values[0].downcast_ref::<u32>(),
            outcome.errors().len()
        ),
        None => println!("  no stock: {:?}", outcome.errors()),
    }
    println!("  requests made: {}", inventory.requests);
}

fn example_exhaustion_and_fatal() {
    println!("\n=== Example 3: Exhaustion vs. dispatch faults ===");

    let retrier = Retrier::new(Duration::from_millis(5), 3, 1);
    let mut inventory = Inventory {
        healthy_after: u32::MAX,
        ..Inventory::default()
    };

    let exhausted = retrier.execute_method(&mut inventory, "Stock", args!["bolt".to_string()]);
    if let Some(marker) = exhausted.exhausted() {
        println!("  gave up: {}", marker);
    }

    let missing = retrier.execute_method(&mut inventory, "Restock", args![]);
    if let Some(fault) = missing.fatal() {
        println!("  not retried: {}", fault);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Retrier Examples");
    println!("================");

    example_retry_closure();
    example_method_by_name();
    example_exhaustion_and_fatal();

    println!("\n=== All examples completed successfully! ===");
}
