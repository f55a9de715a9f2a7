//! perfkit demo driver
//!
//! Runs a simulated interactive workload against every component on a
//! single-threaded tokio runtime and logs what each one coalesced or saved.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::LocalSet;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perfkit::cache::{Memoizer, TtlCache};
use perfkit::events::{Listener, ListenerList, ListenerRegistry};
use perfkit::render::{BatchOptions, BatchRenderer, MemoryContainer, RenderScheduler};
use perfkit::runtime::{Clock, TokioScheduler};
use perfkit::timing::{Debouncer, Throttler};
use perfkit::Config;

/// Main entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Run the workload on a LocalSet
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "perfkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    config.validate().context("invalid perfkit configuration")?;
    info!(
        "Configuration loaded: cache_ttl={}ms, debounce={}ms, throttle={}ms, batch_size={}, frame={}ms",
        config.cache_ttl_ms,
        config.debounce_delay_ms,
        config.throttle_limit_ms,
        config.batch_size,
        config.frame_interval_ms
    );

    LocalSet::new().run_until(run_workload(config)).await
}

async fn run_workload(config: Config) -> anyhow::Result<()> {
    let scheduler = Rc::new(TokioScheduler::with_frame_interval(config.frame_interval()));
    let catalog = products(1000);

    // Incremental render of the full catalog
    let container = Rc::new(RefCell::new(MemoryContainer::new()));
    let renderer = BatchRenderer::from_config(scheduler.clone(), &config)?;
    let (done_tx, done_rx) = oneshot::channel();
    let started = scheduler.now_ms();
    renderer.render(
        container.clone(),
        catalog.clone(),
        |item: &Value| format!("<tr><td>{}</td><td>{}</td></tr>", item["name"], item["price"]),
        BatchOptions::new().on_complete(move || {
            let _ = done_tx.send(());
        }),
    )?;
    done_rx.await.context("batch render dropped its completion callback")?;
    info!(
        rows = container.borrow().rows().len(),
        appends = container.borrow().append_count(),
        elapsed_ms = scheduler.now_ms() - started,
        "Catalog rendered"
    );

    // Coalesced renders reading through the TTL cache
    let cache = Rc::new(RefCell::new(TtlCache::from_config(scheduler.clone(), &config)));
    let renders = RenderScheduler::new(scheduler.clone());
    let loads = Rc::new(RefCell::new(0u32));
    for _ in 0..5 {
        let cache = Rc::clone(&cache);
        let loads = Rc::clone(&loads);
        renders.queue_render("summary", move || {
            let cached = cache.borrow_mut().get("summary");
            if cached.is_none() {
                *loads.borrow_mut() += 1;
                cache.borrow_mut().set("summary", "1000 products".to_string());
            }
            Ok(())
        });
    }
    tokio::time::sleep(config.frame_interval() * 2).await;
    info!(
        loads = *loads.borrow(),
        render = %serde_json::to_string(&renders.stats())?,
        cache = %serde_json::to_string(&cache.borrow().stats())?,
        "Summary rendered"
    );

    // Debounced search box
    let debouncer = Debouncer::from_config(scheduler.clone(), &config);
    let searches = Rc::new(RefCell::new(Vec::new()));
    for query in ["w", "wi", "wid", "widg", "widget"] {
        let searches = Rc::clone(&searches);
        debouncer.schedule("search", move || searches.borrow_mut().push(query));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(config.debounce_delay() * 2).await;
    info!(keystrokes = 5, searches = ?searches.borrow(), "Search debounced");

    // Throttled scroll stream
    let scroll_positions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&scroll_positions);
    let on_scroll = Throttler::from_config(scheduler.clone(), &config)
        .wrap(move |offset: u32| sink.borrow_mut().push(offset));
    for offset in (0..400).step_by(10) {
        on_scroll.call(offset);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(config.throttle_limit() * 2).await;
    info!(events = 40, handled = scroll_positions.borrow().len(), "Scroll throttled");

    // Memoized price formatting
    let memoizer = Memoizer::from_config(scheduler.clone(), &config)?;
    let format_price = memoizer.memoize(|cents: &u64| format!("${}.{:02}", cents / 100, cents % 100));
    for item in &catalog {
        let cents = item["price"].as_u64().unwrap_or_default();
        format_price.call(&cents);
    }
    info!(stats = %serde_json::to_string(&format_price.stats())?, "Prices formatted");

    // Listener dedup
    let mut registry = ListenerRegistry::new();
    let mut toolbar: ListenerList<Value> = ListenerList::new();
    let on_click = Listener::new("onToolbarClick", |event: &Value| {
        tracing::debug!(%event, "Toolbar clicked");
    });
    let attached = (0..3)
        .filter(|_| registry.add_unique(&mut toolbar, "click", &on_click, None))
        .count();
    let dispatched = toolbar.dispatch("click", &json!({ "button": "save" }));
    info!(attempts = 3, attached, dispatched, "Listeners deduplicated");

    Ok(())
}

fn products(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "id": format!("p{i}"),
                "sku": format!("SKU-{:05}", i),
                "name": format!("Widget {i}"),
                "price": 499 + (i % 20) * 100,
            })
        })
        .collect()
}
