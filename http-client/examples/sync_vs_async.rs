//! Times a few blocking requests against the same requests sent asynchronously.
//!
//! ```sh
//! LOG_LEVEL=debug BASE_URL=https://postman-echo.com cargo run --example sync_vs_async
//! ```

use std::time::Instant;

use http_client::{HttpClient, HttpClientResult};
use tracing::{error, info};

const DEFAULT_BASE_URL: &str = "https://postman-echo.com";

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::metadata::LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .init();

    let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    if let Err(err) = run(&base_url) {
        error!(%err, "demo failed");
    }
}

fn run(base_url: &str) -> HttpClientResult<()> {
    let headers = [
        ("Accept", "application/json"),
        ("User-Agent", "http-client sync-vs-async demo"),
    ];

    info!("blocking requests");
    let mut client = HttpClient::new(Some(base_url), headers)?;
    let start = Instant::now();
    for path in ["/delay/1", "/delay/1", "/get?demo=sync"] {
        let response = client.get(path)?;
        info!(path, status = response.status(), bytes = response.body().len(), "done");
    }
    let blocking = start.elapsed();
    info!(elapsed_ms = blocking.as_millis() as u64, "blocking requests finished");

    info!("asynchronous requests, one client each");
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(HttpClient::new(Some(base_url), headers)?);
    }
    let start = Instant::now();
    for (client, path) in clients.iter_mut().zip(["/delay/1", "/delay/1", "/get?demo=async"]) {
        client.get_async(path)?;
    }
    info!(
        dispatched_ms = start.elapsed().as_millis() as u64,
        "requests dispatched, doing other work"
    );
    for client in clients.iter_mut() {
        let response = client.wait()?;
        info!(status = response.status(), body = %response.text(), "collected");
    }
    let concurrent = start.elapsed();
    info!(elapsed_ms = concurrent.as_millis() as u64, "asynchronous requests finished");

    info!("post and put with json bodies");
    client.post("/post", r#"{"test":"data"}"#)?;
    info!(status = client.status_code()?, body = %client.response_text()?, "post");
    client.put_async("/put", r#"{"test":"update"}"#)?;
    client.wait()?;
    info!(status = client.status_code()?, body = %client.response_text()?, "put");

    Ok(())
}
