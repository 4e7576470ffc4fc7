#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Once;

use flate2::write::GzEncoder;
use flate2::Compression;
use storm_events::Config;

static TRACING: Once = Once::new();

/// Install a test subscriber once per test binary; honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("storm_events=debug")),
            )
            .with_test_writer()
            .init();
    });
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("Failed to read fixture {name}: {e}"))
}

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).expect("Failed to compress fixture");
    encoder.finish().expect("Failed to compress fixture")
}

/// Config pointing every service at the mock server.
pub fn mock_config(server: &mockito::Server) -> Config {
    Config::with_base_url(&server.url())
}
