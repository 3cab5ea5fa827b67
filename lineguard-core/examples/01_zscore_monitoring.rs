//! Z-Score Monitoring Example
//!
//! The smallest useful LineGuard setup: one pressure sensor, the default
//! configuration, and a simulated spike.
//!
//! ## What You'll Learn
//!
//! - Registering sensors in a catalog
//! - Watching a window warm up
//! - Reading verdicts and the anomaly history
//!
//! ## Running the Example
//!
//! ```bash
//! RUST_LOG=debug cargo run --example 01_zscore_monitoring
//! ```

use lineguard_core::{
    time::{FixedTime, TimeSource},
    EngineConfig, EngineError, InMemoryCatalog, IngestionPipeline, SensorProfile, SensorReading,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("LineGuard Z-Score Monitoring Example");
    println!("====================================\n");

    let catalog = InMemoryCatalog::new();
    catalog.register("press_01", SensorProfile::generic());

    let config = EngineConfig::default();
    println!(
        "Window {} samples, evaluating after {}, threshold {}\n",
        config.defaults.window_size,
        config.defaults.effective_min_samples(),
        config.defaults.threshold
    );

    let pipeline = IngestionPipeline::new(catalog, config);
    let mut clock = FixedTime::new(1_700_000_000_000);

    // Steady pressure around 6 bar with a slow wobble, then a spike
    let mut values: Vec<f64> = (0..30).map(|i| 6.0 + 0.05 * (i as f64 * 0.9).sin()).collect();
    values.push(7.5);
    values.extend((0..5).map(|i| 6.0 + 0.05 * (i as f64).cos()));

    for value in values {
        let reading = SensorReading::new("press_01", clock.now(), value);
        clock.advance(1000);

        match pipeline.ingest(reading) {
            Ok(point) => {
                let verdict = match (point.z_score, point.is_anomaly) {
                    (None, _) => "warming up".to_string(),
                    (Some(z), true) => format!("ANOMALY z={:+.2}", z),
                    (Some(z), false) => format!("ok      z={:+.2}", z),
                };
                println!("  {:.3} bar  mean {:.3}  {}", point.reading.value, point.model_avg, verdict);
            }
            Err(e) => println!("  rejected: {}", e),
        }
    }

    println!("\nRejections:");
    for reading in [
        SensorReading::new("press_99", clock.now(), 6.0),
        SensorReading::new("press_01", clock.now(), f64::NAN),
    ] {
        match pipeline.ingest(reading) {
            Err(e @ EngineError::UnknownSensor(_)) | Err(e @ EngineError::InvalidReading { .. }) => {
                println!("  {}", e)
            }
            other => println!("  unexpected: {:?}", other),
        }
    }

    println!("\nRecent anomalies:");
    for record in pipeline.recent_anomalies("press_01") {
        println!("  t={} value={:.3} z={:+.2}", record.timestamp, record.value, record.z_score);
    }

    if let Ok(status) = pipeline.sensor_status("press_01") {
        println!(
            "\nModel {}% complete, anomaly ratio {:.2}",
            status.model_completeness, status.anomaly_ratio
        );
    }
}
