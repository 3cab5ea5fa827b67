//! Production Line Example
//!
//! Several machines on one line, each with a generic and a vibration
//! sensor, fed from worker threads into one shared pipeline. Points are
//! collected in a [`MemorySink`] as they would be written to storage.
//!
//! Configuration comes from the environment (`Z_SCORE_THRESHOLD`,
//! `MODEL_WINDOW_SIZE`, `VIBRATION_Z_SCORE_THRESHOLD`, ...); unset
//! variables fall back to defaults with a warning.
//!
//! ## Running the Example
//!
//! ```bash
//! VIBRATION_Z_SCORE_THRESHOLD=3 cargo run --example 02_vibration_line
//! ```

use std::sync::Arc;
use std::thread;

use lineguard_core::{
    EngineConfig, InMemoryCatalog, IngestionPipeline, MemorySink, SensorProfile, SensorReading,
    StorageSink, VibrationAxes,
};
use tracing_subscriber::EnvFilter;

const MACHINES: usize = 4;
const READINGS: u64 = 60;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = EngineConfig::from_env()?;

    let catalog = InMemoryCatalog::new();
    for m in 0..MACHINES {
        catalog.register(format!("temp_m{m}"), SensorProfile::generic());
        catalog.register(format!("vib_m{m}"), SensorProfile::vibration());
    }

    let pipeline = Arc::new(IngestionPipeline::new(catalog, config));
    let sink = Arc::new(MemorySink::new());

    let workers: Vec<_> = (0..MACHINES)
        .map(|m| {
            let pipeline = Arc::clone(&pipeline);
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for i in 0..READINGS {
                    let ts = 1_700_000_000_000 + i * 250;
                    let phase = i as f64 * 0.4 + m as f64;

                    // Machine 2 develops a bearing fault near the end
                    let fault = if m == 2 && i > 50 { 4.0 } else { 0.0 };
                    let axes = VibrationAxes {
                        x: 0.8 + 0.02 * phase.sin() + fault,
                        y: 0.6 + 0.02 * phase.cos(),
                        z: 1.1 + 0.01 * phase.sin(),
                    };

                    let readings = [
                        SensorReading::new(format!("temp_m{m}"), ts, 42.0 + 0.3 * phase.sin()),
                        SensorReading::vibration(format!("vib_m{m}"), ts, axes),
                    ];
                    for reading in readings {
                        let reading = reading.with_source("line_a", format!("machine_{m}"));
                        if let Err(e) = pipeline.ingest_and_store(reading, sink.as_ref()) {
                            eprintln!("{}", e);
                        }
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().map_err(|_| "worker panicked")?;
    }

    println!("{} points written to {} sink", sink.len(), sink.name());
    for m in 0..MACHINES {
        let id = format!("vib_m{m}");
        let status = pipeline.sensor_status(&id)?;
        println!(
            "{:<8} ratio {:.2}  anomalies {:>2}  window mean {:.3}",
            id,
            status.anomaly_ratio,
            status.recent_anomaly_count,
            status.window.map_or(0.0, |w| w.mean)
        );
    }

    Ok(())
}
