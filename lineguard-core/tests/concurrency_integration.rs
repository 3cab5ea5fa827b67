//! Multi-threaded ingestion tests
//!
//! Many threads feed one shared pipeline. Per-sensor statistics must come
//! out exactly as if each sensor's readings had been applied one by one.

mod common;

use std::sync::Arc;
use std::thread;

use lineguard_core::{EvaluationOrder, SensorReading};

use common::{brute_force_stats, config, generic_pipeline};

const THREADS: usize = 8;
const READINGS_PER_SENSOR: usize = 200;
const WINDOW: usize = 16;

fn value_for(sensor: usize, i: usize) -> f64 {
    (sensor * 10) as f64 + ((i * 7 + sensor) % 13) as f64 * 0.25
}

#[test]
fn sensors_owned_by_threads_match_sequential_stats() {
    let ids: Vec<String> = (0..THREADS * 4).map(|i| format!("sensor_{i}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let pipeline = Arc::new(generic_pipeline(
        &id_refs,
        config(WINDOW, 4, 3.0, EvaluationOrder::UpdateThenEvaluate),
    ));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                // Each thread owns four sensors and interleaves them
                for i in 0..READINGS_PER_SENSOR {
                    for s in (t * 4)..(t * 4 + 4) {
                        let reading = SensorReading::new(format!("sensor_{s}"), i as u64, value_for(s, i));
                        pipeline.ingest(reading).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(pipeline.tracked_sensors(), THREADS * 4);

    for s in 0..THREADS * 4 {
        let tail: Vec<f64> = (READINGS_PER_SENSOR - WINDOW..READINGS_PER_SENSOR)
            .map(|i| value_for(s, i))
            .collect();
        let (mean, stddev) = brute_force_stats(&tail);

        let stats = pipeline.sensor_status(&format!("sensor_{s}")).unwrap().window.unwrap();
        assert_eq!(stats.sample_count, WINDOW);
        assert!((stats.mean - mean).abs() < 1e-9, "sensor_{s} mean {} vs {}", stats.mean, mean);
        assert!((stats.stddev - stddev).abs() < 1e-9, "sensor_{s} stddev {} vs {}", stats.stddev, stddev);
    }
}

#[test]
fn shared_sensor_never_exceeds_capacity() {
    let pipeline = Arc::new(generic_pipeline(
        &["shared"],
        config(WINDOW, 2, 1.0, EvaluationOrder::EvaluateThenUpdate),
    ));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                for i in 0..READINGS_PER_SENSOR {
                    // Constant per thread; mixing threads makes plenty of anomalies
                    let reading = SensorReading::new("shared", i as u64, t as f64 * 100.0);
                    pipeline.ingest(reading).unwrap();

                    if i % 50 == 0 {
                        let status = pipeline.sensor_status("shared").unwrap();
                        assert!(status.window.unwrap().sample_count <= WINDOW);
                        assert!(status.recent_anomaly_count <= pipeline.config().history_capacity);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let status = pipeline.sensor_status("shared").unwrap();
    assert_eq!(status.window.unwrap().sample_count, WINDOW);
    assert!((0.0..=1.0).contains(&status.anomaly_ratio));

    let recent = pipeline.recent_anomalies("shared");
    assert!(recent.len() <= pipeline.config().history_capacity);
    assert!(recent.iter().all(|r| r.z_score.is_finite()));
}

#[test]
fn reset_never_leaves_stale_anomalies() {
    const MIN_SAMPLES: usize = 4;
    let pipeline = Arc::new(generic_pipeline(
        &["s1"],
        config(8, MIN_SAMPLES, 1.0, EvaluationOrder::EvaluateThenUpdate),
    ));

    let writer = {
        let pipeline = Arc::clone(&pipeline);
        thread::spawn(move || {
            for i in 0..20_000u64 {
                let value = if i % 5 == 4 { 1000.0 } else { 1.0 };
                pipeline.ingest(SensorReading::new("s1", i, value)).unwrap();
            }
        })
    };

    while !writer.is_finished() {
        pipeline.reset_sensor("s1");

        // Any anomaly recorded after the reset was judged against at least
        // MIN_SAMPLES values, and only this thread resets
        let recent = pipeline.recent_anomalies("s1");
        let count = pipeline
            .sensor_status("s1")
            .unwrap()
            .window
            .map_or(0, |stats| stats.sample_count);
        if !recent.is_empty() {
            assert!(count >= MIN_SAMPLES, "{} anomalies beside a window of {}", recent.len(), count);
        }
        thread::yield_now();
    }
    writer.join().unwrap();
}
