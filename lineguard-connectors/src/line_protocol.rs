//! InfluxDB line protocol encoding
//!
//! ```text
//! SingleSensorAnalytics,line_name=L1,machine_name=M3,sensor_name=press_01 value=4.2,anomaly=0i,... 1700000000000
//! └──── measurement ───┘└──────────────────── tags ─────────────────────┘ └────── fields ──────┘ └─ ms ──┘
//! ```
//!
//! Floats are rounded to four decimals. A point without a timestamp is
//! written without one and stamped by the server.

use std::fmt::Write;

use lineguard_core::{AnnotatedPoint, SensorType};

/// Measurement for generic sensors
pub const GENERIC_MEASUREMENT: &str = "SingleSensorAnalytics";

/// Measurement for vibration sensors
pub const VIBRATION_MEASUREMENT: &str = "VibSensor";

/// Tag value used when a reading carries no line or machine name
pub const UNKNOWN_TAG: &str = "unknown";

/// Measurement name for a sensor type
pub fn measurement(sensor_type: SensorType) -> &'static str {
    match sensor_type {
        SensorType::Generic => GENERIC_MEASUREMENT,
        SensorType::Vibration => VIBRATION_MEASUREMENT,
    }
}

/// Encode one point as a single line (no trailing newline)
pub fn encode(point: &AnnotatedPoint) -> String {
    let reading = &point.reading;
    let mut line = String::with_capacity(256);

    line.push_str(measurement(point.sensor_type));
    push_tag(&mut line, "line_name", reading.line_name.as_deref());
    push_tag(&mut line, "machine_name", reading.machine_name.as_deref());
    push_tag(&mut line, "sensor_name", Some(&reading.sensor_id));

    let mut fields: Vec<(&str, String)> = Vec::with_capacity(10);
    match (point.sensor_type, reading.axes) {
        (SensorType::Vibration, Some(axes)) => {
            fields.push(("vib_accel_rms_x", float(axes.x)));
            fields.push(("vib_accel_rms_y", float(axes.y)));
            fields.push(("vib_accel_rms_z", float(axes.z)));
            fields.push(("vib_accel_rms_total", float(reading.value)));
        }
        (SensorType::Vibration, None) => fields.push(("vib_accel_rms_total", float(reading.value))),
        (SensorType::Generic, _) => fields.push(("value", float(reading.value))),
    }
    fields.push(("anomaly", format!("{}i", u8::from(point.is_anomaly))));
    fields.push(("anomaly_ratio", float(point.anomaly_ratio)));
    fields.push(("model_avg", float(point.model_avg)));
    fields.push(("z_score", float(point.z_score.unwrap_or(0.0))));
    fields.push(("z_score_thresh", float(point.threshold)));

    for (i, (key, value)) in fields.iter().enumerate() {
        line.push(if i == 0 { ' ' } else { ',' });
        line.push_str(key);
        line.push('=');
        line.push_str(value);
    }

    if let Some(timestamp) = reading.timestamp {
        // Writing to a String cannot fail
        let _ = write!(line, " {}", timestamp);
    }

    line
}

/// Encode several points, newline separated
pub fn encode_batch<'a>(points: impl IntoIterator<Item = &'a AnnotatedPoint>) -> String {
    points.into_iter().map(encode).collect::<Vec<_>>().join("\n")
}

/// Round to four decimals
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn float(value: f64) -> String {
    round4(value).to_string()
}

fn push_tag(line: &mut String, key: &str, value: Option<&str>) {
    let value = value.filter(|v| !v.is_empty()).unwrap_or(UNKNOWN_TAG);
    line.push(',');
    line.push_str(key);
    line.push('=');
    for c in value.chars() {
        match c {
            ',' | '=' | ' ' | '\\' => {
                line.push('\\');
                line.push(c);
            }
            '\n' | '\r' | '\t' => line.push(' '),
            _ => line.push(c),
        }
    }
}
