//! Sensor simulator: publishes a complete synthetic reading once per
//! second, shaped exactly like the readings the real peripheral reader
//! produces. Stands in for the hardware on development hosts.

use std::thread;
use std::time::Duration;

use airmond::state::{round2, Field, SchemaProfile};
use airmond::topics;
use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use serde_json::Value;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const CLIENT_ID: &str = "sensor_reader";

#[derive(Debug, Parser)]
#[command(name = "sensor-sim", about = "Publish synthetic air-quality readings")]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long, default_value_t = 1883)]
    port: u16,

    /// Seconds between readings.
    #[arg(long, default_value_t = 1)]
    interval_secs: u64,

    /// Schema profile to emit (`standard` or `altitude`).
    #[arg(long, default_value = "standard")]
    profile: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();
    let profile = SchemaProfile::by_name(&args.profile)
        .ok_or_else(|| eyre!("unknown schema profile `{}`", args.profile))?;

    let mut options = MqttOptions::new(CLIENT_ID, &args.host, args.port);
    options.set_keep_alive(Duration::from_secs(30));
    let (client, mut connection) = Client::new(options, 16);

    let interval = Duration::from_secs(args.interval_secs.max(1));
    let publisher = client.clone();
    thread::spawn(move || {
        let mut tick = 0u64;
        loop {
            let payload = synthetic_payload(&profile, tick);
            if let Err(err) = publisher.publish(topics::SENSOR_UPDATE, QoS::AtLeastOnce, false, payload)
            {
                warn!("failed to queue reading: {}", err);
            }
            tick += 1;
            thread::sleep(interval);
        }
    });

    // The event loop must keep turning for queued publishes to flush.
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("connected to broker"),
            Ok(_) => {}
            Err(err) => {
                warn!("transport error, waiting for reconnect: {}", err);
                thread::sleep(Duration::from_secs(1));
            }
        }
    }

    Ok(())
}

/// Slow sine drift around plausible indoor baselines, phase-shifted per
/// field so the channels do not move in lockstep.
fn synthetic_payload(profile: &SchemaProfile, tick: u64) -> Vec<u8> {
    let phase = tick as f64 / 60.0 * std::f64::consts::TAU;

    let mut object = serde_json::Map::new();
    for &field in profile.required() {
        let (base, swing, shift) = match field {
            Field::Pm25 => (12.0, 6.0, 0.0),
            Field::Pm10 => (24.0, 10.0, 0.7),
            Field::Temperature => (21.5, 1.5, 1.4),
            Field::Humidity => (45.0, 8.0, 2.1),
            Field::Pressure => (1013.25, 2.0, 2.8),
            Field::Altitude => (120.0, 0.5, 3.5),
        };
        let value = round2(base + swing * (phase + shift).sin());
        object.insert(field.key().to_string(), Value::from(value));
    }
    object.insert("client".to_string(), Value::from(CLIENT_ID));

    Value::Object(object).to_string().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use airmond::state::validator::validate;

    #[test]
    fn synthetic_readings_pass_validation() {
        for profile in [SchemaProfile::standard(), SchemaProfile::with_altitude()] {
            for tick in [0, 17, 59, 3600] {
                let payload = synthetic_payload(&profile, tick);
                assert!(validate(&profile, &payload).is_ok());
            }
        }
    }
}
