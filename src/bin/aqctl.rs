//! Command-line override and inspection tool.
//!
//! Reads the retained state notification, prints it, and optionally merges
//! value overrides back onto the inbound update topic. A simple caller of
//! the daemon's published protocol, useful for bench tests without a
//! sensor attached.

use std::time::{Duration, Instant};

use airmond::state::Field;
use airmond::topics;
use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use rumqttc::{Client, Connection, Event, MqttOptions, Outgoing, Packet, QoS};
use serde_json::{Map, Value};

const CLIENT_ID: &str = "air_quality_cmd";

/// How long to wait for the retained state before giving up. The short
/// keep-alive guarantees the connection produces events at least this
/// often, so the wait loop can observe the deadline.
const STATE_WAIT: Duration = Duration::from_secs(6);
const KEEP_ALIVE: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "aqctl", about = "Inspect or override the published air-quality state")]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long, default_value_t = 1883)]
    port: u16,

    #[arg(long = "pm2_5")]
    pm2_5: Option<f64>,

    #[arg(long = "pm10")]
    pm10: Option<f64>,

    #[arg(long = "temperature")]
    temperature: Option<f64>,

    #[arg(long = "humidity")]
    humidity: Option<f64>,

    #[arg(long = "pressure")]
    pressure: Option<f64>,

    #[arg(long = "altitude")]
    altitude: Option<f64>,
}

impl Args {
    fn overrides(&self) -> Vec<(Field, f64)> {
        [
            (Field::Pm25, self.pm2_5),
            (Field::Pm10, self.pm10),
            (Field::Temperature, self.temperature),
            (Field::Humidity, self.humidity),
            (Field::Pressure, self.pressure),
            (Field::Altitude, self.altitude),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let overrides = args.overrides();

    let mut options = MqttOptions::new(CLIENT_ID, &args.host, args.port);
    options.set_keep_alive(KEEP_ALIVE);
    let (client, mut connection) = Client::new(options, 16);

    client.subscribe(topics::STATE_NOTIFICATION, QoS::AtLeastOnce)?;
    let mut state = wait_for_state(&mut connection)?;

    if overrides.is_empty() {
        print_state(&state);
    } else {
        for (field, value) in overrides {
            state.insert(field.key().to_string(), Value::from(value));
        }
        state.insert("client".to_string(), Value::from(CLIENT_ID));

        let payload = Value::Object(state).to_string().into_bytes();
        client.publish(topics::SENSOR_UPDATE, QoS::AtLeastOnce, false, payload)?;
        wait_for_ack(&mut connection)?;
        println!("update published");
    }

    client.disconnect()?;
    settle(&mut connection);
    Ok(())
}

/// Waits for the retained state notification. No retained message means no
/// daemon has ever committed state, which is worth a hard error here.
fn wait_for_state(connection: &mut Connection) -> Result<Map<String, Value>> {
    let started = Instant::now();

    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::Publish(publish)))
                if publish.topic == topics::STATE_NOTIFICATION =>
            {
                let body: Value = serde_json::from_slice(&publish.payload)
                    .map_err(|err| eyre!("retained state is not valid JSON: {err}"))?;
                return body
                    .as_object()
                    .cloned()
                    .ok_or_else(|| eyre!("retained state is not a JSON object"));
            }
            Ok(_) => {}
            Err(err) => return Err(eyre!("broker connection failed: {err}")),
        }

        if started.elapsed() > STATE_WAIT {
            break;
        }
    }

    Err(eyre!(
        "timed out waiting for a retained sensor state on {}",
        topics::STATE_NOTIFICATION
    ))
}

fn wait_for_ack(connection: &mut Connection) -> Result<()> {
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::PubAck(_))) => return Ok(()),
            Ok(_) => {}
            Err(err) => return Err(eyre!("broker connection failed before ack: {err}")),
        }
    }
    Ok(())
}

/// Polls until the disconnect is actually on the wire.
fn settle(connection: &mut Connection) {
    for event in connection.iter() {
        match event {
            Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

fn print_state(state: &Map<String, Value>) {
    for field in Field::ALL {
        if let Some(value) = state.get(field.key()).and_then(Value::as_f64) {
            println!("{}: {:.2}", field.key(), value);
        }
    }
}
