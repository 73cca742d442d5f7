use airmond::config::{DaemonConfig, IndicatorKind};
use airmond::identity::DeviceIdentity;
use airmond::indicator::led::RgbLed;
use airmond::indicator::{IndicatorDriver, LogIndicator};
use airmond::state::store::StateStore;
use airmond::sync::connection::BusLink;
use airmond::sync::daemon::StateSyncDaemon;
use airmond::topics;
use color_eyre::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    setup()?;

    let config = DaemonConfig::load_default()?;

    let identity = DeviceIdentity::from_interface(&config.device.interface)?;
    info!("device identity: {}", identity);

    let profile = config.schema_profile()?;
    let store = StateStore::open(config.state_path())?;
    let driver = build_indicator(&config);

    let status_topic = topics::connection_state_topic(&identity);
    let mut daemon = StateSyncDaemon::new(store, profile, driver, status_topic.clone())?;

    let link = BusLink::create(&config.broker, &status_topic);
    let link = link.connect()?;
    link.run(&mut daemon)?;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn build_indicator(config: &DaemonConfig) -> Box<dyn IndicatorDriver> {
    match config.indicator.driver {
        IndicatorKind::Gpio => {
            let pins = &config.indicator;
            match RgbLed::open(pins.red_pin, pins.green_pin, pins.blue_pin) {
                Ok(led) => Box::new(led),
                Err(err) => {
                    warn!("gpio indicator unavailable, logging colors instead: {}", err);
                    Box::new(LogIndicator)
                }
            }
        }
        IndicatorKind::Log => Box::new(LogIndicator),
    }
}
