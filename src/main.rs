#![deny(rust_2018_idioms)]

use snafu::{ResultExt, Snafu};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use config::Config;

mod config;
mod domain;
mod error;
mod flow;
mod poller;
mod practicum;
mod telegram;

fn main() {
    if let Err(e) = core() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn core() -> Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_environment().context(UnableToConfigure)?;

    let practicum_config =
        practicum::Config::from_environment().context(UnableToConfigurePracticum)?;

    let telegram_config =
        telegram::Config::from_environment().context(UnableToConfigureTelegram)?;

    info!(
        "Relaying statuses from {} to chat {}",
        practicum_config.endpoint(),
        telegram_config.chat_id().0,
    );

    let practicum = practicum_config.into_client();
    let notify_flow = flow::NotifyFlow::new(telegram_config.into_client());

    let poller = poller::Poller::new(
        practicum,
        notify_flow,
        &config,
        domain::Timestamp::now(),
    );
    poller.run().await;

    PollerExited.fail()
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
enum Error {
    #[snafu(display("Unable to configure application: {}", source))]
    UnableToConfigure { source: config::Error },

    #[snafu(display("Unable to configure the homework API: {}", source))]
    UnableToConfigurePracticum { source: practicum::Error },

    #[snafu(display("Unable to configure Telegram: {}", source))]
    UnableToConfigureTelegram { source: telegram::Error },

    #[snafu(display("The poller exited and never should"))]
    PollerExited,
}

type Result<T, E = Error> = std::result::Result<T, E>;
