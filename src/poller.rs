use crate::{
    config::Config,
    domain::{self, Homework, PollState, Timestamp},
    error::{Classify, Kind},
    flow::{Delivery, Messenger, NotifyFlow},
    practicum::{self, EmptyHomeworks},
};
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, trace, trace_span, warn, Instrument};

const FAILURE_PREFIX: &str = "Сбой в работе программы";

/// Anything that can answer "which homework statuses changed since then".
pub trait HomeworkSource {
    async fn homework_statuses(&self, from_date: Timestamp) -> Result<Value, practicum::Error>;
}

impl HomeworkSource for practicum::Client {
    async fn homework_statuses(&self, from_date: Timestamp) -> Result<Value, practicum::Error> {
        practicum::Client::homework_statuses(self, from_date).await
    }
}

#[derive(Debug)]
pub struct Poller<S, M> {
    source: S,
    flow: NotifyFlow<M>,
    state: PollState,
    retry_period: Duration,
    empty_homeworks: EmptyHomeworks,
}

impl<S, M> Poller<S, M>
where
    S: HomeworkSource,
    M: Messenger,
{
    pub fn new(source: S, flow: NotifyFlow<M>, config: &Config, from_date: Timestamp) -> Self {
        Self {
            source,
            flow,
            state: PollState::new(from_date),
            retry_period: config.retry_period,
            empty_homeworks: config.empty_homeworks,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Polls forever, sleeping a fixed period between cycles.
    pub async fn run(mut self) {
        info!(
            "Polling every {}s starting from {}",
            self.retry_period.as_secs(),
            self.state.last_timestamp.0,
        );

        loop {
            self.poll_once().await;
            time::sleep(self.retry_period).await;
        }
    }

    /// One fetch, interpret and notify cycle. Never fails; problems are
    /// logged and, when the chat should know, sent as a message.
    ///
    /// The timestamp only moves once the newest status has been delivered,
    /// so a status that could not be sent is fetched again next cycle.
    pub async fn poll_once(&mut self) {
        let s = trace_span!("poll_once", from_date = self.state.last_timestamp.0);

        async {
            let checked = match self.check_statuses().await {
                Ok(checked) => checked,
                Err(e) => {
                    error!("Poll cycle failed: {}", e);
                    if e.kind().is_reportable() {
                        self.deliver(format!("{}: {}", FAILURE_PREFIX, e)).await;
                    }
                    return;
                }
            };

            let delivered = match checked.message {
                Some(message) => self.deliver(message).await,
                None => {
                    debug!("No new homework statuses");
                    true
                }
            };

            if !delivered {
                debug!("Keeping from_date so the status is fetched again");
                return;
            }

            match checked.current_date {
                Some(current_date) => self.state.advance_to(current_date),
                None => warn!(
                    "Response has no current_date, staying at {}",
                    self.state.last_timestamp.0,
                ),
            }
        }
        .instrument(s)
        .await
    }

    async fn deliver(&mut self, message: String) -> bool {
        let Self { flow, state, .. } = self;

        match flow.notify(state, message).await {
            Ok(Delivery::Sent) => {
                info!("Message sent: {:?}", state.last_sent_message);
                true
            }
            Ok(Delivery::Duplicate) => {
                debug!("Nothing new to send");
                true
            }
            Err(e) => {
                error!(kind = ?e.kind(), "{}", e);
                false
            }
        }
    }

    async fn check_statuses(&self) -> Result<Checked> {
        let Self {
            source,
            state,
            empty_homeworks,
            ..
        } = self;

        let response = source
            .homework_statuses(state.last_timestamp)
            .await
            .context(UnableToFetchStatuses)?;

        let statuses =
            practicum::check_response(response, *empty_homeworks).context(InvalidResponse)?;
        trace!("Received {} homeworks", statuses.homeworks.len());

        let message = match statuses.homeworks.first() {
            Some(homework) => {
                let homework = Homework::from_value(homework).context(InvalidHomework)?;
                debug!(name = %homework.name, status = %homework.status, "Latest homework");
                Some(homework.status_message())
            }
            None => None,
        };

        let current_date = statuses
            .current_date
            .map(Timestamp::non_negative)
            .transpose()
            .context(InvalidCurrentDate)?;

        Ok(Checked {
            message,
            current_date,
        })
    }
}

/// The outcome of a fetch that passed validation.
#[derive(Debug)]
struct Checked {
    message: Option<String>,
    current_date: Option<Timestamp>,
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
enum Error {
    #[snafu(display("{}", source))]
    UnableToFetchStatuses { source: practicum::Error },

    #[snafu(display("{}", source))]
    InvalidResponse { source: practicum::Error },

    #[snafu(display("Invalid homework record: {}", source))]
    InvalidHomework { source: domain::Error },

    #[snafu(display("Invalid response: {}", source))]
    InvalidCurrentDate { source: domain::Error },
}

impl Classify for Error {
    fn kind(&self) -> Kind {
        match self {
            Self::UnableToFetchStatuses { source } | Self::InvalidResponse { source } => {
                source.kind()
            }
            Self::InvalidHomework { .. } => Kind::DomainValidation,
            Self::InvalidCurrentDate { .. } => Kind::ResponseShape,
        }
    }
}

type Result<T, E = Error> = std::result::Result<T, E>;
