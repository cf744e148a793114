use crate::{
    domain::PollState,
    error::{Classify, Kind},
    telegram,
};
use snafu::{ResultExt, Snafu};
use tracing::trace;

/// Anything that can deliver a text to the configured chat.
pub trait Messenger {
    async fn send_message(&self, text: &str) -> Result<(), telegram::Error>;
}

impl Messenger for telegram::Client {
    async fn send_message(&self, text: &str) -> Result<(), telegram::Error> {
        telegram::Client::send_message(self, text).await
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct NotifyFlow<M> {
    messenger: M,
}

impl<M: Messenger> NotifyFlow<M> {
    pub fn new(messenger: M) -> Self {
        Self { messenger }
    }

    /// Sends `message` unless it is what was last delivered. The state only
    /// remembers messages that actually went out.
    pub async fn notify(&self, state: &mut PollState, message: String) -> Result<Delivery> {
        let Self { messenger } = self;

        if state.already_sent(&message) {
            trace!("Message was already sent, skipping");
            return Ok(Delivery::Duplicate);
        }

        messenger
            .send_message(&message)
            .await
            .context(UnableToSendMessage)?;

        state.last_sent_message = Some(message);

        Ok(Delivery::Sent)
    }
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum Error {
    #[snafu(display("Unable to send the message: {}", source))]
    UnableToSendMessage { source: telegram::Error },
}

impl Classify for Error {
    fn kind(&self) -> Kind {
        match self {
            Self::UnableToSendMessage { source } => source.kind(),
        }
    }
}

type Result<T, E = Error> = std::result::Result<T, E>;
