use crate::error::{Classify, Kind};
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt, Snafu};
use std::env;
use tracing::{trace, trace_span, Instrument};
use url::Url;

const API_URL: &str = "https://api.telegram.org/";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

#[derive(Debug, Clone)]
pub struct Config {
    token: String,
    chat_id: ChatId,
    api_url: Url,
}

impl Config {
    pub fn from_environment() -> Result<Self> {
        let token = env::var("TELEGRAM_TOKEN").context(UnknownBotToken)?;
        let chat_id = env::var("TELEGRAM_CHAT_ID").context(UnknownChatId)?;
        let api_url = env::var("TELEGRAM_API_URL").unwrap_or_else(|_| API_URL.into());

        Self::new(token, chat_id, &api_url)
    }

    pub fn new(
        token: impl Into<String>,
        chat_id: impl Into<String>,
        api_url: &str,
    ) -> Result<Self> {
        let token = token.into();
        let chat_id = ChatId(chat_id.into());
        let mut api_url = Url::parse(api_url).context(InvalidApiUrl { api_url })?;

        // Relative joins replace the last segment unless the base is a directory.
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        Ok(Self {
            token,
            chat_id,
            api_url,
        })
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    fn send_message_url(&self) -> Result<Url> {
        self.api_url
            .join(&format!("./bot{}/sendMessage", self.token))
            .context(UnableToBuildSendMessageUrl)
    }

    pub fn into_client(self) -> Client {
        Client {
            client: reqwest::Client::new(),
            config: self,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    config: Config,
}

impl Client {
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let Self { client, config } = self;
        let s = trace_span!("send_message", chat_id = %config.chat_id.0);

        #[derive(Debug, Serialize)]
        struct SendMessageParams<'a> {
            chat_id: &'a ChatId,
            text: &'a str,
        }

        #[derive(Debug, Deserialize)]
        struct SendMessageResponse {
            ok: bool,
            description: Option<String>,
        }

        async {
            trace!("Sending message");

            // The bot token is part of the path; keep it out of error messages.
            let url = config.send_message_url()?;

            let params = SendMessageParams {
                chat_id: &config.chat_id,
                text,
            };

            let res = client
                .post(url)
                .json(&params)
                .send()
                .await
                .map_err(reqwest::Error::without_url)
                .context(UnableToExecuteSendMessageRequest)?
                .json::<SendMessageResponse>()
                .await
                .map_err(reqwest::Error::without_url)
                .context(UnableToDeserializeSendMessageResponse)?;

            ensure!(
                res.ok,
                SendMessageRejected {
                    description: res.description.unwrap_or_default(),
                }
            );

            Ok(())
        }
        .instrument(s)
        .await
    }
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum Error {
    #[snafu(display("TELEGRAM_TOKEN must be set"))]
    UnknownBotToken { source: env::VarError },

    #[snafu(display("TELEGRAM_CHAT_ID must be set"))]
    UnknownChatId { source: env::VarError },

    #[snafu(display("TELEGRAM_API_URL {} is invalid", api_url))]
    InvalidApiUrl {
        source: url::ParseError,
        api_url: String,
    },

    #[snafu(display("Unable to build the sendMessage URL"))]
    UnableToBuildSendMessageUrl { source: url::ParseError },

    #[snafu(display("Unable to reach Telegram: {}", source))]
    UnableToExecuteSendMessageRequest { source: reqwest::Error },

    #[snafu(display("Telegram sent an unreadable reply: {}", source))]
    UnableToDeserializeSendMessageResponse { source: reqwest::Error },

    #[snafu(display("Telegram rejected the message: {}", description))]
    SendMessageRejected { description: String },
}

impl Classify for Error {
    fn kind(&self) -> Kind {
        match self {
            Self::UnknownBotToken { .. } | Self::UnknownChatId { .. } | Self::InvalidApiUrl { .. } => {
                Kind::Configuration
            }
            Self::UnableToBuildSendMessageUrl { .. }
            | Self::UnableToExecuteSendMessageRequest { .. }
            | Self::UnableToDeserializeSendMessageResponse { .. }
            | Self::SendMessageRejected { .. } => Kind::Delivery,
        }
    }
}

type Result<T, E = Error> = std::result::Result<T, E>;
