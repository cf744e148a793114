use crate::{
    domain::Timestamp,
    error::{Classify, Kind},
};
use reqwest::{header::AUTHORIZATION, StatusCode};
use serde::Serialize;
use serde_json::Value;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::{env, str::FromStr};
use tracing::{trace, trace_span, Instrument};
use url::Url;

const ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiToken(pub String);

#[derive(Debug, Clone)]
pub struct Config {
    token: ApiToken,
    endpoint: Url,
}

impl Config {
    pub fn from_environment() -> Result<Self> {
        let token = env::var("PRACTICUM_TOKEN").or_else(|_| env::var("PRAKTIKUM_TOKEN"));
        let token = token.context(UnknownToken)?;

        let endpoint = env::var("PRACTICUM_ENDPOINT").unwrap_or_else(|_| ENDPOINT.into());

        Self::new(token, &endpoint)
    }

    pub fn new(token: impl Into<String>, endpoint: &str) -> Result<Self> {
        let token = ApiToken(token.into());
        let endpoint = Url::parse(endpoint).context(InvalidEndpoint { endpoint })?;

        Ok(Self { token, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
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
    pub async fn homework_statuses(&self, from_date: Timestamp) -> Result<Value> {
        let Self { client, config } = self;
        let s = trace_span!("homework_statuses", from_date = from_date.0);

        #[derive(Debug, Serialize)]
        struct StatusesParams {
            from_date: i64,
        }

        async {
            trace!("Requesting homework statuses");

            let res = client
                .get(config.endpoint.clone())
                .header(AUTHORIZATION, format!("OAuth {}", config.token.0))
                .query(&StatusesParams {
                    from_date: from_date.0,
                })
                .send()
                .await
                .context(UnableToExecuteStatusesRequest)?;

            let status = res.status();
            ensure!(status == StatusCode::OK, NonOkStatus { status });

            res.json::<Value>()
                .await
                .context(UnableToDeserializeStatusesResponse)
        }
        .instrument(s)
        .await
    }
}

/// What to do when the API answers with an empty `homeworks` list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum EmptyHomeworks {
    /// Nothing changed since `from_date`.
    #[default]
    Ignore,
    Error,
}

impl FromStr for EmptyHomeworks {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "error" => Ok(Self::Error),
            _ => UnknownEmptyHomeworksPolicy { policy: s }.fail(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeworkStatuses {
    /// Most recent first.
    pub homeworks: Vec<Value>,
    pub current_date: Option<Timestamp>,
}

pub fn check_response(response: Value, empty: EmptyHomeworks) -> Result<HomeworkStatuses> {
    let mut response = match response {
        Value::Object(o) => o,
        _ => return ResponseNotAnObject.fail(),
    };

    let current_date = response
        .get("current_date")
        .and_then(Value::as_i64)
        .map(Timestamp);

    let homeworks = response.remove("homeworks").context(MissingHomeworks)?;
    let homeworks = match homeworks {
        Value::Array(a) => a,
        _ => return HomeworksNotAList.fail(),
    };

    ensure!(
        !(homeworks.is_empty() && empty == EmptyHomeworks::Error),
        NoHomeworks
    );

    Ok(HomeworkStatuses {
        homeworks,
        current_date,
    })
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum Error {
    #[snafu(display("PRACTICUM_TOKEN must be set"))]
    UnknownToken { source: env::VarError },

    #[snafu(display("PRACTICUM_ENDPOINT {} is invalid", endpoint))]
    InvalidEndpoint {
        source: url::ParseError,
        endpoint: String,
    },

    #[snafu(display("EMPTY_HOMEWORKS must be `ignore` or `error`, not {}", policy))]
    UnknownEmptyHomeworksPolicy { policy: String },

    #[snafu(display("Unable to reach the homework API: {}", source))]
    UnableToExecuteStatusesRequest { source: reqwest::Error },

    #[snafu(display("The homework API returned {}", status))]
    NonOkStatus { status: StatusCode },

    #[snafu(display("The homework API did not return JSON: {}", source))]
    UnableToDeserializeStatusesResponse { source: reqwest::Error },

    #[snafu(display("The homework API response is not an object"))]
    ResponseNotAnObject,

    #[snafu(display("The homework API response has no homeworks"))]
    MissingHomeworks,

    #[snafu(display("The homework API response homeworks is not a list"))]
    HomeworksNotAList,

    #[snafu(display("The homework API response homeworks is empty"))]
    NoHomeworks,
}

impl Classify for Error {
    fn kind(&self) -> Kind {
        match self {
            Self::UnknownToken { .. }
            | Self::InvalidEndpoint { .. }
            | Self::UnknownEmptyHomeworksPolicy { .. } => Kind::Configuration,
            Self::UnableToExecuteStatusesRequest { .. } | Self::NonOkStatus { .. } => {
                Kind::Transport
            }
            Self::UnableToDeserializeStatusesResponse { .. }
            | Self::ResponseNotAnObject
            | Self::MissingHomeworks
            | Self::HomeworksNotAList
            | Self::NoHomeworks => Kind::ResponseShape,
        }
    }
}

type Result<T, E = Error> = std::result::Result<T, E>;
