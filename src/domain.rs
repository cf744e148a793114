use serde_json::Value;
use snafu::{ensure, OptionExt, Snafu};
use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Timestamp(i64::try_from(secs).unwrap_or(i64::MAX))
    }

    /// Rejects dates before the epoch; `from_date` cannot go there.
    pub fn non_negative(self) -> Result<Self> {
        ensure!(self >= Timestamp(0), NegativeTimestamp { timestamp: self.0 });
        Ok(self)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HomeworkStatus {
    Approved,
    Reviewing,
    Rejected,
}

impl HomeworkStatus {
    pub fn verdict(self) -> &'static str {
        match self {
            Self::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            Self::Reviewing => "Работа взята на проверку ревьюером.",
            Self::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

impl FromStr for HomeworkStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approved" => Ok(Self::Approved),
            "reviewing" => Ok(Self::Reviewing),
            "rejected" => Ok(Self::Rejected),
            _ => UnknownStatus { status: s }.fail(),
        }
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Approved => "approved",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// The latest review state of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Homework {
    pub name: String,
    pub status: HomeworkStatus,
}

impl Homework {
    /// Validates one entry of the API's `homeworks` array.
    pub fn from_value(value: &Value) -> Result<Self> {
        let record = value.as_object().context(RecordNotAnObject)?;

        let name = record.get("homework_name").context(MissingName)?;
        let name = name.as_str().context(InvalidName)?;

        let status = record.get("status").context(MissingStatus)?;
        let status = match status.as_str() {
            Some(status) => status.parse()?,
            None => {
                return UnknownStatus {
                    status: status.to_string(),
                }
                .fail()
            }
        };

        Ok(Self {
            name: name.to_owned(),
            status,
        })
    }

    pub fn status_message(&self) -> String {
        format!(
            "Изменился статус проверки работы \"{}\". {}",
            self.name,
            self.status.verdict(),
        )
    }
}

/// Everything the poll loop remembers between cycles. Nothing survives a
/// restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub last_timestamp: Timestamp,
    pub last_sent_message: Option<String>,
}

impl PollState {
    pub fn new(last_timestamp: Timestamp) -> Self {
        Self {
            last_timestamp,
            last_sent_message: None,
        }
    }

    pub fn already_sent(&self, message: &str) -> bool {
        self.last_sent_message.as_deref() == Some(message)
    }

    pub fn advance_to(&mut self, timestamp: Timestamp) {
        self.last_timestamp = timestamp;
    }
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum Error {
    #[snafu(display("homework record is not an object"))]
    RecordNotAnObject,

    #[snafu(display("homework record has no homework_name"))]
    MissingName,

    #[snafu(display("homework_name is not a string"))]
    InvalidName,

    #[snafu(display("homework record has no status"))]
    MissingStatus,

    #[snafu(display("unexpected homework status {}", status))]
    UnknownStatus { status: String },

    #[snafu(display("current_date {} is negative", timestamp))]
    NegativeTimestamp { timestamp: i64 },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_names_the_homework_and_its_verdict() {
        let cases = [
            ("approved", "Работа проверена: ревьюеру всё понравилось. Ура!"),
            ("reviewing", "Работа взята на проверку ревьюером."),
            ("rejected", "Работа проверена: у ревьюера есть замечания."),
        ];

        for (status, verdict) in cases {
            let hw = json!({ "homework_name": "user__hw05.zip", "status": status });
            let message = Homework::from_value(&hw).unwrap().status_message();

            assert!(message.contains("\"user__hw05.zip\""), "{}", message);
            assert!(message.ends_with(verdict), "{}", message);
        }
    }

    #[test]
    fn approved_message_is_exact() {
        let hw = json!({ "homework_name": "hw1", "status": "approved" });
        let message = Homework::from_value(&hw).unwrap().status_message();

        assert_eq!(
            message,
            "Изменился статус проверки работы \"hw1\". Работа проверена: ревьюеру всё понравилось. Ура!",
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let hw = json!({
            "id": 123,
            "homework_name": "hw2",
            "status": "rejected",
            "reviewer_comment": "see notes",
            "date_updated": "2020-02-13T16:42:47Z",
        });

        let hw = Homework::from_value(&hw).unwrap();
        assert_eq!(hw.name, "hw2");
        assert_eq!(hw.status, HomeworkStatus::Rejected);
    }

    #[test]
    fn missing_status_is_rejected() {
        let hw = json!({ "homework_name": "hw1" });
        let e = Homework::from_value(&hw).unwrap_err();
        assert!(matches!(e, Error::MissingStatus), "{:?}", e);
    }

    #[test]
    fn missing_name_is_rejected() {
        let hw = json!({ "status": "approved" });
        let e = Homework::from_value(&hw).unwrap_err();
        assert!(matches!(e, Error::MissingName), "{:?}", e);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let hw = json!({ "homework_name": "hw1", "status": "lost" });
        let e = Homework::from_value(&hw).unwrap_err();
        assert!(matches!(&e, Error::UnknownStatus { status } if status == "lost"));

        let hw = json!({ "homework_name": "hw1", "status": 7 });
        let e = Homework::from_value(&hw).unwrap_err();
        assert!(matches!(&e, Error::UnknownStatus { status } if status == "7"));
    }

    #[test]
    fn non_object_record_is_rejected() {
        let e = Homework::from_value(&json!(["hw1", "approved"])).unwrap_err();
        assert!(matches!(e, Error::RecordNotAnObject), "{:?}", e);
    }

    #[test]
    fn status_display_matches_wire_name() {
        for status in [
            HomeworkStatus::Approved,
            HomeworkStatus::Reviewing,
            HomeworkStatus::Rejected,
        ] {
            assert_eq!(status.to_string().parse::<HomeworkStatus>().unwrap(), status);
        }
    }

    #[test]
    fn poll_state_remembers_last_message() {
        let mut state = PollState::new(Timestamp(0));
        assert!(!state.already_sent("hello"));

        state.last_sent_message = Some("hello".into());
        assert!(state.already_sent("hello"));
        assert!(!state.already_sent("bye"));
    }

    #[test]
    fn negative_timestamps_are_refused() {
        let e = Timestamp(-1).non_negative().unwrap_err();
        assert!(matches!(e, Error::NegativeTimestamp { timestamp: -1 }), "{:?}", e);

        assert_eq!(Timestamp(0).non_negative().unwrap(), Timestamp(0));
        assert_eq!(Timestamp(100).non_negative().unwrap(), Timestamp(100));
    }
}
