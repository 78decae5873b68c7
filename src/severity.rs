use std::fmt;

use stdlog::kv::Key;
use stdlog::Record;

/// The key-value a `LogBackend` attaches to every record it forwards.
pub(crate) const SEVERITY_KEY: &str = "severity";

/**
The severity of a log line.

Severities are ordered, so `Info < Warning < Error < Fatal`.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// The character that tags lines of this severity.
    pub fn as_char(self) -> char {
        match self {
            Severity::Info => 'I',
            Severity::Warning => 'W',
            Severity::Error => 'E',
            Severity::Fatal => 'F',
        }
    }

    pub(crate) fn as_tag(self) -> &'static str {
        match self {
            Severity::Info => "I",
            Severity::Warning => "W",
            Severity::Error => "E",
            Severity::Fatal => "F",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /**
    The `log` level records of this severity are emitted at.

    `log` has no fatal level, so fatal lines are emitted as errors.
    */
    pub fn level(self) -> stdlog::Level {
        match self {
            Severity::Info => stdlog::Level::Info,
            Severity::Warning => stdlog::Level::Warn,
            Severity::Error | Severity::Fatal => stdlog::Level::Error,
        }
    }

    fn from_tag(tag: &str) -> Option<Severity> {
        match tag {
            "I" => Some(Severity::Info),
            "W" => Some(Severity::Warning),
            "E" => Some(Severity::Error),
            "F" => Some(Severity::Fatal),
            _ => None,
        }
    }

    /**
    Recover the severity of a record.

    The `severity` key-value wins if it's present, otherwise the severity is
    derived from the record's level.
    */
    pub fn of(record: &Record) -> Severity {
        let tagged = record
            .key_values()
            .get(Key::from_str(SEVERITY_KEY))
            .and_then(|value| Severity::from_tag(&value.to_string()));

        tagged.unwrap_or(match record.level() {
            stdlog::Level::Error => Severity::Error,
            stdlog::Level::Warn => Severity::Warning,
            _ => Severity::Info,
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/**
A verbosity level.

A logger gated at some level only emits when that level is at most the
backend's configured verbosity.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub i32);

impl From<i32> for Level {
    fn from(level: i32) -> Self {
        Level(level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
