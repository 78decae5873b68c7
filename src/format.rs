/*!
Formats for the `env_logger` logger installed by `init`.
*/

use std::fmt;
use std::io::{self, Write};

use env_logger::fmt::Formatter;
use serde::ser::Serializer;
use stdlog::Record;

use crate::config::Format;
use crate::severity::Severity;

/// The `env_logger` format function for `format`.
pub fn formatter(format: Format) -> Box<dyn Fn(&mut Formatter, &Record) -> io::Result<()> + Sync + Send> {
    match format {
        Format::Text => Box::new(text()),
        Format::Json => Box::new(json()),
    }
}

/**
Write lines as `<severity><timestamp>] <message>`.

```text
I2018-02-12T06:31:58Z] [request 42] handling a request for Timmy
```
*/
pub fn text() -> impl Fn(&mut Formatter, &Record) -> io::Result<()> + Sync + Send {
    |buf: &mut Formatter, record: &Record| {
        let ts = buf.timestamp();
        write_text(buf, ts, record)
    }
}

/**
Write lines as JSON objects.

```text
{"severity":"I","level":"INFO","target":"log_prefix","ts":"2018-02-12T06:31:58Z","msg":"[request 42] handling a request for Timmy"}
```
*/
pub fn json() -> impl Fn(&mut Formatter, &Record) -> io::Result<()> + Sync + Send {
    |buf: &mut Formatter, record: &Record| {
        let ts = buf.timestamp();
        write_json(buf, ts, record)
    }
}

fn write_text(mut w: impl Write, ts: impl fmt::Display, record: &Record) -> io::Result<()> {
    writeln!(w, "{}{}] {}", Severity::of(record).as_char(), ts, record.args())
}

fn write_json(mut w: impl Write, ts: impl fmt::Display, record: &Record) -> io::Result<()> {
    #[derive(Serialize)]
    struct Line<'a> {
        severity: char,
        level: &'a str,
        target: &'a str,
        ts: String,
        #[serde(serialize_with = "serialize_msg")]
        msg: &'a Record<'a>,
    }

    fn serialize_msg<S>(record: &Record, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(record.args())
    }

    let line = Line {
        severity: Severity::of(record).as_char(),
        level: record.level().as_str(),
        target: record.target(),
        ts: ts.to_string(),
        msg: record,
    };

    serde_json::to_writer(&mut w, &line)?;
    writeln!(w)
}
