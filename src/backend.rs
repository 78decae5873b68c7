/*!
Backends that prefixed loggers write to.

A backend owns the output and the verbosity threshold.
Loggers only read the threshold when they're derived and never change it.
*/

use std::fmt::{self, Write};
use std::process;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, PoisonError};

use stdlog::{Log, Metadata, Record};

use crate::severity::{Level, Severity, SEVERITY_KEY};

/**
Appended to a line in place of a value whose `Display` implementation failed.
*/
pub const FORMAT_ERROR_MARKER: &str = "%!(FORMAT ERROR)";

/**
Render a set of format arguments.

Formatting never panics: if an argument fails to format, the text rendered so
far is kept and `FORMAT_ERROR_MARKER` is appended.
*/
pub fn sprintf(args: fmt::Arguments) -> String {
    let mut buf = String::new();

    if buf.write_fmt(args).is_err() {
        buf.push_str(FORMAT_ERROR_MARKER);
    }

    buf
}

/**
Concatenate values without any separator.

Adjacent numbers run together: `sprint(&[&1, &2])` is `"12"`.
*/
pub fn sprint(args: &[&dyn fmt::Display]) -> String {
    let mut buf = String::new();

    for arg in args {
        if write!(buf, "{}", arg).is_err() {
            buf.push_str(FORMAT_ERROR_MARKER);
        }
    }

    buf
}

/// Join values with single spaces and terminate the result with a newline.
pub fn sprintln(args: &[&dyn fmt::Display]) -> String {
    let mut buf = String::new();

    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            buf.push(' ');
        }

        if write!(buf, "{}", arg).is_err() {
            buf.push_str(FORMAT_ERROR_MARKER);
        }
    }

    buf.push('\n');
    buf
}

/**
A verbosity threshold that can be changed while loggers are using it.
*/
#[derive(Debug, Default)]
pub struct Verbosity(AtomicI32);

impl Verbosity {
    pub fn new(level: impl Into<Level>) -> Self {
        Verbosity(AtomicI32::new(level.into().0))
    }

    pub fn get(&self) -> Level {
        Level(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, level: impl Into<Level>) {
        self.0.store(level.into().0, Ordering::Relaxed)
    }
}

/**
A leveled logging backend.

Implementations only need to provide `write` and `verbosity`.
The `print`, `println` and `printf` entry points render their arguments and hand
the result to `write`.

Writing a `Severity::Fatal` line may terminate the process.
*/
pub trait Backend: Send + Sync {
    /// Write a rendered message at the given severity.
    fn write(&self, severity: Severity, message: &str);

    /// The currently configured verbosity threshold.
    fn verbosity(&self) -> Level;

    /// Whether logging at `level` is enabled by the current threshold.
    fn enabled(&self, level: Level) -> bool {
        level <= self.verbosity()
    }

    fn print(&self, severity: Severity, args: &[&dyn fmt::Display]) {
        self.write(severity, &sprint(args))
    }

    fn println(&self, severity: Severity, args: &[&dyn fmt::Display]) {
        self.write(severity, &sprintln(args))
    }

    fn printf(&self, severity: Severity, args: fmt::Arguments) {
        self.write(severity, &sprintf(args))
    }
}

/**
A backend that keeps lines in memory.

There's a buffer per severity. A line is written to the buffer of its own
severity and to the buffers of every lower severity, so the info buffer
contains everything.

Fatal lines never terminate the process.
*/
#[derive(Debug, Default)]
pub struct MemoryBackend {
    verbosity: Verbosity,
    buffers: Mutex<[String; 4]>,
}

impl MemoryBackend {
    pub fn new(verbosity: impl Into<Level>) -> Self {
        MemoryBackend {
            verbosity: Verbosity::new(verbosity),
            buffers: Default::default(),
        }
    }

    pub fn set_verbosity(&self, level: impl Into<Level>) {
        self.verbosity.set(level)
    }

    /// Everything written to the buffer for `severity`.
    pub fn contents(&self, severity: Severity) -> String {
        let buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);

        buffers[severity as usize].clone()
    }

    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        let buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);

        buffers[severity as usize].contains(needle)
    }

    /// Empty all buffers.
    pub fn clear(&self) {
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);

        for buf in buffers.iter_mut() {
            buf.clear();
        }
    }
}

impl Backend for MemoryBackend {
    fn write(&self, severity: Severity, message: &str) {
        let mut line = format!("{}] {}", severity.as_char(), message);
        if !line.ends_with('\n') {
            line.push('\n');
        }

        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);

        for lower in Severity::ALL.iter().filter(|lower| **lower <= severity) {
            buffers[*lower as usize].push_str(&line);
        }
    }

    fn verbosity(&self) -> Level {
        self.verbosity.get()
    }
}

/**
The process-wide `log` facade.
*/
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalLog;

impl Log for GlobalLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        stdlog::logger().enabled(metadata)
    }

    fn log(&self, record: &Record) {
        stdlog::logger().log(record)
    }

    fn flush(&self) {
        stdlog::logger().flush()
    }
}

/// The status a fatal line exits the process with.
pub const FATAL_EXIT_CODE: i32 = 255;

/**
A backend that forwards lines to a `log::Log`.

Each line becomes a record at `Severity::level`, carrying the severity tag as a
`severity` key-value so fatal lines can be told apart from errors.
After a fatal line the logger is flushed and the process exits with
`FATAL_EXIT_CODE`, unless that's been switched off with `exit_on_fatal`.
*/
#[derive(Debug)]
pub struct LogBackend<L = GlobalLog> {
    inner: L,
    verbosity: Verbosity,
    target: String,
    exit_on_fatal: bool,
}

impl LogBackend<GlobalLog> {
    /// A backend over whatever logger is installed in the `log` facade.
    pub fn global(verbosity: impl Into<Level>) -> Self {
        LogBackend::new(GlobalLog, verbosity)
    }
}

impl<L> LogBackend<L>
where
    L: Log,
{
    pub fn new(inner: L, verbosity: impl Into<Level>) -> Self {
        LogBackend {
            inner,
            verbosity: Verbosity::new(verbosity),
            target: env!("CARGO_PKG_NAME").replace('-', "_"),
            exit_on_fatal: true,
        }
    }

    /// Set the target of forwarded records.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Whether writing a fatal line exits the process. Defaults to `true`.
    pub fn exit_on_fatal(mut self, exit: bool) -> Self {
        self.exit_on_fatal = exit;
        self
    }

    /// Change the verbosity threshold for loggers derived from now on.
    pub fn set_verbosity(&self, level: impl Into<Level>) {
        self.verbosity.set(level)
    }

    /// The `log::Log` lines are forwarded to.
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L> Backend for LogBackend<L>
where
    L: Log,
{
    fn write(&self, severity: Severity, message: &str) {
        let kv = (SEVERITY_KEY, severity.as_tag());

        self.inner.log(
            &Record::builder()
                .args(format_args!("{}", message.trim_end_matches('\n')))
                .level(severity.level())
                .target(&self.target)
                .key_values(&kv)
                .build(),
        );

        if severity == Severity::Fatal {
            self.inner.flush();

            if self.exit_on_fatal {
                process::exit(FATAL_EXIT_CODE);
            }
        }
    }

    fn verbosity(&self) -> Level {
        self.verbosity.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use stdlog::kv::Key;

    /// A `log::Log` that remembers what it was given.
    #[derive(Default)]
    struct Capture {
        records: Mutex<Vec<(stdlog::Level, String, String, Option<String>)>>,
        flushes: AtomicUsize,
    }

    impl Log for Capture {
        fn enabled(&self, _: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            let severity = record
                .key_values()
                .get(Key::from_str(SEVERITY_KEY))
                .map(|value| value.to_string());

            self.records.lock().unwrap().push((
                record.level(),
                record.target().to_owned(),
                record.args().to_string(),
                severity,
            ));
        }

        fn flush(&self) {
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("half")?;
            Err(fmt::Error)
        }
    }

    #[test]
    fn failing_display_leaves_marker() {
        let rendered = sprintf(format_args!("value: {}", Broken));
        assert_eq!(format!("value: half{}", FORMAT_ERROR_MARKER), rendered);

        let rendered = sprint(&[&"a", &Broken, &"b"]);
        assert_eq!(format!("ahalf{}b", FORMAT_ERROR_MARKER), rendered);
    }

    #[test]
    fn print_concatenates_and_println_separates() {
        assert_eq!("hello42", sprint(&[&"hello", &42]));
        assert_eq!("12", sprint(&[&1, &2]));
        assert_eq!("hello 42\n", sprintln(&[&"hello", &42]));
        assert_eq!("\n", sprintln(&[]));
    }

    #[test]
    fn memory_backend_cascades_to_lower_severities() {
        let backend = MemoryBackend::new(0);

        backend.write(Severity::Error, "bad things");

        assert!(backend.contains(Severity::Info, "E] bad things\n"));
        assert!(backend.contains(Severity::Warning, "E] bad things\n"));
        assert!(backend.contains(Severity::Error, "E] bad things\n"));
        assert!(!backend.contains(Severity::Fatal, "bad things"));

        backend.write(Severity::Info, "fine\n");
        assert_eq!("E] bad things\nI] fine\n", backend.contents(Severity::Info));
        assert_eq!("E] bad things\n", backend.contents(Severity::Error));

        backend.clear();
        assert_eq!("", backend.contents(Severity::Info));
    }

    #[test]
    fn verbosity_gates_levels() {
        let backend = MemoryBackend::new(3);

        assert!(backend.enabled(Level(3)));
        assert!(!backend.enabled(Level(4)));

        backend.set_verbosity(4);
        assert!(backend.enabled(Level(4)));
    }

    #[test]
    fn log_backend_forwards_records() {
        let backend = LogBackend::new(Capture::default(), 0).target("test");

        backend.println(Severity::Warning, &[&"careful", &"now"]);

        let records = backend.inner().records.lock().unwrap();
        assert_eq!(
            vec![(
                stdlog::Level::Warn,
                "test".to_owned(),
                "careful now".to_owned(),
                Some("W".to_owned()),
            )],
            *records
        );
    }

    #[test]
    fn log_backend_flushes_fatal_lines() {
        let backend = LogBackend::new(Capture::default(), 0).exit_on_fatal(false);

        backend.printf(Severity::Fatal, format_args!("going down: {}", 1));

        let records = backend.inner().records.lock().unwrap();
        assert_eq!(stdlog::Level::Error, records[0].0);
        assert_eq!("log_prefix", records[0].1);
        assert_eq!("going down: 1", records[0].2);
        assert_eq!(Some("F".to_owned()), records[0].3);
        assert_eq!(1, backend.inner().flushes.load(Ordering::SeqCst));
    }
}
