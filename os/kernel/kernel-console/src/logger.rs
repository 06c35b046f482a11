use crate::{ConsoleSink, console_write};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log` backend writing `"[LEVEL] target: message\n"` lines to a sink.
pub struct ConsoleLogger<S> {
    sink: S,
    max_level: LevelFilter,
}

impl<S: ConsoleSink> ConsoleLogger<S> {
    #[must_use]
    pub const fn new(sink: S, max_level: LevelFilter) -> Self {
        Self { sink, max_level }
    }

    #[must_use]
    pub const fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Install as the global logger. Call once during early boot.
    ///
    /// # Errors
    /// Fails if a logger was already installed.
    pub fn init(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.max_level);
        Ok(())
    }
}

impl<S: ConsoleSink> Log for ConsoleLogger<S> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        console_write(
            &self.sink,
            format_args!(
                "[{}] {}: {}\n",
                record.level(),
                record.target(),
                record.args()
            ),
        );
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<String>);

    impl ConsoleSink for Capture {
        fn put_bytes(&self, bytes: &[u8]) {
            self.0
                .lock()
                .unwrap()
                .push_str(std::str::from_utf8(bytes).unwrap());
        }
    }

    fn emit(logger: &ConsoleLogger<Capture>, level: Level, msg: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .target("vm")
                .args(format_args!("{msg}"))
                .build(),
        );
    }

    #[test]
    fn formats_level_and_target() {
        let logger = ConsoleLogger::new(Capture::default(), LevelFilter::Trace);
        emit(&logger, Level::Warn, "fault at 0x0");
        assert_eq!(&*logger.sink().0.lock().unwrap(), "[WARN] vm: fault at 0x0\n");
    }

    #[test]
    fn drops_records_above_max_level() {
        let logger = ConsoleLogger::new(Capture::default(), LevelFilter::Info);
        emit(&logger, Level::Debug, "noise");
        emit(&logger, Level::Error, "tlb full");
        assert_eq!(&*logger.sink().0.lock().unwrap(), "[ERROR] vm: tlb full\n");
        assert_eq!(logger.max_level(), LevelFilter::Info);
    }

    #[test]
    fn any_sink_yields_a_log_trait_object() {
        let logger = ConsoleLogger::new(Capture::default(), LevelFilter::Trace);
        let dynamic: &(dyn Log + Send + Sync) = &logger;
        assert!(dynamic.enabled(&log::Metadata::builder().level(Level::Trace).build()));
        dynamic.log(
            &Record::builder()
                .level(Level::Info)
                .target("proc")
                .args(format_args!("pid 2 exited"))
                .build(),
        );
        assert_eq!(&*logger.sink().0.lock().unwrap(), "[INFO] proc: pid 2 exited\n");
    }
}
