extern crate log_prefix;

use std::sync::Arc;

use log_prefix::{Context, Logger, MemoryBackend, Severity};

// Each file under `tests` is its own process, so the default backend is still unset here
#[test]
fn fallback_logger_writes_to_the_default_backend() {
    let backend = Arc::new(MemoryBackend::new(0));
    log_prefix::set_default_backend(backend.clone()).expect("default backend already set");

    let _attached = Logger::new_with_prefix("stale").attach(&Context::background());

    let logger = Logger::from_context(&Context::background());

    logger.info(&[&"i"]);
    logger.infoln(&[&"i", &"ln"]);
    logger.infof(format_args!("i{}", "f"));
    logger.warning(&[&"w"]);
    logger.warningln(&[&"w", &"ln"]);
    logger.warningf(format_args!("w{}", "f"));
    logger.error(&[&"e"]);
    logger.errorln(&[&"e", &"ln"]);
    logger.errorf(format_args!("e{}", "f"));
    logger.fatal(&[&"f"]);

    assert_eq!(
        "I] i\nI] i ln\nI] if\n\
         W] w\nW] w ln\nW] wf\n\
         E] e\nE] e ln\nE] ef\n\
         F] f\n",
        backend.contents(Severity::Info)
    );
    assert!(!backend.contains(Severity::Info, "stale"));
}
