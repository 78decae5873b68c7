/*!
Try setting the `LOG_PREFIX_V` environment variable to `2` and run this example.
*/

#[macro_use]
extern crate log_prefix;

use log_prefix::{Config, Context, Logger};

fn query(ctxt: &Context) {
    let logger = Logger::from_context(ctxt).add_prefix("[database]");

    logger.infoln(&[&"doing database stuff"]);
    infof!(logger.at_level(2), "{} rows scanned", 1024);
}

fn handle(ctxt: &Context, name: &str) {
    let logger = Logger::from_context(ctxt).add_prefix(format_args!("[request {}]", name));
    infof!(logger, "handling a request for {}", name);

    query(&logger.attach(ctxt));

    if ctxt.is_done() {
        warningf!(logger, "request abandoned: {:?}", ctxt.err());
    }
}

fn main() {
    let config = Config::from_env().unwrap_or_default();
    log_prefix::init(config).expect("failed to initialize logging");

    let logger = Logger::new_with_prefix("[basic.rs]");
    logger.infoln(&[&"starting up"]);

    let (ctxt, cancel) = Context::background().with_cancel();
    let ctxt = logger.attach(&ctxt);

    handle(&ctxt, "Timmy");

    cancel.cancel();
    handle(&ctxt, "Tommy");

    logger.infoln(&[&"finishing up"]);
}
