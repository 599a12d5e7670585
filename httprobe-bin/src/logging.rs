use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

use crate::verbosity::Verbosity;

/// Initialize the logging system with the given verbosity level.
///
/// Log records go to stderr so that stdout only ever carries result lines.
pub(crate) fn init_logging(verbose: &Verbosity) {
    // Overridden by RUST_LOG if it's set
    let env = Env::default().filter_or("RUST_LOG", "warn");

    let mut builder = Builder::from_env(env);
    builder
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false);

    if std::env::var("RUST_LOG").is_err() {
        let level_filter = verbose.log_level_filter();

        // Keep dependencies quiet unless explicitly asked for via RUST_LOG
        builder.filter_level(LevelFilter::Warn.min(level_filter));
        builder
            .filter_module("httprobe", level_filter)
            .filter_module("httprobe_lib", level_filter);
    }

    builder.format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()));
    builder.init();
}
