use std::io::Write;

use env_logger::Builder;

/// Initialize the process-wide logger. Safe to call more than once; only
/// the first call takes effect.
pub fn init_log() {
    let mut builder = Builder::from_default_env();
    builder
        .format_timestamp_secs()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} - {}] [{}:{}] {}",
                record.level(),
                record.target(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args(),
            )
        })
        .is_test(false)
        .try_init()
        .ok();
}
