//! Log formatter shared between the library's own `log` call sites and
//! the demonstration binary.

use env_logger::Builder;
use std::io::Write;

/// Install an `env_logger` formatter that prints level, target, and
/// call site. Respects `RUST_LOG` via `from_default_env`.
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
                record.args()
            )
        })
        .init();
}
