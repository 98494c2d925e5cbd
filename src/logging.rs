use env_logger::{Builder, Env};

/// `POSECTL_LOG` wins over `RUST_LOG`; both default to `info`.
pub fn init() {
    let var = if std::env::var_os("POSECTL_LOG").is_some() {
        "POSECTL_LOG"
    } else {
        "RUST_LOG"
    };
    Builder::from_env(Env::new().filter_or(var, "info"))
        .format_timestamp_millis()
        .init();
}
