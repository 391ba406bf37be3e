use log::LevelFilter;
use log::Level;
use env_logger::{Builder, Env, fmt::Color};
use std::io::Write;

/// Environment variable allowing users to override the requested verbosity.
const LOG_ENV_VAR: &str = "POTTS_LOG";

/// Initialize the global logger.
///
/// Verbosity is driven by the number of `-v` occurrences on the command line:
/// 0: Error | 1: Warn | 2: Info | 3: Debug | 4+: Trace
///
/// The `POTTS_LOG` environment variable takes precedence when set.
pub fn init_logger(verbosity: u8) {
    let log_level = u8_to_loglevel(verbosity);
    let env = Env::default().filter(LOG_ENV_VAR);

    Builder::new().filter_level(log_level)
        .format(|buf, record| {

            let traceback: String;
            let set_intensity: bool;
            if record.level() == LevelFilter::Error {
                traceback = format!("(@ {}:{}) ", record.file().unwrap_or("unknown"), record.line().unwrap_or(0));
                set_intensity = true;
            } else {
                traceback = String::from("");
                set_intensity = false;
            };

            let mut arg_style = buf.style();
            arg_style.set_intense(set_intensity);

            let mut level_style = buf.style();
            let color = match record.level() {
                Level::Error => Color::Red,
                Level::Warn  => Color::Yellow,
                Level::Info  => Color::Green,
                Level::Debug => Color::Blue,
                Level::Trace => Color::Cyan
            };
            level_style.set_color(color).set_bold(true);

            writeln!(
                buf,
                "[{} {: <5} {}] {traceback}{}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                level_style.value(record.level()),
                record.target(),
                arg_style.value(record.args())
            )
        })
        .parse_env(env)
        .try_init()
        .ok(); // Re-init is harmless: integration tests may call this more than once.
}

/// Raise or lower the maximum log level after initialization.
pub fn set_level(verbosity: u8) {
    log::set_max_level(u8_to_loglevel(verbosity));
}

fn u8_to_loglevel(verbosity: u8) -> LevelFilter {
    match verbosity {
        0            => LevelFilter::Error,
        1            => LevelFilter::Warn,
        2            => LevelFilter::Info,
        3            => LevelFilter::Debug,
        4..= u8::MAX => LevelFilter::Trace
    }
}
