use env_logger::{Builder, Env};

/// Environment variable that overrides the logging level set via CLI flags.
const LOG_ENV_VAR: &str = "KSTATE_LOG";

/// Initialize logging for the whole process.
///
/// The default filter starts at WARN; each `-v` on the command line makes it
/// one level louder, each `-q` one level quieter. A `KSTATE_LOG` environment
/// variable, when set, wins over the flags.
///
/// # Arguments
///
/// * `verbose` - How many `-v` flags were passed
/// * `quiet` - How many `-q` flags were passed
pub fn init(verbose: u8, quiet: u8) {
    let default_level = match verbose as i8 - quiet as i8 {
        i8::MIN..=-2 => "off",
        -1 => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        3..=i8::MAX => "trace",
    };

    Builder::from_env(Env::default().filter_or(LOG_ENV_VAR, default_level))
        .format_timestamp_millis()
        .init();
}
