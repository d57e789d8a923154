use console::{style, StyledObject};
use env_logger::{Builder, Env};
use log::Level;
use std::io::Write;

fn level_tag(level: Level) -> StyledObject<&'static str> {
    match level {
        Level::Error => style("ERROR").red().bold(),
        Level::Warn => style("WARN ").yellow().bold(),
        Level::Info => style("INFO ").green(),
        Level::Debug => style("DEBUG").cyan(),
        Level::Trace => style("TRACE").dim(),
    }
}

/// Install the stderr logger.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` shows offroot's debug
/// output (spawned argv, resolved usign path) and the default is warnings,
/// which still covers every failed spawn, mapping and chroot.
pub fn init_logger(verbose: bool) {
    let default_filter = if verbose {
        "warn,offroot=debug,offroot_ctl=debug"
    } else {
        "warn"
    };

    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(move |buf, record| {
            if verbose {
                writeln!(
                    buf,
                    "{} {} {}",
                    level_tag(record.level()),
                    style(record.target()).dim(),
                    record.args()
                )
            } else {
                writeln!(buf, "{} {}", level_tag(record.level()), record.args())
            }
        })
        .init();
}
