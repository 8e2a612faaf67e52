//! Logging and diagnostic utilities.
//!
//! Library code logs through the `log` facade. Failures of terminal
//! operations are not errors to the caller: they are reported on stderr
//! with [`report`] and execution goes on.

use std::env;

use log::LevelFilter;

/// Install a stderr logger if `DEBUG` or `RUST_LOG` is set.
///
/// `RUST_LOG` filters take precedence; `DEBUG` alone enables the `debug`
/// level for everything. Logging never goes to stdout, which belongs to the
/// full-screen display while the terminal is in game mode.
pub fn init() {
    let debug = env::var("DEBUG").is_ok();
    if !debug && env::var("RUST_LOG").is_err() {
        return;
    }

    let mut builder = env_logger::Builder::new();
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok();
}

/// Format a failed terminal operation the way it is shown to the user.
///
/// # Examples
///
/// ```
/// # use ttyguard::logs::diagnostic;
/// let err = anyhow::anyhow!("Inappropriate ioctl for device");
/// assert_eq!(
///     diagnostic("ttyguard", "gettty", &err),
///     "ttyguard (gettty): Inappropriate ioctl for device"
/// );
/// ```
#[must_use]
pub fn diagnostic(program: &str, op: &str, err: &anyhow::Error) -> String {
    format!("{program} ({op}): {err:#}")
}

/// Report a failed terminal operation on stderr and carry on.
pub fn report(program: &str, op: &str, err: &anyhow::Error) {
    eprintln!("{}", diagnostic(program, op, err));
    log::debug!("{op} failed: {err:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    #[test]
    fn test_diagnostic_includes_cause_chain() {
        let err = Err::<(), _>(anyhow!("Bad file descriptor"))
            .context("Failed to set terminal attributes")
            .unwrap_err();

        assert_eq!(
            diagnostic("hack", "setctty", &err),
            "hack (setctty): Failed to set terminal attributes: Bad file descriptor"
        );
    }

    #[test]
    fn test_report_and_init_dont_panic() {
        // These should not panic regardless of DEBUG setting
        init();
        report("hack", "settty", &anyhow!("Test report"));
    }
}
