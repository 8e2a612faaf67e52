//! Terminal device operations and low-level terminal control.
//!
//! This module provides:
//! - The [`TerminalBackend`] capability the mode guard drives
//! - [`TermiosBackend`], the POSIX implementation built on `termios`
//! - Opening the controlling terminal (`/dev/tty`) when stdin is redirected

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use termios::{TCSADRAIN, Termios, cc_t, cfgetospeed, cfsetospeed, tcsetattr};

use crate::config::TerminalConfig;

const CONTROLLING_TTY: &str = "/dev/tty";

/// Value of an unbound special-character slot (`_POSIX_VDISABLE`).
pub const POSIX_VDISABLE: cc_t = nix::libc::_POSIX_VDISABLE;

/// The operating-system terminal-control facility.
///
/// Reads and writes happen as one atomic unit per call. Implementations
/// other than [`TermiosBackend`] exist mainly for tests.
pub trait TerminalBackend {
    /// Read the live terminal configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is not a terminal or the read fails.
    fn get_attributes(&mut self) -> Result<TerminalConfig>;

    /// Apply a configuration to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal rejects the configuration.
    fn set_attributes(&mut self, config: &TerminalConfig) -> Result<()>;

    /// The value that marks a special-character slot as unbound.
    fn disabled_value(&self) -> cc_t;

    /// Save platform ioctl state alongside the initial configuration.
    fn save_ioctls(&mut self) {}

    /// Restore the ioctl state saved by [`save_ioctls`](Self::save_ioctls).
    fn restore_ioctls(&mut self) {}
}

/// POSIX `termios` backend for one terminal descriptor.
#[derive(Debug)]
pub struct TermiosBackend {
    fd: RawFd,
    // Keeps an opened `/dev/tty` alive for as long as `fd` is used.
    _device: Option<File>,
}

impl TermiosBackend {
    /// Backend for an already open descriptor.
    #[must_use]
    pub fn new(fd: RawFd) -> Self {
        Self { fd, _device: None }
    }

    /// Backend for standard input, the usual controlling terminal.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(nix::libc::STDIN_FILENO)
    }

    /// Backend for the controlling terminal, regardless of how
    /// stdin/stdout are redirected.
    ///
    /// # Errors
    ///
    /// Returns an error if `/dev/tty` cannot be opened.
    pub fn controlling_terminal() -> Result<Self> {
        Self::open_device(Path::new(CONTROLLING_TTY))
    }

    /// Backend for the terminal a game session should drive.
    ///
    /// Standard input when it is a terminal; otherwise the controlling
    /// terminal, so `game < moves.txt` still switches modes on the screen
    /// the player sees. Falls back to standard input if there is none.
    #[must_use]
    pub fn for_session() -> Self {
        Self::select(io::stdin().is_terminal(), Self::controlling_terminal)
    }

    fn select(stdin_is_tty: bool, open: impl FnOnce() -> Result<Self>) -> Self {
        if stdin_is_tty {
            return Self::stdin();
        }
        match open() {
            Ok(backend) => {
                log::debug!("stdin is redirected, using {CONTROLLING_TTY}");
                backend
            }
            Err(e) => {
                log::debug!("no controlling terminal ({e:#}), using stdin");
                Self::stdin()
            }
        }
    }

    fn open_device(path: &Path) -> Result<Self> {
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Self {
            fd: device.as_raw_fd(),
            _device: Some(device),
        })
    }

    /// The descriptor this backend controls.
    #[must_use]
    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl TerminalBackend for TermiosBackend {
    fn get_attributes(&mut self) -> Result<TerminalConfig> {
        let termios = Termios::from_fd(self.fd).context("Failed to get terminal attributes")?;
        Ok(snapshot(&termios))
    }

    fn set_attributes(&mut self, config: &TerminalConfig) -> Result<()> {
        // Start from the live settings so fields the snapshot does not
        // carry (line discipline number, input speed) stay untouched.
        let mut termios =
            Termios::from_fd(self.fd).context("Failed to get terminal attributes")?;
        termios.c_iflag = config.input_flags;
        termios.c_oflag = config.output_flags;
        termios.c_cflag = config.control_flags;
        termios.c_lflag = config.local_flags;
        termios.c_cc = config.control_chars;
        cfsetospeed(&mut termios, config.output_speed).context("Failed to set output speed")?;

        tcsetattr(self.fd, TCSADRAIN, &termios).context("Failed to set terminal attributes")
    }

    fn disabled_value(&self) -> cc_t {
        POSIX_VDISABLE
    }
}

fn snapshot(termios: &Termios) -> TerminalConfig {
    TerminalConfig {
        input_flags: termios.c_iflag,
        output_flags: termios.c_oflag,
        control_flags: termios.c_cflag,
        local_flags: termios.c_lflag,
        control_chars: termios.c_cc,
        output_speed: cfgetospeed(termios),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_get_attributes_not_a_tty() -> Result<()> {
        let file = fs::File::open("Cargo.toml")?;
        let mut backend = TermiosBackend::new(file.as_raw_fd());

        let err = backend.get_attributes().unwrap_err();
        assert!(err.to_string().contains("terminal attributes"));
        Ok(())
    }

    #[test]
    fn test_set_attributes_not_a_tty() -> Result<()> {
        let file = fs::File::open("Cargo.toml")?;
        let mut backend = TermiosBackend::new(file.as_raw_fd());

        assert!(backend.set_attributes(&TerminalConfig::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_open_device_missing() {
        let err = TermiosBackend::open_device(Path::new("/nonexistent/tty")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tty"));
    }

    #[test]
    fn test_open_device_keeps_descriptor_alive() -> Result<()> {
        let mut backend = TermiosBackend::open_device(Path::new("Cargo.toml"))?;
        assert_ne!(backend.fd(), nix::libc::STDIN_FILENO);

        // Still open: the failure comes from the terminal check, not EBADF
        let err = backend.get_attributes().unwrap_err();
        assert!(format!("{err:#}").contains("terminal attributes"));
        Ok(())
    }

    #[test]
    fn test_select_prefers_tty_stdin() {
        let backend = TermiosBackend::select(true, || panic!("must not open a device"));
        assert_eq!(backend.fd(), nix::libc::STDIN_FILENO);
    }

    #[test]
    fn test_select_redirected_stdin() {
        let backend = TermiosBackend::select(false, || {
            TermiosBackend::open_device(Path::new("Cargo.toml"))
        });
        assert_ne!(backend.fd(), nix::libc::STDIN_FILENO);

        let backend = TermiosBackend::select(false, || {
            TermiosBackend::open_device(Path::new("/nonexistent/tty"))
        });
        assert_eq!(backend.fd(), nix::libc::STDIN_FILENO);
    }

    #[test]
    fn test_disabled_value_matches_platform() {
        assert_eq!(POSIX_VDISABLE, nix::libc::_POSIX_VDISABLE);
    }

    #[test]
    fn test_stdin_backend() {
        let backend = TermiosBackend::stdin();
        assert_eq!(backend.fd(), 0);
        assert_eq!(backend.disabled_value(), POSIX_VDISABLE);
    }
}
