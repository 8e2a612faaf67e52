//! Linux virtual-console character-set remapping.
//!
//! The Linux console draws the game's line-drawing characters correctly only
//! when its user-defined character map (`G0 = U`) is active. On start-up the
//! map is switched in, and an exit hook switches the normal map (`G0 = B`)
//! back. Nothing here happens on other terminals or platforms.

use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Select the normal character map.
pub const MAP_ON: &[u8] = b"\x1b(B";

/// Select the user-defined character map.
pub const MAP_OFF: &[u8] = b"\x1b(U";

// Read by the exit hook, which has no way to receive context.
static LINUX_CONSOLE: AtomicBool = AtomicBool::new(false);

/// Detect whether standard input is a Linux virtual console.
///
/// Returns the detection result, which is also remembered for
/// [`linux_map_on`], [`linux_map_off`] and [`init_linux_console`].
pub fn check_linux_console() -> bool {
    let detected =
        io::stdin().is_terminal() && vt::is_virtual_console(nix::libc::STDIN_FILENO);
    if detected {
        LINUX_CONSOLE.store(true, Ordering::Relaxed);
    }
    log::debug!("linux console: {detected}");
    detected
}

/// Whether [`check_linux_console`] found a Linux virtual console.
#[must_use]
pub fn is_linux_console() -> bool {
    LINUX_CONSOLE.load(Ordering::Relaxed)
}

/// Switch the console back to the normal character map.
pub fn linux_map_on() {
    if let Err(e) = switch_charset(is_linux_console(), io::stdout(), MAP_ON) {
        log::debug!("linux_map_on failed: {e}");
    }
}

/// Switch the console to the user-defined character map.
pub fn linux_map_off() {
    if let Err(e) = switch_charset(is_linux_console(), io::stdout(), MAP_OFF) {
        log::debug!("linux_map_off failed: {e}");
    }
}

/// On a Linux console, switch to the user-defined map and arrange for the
/// normal map to come back when the process exits.
pub fn init_linux_console() {
    if !is_linux_console() {
        return;
    }
    if !vt::register_exit_hook() {
        log::warn!("could not register console restore hook");
    }
    linux_map_off();
}

fn switch_charset<W: Write>(enabled: bool, mut out: W, sequence: &[u8]) -> io::Result<()> {
    if enabled {
        out.write_all(sequence)?;
        out.flush()?;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
mod vt {
    #![allow(unsafe_code)]

    use nix::libc::{self, c_char, c_short};
    use std::os::unix::io::RawFd;

    const VT_GETMODE: u32 = 0x5601;

    /// `struct vt_mode` from `<linux/vt.h>`.
    #[repr(C)]
    #[derive(Debug, Default)]
    #[allow(dead_code)]
    pub struct VtMode {
        mode: c_char,
        waitv: c_char,
        relsig: c_short,
        acqsig: c_short,
        frsig: c_short,
    }

    nix::ioctl_read_bad!(vt_getmode, VT_GETMODE, VtMode);

    pub fn is_virtual_console(fd: RawFd) -> bool {
        let mut mode = VtMode::default();
        // SAFETY: `mode` is a valid, writable `struct vt_mode` for the call.
        unsafe { vt_getmode(fd, &mut mode) }.is_ok()
    }

    extern "C" fn map_on_at_exit() {
        super::linux_map_on();
    }

    pub fn register_exit_hook() -> bool {
        // SAFETY: the hook is a plain `extern "C" fn` that never unwinds.
        unsafe { libc::atexit(map_on_at_exit) == 0 }
    }
}

#[cfg(not(target_os = "linux"))]
mod vt {
    use std::os::unix::io::RawFd;

    pub fn is_virtual_console(_fd: RawFd) -> bool {
        false
    }

    pub fn register_exit_hook() -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_charset_writes_sequence() -> io::Result<()> {
        let mut out = Vec::new();
        switch_charset(true, &mut out, MAP_OFF)?;
        switch_charset(true, &mut out, MAP_ON)?;

        assert_eq!(out, b"\x1b(U\x1b(B");
        Ok(())
    }

    #[test]
    fn test_switch_charset_disabled() -> io::Result<()> {
        let mut out = Vec::new();
        switch_charset(false, &mut out, MAP_OFF)?;

        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn test_sequences_are_three_bytes() {
        assert_eq!(MAP_ON.len(), 3);
        assert_eq!(MAP_OFF.len(), 3);
    }

    #[test]
    fn test_check_linux_console_dont_panic() {
        // Test runners rarely own a virtual console; only the flag's
        // consistency is checked
        let detected = check_linux_console();
        if detected {
            assert!(is_linux_console());
        }
    }
}
