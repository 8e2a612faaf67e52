//! Terminal configuration snapshots and the values derived from them.
//!
//! This module provides:
//! - [`TerminalConfig`], a plain copy of the terminal line discipline
//! - [`DerivedChars`], the editing characters other input code needs
//! - [`speed_to_index`], the baud-rate table used for display timing
//! - The platform tables of optional special characters

use termios::os::target::NCCS;
use termios::{
    B0, B50, B75, B110, B134, B150, B200, B300, B600, B1200, B1800, B2400, B4800, B9600, B19200,
    B38400, CS7, CSIZE, ECHO, ICANON, ISTRIP, VERASE, VINTR, VKILL, cc_t, speed_t, tcflag_t,
};

/// The conventional interrupt character, `^C`.
pub const CTRL_C: cc_t = 0x03;

/// Output flags that make the terminal expand tabs to spaces.
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "solaris",
    target_os = "illumos"
))]
pub const EXPAND_TABS: tcflag_t = termios::os::target::TAB3;

/// Output flags that make the terminal expand tabs to spaces.
///
/// Not a POSIX flag; platforms without it never expand.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "solaris",
    target_os = "illumos"
)))]
pub const EXPAND_TABS: tcflag_t = 0;

/// Special-character slots unbound while in game mode.
#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "solaris",
    target_os = "illumos"
))]
pub const OPTIONAL_CHARS: &[usize] = &[
    termios::os::target::VDSUSP,
    termios::os::target::VREPRINT,
    termios::os::target::VDISCARD,
    termios::os::target::VWERASE,
    termios::os::target::VLNEXT,
];

/// Special-character slots unbound while in game mode.
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "openbsd",
    target_os = "netbsd"
))]
pub const OPTIONAL_CHARS: &[usize] = &[
    termios::os::target::VREPRINT,
    termios::os::target::VDISCARD,
    termios::os::target::VWERASE,
    termios::os::target::VLNEXT,
];

/// Snapshot of the terminal line discipline.
///
/// The four flag words and the control-character array mirror
/// `struct termios`; `output_speed` is the symbolic rate constant
/// (`B9600` and friends), not a number of bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerminalConfig {
    /// Input modes (`c_iflag`)
    pub input_flags: tcflag_t,
    /// Output modes (`c_oflag`)
    pub output_flags: tcflag_t,
    /// Control modes (`c_cflag`)
    pub control_flags: tcflag_t,
    /// Local modes (`c_lflag`)
    pub local_flags: tcflag_t,
    /// Special-character slots (`c_cc`)
    pub control_chars: [cc_t; NCCS],
    /// Output baud-rate constant
    pub output_speed: speed_t,
}

impl TerminalConfig {
    /// Whether input is line-buffered and editable.
    #[must_use]
    pub fn canonical(&self) -> bool {
        self.local_flags & ICANON != 0
    }

    /// Whether typed characters are echoed back.
    #[must_use]
    pub fn echo(&self) -> bool {
        self.local_flags & ECHO != 0
    }

    /// Whether the high bit of each input byte is stripped.
    #[must_use]
    pub fn strips_high_bit(&self) -> bool {
        self.input_flags & ISTRIP != 0
    }

    /// Whether the line carries 7-bit characters.
    #[must_use]
    pub fn is_seven_bit(&self) -> bool {
        self.control_flags & CSIZE == CS7
    }

    /// Whether the terminal expands tabs on output.
    #[must_use]
    pub fn expands_tabs(&self) -> bool {
        self.output_flags & EXPAND_TABS != 0
    }

    /// Read one special-character slot.
    #[must_use]
    pub fn control_char(&self, slot: usize) -> cc_t {
        self.control_chars[slot]
    }

    /// The editing characters carried by this configuration.
    #[must_use]
    pub fn derived_chars(&self) -> DerivedChars {
        DerivedChars {
            erase: self.control_chars[VERASE],
            kill: self.control_chars[VKILL],
            intr: self.control_chars[VINTR],
        }
    }
}

/// Editing characters copied out of the initial terminal configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivedChars {
    /// Erase-previous-character key
    pub erase: cc_t,
    /// Erase-line key
    pub kill: cc_t,
    /// Keyboard interrupt key
    pub intr: cc_t,
}

/// Map an output baud-rate constant to its speed class.
///
/// Display code uses the class to decide how much padding a slow line
/// needs. Rates outside the classic table map to class 0.
///
/// # Examples
///
/// ```
/// # use ttyguard::speed_to_index;
/// assert_eq!(speed_to_index(termios::B9600), 13);
/// assert_eq!(speed_to_index(termios::os::target::B115200), 0);
/// ```
#[must_use]
pub fn speed_to_index(speed: speed_t) -> u8 {
    const TABLE: [speed_t; 16] = [
        B0, B50, B75, B110, B134, B150, B200, B300, B600, B1200, B1800, B2400, B4800, B9600,
        B19200, B38400,
    ];

    TABLE
        .iter()
        .position(|&rate| rate == speed)
        .and_then(|i| u8::try_from(i).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use termios::CS8;
    use termios::os::target::{B57600, B115200};

    #[test]
    fn test_speed_table() {
        let rates = [
            B0, B50, B75, B110, B134, B150, B200, B300, B600, B1200, B1800, B2400, B4800, B9600,
            B19200, B38400,
        ];
        for (expected, rate) in (0u8..).zip(rates) {
            assert_eq!(speed_to_index(rate), expected, "rate constant {rate}");
        }
    }

    #[test]
    fn test_speed_unknown_rate() {
        assert_eq!(speed_to_index(B57600), 0);
        assert_eq!(speed_to_index(B115200), 0);
        assert_eq!(speed_to_index(0xdead), 0);
    }

    #[test]
    fn test_derived_chars() {
        let mut config = TerminalConfig::default();
        config.control_chars[VERASE] = 0x7f;
        config.control_chars[VKILL] = 0x15;
        config.control_chars[VINTR] = CTRL_C;

        let chars = config.derived_chars();
        assert_eq!(chars.erase, 0x7f);
        assert_eq!(chars.kill, 0x15);
        assert_eq!(chars.intr, CTRL_C);
    }

    #[test]
    fn test_character_size() {
        let mut config = TerminalConfig {
            control_flags: CS8,
            ..TerminalConfig::default()
        };
        // CS8 shares bits with CS7, the whole CSIZE field must be compared
        assert!(!config.is_seven_bit());

        config.control_flags = CS7;
        assert!(config.is_seven_bit());
    }

    #[test]
    fn test_mode_flags() {
        let mut config = TerminalConfig::default();
        assert!(!config.canonical());
        assert!(!config.echo());
        assert!(!config.strips_high_bit());

        config.local_flags = ICANON | ECHO;
        config.input_flags = ISTRIP;
        assert!(config.canonical());
        assert!(config.echo());
        assert!(config.strips_high_bit());
    }

    #[test]
    fn test_expands_tabs() {
        let mut config = TerminalConfig::default();
        assert!(!config.expands_tabs());

        config.output_flags = EXPAND_TABS;
        assert_eq!(config.expands_tabs(), EXPAND_TABS != 0);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_expands_tabs_any_delay_bit() {
        use termios::os::target::TAB1;

        let config = TerminalConfig {
            output_flags: TAB1,
            ..TerminalConfig::default()
        };
        assert!(config.expands_tabs());
        assert_eq!(config.output_flags & !EXPAND_TABS, 0);
    }

    #[test]
    fn test_optional_chars_are_distinct_slots() {
        for (i, slot) in OPTIONAL_CHARS.iter().enumerate() {
            assert!(*slot < NCCS);
            assert!(![VERASE, VKILL, VINTR].contains(slot));
            assert!(!OPTIONAL_CHARS[i + 1..].contains(slot));
        }
    }

    #[cfg(any(target_os = "macos", target_os = "freebsd"))]
    #[test]
    fn test_optional_chars_include_dsusp() {
        assert!(OPTIONAL_CHARS.contains(&termios::os::target::VDSUSP));
    }
}
