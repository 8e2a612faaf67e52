//! Saving, switching and restoring the terminal modes of a full-screen game.
//!
//! [`TerminalModeGuard`] owns two snapshots of the terminal configuration:
//! the one observed at start-up (the restoration target) and the one
//! currently applied. Everything else is derived from those:
//!
//! - [`capture_initial_state`](TerminalModeGuard::capture_initial_state)
//!   reads the terminal and remembers the editing characters and line speed
//! - [`enter_game_mode`](TerminalModeGuard::enter_game_mode) switches to
//!   character-at-a-time input without echo
//! - [`restore_initial_state`](TerminalModeGuard::restore_initial_state)
//!   puts the start-up configuration back
//! - [`enable_interrupts`](TerminalModeGuard::enable_interrupts) and
//!   [`disable_interrupts`](TerminalModeGuard::disable_interrupts) bind or
//!   unbind the interrupt key
//! - [`fatal_error`](TerminalModeGuard::fatal_error) restores the terminal,
//!   prints a message and exits
//!
//! Terminal failures never abort: they are reported on stderr and the guard
//! carries on with whatever state resulted.

use std::fmt;
use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::process;

use termios::{ECHO, ICANON, ISTRIP, VINTR, VMIN, VTIME, cc_t};

use crate::config::{
    CTRL_C, DerivedChars, EXPAND_TABS, OPTIONAL_CHARS, TerminalConfig, speed_to_index,
};
use crate::logs::report;
use crate::screen::{PlainScreen, ScreenHooks};
use crate::terminal::{TerminalBackend, TermiosBackend};

/// Settings that do not come from the terminal itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOptions {
    /// Name prefixed to diagnostics, as in `hack (settty): ...`.
    pub program_name: String,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            program_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Owner of the terminal's saved and active configurations.
///
/// One guard is created per process and passed by reference to the code
/// that changes terminal modes.
#[derive(Debug)]
pub struct TerminalModeGuard<
    B: TerminalBackend = TermiosBackend,
    S: ScreenHooks = PlainScreen<io::Stdout>,
> {
    backend: B,
    screen: S,
    options: GuardOptions,
    initial: TerminalConfig,
    current: TerminalConfig,
    chars: DerivedChars,
    speed_index: u8,
    needs_restore: bool,
    cbreak: bool,
}

impl TerminalModeGuard {
    /// Guard for standard input, printing raw messages to standard output.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(TermiosBackend::stdin(), PlainScreen::stdout(), GuardOptions::default())
    }
}

impl<B: TerminalBackend, S: ScreenHooks> TerminalModeGuard<B, S> {
    /// Build a guard from its collaborators.
    ///
    /// Nothing is read from the terminal until
    /// [`capture_initial_state`](Self::capture_initial_state).
    #[must_use]
    pub fn new(backend: B, screen: S, options: GuardOptions) -> Self {
        Self {
            backend,
            screen,
            options,
            initial: TerminalConfig::default(),
            current: TerminalConfig::default(),
            chars: DerivedChars::default(),
            speed_index: 0,
            needs_restore: false,
            cbreak: false,
        }
    }

    /// Read the initial terminal state.
    ///
    /// Also records the speed class and editing characters, and switches
    /// off hardware tab expansion, which would corrupt cursor-motion
    /// sequences that contain tab bytes. Called at start-up and again after
    /// returning from a shell escape or suspend.
    pub fn capture_initial_state(&mut self) {
        match self.backend.get_attributes() {
            Ok(config) => {
                self.initial = config;
                self.needs_restore = true;
            }
            Err(e) => {
                report(&self.options.program_name, "gettty", &e);
                if !self.needs_restore {
                    // Nothing trustworthy to restore to, stay uncaptured.
                    return;
                }
            }
        }

        self.current = self.cooked_config();
        self.speed_index = speed_to_index(self.initial.output_speed);
        self.chars = self.initial.derived_chars();
        self.backend.save_ioctls();
        log::debug!(
            "captured terminal: speed_index={} chars={:?}",
            self.speed_index,
            self.chars
        );

        if self.initial.expands_tabs() {
            self.push_current();
        }
    }

    /// Switch to game mode: no echo, one character at a time.
    ///
    /// Every change is computed before the configuration is pushed, and it
    /// is pushed once at most. Returns the number of changes made, so a
    /// second call in a row returns 0 and leaves the terminal alone. The
    /// display is told to start screen mode in all cases.
    pub fn enter_game_mode(&mut self) -> usize {
        self.cbreak = true;
        if !self.needs_restore {
            log::warn!("enter_game_mode called before the terminal was captured");
            self.screen.start_screen();
            return 0;
        }

        let disabled = self.backend.disabled_value();
        let mut change = 0;

        if self.current.echo() {
            self.current.local_flags &= !ECHO;
            change += 1;
        }
        if self.current.canonical() {
            self.current.local_flags &= !ICANON;
            // be satisfied with one character; no timeout
            self.current.control_chars[VMIN] = 1;
            self.current.control_chars[VTIME] = 0;
            for &slot in OPTIONAL_CHARS {
                self.current.control_chars[slot] = disabled;
            }
            change += 1;
        }
        if !self.initial.is_seven_bit() {
            self.current.input_flags &= !ISTRIP;
        }
        if self.chars.intr != disabled && self.current.control_chars[VINTR] != CTRL_C {
            self.current.control_chars[VINTR] = CTRL_C;
            change += 1;
        }

        log::debug!("entering game mode with {change} change(s)");
        if change > 0 {
            self.push_current();
        }
        self.screen.start_screen();
        change
    }

    /// Put the initial terminal configuration back.
    ///
    /// The display leaves screen mode first, then `message` (if any) is
    /// printed directly on the restored scrolling screen. Safe to call when
    /// the terminal is already cooked.
    pub fn restore_initial_state(&mut self, message: Option<&str>) {
        self.screen.end_screen();
        if let Some(message) = message {
            self.screen.raw_print(message);
        }
        if !self.needs_restore {
            return;
        }

        match self.backend.set_attributes(&self.initial) {
            // The terminal is cooked again, so the next switch to game
            // mode starts from the captured state.
            Ok(()) => self.current = self.cooked_config(),
            Err(e) => report(&self.options.program_name, "settty", &e),
        }
        self.cbreak = !self.initial.canonical();
        // Only affects the next mode switch, the terminal is not touched.
        self.current.input_flags |= ISTRIP;
        self.backend.restore_ioctls();
        log::debug!("restored initial terminal state");
    }

    /// Deliver keyboard interrupts again, bound to `^C`.
    pub fn enable_interrupts(&mut self) {
        self.set_interrupt_char(CTRL_C);
    }

    /// Stop the keyboard from generating interrupts.
    pub fn disable_interrupts(&mut self) {
        let disabled = self.backend.disabled_value();
        self.set_interrupt_char(disabled);
    }

    /// Enter game mode for the lifetime of the returned value.
    ///
    /// The terminal is restored when the [`GameMode`] is dropped, including
    /// during unwinding.
    #[must_use = "game mode ends as soon as the value is dropped"]
    pub fn game_mode(&mut self) -> GameMode<'_, B, S> {
        self.enter_game_mode();
        GameMode {
            guard: self,
            restored: false,
        }
    }

    /// Restore the terminal if needed, then write `args` and a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the message fails.
    pub fn write_fatal<W: Write>(
        &mut self,
        mut out: W,
        args: fmt::Arguments<'_>,
    ) -> io::Result<()> {
        if self.needs_restore {
            self.restore_initial_state(None);
        }
        out.write_fmt(args)?;
        out.write_all(b"\n")?;
        out.flush()
    }

    /// Restore the terminal, print the message on stdout and exit with a
    /// failure status.
    ///
    /// See also the [`fatal!`](crate::fatal) macro.
    pub fn fatal_error(&mut self, args: fmt::Arguments<'_>) -> ! {
        if let Err(e) = self.write_fatal(io::stdout(), args) {
            eprintln!("{}: {e}", self.options.program_name);
        }
        process::exit(nix::libc::EXIT_FAILURE)
    }

    /// Editing characters captured from the initial configuration.
    #[must_use]
    pub fn derived_chars(&self) -> DerivedChars {
        self.chars
    }

    /// Erase character of the initial configuration.
    #[must_use]
    pub fn erase_char(&self) -> cc_t {
        self.chars.erase
    }

    /// Kill (erase-line) character of the initial configuration.
    #[must_use]
    pub fn kill_char(&self) -> cc_t {
        self.chars.kill
    }

    /// Interrupt character of the initial configuration.
    #[must_use]
    pub fn intr_char(&self) -> cc_t {
        self.chars.intr
    }

    /// Speed class of the terminal line, see [`speed_to_index`].
    #[must_use]
    pub fn speed_index(&self) -> u8 {
        self.speed_index
    }

    /// Whether input is delivered a character at a time.
    #[must_use]
    pub fn cbreak(&self) -> bool {
        self.cbreak
    }

    /// Whether the terminal must be restored before the process exits.
    #[must_use]
    pub fn needs_restore(&self) -> bool {
        self.needs_restore
    }

    /// The restoration target.
    #[must_use]
    pub fn initial_config(&self) -> &TerminalConfig {
        &self.initial
    }

    /// The configuration the guard last derived for the terminal.
    #[must_use]
    pub fn current_config(&self) -> &TerminalConfig {
        &self.current
    }

    /// The terminal backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The display hooks.
    #[must_use]
    pub fn screen(&self) -> &S {
        &self.screen
    }

    // The initial configuration with hardware tab expansion switched off.
    fn cooked_config(&self) -> TerminalConfig {
        let mut config = self.initial;
        config.output_flags &= !EXPAND_TABS;
        config
    }

    fn set_interrupt_char(&mut self, intr: cc_t) {
        if !self.needs_restore {
            log::warn!("interrupt toggle called before the terminal was captured");
            return;
        }
        self.current.control_chars[VINTR] = intr;
        self.push_current();
    }

    fn push_current(&mut self) {
        log::debug!("pushing terminal config: {:?}", self.current);
        if let Err(e) = self.backend.set_attributes(&self.current) {
            report(&self.options.program_name, "setctty", &e);
        }
    }
}

/// Game mode held for a scope; restores the terminal when dropped.
///
/// Dereferences to the [`TerminalModeGuard`], so interrupts can be toggled
/// and fatal errors raised while it is held.
#[derive(Debug)]
pub struct GameMode<'a, B: TerminalBackend, S: ScreenHooks> {
    guard: &'a mut TerminalModeGuard<B, S>,
    restored: bool,
}

impl<B: TerminalBackend, S: ScreenHooks> GameMode<'_, B, S> {
    /// Leave game mode now, printing `message` on the restored screen.
    pub fn finish(mut self, message: Option<&str>) {
        self.guard.restore_initial_state(message);
        self.restored = true;
    }
}

impl<B: TerminalBackend, S: ScreenHooks> Deref for GameMode<'_, B, S> {
    type Target = TerminalModeGuard<B, S>;

    fn deref(&self) -> &Self::Target {
        self.guard
    }
}

impl<B: TerminalBackend, S: ScreenHooks> DerefMut for GameMode<'_, B, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard
    }
}

impl<B: TerminalBackend, S: ScreenHooks> Drop for GameMode<'_, B, S> {
    fn drop(&mut self) {
        if !self.restored {
            self.guard.restore_initial_state(None);
        }
    }
}

/// Restore the terminal, print a formatted message and exit with a failure
/// status.
///
/// ```no_run
/// # use ttyguard::{TerminalModeGuard, fatal};
/// let mut guard = TerminalModeGuard::stdio();
/// guard.capture_initial_state();
/// fatal!(guard, "Cannot open {}", "record");
/// ```
#[macro_export]
macro_rules! fatal {
    ($guard:expr, $($arg:tt)*) => {
        $guard.fatal_error(::std::format_args!($($arg)*))
    };
}
