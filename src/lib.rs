//! Terminal mode management for full-screen console games.
//!
//! A game captures the terminal's start-up configuration once, switches to
//! character-at-a-time input while it draws the screen, and must put the
//! start-up configuration back on every way out of the program:
//!
//! ```no_run
//! use ttyguard::TerminalModeGuard;
//!
//! let mut guard = TerminalModeGuard::stdio();
//! guard.capture_initial_state();
//! {
//!     let mut game = guard.game_mode();
//!     game.disable_interrupts();
//!     // ... play ...
//!     game.enable_interrupts();
//! } // cooked mode again
//! ```

pub mod config;
pub mod console;
pub mod guard;
pub mod logs;
pub mod screen;
pub mod terminal;

pub use config::{CTRL_C, DerivedChars, TerminalConfig, speed_to_index};
pub use guard::{GameMode, GuardOptions, TerminalModeGuard};
pub use screen::{PlainScreen, ScreenHooks};
pub use terminal::{POSIX_VDISABLE, TerminalBackend, TermiosBackend};
