//! Interactive check of terminal mode switching.
//!
//! The program captures the terminal (the controlling terminal when stdin is
//! redirected), switches to game mode and prints the byte value of each key
//! read from stdin:
//! - `q` restores the terminal and exits with status 0
//! - `i` toggles keyboard interrupts on and off
//! - `!` raises a fatal error, exiting with status 1
//!
//! # Environment Variables
//!
//! - `DEBUG`: When set, logs every terminal transition to stderr.
//! - `RUST_LOG`: Standard `env_logger` filter, overrides `DEBUG`.

use std::io::{self, Read, Write};

use ttyguard::{
    GuardOptions, PlainScreen, TerminalModeGuard, TermiosBackend, console, fatal, logs,
};

fn main() {
    logs::init();

    let mut guard = TerminalModeGuard::new(
        TermiosBackend::for_session(),
        PlainScreen::stdout(),
        GuardOptions::default(),
    );
    guard.capture_initial_state();
    console::check_linux_console();
    console::init_linux_console();

    println!(
        "speed class {}, erase {:#04x}, kill {:#04x}, intr {:#04x}",
        guard.speed_index(),
        guard.erase_char(),
        guard.kill_char(),
        guard.intr_char()
    );
    println!("press keys; q quits, i toggles interrupts, ! fails");

    let mut game = guard.game_mode();
    let mut interrupts = true;
    let mut stdin = io::stdin().lock();
    let mut byte = [0u8; 1];

    loop {
        match stdin.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => fatal!(game, "read failed: {e}"),
        }

        match byte[0] {
            b'q' => break,
            b'!' => fatal!(game, "fatal error requested with {:?}", '!'),
            b'i' => {
                interrupts = !interrupts;
                if interrupts {
                    game.enable_interrupts();
                } else {
                    game.disable_interrupts();
                }
                print!("interrupts {}\r\n", if interrupts { "on" } else { "off" });
            }
            key => print!("key {key:#04x}\r\n"),
        }
        io::stdout().flush().ok();
    }

    game.finish(Some("terminal restored"));
}
