//! Display-layer hooks the mode guard brackets its transitions with.

use std::io::{self, Write};

/// Hooks into the full-screen display layer.
///
/// The guard starts screen mode after the terminal is in game mode and ends
/// it before the terminal goes back to cooked mode, so messages printed
/// through [`raw_print`](Self::raw_print) land on a normal scrolling screen.
pub trait ScreenHooks {
    /// Switch the display into full-screen mode.
    fn start_screen(&mut self);

    /// Leave full-screen mode.
    fn end_screen(&mut self);

    /// Print a message directly, bypassing the display layer.
    fn raw_print(&mut self, message: &str);
}

/// Screen hooks for programs without a display layer.
///
/// Starting and ending the screen do nothing; raw messages are written as a
/// line to the wrapped sink.
#[derive(Debug)]
pub struct PlainScreen<W: Write> {
    out: W,
}

impl<W: Write> PlainScreen<W> {
    /// Wrap an output sink.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the hooks and return the sink.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl PlainScreen<io::Stdout> {
    /// Plain hooks writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ScreenHooks for PlainScreen<W> {
    fn start_screen(&mut self) {}

    fn end_screen(&mut self) {}

    fn raw_print(&mut self, message: &str) {
        let result = writeln!(self.out, "{message}").and_then(|()| self.out.flush());
        if let Err(e) = result {
            log::warn!("raw_print failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_print_appends_newline() {
        let mut screen = PlainScreen::new(Vec::new());
        screen.start_screen();
        screen.raw_print("Be seeing you...");
        screen.end_screen();

        assert_eq!(screen.into_inner(), b"Be seeing you...\n");
    }
}
