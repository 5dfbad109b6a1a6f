//! Screen manager.
//!
//! The terminal doubles as a live output stream and an overlay surface for
//! the command prompt, transient panels, and bottom-line messages. This
//! type owns the coordination: it tracks the cursor itself (every paint
//! goes through it), remembers the main stream position across overlays,
//! and reserves the bottom row for error/notice messages.
//!
//! Panel idiom: save cursor, paint downward from `main_row` (plus one row
//! when a line was mid-assembly), update `main_row`/`main_col` to the new
//! panel bottom with the column forced to 0, restore the cursor.

use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, ScrollUp},
};
use std::io::{Stdout, Write, stdout};

/// Width of the `> ` command prompt, the left boundary for backspace.
const PROMPT_WIDTH: u16 = 2;

pub struct Screen {
    out: Stdout,
    rows: u16,
    cols: u16,
    /// Tracked cursor; the terminal cursor is always moved through this.
    row: u16,
    col: u16,
    /// Stream position captured when an overlay takes the cursor away.
    main_row: u16,
    main_col: u16,
}

impl Screen {
    pub fn new() -> Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self::with_size(cols, rows))
    }

    /// Size-injected constructor; `new` queries the terminal.
    pub fn with_size(cols: u16, rows: u16) -> Self {
        Self {
            out: stdout(),
            rows: rows.max(2),
            cols: cols.max(2),
            row: 0,
            col: 0,
            main_row: 0,
            main_col: 0,
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols.max(2);
        self.rows = rows.max(2);
        self.row = self.row.min(self.rows - 1);
        self.col = self.col.min(self.cols - 1);
        self.main_row = self.main_row.min(self.rows - 1);
        self.main_col = self.main_col.min(self.cols - 1);
    }

    fn bottom(&self) -> u16 {
        self.rows - 1
    }

    fn sync_cursor(&mut self) -> Result<()> {
        queue!(self.out, MoveTo(self.col, self.row))?;
        Ok(())
    }

    fn queue_newline(&mut self) -> Result<()> {
        if self.row + 1 >= self.rows {
            queue!(self.out, ScrollUp(1))?;
            // Scrolling moves the remembered stream position with the text.
            self.main_row = self.main_row.saturating_sub(1);
        } else {
            self.row += 1;
        }
        self.col = 0;
        queue!(self.out, MoveTo(self.col, self.row))?;
        Ok(())
    }

    fn queue_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            match b {
                b'\n' => self.queue_newline()?,
                b'\r' => {
                    self.col = 0;
                    queue!(self.out, MoveTo(self.col, self.row))?;
                }
                _ => {
                    queue!(self.out, Print(b as char))?;
                    self.col += 1;
                    if self.col >= self.cols {
                        self.queue_newline()?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Paint raw bytes at the stream cursor, wrapping and scrolling.
    pub fn stream_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.sync_cursor()?;
        self.queue_bytes(bytes)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn stream_str(&mut self, text: &str) -> Result<()> {
        self.stream_bytes(text.as_bytes())
    }

    /// Green `Launchpad> ` line at the stream cursor (startup advisories).
    pub fn banner_line(&mut self, message: &str) -> Result<()> {
        self.sync_cursor()?;
        queue!(self.out, SetForegroundColor(Color::Green))?;
        self.queue_bytes(format!("Launchpad> {message}\n").as_bytes())?;
        queue!(self.out, ResetColor)?;
        self.out.flush()?;
        Ok(())
    }

    fn panel_origin(&self) -> u16 {
        let adjust = if self.main_col > 0 { 1 } else { 0 };
        (self.main_row + adjust).min(self.bottom())
    }

    fn paint_panel(&mut self, text: &str, green: bool) -> Result<()> {
        let (save_row, save_col) = (self.row, self.col);
        self.row = self.panel_origin();
        self.col = 0;
        self.sync_cursor()?;
        if green {
            queue!(self.out, SetForegroundColor(Color::Green))?;
        }
        self.queue_bytes(text.as_bytes())?;
        if green {
            queue!(self.out, ResetColor)?;
        }
        self.main_row = self.row;
        self.main_col = 0;
        self.row = save_row.min(self.bottom());
        self.col = save_col;
        self.sync_cursor()?;
        self.out.flush()?;
        Ok(())
    }

    /// Multi-line transient panel (help, status, configuration).
    pub fn panel(&mut self, text: &str) -> Result<()> {
        self.paint_panel(text, false)
    }

    /// One-line green `Launchpad> ` notice rendered with panel placement.
    pub fn notice(&mut self, message: &str) -> Result<()> {
        self.paint_panel(&format!("Launchpad> {message}\n"), true)
    }

    fn overlay_bottom(&mut self, text: &str, fg: Color, bg: Color) -> Result<()> {
        let bottom = self.bottom();
        queue!(
            self.out,
            MoveTo(0, bottom),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(fg),
            SetBackgroundColor(bg),
        )?;
        let limit = self.cols as usize;
        let clipped: String = text.chars().take(limit).collect();
        queue!(self.out, Print(clipped), ResetColor)?;
        // Overlay does not move the logical cursor.
        queue!(self.out, MoveTo(self.col, self.row))?;
        self.out.flush()?;
        Ok(())
    }

    /// Red bottom-line error; persists until the next paint cycle wipes it.
    pub fn error_line(&mut self, message: &str) -> Result<()> {
        self.overlay_bottom(&format!("Error: {message}"), Color::White, Color::DarkRed)
    }

    /// Green bottom-line notice for long-running operations.
    pub fn wait_line(&mut self, message: &str) -> Result<()> {
        self.overlay_bottom(message, Color::Blue, Color::DarkGreen)
    }

    /// Enter the command prompt: remember the stream position, take over
    /// the bottom line.
    pub fn open_prompt(&mut self) -> Result<()> {
        self.main_row = self.row;
        self.main_col = self.col;
        self.row = self.bottom();
        self.col = 0;
        let bottom = self.row;
        queue!(
            self.out,
            MoveTo(0, bottom),
            Clear(ClearType::CurrentLine),
            Print("> "),
        )?;
        self.col = PROMPT_WIDTH;
        self.out.flush()?;
        Ok(())
    }

    /// Echo one captured command character on the prompt line.
    pub fn prompt_char(&mut self, c: char) -> Result<()> {
        if self.col + 1 >= self.cols {
            return Ok(());
        }
        self.sync_cursor()?;
        queue!(self.out, Print(c))?;
        self.col += 1;
        self.out.flush()?;
        Ok(())
    }

    pub fn prompt_backspace(&mut self) -> Result<()> {
        if self.col <= PROMPT_WIDTH {
            return Ok(());
        }
        self.col -= 1;
        queue!(
            self.out,
            MoveTo(self.col, self.row),
            Print(' '),
            MoveTo(self.col, self.row)
        )?;
        self.out.flush()?;
        Ok(())
    }

    /// Wipe the reserved bottom line (successful command epilogue).
    pub fn clear_bottom_line(&mut self) -> Result<()> {
        let bottom = self.bottom();
        queue!(
            self.out,
            MoveTo(0, bottom),
            Clear(ClearType::CurrentLine)
        )?;
        self.out.flush()?;
        Ok(())
    }

    /// Return the cursor to the remembered stream position.
    pub fn restore_main(&mut self) -> Result<()> {
        self.row = self.main_row;
        self.col = self.main_col;
        self.sync_cursor()?;
        self.out.flush()?;
        Ok(())
    }

    /// Wipe everything; the next paint starts at the origin.
    pub fn clear_all(&mut self) -> Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.row = 0;
        self.col = 0;
        self.main_row = 0;
        self.main_col = 0;
        self.out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn positions(&self) -> (u16, u16, u16, u16) {
        (self.row, self.col, self.main_row, self.main_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cursor bookkeeping is observable without a terminal; the queued
    // commands land in stdout's buffer and are irrelevant to these checks.

    #[test]
    fn streaming_tracks_rows_and_wraps() {
        let mut screen = Screen::with_size(10, 5);
        screen.stream_bytes(b"abc\n").unwrap();
        assert_eq!(screen.positions(), (1, 0, 0, 0));
        screen.stream_bytes(b"0123456789X").unwrap();
        // Ten columns filled row 1, the wrap plus X lands on row 2.
        assert_eq!(screen.positions(), (2, 1, 0, 0));
    }

    #[test]
    fn scrolling_pins_to_last_row_and_shifts_main() {
        let mut screen = Screen::with_size(20, 3);
        screen.stream_bytes(b"a\nb\n").unwrap();
        assert_eq!(screen.positions(), (2, 0, 0, 0));
        screen.open_prompt().unwrap();
        // main_row remembered at 2; another flush from the poller is not
        // possible while prompt is open, but a panel could scroll.
        screen.restore_main().unwrap();
        screen.stream_bytes(b"c\nd\n").unwrap();
        let (row, col, ..) = screen.positions();
        assert_eq!((row, col), (2, 0));
    }

    #[test]
    fn prompt_round_trip_restores_stream_position() {
        let mut screen = Screen::with_size(40, 10);
        screen.stream_bytes(b"hello").unwrap();
        screen.open_prompt().unwrap();
        assert_eq!(screen.positions(), (9, 2, 0, 5));
        screen.prompt_char(':').unwrap();
        screen.prompt_char('q').unwrap();
        assert_eq!(screen.positions().1, 4);
        screen.prompt_backspace().unwrap();
        assert_eq!(screen.positions().1, 3);
        // Backspace never erases the prompt itself.
        screen.prompt_backspace().unwrap();
        screen.prompt_backspace().unwrap();
        assert_eq!(screen.positions().1, 2);
        screen.restore_main().unwrap();
        assert_eq!(screen.positions(), (0, 5, 0, 5));
    }

    #[test]
    fn panel_advances_main_row_below_partial_line() {
        let mut screen = Screen::with_size(40, 10);
        screen.stream_bytes(b"partial").unwrap();
        screen.open_prompt().unwrap();
        screen.panel("one\ntwo\n").unwrap();
        // Painted from row 1 (below the partial line), two lines tall.
        let (.., main_row, main_col) = screen.positions();
        assert_eq!((main_row, main_col), (3, 0));
    }

    #[test]
    fn clear_resets_all_positions() {
        let mut screen = Screen::with_size(40, 10);
        screen.stream_bytes(b"x\ny\nz").unwrap();
        screen.clear_all().unwrap();
        assert_eq!(screen.positions(), (0, 0, 0, 0));
    }

    #[test]
    fn resize_clamps_positions() {
        let mut screen = Screen::with_size(80, 24);
        screen.stream_bytes(b"\n\n\n\n\n\n\n\n\n\n").unwrap();
        screen.resize(10, 4);
        let (row, col, main_row, _) = screen.positions();
        assert!(row < 4 && col < 10 && main_row < 4);
    }
}
