#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Crossterm-backed rendering adapter for Flipboard.
//!
//! The adapter switches the terminal to raw mode on the alternate screen with
//! mouse capture enabled. Pointer motion is hit-tested against the scene so
//! entering a rendered cell reports a hover, and the previous terminal state
//! is restored on exit, including when the update closure panics.

use std::{
    io::{self, Stdout, Write},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as TermEvent, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseEventKind,
    },
    execute, queue,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use flipboard_core::CellAddress;
use flipboard_rendering::{Color, FrameInput, Palette, Presentation, RenderingBackend, Scene};
use glam::UVec2;
use tracing::debug;

/// Screen row where the grid starts; the title occupies the rows above.
const GRID_TOP: u16 = 2;

/// Rendering backend that draws scenes into the current terminal.
#[derive(Clone, Copy, Debug)]
pub struct TerminalBackend {
    frame_interval: Duration,
}

impl TerminalBackend {
    /// Creates a backend that polls input and redraws every `frame_interval`.
    #[must_use]
    pub const fn new(frame_interval: Duration) -> Self {
        Self { frame_interval }
    }
}

impl Default for TerminalBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

impl RenderingBackend for TerminalBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static,
    {
        let Presentation {
            title,
            palette,
            mut scene,
        } = presentation;

        let mut stdout = io::stdout();
        let _guard = TerminalGuard::enter(&mut stdout)?;
        execute!(stdout, SetTitle(&title)).context("failed to set terminal title")?;

        let (width, _) = terminal::size().context("failed to query terminal size")?;
        scene.resize(u32::from(width.max(1)))?;

        let mut pointer = PointerTracker::default();
        let mut last_frame = Instant::now();
        let mut drawn: Option<(u64, u32, String)> = None;

        loop {
            let mut input = FrameInput::default();
            let mut quit = false;

            if event::poll(self.frame_interval).context("failed to poll terminal events")? {
                loop {
                    let event = event::read().context("failed to read terminal event")?;
                    match classify(&event) {
                        InputAction::Pointer { column, row } => {
                            if let Some(address) = pointer.enter(&scene, column, row) {
                                input.hovered = Some(address);
                            }
                        }
                        InputAction::NextPrompt => input.next_prompt = true,
                        InputAction::ToggleAudio => input.toggle_audio = true,
                        InputAction::Resize { columns } => {
                            scene.resize(u32::from(columns.max(1)))?;
                            drawn = None;
                            debug!(columns, "terminal resized");
                        }
                        InputAction::Quit => quit = true,
                        InputAction::Ignore => {}
                    }
                    if quit || !event::poll(Duration::ZERO)? {
                        break;
                    }
                }
            }
            if quit {
                break;
            }

            let now = Instant::now();
            let dt = now.duration_since(last_frame);
            last_frame = now;
            update_scene(dt, input, &mut scene);

            let state = (scene.revision(), scene.columns(), scene.status.clone());
            if drawn.as_ref() != Some(&state) {
                draw(&mut stdout, &title, &palette, &scene)?;
                drawn = Some(state);
            }
        }

        Ok(())
    }
}

/// Restores the terminal when dropped.
struct TerminalGuard;

impl TerminalGuard {
    fn enter(stdout: &mut Stdout) -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture, Hide)
            .context("failed to prepare terminal")?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            ResetColor,
            Show,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// Interpretation of a raw terminal event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputAction {
    Pointer { column: u16, row: u16 },
    NextPrompt,
    ToggleAudio,
    Resize { columns: u16 },
    Quit,
    Ignore,
}

fn classify(event: &TermEvent) -> InputAction {
    match event {
        TermEvent::Key(key) => classify_key(key),
        TermEvent::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Down(_) => {
                InputAction::Pointer {
                    column: mouse.column,
                    row: mouse.row,
                }
            }
            _ => InputAction::Ignore,
        },
        TermEvent::Resize(columns, _) => InputAction::Resize { columns: *columns },
        _ => InputAction::Ignore,
    }
}

fn classify_key(key: &KeyEvent) -> InputAction {
    if key.kind != KeyEventKind::Press {
        return InputAction::Ignore;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => InputAction::Quit,
        KeyCode::Char('q') | KeyCode::Esc => InputAction::Quit,
        KeyCode::Char('n') | KeyCode::Char(' ') | KeyCode::Enter => InputAction::NextPrompt,
        KeyCode::Char('a') => InputAction::ToggleAudio,
        _ => InputAction::Ignore,
    }
}

/// Turns pointer motion into enter transitions over rendered cells.
#[derive(Debug, Default)]
struct PointerTracker {
    current: Option<CellAddress>,
}

impl PointerTracker {
    /// Returns the cell the pointer just entered, if it moved onto a new one.
    fn enter(&mut self, scene: &Scene, column: u16, row: u16) -> Option<CellAddress> {
        let hit = row
            .checked_sub(GRID_TOP)
            .and_then(|row| scene.cell_at(UVec2::new(u32::from(column), u32::from(row))));
        if hit == self.current {
            return None;
        }
        self.current = hit;
        hit
    }
}

fn term_color(color: Color) -> TermColor {
    let [r, g, b] = color.to_rgb_u8();
    TermColor::Rgb { r, g, b }
}

fn draw(stdout: &mut Stdout, title: &str, palette: &Palette, scene: &Scene) -> Result<()> {
    queue!(
        stdout,
        SetBackgroundColor(term_color(palette.background)),
        Clear(ClearType::All),
        MoveTo(0, 0),
        SetForegroundColor(term_color(palette.status)),
        Print(title)
    )?;

    for cell in &scene.cells {
        let column = u16::try_from(cell.position.x).unwrap_or(u16::MAX);
        let row = u16::try_from(cell.position.y)
            .unwrap_or(u16::MAX)
            .saturating_add(GRID_TOP);
        queue!(
            stdout,
            MoveTo(column, row),
            SetForegroundColor(term_color(palette.foreground(cell.style))),
            Print(cell.glyph)
        )?;
    }

    let status_row = u16::try_from(scene.rows())
        .unwrap_or(u16::MAX)
        .saturating_add(GRID_TOP + 1);
    queue!(
        stdout,
        MoveTo(0, status_row),
        SetForegroundColor(term_color(palette.status)),
        Print(&scene.status)
    )?;
    stdout.flush().context("failed to flush terminal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, MouseButton, MouseEvent};
    use flipboard_core::{CellView, Glyph, GridView, SessionPhase, WordPhase, WordView};

    fn key(code: KeyCode) -> TermEvent {
        TermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> TermEvent {
        TermEvent::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn scene(words: &[&str]) -> Scene {
        let grid = GridView {
            session: None,
            phase: SessionPhase::Settled,
            words: words
                .iter()
                .map(|word| WordView {
                    cells: word
                        .chars()
                        .map(|ch| CellView {
                            target: Glyph::new(ch),
                            display: Some(Glyph::new(ch)),
                            settled: true,
                        })
                        .collect(),
                    phase: WordPhase::Settled,
                })
                .collect(),
            revision: 1,
        };
        Scene::from_grid(&grid, 40).expect("scene")
    }

    #[test]
    fn prompt_keys_advance_and_quit_keys_exit() {
        assert_eq!(classify(&key(KeyCode::Char('n'))), InputAction::NextPrompt);
        assert_eq!(classify(&key(KeyCode::Enter)), InputAction::NextPrompt);
        assert_eq!(classify(&key(KeyCode::Char(' '))), InputAction::NextPrompt);
        assert_eq!(classify(&key(KeyCode::Char('a'))), InputAction::ToggleAudio);
        assert_eq!(classify(&key(KeyCode::Esc)), InputAction::Quit);
        assert_eq!(
            classify(&TermEvent::Key(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            ))),
            InputAction::Quit
        );
    }

    #[test]
    fn key_releases_are_ignored() {
        let release = TermEvent::Key(KeyEvent {
            code: KeyCode::Char('n'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(classify(&release), InputAction::Ignore);
    }

    #[test]
    fn pointer_motion_is_reported_with_coordinates() {
        assert_eq!(
            classify(&mouse(MouseEventKind::Moved, 4, 3)),
            InputAction::Pointer { column: 4, row: 3 }
        );
        assert_eq!(
            classify(&mouse(MouseEventKind::Up(MouseButton::Left), 4, 3)),
            InputAction::Ignore
        );
        assert_eq!(
            classify(&TermEvent::Resize(100, 30)),
            InputAction::Resize { columns: 100 }
        );
    }

    #[test]
    fn pointer_reports_each_cell_once_on_entry() {
        let scene = scene(&["AB", "CD"]);
        let mut tracker = PointerTracker::default();

        assert_eq!(tracker.enter(&scene, 1, GRID_TOP), Some(CellAddress::new(0, 1)));
        assert_eq!(tracker.enter(&scene, 1, GRID_TOP), None, "no re-entry while inside");
        assert_eq!(tracker.enter(&scene, 2, GRID_TOP), None, "gap between words");
        assert_eq!(tracker.enter(&scene, 3, GRID_TOP), Some(CellAddress::new(1, 0)));
        assert_eq!(tracker.enter(&scene, 3, 0), None, "title row is not a cell");
        assert_eq!(tracker.enter(&scene, 3, GRID_TOP), Some(CellAddress::new(1, 0)));
    }
}
