#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Flipboard adapters.

use anyhow::Result as AnyResult;
use flipboard_core::{CellAddress, CellView, GridView};
use glam::UVec2;
use std::{collections::HashMap, error::Error, fmt, time::Duration};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Converts the color to byte RGB channels, ignoring alpha.
    #[must_use]
    pub fn to_rgb_u8(self) -> [u8; 3] {
        [
            channel_to_u8(self.red),
            channel_to_u8(self.green),
            channel_to_u8(self.blue),
        ]
    }
}

fn channel_to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Visual state of a rendered cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellStyle {
    /// The cell's word has not begun revealing.
    Unset,
    /// The cell shows a transient glyph.
    Scrambling,
    /// The cell shows its target.
    Settled,
}

impl CellStyle {
    fn of(cell: &CellView) -> Self {
        match cell.display {
            None => Self::Unset,
            Some(glyph) if cell.settled && glyph == cell.target => Self::Settled,
            Some(_) => Self::Scrambling,
        }
    }
}

/// Colors applied to each cell style.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    /// Solid color used to clear each frame.
    pub background: Color,
    /// Foreground of settled cells.
    pub settled: Color,
    /// Foreground of scrambling cells.
    pub scrambling: Color,
    /// Foreground of the status line.
    pub status: Color,
}

impl Palette {
    /// Foreground color for the provided style.
    #[must_use]
    pub const fn foreground(&self, style: CellStyle) -> Color {
        match style {
            CellStyle::Unset => self.background,
            CellStyle::Scrambling => self.scrambling,
            CellStyle::Settled => self.settled,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        let settled = Color::from_rgb_u8(236, 236, 236);
        Self {
            background: Color::from_rgb_u8(12, 12, 14),
            settled,
            scrambling: Color::from_rgb_u8(214, 168, 62),
            status: Color::from_rgb_u8(120, 120, 128),
        }
    }
}

/// Immutable snapshot of one rendered cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneCell {
    /// Address of the cell in the engine's grid.
    pub address: CellAddress,
    /// Column and row of the cell on screen.
    pub position: UVec2,
    /// Character to draw.
    pub glyph: char,
    /// Visual state of the cell.
    pub style: CellStyle,
}

/// Lookup from screen positions to cell addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HitGrid {
    regions: HashMap<UVec2, CellAddress>,
}

impl HitGrid {
    /// Address of the cell drawn at `position`, if any.
    #[must_use]
    pub fn cell_at(&self, position: UVec2) -> Option<CellAddress> {
        self.regions.get(&position).copied()
    }

    /// Number of hit regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no cell is rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Renderable description of the engine's grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    columns: u32,
    rows: u32,
    revision: u64,
    /// Cells in reading order.
    pub cells: Vec<SceneCell>,
    /// Hit regions for every rendered cell.
    pub hits: HitGrid,
    /// Line drawn below the grid.
    pub status: String,
}

impl Scene {
    /// Creates an empty scene wrapped to `columns`.
    pub fn new(columns: u32) -> Result<Self, RenderingError> {
        if columns == 0 {
            return Err(RenderingError::ZeroColumns);
        }
        Ok(Self {
            columns,
            rows: 0,
            revision: 0,
            cells: Vec::new(),
            hits: HitGrid::default(),
            status: String::new(),
        })
    }

    /// Builds a scene for `grid` wrapped to `columns`.
    pub fn from_grid(grid: &GridView, columns: u32) -> Result<Self, RenderingError> {
        let mut scene = Self::new(columns)?;
        scene.update(grid);
        Ok(scene)
    }

    /// Changes the wrap width. Takes effect on the next [`Scene::update`].
    pub fn resize(&mut self, columns: u32) -> Result<(), RenderingError> {
        if columns == 0 {
            return Err(RenderingError::ZeroColumns);
        }
        self.columns = columns;
        Ok(())
    }

    /// Lays out `grid` again and refreshes every cell.
    pub fn update(&mut self, grid: &GridView) {
        let lengths: Vec<usize> = grid.words.iter().map(|word| word.cells.len()).collect();
        let positions = wrap_words(&lengths, self.columns);

        self.cells.clear();
        self.hits.regions.clear();
        self.rows = 0;
        for (word_index, (word, word_positions)) in grid.words.iter().zip(positions).enumerate() {
            for (cell_index, (cell, position)) in word.cells.iter().zip(word_positions).enumerate()
            {
                let address = CellAddress::new(word_index, cell_index);
                self.cells.push(SceneCell {
                    address,
                    position,
                    glyph: cell.display.map_or(' ', |glyph| glyph.get()),
                    style: CellStyle::of(cell),
                });
                let _ = self.hits.regions.insert(position, address);
                self.rows = self.rows.max(position.y + 1);
            }
        }
        self.revision = grid.revision;
    }

    /// Wrap width in columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows occupied by the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Revision of the grid the scene was last built from.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Address of the cell drawn at `position`, if any.
    #[must_use]
    pub fn cell_at(&self, position: UVec2) -> Option<CellAddress> {
        self.hits.cell_at(position)
    }

    /// Plain-text rows of the grid, padded with spaces between words.
    #[must_use]
    pub fn text_rows(&self) -> Vec<String> {
        let mut rows = vec![Vec::new(); self.rows as usize];
        for cell in &self.cells {
            let row: &mut Vec<char> = &mut rows[cell.position.y as usize];
            let column = cell.position.x as usize;
            if row.len() <= column {
                row.resize(column + 1, ' ');
            }
            row[column] = cell.glyph;
        }
        rows.into_iter()
            .map(|row| row.into_iter().collect::<String>().trim_end().to_owned())
            .collect()
    }
}

/// Computes screen positions for words of the given lengths.
///
/// Words are separated by one column and wrapped to `columns`. A word that
/// does not fit on the current line moves to the next one; a word longer than
/// a whole line breaks across lines.
pub fn layout_words(lengths: &[usize], columns: u32) -> Result<Vec<Vec<UVec2>>, RenderingError> {
    if columns == 0 {
        return Err(RenderingError::ZeroColumns);
    }
    Ok(wrap_words(lengths, columns))
}

fn wrap_words(lengths: &[usize], columns: u32) -> Vec<Vec<UVec2>> {
    let width = columns as usize;
    let mut x = 0_usize;
    let mut y = 0_u32;
    let mut positions = Vec::with_capacity(lengths.len());

    for &length in lengths {
        if x > 0 {
            if x + 1 + length <= width {
                x += 1;
            } else {
                x = 0;
                y += 1;
            }
        }
        let mut word = Vec::with_capacity(length);
        for _ in 0..length {
            if x >= width {
                x = 0;
                y += 1;
            }
            word.push(UVec2::new(x as u32, y));
            x += 1;
        }
        positions.push(word);
    }

    positions
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FrameInput {
    /// Cell the pointer entered during this frame.
    pub hovered: Option<CellAddress>,
    /// Whether the user asked for the next prompt.
    pub next_prompt: bool,
    /// Whether the user toggled audio cues.
    pub toggle_audio: bool,
}

/// Combined presentation data required to render a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title shown by the adapter.
    pub title: String,
    /// Colors applied to the scene.
    pub palette: Palette,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(title: T, palette: Palette, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            title: title.into(),
            palette,
            scene,
        }
    }
}

/// Rendering backend capable of presenting Flipboard scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the elapsed frame delta and
    /// the input captured by the adapter, and refreshes the scene before it is
    /// drawn.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Scenes must be at least one column wide.
    ZeroColumns,
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroColumns => write!(f, "scene must be at least one column wide"),
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use flipboard_core::{Glyph, SessionPhase, WordPhase, WordView};

    fn grid(words: &[&str]) -> GridView {
        GridView {
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
            revision: 3,
        }
    }

    #[test]
    fn words_are_separated_by_one_column() {
        let positions = layout_words(&[2, 3], 20).expect("valid width");
        assert_eq!(positions[0], vec![UVec2::new(0, 0), UVec2::new(1, 0)]);
        assert_eq!(positions[1][0], UVec2::new(3, 0));
    }

    #[test]
    fn word_that_does_not_fit_moves_to_next_line() {
        let positions = layout_words(&[4, 4], 6).expect("valid width");
        assert_eq!(positions[1][0], UVec2::new(0, 1));
    }

    #[test]
    fn long_word_breaks_across_lines() {
        let positions = layout_words(&[1, 7], 3).expect("valid width");
        let rows: Vec<u32> = positions[1].iter().map(|position| position.y).collect();
        assert_eq!(rows, vec![1, 1, 1, 2, 2, 2, 3]);
    }

    #[test]
    fn zero_columns_are_rejected_without_panicking() {
        assert_eq!(layout_words(&[1], 0), Err(RenderingError::ZeroColumns));
        assert!(Scene::new(0).is_err());
    }

    #[test]
    fn scene_hit_regions_map_back_to_addresses() {
        let scene = Scene::from_grid(&grid(&["HELLO", "WORLD"]), 8).expect("scene");
        assert_eq!(scene.rows(), 2);
        assert_eq!(scene.revision(), 3);
        assert_eq!(scene.cell_at(UVec2::new(2, 1)), Some(CellAddress::new(1, 2)));
        assert_eq!(scene.cell_at(UVec2::new(6, 0)), None);
        assert_eq!(scene.hits.len(), 10);
        assert_eq!(scene.text_rows(), vec!["HELLO".to_owned(), "WORLD".to_owned()]);
    }

    #[test]
    fn cell_style_tracks_display_state() {
        let target = Glyph::new('A');
        let unset = CellView {
            target,
            display: None,
            settled: false,
        };
        let perturbed = CellView {
            target,
            display: Some(Glyph::new('Q')),
            settled: true,
        };
        let settled = CellView {
            target,
            display: Some(target),
            settled: true,
        };
        assert_eq!(CellStyle::of(&unset), CellStyle::Unset);
        assert_eq!(CellStyle::of(&perturbed), CellStyle::Scrambling);
        assert_eq!(CellStyle::of(&settled), CellStyle::Settled);
    }

    #[test]
    fn byte_colors_convert_back_unchanged() {
        assert_eq!(Color::from_rgb_u8(0, 100, 255).to_rgb_u8(), [0, 100, 255]);
    }
}
