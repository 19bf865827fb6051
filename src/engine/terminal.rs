//! Canvas model and input layout.
//!
//! The canvas is 1-based with row 1 at the bottom, so the first input line
//! lands on the top row. Layout turns every input character with a display
//! width into an [`EffectCharacter`]; wide characters take two columns.

use rand::Rng;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

use crate::error::{EngineError, EngineResult};
use crate::geometry::Coord;

use super::character::{CharacterId, EffectCharacter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Columns between tab stops.
    pub tab_width: usize,
    /// Frames per second during playback; 0 plays unthrottled.
    pub frame_rate: u32,
    /// 0 fits the canvas to the input.
    pub canvas_width: usize,
    /// 0 fits the canvas to the input.
    pub canvas_height: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            tab_width: 4,
            frame_rate: 100,
            canvas_width: 0,
            canvas_height: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: i32,
    pub height: i32,
}

impl Canvas {
    pub fn new(width: i32, height: i32) -> Self {
        Canvas {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn top(&self) -> i32 {
        self.height
    }

    pub fn right(&self) -> i32 {
        self.width
    }

    pub fn bottom(&self) -> i32 {
        1
    }

    pub fn left(&self) -> i32 {
        1
    }

    pub fn center(&self) -> Coord {
        Coord::new(self.width / 2 + 1, self.height / 2 + 1)
    }

    pub fn coord_is_in_canvas(&self, coord: Coord) -> bool {
        (self.left()..=self.right()).contains(&coord.column)
            && (self.bottom()..=self.top()).contains(&coord.row)
    }

    /// A random coordinate on the canvas, or with `outside` one just beyond
    /// a random edge.
    pub fn random_coord(&self, outside: bool) -> Coord {
        let mut rng = rand::thread_rng();
        let column = rng.gen_range(self.left()..=self.right());
        let row = rng.gen_range(self.bottom()..=self.top());
        if !outside {
            return Coord::new(column, row);
        }
        match rng.gen_range(0..4) {
            0 => Coord::new(column, self.top() + 1),
            1 => Coord::new(column, self.bottom() - 1),
            2 => Coord::new(self.left() - 1, row),
            _ => Coord::new(self.right() + 1, row),
        }
    }
}

/// The laid-out input: canvas plus one character per input symbol, in
/// reading order.
#[derive(Debug, Clone)]
pub struct Terminal {
    config: TerminalConfig,
    canvas: Canvas,
    characters: Vec<EffectCharacter>,
}

impl Terminal {
    pub fn new(input: &str, config: TerminalConfig) -> Self {
        let lines: Vec<Vec<(char, usize)>> = input
            .trim_end_matches(['\n', '\r'])
            .lines()
            .map(|line| expand_line(line, config.tab_width))
            .collect();

        let input_width = lines
            .iter()
            .map(|line| line.iter().map(|(_, width)| width).sum::<usize>())
            .max()
            .unwrap_or(0);
        let width = if config.canvas_width > 0 { config.canvas_width } else { input_width };
        let height = if config.canvas_height > 0 { config.canvas_height } else { lines.len() };
        let canvas = Canvas::new(width as i32, height as i32);

        let mut characters = Vec::new();
        for (line_index, line) in lines.iter().enumerate() {
            let row = canvas.top() - line_index as i32;
            if row < canvas.bottom() {
                break;
            }
            let mut column = 1;
            for &(ch, width) in line {
                if column + width as i32 - 1 > canvas.right() {
                    break;
                }
                let id = CharacterId(characters.len());
                characters.push(EffectCharacter::new(
                    id,
                    ch.to_string(),
                    Coord::new(column, row),
                    width > 1,
                ));
                column += width as i32;
            }
        }

        Terminal {
            config,
            canvas,
            characters,
        }
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn characters(&self) -> &[EffectCharacter] {
        &self.characters
    }

    pub fn characters_mut(&mut self) -> &mut [EffectCharacter] {
        &mut self.characters
    }

    pub fn character_ids(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.characters.iter().map(EffectCharacter::id)
    }

    pub fn character(&self, id: CharacterId) -> EngineResult<&EffectCharacter> {
        self.characters
            .get(id.0)
            .ok_or(EngineError::UnknownCharacter { id: id.0 })
    }

    pub fn character_mut(&mut self, id: CharacterId) -> EngineResult<&mut EffectCharacter> {
        self.characters
            .get_mut(id.0)
            .ok_or(EngineError::UnknownCharacter { id: id.0 })
    }

    pub fn set_character_visibility(&mut self, id: CharacterId, visible: bool) -> EngineResult<()> {
        self.character_mut(id)?.set_visible(visible);
        Ok(())
    }

    /// Character ids grouped by input row, bottom row first, each row in
    /// column order.
    pub fn rows_bottom_to_top(&self) -> Vec<Vec<CharacterId>> {
        let mut rows: Vec<Vec<CharacterId>> = Vec::new();
        for row in self.canvas.bottom()..=self.canvas.top() {
            let ids: Vec<CharacterId> = self
                .characters
                .iter()
                .filter(|c| c.input_coord().row == row)
                .map(EffectCharacter::id)
                .collect();
            if !ids.is_empty() {
                rows.push(ids);
            }
        }
        rows
    }
}

/// Expand tabs to the next stop and pair every printable char with its
/// display width. Zero-width chars are dropped.
fn expand_line(line: &str, tab_width: usize) -> Vec<(char, usize)> {
    let tab_width = tab_width.max(1);
    let mut out = Vec::new();
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = tab_width - column % tab_width;
            out.extend(std::iter::repeat_n((' ', 1), pad));
            column += pad;
            continue;
        }
        match ch.width() {
            Some(width) if width > 0 => {
                out.push((ch, width));
                column += width;
            }
            _ => {}
        }
    }
    out
}
