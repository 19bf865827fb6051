//! Renderer — composes the canvas into one frame string.
//!
//! The renderer is pure and stateless: given the same characters it always
//! produces the same text. It rasterizes visible characters onto a grid of
//! cells, then serializes the grid top row first, emitting one SGR styled run
//! per stretch of identically styled cells and trimming blank cells off the
//! right of every row.

use crossterm::style;
use unicode_width::UnicodeWidthStr;

use crate::engine::character::{CharacterId, EffectCharacter};
use crate::engine::terminal::Terminal;
use crate::types::{Cell, Color, GraphicalEffect, NamedColor};

pub struct Renderer;

impl Renderer {
    /// Compose one frame. Visible inactive characters are drawn first in id
    /// order, then the active ones in `active` order, so later characters
    /// paint over earlier ones.
    pub fn render(terminal: &Terminal, active: &[CharacterId]) -> String {
        let characters = terminal.characters();
        let mut is_active = vec![false; characters.len()];
        for id in active {
            if let Some(flag) = is_active.get_mut(id.0) {
                *flag = true;
            }
        }
        let resting = characters.iter().filter(|c| !is_active[c.id().0]);
        let moving = active.iter().filter_map(|id| characters.get(id.0));
        let grid = Self::rasterize(terminal, resting.chain(moving));

        grid.iter()
            .map(|row| Self::compose_row(row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Draw characters onto a fresh grid, row 0 being the top of the canvas.
    fn rasterize<'a>(
        terminal: &Terminal,
        characters: impl Iterator<Item = &'a EffectCharacter>,
    ) -> Vec<Vec<Cell>> {
        let canvas = terminal.canvas();
        let w = canvas.width as usize;
        let h = canvas.height as usize;
        let mut grid = vec![vec![Cell::default(); w]; h];

        for character in characters {
            let coord = character.current_coord();
            if !character.is_visible() || !canvas.coord_is_in_canvas(coord) {
                continue;
            }
            let x = (coord.column - 1) as usize;
            let y = (canvas.top() - coord.row) as usize;
            let row = &mut grid[y];
            Self::clear_wide_neighbours(row, x);
            row[x] = Cell {
                symbol: character.symbol().to_string(),
                effect: character.graphical_effect().clone(),
            };
            if character.symbol().width() > 1 && x + 1 < w {
                Self::clear_wide_neighbours(row, x + 1);
                row[x + 1] = Cell::continuation(character.graphical_effect().clone());
            }
        }

        grid
    }

    /// Drop the other half of any wide symbol occupying `row[x]`.
    fn clear_wide_neighbours(row: &mut [Cell], x: usize) {
        if row[x].symbol.is_empty() && x > 0 {
            row[x - 1] = Cell::default();
        } else if row[x].symbol.width() > 1 && x + 1 < row.len() && row[x + 1].symbol.is_empty() {
            row[x + 1] = Cell::default();
        }
    }

    fn compose_row(row: &[Cell]) -> String {
        let end = row.iter().rposition(|cell| !cell.is_blank()).map_or(0, |i| i + 1);
        let mut out = String::new();
        let mut run = String::new();
        let mut run_effect: Option<&GraphicalEffect> = None;

        for cell in &row[..end] {
            if run_effect.is_some_and(|effect| effect != &cell.effect) {
                push_run(&mut out, &run, run_effect);
                run.clear();
            }
            run_effect = Some(&cell.effect);
            run.push_str(&cell.symbol);
        }
        push_run(&mut out, &run, run_effect);
        out
    }
}

fn push_run(out: &mut String, run: &str, effect: Option<&GraphicalEffect>) {
    match effect {
        Some(effect) if !effect.is_default() && !run.is_empty() => {
            out.push_str(&to_content_style(effect).apply(run).to_string());
        }
        _ => out.push_str(run),
    }
}

// ---------------------------------------------------------------------------
// Style conversion
// ---------------------------------------------------------------------------

pub fn to_content_style(effect: &GraphicalEffect) -> style::ContentStyle {
    let mut cs = style::ContentStyle::default();
    if let Some(color) = &effect.color {
        cs.foreground_color = Some(to_ct_color(color));
    }
    let modes = [
        (effect.bold, style::Attribute::Bold),
        (effect.dim, style::Attribute::Dim),
        (effect.italic, style::Attribute::Italic),
        (effect.underline, style::Attribute::Underlined),
        (effect.blink, style::Attribute::SlowBlink),
        (effect.reverse, style::Attribute::Reverse),
        (effect.hidden, style::Attribute::Hidden),
        (effect.strike, style::Attribute::CrossedOut),
    ];
    for (enabled, attribute) in modes {
        if enabled {
            cs.attributes.set(attribute);
        }
    }
    cs
}

pub fn to_ct_color(c: &Color) -> style::Color {
    match c {
        Color::Named(n) => match n {
            NamedColor::Black => style::Color::Black,
            NamedColor::Red => style::Color::DarkRed,
            NamedColor::Green => style::Color::DarkGreen,
            NamedColor::Yellow => style::Color::DarkYellow,
            NamedColor::Blue => style::Color::DarkBlue,
            NamedColor::Magenta => style::Color::DarkMagenta,
            NamedColor::Cyan => style::Color::DarkCyan,
            NamedColor::White => style::Color::Grey,
        },
        Color::Ansi(value) => style::Color::AnsiValue(*value),
        Color::Rgb { r, g, b } => style::Color::Rgb {
            r: *r,
            g: *g,
            b: *b,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::terminal::TerminalConfig;
    use crate::geometry::Coord;

    fn visible_terminal(input: &str) -> Terminal {
        let mut terminal = Terminal::new(input, TerminalConfig::default());
        for character in terminal.characters_mut() {
            character.set_visible(true);
        }
        terminal
    }

    #[test]
    fn test_plain_rows_are_trimmed() {
        let terminal = visible_terminal("ab  \n c");
        assert_eq!(Renderer::render(&terminal, &[]), "ab\n c");
    }

    #[test]
    fn test_styled_runs() {
        let mut terminal = visible_terminal("abc");
        let red = GraphicalEffect::with_color(Color::rgb(255, 0, 0));
        for id in [0, 1] {
            terminal.characters_mut()[id].set_appearance(if id == 0 { "a" } else { "b" }, red.clone());
        }
        let frame = Renderer::render(&terminal, &[]);
        let expected = format!("{}c", to_content_style(&red).apply("ab"));
        assert_eq!(frame, expected);
    }

    #[test]
    fn test_wide_symbol_takes_two_columns() {
        let terminal = visible_terminal("世x");
        assert_eq!(Renderer::render(&terminal, &[]), "世x");

        let mut terminal = visible_terminal("abc");
        terminal.characters_mut()[0].set_appearance("世", GraphicalEffect::default());
        terminal.characters_mut()[1].set_visible(false);
        assert_eq!(Renderer::render(&terminal, &[]), "世c");
    }

    #[test]
    fn test_narrow_symbol_over_wide_clears_continuation() {
        let mut terminal = visible_terminal("世ab");
        terminal.characters_mut()[1].motion.set_coordinate(Coord::new(1, 1));
        assert_eq!(Renderer::render(&terminal, &[CharacterId(1)]), "a  b");
    }

    #[test]
    fn test_active_characters_are_drawn_once_over_resting_ones() {
        let mut terminal = visible_terminal("abc");
        terminal.characters_mut()[2].motion.set_coordinate(Coord::new(1, 1));
        terminal.characters_mut()[0].motion.set_coordinate(Coord::new(3, 1));
        assert_eq!(
            Renderer::render(&terminal, &[CharacterId(0), CharacterId(2), CharacterId(0)]),
            "cba"
        );
        assert_eq!(Renderer::render(&terminal, &[CharacterId(2), CharacterId(9)]), "cba");
    }

    #[test]
    fn test_effect_modes_map_to_attributes() {
        let effect = GraphicalEffect {
            bold: true,
            strike: true,
            color: Some(Color::Ansi(34)),
            ..GraphicalEffect::default()
        };
        let cs = to_content_style(&effect);
        assert!(cs.attributes.has(style::Attribute::Bold));
        assert!(cs.attributes.has(style::Attribute::CrossedOut));
        assert!(!cs.attributes.has(style::Attribute::Italic));
        assert_eq!(cs.foreground_color, Some(style::Color::AnsiValue(34)));
    }
}
