use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use crate::notes::Clef;
use crate::practice::VisualState;

/// Highest and lowest staff line positions.
const TOP_LINE: i32 = 8;
const BOTTOM_LINE: i32 = 0;

/// Columns between the ghost note and the target.
const GHOST_OFFSET: u16 = 6;

/// Staff with the target note head, an optional ghost of the last wrong
/// note, and the note name when the hint is shown.
pub struct NoteDisplayWidget<'a> {
    clef: Clef,
    target: Option<&'a str>,
    ghost: Option<&'a str>,
    visual: VisualState,
    hint: bool,
    large: bool,
}

impl<'a> NoteDisplayWidget<'a> {
    pub fn new(clef: Clef, target: Option<&'a str>, visual: VisualState) -> Self {
        Self {
            clef,
            target,
            ghost: None,
            visual,
            hint: false,
            large: false,
        }
    }

    pub fn with_ghost(mut self, ghost: Option<&'a str>) -> Self {
        self.ghost = ghost;
        self
    }

    pub fn with_hint(mut self, hint: bool) -> Self {
        self.hint = hint;
        self
    }

    pub fn large(mut self, large: bool) -> Self {
        self.large = large;
        self
    }

    fn head_color(&self) -> Color {
        match self.visual {
            VisualState::Idle => Color::White,
            VisualState::Correct => Color::Green,
            VisualState::Wrong => Color::Red,
        }
    }
}

impl Widget for NoteDisplayWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = self.head_color();
        let block = Block::default()
            .title(format!(" {} ", self.clef.label()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));
        let inner = block.inner(area);
        block.render(area, buf);

        let hint_height = match (self.hint, self.large) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => GLYPH_HEIGHT as u16,
        };
        let rows = Layout::vertical([Constraint::Min(1), Constraint::Length(hint_height)]).split(inner);

        let target_pos = self.target.and_then(|n| self.clef.staff_position(n));
        let ghost_pos = self.ghost.and_then(|n| self.clef.staff_position(n));
        render_staff(
            rows[0],
            buf,
            target_pos.map(|p| (p, self.head_color())),
            ghost_pos,
        );

        if let (true, Some(name)) = (self.hint, self.target) {
            let style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
            let lines: Vec<Line> = if self.large {
                block_letters(name)
                    .into_iter()
                    .map(|row| Line::from(Span::styled(row, style)))
                    .collect()
            } else {
                vec![Line::from(Span::styled(format!("Hint: {name}"), style))]
            };
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .render(rows[1], buf);
        }
    }
}

/// One text row per staff position, top to bottom.
fn render_staff(area: Rect, buf: &mut Buffer, target: Option<(i32, Color)>, ghost: Option<i32>) {
    if area.width < 3 || area.height == 0 {
        return;
    }

    let heads: Vec<i32> = target.map(|(p, _)| p).into_iter().chain(ghost).collect();
    let high = heads.iter().copied().fold(TOP_LINE + 2, i32::max);
    let low = heads.iter().copied().fold(BOTTOM_LINE - 2, i32::min);

    let span = (high - low + 1) as u16;
    let top = area.y + area.height.saturating_sub(span) / 2;
    let center = area.x + area.width / 2;
    let line_style = Style::default().fg(Color::Gray);

    for (row, pos) in (low..=high).rev().enumerate() {
        let y = top + row as u16;
        if y >= area.y + area.height {
            break;
        }

        if (BOTTOM_LINE..=TOP_LINE).contains(&pos) && pos % 2 == 0 {
            buf.set_string(area.x, y, "─".repeat(area.width as usize), line_style);
        } else if pos % 2 == 0 {
            for head in &heads {
                if needs_ledger(*head, pos) {
                    let x = head_column(center, *head, target, ghost).saturating_sub(2);
                    buf.set_string(x, y, "─────", line_style);
                }
            }
        }

        if ghost == Some(pos) {
            let x = center.saturating_sub(GHOST_OFFSET);
            buf.set_string(x, y, "○", Style::default().fg(Color::DarkGray));
        }
        if let Some((_, color)) = target.filter(|(p, _)| *p == pos) {
            buf.set_string(center, y, "●", Style::default().fg(color).add_modifier(Modifier::BOLD));
        }
    }
}

fn head_column(center: u16, head: i32, target: Option<(i32, Color)>, ghost: Option<i32>) -> u16 {
    let is_target = target.is_some_and(|(p, _)| p == head);
    if !is_target && ghost == Some(head) {
        center.saturating_sub(GHOST_OFFSET)
    } else {
        center
    }
}

/// Whether a note at `head` needs a ledger line drawn at `pos`.
fn needs_ledger(head: i32, pos: i32) -> bool {
    (pos < BOTTOM_LINE && head <= pos) || (pos > TOP_LINE && head >= pos)
}

const GLYPH_HEIGHT: usize = 5;

fn glyph(c: char) -> [&'static str; GLYPH_HEIGHT] {
    match c {
        'A' => [" ███ ", "█   █", "█████", "█   █", "█   █"],
        'B' => ["████ ", "█   █", "████ ", "█   █", "████ "],
        'C' => [" ████", "█    ", "█    ", "█    ", " ████"],
        'D' => ["████ ", "█   █", "█   █", "█   █", "████ "],
        'E' => ["█████", "█    ", "████ ", "█    ", "█████"],
        'F' => ["█████", "█    ", "████ ", "█    ", "█    "],
        'G' => [" ████", "█    ", "█  ██", "█   █", " ████"],
        '2' => ["████ ", "    █", " ███ ", "█    ", "█████"],
        '3' => ["████ ", "    █", " ███ ", "    █", "████ "],
        '4' => ["█   █", "█   █", "█████", "    █", "    █"],
        '5' => ["█████", "█    ", "████ ", "    █", "████ "],
        _ => ["     ", "     ", "     ", "     ", "     "],
    }
}

/// Render a note name as rows of block letters.
fn block_letters(text: &str) -> Vec<String> {
    (0..GLYPH_HEIGHT)
        .map(|row| {
            text.chars()
                .map(|c| glyph(c)[row])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
