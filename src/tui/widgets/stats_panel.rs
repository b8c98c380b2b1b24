use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Row, Table, Widget};

use crate::stats::ProgressSummary;

/// Overlay listing score, overall accuracy and the notes that need work.
pub struct StatsPanelWidget<'a> {
    summary: &'a ProgressSummary,
}

impl<'a> StatsPanelWidget<'a> {
    pub fn new(summary: &'a ProgressSummary) -> Self {
        Self { summary }
    }
}

fn accuracy_color(accuracy: f64) -> Color {
    if accuracy >= 0.8 {
        Color::Green
    } else if accuracy >= 0.5 {
        Color::Yellow
    } else {
        Color::Red
    }
}

impl Widget for StatsPanelWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        let block = Block::default()
            .title(" Statistics ")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::White));
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::vertical([
            Constraint::Length(3), // totals
            Constraint::Min(1),    // weak notes
            Constraint::Length(1), // key hint
        ])
        .split(inner);

        let overall = match self.summary.accuracy() {
            Some(acc) => Span::styled(
                format!(
                    "{}/{} correct ({:.1}%)",
                    self.summary.correct,
                    self.summary.attempts,
                    acc * 100.0
                ),
                Style::default().fg(accuracy_color(acc)),
            ),
            None => Span::styled("no attempts yet", Style::default().fg(Color::DarkGray)),
        };
        let totals = Paragraph::new(vec![
            Line::from(vec![
                Span::raw("  Score:   "),
                Span::styled(
                    self.summary.score.to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![Span::raw("  Overall: "), overall]),
        ]);
        totals.render(rows[0], buf);

        if self.summary.weakest.is_empty() {
            Paragraph::new(Line::from(Span::styled(
                "  Great job! Keep practising to see detailed stats.",
                Style::default().fg(Color::DarkGray),
            )))
            .render(rows[1], buf);
        } else {
            let table_rows: Vec<Row> = self
                .summary
                .weakest
                .iter()
                .map(|note| {
                    Row::new(vec![
                        note.name.clone(),
                        format!("{:.1}%", note.accuracy * 100.0),
                        note.attempts.to_string(),
                    ])
                    .style(Style::default().fg(accuracy_color(note.accuracy)))
                })
                .collect();

            let table = Table::new(
                table_rows,
                [Constraint::Length(6), Constraint::Length(9), Constraint::Length(9)],
            )
            .header(
                Row::new(vec!["Note", "Accuracy", "Attempts"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().title(" Notes to practise "));
            Widget::render(table, rows[1], buf);
        }

        Paragraph::new(Line::from(vec![
            Span::styled("  [s]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(" close"),
        ]))
        .render(rows[2], buf);
    }
}
