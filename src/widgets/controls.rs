use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Paragraph, Widget},
};

#[derive(Default)]
pub struct Controls {
    pub point_count: Option<usize>,
    pub loading: bool,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_point_count(mut self, point_count: Option<usize>) -> Self {
        self.point_count = point_count;
        self
    }

    pub fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        const CONTROLS: [(&str, &str); 6] = [
            ("Tab", "Focus"),
            ("↑↓", "Move"),
            ("Enter", "Select"),
            ("r", "Speed"),
            ("Esc", "Close"),
            ("q", "Quit"),
        ];

        let mut constraints = CONTROLS.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });

        // Space for the loading indicator and point count on the right
        constraints.push(Constraint::Length(14));
        constraints.push(Constraint::Length(15));
        constraints.push(Constraint::Fill(1));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);
        let color = Color::DarkGray;
        let base_style = Style::default();

        for (i, (key, action)) in CONTROLS.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(base_style.add_modifier(Modifier::BOLD))
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(base_style.bg(color))
                .render(layout[j + 1], buf);
        }

        let mut idx = CONTROLS.len() * 2;
        if self.loading {
            Paragraph::new("Loading...")
                .style(base_style.bg(color).fg(Color::Yellow))
                .right_aligned()
                .render(layout[idx], buf);
        } else {
            Paragraph::new("").style(base_style.bg(color)).render(layout[idx], buf);
        }
        idx += 1;

        if let Some(count) = self.point_count {
            Paragraph::new(format!("Points: {}", count))
                .style(base_style.bg(color).fg(Color::White))
                .right_aligned()
                .render(layout[idx], buf);
        } else {
            Paragraph::new("").style(base_style.bg(color)).render(layout[idx], buf);
        }
        idx += 1;

        Paragraph::new("")
            .style(base_style.bg(color))
            .render(layout[idx], buf);
    }
}
