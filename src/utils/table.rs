use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Box-drawn table for terminal output. Columns size to their widest cell,
/// capped at `max_width`.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    max_width: usize,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            max_width: 32,
        }
    }

    pub fn max_width(mut self, width: usize) -> Self {
        self.max_width = width.max(2);
        self
    }

    /// Missing cells render blank; extra cells are dropped.
    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cells: Vec<String> = cells.into_iter().map(Into::into).collect();
        cells.resize(self.headers.len(), String::new());
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| row[i].width())
                    .chain(std::iter::once(header.width()))
                    .max()
                    .unwrap_or(0)
                    .min(self.max_width)
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let rule = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("{}{}{}\n", left, segments.join(mid), right)
        };
        let line = |cells: &[String]| {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!(" {} ", truncate_string(cell, *w)))
                .collect();
            format!("│{}│\n", padded.join("│"))
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&self.headers));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

/// Pad or cut `s` to exactly `max_len` columns, marking cuts with an ellipsis.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let visual_width = s.width();
    if visual_width <= max_len {
        return format!("{}{}", s, " ".repeat(max_len - visual_width));
    }

    let ellipsis = UnicodeWidthChar::width('…').unwrap_or(1);
    let mut truncated = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width + ellipsis > max_len {
            break;
        }
        truncated.push(ch);
        current_width += ch_width;
    }
    truncated.push('…');
    current_width += ellipsis;
    format!("{}{}", truncated, " ".repeat(max_len.saturating_sub(current_width)))
}

/// Blank for missing optional values in table cells.
pub fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}
