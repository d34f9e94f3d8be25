//! Text metrics for auto-sizing nodes.
//!
//! Node boxes are derived from their text: the text is split on explicit
//! newlines, long lines are word-wrapped to the maximum box width, and the
//! box grows to fit the widest line and the number of lines. Widths are
//! estimated from display columns (`unicode-width`), so CJK and emoji
//! count double.

use smallvec::SmallVec;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Wrapped lines of a node label. Most labels fit in a few lines.
pub type Lines = SmallVec<[String; 4]>;

/// Sizing parameters for node boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    /// Estimated advance of one display column, in model units.
    pub char_width: f64,
    /// Height of one line of text.
    pub line_height: f64,
    /// Horizontal padding (both sides combined).
    pub padding_x: f64,
    /// Vertical padding (both sides combined).
    pub padding_y: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 20.0,
            padding_x: 24.0,
            padding_y: 20.0,
            min_width: 120.0,
            min_height: 60.0,
            max_width: 300.0,
        }
    }
}

impl TextMetrics {
    /// Maximum number of display columns that fit on one line.
    pub fn max_columns(&self) -> usize {
        (((self.max_width - self.padding_x) / self.char_width).floor() as usize).max(1)
    }

    /// Wrap `text` into display lines.
    pub fn wrap(&self, text: &str) -> Lines {
        let max_cols = self.max_columns();
        let mut lines = Lines::new();
        for raw in text.split('\n') {
            wrap_line(raw.trim_end_matches('\r'), max_cols, &mut lines);
        }
        lines
    }

    /// Width and height of the box that fits `text`.
    ///
    /// Always strictly positive, even for empty text.
    pub fn measure(&self, text: &str) -> (f64, f64) {
        let lines = self.wrap(text);
        let widest = lines.iter().map(|l| l.width()).max().unwrap_or(0);
        let width = (widest as f64 * self.char_width + self.padding_x)
            .clamp(self.min_width, self.max_width.max(self.min_width));
        let height = (lines.len() as f64 * self.line_height + self.padding_y).max(self.min_height);
        (width, height)
    }
}

/// Box size for `text` with the default metrics.
pub fn measure(text: &str) -> (f64, f64) {
    TextMetrics::default().measure(text)
}

/// Greedy word wrap of a single logical line. Words wider than the limit
/// are broken at column boundaries.
fn wrap_line(line: &str, max_cols: usize, out: &mut Lines) {
    if line.width() <= max_cols {
        out.push(line.to_string());
        return;
    }

    let mut current = String::new();
    let mut current_cols = 0usize;

    for word in line.split(' ') {
        let word_cols = word.width();
        let sep = usize::from(!current.is_empty());

        if current_cols + sep + word_cols <= max_cols {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_cols += sep + word_cols;
            continue;
        }

        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
            current_cols = 0;
        }

        if word_cols <= max_cols {
            current.push_str(word);
            current_cols = word_cols;
        } else {
            // Hard-break an overlong word.
            for ch in word.chars() {
                let w = ch.width().unwrap_or(0);
                if current_cols + w > max_cols && !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                    current_cols = 0;
                }
                current.push(ch);
                current_cols += w;
            }
        }
    }

    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
}
