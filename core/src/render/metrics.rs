//! Width metrics for the two base-14 faces the renderer uses. Widths are
//! the standard AFM values in 1/1000 em for the printable ASCII range;
//! anything outside that range is measured as a default glyph so wrapping
//! stays deterministic for arbitrary input.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    pub fn base_name(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
        }
    }
}

// Printable ASCII 0x20..=0x7E.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278,
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278,
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333,
    584, 584, 584, 611, 975, 722, 722, 722, 722, 667, 611, 778, 722, 278,
    556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556,
    333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556,
    333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const DEFAULT_WIDTH: u16 = 556;

fn glyph_width(c: char, font: Font) -> u16 {
    let table = match font {
        Font::Helvetica => &HELVETICA_WIDTHS,
        Font::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
    };
    let code = c as u32;
    if (0x20..=0x7E).contains(&code) {
        table[(code - 0x20) as usize]
    } else {
        DEFAULT_WIDTH
    }
}

/// Rendered width of `s` at `size` points.
pub fn text_width(s: &str, font: Font, size: f64) -> f64 {
    let units: u64 = s.chars().map(|c| u64::from(glyph_width(c, font))).sum();
    units as f64 * size / 1000.0
}

/// Greedy word wrap into lines no wider than `max_width` points. A single
/// word wider than the limit is broken at the character that overflows, so
/// every input character lands on exactly one line.
pub fn wrap_text(s: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in s.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, font, size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if text_width(word, font, size) <= max_width {
            current = word.to_string();
        } else {
            // Hard-break an oversized word.
            let mut piece = String::new();
            for c in word.chars() {
                piece.push(c);
                if text_width(&piece, font, size) > max_width && piece.chars().count() > 1 {
                    piece.pop();
                    lines.push(std::mem::take(&mut piece));
                    piece.push(c);
                }
            }
            current = piece;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        // "W" is the widest Helvetica capital at 944/1000 em.
        assert!((text_width("W", Font::Helvetica, 10.0) - 9.44).abs() < 1e-9);
        assert!((text_width(" ", Font::Helvetica, 10.0) - 2.78).abs() < 1e-9);
    }

    #[test]
    fn test_bold_wider_than_regular() {
        let s = "Irrigation system";
        assert!(text_width(s, Font::HelveticaBold, 10.0) > text_width(s, Font::Helvetica, 10.0));
    }

    #[test]
    fn test_wrap_respects_max_width() {
        let s = "Remove existing turf, grade the subsoil, and install drought tolerant sod";
        let lines = wrap_text(s, Font::Helvetica, 9.0, 150.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::Helvetica, 9.0) <= 150.0);
        }
    }

    #[test]
    fn test_wrap_loses_no_words() {
        let s = "one two three four five six seven eight nine ten";
        let lines = wrap_text(s, Font::Helvetica, 9.0, 60.0);
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, s);
    }

    #[test]
    fn test_wrap_hard_breaks_oversized_word() {
        let s = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let lines = wrap_text(s, Font::Helvetica, 12.0, 40.0);
        assert!(lines.len() > 1);
        let rejoined: String = lines.concat();
        assert_eq!(rejoined, s);
    }

    #[test]
    fn test_wrap_empty_input() {
        assert!(wrap_text("", Font::Helvetica, 9.0, 100.0).is_empty());
        assert!(wrap_text("   ", Font::Helvetica, 9.0, 100.0).is_empty());
    }
}
