//! Greedy word wrap with Helvetica metrics.

const PT_TO_MM: f32 = 25.4 / 72.0;

// Helvetica advance widths for U+0020..=U+007E, in 1/1000 em (Adobe AFM).
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const DEFAULT_WIDTH: u16 = 556;

fn fold_accent(c: char) -> char {
    match c {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' => 'O',
        'Ù'..='Ü' => 'U',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' => 'o',
        'ù'..='ü' => 'u',
        _ => c,
    }
}

/// Advance width of `c` in 1/1000 em.
pub fn char_units(c: char) -> u16 {
    let c = fold_accent(c);
    match c as u32 {
        code @ 0x20..=0x7e => HELVETICA_ASCII[(code - 0x20) as usize],
        _ => DEFAULT_WIDTH,
    }
}

/// Rendered width of `text` at `size_pt`, in millimetres.
pub fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_units(c))).sum();
    units as f32 / 1000.0 * size_pt * PT_TO_MM
}

/// Break `text` into lines no wider than `max_width_mm`.
///
/// `\n` always breaks; an empty paragraph yields an empty line. Words are separated by single
/// spaces. A word wider than the limit is split between characters.
pub fn split_text_to_size(text: &str, size_pt: f32, max_width_mm: f32) -> Vec<String> {
    let space = text_width_mm(" ", size_pt);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
        let mut line = String::new();
        let mut line_w = 0.0f32;
        let mut started = false;

        for word in paragraph.split(' ') {
            let word_w = text_width_mm(word, size_pt);
            if started && line_w + space + word_w <= max_width_mm {
                line.push(' ');
                line.push_str(word);
                line_w += space + word_w;
                continue;
            }
            if started {
                lines.push(std::mem::take(&mut line));
                line_w = 0.0;
            }
            started = true;

            if word_w <= max_width_mm {
                line.push_str(word);
                line_w = word_w;
                continue;
            }
            for ch in word.chars() {
                let ch_w = text_width_mm(ch.encode_utf8(&mut [0; 4]), size_pt);
                if !line.is_empty() && line_w + ch_w > max_width_mm {
                    lines.push(std::mem::take(&mut line));
                    line_w = 0.0;
                }
                line.push(ch);
                line_w += ch_w;
            }
        }
        lines.push(line);
    }
    lines
}
