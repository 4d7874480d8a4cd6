use crate::types::Pt;

// Control bytes never render but still advance, as in the core-font AFM files.
const CONTROL_WIDTH: u16 = 278;
const DELETE_WIDTH: u16 = 350;

// Helvetica advance widths for WinAnsi 0x20..=0x7E, in 1/1000 em.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, //
];

// Latin-1 letters 0xC0..=0xFF.
const HELVETICA_LATIN1: [u16; 64] = [
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, //
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, //
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, //
];

const HELVETICA_BOLD_LATIN1: [u16; 64] = [
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, //
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, //
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278, //
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556, //
];

// WinAnsi 0x80..=0xBF: typographic punctuation, then the Latin-1 symbols.
// Unassigned slots (0x81, 0x8D, 0x8F, 0x90, 0x9D) carry the 750 default.
const HELVETICA_HIGH: [u16; 64] = [
    556, 750, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 750, 611, 750, //
    750, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 750, 500, 667, //
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, //
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, //
];

const HELVETICA_BOLD_HIGH: [u16; 64] = [
    556, 750, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 750, 611, 750, //
    750, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 750, 500, 667, //
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333, //
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611, //
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
}

/// Width table for one face of the report family, indexed by WinAnsi byte.
#[derive(Debug, Clone)]
pub struct FontFace {
    base_font: &'static str,
    widths: [u16; 256],
}

impl FontFace {
    fn build(
        base_font: &'static str,
        ascii: &[u16; 95],
        high: &[u16; 64],
        latin1: &[u16; 64],
    ) -> Self {
        let mut widths = [CONTROL_WIDTH; 256];
        widths[0x20..0x7F].copy_from_slice(ascii);
        widths[0x7F] = DELETE_WIDTH;
        widths[0x80..0xC0].copy_from_slice(high);
        widths[0xC0..=0xFF].copy_from_slice(latin1);
        Self { base_font, widths }
    }

    /// PostScript name used for the `/BaseFont` entry.
    pub fn base_font(&self) -> &'static str {
        self.base_font
    }

    pub fn char_units(&self, ch: char) -> u32 {
        self.widths[win_ansi_byte(ch) as usize] as u32
    }

    /// Advance of `text` in glyph units (1/1000 em).
    pub fn text_units(&self, text: &str) -> u64 {
        text.chars().map(|ch| self.char_units(ch) as u64).sum()
    }

    /// Rendered width of `text` at `font_size`.
    pub fn text_width(&self, text: &str, font_size: Pt) -> Pt {
        let units = self.text_units(text) as i128;
        let size_milli = font_size.to_milli_i64() as i128;
        let milli = (units * size_milli + 500) / 1000;
        Pt::from_milli_i64(milli.clamp(0, i64::MAX as i128) as i64)
    }
}

/// Character metrics for the fixed report family. Built once per process and
/// shared read-only between measurement and the document sink.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    regular: FontFace,
    bold: FontFace,
    italic: FontFace,
}

impl FontMetrics {
    pub fn helvetica() -> Self {
        Self {
            regular: FontFace::build(
                "Helvetica",
                &HELVETICA_ASCII,
                &HELVETICA_HIGH,
                &HELVETICA_LATIN1,
            ),
            bold: FontFace::build(
                "Helvetica-Bold",
                &HELVETICA_BOLD_ASCII,
                &HELVETICA_BOLD_HIGH,
                &HELVETICA_BOLD_LATIN1,
            ),
            // The oblique cut shares the upright advances.
            italic: FontFace::build(
                "Helvetica-Oblique",
                &HELVETICA_ASCII,
                &HELVETICA_HIGH,
                &HELVETICA_LATIN1,
            ),
        }
    }

    pub fn face(&self, style: FontStyle) -> &FontFace {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }

    pub fn faces(&self) -> [(FontStyle, &FontFace); 3] {
        [
            (FontStyle::Regular, &self.regular),
            (FontStyle::Bold, &self.bold),
            (FontStyle::Italic, &self.italic),
        ]
    }

    pub fn width(&self, style: FontStyle, text: &str, font_size: Pt) -> Pt {
        self.face(style).text_width(text, font_size)
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::helvetica()
    }
}

/// Maps a character to its WinAnsiEncoding byte, `?` when it has none.
pub(crate) fn win_ansi_byte(ch: char) -> u8 {
    let code = ch as u32;
    match code {
        0x00..=0x7F => code as u8,
        0xA0..=0xFF => code as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => b'?',
    }
}

pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}
