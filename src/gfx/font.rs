//! 5x5 pixel font covering printable ASCII.

pub const GLYPH_WIDTH: usize = 5;
pub const GLYPH_HEIGHT: usize = 5;
/// Horizontal distance between two characters.
pub const GLYPH_SPACING: usize = 6;
pub const NUM_GLYPHS: usize = 0x60;
const FIRST_CHAR: u8 = 0x20;

/// One row per byte, the leftmost pixel in bit 4.
pub type Glyph = [u8; GLYPH_HEIGHT];

/// Characters 0x20 to 0x5F.
const BASE_GLYPHS: [Glyph; 0x40] = [
    [0b00000, 0b00000, 0b00000, 0b00000, 0b00000], // ' '
    [0b00100, 0b00100, 0b00100, 0b00000, 0b00100], // '!'
    [0b01010, 0b01010, 0b00000, 0b00000, 0b00000], // '"'
    [0b01010, 0b11111, 0b01010, 0b11111, 0b01010], // '#'
    [0b01111, 0b10100, 0b01110, 0b00101, 0b11110], // '$'
    [0b11001, 0b11010, 0b00100, 0b01011, 0b10011], // '%'
    [0b01100, 0b10010, 0b01101, 0b10010, 0b01101], // '&'
    [0b00100, 0b00100, 0b00000, 0b00000, 0b00000], // "'"
    [0b00010, 0b00100, 0b00100, 0b00100, 0b00010], // '('
    [0b01000, 0b00100, 0b00100, 0b00100, 0b01000], // ')'
    [0b00000, 0b01010, 0b00100, 0b01010, 0b00000], // '*'
    [0b00000, 0b00100, 0b01110, 0b00100, 0b00000], // '+'
    [0b00000, 0b00000, 0b00000, 0b00100, 0b01000], // ','
    [0b00000, 0b00000, 0b01110, 0b00000, 0b00000], // '-'
    [0b00000, 0b00000, 0b00000, 0b00000, 0b00100], // '.'
    [0b00001, 0b00010, 0b00100, 0b01000, 0b10000], // '/'
    [0b01110, 0b10011, 0b10101, 0b11001, 0b01110], // '0'
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110], // '1'
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111], // '2'
    [0b11110, 0b00001, 0b01110, 0b00001, 0b11110], // '3'
    [0b10010, 0b10010, 0b11111, 0b00010, 0b00010], // '4'
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110], // '5'
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110], // '6'
    [0b11111, 0b00010, 0b00100, 0b01000, 0b01000], // '7'
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110], // '8'
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110], // '9'
    [0b00000, 0b00100, 0b00000, 0b00100, 0b00000], // ':'
    [0b00000, 0b00100, 0b00000, 0b00100, 0b01000], // ';'
    [0b00010, 0b00100, 0b01000, 0b00100, 0b00010], // '<'
    [0b00000, 0b01110, 0b00000, 0b01110, 0b00000], // '='
    [0b01000, 0b00100, 0b00010, 0b00100, 0b01000], // '>'
    [0b01110, 0b00001, 0b00110, 0b00000, 0b00100], // '?'
    [0b01110, 0b10111, 0b10101, 0b10110, 0b01110], // '@'
    [0b01110, 0b10001, 0b11111, 0b10001, 0b10001], // 'A'
    [0b11110, 0b10001, 0b11110, 0b10001, 0b11110], // 'B'
    [0b01111, 0b10000, 0b10000, 0b10000, 0b01111], // 'C'
    [0b11110, 0b10001, 0b10001, 0b10001, 0b11110], // 'D'
    [0b11111, 0b10000, 0b11110, 0b10000, 0b11111], // 'E'
    [0b11111, 0b10000, 0b11110, 0b10000, 0b10000], // 'F'
    [0b01111, 0b10000, 0b10011, 0b10001, 0b01111], // 'G'
    [0b10001, 0b10001, 0b11111, 0b10001, 0b10001], // 'H'
    [0b01110, 0b00100, 0b00100, 0b00100, 0b01110], // 'I'
    [0b00111, 0b00010, 0b00010, 0b10010, 0b01100], // 'J'
    [0b10010, 0b10100, 0b11000, 0b10100, 0b10010], // 'K'
    [0b10000, 0b10000, 0b10000, 0b10000, 0b11111], // 'L'
    [0b10001, 0b11011, 0b10101, 0b10001, 0b10001], // 'M'
    [0b10001, 0b11001, 0b10101, 0b10011, 0b10001], // 'N'
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // 'O'
    [0b11110, 0b10001, 0b11110, 0b10000, 0b10000], // 'P'
    [0b01110, 0b10001, 0b10101, 0b10010, 0b01101], // 'Q'
    [0b11110, 0b10001, 0b11110, 0b10010, 0b10001], // 'R'
    [0b01111, 0b10000, 0b01110, 0b00001, 0b11110], // 'S'
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100], // 'T'
    [0b10001, 0b10001, 0b10001, 0b10001, 0b01110], // 'U'
    [0b10001, 0b10001, 0b10001, 0b01010, 0b00100], // 'V'
    [0b10001, 0b10001, 0b10101, 0b11011, 0b10001], // 'W'
    [0b10001, 0b01010, 0b00100, 0b01010, 0b10001], // 'X'
    [0b10001, 0b01010, 0b00100, 0b00100, 0b00100], // 'Y'
    [0b11111, 0b00010, 0b00100, 0b01000, 0b11111], // 'Z'
    [0b01110, 0b01000, 0b01000, 0b01000, 0b01110], // '['
    [0b10000, 0b01000, 0b00100, 0b00010, 0b00001], // '\\'
    [0b01110, 0b00010, 0b00010, 0b00010, 0b01110], // ']'
    [0b00100, 0b01010, 0b00000, 0b00000, 0b00000], // '^'
    [0b00000, 0b00000, 0b00000, 0b00000, 0b11111], // '_'
];

/// Characters 0x60, 0x7B to 0x7E. Lowercase letters reuse the uppercase glyphs.
const EXTRA_GLYPHS: [Glyph; 5] = [
    [0b01000, 0b00100, 0b00000, 0b00000, 0b00000], // '`'
    [0b00011, 0b00100, 0b01100, 0b00100, 0b00011], // '{'
    [0b00100, 0b00100, 0b00100, 0b00100, 0b00100], // '|'
    [0b11000, 0b00100, 0b00110, 0b00100, 0b11000], // '}'
    [0b00000, 0b01001, 0b10110, 0b00000, 0b00000], // '~'
];

pub struct Font {
    glyphs: [Glyph; NUM_GLYPHS],
}

impl Default for Font {
    fn default() -> Self {
        Font::new()
    }
}

impl Font {
    pub fn new() -> Self {
        let mut glyphs = [[0; GLYPH_HEIGHT]; NUM_GLYPHS];
        glyphs[..BASE_GLYPHS.len()].copy_from_slice(&BASE_GLYPHS);
        for c in b'a'..=b'z' {
            let upper = c.to_ascii_uppercase();
            glyphs[(c - FIRST_CHAR) as usize] = glyphs[(upper - FIRST_CHAR) as usize];
        }
        glyphs[(b'`' - FIRST_CHAR) as usize] = EXTRA_GLYPHS[0];
        for (i, &glyph) in EXTRA_GLYPHS[1..].iter().enumerate() {
            glyphs[(b'{' - FIRST_CHAR) as usize + i] = glyph;
        }
        // 0x7F stays blank.

        Font { glyphs }
    }

    /// Glyph index of character `c`. Control characters map to the space glyph.
    pub fn glyph_index(c: u8) -> u8 {
        (c.max(FIRST_CHAR) - FIRST_CHAR).min(NUM_GLYPHS as u8 - 1)
    }

    pub fn glyph(&self, idx: u8) -> &Glyph {
        &self.glyphs[(idx as usize).min(NUM_GLYPHS - 1)]
    }

    /// Whether pixel (`x`, `y`) of glyph `idx` is set.
    pub fn pixel(&self, idx: u8, x: usize, y: usize) -> bool {
        x < GLYPH_WIDTH && y < GLYPH_HEIGHT && self.glyph(idx)[y] & (0x10 >> x) != 0
    }

    /// Width in pixels of `len` characters, without the trailing space.
    pub fn text_width(len: usize) -> usize {
        (len * GLYPH_SPACING).saturating_sub(1)
    }
}
