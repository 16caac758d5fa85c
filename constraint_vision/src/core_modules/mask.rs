// THEORY:
// A `Mask` is the binary image that flows between the classifier, the cleaner, the
// smoother and the region extractor: one byte per pixel, 255 for "target color", 0 for
// everything else. Every stage takes a `&Mask` and returns a fresh one, so a stage can
// never corrupt the input of another and the stages compose in any order.

/// Value written for matched pixels.
pub const MATCHED: u8 = 255;
/// Value written for everything else.
pub const UNMATCHED: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    /// An all-unmatched mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![UNMATCHED; width as usize * height as usize],
        }
    }

    /// Wraps existing bytes. Returns `None` when the length doesn't fit the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn is_matched(&self, x: u32, y: u32) -> bool {
        self.get(x, y) == MATCHED
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let index = self.index(x, y);
        self.data[index] = value;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn matched_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == MATCHED).count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Builds a mask from ASCII art, `#` for matched and anything else for unmatched.
    /// Rows must all be the same length.
    #[cfg(test)]
    pub(crate) fn from_art(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        let data = rows
            .iter()
            .flat_map(|row| row.bytes().map(|c| if c == b'#' { MATCHED } else { UNMATCHED }))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Draws a filled, matched rectangle. Test helper.
    #[cfg(test)]
    pub(crate) fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        for yy in y..y + height {
            for xx in x..x + width {
                self.set(xx, yy, MATCHED);
            }
        }
    }
}
