//! Widget primitives: traffic sample ring, braille sparkline, unit formatting.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::preferences::StatsUnit;

// ──────────────────── sample ring ────────────────────

/// Number of rate samples retained per direction.
pub const SAMPLE_CAPACITY: usize = 40;

/// Fixed-size ring of rate samples; the oldest sample is overwritten once full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRing {
    samples: [u64; SAMPLE_CAPACITY],
    /// Slot the next sample is written to.
    cursor: usize,
    count: usize,
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleRing {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: [0; SAMPLE_CAPACITY],
            cursor: 0,
            count: 0,
        }
    }

    pub fn push(&mut self, value: u64) {
        self.samples[self.cursor] = value;
        self.cursor = (self.cursor + 1) % SAMPLE_CAPACITY;
        self.count = (self.count + 1).min(SAMPLE_CAPACITY);
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub const fn samples(&self) -> &[u64; SAMPLE_CAPACITY] {
        &self.samples
    }

    #[must_use]
    pub fn latest(&self) -> Option<u64> {
        (self.count > 0).then(|| self.samples[(self.cursor + SAMPLE_CAPACITY - 1) % SAMPLE_CAPACITY])
    }

    /// The `min(n, len)` most recent samples, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<u64> {
        recent_samples(&self.samples, self.count, self.cursor, n)
    }
}

fn recent_samples(samples: &[u64], count: usize, cursor: usize, n: usize) -> Vec<u64> {
    let len = samples.len();
    let n = n.min(count).min(len);
    if n == 0 {
        return Vec::new();
    }
    let cursor = cursor % len;
    (0..n).map(|i| samples[(cursor + len - n + i) % len]).collect()
}

// ──────────────────── sparkline ────────────────────

/// Dot bits per braille row, left column then right column.
const BRAILLE_DOTS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];
const BRAILLE_BASE: u32 = 0x2800;
/// Bottom row lit in both columns.
pub const BASELINE_GLYPH: char = '\u{28C0}';

/// Braille sparkline renderer with a per-instance flat-baseline cache.
#[derive(Debug, Default)]
pub struct Sparkline {
    baselines: RwLock<HashMap<usize, Arc<str>>>,
}

impl Sparkline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn render(&self, ring: &SampleRing, width: usize) -> String {
        self.render_samples(ring.samples(), ring.len(), ring.cursor(), width)
    }

    /// Render the most recent samples of a raw ring as exactly `width` glyphs.
    ///
    /// Each glyph packs two samples horizontally and four levels vertically.
    /// Consecutive columns at different levels are joined vertically.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn render_samples(&self, samples: &[u64], count: usize, cursor: usize, width: usize) -> String {
        if width == 0 {
            return String::new();
        }

        let data_width = count.min(width);
        let recent = recent_samples(samples, count, cursor, data_width);
        let max = recent.iter().copied().max().unwrap_or(0);
        if recent.is_empty() || max == 0 {
            return self.baseline(width).to_string();
        }
        let data_width = recent.len();

        let pixel_width = data_width * 2;
        let last_index = data_width - 1;
        let mut cells = vec![0_u8; data_width];
        let mut prev_row: Option<usize> = None;

        for x in 0..pixel_width {
            let idx = (x * last_index) / (pixel_width - 1);
            let value = recent[idx];
            let level = (u128::from(value) * 3 / u128::from(max)) as usize;
            let row = 3 - level.min(3);
            let cell = x / 2;
            let col = x % 2;

            cells[cell] |= BRAILLE_DOTS[row][col];
            if let Some(prev) = prev_row
                && prev != row
            {
                for fill_row in prev.min(row)..=prev.max(row) {
                    cells[cell] |= BRAILLE_DOTS[fill_row][col];
                }
            }
            prev_row = Some(row);
        }

        let mut out = String::with_capacity(width * 3);
        out.extend(std::iter::repeat_n(BASELINE_GLYPH, width - data_width));
        out.extend(
            cells
                .into_iter()
                .map(|mask| char::from_u32(BRAILLE_BASE + u32::from(mask)).unwrap_or(BASELINE_GLYPH)),
        );
        out
    }

    /// Flat line of `width` baseline glyphs, cached per width.
    #[must_use]
    pub fn baseline(&self, width: usize) -> Arc<str> {
        if let Some(line) = self.baselines.read().get(&width) {
            return Arc::clone(line);
        }
        let line: Arc<str> = std::iter::repeat_n(BASELINE_GLYPH, width).collect::<String>().into();
        Arc::clone(self.baselines.write().entry(width).or_insert(line))
    }
}

// ──────────────────── format helpers ────────────────────

/// Human-readable byte count in the given unit system.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64, unit: StatsUnit) -> String {
    let (base, units): (f64, &[&str]) = match unit {
        StatsUnit::Decimal => (1000.0, &["B", "kB", "MB", "GB", "TB", "PB"]),
        StatsUnit::Binary => (1024.0, &["B", "KiB", "MiB", "GiB", "TiB", "PiB"]),
    };

    if (bytes as f64) < base {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64;
    for unit in units {
        if size < base {
            return if size >= 100.0 {
                format!("{size:.0} {unit}")
            } else if size >= 10.0 {
                format!("{size:.1} {unit}")
            } else {
                format!("{size:.2} {unit}")
            };
        }
        size /= base;
    }
    format!("{:.1} {}", size * base, units[units.len() - 1])
}

/// Human-readable transfer rate.
#[must_use]
pub fn format_rate(bytes_per_sec: u64, unit: StatsUnit) -> String {
    format!("{}/s", format_bytes(bytes_per_sec, unit))
}

/// Compact elapsed-time label (`45s`, `12m 05s`, `3h 07m`, `2d 04h`).
#[must_use]
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {:02}h", secs / 86_400, (secs % 86_400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(values: &[u64]) -> SampleRing {
        let mut ring = SampleRing::new();
        for v in values {
            ring.push(*v);
        }
        ring
    }

    #[test]
    fn ring_overwrites_oldest() {
        let mut ring = SampleRing::new();
        for v in 0..(SAMPLE_CAPACITY as u64 + 5) {
            ring.push(v);
        }
        assert_eq!(ring.len(), SAMPLE_CAPACITY);
        assert_eq!(ring.latest(), Some(SAMPLE_CAPACITY as u64 + 4));
        assert_eq!(ring.recent(3), vec![42, 43, 44]);
        assert_eq!(ring.recent(100).first(), Some(&5));
    }

    #[test]
    fn ring_clear_resets_everything() {
        let mut ring = ring_of(&[1, 2, 3]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.latest(), None);
        assert_eq!(ring, SampleRing::new());
    }

    #[test]
    fn empty_ring_renders_baseline() {
        let spark = Sparkline::new();
        assert_eq!(spark.render(&SampleRing::new(), 5), "⣀⣀⣀⣀⣀");
    }

    #[test]
    fn all_zero_samples_render_baseline() {
        let spark = Sparkline::new();
        assert_eq!(spark.render(&ring_of(&[0, 0, 0]), 4), "⣀⣀⣀⣀");
    }

    #[test]
    fn zero_width_renders_nothing() {
        let spark = Sparkline::new();
        assert_eq!(spark.render(&ring_of(&[5, 9]), 0), "");
    }

    #[test]
    fn output_length_matches_width() {
        let spark = Sparkline::new();
        let ring = ring_of(&[1, 5, 2, 8, 3]);
        for width in [1, 3, 5, 12, 60] {
            assert_eq!(spark.render(&ring, width).chars().count(), width);
        }
    }

    #[test]
    fn single_max_sample_fills_top_row() {
        let spark = Sparkline::new();
        // Two pixel columns both at the top row: dots 0x01 | 0x08.
        assert_eq!(spark.render(&ring_of(&[7]), 1), "\u{2809}");
    }

    #[test]
    fn rising_pair_connects_rows() {
        let spark = Sparkline::new();
        // Pixel 0 -> sample 0 (level 0, row 3); pixel 1 -> sample 0 as well;
        // pixel 2 -> sample 0; pixel 3 -> sample 1 (level 3, row 0).
        let line = spark.render(&ring_of(&[0, 9]), 2);
        let cells: Vec<u32> = line.chars().map(|c| c as u32 - 0x2800).collect();
        assert_eq!(cells[0], 0x40 | 0x80);
        // Right column of cell 1 spans rows 0..=3 after the jump.
        assert_eq!(cells[1], 0x40 | 0x08 | 0x10 | 0x20 | 0x80);
    }

    #[test]
    fn short_history_is_left_padded() {
        let spark = Sparkline::new();
        let line = spark.render(&ring_of(&[4, 4]), 5);
        let glyphs: Vec<char> = line.chars().collect();
        assert_eq!(glyphs.len(), 5);
        assert!(glyphs[..3].iter().all(|c| *c == BASELINE_GLYPH));
        assert_eq!(glyphs[3], '\u{2809}');
    }

    #[test]
    fn huge_values_do_not_overflow() {
        let spark = Sparkline::new();
        let line = spark.render(&ring_of(&[u64::MAX, u64::MAX / 2, 1]), 3);
        assert_eq!(line.chars().count(), 3);
    }

    #[test]
    fn baseline_is_cached_per_width() {
        let spark = Sparkline::new();
        let a = spark.baseline(8);
        let b = spark.baseline(8);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.chars().count(), 8);
    }

    #[test]
    fn format_bytes_decimal_and_binary() {
        assert_eq!(format_bytes(0, StatsUnit::Decimal), "0 B");
        assert_eq!(format_bytes(999, StatsUnit::Decimal), "999 B");
        assert_eq!(format_bytes(1500, StatsUnit::Decimal), "1.50 kB");
        assert_eq!(format_bytes(1536, StatsUnit::Binary), "1.50 KiB");
        assert_eq!(format_bytes(340_000_000, StatsUnit::Decimal), "340 MB");
        assert_eq!(format_bytes(12_500_000_000, StatsUnit::Decimal), "12.5 GB");
    }

    #[test]
    fn format_rate_appends_per_second() {
        assert_eq!(format_rate(2048, StatsUnit::Binary), "2.00 KiB/s");
        assert_eq!(format_rate(12, StatsUnit::Decimal), "12 B/s");
    }

    #[test]
    fn format_duration_ranges() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 05s");
        assert_eq!(format_duration(3 * 3600 + 7 * 60), "3h 07m");
        assert_eq!(format_duration(2 * 86_400 + 4 * 3600), "2d 04h");
    }
}
