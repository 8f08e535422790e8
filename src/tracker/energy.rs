/// Start of the tracked band, as a fraction of a 256-bin spectrum.
const BAND_START: usize = 190;
/// Inclusive end of the tracked band, as a fraction of a 256-bin spectrum.
const BAND_END: usize = 255;
const REFERENCE_BINS: usize = 256;

/// Reduces a byte spectrum to a single energy value: the mean magnitude over
/// the bins that the upstream analyser places in the kick/bass region.
#[derive(Clone, Copy, Debug)]
pub struct LowBandEnergyExtractor {
    start: usize,
    end: usize,
}

impl LowBandEnergyExtractor {
    /// Band for a spectrum with `bin_count` bins. For 256 bins this is 190..=255;
    /// other sizes scale proportionally.
    pub fn new(bin_count: usize) -> Self {
        let start = bin_count * BAND_START / REFERENCE_BINS;
        let end = (bin_count * (BAND_END + 1) / REFERENCE_BINS)
            .saturating_sub(1)
            .max(start);
        Self { start, end }
    }

    pub fn band(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    pub fn extract(&self, spectrum: &[u8]) -> f64 {
        debug_assert!(self.end < spectrum.len(), "spectrum shorter than configured band");
        let band = &spectrum[self.start..=self.end];
        let sum: u32 = band.iter().map(|&v| v as u32).sum();
        sum as f64 / band.len() as f64
    }
}
