use std::path::Path;

/// Two-way colour scheme split. Chosen per audio source by a [`TonalityRule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tonality {
    Minor,
    Major,
}

/// How the tonality of a source is decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TonalityRule {
    /// Even file-name length is major, odd is minor.
    FileNameParity,
    Fixed(Tonality),
}

impl TonalityRule {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "filename" | "auto" => Some(Self::FileNameParity),
            "minor" => Some(Self::Fixed(Tonality::Minor)),
            "major" => Some(Self::Fixed(Tonality::Major)),
            _ => None,
        }
    }

    pub fn classify(&self, source: &Path) -> Tonality {
        match self {
            Self::Fixed(tonality) => *tonality,
            Self::FileNameParity => {
                let name_len = source
                    .file_name()
                    .map(|n| n.to_string_lossy().chars().count())
                    .unwrap_or(0);
                if name_len % 2 == 0 {
                    Tonality::Major
                } else {
                    Tonality::Minor
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BpmTier {
    /// No tempo estimate yet.
    Unknown,
    Below80,
    From80To110,
    From110To140,
    From140,
}

impl BpmTier {
    pub fn from_bpm(bpm: f64) -> Self {
        if bpm <= 0.0 || !bpm.is_finite() {
            Self::Unknown
        } else if bpm < 80.0 {
            Self::Below80
        } else if bpm < 110.0 {
            Self::From80To110
        } else if bpm < 140.0 {
            Self::From110To140
        } else {
            Self::From140
        }
    }
}

/// Background and pulse colours as 0xRRGGBB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: u32,
    pub circle: u32,
}

impl Palette {
    pub fn lookup(tonality: Tonality, tier: BpmTier) -> Self {
        let (background, circle) = match (tonality, tier) {
            (Tonality::Minor, BpmTier::Unknown) => (0x0000AA, 0x0000FF),
            (Tonality::Minor, BpmTier::Below80) => (0x0000AA, 0x000080),
            (Tonality::Minor, BpmTier::From80To110) => (0x0080FF, 0x0000AA),
            (Tonality::Minor, BpmTier::From110To140) => (0x0080FF, 0xFFA500),
            (Tonality::Minor, BpmTier::From140) => (0x000000, 0xFF0000),
            (Tonality::Major, BpmTier::Unknown) => (0xC0C0C0, 0x0000AA),
            (Tonality::Major, BpmTier::Below80) => (0xC8A2C8, 0xADD8E6),
            (Tonality::Major, BpmTier::From80To110) => (0xFFFFFF, 0x0000AA),
            (Tonality::Major, BpmTier::From110To140) => (0xFFFF00, 0x32CD32),
            (Tonality::Major, BpmTier::From140) => (0xFFFF00, 0xFF0000),
        };
        Self { background, circle }
    }
}

pub fn rgb(color: u32) -> [u8; 3] {
    [(color >> 16) as u8, (color >> 8) as u8, color as u8]
}

/// Colours and BPM readout shown to the viewer.
///
/// Updated only when the tracker reports a tempo lock, matching the moments
/// the readout is allowed to change.
#[derive(Clone, Debug)]
pub struct DisplayState {
    tonality: Tonality,
    change_colors: bool,
    display_bpm: bool,
    palette: Palette,
    bpm: f64,
}

impl DisplayState {
    pub fn new(tonality: Tonality, change_colors: bool, display_bpm: bool) -> Self {
        Self {
            tonality,
            change_colors,
            display_bpm,
            palette: Palette::lookup(tonality, BpmTier::Unknown),
            bpm: 0.0,
        }
    }

    pub fn apply_tempo(&mut self, bpm: f64) {
        let tier = BpmTier::from_bpm(bpm);
        if tier == BpmTier::Unknown || self.change_colors {
            self.palette = Palette::lookup(self.tonality, tier);
        }
        self.bpm = bpm;
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Text for the readout, or `None` when it is disabled.
    pub fn bpm_label(&self) -> Option<String> {
        self.display_bpm
            .then(|| format!("BPM: {}", self.bpm.round() as i64))
    }
}
