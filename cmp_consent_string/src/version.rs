/// Per-format-version table of the bit widths that are allowed to vary
/// between consent string versions. Every other field width (timestamps,
/// ids, language) is fixed by the wire format itself.
#[derive(Debug, PartialEq, Eq)]
pub struct VersionConfig {
    version: u8,
    allowed_purposes_bit_size: usize,
    editor_purposes_bit_size: usize,
}

static VERSION_1: VersionConfig = VersionConfig {
    version: 1,
    allowed_purposes_bit_size: 24,
    editor_purposes_bit_size: 24,
};

impl VersionConfig {
    /// Configuration for a given consent string version, or `None` if the
    /// version is unknown.
    pub fn for_version(version: u8) -> Option<&'static VersionConfig> {
        match version {
            1 => Some(&VERSION_1),
            _ => None,
        }
    }

    /// The most recent known version. Every newly derived consent string is
    /// encoded with this configuration.
    pub fn latest() -> &'static VersionConfig {
        &VERSION_1
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Width in bits of the IAB purposes bitfield.
    pub fn allowed_purposes_bit_size(&self) -> usize {
        self.allowed_purposes_bit_size
    }

    /// Width in bits of the editor purposes bitfield.
    pub fn editor_purposes_bit_size(&self) -> usize {
        self.editor_purposes_bit_size
    }
}
