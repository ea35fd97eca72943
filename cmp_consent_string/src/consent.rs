use crate::core::{base64, integer_range_bit_len, DataReader, DataWriter};
use crate::language::{InvalidLanguageError, Language};
use crate::version::VersionConfig;
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsentDecodeError {
    #[error("unable to decode base64 string")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported consent string version {found}")]
    UnsupportedVersion { found: u8 },
    #[error("unable to read consent string")]
    Read(#[from] io::Error),
    #[error(transparent)]
    InvalidLanguage(#[from] InvalidLanguageError),
}

/// How the allowed vendor set is written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorEncoding {
    /// Bitfield or range encoding, whichever produces the fewer bits.
    /// Ties favor the bitfield.
    Automatic,
    /// One bit per vendor id over `[1, max_vendor_id]`.
    Bitfield,
    /// List of single ids and contiguous id ranges.
    Range,
}

/// An immutable consent record: per-purpose and per-vendor decisions plus
/// the metadata describing when, where and against which vendor list and
/// editor they were taken.
///
/// Instances are produced by [`ConsentString::new`], by decoding a base64
/// string ([`FromStr`]), or by the derivation constructors in the
/// [`mutate`](crate::mutate) module. Every "change" returns a new value;
/// an existing instance never mutates.
///
/// The base64 text forms and the '0'/'1' parsed-consent strings are
/// derived on demand from the stored fields, so equality is defined over
/// the fields alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentString {
    version_config: &'static VersionConfig,
    created: u64,
    last_updated: u64,
    cmp_id: u16,
    cmp_version: u16,
    consent_screen: u8,
    consent_language: Language,
    editor_version: u16,
    vendor_list_version: u16,
    max_vendor_id: u16,
    editor_purposes: BTreeSet<u16>,
    allowed_purposes: BTreeSet<u16>,
    allowed_vendors: BTreeSet<u16>,
}

impl ConsentString {
    /// Canonical constructor. Timestamps count deciseconds since the Unix
    /// epoch (the wire resolution); see [`unix_deciseconds`].
    ///
    /// Taking a [`VersionConfig`] reference rather than a raw version
    /// number keeps encoding infallible: an unknown version cannot reach
    /// this point.
    ///
    /// # Panics
    ///
    /// Panics when a value does not fit its wire field: `cmp_id`,
    /// `cmp_version`, `editor_version` and `vendor_list_version` are
    /// 12-bit fields, `consent_screen` is 6 bits, and both dates are
    /// 36-bit decisecond counts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version_config: &'static VersionConfig,
        created: u64,
        last_updated: u64,
        cmp_id: u16,
        cmp_version: u16,
        consent_screen: u8,
        consent_language: Language,
        editor_version: u16,
        vendor_list_version: u16,
        max_vendor_id: u16,
        editor_purposes: BTreeSet<u16>,
        allowed_purposes: BTreeSet<u16>,
        allowed_vendors: BTreeSet<u16>,
    ) -> Self {
        assert_field_fits(created, 36, "created");
        assert_field_fits(last_updated, 36, "last_updated");
        assert_field_fits(u64::from(cmp_id), 12, "cmp_id");
        assert_field_fits(u64::from(cmp_version), 12, "cmp_version");
        assert_field_fits(u64::from(consent_screen), 6, "consent_screen");
        assert_field_fits(u64::from(editor_version), 12, "editor_version");
        assert_field_fits(u64::from(vendor_list_version), 12, "vendor_list_version");

        Self {
            version_config,
            created,
            last_updated,
            cmp_id,
            cmp_version,
            consent_screen,
            consent_language,
            editor_version,
            vendor_list_version,
            max_vendor_id,
            editor_purposes,
            allowed_purposes,
            allowed_vendors,
        }
    }

    pub fn version(&self) -> u8 {
        self.version_config.version()
    }

    /// Creation date, in deciseconds since the Unix epoch.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Last update date, in deciseconds since the Unix epoch.
    pub fn last_updated(&self) -> u64 {
        self.last_updated
    }

    pub fn cmp_id(&self) -> u16 {
        self.cmp_id
    }

    pub fn cmp_version(&self) -> u16 {
        self.cmp_version
    }

    pub fn consent_screen(&self) -> u8 {
        self.consent_screen
    }

    pub fn consent_language(&self) -> Language {
        self.consent_language
    }

    pub fn editor_version(&self) -> u16 {
        self.editor_version
    }

    pub fn vendor_list_version(&self) -> u16 {
        self.vendor_list_version
    }

    pub fn max_vendor_id(&self) -> u16 {
        self.max_vendor_id
    }

    pub fn editor_purposes(&self) -> &BTreeSet<u16> {
        &self.editor_purposes
    }

    pub fn allowed_purposes(&self) -> &BTreeSet<u16> {
        &self.allowed_purposes
    }

    pub fn allowed_vendors(&self) -> &BTreeSet<u16> {
        &self.allowed_vendors
    }

    pub fn is_purpose_allowed(&self, purpose_id: u16) -> bool {
        self.allowed_purposes.contains(&purpose_id)
    }

    pub fn is_editor_purpose_allowed(&self, purpose_id: u16) -> bool {
        self.editor_purposes.contains(&purpose_id)
    }

    pub fn is_vendor_allowed(&self, vendor_id: u16) -> bool {
        self.allowed_vendors.contains(&vendor_id)
    }

    /// The global (editor-aware) base64url consent string.
    pub fn to_base64(&self) -> String {
        self.encode(false, VendorEncoding::Automatic)
    }

    /// Global base64url consent string with a forced vendor encoding.
    pub fn to_base64_with(&self, encoding: VendorEncoding) -> String {
        self.encode(false, encoding)
    }

    /// The IAB-compatible subset: same layout without the editor version
    /// and the trailing editor purposes bitfield.
    pub fn to_iab_base64(&self) -> String {
        self.encode(true, VendorEncoding::Automatic)
    }

    /// IAB subset with a forced vendor encoding.
    pub fn to_iab_base64_with(&self, encoding: VendorEncoding) -> String {
        self.encode(true, encoding)
    }

    /// '0'/'1' per editor purpose id over the version's fixed bitfield
    /// width, ready to be stored verbatim by the persistence layer.
    pub fn parsed_editor_purpose_consents(&self) -> String {
        parsed_consents(
            &self.editor_purposes,
            self.version_config.editor_purposes_bit_size(),
        )
    }

    /// '0'/'1' per IAB purpose id over the version's fixed bitfield width.
    pub fn parsed_purpose_consents(&self) -> String {
        parsed_consents(
            &self.allowed_purposes,
            self.version_config.allowed_purposes_bit_size(),
        )
    }

    /// '0'/'1' per vendor id over `[1, max_vendor_id]`.
    pub fn parsed_vendor_consents(&self) -> String {
        parsed_consents(&self.allowed_vendors, usize::from(self.max_vendor_id))
    }

    fn encode(&self, iab_subset: bool, encoding: VendorEncoding) -> String {
        let mut w = DataWriter::new();
        self.write_bits(&mut w, iab_subset, encoding)
            .expect("write into vec should not fail");
        let (bytes, bit_len) = w.into_bytes().expect("write into vec should not fail");
        base64::encode(&bytes, bit_len)
    }

    fn write_bits(
        &self,
        w: &mut DataWriter,
        iab_subset: bool,
        encoding: VendorEncoding,
    ) -> io::Result<()> {
        w.write_fixed_integer(u64::from(self.version()), 6)?;
        w.write_datetime_as_deciseconds(self.created)?;
        w.write_datetime_as_deciseconds(self.last_updated)?;
        w.write_fixed_integer(u64::from(self.cmp_id), 12)?;
        w.write_fixed_integer(u64::from(self.cmp_version), 12)?;
        w.write_fixed_integer(u64::from(self.consent_screen), 6)?;
        w.write_string(self.consent_language.as_str())?;
        if !iab_subset {
            w.write_fixed_integer(u64::from(self.editor_version), 12)?;
        }
        w.write_fixed_integer(u64::from(self.vendor_list_version), 12)?;
        w.write_fixed_bitfield(
            &self.allowed_purposes,
            self.version_config.allowed_purposes_bit_size(),
        )?;
        w.write_fixed_integer(u64::from(self.max_vendor_id), 16)?;

        let bitfield_bits = usize::from(self.max_vendor_id);
        let use_range = match encoding {
            VendorEncoding::Automatic => {
                integer_range_bit_len(&self.allowed_vendors) < bitfield_bits
            }
            VendorEncoding::Bitfield => false,
            VendorEncoding::Range => true,
        };
        w.write_bool(use_range)?;
        if use_range {
            w.write_integer_range(&self.allowed_vendors)?;
        } else {
            w.write_fixed_bitfield(&self.allowed_vendors, bitfield_bits)?;
        }

        if !iab_subset {
            w.write_fixed_bitfield(
                &self.editor_purposes,
                self.version_config.editor_purposes_bit_size(),
            )?;
        }

        Ok(())
    }
}

/// Decodes the global consent string format. Any failure (bad base64,
/// unknown version, truncated input, invalid language letters) yields an
/// error, never a partially populated value.
impl FromStr for ConsentString {
    type Err = ConsentDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let b = base64::decode(s)?;
        let mut r = DataReader::new(&b);

        let version = r.read_fixed_integer::<u8>(6)?;
        let version_config = VersionConfig::for_version(version)
            .ok_or(ConsentDecodeError::UnsupportedVersion { found: version })?;

        let created = r.read_datetime_as_deciseconds()?;
        let last_updated = r.read_datetime_as_deciseconds()?;
        let cmp_id = r.read_fixed_integer(12)?;
        let cmp_version = r.read_fixed_integer(12)?;
        let consent_screen = r.read_fixed_integer(6)?;
        let consent_language = Language::from_str(&r.read_string(2)?)?;
        let editor_version = r.read_fixed_integer(12)?;
        let vendor_list_version = r.read_fixed_integer(12)?;
        let allowed_purposes =
            r.read_fixed_bitfield(version_config.allowed_purposes_bit_size())?;
        let max_vendor_id = r.read_fixed_integer::<u16>(16)?;

        let is_range = r.read_bool()?;
        let allowed_vendors = if is_range {
            // range entries are not bounded by the wire format itself
            r.read_integer_range()?
                .into_iter()
                .filter(|&id| (1..=max_vendor_id).contains(&id))
                .collect()
        } else {
            r.read_fixed_bitfield(usize::from(max_vendor_id))?
        };

        let editor_purposes = r.read_fixed_bitfield(version_config.editor_purposes_bit_size())?;

        Ok(Self {
            version_config,
            created,
            last_updated,
            cmp_id,
            cmp_version,
            consent_screen,
            consent_language,
            editor_version,
            vendor_list_version,
            max_vendor_id,
            editor_purposes,
            allowed_purposes,
            allowed_vendors,
        })
    }
}

/// Prints the global base64url form, the inverse of [`FromStr`].
impl fmt::Display for ConsentString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ConsentString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("ConsentString", 15)?;
        s.serialize_field("version", &self.version())?;
        s.serialize_field("created", &self.created)?;
        s.serialize_field("last_updated", &self.last_updated)?;
        s.serialize_field("cmp_id", &self.cmp_id)?;
        s.serialize_field("cmp_version", &self.cmp_version)?;
        s.serialize_field("consent_screen", &self.consent_screen)?;
        s.serialize_field("consent_language", &self.consent_language)?;
        s.serialize_field("editor_version", &self.editor_version)?;
        s.serialize_field("vendor_list_version", &self.vendor_list_version)?;
        s.serialize_field("max_vendor_id", &self.max_vendor_id)?;
        s.serialize_field("editor_purposes", &self.editor_purposes)?;
        s.serialize_field("allowed_purposes", &self.allowed_purposes)?;
        s.serialize_field("allowed_vendors", &self.allowed_vendors)?;
        s.serialize_field("consent_string", &self.to_base64())?;
        s.serialize_field("iab_consent_string", &self.to_iab_base64())?;
        s.end()
    }
}

fn assert_field_fits(value: u64, bits: u32, field: &str) {
    assert!(
        value < 1 << bits,
        "{field} value {value} does not fit in {bits} bits"
    );
}

fn parsed_consents(ids: &BTreeSet<u16>, width: usize) -> String {
    (1..=width)
        .map(|id| if ids.contains(&(id as u16)) { '1' } else { '0' })
        .collect()
}

/// Converts a point in time to whole deciseconds since the Unix epoch,
/// the resolution the wire format stores. Times before the epoch clamp
/// to zero.
pub fn unix_deciseconds(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64 / 100)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn lang(s: &str) -> Language {
        Language::from_str(s).unwrap()
    }

    fn minimal() -> ConsentString {
        ConsentString::new(
            VersionConfig::latest(),
            0,
            0,
            190,
            3,
            0,
            lang("en"),
            1,
            1,
            0,
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::new(),
        )
    }

    fn sample() -> ConsentString {
        ConsentString::new(
            VersionConfig::latest(),
            15_123_456_789,
            15_123_456_999,
            45,
            2,
            3,
            lang("fr"),
            2,
            6,
            2011,
            BTreeSet::from_iter([1, 4]),
            BTreeSet::from_iter([1, 2, 3]),
            (1..=2011).filter(|&id| id != 9).collect(),
        )
    }

    // Hand-computed vector: version 1, both dates at epoch, cmp 190/3,
    // screen 0, language "en", editor version 1, vendor list version 1,
    // no purposes, no vendors, max vendor id 0.
    const MINIMAL_BASE64: &str = "BAAAAAAAAAAAAC-ADAENABABAAAAAAAAAAA";

    #[test]
    fn encode_minimal() {
        assert_eq!(minimal().to_base64(), MINIMAL_BASE64);
    }

    #[test]
    fn decode_minimal() {
        let c = ConsentString::from_str(MINIMAL_BASE64).unwrap();
        assert_eq!(c, minimal());
        assert_eq!(c.cmp_id(), 190);
        assert_eq!(c.consent_language().as_str(), "en");
        assert!(c.allowed_vendors().is_empty());
    }

    #[test]
    fn display_matches_base64() {
        assert_eq!(minimal().to_string(), minimal().to_base64());
    }

    #[test]
    fn roundtrip() {
        let c = sample();
        let decoded = ConsentString::from_str(&c.to_base64()).unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn roundtrip_forced_encodings() {
        let c = sample();
        for encoding in [VendorEncoding::Bitfield, VendorEncoding::Range] {
            let decoded = ConsentString::from_str(&c.to_base64_with(encoding)).unwrap();
            assert_eq!(decoded, c);
        }
    }

    #[test]
    fn reencode_is_idempotent() {
        let first = sample().to_base64();
        let second = ConsentString::from_str(&first).unwrap().to_base64();
        assert_eq!(first, second);
    }

    #[test]
    fn automatic_vendor_encoding_is_minimal() {
        // dense vendors: the bitfield wins; sparse vendors: the range wins
        let dense = sample();
        let sparse = ConsentString::new(
            VersionConfig::latest(),
            0,
            0,
            190,
            3,
            0,
            lang("en"),
            1,
            1,
            400,
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::from_iter([2]),
        );

        for c in [dense, sparse] {
            let auto = c.to_base64().len();
            let bitfield = c.to_base64_with(VendorEncoding::Bitfield).len();
            let range = c.to_base64_with(VendorEncoding::Range).len();
            assert_eq!(auto, bitfield.min(range));
        }
    }

    #[test]
    fn out_of_range_queries_return_false() {
        let c = sample();
        assert!(!c.is_purpose_allowed(0));
        assert!(!c.is_purpose_allowed(25));
        assert!(!c.is_editor_purpose_allowed(25));
        assert!(!c.is_vendor_allowed(0));
        assert!(!c.is_vendor_allowed(9999));
    }

    #[test]
    fn parsed_consent_strings() {
        let c = ConsentString::new(
            VersionConfig::latest(),
            0,
            0,
            190,
            3,
            0,
            lang("en"),
            1,
            1,
            17,
            BTreeSet::from_iter([2]),
            BTreeSet::from_iter([1, 2, 3, 4, 5]),
            BTreeSet::new(),
        );

        assert_eq!(
            c.parsed_purpose_consents(),
            format!("{}{}", "1".repeat(5), "0".repeat(19))
        );
        assert_eq!(
            c.parsed_editor_purpose_consents(),
            format!("01{}", "0".repeat(22))
        );
        assert_eq!(c.parsed_vendor_consents(), "0".repeat(17));
    }

    #[test]
    fn iab_subset_shares_the_common_prefix() {
        let c = sample();
        let global = c.to_base64();
        let iab = c.to_iab_base64();

        // fields up to and including the language span exactly 120 bits,
        // i.e. the first 20 characters
        assert_eq!(&global[..20], &iab[..20]);
        assert!(iab.len() < global.len());
    }

    #[test_case("" ; "empty input")]
    #[test_case("BAAAAAAAAA" ; "truncated")]
    fn truncated_input_is_a_read_error(s: &str) {
        assert!(matches!(
            ConsentString::from_str(s),
            Err(ConsentDecodeError::Read(_))
        ));
    }

    #[test]
    fn invalid_base64_character() {
        assert!(matches!(
            ConsentString::from_str("not base64!"),
            Err(ConsentDecodeError::Base64(_))
        ));
    }

    #[test]
    fn unsupported_version() {
        // 6-bit version field set to 5 ('F')
        assert!(matches!(
            ConsentString::from_str("F"),
            Err(ConsentDecodeError::UnsupportedVersion { found: 5 })
        ));
    }

    #[test]
    fn invalid_language_letters() {
        // '7' decodes to 59, far past 'z', in the first language slot
        let s = format!("{}7{}", &MINIMAL_BASE64[..18], &MINIMAL_BASE64[19..]);
        assert!(matches!(
            ConsentString::from_str(&s),
            Err(ConsentDecodeError::InvalidLanguage(_))
        ));
    }

    #[test]
    fn field_maxima_roundtrip() {
        let c = ConsentString::new(
            VersionConfig::latest(),
            (1 << 36) - 1,
            (1 << 36) - 1,
            4095,
            4095,
            63,
            lang("zz"),
            4095,
            4095,
            1,
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::from_iter([1]),
        );
        assert_eq!(ConsentString::from_str(&c.to_base64()).unwrap(), c);
    }

    #[test]
    #[should_panic(expected = "cmp_id")]
    fn oversized_cmp_id_is_rejected() {
        ConsentString::new(
            VersionConfig::latest(),
            0,
            0,
            5000,
            3,
            0,
            lang("en"),
            1,
            1,
            0,
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::new(),
        );
    }

    #[test]
    #[should_panic(expected = "created")]
    fn oversized_date_is_rejected() {
        ConsentString::new(
            VersionConfig::latest(),
            1 << 36,
            0,
            190,
            3,
            0,
            lang("en"),
            1,
            1,
            0,
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::new(),
        );
    }

    #[test]
    fn decoded_range_vendors_are_clamped_to_max_vendor_id() {
        // same fields as minimal() but max vendor id 10 and a raw range
        // section whose group entry runs past that bound
        let mut w = DataWriter::new();
        w.write_fixed_integer(1, 6).unwrap();
        w.write_datetime_as_deciseconds(0).unwrap();
        w.write_datetime_as_deciseconds(0).unwrap();
        w.write_fixed_integer(190, 12).unwrap();
        w.write_fixed_integer(3, 12).unwrap();
        w.write_fixed_integer(0, 6).unwrap();
        w.write_string("en").unwrap();
        w.write_fixed_integer(1, 12).unwrap();
        w.write_fixed_integer(1, 12).unwrap();
        w.write_fixed_bitfield(&BTreeSet::new(), 24).unwrap();
        w.write_fixed_integer(10, 16).unwrap();
        w.write_bool(true).unwrap();
        w.write_fixed_integer(2, 16).unwrap();
        w.write_bool(false).unwrap();
        w.write_fixed_integer(4, 16).unwrap();
        w.write_bool(true).unwrap();
        w.write_fixed_integer(9, 16).unwrap();
        w.write_fixed_integer(12, 16).unwrap();
        w.write_fixed_bitfield(&BTreeSet::new(), 24).unwrap();
        let (bytes, bit_len) = w.into_bytes().unwrap();

        let c = ConsentString::from_str(&base64::encode(&bytes, bit_len)).unwrap();
        assert_eq!(c.allowed_vendors(), &BTreeSet::from_iter([4, 9, 10]));
        assert!(!c.is_vendor_allowed(12));

        let reencoded = c.to_base64();
        assert_eq!(
            ConsentString::from_str(&reencoded).unwrap().to_base64(),
            reencoded
        );
    }

    #[test]
    fn unix_deciseconds_truncates() {
        let t = UNIX_EPOCH + std::time::Duration::from_millis(1_512_345_678_949);
        assert_eq!(unix_deciseconds(t), 15_123_456_789);
        assert_eq!(unix_deciseconds(UNIX_EPOCH), 0);
    }
}
