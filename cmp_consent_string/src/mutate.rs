//! Derivation constructors: pure functions building a new [`ConsentString`]
//! from a previous one plus updated vendor-list or editor metadata.
//!
//! Every constructor here stamps the CMP identity constants and re-encodes
//! at the latest known format version, whatever version the input carried.
//! A call that does not actually change a consent set still produces a
//! fresh instance with the provided language and `last_updated` date.

use crate::consent::ConsentString;
use crate::editor::Editor;
use crate::language::Language;
use crate::vendor_list::VendorList;
use crate::version::VersionConfig;
use std::collections::BTreeSet;
use thiserror::Error;

/// Registered CMP id this implementation writes into every derived
/// consent string. Forks must register their own id with the IAB and
/// change this constant.
pub const CMP_ID: u16 = 190;

/// Version of this CMP implementation.
pub const CMP_VERSION: u16 = 3;

/// Returned when a purposes-wide operation is invoked against a vendor
/// list that is not the one the previous consent string was built from.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("vendor list version mismatch (expected {expected}, found {found})")]
pub struct VendorListVersionMismatch {
    pub expected: u16,
    pub found: u16,
}

impl ConsentString {
    /// A consent string with no consent given for any purpose or vendor.
    pub fn with_no_consent(
        consent_screen: u8,
        consent_language: Language,
        editor: &Editor,
        vendor_list: &VendorList,
        date: u64,
    ) -> Self {
        Self::new(
            VersionConfig::latest(),
            date,
            date,
            CMP_ID,
            CMP_VERSION,
            consent_screen,
            consent_language,
            editor.editor_version,
            vendor_list.vendor_list_version,
            vendor_list.max_vendor_id,
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::new(),
        )
    }

    /// A consent string with consent given for every purpose, editor
    /// purpose and vendor the given documents define. Vendor ids are taken
    /// from the list's actual entries, not from the `[1, max_vendor_id]`
    /// span: ids with no vendor behind them stay denied. Ids a document
    /// defines past the encodable ranges (the purpose bitfield widths,
    /// `max_vendor_id`) are ignored, like the single-id methods do.
    pub fn with_full_consent(
        consent_screen: u8,
        consent_language: Language,
        editor: &Editor,
        vendor_list: &VendorList,
        date: u64,
    ) -> Self {
        Self::new(
            VersionConfig::latest(),
            date,
            date,
            CMP_ID,
            CMP_VERSION,
            consent_screen,
            consent_language,
            editor.editor_version,
            vendor_list.vendor_list_version,
            vendor_list.max_vendor_id,
            bounded(editor.purpose_ids(), editor_purpose_range()),
            bounded(vendor_list.purpose_ids(), purpose_range()),
            bounded(vendor_list.vendor_ids(), 1..=vendor_list.max_vendor_id),
        )
    }

    /// Migrates a consent string to an updated vendor list: ids that
    /// existed in the previous list keep their recorded status, ids that
    /// are new in the updated list are allowed by default. The creation
    /// date, consent screen and editor data are preserved.
    pub fn from_updated_vendor_list(
        updated_vendor_list: &VendorList,
        previous_vendor_list: &VendorList,
        previous: &ConsentString,
        consent_language: Language,
        last_updated: u64,
    ) -> Self {
        let previous_purpose_count = previous_vendor_list.purposes.len() as u16;
        let allowed_purposes = (1..=updated_vendor_list.purposes.len() as u16)
            .filter(|id| purpose_range().contains(id))
            .filter(|&id| id > previous_purpose_count || previous.is_purpose_allowed(id))
            .collect();

        let allowed_vendors = (1..=updated_vendor_list.max_vendor_id)
            .filter(|&id| {
                id > previous_vendor_list.max_vendor_id || previous.is_vendor_allowed(id)
            })
            .collect();

        Self::new(
            VersionConfig::latest(),
            previous.created(),
            last_updated,
            CMP_ID,
            CMP_VERSION,
            previous.consent_screen(),
            consent_language,
            previous.editor_version(),
            updated_vendor_list.vendor_list_version,
            updated_vendor_list.max_vendor_id,
            previous.editor_purposes().clone(),
            allowed_purposes,
            allowed_vendors,
        )
    }

    /// Migrates a consent string to an updated editor, carrying editor
    /// purpose statuses forward with the same new-ids-allowed rule as
    /// [`ConsentString::from_updated_vendor_list`]. The IAB purpose and
    /// vendor sets are untouched.
    pub fn from_updated_editor(
        updated_editor: &Editor,
        previous_editor: &Editor,
        previous: &ConsentString,
        consent_language: Language,
        last_updated: u64,
    ) -> Self {
        let previous_purpose_count = previous_editor.purposes.len() as u16;
        let editor_purposes = (1..=updated_editor.purposes.len() as u16)
            .filter(|id| editor_purpose_range().contains(id))
            .filter(|&id| id > previous_purpose_count || previous.is_editor_purpose_allowed(id))
            .collect();

        Self::new(
            VersionConfig::latest(),
            previous.created(),
            last_updated,
            CMP_ID,
            CMP_VERSION,
            previous.consent_screen(),
            consent_language,
            updated_editor.editor_version,
            previous.vendor_list_version(),
            previous.max_vendor_id(),
            editor_purposes,
            previous.allowed_purposes().clone(),
            previous.allowed_vendors().clone(),
        )
    }

    /// A copy with consent given for one purpose. Ids outside the
    /// latest version's purpose range are ignored.
    pub fn adding_purpose(
        &self,
        purpose_id: u16,
        consent_language: Language,
        last_updated: u64,
    ) -> Self {
        let mut allowed_purposes = self.allowed_purposes().clone();
        if purpose_range().contains(&purpose_id) {
            allowed_purposes.insert(purpose_id);
        }
        self.derived(
            consent_language,
            last_updated,
            self.editor_purposes().clone(),
            allowed_purposes,
            self.allowed_vendors().clone(),
        )
    }

    /// A copy with consent removed for one purpose.
    pub fn removing_purpose(
        &self,
        purpose_id: u16,
        consent_language: Language,
        last_updated: u64,
    ) -> Self {
        let mut allowed_purposes = self.allowed_purposes().clone();
        allowed_purposes.remove(&purpose_id);
        self.derived(
            consent_language,
            last_updated,
            self.editor_purposes().clone(),
            allowed_purposes,
            self.allowed_vendors().clone(),
        )
    }

    /// A copy with consent given for one editor purpose. Ids outside the
    /// latest version's editor purpose range are ignored.
    pub fn adding_editor_purpose(
        &self,
        purpose_id: u16,
        consent_language: Language,
        last_updated: u64,
    ) -> Self {
        let mut editor_purposes = self.editor_purposes().clone();
        if editor_purpose_range().contains(&purpose_id) {
            editor_purposes.insert(purpose_id);
        }
        self.derived(
            consent_language,
            last_updated,
            editor_purposes,
            self.allowed_purposes().clone(),
            self.allowed_vendors().clone(),
        )
    }

    /// A copy with consent removed for one editor purpose.
    pub fn removing_editor_purpose(
        &self,
        purpose_id: u16,
        consent_language: Language,
        last_updated: u64,
    ) -> Self {
        let mut editor_purposes = self.editor_purposes().clone();
        editor_purposes.remove(&purpose_id);
        self.derived(
            consent_language,
            last_updated,
            editor_purposes,
            self.allowed_purposes().clone(),
            self.allowed_vendors().clone(),
        )
    }

    /// A copy with consent given for one vendor. Ids outside
    /// `[1, max_vendor_id]` are ignored.
    pub fn adding_vendor(
        &self,
        vendor_id: u16,
        consent_language: Language,
        last_updated: u64,
    ) -> Self {
        let mut allowed_vendors = self.allowed_vendors().clone();
        if (1..=self.max_vendor_id()).contains(&vendor_id) {
            allowed_vendors.insert(vendor_id);
        }
        self.derived(
            consent_language,
            last_updated,
            self.editor_purposes().clone(),
            self.allowed_purposes().clone(),
            allowed_vendors,
        )
    }

    /// A copy with consent removed for one vendor.
    pub fn removing_vendor(
        &self,
        vendor_id: u16,
        consent_language: Language,
        last_updated: u64,
    ) -> Self {
        let mut allowed_vendors = self.allowed_vendors().clone();
        allowed_vendors.remove(&vendor_id);
        self.derived(
            consent_language,
            last_updated,
            self.editor_purposes().clone(),
            self.allowed_purposes().clone(),
            allowed_vendors,
        )
    }

    /// A copy with both purpose sets cleared and the vendor set preserved.
    /// The vendor list must be the one the previous consent string was
    /// generated against.
    pub fn with_no_purposes_consent(
        &self,
        consent_screen: u8,
        consent_language: Language,
        editor: &Editor,
        vendor_list: &VendorList,
        last_updated: u64,
    ) -> Result<Self, VendorListVersionMismatch> {
        self.check_vendor_list_version(vendor_list)?;

        Ok(Self::new(
            VersionConfig::latest(),
            self.created(),
            last_updated,
            CMP_ID,
            CMP_VERSION,
            consent_screen,
            consent_language,
            editor.editor_version,
            vendor_list.vendor_list_version,
            vendor_list.max_vendor_id,
            BTreeSet::new(),
            BTreeSet::new(),
            self.allowed_vendors().clone(),
        ))
    }

    /// A copy with every purpose and editor purpose allowed and the vendor
    /// set preserved. Same vendor list version guard as
    /// [`ConsentString::with_no_purposes_consent`].
    pub fn with_all_purposes_consent(
        &self,
        consent_screen: u8,
        consent_language: Language,
        editor: &Editor,
        vendor_list: &VendorList,
        last_updated: u64,
    ) -> Result<Self, VendorListVersionMismatch> {
        self.check_vendor_list_version(vendor_list)?;

        Ok(Self::new(
            VersionConfig::latest(),
            self.created(),
            last_updated,
            CMP_ID,
            CMP_VERSION,
            consent_screen,
            consent_language,
            editor.editor_version,
            vendor_list.vendor_list_version,
            vendor_list.max_vendor_id,
            bounded(editor.purpose_ids(), editor_purpose_range()),
            bounded(vendor_list.purpose_ids(), purpose_range()),
            self.allowed_vendors().clone(),
        ))
    }

    fn check_vendor_list_version(
        &self,
        vendor_list: &VendorList,
    ) -> Result<(), VendorListVersionMismatch> {
        if self.vendor_list_version() != vendor_list.vendor_list_version {
            return Err(VendorListVersionMismatch {
                expected: self.vendor_list_version(),
                found: vendor_list.vendor_list_version,
            });
        }
        Ok(())
    }

    fn derived(
        &self,
        consent_language: Language,
        last_updated: u64,
        editor_purposes: BTreeSet<u16>,
        allowed_purposes: BTreeSet<u16>,
        allowed_vendors: BTreeSet<u16>,
    ) -> Self {
        Self::new(
            VersionConfig::latest(),
            self.created(),
            last_updated,
            CMP_ID,
            CMP_VERSION,
            self.consent_screen(),
            consent_language,
            self.editor_version(),
            self.vendor_list_version(),
            self.max_vendor_id(),
            editor_purposes,
            allowed_purposes,
            allowed_vendors,
        )
    }
}

fn bounded(ids: BTreeSet<u16>, range: std::ops::RangeInclusive<u16>) -> BTreeSet<u16> {
    ids.into_iter().filter(|id| range.contains(id)).collect()
}

fn purpose_range() -> std::ops::RangeInclusive<u16> {
    1..=VersionConfig::latest().allowed_purposes_bit_size() as u16
}

fn editor_purpose_range() -> std::ops::RangeInclusive<u16> {
    1..=VersionConfig::latest().editor_purposes_bit_size() as u16
}
