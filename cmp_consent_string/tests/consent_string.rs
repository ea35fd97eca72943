use cmp_consent_string::consent::{ConsentString, VendorEncoding};
use cmp_consent_string::editor::Editor;
use cmp_consent_string::language::Language;
use cmp_consent_string::mutate::{CMP_ID, CMP_VERSION};
use cmp_consent_string::vendor_list::{Purpose, Vendor, VendorList};
use std::str::FromStr;

fn lang(s: &str) -> Language {
    Language::from_str(s).unwrap()
}

fn vendor_list(version: u16, max_vendor_id: u16, purpose_count: u16) -> VendorList {
    VendorList {
        vendor_list_version: version,
        max_vendor_id,
        purposes: (1..=purpose_count)
            .map(|id| Purpose {
                id,
                name: format!("purpose {id}"),
            })
            .collect(),
        vendors: (1..=max_vendor_id)
            .map(|id| Vendor {
                id,
                name: format!("vendor {id}"),
            })
            .collect(),
    }
}

fn editor() -> Editor {
    Editor {
        editor_version: 2,
        purposes: vec![
            Purpose {
                id: 1,
                name: "editor purpose 1".to_string(),
            },
            Purpose {
                id: 2,
                name: "editor purpose 2".to_string(),
            },
        ],
    }
}

#[test]
fn full_consent_lifecycle() {
    let list = vendor_list(6, 17, 5);
    let consent = ConsentString::with_full_consent(1, lang("en"), &editor(), &list, 15_000_000_000)
        .removing_vendor(9, lang("en"), 15_000_000_100)
        .removing_purpose(2, lang("en"), 15_000_000_200);

    assert_eq!(consent.cmp_id(), CMP_ID);
    assert_eq!(consent.cmp_version(), CMP_VERSION);
    assert_eq!(consent.created(), 15_000_000_000);
    assert_eq!(consent.last_updated(), 15_000_000_200);
    assert!(consent.is_purpose_allowed(1));
    assert!(!consent.is_purpose_allowed(2));
    assert!(consent.is_editor_purpose_allowed(2));
    assert!(!consent.is_vendor_allowed(9));
    assert!(consent.is_vendor_allowed(17));

    let decoded = ConsentString::from_str(&consent.to_base64()).unwrap();
    assert_eq!(decoded, consent);
}

#[test]
fn no_consent_produces_all_zero_parsed_strings() {
    let list = vendor_list(6, 17, 5);
    let consent = ConsentString::with_no_consent(0, lang("fr"), &editor(), &list, 0);

    assert_eq!(consent.parsed_purpose_consents(), "0".repeat(24));
    assert_eq!(consent.parsed_editor_purpose_consents(), "0".repeat(24));
    assert_eq!(consent.parsed_vendor_consents(), "0".repeat(17));

    let decoded = ConsentString::from_str(&consent.to_base64()).unwrap();
    assert_eq!(decoded.parsed_vendor_consents(), "0".repeat(17));
}

#[test]
fn iab_encoding_is_shorter_and_shares_the_common_fields() {
    let list = vendor_list(6, 17, 5);
    let consent = ConsentString::with_full_consent(1, lang("en"), &editor(), &list, 0);

    let global = consent.to_base64();
    let iab = consent.to_iab_base64();
    assert!(iab.len() < global.len());
    assert_eq!(&iab[..20], &global[..20]);
}

#[test]
fn vendor_list_update_survives_a_wire_roundtrip() {
    let old_list = vendor_list(6, 10, 3);
    let new_list = vendor_list(7, 12, 4);

    let stored = ConsentString::with_full_consent(1, lang("en"), &editor(), &old_list, 100)
        .removing_vendor(5, lang("en"), 150)
        .to_base64();

    let previous = ConsentString::from_str(&stored).unwrap();
    let migrated = ConsentString::from_updated_vendor_list(
        &new_list, &old_list, &previous, lang("en"), 200,
    );

    assert!(!migrated.is_vendor_allowed(5));
    assert!(migrated.is_vendor_allowed(11));
    assert!(migrated.is_vendor_allowed(12));
    assert!(migrated.is_purpose_allowed(4));
    assert_eq!(migrated.created(), 100);
    assert_eq!(migrated.vendor_list_version(), 7);

    let decoded = ConsentString::from_str(&migrated.to_base64()).unwrap();
    assert_eq!(decoded, migrated);
}

#[test]
fn sparse_vendor_sets_roundtrip_through_the_range_encoding() {
    let list = vendor_list(6, 2000, 5);
    let consent = ConsentString::with_no_consent(0, lang("en"), &editor(), &list, 0)
        .adding_vendor(3, lang("en"), 0)
        .adding_vendor(4, lang("en"), 0)
        .adding_vendor(1999, lang("en"), 0);

    let auto = consent.to_base64();
    let range = consent.to_base64_with(VendorEncoding::Range);
    assert_eq!(auto, range);

    let decoded = ConsentString::from_str(&auto).unwrap();
    assert_eq!(decoded, consent);
    assert!(decoded.is_vendor_allowed(1999));
    assert!(!decoded.is_vendor_allowed(2000));
}
