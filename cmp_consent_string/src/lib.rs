//! This crate encodes and decodes IAB-style consent strings: compact
//! base64url tokens recording which data-processing purposes and which
//! advertising vendors a user has consented to.
//!
//! Two wire formats are supported: the IAB format, readable by any
//! TCF v1 consumer, and a superset "global" format which additionally
//! carries an editor (publisher) version and a second purposes bitfield
//! for editor-specific purposes. The global format shares its leading
//! fields with the IAB one, so both encodings of the same consent agree
//! on everything the IAB format can express.
//!
//! NOTE: This is not an official IAB library.
//!
//! # Parsing consent strings
//!
//! The [`ConsentString`](consent/struct.ConsentString.html) type parses a
//! base64url token and exposes the recorded consents:
//!
//! ```
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use std::str::FromStr;
//! use cmp_consent_string::consent::ConsentString;
//!
//! let c = ConsentString::from_str("BAAAAAAAAAAAAC-ADAENABABAAAAAAAAAAA")?;
//!
//! assert_eq!(c.cmp_id(), 190);
//! assert_eq!(c.consent_language().as_str(), "en");
//! assert!(!c.is_purpose_allowed(1));
//! assert!(!c.is_vendor_allowed(42));
//! # Ok(())
//! # }
//! ```
//!
//! # Generating consent strings
//!
//! New consent strings are derived from a vendor list and an editor
//! document, then refined one consent at a time. Every derivation is a
//! pure function returning a fresh instance:
//!
//! ```
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use std::str::FromStr;
//! use cmp_consent_string::consent::ConsentString;
//! use cmp_consent_string::editor::Editor;
//! use cmp_consent_string::language::Language;
//! use cmp_consent_string::vendor_list::{Purpose, Vendor, VendorList};
//!
//! let vendor_list = VendorList {
//!     vendor_list_version: 6,
//!     max_vendor_id: 3,
//!     purposes: vec![Purpose { id: 1, name: "Storage".to_string() }],
//!     vendors: vec![
//!         Vendor { id: 1, name: "Acme".to_string() },
//!         Vendor { id: 3, name: "Initech".to_string() },
//!     ],
//! };
//! let editor = Editor { editor_version: 1, purposes: vec![] };
//! let lang = Language::from_str("en")?;
//!
//! let consent = ConsentString::with_full_consent(1, lang, &editor, &vendor_list, 0)
//!     .removing_vendor(3, lang, 0);
//!
//! assert!(consent.is_vendor_allowed(1));
//! assert!(!consent.is_vendor_allowed(3));
//!
//! // The global encoding round-trips exactly.
//! let encoded = consent.to_base64();
//! assert_eq!(ConsentString::from_str(&encoded)?, consent);
//!
//! // The IAB encoding drops the editor fields but shares the leading
//! // ones, character for character.
//! let iab = consent.to_iab_base64();
//! assert_eq!(&iab[..20], &encoded[..20]);
//! # Ok(())
//! # }
//! ```

pub mod consent;
mod core;
pub mod editor;
pub mod language;
pub mod mutate;
pub mod vendor_list;
pub mod version;
