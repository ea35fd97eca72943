//! Vendor list model, the external collaborator consent strings are
//! derived against. Fetching and JSON parsing of the registry document
//! happen outside this crate; these types carry the already-parsed data.

use std::collections::BTreeSet;

/// A standardized processing purpose defined by the vendor list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Purpose {
    pub id: u16,
    pub name: String,
}

/// A third party identified by a numeric id within the vendor list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vendor {
    pub id: u16,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VendorList {
    pub vendor_list_version: u16,
    /// Upper bound of the vendor id space. Vendor ids are sparse: not every
    /// id up to this bound has a matching entry in `vendors`.
    pub max_vendor_id: u16,
    pub purposes: Vec<Purpose>,
    pub vendors: Vec<Vendor>,
}

impl VendorList {
    pub fn purpose_ids(&self) -> BTreeSet<u16> {
        self.purposes.iter().map(|p| p.id).collect()
    }

    pub fn vendor_ids(&self) -> BTreeSet<u16> {
        self.vendors.iter().map(|v| v.id).collect()
    }
}
