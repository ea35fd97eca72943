//! Editor (publisher) model. Editor purposes are publisher-defined and
//! are only carried by the global consent string format, never by the IAB
//! subset.

use crate::vendor_list::Purpose;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Editor {
    pub editor_version: u16,
    pub purposes: Vec<Purpose>,
}

impl Editor {
    pub fn purpose_ids(&self) -> BTreeSet<u16> {
        self.purposes.iter().map(|p| p.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_ids() {
        let editor = Editor {
            editor_version: 2,
            purposes: vec![
                Purpose {
                    id: 1,
                    name: "Audience measurement".to_string(),
                },
                Purpose {
                    id: 2,
                    name: "In-store visit analytics".to_string(),
                },
            ],
        };

        assert_eq!(editor.purpose_ids(), BTreeSet::from_iter([1, 2]));
    }
}
