use cmp_consent_string::consent::ConsentString;
use std::env::args;
use std::str::FromStr;

fn main() {
    let s = args()
        .nth(1)
        .unwrap_or_else(|| "BAAAAAAAAAAAAC-ADAENABABAAAAAAAAAAA".to_string());

    let consent = ConsentString::from_str(&s).expect("a valid consent string");

    println!("purposes: {}", consent.parsed_purpose_consents());
    println!("vendors:  {}", consent.parsed_vendor_consents());

    #[cfg(feature = "serde")]
    println!("{}", serde_json::to_string_pretty(&consent).unwrap());
}
