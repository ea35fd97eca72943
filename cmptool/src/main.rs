use clap::{Parser, Subcommand};
use cmp_consent_string::consent::ConsentString;
use colored_json::{Color, ColorMode, Output, Styler, ToColoredJson};
use std::str::FromStr;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a consent string and display it in the console
    Decode {
        /// Consent string to decode
        consent_string: String,
    },
    /// Check recorded consents for specific purpose or vendor ids
    Check {
        /// Consent string to decode
        consent_string: String,
        /// IAB purpose id to check
        #[arg(short, long)]
        purpose: Vec<u16>,
        /// Editor purpose id to check
        #[arg(short, long)]
        editor_purpose: Vec<u16>,
        /// Vendor id to check
        #[arg(short, long)]
        vendor: Vec<u16>,
    },
}

fn main() {
    let args = Cli::parse();

    let e = match args.cmd {
        Commands::Decode { consent_string } => decode_consent_string(&consent_string),
        Commands::Check {
            consent_string,
            purpose,
            editor_purpose,
            vendor,
        } => check_consents(&consent_string, &purpose, &editor_purpose, &vendor),
    };

    if let Err(e) = e {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn decode_consent_string(s: &str) -> Result<(), Box<dyn std::error::Error>> {
    let consent = ConsentString::from_str(s)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&consent)?
            .to_colored_json_with_styler(ColorMode::Auto(Output::StdOut), json_color_styler())?
    );

    Ok(())
}

fn check_consents(
    s: &str,
    purposes: &[u16],
    editor_purposes: &[u16],
    vendors: &[u16],
) -> Result<(), Box<dyn std::error::Error>> {
    let consent = ConsentString::from_str(s)?;

    for &id in purposes {
        println!(
            "purpose {}\t{}",
            id,
            allowed(consent.is_purpose_allowed(id))
        );
    }
    for &id in editor_purposes {
        println!(
            "editor purpose {}\t{}",
            id,
            allowed(consent.is_editor_purpose_allowed(id))
        );
    }
    for &id in vendors {
        println!("vendor {}\t{}", id, allowed(consent.is_vendor_allowed(id)));
    }

    Ok(())
}

fn allowed(b: bool) -> &'static str {
    if b {
        "allowed"
    } else {
        "denied"
    }
}

fn json_color_styler() -> Styler {
    Styler {
        key: Color::Green.foreground(),
        string_value: Color::Blue.bold(),
        integer_value: Color::Magenta.bold(),
        float_value: Color::Magenta.italic(),
        object_brackets: Color::Yellow.bold(),
        array_brackets: Color::Cyan.bold(),
        ..Default::default()
    }
}
