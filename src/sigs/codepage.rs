//! Single-byte codepage tables for mojibake detection and transcoding.
//!
//! Each table maps the high half 0x80–0xFF to Unicode; 0x00–0x7F always
//! passes through as ASCII.  Cells the codepage leaves undefined map to
//! U+FFFD and are counted by the decoder, so callers can penalise a
//! transcode that had to guess.

use std::fmt;

/// High-half mapping, exactly 128 codepoints per table.
struct Table {
    name: &'static str,
    high: &'static str,
}

// Rows are 16 cells each, 0x80 first.
const TABLES: &[Table] = &[
    Table {
        name: "windows-1252",
        high: concat!(
            "€\u{FFFD}‚ƒ„…†‡ˆ‰Š‹Œ\u{FFFD}Ž\u{FFFD}",
            "\u{FFFD}\u{2018}\u{2019}\u{201C}\u{201D}•–—˜™š›œ\u{FFFD}žŸ",
            "\u{A0}¡¢£¤¥¦§¨©ª«¬\u{AD}®¯",
            "°±²³´µ¶·¸¹º»¼½¾¿",
            "ÀÁÂÃÄÅÆÇÈÉÊËÌÍÎÏ",
            "ÐÑÒÓÔÕÖ×ØÙÚÛÜÝÞß",
            "àáâãäåæçèéêëìíîï",
            "ðñòóôõö÷øùúûüýþÿ",
        ),
    },
    Table {
        name: "windows-1251",
        high: concat!(
            "ЂЃ‚ѓ„…†‡€‰Љ‹ЊЌЋЏ",
            "ђ\u{2018}\u{2019}\u{201C}\u{201D}•–—\u{FFFD}™љ›њќћџ",
            "\u{A0}ЎўЈ¤Ґ¦§Ё©Є«¬\u{AD}®Ї",
            "°±Ііґµ¶·ё№є»јЅѕї",
            "АБВГДЕЖЗИЙКЛМНОП",
            "РСТУФХЦЧШЩЪЫЬЭЮЯ",
            "абвгдежзийклмноп",
            "рстуфхцчшщъыьэюя",
        ),
    },
    Table {
        name: "iso-8859-1",
        high: concat!(
            "\u{80}\u{81}\u{82}\u{83}\u{84}\u{85}\u{86}\u{87}",
            "\u{88}\u{89}\u{8A}\u{8B}\u{8C}\u{8D}\u{8E}\u{8F}",
            "\u{90}\u{91}\u{92}\u{93}\u{94}\u{95}\u{96}\u{97}",
            "\u{98}\u{99}\u{9A}\u{9B}\u{9C}\u{9D}\u{9E}\u{9F}",
            "\u{A0}¡¢£¤¥¦§¨©ª«¬\u{AD}®¯",
            "°±²³´µ¶·¸¹º»¼½¾¿",
            "ÀÁÂÃÄÅÆÇÈÉÊËÌÍÎÏ",
            "ÐÑÒÓÔÕÖ×ØÙÚÛÜÝÞß",
            "àáâãäåæçèéêëìíîï",
            "ðñòóôõö÷øùúûüýþÿ",
        ),
    },
    Table {
        name: "iso-8859-2",
        high: concat!(
            "\u{80}\u{81}\u{82}\u{83}\u{84}\u{85}\u{86}\u{87}",
            "\u{88}\u{89}\u{8A}\u{8B}\u{8C}\u{8D}\u{8E}\u{8F}",
            "\u{90}\u{91}\u{92}\u{93}\u{94}\u{95}\u{96}\u{97}",
            "\u{98}\u{99}\u{9A}\u{9B}\u{9C}\u{9D}\u{9E}\u{9F}",
            "\u{A0}Ą˘Ł¤ĽŚ§¨ŠŞŤŹ\u{AD}ŽŻ",
            "°ą˛ł´ľśˇ¸šşťź˝žż",
            "ŔÁÂĂÄĹĆÇČÉĘËĚÍÎĎ",
            "ĐŃŇÓÔŐÖ×ŘŮÚŰÜÝŢß",
            "ŕáâăäĺćçčéęëěíîď",
            "đńňóôőö÷řůúűüýţ˙",
        ),
    },
    Table {
        name: "cp437",
        high: concat!(
            "ÇüéâäàåçêëèïîìÄÅ",
            "ÉæÆôöòûùÿÖÜ¢£¥₧ƒ",
            "áíóúñÑªº¿⌐¬½¼¡«»",
            "░▒▓│┤╡╢╖╕╣║╗╝╜╛┐",
            "└┴┬├─┼╞╟╚╔╩╦╠═╬╧",
            "╨╤╥╙╘╒╓╫╪┘┌█▄▌▐▀",
            "αßΓπΣσµτΦΘΩδ∞φε∩",
            "≡±≥≤⌠⌡÷≈°∙·√ⁿ²■\u{A0}",
        ),
    },
];

/// A named codepage with its materialised high-half table.
#[derive(Clone)]
pub struct Codepage {
    pub name: &'static str,
    high:     Vec<char>,
}

impl Codepage {
    /// Decode `bytes` through this codepage.  Returns the decoded string and
    /// the number of undefined cells that had to become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> (String, usize) {
        let mut out = String::with_capacity(bytes.len());
        let mut undefined = 0usize;
        for &b in bytes {
            if b < 0x80 {
                out.push(b as char);
            } else {
                let c = self.high[(b - 0x80) as usize];
                if c == '\u{FFFD}' {
                    undefined += 1;
                }
                out.push(c);
            }
        }
        (out, undefined)
    }
}

impl fmt::Debug for Codepage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Codepage({})", self.name)
    }
}

/// Materialise every packaged codepage, validating table sizes.
pub fn all() -> Result<Vec<Codepage>, String> {
    TABLES
        .iter()
        .map(|t| {
            let high: Vec<char> = t.high.chars().collect();
            if high.len() != 128 {
                return Err(format!(
                    "codepage table {} has {} cells, expected 128",
                    t.name,
                    high.len()
                ));
            }
            Ok(Codepage { name: t.name, high })
        })
        .collect()
}

/// Look up one packaged codepage by name.
pub fn by_name(name: &str) -> Option<Codepage> {
    let t = TABLES.iter().find(|t| t.name.eq_ignore_ascii_case(name))?;
    let high: Vec<char> = t.high.chars().collect();
    (high.len() == 128).then(|| Codepage { name: t.name, high })
}
