//! Signature catalogue: file-type and text-encoding identification.
//!
//! # File types
//!
//! An ordered table of byte-regex signatures, each valid inside an offset
//! window.  [`SignatureCatalogue::identify`] returns the match with the
//! lowest offset; ties go to the earlier table row.  The table is compiled
//! once at engine construction and a compile failure there is fatal.
//!
//! # Encodings
//!
//! Detectors return `Miss` or a [`EncodingHit`] with a confidence and the
//! decoded text: BOM checks, a plausible-UTF-8 check, and mojibake
//! detectors that transcode through the packaged single-byte codepages and
//! re-score the result to decide whether the transcode reads better than
//! the raw bytes.

pub mod codepage;

use regex::bytes::Regex;
use serde::Serialize;
use tracing::trace;

use crate::buffer::ByteBuffer;
use crate::score;

/// Extra bytes past `offset_max` a matcher may consume to complete a match.
const SIG_WINDOW: usize = 64;

/// Minimum confidence before a codepage transcode is reported as a hit.
const MIN_TRANSCODE_CONFIDENCE: f64 = 0.55;

// (extension, mime, description, offset_min, offset_max, pattern)
//
// Ordered most-specific first; `identify` prefers the lowest match offset
// and falls back to row order, so weak two-byte magics sit at the bottom.
const FILE_SIG_ROWS: &[(&str, &str, &str, usize, usize, &str)] = &[
    ("jpg",    "image/jpeg",               "JPEG image",                0, 0,    r"(?-u)^\xFF\xD8\xFF[\xDB\xE0\xE1\xEE]"),
    ("png",    "image/png",                "PNG image",                 0, 0,    r"(?-u)^\x89PNG\x0D\x0A\x1A\x0A"),
    ("gif",    "image/gif",                "GIF image",                 0, 0,    r"^GIF8[79]a"),
    ("bmp",    "image/bmp",                "Windows bitmap",            0, 0,    r"(?s-u)^BM.{4}\x00\x00\x00\x00"),
    ("pdf",    "application/pdf",          "PDF document",              0, 1024, r"%PDF-"),
    ("zip",    "application/zip",          "ZIP archive",               0, 0,    r"(?-u)^PK\x03\x04"),
    ("gz",     "application/gzip",         "Gzip stream",               0, 0,    r"(?-u)^\x1F\x8B\x08"),
    ("zst",    "application/zstd",         "Zstandard stream",          0, 0,    r"(?-u)^\x28\xB5\x2F\xFD"),
    ("7z",     "application/x-7z-compressed", "7-Zip archive",          0, 0,    r"(?-u)^7z\xBC\xAF\x27\x1C"),
    ("rar",    "application/x-rar-compressed", "RAR archive",           0, 0,    r"(?-u)^Rar!\x1A\x07"),
    ("xz",     "application/x-xz",         "XZ stream",                 0, 0,    r"(?-u)^\xFD7zXZ\x00"),
    ("bz2",    "application/x-bzip2",      "Bzip2 stream",              0, 0,    r"^BZh[1-9]"),
    ("elf",    "application/x-elf",        "ELF executable",            0, 0,    r"(?-u)^\x7FELF"),
    ("class",  "application/java-vm",      "Java class file",           0, 0,    r"(?-u)^\xCA\xFE\xBA\xBE"),
    ("macho",  "application/x-mach-binary", "Mach-O binary",            0, 0,    r"(?-u)^\xCF\xFA\xED\xFE"),
    ("tar",    "application/x-tar",        "Tar archive",               257, 257, r"^ustar"),
    ("sqlite", "application/x-sqlite3",    "SQLite 3 database",         0, 0,    r"(?-u)^SQLite format 3\x00"),
    ("wav",    "audio/x-wav",              "WAV audio",                 0, 0,    r"(?s-u)^RIFF.{4}WAVE"),
    ("ogg",    "audio/ogg",                "Ogg container",             0, 0,    r"^OggS"),
    ("flac",   "audio/flac",               "FLAC audio",                0, 0,    r"^fLaC"),
    ("mp3",    "audio/mpeg",               "MP3 audio (ID3 tag)",       0, 0,    r"^ID3"),
    ("exe",    "application/x-msdownload", "DOS/Windows executable",    0, 0,    r"^MZ"),
];

/// One compiled file-type signature row.
#[derive(Debug)]
pub struct FileSignature {
    pub extension:   &'static str,
    pub mime:        &'static str,
    pub description: &'static str,
    pub offset_min:  usize,
    pub offset_max:  usize,
    matcher:         Regex,
}

/// A successful file-type identification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileTypeMatch {
    pub extension:   String,
    pub mime:        String,
    pub description: String,
    /// Byte offset at which the signature matched.
    pub offset:      usize,
}

/// A successful encoding detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodingHit {
    pub name:       String,
    pub confidence: f64,
    /// The buffer decoded under this encoding, when the detector produces one.
    pub decoded:    Option<String>,
}

/// Compiled, read-only signature tables.  Built once at engine start.
pub struct SignatureCatalogue {
    file_sigs: Vec<FileSignature>,
    codepages: Vec<codepage::Codepage>,
}

impl SignatureCatalogue {
    /// Compile every packaged signature and codepage table.
    ///
    /// # Errors
    /// Returns an error string when a signature regex fails to compile or a
    /// codepage table is malformed; both are packaging defects and fatal.
    pub fn new() -> Result<Self, String> {
        let file_sigs = FILE_SIG_ROWS
            .iter()
            .map(|&(extension, mime, description, offset_min, offset_max, pattern)| {
                let matcher = Regex::new(pattern)
                    .map_err(|e| format!("signature for .{extension} failed to compile: {e}"))?;
                Ok(FileSignature { extension, mime, description, offset_min, offset_max, matcher })
            })
            .collect::<Result<Vec<_>, String>>()?;
        let codepages = codepage::all()?;
        Ok(Self { file_sigs, codepages })
    }

    /// Identify the buffer's file type from its leading bytes.
    ///
    /// Returns the signature matching at the lowest offset; equal offsets
    /// resolve to the earlier table row.
    pub fn identify(&self, b: &ByteBuffer) -> Option<FileTypeMatch> {
        let bytes = b.as_bytes();
        let mut best: Option<(usize, &FileSignature)> = None;

        for sig in &self.file_sigs {
            if sig.offset_min >= bytes.len() {
                continue;
            }
            let window_end = bytes.len().min(sig.offset_max + SIG_WINDOW);
            let hay = &bytes[sig.offset_min..window_end];
            if let Some(m) = sig.matcher.find(hay) {
                let pos = sig.offset_min + m.start();
                if pos <= sig.offset_max && best.map_or(true, |(p, _)| pos < p) {
                    best = Some((pos, sig));
                }
            }
        }

        best.map(|(offset, sig)| FileTypeMatch {
            extension:   sig.extension.to_string(),
            mime:        sig.mime.to_string(),
            description: sig.description.to_string(),
            offset,
        })
    }

    /// Run every encoding detector over the buffer.
    ///
    /// `extensive` widens both the codepage set tried for mojibake and the
    /// script blocks considered when judging a transcode.  Hits come back
    /// ordered by descending confidence, name as tiebreak.
    pub fn detect_encodings(&self, b: &ByteBuffer, extensive: bool) -> Vec<EncodingHit> {
        let bytes = b.as_bytes();
        if bytes.is_empty() {
            return Vec::new();
        }
        let mut hits = Vec::new();

        // BOM detectors are exclusive: a buffer has at most one.
        if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            if let Ok(decoded) = std::str::from_utf8(&bytes[3..]) {
                hits.push(EncodingHit {
                    name:       "utf-8 (bom)".to_string(),
                    confidence: 1.0,
                    decoded:    Some(decoded.to_string()),
                });
            }
        } else if bytes.starts_with(&[0xFF, 0xFE]) {
            if let Some(decoded) = decode_utf16(&bytes[2..], u16::from_le_bytes) {
                hits.push(EncodingHit {
                    name:       "utf-16le (bom)".to_string(),
                    confidence: 0.95,
                    decoded:    Some(decoded),
                });
            }
        } else if bytes.starts_with(&[0xFE, 0xFF]) {
            if let Some(decoded) = decode_utf16(&bytes[2..], u16::from_be_bytes) {
                hits.push(EncodingHit {
                    name:       "utf-16be (bom)".to_string(),
                    confidence: 0.95,
                    decoded:    Some(decoded),
                });
            }
        }

        // Plausible UTF-8: valid and actually multi-byte somewhere.
        if let Some(text) = b.try_as_utf8() {
            if !text.is_ascii() {
                hits.push(EncodingHit {
                    name:       "utf-8".to_string(),
                    confidence: 0.9,
                    decoded:    Some(text.to_string()),
                });
            }
        } else if bytes.iter().any(|&byte| byte >= 0x80) {
            // Not UTF-8 but carrying high bytes: try the codepages.
            for page in self.detection_set(extensive) {
                let (decoded, undefined) = page.decode(bytes);
                let confidence = transcode_confidence(&decoded, undefined, extensive);
                trace!(codepage = page.name, confidence, "transcode scored");
                if confidence >= MIN_TRANSCODE_CONFIDENCE {
                    hits.push(EncodingHit {
                        name: page.name.to_string(),
                        confidence,
                        decoded: Some(decoded),
                    });
                }
            }
        }

        hits.sort_by(|a, b| {
            score::rank_order(b.confidence, a.confidence).then_with(|| a.name.cmp(&b.name))
        });
        hits
    }

    fn detection_set(&self, extensive: bool) -> impl Iterator<Item = &codepage::Codepage> {
        self.codepages.iter().filter(move |page| {
            extensive || matches!(page.name, "windows-1252" | "iso-8859-1")
        })
    }
}

fn decode_utf16(bytes: &[u8], read: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes.chunks_exact(2).map(|p| read([p[0], p[1]])).collect();
    String::from_utf16(&units).ok()
}

/// Judge a codepage transcode: how text-like the decoded string reads,
/// boosted by a confident script detection and penalised per undefined cell.
fn transcode_confidence(decoded: &str, undefined: usize, extensive: bool) -> f64 {
    let total = decoded.chars().count();
    if total == 0 {
        return 0.0;
    }
    let texty = decoded
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || c.is_ascii_punctuation())
        .count() as f64
        / total as f64;

    let dbuf = ByteBuffer::from(decoded.as_bytes());
    let lang = score::detect_languages(&dbuf, extensive)
        .first()
        .map(|hit| hit.confidence)
        .unwrap_or(0.0);
    let undef_penalty = undefined as f64 / total as f64;

    (0.6 * texty + 0.4 * lang - undef_penalty).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogue() -> SignatureCatalogue {
        SignatureCatalogue::new().expect("packaged tables compile")
    }

    #[test]
    fn identifies_jpeg() {
        let sigs = catalogue();
        let jpeg = ByteBuffer::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F']);
        let m = sigs.identify(&jpeg).expect("jpeg detected");
        assert_eq!(m.mime, "image/jpeg");
        assert_eq!(m.offset, 0);
    }

    #[test]
    fn identifies_tar_at_offset() {
        let sigs = catalogue();
        let mut data = vec![0u8; 512];
        data[257..262].copy_from_slice(b"ustar");
        let m = sigs.identify(&ByteBuffer::new(data)).expect("tar detected");
        assert_eq!(m.extension, "tar");
        assert_eq!(m.offset, 257);
    }

    #[test]
    fn lowest_offset_wins() {
        // "MZ" at 0 must beat a PDF marker buried later in the window.
        let sigs = catalogue();
        let mut data = b"MZ padding padding ".to_vec();
        data.extend_from_slice(b"%PDF-1.7");
        let m = sigs.identify(&ByteBuffer::new(data)).expect("match");
        assert_eq!(m.extension, "exe");
    }

    #[test]
    fn plain_text_is_unidentified() {
        let sigs = catalogue();
        assert!(sigs.identify(&ByteBuffer::from("just some text")).is_none());
    }

    #[test]
    fn utf8_bom_detected() {
        let sigs = catalogue();
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice("héllo".as_bytes());
        let hits = sigs.detect_encodings(&ByteBuffer::new(data), false);
        assert_eq!(hits[0].name, "utf-8 (bom)");
        assert_eq!(hits[0].decoded.as_deref(), Some("héllo"));
    }

    #[test]
    fn utf16le_bom_detected() {
        let sigs = catalogue();
        let mut data = vec![0xFF, 0xFE];
        for unit in "hi".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        let hits = sigs.detect_encodings(&ByteBuffer::new(data), false);
        assert_eq!(hits[0].name, "utf-16le (bom)");
        assert_eq!(hits[0].decoded.as_deref(), Some("hi"));
    }

    #[test]
    fn mojibake_cyrillic_hits_windows_1251() {
        let sigs = catalogue();
        // "привет мир как дела" in windows-1251
        let raw: Vec<u8> = vec![
            0xEF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2, 0x20, 0xEC, 0xE8, 0xF0, 0x20, 0xEA, 0xE0, 0xEA,
            0x20, 0xE4, 0xE5, 0xEB, 0xE0,
        ];
        let hits = sigs.detect_encodings(&ByteBuffer::new(raw), true);
        let w1251 = hits.iter().find(|h| h.name == "windows-1251").expect("1251 hit");
        assert!(w1251.confidence > 0.8, "confidence = {}", w1251.confidence);
        assert_eq!(w1251.decoded.as_deref(), Some("привет мир как дела"));
    }

    #[test]
    fn narrow_set_skips_cyrillic_codepage() {
        let sigs = catalogue();
        let raw = vec![0xEF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2];
        let hits = sigs.detect_encodings(&ByteBuffer::new(raw), false);
        assert!(hits.iter().all(|h| h.name != "windows-1251"));
    }

    #[test]
    fn pure_ascii_yields_no_hits() {
        let sigs = catalogue();
        let hits = sigs.detect_encodings(&ByteBuffer::from("plain ascii"), true);
        assert!(hits.is_empty());
    }
}
