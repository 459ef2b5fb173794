//! Ready-made operation table.
//!
//! A representative set of reversible and detective operations behind the
//! ordinary [`TableRegistry`] seam: positional codecs (hex, base64, base32,
//! octal, decimal, binary), text transforms (URL decode, ROT13), stream
//! decompression (Zstandard, LZ4), a passthrough image-render step, and a
//! codepage brute-force decoder.  Hosts embedding their own operation
//! machinery can ignore this module entirely.
//!
//! Every handler is strict: malformed input is an [`OpError`], never a
//! best-effort partial decode.  Strictness is what lets the search discard
//! wrong branches early.

use data_encoding::{BASE32, BASE64};

use crate::buffer::ByteBuffer;
use crate::ops::{DataType, OpArg, OpError, OperationDescriptor, PatternHint, TableRegistry};
use crate::sigs::codepage;

const BASE64_ALPHABET: &str = "A-Za-z0-9+/=";
const BASE32_ALPHABET: &str = "A-Z2-7=";

// ── Argument helpers ─────────────────────────────────────────────────────────

fn delimiter(args: &[OpArg]) -> Result<Option<char>, OpError> {
    let name = args
        .first()
        .and_then(OpArg::as_str)
        .ok_or_else(|| OpError::UnsupportedArgs("expected a delimiter name".to_string()))?;
    match name {
        "Space"     => Ok(Some(' ')),
        "Comma"     => Ok(Some(',')),
        "Line feed" => Ok(Some('\n')),
        "None"      => Ok(None),
        other => Err(OpError::UnsupportedArgs(format!("unknown delimiter: {other}"))),
    }
}

fn utf8_input(input: &ByteBuffer) -> Result<&str, OpError> {
    input.try_as_utf8().ok_or(OpError::NotUtf8)
}

// ── Positional codecs ────────────────────────────────────────────────────────

fn from_hex(args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    let text = utf8_input(input)?.trim();
    let mut out = Vec::new();
    match delimiter(args)? {
        Some(sep) => {
            for token in text.split(sep) {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                if token.len() > 2 {
                    return Err(OpError::Failed(format!("token too long: {token:?}")));
                }
                out.push(
                    u8::from_str_radix(token, 16)
                        .map_err(|e| OpError::Failed(e.to_string()))?,
                );
            }
        }
        None => {
            if text.len() % 2 != 0 {
                return Err(OpError::Failed("odd digit count".to_string()));
            }
            for pair in text.as_bytes().chunks_exact(2) {
                let token = std::str::from_utf8(pair).map_err(|_| OpError::NotUtf8)?;
                out.push(
                    u8::from_str_radix(token, 16)
                        .map_err(|e| OpError::Failed(e.to_string()))?,
                );
            }
        }
    }
    if out.is_empty() {
        return Err(OpError::Failed("no hex digits".to_string()));
    }
    Ok(ByteBuffer::new(out))
}

fn to_hex(args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    let sep = delimiter(args)?;
    let encoded: Vec<String> = input.as_bytes().iter().map(|b| format!("{b:02x}")).collect();
    let joined = match sep {
        Some(c) => encoded.join(&c.to_string()),
        None    => encoded.concat(),
    };
    Ok(ByteBuffer::new(joined.into_bytes()))
}

/// Shared parser for the octal/decimal/binary token decoders.
fn from_radix(
    radix: u32,
    max_digits: usize,
    args: &[OpArg],
    input: &ByteBuffer,
) -> Result<ByteBuffer, OpError> {
    let text = utf8_input(input)?.trim();
    let sep = delimiter(args)?
        .ok_or_else(|| OpError::UnsupportedArgs("a delimiter is required".to_string()))?;
    let mut out = Vec::new();
    for token in text.split(sep) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.len() > max_digits {
            return Err(OpError::Failed(format!("token too long: {token:?}")));
        }
        out.push(
            u8::from_str_radix(token, radix).map_err(|e| OpError::Failed(e.to_string()))?,
        );
    }
    if out.is_empty() {
        return Err(OpError::Failed("no tokens".to_string()));
    }
    Ok(ByteBuffer::new(out))
}

// ── Base-N codecs ────────────────────────────────────────────────────────────

fn from_base64(args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    match args.first().and_then(OpArg::as_str) {
        Some(a) if a == BASE64_ALPHABET => {}
        other => {
            return Err(OpError::UnsupportedArgs(format!("unsupported alphabet: {other:?}")))
        }
    }
    let text = utf8_input(input)?.trim();
    let decoded = BASE64
        .decode(text.as_bytes())
        .map_err(|e| OpError::Failed(e.to_string()))?;
    Ok(ByteBuffer::new(decoded))
}

fn to_base64(args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    match args.first().and_then(OpArg::as_str) {
        Some(a) if a == BASE64_ALPHABET => {}
        other => {
            return Err(OpError::UnsupportedArgs(format!("unsupported alphabet: {other:?}")))
        }
    }
    Ok(ByteBuffer::new(BASE64.encode(input.as_bytes()).into_bytes()))
}

fn from_base32(args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    match args.first().and_then(OpArg::as_str) {
        Some(a) if a == BASE32_ALPHABET => {}
        other => {
            return Err(OpError::UnsupportedArgs(format!("unsupported alphabet: {other:?}")))
        }
    }
    let text = utf8_input(input)?.trim();
    let decoded = BASE32
        .decode(text.as_bytes())
        .map_err(|e| OpError::Failed(e.to_string()))?;
    Ok(ByteBuffer::new(decoded))
}

// ── Text transforms ──────────────────────────────────────────────────────────

fn url_decode(_args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    let text = utf8_input(input)?;
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let pair = bytes
                .get(i + 1..i + 3)
                .ok_or_else(|| OpError::Failed("truncated percent escape".to_string()))?;
            let token = std::str::from_utf8(pair).map_err(|_| OpError::NotUtf8)?;
            out.push(
                u8::from_str_radix(token, 16)
                    .map_err(|_| OpError::Failed(format!("bad percent escape: %{token}")))?,
            );
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(ByteBuffer::new(out))
}

fn rot13(args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    let amount = args.first().and_then(|a| a.as_int()).unwrap_or(13).rem_euclid(26) as u8;
    let text = utf8_input(input)?;
    let rotated: Vec<u8> = text
        .bytes()
        .map(|b| match b {
            b'a'..=b'z' => b'a' + (b - b'a' + amount) % 26,
            b'A'..=b'Z' => b'A' + (b - b'A' + amount) % 26,
            other => other,
        })
        .collect();
    Ok(ByteBuffer::new(rotated))
}

// ── Decompression ────────────────────────────────────────────────────────────

fn zstd_decompress(_args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    let decoded = zstd::decode_all(input.as_bytes())
        .map_err(|e| OpError::Failed(e.to_string()))?;
    Ok(ByteBuffer::new(decoded))
}

fn lz4_decompress(_args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    let decoded = lz4_flex::decompress_size_prepended(input.as_bytes())
        .map_err(|e| OpError::Failed(e.to_string()))?;
    Ok(ByteBuffer::new(decoded))
}

// ── Detective steps ──────────────────────────────────────────────────────────

/// Rendering happens in the excluded presentation layer; the step exists so
/// image recipes terminate on an explicit render action.
fn render_image(_args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    Ok(input.clone())
}

fn text_encoding(args: &[OpArg], input: &ByteBuffer) -> Result<ByteBuffer, OpError> {
    let name = args
        .first()
        .and_then(OpArg::as_str)
        .ok_or_else(|| OpError::UnsupportedArgs("expected a codepage name".to_string()))?;
    let page = codepage::by_name(name)
        .ok_or_else(|| OpError::UnsupportedArgs(format!("unknown codepage: {name}")))?;
    let (decoded, _) = page.decode(input.as_bytes());
    Ok(ByteBuffer::new(decoded.into_bytes()))
}

// ── Registry assembly ────────────────────────────────────────────────────────

/// Build the standard registry.
///
/// Registration order is ranking-relevant (earlier operations win ties), so
/// the blind-worthy decoders come first and the encoders last.
pub fn standard_registry() -> Result<TableRegistry, regex::Error> {
    use DataType::{NumberString, RawBytes, Utf8String};

    let mut reg = TableRegistry::new();

    reg.register(
        OperationDescriptor::new("From Hex", Utf8String, RawBytes)
            .with_default_args(vec!["Space".into()])
            .useful(true)
            .with_hint(PatternHint::new(
                r"(?i)^\s*(?:[0-9a-f]{2} )+[0-9a-f]{2}\s*$",
                vec!["Space".into()],
                true,
            )?)
            .with_hint(PatternHint::new(
                r"(?i)^\s*(?:[0-9a-f]{2}){3,}\s*$",
                vec!["None".into()],
                true,
            )?)
            .with_hint(PatternHint::new(
                r"(?i)^\s*(?:[0-9a-f]{2},)+[0-9a-f]{2}\s*$",
                vec!["Comma".into()],
                true,
            )?),
        from_hex,
    );

    reg.register(
        OperationDescriptor::new("From Base64", Utf8String, RawBytes)
            .with_default_args(vec![BASE64_ALPHABET.into()])
            .useful(true)
            .with_hint(PatternHint::new(
                r"^\s*[A-Za-z0-9+/]{8,}={0,2}\s*$",
                vec![BASE64_ALPHABET.into()],
                true,
            )?),
        from_base64,
    );

    reg.register(
        OperationDescriptor::new("From Base32", Utf8String, RawBytes)
            .with_default_args(vec![BASE32_ALPHABET.into()])
            .useful(true)
            .with_hint(PatternHint::new(
                r"^\s*[A-Z2-7]{8,}={0,6}\s*$",
                vec![BASE32_ALPHABET.into()],
                true,
            )?),
        from_base32,
    );

    reg.register(
        OperationDescriptor::new("From Octal", NumberString, RawBytes)
            .with_default_args(vec!["Space".into()])
            .useful(true)
            .with_hint(PatternHint::new(
                r"^\s*(?:[0-7]{1,3} )+[0-7]{1,3}\s*$",
                vec!["Space".into()],
                true,
            )?),
        |args, input| from_radix(8, 3, args, input),
    );

    reg.register(
        OperationDescriptor::new("From Decimal", NumberString, RawBytes)
            .with_default_args(vec!["Space".into()])
            .useful(true)
            .with_hint(PatternHint::new(
                r"^\s*(?:\d{1,3} )+\d{1,3}\s*$",
                vec!["Space".into()],
                true,
            )?),
        |args, input| from_radix(10, 3, args, input),
    );

    reg.register(
        OperationDescriptor::new("From Binary", NumberString, RawBytes)
            .with_default_args(vec!["Space".into()])
            .useful(true)
            .with_hint(PatternHint::new(
                r"^\s*(?:[01]{8} )+[01]{8}\s*$",
                vec!["Space".into()],
                true,
            )?)
            .with_hint(PatternHint::new(
                r"^\s*(?:[01]{8}){2,}\s*$",
                vec!["None".into()],
                true,
            )?),
        |args, input| match delimiter(args)? {
            Some(_) => from_radix(2, 8, args, input),
            None => {
                let text = utf8_input(input)?.trim();
                if text.len() % 8 != 0 || text.is_empty() {
                    return Err(OpError::Failed("bit count not a multiple of 8".to_string()));
                }
                let mut out = Vec::with_capacity(text.len() / 8);
                for chunk in text.as_bytes().chunks_exact(8) {
                    let token = std::str::from_utf8(chunk).map_err(|_| OpError::NotUtf8)?;
                    out.push(
                        u8::from_str_radix(token, 2)
                            .map_err(|e| OpError::Failed(e.to_string()))?,
                    );
                }
                Ok(ByteBuffer::new(out))
            }
        },
    );

    reg.register(
        OperationDescriptor::new("URL Decode", Utf8String, Utf8String)
            .with_hint(PatternHint::new(r"%[0-9A-Fa-f]{2}", vec![], true)?),
        url_decode,
    );

    reg.register(
        OperationDescriptor::new("ROT13", Utf8String, Utf8String)
            .with_default_args(vec![13i64.into()]),
        rot13,
    );

    reg.register(
        OperationDescriptor::new("Zstd Decompress", RawBytes, RawBytes)
            .with_hint(PatternHint::new(r"(?-u)^\x28\xB5\x2F\xFD", vec![], true)?),
        zstd_decompress,
    );

    reg.register(
        OperationDescriptor::new("LZ4 Decompress", RawBytes, RawBytes),
        lz4_decompress,
    );

    reg.register(
        OperationDescriptor::new("Render Image", RawBytes, RawBytes)
            .with_hint(PatternHint::new(r"(?-u)^\xFF\xD8\xFF", vec![], true)?)
            .with_hint(PatternHint::new(r"(?-u)^\x89PNG\x0D\x0A\x1A\x0A", vec![], true)?)
            .with_hint(PatternHint::new(r"^GIF8[79]a", vec![], true)?)
            .with_hint(PatternHint::new(r"(?s-u)^BM.{4}\x00\x00\x00\x00", vec![], true)?),
        render_image,
    );

    {
        let mut desc =
            OperationDescriptor::new("Text Encoding Brute Force", RawBytes, Utf8String)
                .with_default_args(vec!["windows-1252".into()]);
        for page in ["windows-1251", "windows-1252", "iso-8859-1", "iso-8859-2", "cp437"] {
            desc = desc.with_hint(PatternHint::new(
                r"(?-u)[\x80-\xFF]{2,}",
                vec![page.into()],
                true,
            )?);
        }
        reg.register(desc, text_encoding);
    }

    reg.register(
        OperationDescriptor::new("To Hex", RawBytes, Utf8String)
            .with_default_args(vec!["Space".into()]),
        to_hex,
    );

    reg.register(
        OperationDescriptor::new("To Base64", RawBytes, Utf8String)
            .with_default_args(vec![BASE64_ALPHABET.into()]),
        to_base64,
    );

    Ok(reg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::OperationRegistry;

    fn reg() -> TableRegistry {
        standard_registry().expect("builtin hints compile")
    }

    fn buf(s: &str) -> ByteBuffer {
        ByteBuffer::from(s)
    }

    #[test]
    fn from_hex_space_delimited() {
        let out = reg()
            .invoke("From Hex", &["Space".into()], &buf("41 42 43 44 45"))
            .unwrap();
        assert_eq!(out.as_bytes(), b"ABCDE");
    }

    #[test]
    fn from_hex_rejects_garbage() {
        let r = reg();
        assert!(r.invoke("From Hex", &["Space".into()], &buf("41 4x 43")).is_err());
        assert!(r.invoke("From Hex", &["None".into()], &buf("414")).is_err());
        assert!(r.invoke("From Hex", &["Space".into()], &ByteBuffer::new(vec![0xFF])).is_err());
    }

    #[test]
    fn hex_hint_selects_delimiter() {
        let r = reg();
        let spaced = r.matching_hints("From Hex", &buf("41 42 43 44 45"));
        assert_eq!(spaced, vec![vec![OpArg::Str("Space".into())]]);
        let packed = r.matching_hints("From Hex", &buf("4142434445"));
        assert_eq!(packed, vec![vec![OpArg::Str("None".into())]]);
    }

    #[test]
    fn base64_round_trip() {
        let r = reg();
        let alphabet: Vec<OpArg> = vec![BASE64_ALPHABET.into()];
        let encoded = r.invoke("To Base64", &alphabet, &buf("test string")).unwrap();
        assert_eq!(encoded.as_bytes(), b"dGVzdCBzdHJpbmc=");
        let decoded = r.invoke("From Base64", &alphabet, &encoded).unwrap();
        assert_eq!(decoded.as_bytes(), b"test string");
    }

    #[test]
    fn base32_decodes() {
        let r = reg();
        let encoded = BASE32.encode(b"test string");
        let out = r
            .invoke("From Base32", &[BASE32_ALPHABET.into()], &buf(&encoded))
            .unwrap();
        assert_eq!(out.as_bytes(), b"test string");
    }

    #[test]
    fn radix_decoders() {
        let r = reg();
        let oct = r.invoke("From Octal", &["Space".into()], &buf("164 145 163 164")).unwrap();
        assert_eq!(oct.as_bytes(), b"test");
        let dec = r.invoke("From Decimal", &["Space".into()], &buf("116 101 115 116")).unwrap();
        assert_eq!(dec.as_bytes(), b"test");
        let bin = r
            .invoke("From Binary", &["Space".into()], &buf("01110100 01100101"))
            .unwrap();
        assert_eq!(bin.as_bytes(), b"te");
        assert!(r.invoke("From Octal", &["Space".into()], &buf("88 99")).is_err());
        assert!(r.invoke("From Decimal", &["Space".into()], &buf("300 1")).is_err());
    }

    #[test]
    fn url_decode_strict() {
        let r = reg();
        let out = r.invoke("URL Decode", &[], &buf("a%20b%41")).unwrap();
        assert_eq!(out.as_bytes(), b"a bA");
        assert!(r.invoke("URL Decode", &[], &buf("broken%2")).is_err());
    }

    #[test]
    fn rot13_default_amount() {
        let r = reg();
        let out = r.invoke("ROT13", &[13i64.into()], &buf("Why did the chicken")).unwrap();
        assert_eq!(out.as_bytes(), b"Jul qvq gur puvpxra");
        let back = r.invoke("ROT13", &[13i64.into()], &out).unwrap();
        assert_eq!(back.as_bytes(), b"Why did the chicken");
    }

    #[test]
    fn lz4_round_trips_via_registry() {
        let r = reg();
        let compressed = lz4_flex::compress_prepend_size(b"compressible compressible");
        let out = r
            .invoke("LZ4 Decompress", &[], &ByteBuffer::new(compressed))
            .unwrap();
        assert_eq!(out.as_bytes(), b"compressible compressible");
    }

    #[test]
    fn zstd_rejects_non_stream() {
        assert!(reg().invoke("Zstd Decompress", &[], &buf("not zstd")).is_err());
    }

    #[test]
    fn render_image_passes_through() {
        let jpeg = ByteBuffer::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]);
        let out = reg().invoke("Render Image", &[], &jpeg).unwrap();
        assert_eq!(out.as_bytes(), jpeg.as_bytes());
    }

    #[test]
    fn text_encoding_brute_force_decodes_1251() {
        let raw = ByteBuffer::new(vec![0xEF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
        let out = reg()
            .invoke("Text Encoding Brute Force", &["windows-1251".into()], &raw)
            .unwrap();
        assert_eq!(out.try_as_utf8(), Some("привет"));
    }

    #[test]
    fn encoding_hints_cover_codepages() {
        let r = reg();
        let high = ByteBuffer::new(vec![b'a', 0xD0, 0xE2, b'b']);
        let vectors = r.matching_hints("Text Encoding Brute Force", &high);
        assert_eq!(vectors.len(), 5);
        assert!(vectors.iter().any(|v| v[0] == OpArg::Str("windows-1251".into())));
    }
}
