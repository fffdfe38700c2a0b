//! Decoding fetched file bodies
//!
//! Raw endpoints return bytes with no reliable charset. The strategy is:
//! - BOM detection (UTF-8, UTF-16 LE/BE)
//! - strict UTF-8 as the fast path
//! - chardetng as the fallback (`.properties` files are often ISO-8859-1)

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

const DEFAULT_SAMPLE_SIZE: usize = 8192;

/// Guess the encoding of `bytes`, returning a lowercase label such as `utf-8` or
/// `windows-1252`.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let sample = &bytes[..bytes.len().min(DEFAULT_SAMPLE_SIZE)];
    if sample.is_empty() {
        return "utf-8".to_string();
    }

    if let Some((encoding, _)) = Encoding::for_bom(sample) {
        return if encoding == UTF_8 {
            "utf-8-sig".to_string()
        } else {
            encoding.name().to_lowercase()
        };
    }

    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, sample.len() == bytes.len());
    let name = detector.guess(None, true).name().to_lowercase();
    if name.contains("utf-8") || name == "ascii" {
        "utf-8".to_string()
    } else {
        name
    }
}

/// Decode `bytes` to text, replacing anything undecodable.
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let label = detect_encoding(bytes);
    let encoding = Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8);
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!("Decoded body as {} with replacements", used.name());
    }
    text.into_owned()
}
