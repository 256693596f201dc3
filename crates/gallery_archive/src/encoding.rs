//! Character encoding detection for archive entry names
//!
//! ZIP tools on Windows write entry names in the system code page without
//! setting the UTF-8 flag, so names have to be guessed.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Hint for encoding detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingHint {
    /// Prefer Chinese Simplified (GBK/GB18030)
    ChineseSimplified,
    /// Prefer Chinese Traditional (Big5)
    ChineseTraditional,
    /// Prefer Japanese encodings (Shift_JIS)
    Japanese,
    /// Prefer Korean (EUC-KR)
    Korean,
    /// No preference
    None,
}

impl EncodingHint {
    fn tld(self) -> Option<&'static [u8]> {
        match self {
            EncodingHint::ChineseSimplified => Some(b"cn"),
            EncodingHint::ChineseTraditional => Some(b"tw"),
            EncodingHint::Japanese => Some(b"jp"),
            EncodingHint::Korean => Some(b"kr"),
            EncodingHint::None => None,
        }
    }

    /// Encoding to fall back to when detection only finds Latin-1
    fn fallback(self) -> Option<&'static Encoding> {
        match self {
            EncodingHint::ChineseSimplified => Some(encoding_rs::GBK),
            EncodingHint::ChineseTraditional => Some(encoding_rs::BIG5),
            EncodingHint::Japanese => Some(encoding_rs::SHIFT_JIS),
            EncodingHint::Korean => Some(encoding_rs::EUC_KR),
            EncodingHint::None => None,
        }
    }
}

/// Detect the most likely encoding of a byte sequence
pub fn detect_encoding(bytes: &[u8], hint: EncodingHint) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return encoding_rs::UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let detected = detector.guess(hint.tld(), true);

    match hint.fallback() {
        Some(fallback) if detected == encoding_rs::WINDOWS_1252 => fallback,
        _ => detected,
    }
}

/// Decode bytes to a UTF-8 string
///
/// Returns the decoded string and whether replacement characters were needed
pub fn decode_bytes(bytes: &[u8], hint: EncodingHint) -> (String, bool) {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return (s.to_string(), false);
    }

    let encoding = detect_encoding(bytes, hint);
    let (result, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::warn!("Lossy decode of archive entry name as {}", encoding.name());
    }
    (result.into_owned(), had_errors)
}

/// Get the system default encoding hint based on locale
#[cfg(windows)]
pub fn system_encoding_hint() -> EncodingHint {
    use windows::Win32::Globalization::GetUserDefaultLCID;

    let lcid = unsafe { GetUserDefaultLCID() };

    match lcid {
        // zh-TW, zh-HK, zh-MO
        0x0404 | 0x0C04 | 0x1404 => EncodingHint::ChineseTraditional,
        _ => match lcid & 0x3FF {
            0x04 => EncodingHint::ChineseSimplified,
            0x11 => EncodingHint::Japanese,
            0x12 => EncodingHint::Korean,
            _ => EncodingHint::None,
        },
    }
}

#[cfg(not(windows))]
pub fn system_encoding_hint() -> EncodingHint {
    std::env::var("LANG")
        .map(|lang| hint_from_locale(&lang))
        .unwrap_or(EncodingHint::None)
}

#[cfg(not(windows))]
fn hint_from_locale(lang: &str) -> EncodingHint {
    let lang = lang.to_lowercase().replace('-', "_");
    if lang.starts_with("zh_tw") || lang.starts_with("zh_hk") {
        EncodingHint::ChineseTraditional
    } else if lang.starts_with("zh") {
        EncodingHint::ChineseSimplified
    } else if lang.starts_with("ja") {
        EncodingHint::Japanese
    } else if lang.starts_with("ko") {
        EncodingHint::Korean
    } else {
        EncodingHint::None
    }
}
