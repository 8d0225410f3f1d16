//! Target text encodings for written feeds.
//!
//! Most supplier feeds are published in Windows-1251. Characters outside the
//! target repertoire are replaced with XML numeric character references
//! (`&#8470;`) before encoding, so the written bytes always round-trip.

use std::borrow::Cow;
use std::str::FromStr;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    #[default]
    Windows1251,
    Utf8,
}

impl OutputEncoding {
    /// Label written into the XML declaration.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            OutputEncoding::Windows1251 => "windows-1251",
            OutputEncoding::Utf8 => "utf-8",
        }
    }

    fn encoding(self) -> &'static Encoding {
        match self {
            OutputEncoding::Windows1251 => WINDOWS_1251,
            OutputEncoding::Utf8 => UTF_8,
        }
    }

    /// Returns `true` if `c` can be written in this encoding without loss.
    #[must_use]
    pub fn can_represent(self, c: char) -> bool {
        if c.is_ascii() || self == OutputEncoding::Utf8 {
            return true;
        }
        let mut buf = [0u8; 4];
        let (_, _, had_errors) = self.encoding().encode(c.encode_utf8(&mut buf));
        !had_errors
    }

    /// Replaces every character the encoding cannot hold with a numeric
    /// character reference. Borrows when nothing needs replacing.
    #[must_use]
    pub fn represent(self, s: &str) -> Cow<'_, str> {
        if s.chars().all(|c| self.can_represent(c)) {
            return Cow::Borrowed(s);
        }
        let mut out = String::with_capacity(s.len() + 16);
        for c in s.chars() {
            if self.can_represent(c) {
                out.push(c);
            } else {
                out.push_str(&format!("&#{};", u32::from(c)));
            }
        }
        Cow::Owned(out)
    }

    /// Encodes `s` into bytes. Unrepresentable characters become numeric
    /// character references, matching [`Self::represent`].
    #[must_use]
    pub fn encode(self, s: &str) -> Vec<u8> {
        let represented = self.represent(s);
        let (bytes, _, _) = self.encoding().encode(&represented);
        bytes.into_owned()
    }

    /// Decodes bytes previously written in this encoding. Malformed sequences
    /// are replaced with U+FFFD.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        let (text, _, _) = self.encoding().decode(bytes);
        text.into_owned()
    }
}

impl std::fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OutputEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows-1251" | "cp1251" | "cp-1251" => Ok(OutputEncoding::Windows1251),
            "utf-8" | "utf8" => Ok(OutputEncoding::Utf8),
            other => Err(format!(
                "unsupported encoding '{other}'; expected windows-1251 or utf-8"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyrillic_is_representable_in_windows_1251() {
        assert!(OutputEncoding::Windows1251.can_represent('Ж'));
        assert!(OutputEncoding::Windows1251.can_represent('№'));
        assert!(OutputEncoding::Windows1251.can_represent('—'));
    }

    #[test]
    fn emoji_is_not_representable_in_windows_1251() {
        assert!(!OutputEncoding::Windows1251.can_represent('😀'));
        assert!(OutputEncoding::Utf8.can_represent('😀'));
    }

    #[test]
    fn represent_borrows_when_clean() {
        let text = "Принтер HP LaserJet";
        assert!(matches!(
            OutputEncoding::Windows1251.represent(text),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn represent_replaces_unmappable_with_reference() {
        let out = OutputEncoding::Windows1251.represent("Кабель ≥ 2 м");
        assert_eq!(out, "Кабель &#8805; 2 м");
    }

    #[test]
    fn encode_then_decode_round_trips_representable_text() {
        let text = "Монитор 27\" — «IPS», №5";
        let bytes = OutputEncoding::Windows1251.encode(text);
        assert_eq!(OutputEncoding::Windows1251.decode(&bytes), text);
    }

    #[test]
    fn from_str_accepts_aliases() {
        assert_eq!(
            "CP1251".parse::<OutputEncoding>().unwrap(),
            OutputEncoding::Windows1251
        );
        assert_eq!("utf8".parse::<OutputEncoding>().unwrap(), OutputEncoding::Utf8);
        assert!("latin1".parse::<OutputEncoding>().is_err());
    }
}
