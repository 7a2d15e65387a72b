use std::collections::HashMap;

use ab_glyph::FontArc;

use crate::resources::ResourceError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FontKey {
    family: String,
    bold: bool,
    italic: bool,
}

impl FontKey {
    fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: normalize_family(family),
            bold,
            italic,
        }
    }
}

/// Lowercase, unquoted family name.
pub fn normalize_family(family: &str) -> String {
    family
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

/// Face picked for a request. The synthetic flags are set when the request
/// asked for a style the face does not carry.
#[derive(Clone, Debug)]
pub struct ResolvedFont {
    pub face: FontArc,
    pub synthetic_bold: bool,
    pub synthetic_italic: bool,
}

/// Loaded font faces keyed by family and style, plus a last-resort face.
#[derive(Clone, Debug, Default)]
pub struct FontBook {
    faces: HashMap<FontKey, FontArc>,
    fallback: Option<FontArc>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TrueType/OpenType face from raw bytes.
    pub fn parse(bytes: Vec<u8>) -> Result<FontArc, ResourceError> {
        FontArc::try_from_vec(bytes).map_err(|err| ResourceError::Decode(err.to_string()))
    }

    pub fn insert(&mut self, family: &str, bold: bool, italic: bool, face: FontArc) {
        self.faces.insert(FontKey::new(family, bold, italic), face);
    }

    pub fn set_fallback(&mut self, face: FontArc) {
        self.fallback = Some(face);
    }

    pub fn with_fallback(mut self, face: FontArc) -> Self {
        self.set_fallback(face);
        self
    }

    pub fn has_family(&self, family: &str) -> bool {
        let family = normalize_family(family);
        self.faces.keys().any(|k| k.family == family)
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() && self.fallback.is_none()
    }

    /// Resolve a CSS family list (`"Open Sans", Arial`). Each family is tried
    /// for the exact style, then its regular face; the fallback face comes
    /// last.
    pub fn resolve(&self, families: &str, bold: bool, italic: bool) -> Option<ResolvedFont> {
        for family in families.split(',') {
            if let Some(face) = self.faces.get(&FontKey::new(family, bold, italic)) {
                return Some(ResolvedFont {
                    face: face.clone(),
                    synthetic_bold: false,
                    synthetic_italic: false,
                });
            }
            let partial = [(bold, false), (false, italic), (false, false)];
            for (b, i) in partial {
                if let Some(face) = self.faces.get(&FontKey::new(family, b, i)) {
                    return Some(ResolvedFont {
                        face: face.clone(),
                        synthetic_bold: bold && !b,
                        synthetic_italic: italic && !i,
                    });
                }
            }
        }
        self.fallback.clone().map(|face| ResolvedFont {
            face,
            synthetic_bold: bold,
            synthetic_italic: italic,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_order() {
        let face = test_font::dejavu();
        let mut book = FontBook::new();
        book.insert("Arial", false, false, face.clone());
        book.insert("Arial", true, false, face.clone());

        let exact = book.resolve("arial", true, false).unwrap();
        assert!(!exact.synthetic_bold);

        let partial = book.resolve("\"Arial\"", true, true).unwrap();
        assert!(!partial.synthetic_bold);
        assert!(partial.synthetic_italic);

        let regular = book.resolve("Arial", false, true).unwrap();
        assert!(regular.synthetic_italic);

        assert!(book.resolve("Comic Neue", false, false).is_none());
    }

    #[test]
    fn family_lists_and_fallback() {
        let face = test_font::dejavu();
        let mut book = FontBook::new();
        book.insert("DejaVu Sans", false, false, face.clone());
        assert!(book.resolve("Missing, 'DejaVu Sans'", false, false).is_some());

        let book = FontBook::new().with_fallback(face);
        let resolved = book.resolve("Missing", true, false).unwrap();
        assert!(resolved.synthetic_bold);
        assert!(!book.is_empty());
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(matches!(
            FontBook::parse(b"not a font".to_vec()),
            Err(ResourceError::Decode(_))
        ));
    }
}
