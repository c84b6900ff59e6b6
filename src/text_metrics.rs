use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Width measurement used by label placement.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

/// Calibrated per-character widths; no font lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackMetrics;

impl TextMeasure for FallbackMetrics {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        fallback_text_width(text, font_size)
    }
}

/// System-font backed metrics for a CSS font-family stack, falling back to
/// the character table when no face resolves.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    font_family: String,
}

impl FontMetrics {
    pub fn new(font_family: &str) -> Self {
        Self {
            font_family: font_family.to_string(),
        }
    }
}

impl TextMeasure for FontMetrics {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        measure_text_width(text, font_size as f32, &self.font_family)
            .map(f64::from)
            .unwrap_or_else(|| fallback_text_width(text, font_size))
    }
}

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

pub fn fallback_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_width_factor).sum::<f64>() * font_size
}

fn char_width_factor(ch: char) -> f64 {
    match ch {
        ' ' => 0.306,
        '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '-' => 0.321,
        'I' | 'i' | 'j' | 'l' => 0.25,
        'f' | 't' | 'r' => 0.34,
        'M' | 'W' | 'm' | 'w' => 0.86,
        'A'..='Z' => 0.66,
        'a'..='z' => 0.56,
        '0'..='9' => 0.6,
        '%' | '@' | '#' | '&' => 0.946,
        '~' | '<' | '>' => 0.58,
        _ => 0.568,
    }
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.cache.contains_key(&key) {
            let face = self.load_face(font_family);
            self.cache.insert(key.clone(), face);
        }
        self.cache
            .get(&key)
            .and_then(|face| face.as_ref())
            .and_then(|face| face.measure_width(text, font_size))
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" => Family::SansSerif,
                "monospace" => Family::Monospace,
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::load(data.to_vec(), index))
            .flatten()
    }
}

/// Owned font bytes plus a precomputed ASCII advance table. Non-ASCII text
/// re-parses the face on demand.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
}

impl FontFace {
    fn load(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
        })
    }

    fn measure_width(&self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;

        if text.is_ascii() {
            let width = text
                .bytes()
                .filter(|byte| *byte != b'\n')
                .map(|byte| match self.ascii_advances[byte as usize] {
                    0 => fallback,
                    advance => advance as f32 * scale,
                })
                .sum::<f32>();
            return Some(width.max(0.0));
        }

        let face = Face::parse(&self.data, self.index).ok()?;
        let width = text
            .chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .map(|advance| advance as f32 * scale)
                    .unwrap_or(fallback)
            })
            .sum::<f32>();
        Some(width.max(0.0))
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_width_scales_with_font_size() {
        let small = FallbackMetrics.text_width("Bid OK", 12.0);
        let large = FallbackMetrics.text_width("Bid OK", 24.0);
        assert!(small > 0.0);
        assert!((large - small * 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(FallbackMetrics.text_width("", 12.0), 0.0);
        assert_eq!(measure_text_width("", 12.0, "sans-serif"), Some(0.0));
    }

    #[test]
    fn font_metrics_never_return_negative_widths() {
        let metrics = FontMetrics::new("Open Sans, sans-serif");
        assert!(metrics.text_width("Targeting Unmatched", 12.0) > 0.0);
    }
}
