//! Fonts for exported annotations
//!
//! Two kinds are supported:
//!
//! - A TrueType/OpenType file (variable fonts included, default instance),
//!   embedded as a Type0 font with Identity-H encoding so any glyph in the
//!   face can be written. Widths come from the face's `hmtx` table.
//! - The standard Helvetica font, which every PDF reader ships. Nothing is
//!   embedded and text is limited to WinAnsi (Latin-1) characters.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{name_id, Face};

use super::error::{ExportError, Result};

/// Raw font material as fetched, before it is parsed
#[derive(Debug, Clone)]
pub enum FontData {
    /// Standard 14 Helvetica, not embedded
    Helvetica,
    /// TrueType / OpenType font file bytes
    OpenType(Vec<u8>),
}

/// Where export fonts come from.
///
/// Fetched once per export; a failing fetch fails the export.
#[async_trait]
pub trait FontSource: Send + Sync {
    async fn fetch(&self) -> Result<FontData>;

    /// Human-readable origin, for logs
    fn describe(&self) -> String;
}

/// Reads a font file from disk on every fetch
#[derive(Debug, Clone)]
pub struct FileFontSource {
    path: PathBuf,
}

impl FileFontSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FontSource for FileFontSource {
    async fn fetch(&self) -> Result<FontData> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| ExportError::FontFetch(format!("{}: {}", self.path.display(), e)))?;
        tracing::debug!(path = %self.path.display(), size = bytes.len(), "Fetched export font");
        Ok(FontData::OpenType(bytes))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// The built-in Helvetica, used when no font file is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFontSource;

#[async_trait]
impl FontSource for StandardFontSource {
    async fn fetch(&self) -> Result<FontData> {
        Ok(FontData::Helvetica)
    }

    fn describe(&self) -> String {
        "standard:Helvetica".to_string()
    }
}

/// Helvetica advance widths (1/1000 em) for WinAnsi codes 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// Width used for Latin-1 codes outside the table
const HELVETICA_FALLBACK_WIDTH: u16 = 556;

fn winansi_byte(ch: char) -> u8 {
    match ch as u32 {
        0x20..=0x7e | 0xa0..=0xff => ch as u32 as u8,
        _ => b'?',
    }
}

fn helvetica_width(byte: u8) -> u16 {
    match byte {
        32..=126 => HELVETICA_WIDTHS[(byte - 32) as usize],
        _ => HELVETICA_FALLBACK_WIDTH,
    }
}

/// Metrics and glyph usage of a parsed OpenType face
#[derive(Debug)]
pub struct EmbeddedFace {
    data: Vec<u8>,
    base_name: String,
    units_per_em: f32,
    ascent: i16,
    descent: i16,
    cap_height: i16,
    bbox: [i16; 4],
    /// Advance of glyph 0, written as the CIDFont's default width
    notdef_advance: u16,
    /// Glyph id → (source text, advance in font units)
    used: BTreeMap<u16, (String, u16)>,
}

impl EmbeddedFace {
    fn parse(data: Vec<u8>) -> Result<Self> {
        let (base_name, units_per_em, ascent, descent, cap_height, bbox, notdef_advance) = {
            let face = Face::parse(&data, 0).map_err(|e| ExportError::Font(e.to_string()))?;
            let name = face
                .names()
                .into_iter()
                .filter(|n| n.name_id == name_id::POST_SCRIPT_NAME)
                .find_map(|n| n.to_string())
                .unwrap_or_default();
            let b = face.global_bounding_box();
            (
                sanitize_font_name(&name),
                face.units_per_em() as f32,
                face.ascender(),
                face.descender(),
                face.capital_height().unwrap_or(face.ascender()),
                [b.x_min, b.y_min, b.x_max, b.y_max],
                face.glyph_hor_advance(ttf_parser::GlyphId(0)).unwrap_or(0),
            )
        };
        if units_per_em <= 0.0 {
            return Err(ExportError::Font("units per em is zero".to_string()));
        }
        Ok(Self {
            data,
            base_name,
            units_per_em,
            ascent,
            descent,
            cap_height,
            bbox,
            notdef_advance,
            used: BTreeMap::new(),
        })
    }

    fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, 0).map_err(|e| ExportError::Font(e.to_string()))
    }

    /// Glyph id and advance for every char; unmapped chars use glyph 0
    fn glyphs(&self, text: &str) -> Result<Vec<(char, u16, u16)>> {
        let face = self.face()?;
        Ok(text
            .chars()
            .map(|ch| {
                let gid = face.glyph_index(ch).unwrap_or(ttf_parser::GlyphId(0));
                let advance = face.glyph_hor_advance(gid).unwrap_or(0);
                (ch, gid.0, advance)
            })
            .collect())
    }

    fn to_thousandths(&self, units: f32) -> f32 {
        units * 1000.0 / self.units_per_em
    }
}

/// A font ready to draw with
#[derive(Debug)]
pub enum PdfFont {
    Helvetica,
    Embedded(EmbeddedFace),
}

impl PdfFont {
    pub fn load(data: FontData) -> Result<Self> {
        match data {
            FontData::Helvetica => Ok(PdfFont::Helvetica),
            FontData::OpenType(bytes) => Ok(PdfFont::Embedded(EmbeddedFace::parse(bytes)?)),
        }
    }

    /// Advance width of `text` in points at `size`
    pub fn width_of_text_at_size(&self, text: &str, size: f32) -> Result<f32> {
        let thousandths: f32 = match self {
            PdfFont::Helvetica => text
                .chars()
                .map(|ch| helvetica_width(winansi_byte(ch)) as f32)
                .sum(),
            PdfFont::Embedded(face) => face
                .glyphs(text)?
                .iter()
                .map(|&(_, _, advance)| face.to_thousandths(advance as f32))
                .sum(),
        };
        Ok(thousandths * size / 1000.0)
    }

    /// Encode `text` as a `Tj` operand, recording the glyphs it uses
    pub fn encode(&mut self, text: &str) -> Result<Object> {
        match self {
            PdfFont::Helvetica => {
                let bytes = text.chars().map(winansi_byte).collect();
                Ok(Object::String(bytes, StringFormat::Literal))
            }
            PdfFont::Embedded(face) => {
                let glyphs = face.glyphs(text)?;
                let mut bytes = Vec::with_capacity(glyphs.len() * 2);
                for (ch, gid, advance) in glyphs {
                    bytes.extend_from_slice(&gid.to_be_bytes());
                    if gid != 0 {
                        face.used
                            .entry(gid)
                            .or_insert_with(|| (ch.to_string(), advance));
                    }
                }
                Ok(Object::String(bytes, StringFormat::Hexadecimal))
            }
        }
    }

    /// Write the font objects into `doc`, returning the font dictionary id
    pub fn embed(&self, doc: &mut Document) -> Result<ObjectId> {
        match self {
            PdfFont::Helvetica => Ok(doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })),
            PdfFont::Embedded(face) => embed_type0(doc, face),
        }
    }
}

fn embed_type0(doc: &mut Document, face: &EmbeddedFace) -> Result<ObjectId> {
    let base_name = Object::Name(face.base_name.clone().into_bytes());

    let font_file = Stream::new(
        dictionary! { "Length1" => face.data.len() as i64 },
        face.data.clone(),
    );
    let font_file_id = doc.add_object(font_file);

    let [x_min, y_min, x_max, y_max] = face.bbox;
    let scaled = |v: i16| face.to_thousandths(v as f32).round() as i64;
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => base_name.clone(),
        "Flags" => 32,
        "FontBBox" => vec![
            scaled(x_min).into(),
            scaled(y_min).into(),
            scaled(x_max).into(),
            scaled(y_max).into(),
        ],
        "ItalicAngle" => 0,
        "Ascent" => scaled(face.ascent),
        "Descent" => scaled(face.descent),
        "CapHeight" => scaled(face.cap_height),
        "StemV" => 80,
        "FontFile2" => font_file_id,
    });

    let mut widths: Vec<Object> = Vec::with_capacity(face.used.len() * 2);
    for (gid, (_, advance)) in &face.used {
        widths.push((*gid as i64).into());
        widths.push(Object::Array(vec![face
            .to_thousandths(*advance as f32)
            .round()
            .into()]));
    }

    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => base_name.clone(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        // Glyph 0 is never listed in W; unmapped chars fall back to this
        "DW" => face.to_thousandths(face.notdef_advance as f32).round() as i64,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let glyph_map: BTreeMap<u16, String> = face
        .used
        .iter()
        .map(|(gid, (text, _))| (*gid, text.clone()))
        .collect();
    let to_unicode_id = doc.add_object(Stream::new(
        Dictionary::new(),
        to_unicode_cmap(&glyph_map).into_bytes(),
    ));

    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => base_name,
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => to_unicode_id,
    }))
}

fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "AnnotaEmbedded".to_string()
    } else {
        cleaned
    }
}

/// ToUnicode CMap so that exported text stays searchable and copyable
fn to_unicode_cmap(glyph_map: &BTreeMap<u16, String>) -> String {
    let entries: Vec<(&u16, &String)> = glyph_map.iter().collect();

    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n");
    out.push_str("12 dict begin\n");
    out.push_str("begincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n");
    out.push_str("/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    // bfchar blocks hold at most 100 entries
    for chunk in entries.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, text) in chunk {
            let mut utf16 = String::new();
            for unit in text.encode_utf16() {
                utf16.push_str(&format!("{:04X}", unit));
            }
            out.push_str(&format!("<{:04X}> <{}>\n", gid, utf16));
        }
        out.push_str("endbfchar\n");
    }

    out.push_str("endcmap\n");
    out.push_str("CMapName currentdict /CMap defineresource pop\n");
    out.push_str("end\nend\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::TEST_FONT;

    fn test_face() -> PdfFont {
        PdfFont::load(FontData::OpenType(TEST_FONT.to_vec())).unwrap()
    }

    fn hex_bytes(obj: Object) -> Vec<u8> {
        match obj {
            Object::String(bytes, StringFormat::Hexadecimal) => bytes,
            other => panic!("unexpected operand: {:?}", other),
        }
    }

    #[test]
    fn test_embedded_widths_from_hmtx() {
        let font = test_face();
        // H e l l o = 700 + 550 + 250 + 250 + 600
        let width = font.width_of_text_at_size("Hello", 10.0).unwrap();
        assert!((width - 23.5).abs() < 1e-4);
        // Unmapped z falls back to .notdef
        let width = font.width_of_text_at_size("Hz", 10.0).unwrap();
        assert!((width - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_embedded_encoding_uses_glyph_ids() {
        let mut font = test_face();
        let bytes = hex_bytes(font.encode("Héllo").unwrap());
        assert_eq!(bytes, vec![0, 1, 0, 5, 0, 3, 0, 3, 0, 4]);

        let bytes = hex_bytes(font.encode("z").unwrap());
        assert_eq!(bytes, vec![0, 0]);

        let PdfFont::Embedded(face) = &font else {
            panic!("expected an embedded face");
        };
        let used: Vec<u16> = face.used.keys().copied().collect();
        assert_eq!(used, vec![1, 3, 4, 5]);
        assert_eq!(face.used[&5].0, "é");
    }

    #[test]
    fn test_type0_embedding_objects() {
        let mut font = test_face();
        font.encode("Hz").unwrap();
        let mut doc = Document::with_version("1.7");
        let id = font.embed(&mut doc).unwrap();

        let type0 = doc.get_dictionary(id).unwrap();
        assert_eq!(type0.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(type0.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");
        assert_eq!(
            type0.get(b"BaseFont").unwrap().as_name().unwrap(),
            b"AnnotaTest-Regular"
        );

        let descendants = type0.get(b"DescendantFonts").unwrap().as_array().unwrap();
        let cid = doc
            .get_dictionary(descendants[0].as_reference().unwrap())
            .unwrap();
        assert_eq!(cid.get(b"Subtype").unwrap().as_name().unwrap(), b"CIDFontType2");
        assert_eq!(cid.get(b"DW").unwrap().as_i64().unwrap(), 500);

        // Only glyph 1 (H) is listed; glyph 0 relies on DW
        let widths = cid.get(b"W").unwrap().as_array().unwrap();
        assert_eq!(widths.len(), 2);
        assert_eq!(widths[0].as_i64().unwrap(), 1);
        assert_eq!(widths[1].as_array().unwrap()[0].as_float().unwrap(), 700.0);

        let descriptor = doc
            .get_dictionary(cid.get(b"FontDescriptor").unwrap().as_reference().unwrap())
            .unwrap();
        let file = doc
            .get_object(descriptor.get(b"FontFile2").unwrap().as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        assert_eq!(file.content, TEST_FONT);
        assert_eq!(descriptor.get(b"CapHeight").unwrap().as_i64().unwrap(), 700);

        let to_unicode = doc
            .get_object(type0.get(b"ToUnicode").unwrap().as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        let cmap = String::from_utf8(to_unicode.content.clone()).unwrap();
        assert!(cmap.contains("1 beginbfchar"));
        assert!(cmap.contains("<0001> <0048>"));
    }

    #[test]
    fn test_helvetica_widths() {
        let font = PdfFont::Helvetica;
        // "Hi" = 722 + 222
        let width = font.width_of_text_at_size("Hi", 10.0).unwrap();
        assert!((width - 9.44).abs() < 1e-4);
        assert_eq!(font.width_of_text_at_size("", 12.0).unwrap(), 0.0);
    }

    #[test]
    fn test_helvetica_encoding_replaces_non_latin1() {
        let mut font = PdfFont::Helvetica;
        let encoded = font.encode("é→a").unwrap();
        match encoded {
            Object::String(bytes, StringFormat::Literal) => assert_eq!(bytes, vec![0xe9, b'?', b'a']),
            other => panic!("unexpected operand: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_font_bytes_rejected() {
        let result = PdfFont::load(FontData::OpenType(b"definitely not a font".to_vec()));
        assert!(matches!(result, Err(ExportError::Font(_))));
    }

    #[test]
    fn test_helvetica_embed_adds_font_dictionary() {
        let mut doc = Document::with_version("1.7");
        let id = PdfFont::Helvetica.embed(&mut doc).unwrap();
        let dict = doc.get_dictionary(id).unwrap();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
    }

    #[test]
    fn test_to_unicode_cmap_entries() {
        let mut map = BTreeMap::new();
        map.insert(0x24u16, "A".to_string());
        map.insert(0x25u16, "\u{1F600}".to_string());
        let cmap = to_unicode_cmap(&map);
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<0025> <D83DDE00>"));
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(sanitize_font_name("Roboto-Regular"), "Roboto-Regular");
        assert_eq!(sanitize_font_name("My Font (Bold)"), "MyFontBold");
        assert_eq!(sanitize_font_name(""), "AnnotaEmbedded");
    }

    #[tokio::test]
    async fn test_missing_font_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileFontSource::new(dir.path().join("missing.ttf"));
        let result = source.fetch().await;
        assert!(matches!(result, Err(ExportError::FontFetch(_))));
    }

    #[tokio::test]
    async fn test_file_font_source_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font.ttf");
        std::fs::write(&path, b"bytes").unwrap();
        let source = FileFontSource::new(&path);
        match source.fetch().await.unwrap() {
            FontData::OpenType(bytes) => assert_eq!(bytes, b"bytes"),
            FontData::Helvetica => panic!("expected file bytes"),
        }
    }
}
