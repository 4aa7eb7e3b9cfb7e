//! Structured page access backed by `lopdf`.
//!
//! Walks each page's content stream with a text matrix and a small graphics
//! state, producing [`RawPage`] values: text spans grouped into lines and
//! blocks, plus the `re` rectangle operators. Coordinates are converted from
//! PDF bottom-left space to the top-left origin the extractor works in.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::source::{DocumentSource, RawBlock, RawLine, RawPage, RawSpan};

/// Approximate ascender/descender fractions of the font size, used to turn a
/// baseline position into a glyph bounding box.
const ASCENT: f64 = 0.8;
const DESCENT: f64 = 0.2;

/// Fallback average glyph width as a fraction of the font size.
const AVG_CHAR_WIDTH: f64 = 0.5;

/// Kerning adjustment (in 1/1000 text-space units) treated as a word space.
const TJ_SPACE_THRESHOLD: f64 = 200.0;

/// Concrete [`DocumentSource`] backed by `lopdf::Document`.
pub struct PdfSource {
    doc: LopdfDocument,
}

impl PdfSource {
    /// Load from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self { doc })
    }

    /// Load from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self { doc })
    }

    /// Load from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Wrap an already-loaded `lopdf` document.
    pub fn from_document(doc: LopdfDocument) -> Self {
        Self { doc }
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        let pages = self.doc.get_pages();
        let page_num = index as u32 + 1;
        pages
            .get(&page_num)
            .copied()
            .ok_or(Error::PageOutOfRange(index, pages.len()))
    }

    /// Resolve a page attribute that may be inherited from the page tree.
    fn inherited_attr(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut current = page_id;
        for _ in 0..32 {
            let dict = self.doc.get_dictionary(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return self.deref(value).cloned();
            }
            match dict.get(b"Parent").ok().and_then(|p| p.as_reference().ok()) {
                Some(parent) => current = parent,
                None => return None,
            }
        }
        None
    }

    fn deref<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(r) => self.doc.get_object(*r).ok(),
            other => Some(other),
        }
    }

    /// Page media box as `(width, height)` in points. Letter when absent.
    fn media_box(&self, page_id: ObjectId) -> (f64, f64) {
        if let Some(Object::Array(arr)) = self.inherited_attr(page_id, b"MediaBox") {
            let nums: Vec<f64> = arr.iter().filter_map(get_number).collect();
            if nums.len() == 4 {
                return ((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs());
            }
        }
        (612.0, 792.0)
    }

    /// Map font resource name → base font name for a page.
    fn font_names(&self, page_id: ObjectId) -> HashMap<Vec<u8>, String> {
        let mut out = HashMap::new();
        if let Ok(fonts) = self.doc.get_page_fonts(page_id) {
            for (name, font) in fonts {
                let base = font
                    .get(b"BaseFont")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| String::from_utf8_lossy(n).to_string())
                    .unwrap_or_else(|| "Unknown".to_string());
                out.insert(name, base);
            }
        }
        out
    }

    /// Resolve an ExtGState fill alpha (`/ca`) for a `gs` operand, 0-255.
    fn ext_g_state_alpha(&self, page_id: ObjectId, gs_name: &[u8]) -> Option<u32> {
        let resources = self.inherited_attr(page_id, b"Resources")?;
        let resources = resources.as_dict().ok()?;
        let states = self.deref(resources.get(b"ExtGState").ok()?)?.as_dict().ok()?;
        let state = self.deref(states.get(gs_name).ok()?)?.as_dict().ok()?;
        let ca = get_number(state.get(b"ca").ok()?)?;
        Some((ca.clamp(0.0, 1.0) * 255.0).round() as u32)
    }

    /// Raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let contents = match page_dict.get(b"Contents") {
            Ok(obj) => obj,
            // An empty page is legal
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r) {
                Ok(Object::Stream(s)) => s
                    .decompressed_content()
                    .map_err(|e| Error::PdfParse(e.to_string())),
                _ => Err(Error::PdfParse("Invalid content stream".to_string())),
            },
            Object::Stream(s) => s
                .decompressed_content()
                .map_err(|e| Error::PdfParse(e.to_string())),
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Object::Reference(r) = obj {
                        if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                            if let Ok(data) = s.decompressed_content() {
                                content.extend_from_slice(&data);
                                content.push(b' ');
                            }
                        }
                    }
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn decode_span_text(&self, page_id: ObjectId, font_name: &[u8], bytes: &[u8]) -> String {
        if let Ok(fonts) = self.doc.get_page_fonts(page_id) {
            if let Some(font) = fonts.get(font_name) {
                if let Ok(enc) = font.get_font_encoding(&self.doc) {
                    if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                        return text;
                    }
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn parse_page(&self, page_id: ObjectId) -> Result<RawPage> {
        let (width, height) = self.media_box(page_id);
        let fonts = self.font_names(page_id);
        let content = self.page_content(page_id)?;
        let content =
            lopdf::content::Content::decode(&content).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut page = RawPage::new(width, height);

        let mut gs = GraphicsState::default();
        let mut gs_stack: Vec<GraphicsState> = Vec::new();
        let mut tm = TextMatrix::default();
        let mut in_text = false;

        let mut block = RawBlock::default();
        let mut line = RawLine::default();
        let mut line_y: Option<f64> = None;

        for op in &content.operations {
            match op.operator.as_str() {
                "q" => gs_stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = gs_stack.pop() {
                        gs = saved;
                    }
                }
                "rg" if op.operands.len() >= 3 => {
                    gs.color = pack_rgb(
                        get_number(&op.operands[0]).unwrap_or(0.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                    );
                }
                "g" if !op.operands.is_empty() => {
                    let v = get_number(&op.operands[0]).unwrap_or(0.0);
                    gs.color = pack_rgb(v, v, v);
                }
                "k" if op.operands.len() >= 4 => {
                    let c = get_number(&op.operands[0]).unwrap_or(0.0);
                    let m = get_number(&op.operands[1]).unwrap_or(0.0);
                    let y = get_number(&op.operands[2]).unwrap_or(0.0);
                    let k = get_number(&op.operands[3]).unwrap_or(0.0);
                    gs.color = pack_rgb((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k));
                }
                "gs" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        if let Some(alpha) = self.ext_g_state_alpha(page_id, name) {
                            gs.alpha = alpha;
                        }
                    }
                }
                "re" if op.operands.len() >= 4 => {
                    let x = get_number(&op.operands[0]).unwrap_or(0.0);
                    let y = get_number(&op.operands[1]).unwrap_or(0.0);
                    let w = get_number(&op.operands[2]).unwrap_or(0.0);
                    let h = get_number(&op.operands[3]).unwrap_or(0.0);
                    // Flip to top-left origin
                    page.rects.push([x, height - y - h, x + w, height - y]);
                }
                "BT" => {
                    in_text = true;
                    tm = TextMatrix::default();
                }
                "ET" => {
                    in_text = false;
                    flush_line(&mut block, &mut line, &mut line_y);
                    if !block.lines.is_empty() {
                        page.blocks.push(std::mem::take(&mut block));
                    }
                }
                "Tf" if op.operands.len() >= 2 => {
                    if let Object::Name(font_name) = &op.operands[0] {
                        gs.font_resource = font_name.clone();
                        gs.font = fonts
                            .get(font_name.as_slice())
                            .cloned()
                            .unwrap_or_else(|| String::from_utf8_lossy(font_name).to_string());
                    }
                    gs.font_size = get_number(&op.operands[1]).unwrap_or(12.0);
                }
                "Td" | "TD" if op.operands.len() >= 2 => {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    tm.translate(tx, ty);
                }
                "Tm" if op.operands.len() >= 6 => {
                    tm.set(
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    );
                }
                "T*" => tm.next_line(),
                "Tj" | "TJ" if in_text => {
                    let text = match op.operator.as_str() {
                        "TJ" => self.combine_tj(page_id, &gs.font_resource, op.operands.first()),
                        _ => match op.operands.first() {
                            Some(Object::String(bytes, _)) => {
                                self.decode_span_text(page_id, &gs.font_resource, bytes)
                            }
                            _ => String::new(),
                        },
                    };
                    push_span(&mut block, &mut line, &mut line_y, &tm, &gs, height, text);
                }
                "'" | "\"" => {
                    tm.next_line();
                    if in_text {
                        let text_idx = if op.operator == "\"" { 2 } else { 0 };
                        if let Some(Object::String(bytes, _)) = op.operands.get(text_idx) {
                            let text = self.decode_span_text(page_id, &gs.font_resource, bytes);
                            push_span(&mut block, &mut line, &mut line_y, &tm, &gs, height, text);
                        }
                    }
                }
                _ => {}
            }
        }

        // Content streams are not required to close their last text block
        flush_line(&mut block, &mut line, &mut line_y);
        if !block.lines.is_empty() {
            page.blocks.push(block);
        }

        Ok(page)
    }

    /// Combine a TJ array into one string, turning large kerning adjustments
    /// into word spaces.
    fn combine_tj(&self, page_id: ObjectId, font_resource: &[u8], operand: Option<&Object>) -> String {
        let Some(Object::Array(arr)) = operand else {
            return String::new();
        };

        let mut combined = String::new();
        for item in arr {
            match item {
                Object::String(bytes, _) => {
                    combined.push_str(&self.decode_span_text(page_id, font_resource, bytes));
                }
                Object::Integer(n) => {
                    if (-(*n as f64)) > TJ_SPACE_THRESHOLD && !combined.is_empty() && !combined.ends_with(' ') {
                        combined.push(' ');
                    }
                }
                Object::Real(n) => {
                    if f64::from(-*n) > TJ_SPACE_THRESHOLD && !combined.is_empty() && !combined.ends_with(' ') {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }
        combined
    }
}

impl DocumentSource for PdfSource {
    fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn page(&self, index: usize) -> Result<RawPage> {
        let page_id = self.page_id(index)?;
        self.parse_page(page_id)
    }
}

/// Graphics state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct GraphicsState {
    font: String,
    font_resource: Vec<u8>,
    font_size: f64,
    color: u32,
    alpha: u32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            font: String::new(),
            font_resource: Vec::new(),
            font_size: 12.0,
            color: 0,
            alpha: 255,
        }
    }
}

/// Text matrix with a tracked baseline, as set by `Tm`/`Td`/`T*`.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self) {
        // Default leading; TL is rare in the documents this targets
        self.f -= 12.0 * self.d;
    }

    fn position(&self) -> (f64, f64) {
        (self.e, self.f)
    }

    fn scale(&self) -> f64 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

fn flush_line(block: &mut RawBlock, line: &mut RawLine, line_y: &mut Option<f64>) {
    if !line.spans.is_empty() {
        block.lines.push(std::mem::take(line));
    }
    *line_y = None;
}

fn push_span(
    block: &mut RawBlock,
    line: &mut RawLine,
    line_y: &mut Option<f64>,
    tm: &TextMatrix,
    gs: &GraphicsState,
    page_height: f64,
    text: String,
) {
    if text.trim().is_empty() {
        return;
    }

    let (x, baseline) = tm.position();
    let size = gs.font_size * tm.scale();
    let glyph_width = size * AVG_CHAR_WIDTH * text.chars().count() as f64;

    // Baseline in PDF space → glyph box in top-left space
    let y1 = page_height - (baseline + size * ASCENT);
    let y2 = page_height - (baseline - size * DESCENT);

    let span = RawSpan {
        text,
        size,
        font: gs.font.clone(),
        color: gs.color,
        alpha: gs.alpha,
        bbox: vec![x, y1, x + glyph_width, y2],
    };

    // A baseline change starts a new line
    if let Some(prev) = *line_y {
        if (prev - baseline).abs() > 0.5 {
            flush_line(block, line, line_y);
        }
    }
    *line_y = Some(baseline);
    line.spans.push(span);
}

/// Simple text decoding fallback when no encoding is available.
fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Latin-1 fallback
    bytes.iter().map(|&b| b as char).collect()
}

fn get_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn pack_rgb(r: f64, g: f64, b: f64) -> u32 {
    let to_byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    (to_byte(r) << 16) | (to_byte(g) << 8) | to_byte(b)
}
