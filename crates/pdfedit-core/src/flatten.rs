//! Draw overlay elements permanently into page content streams
//!
//! The page's existing content is wrapped in `q ... Q` so any graphics state
//! it leaves behind does not leak into the overlay drawing appended after it.

use crate::coords::ViewerGeometry;
use crate::elements::{
    Alignment, ImageOverlay, OverlayElement, Overlays, PageNumber, Position, Signature,
    SignatureContent, Size, TextStyle,
};
use crate::error::PdfServiceError;
use crate::images::embed_image;
use crate::page_tree::{inherited_attribute, media_box, page_dict_mut};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// Approximate advance of one character, in em, used to align page numbers
const ESTIMATED_CHAR_WIDTH_EM: f64 = 0.5;

/// Parse hex color string to RGB components (0-1 range)
fn parse_hex_color(color: &str) -> (f64, f64, f64) {
    let hex = color.trim_start_matches('#');
    if !hex.is_ascii() {
        return (0.0, 0.0, 0.0);
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0) as f64 / 255.0;
    match hex.len() {
        6 | 8 => (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
            (expand(0), expand(1), expand(2))
        }
        _ => (0.0, 0.0, 0.0),
    }
}

/// Escape special characters for a PDF literal string. Characters outside
/// Latin-1 cannot be shown by the standard fonts and become `?`.
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            '\n' | '\r' => out.push(' '),
            _ if c.is_ascii() => out.push(c),
            _ if (c as u32) < 0x100 => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

/// Text matrix for a rotation and skew given in degrees
fn text_matrix(rotation: Option<f64>, skew_x: Option<f64>, skew_y: Option<f64>) -> [f64; 4] {
    let theta = rotation.unwrap_or(0.0).to_radians();
    let (sin, cos) = theta.sin_cos();
    let tan_x = skew_x.unwrap_or(0.0).to_radians().tan();
    let tan_y = skew_y.unwrap_or(0.0).to_radians().tan();

    // skew [1 tan_y tan_x 1] followed by rotation [cos sin -sin cos]
    [
        cos - tan_y * sin,
        sin + tan_y * cos,
        tan_x * cos - sin,
        tan_x * sin + cos,
    ]
}

fn num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}

fn font_dictionary(base_font: &str) -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
    if base_font != "Symbol" && base_font != "ZapfDingbats" {
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    }
    font
}

/// Draw every overlay of a `total_pages`-page document into `doc`
pub(crate) fn flatten_overlays(
    doc: &mut Document,
    overlays: &Overlays,
    total_pages: u32,
    geometry: &ViewerGeometry,
) -> Result<(), PdfServiceError> {
    if overlays.is_empty() {
        return Ok(());
    }

    let mut fonts: HashMap<&'static str, ObjectId> = HashMap::new();
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

    for (page_num, page_id) in pages {
        let elements = overlays.on_page(page_num);
        if elements.is_empty() {
            continue;
        }

        let mut canvas = PageCanvas::new(doc, page_id, &mut fonts);
        for element in &elements {
            match element {
                OverlayElement::Signature(signature) => {
                    canvas.draw_signature(signature, geometry)?
                }
                OverlayElement::Image(image) => canvas.draw_image(image, geometry)?,
                OverlayElement::PageNumber(page_number) => {
                    canvas.draw_page_number(page_number, page_num, total_pages, geometry)
                }
            }
        }
        canvas.finish()?;
        tracing::debug!(page = page_num, elements = elements.len(), "Flattened page");
    }
    Ok(())
}

/// Collects drawing operators and resources for one page
struct PageCanvas<'a> {
    doc: &'a mut Document,
    fonts: &'a mut HashMap<&'static str, ObjectId>,
    page_id: ObjectId,
    origin: (f64, f64),
    width: f64,
    height: f64,
    content: String,
    taken_names: HashSet<Vec<u8>>,
    page_fonts: HashMap<&'static str, String>,
    new_fonts: Vec<(String, ObjectId)>,
    new_xobjects: Vec<(String, ObjectId)>,
}

impl<'a> PageCanvas<'a> {
    fn new(
        doc: &'a mut Document,
        page_id: ObjectId,
        fonts: &'a mut HashMap<&'static str, ObjectId>,
    ) -> Self {
        let [x1, y1, x2, y2] = media_box(doc, page_id);
        let taken_names = resource_names(doc, page_id);

        Self {
            doc,
            fonts,
            page_id,
            origin: (x1.min(x2), y1.min(y2)),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
            content: String::new(),
            taken_names,
            page_fonts: HashMap::new(),
            new_fonts: Vec::new(),
            new_xobjects: Vec::new(),
        }
    }

    fn fresh_name(&mut self, prefix: &str) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("{}{}", prefix, n);
            if self.taken_names.insert(candidate.clone().into_bytes()) {
                return candidate;
            }
            n += 1;
        }
    }

    fn font_resource(&mut self, base_font: &'static str) -> String {
        if let Some(name) = self.page_fonts.get(base_font) {
            return name.clone();
        }
        let font_id = match self.fonts.get(base_font) {
            Some(id) => *id,
            None => {
                let id = self
                    .doc
                    .add_object(Object::Dictionary(font_dictionary(base_font)));
                self.fonts.insert(base_font, id);
                id
            }
        };
        let name = self.fresh_name("PEF");
        self.new_fonts.push((name.clone(), font_id));
        self.page_fonts.insert(base_font, name.clone());
        name
    }

    fn draw_xobject(
        &mut self,
        data_url: &str,
        position: Position,
        size: Size,
        geometry: &ViewerGeometry,
    ) -> Result<(), PdfServiceError> {
        let image_id = embed_image(self.doc, data_url)?;
        let name = self.fresh_name("PEI");
        self.new_xobjects.push((name.clone(), image_id));

        let pdf = geometry.box_to_pdf(position, size, self.width, self.height);
        let _ = writeln!(
            self.content,
            "q {} 0 0 {} {} {} cm /{} Do Q",
            num(pdf.width),
            num(pdf.height),
            num(self.origin.0 + pdf.x),
            num(self.origin.1 + pdf.y),
            name
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_text(
        &mut self,
        text: &str,
        base_font: &'static str,
        font_size: f64,
        color: (f64, f64, f64),
        x: f64,
        y: f64,
        matrix: [f64; 4],
    ) {
        let font = self.font_resource(base_font);
        let (r, g, b) = color;
        let [a, b2, c, d] = matrix;
        let _ = writeln!(
            self.content,
            "BT /{} {} Tf {} {} {} rg {} {} {} {} {} {} Tm ({}) Tj ET",
            font,
            num(font_size),
            num(r),
            num(g),
            num(b),
            num(a),
            num(b2),
            num(c),
            num(d),
            num(self.origin.0 + x),
            num(self.origin.1 + y),
            escape_pdf_string(text)
        );
    }

    fn draw_signature(
        &mut self,
        signature: &Signature,
        geometry: &ViewerGeometry,
    ) -> Result<(), PdfServiceError> {
        match &signature.content {
            SignatureContent::Drawn { data_url } => {
                self.draw_xobject(data_url, signature.position, signature.size, geometry)
            }
            SignatureContent::Text { text, style } => {
                self.draw_styled_text(text, style, signature, geometry);
                Ok(())
            }
        }
    }

    fn draw_styled_text(
        &mut self,
        text: &str,
        style: &TextStyle,
        signature: &Signature,
        geometry: &ViewerGeometry,
    ) {
        let viewer_size = if style.font_size > 0.0 {
            style.font_size
        } else {
            geometry.default_signature_font_size
        };
        let font_size = geometry.font_size_to_pdf(viewer_size, self.width);
        let (x, y) = geometry.text_origin(signature.position, self.width, self.height);
        self.draw_text(
            text,
            style.pdf_font_name(),
            font_size,
            parse_hex_color(&style.color),
            x,
            y,
            text_matrix(style.rotation, style.skew_x, style.skew_y),
        );
    }

    fn draw_image(
        &mut self,
        image: &ImageOverlay,
        geometry: &ViewerGeometry,
    ) -> Result<(), PdfServiceError> {
        self.draw_xobject(&image.data_url, image.position, image.size, geometry)
    }

    fn draw_page_number(
        &mut self,
        page_number: &PageNumber,
        page: u32,
        total_pages: u32,
        geometry: &ViewerGeometry,
    ) {
        let label = page_number.label(page, total_pages);
        let viewer_size = page_number
            .font_size
            .filter(|size| *size > 0.0)
            .unwrap_or(geometry.default_page_number_font_size);
        let font_size = geometry.font_size_to_pdf(viewer_size, self.width);
        let (x, y) = geometry.text_origin(page_number.position, self.width, self.height);

        let text_width = label.chars().count() as f64 * font_size * ESTIMATED_CHAR_WIDTH_EM;
        let x = match page_number.alignment {
            Some(Alignment::Center) => x - text_width / 2.0,
            Some(Alignment::Right) => x - text_width,
            Some(Alignment::Left) | None => x,
        };

        self.draw_text(
            &label,
            "Helvetica",
            font_size,
            (0.0, 0.0, 0.0),
            x,
            y,
            text_matrix(page_number.rotation, page_number.skew_x, page_number.skew_y),
        );
    }

    /// Register new resources on the page and append the drawing
    fn finish(mut self) -> Result<(), PdfServiceError> {
        if self.content.is_empty() {
            return Ok(());
        }

        let mut resources = resolved_resources(self.doc, self.page_id);
        for (category, entries) in [
            (b"Font".as_slice(), &self.new_fonts),
            (b"XObject".as_slice(), &self.new_xobjects),
        ] {
            if entries.is_empty() {
                continue;
            }
            let mut dict = resolved_subdict(self.doc, &resources, category);
            for (name, id) in entries {
                dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
            }
            resources.set(category.to_vec(), Object::Dictionary(dict));
        }

        let contents = existing_contents(self.doc, self.page_id);
        let save_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let overlay = format!("Q\n{}", self.content).into_bytes();
        let overlay_id = self.doc.add_object(Stream::new(Dictionary::new(), overlay));

        let mut all_contents = vec![Object::Reference(save_id)];
        all_contents.extend(contents);
        all_contents.push(Object::Reference(overlay_id));

        // Resources are copied onto the page so shared dictionaries stay untouched
        let page = page_dict_mut(self.doc, self.page_id)?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(all_contents));
        Ok(())
    }
}

/// Names already used for fonts and XObjects on the page
fn resource_names(doc: &Document, page_id: ObjectId) -> HashSet<Vec<u8>> {
    let resources = resolved_resources(doc, page_id);
    let mut names = HashSet::new();
    for category in [b"Font".as_slice(), b"XObject".as_slice()] {
        for (name, _) in resolved_subdict(doc, &resources, category).iter() {
            names.insert(name.clone());
        }
    }
    names
}

/// The page's effective Resources dictionary, dereferenced and cloned
fn resolved_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    match inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        Some(Object::Reference(id)) => doc
            .get_object(id)
            .and_then(|obj| obj.as_dict())
            .map(|dict| dict.clone())
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    }
}

fn resolved_subdict(doc: &Document, resources: &Dictionary, category: &[u8]) -> Dictionary {
    match resources.get(category) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(|obj| obj.as_dict())
            .map(|dict| dict.clone())
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    }
}

/// References to the page's current content streams, in order
fn existing_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let contents = doc
        .get_object(page_id)
        .and_then(|obj| obj.as_dict())
        .and_then(|page| page.get(b"Contents"))
        .map(|contents| contents.clone());

    match contents {
        Ok(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Ok(Object::Array(items)) => items,
        _ => Vec::new(),
    }
}
