//! Overlay elements placed over PDF pages
//!
//! Signatures, images and page numbers, each anchored to a 1-based page
//! index. Page `0` is reserved for page numbers that repeat on every page.

use crate::error::EditorError;
use serde::{Deserialize, Serialize};

/// Page index meaning "every page" (page numbers only)
pub const ALL_PAGES: u32 = 0;

/// Top-left anchor in viewer pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// CSS family or PDF font name. Mapped to a standard-14 font on export.
    pub font_family: String,
    pub font_size: f64,
    pub color: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    /// Degrees, counter-clockwise
    #[serde(default)]
    pub rotation: Option<f64>,
    #[serde(default)]
    pub skew_x: Option<f64>,
    #[serde(default)]
    pub skew_y: Option<f64>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 32.0,
            color: "#000000".to_string(),
            bold: false,
            italic: false,
            rotation: None,
            skew_x: None,
            skew_y: None,
        }
    }
}

impl TextStyle {
    /// Standard-14 font used to draw this style. Names that already carry a
    /// weight or slant ("Arial-BoldMT") keep it; otherwise the bold/italic
    /// flags pick the variant.
    pub fn pdf_font_name(&self) -> &'static str {
        let lower = self.font_family.to_lowercase();
        let named_bold = lower.contains("bold");
        let named_italic = lower.contains("italic") || lower.contains("oblique");
        let bold = self.bold || named_bold;
        let italic = self.italic || named_italic;

        match font_family_base(&lower) {
            BaseFont::Times => match (bold, italic) {
                (true, true) => "Times-BoldItalic",
                (true, false) => "Times-Bold",
                (false, true) => "Times-Italic",
                (false, false) => "Times-Roman",
            },
            BaseFont::Helvetica => match (bold, italic) {
                (true, true) => "Helvetica-BoldOblique",
                (true, false) => "Helvetica-Bold",
                (false, true) => "Helvetica-Oblique",
                (false, false) => "Helvetica",
            },
            BaseFont::Courier => match (bold, italic) {
                (true, true) => "Courier-BoldOblique",
                (true, false) => "Courier-Bold",
                (false, true) => "Courier-Oblique",
                (false, false) => "Courier",
            },
            BaseFont::Symbol => "Symbol",
            BaseFont::ZapfDingbats => "ZapfDingbats",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseFont {
    Times,
    Helvetica,
    Courier,
    Symbol,
    ZapfDingbats,
}

/// Map a lowercased family name to its standard-14 family
fn font_family_base(lower: &str) -> BaseFont {
    // CSS generic families
    match lower {
        "serif" => return BaseFont::Times,
        "sans-serif" | "cursive" | "fantasy" => return BaseFont::Helvetica,
        "monospace" => return BaseFont::Courier,
        _ => {}
    }

    if lower.contains("times") || lower.contains("georgia") || lower.contains("garamond") {
        return BaseFont::Times;
    }
    if lower.contains("courier")
        || lower.contains("mono")
        || lower.contains("consolas")
        || lower.contains("monaco")
    {
        return BaseFont::Courier;
    }
    if lower.contains("symbol") {
        return BaseFont::Symbol;
    }
    if lower.contains("zapf") || lower.contains("dingbat") {
        return BaseFont::ZapfDingbats;
    }

    BaseFont::Helvetica
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignatureContent {
    /// Hand-drawn signature captured as an image
    Drawn { data_url: String },
    /// Typed signature
    Text { text: String, style: TextStyle },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub id: String,
    pub page: u32,
    pub position: Position,
    pub size: Size,
    #[serde(flatten)]
    pub content: SignatureContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOverlay {
    pub id: String,
    pub page: u32,
    pub position: Position,
    pub size: Size,
    pub data_url: String,
    #[serde(default)]
    pub original_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNumber {
    pub id: String,
    pub page: u32,
    pub position: Position,
    /// Text with `{page}` and `{total}` placeholders
    pub template: String,
    /// Number shown on the first page; added to the natural page index
    #[serde(default = "default_starting_number")]
    pub starting_number: i64,
    #[serde(default)]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub rotation: Option<f64>,
    #[serde(default)]
    pub skew_x: Option<f64>,
    #[serde(default)]
    pub skew_y: Option<f64>,
}

/// Largest magnitude accepted for `PageNumber::starting_number`
pub const MAX_STARTING_NUMBER: i64 = 1_000_000_000;

fn default_starting_number() -> i64 {
    1
}

impl PageNumber {
    /// Text drawn on `page` of a `total`-page document
    pub fn label(&self, page: u32, total: u32) -> String {
        let shown = i64::from(page).saturating_add(self.starting_number.saturating_sub(1));
        self.template
            .replace("{page}", &shown.to_string())
            .replace("{total}", &total.to_string())
    }
}

/// Common access to the page anchor of every element kind
pub trait Anchored {
    fn id(&self) -> &str;
    fn page(&self) -> u32;
    fn set_page(&mut self, page: u32);

    fn applies_to_page(&self, page: u32) -> bool {
        self.page() == page
    }
}

impl Anchored for Signature {
    fn id(&self) -> &str {
        &self.id
    }
    fn page(&self) -> u32 {
        self.page
    }
    fn set_page(&mut self, page: u32) {
        self.page = page;
    }
}

impl Anchored for ImageOverlay {
    fn id(&self) -> &str {
        &self.id
    }
    fn page(&self) -> u32 {
        self.page
    }
    fn set_page(&mut self, page: u32) {
        self.page = page;
    }
}

impl Anchored for PageNumber {
    fn id(&self) -> &str {
        &self.id
    }
    fn page(&self) -> u32 {
        self.page
    }
    fn set_page(&mut self, page: u32) {
        self.page = page;
    }
    fn applies_to_page(&self, page: u32) -> bool {
        self.page == page || self.page == ALL_PAGES
    }
}

/// Fields needed to create a new element. The id is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElementPayload {
    DrawnSignature {
        data_url: String,
    },
    TextSignature {
        text: String,
        #[serde(default)]
        style: TextStyle,
    },
    Image {
        data_url: String,
        #[serde(default)]
        original_name: Option<String>,
    },
    PageNumber {
        template: String,
        #[serde(default = "default_starting_number")]
        starting_number: i64,
        #[serde(default)]
        alignment: Option<Alignment>,
        #[serde(default)]
        font_size: Option<f64>,
        #[serde(default)]
        rotation: Option<f64>,
        #[serde(default)]
        skew_x: Option<f64>,
        #[serde(default)]
        skew_y: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OverlayElement {
    Signature(Signature),
    Image(ImageOverlay),
    PageNumber(PageNumber),
}

impl OverlayElement {
    /// Build a new element with a freshly generated id.
    /// `size` is ignored for page numbers, whose footprint follows the font size.
    pub fn create(
        payload: ElementPayload,
        page: u32,
        position: Position,
        size: Size,
    ) -> Result<Self, EditorError> {
        let element = match payload {
            ElementPayload::DrawnSignature { data_url } => OverlayElement::Signature(Signature {
                id: generate_id("sig"),
                page,
                position,
                size,
                content: SignatureContent::Drawn { data_url },
            }),
            ElementPayload::TextSignature { text, style } => OverlayElement::Signature(Signature {
                id: generate_id("sig"),
                page,
                position,
                size,
                content: SignatureContent::Text { text, style },
            }),
            ElementPayload::Image {
                data_url,
                original_name,
            } => OverlayElement::Image(ImageOverlay {
                id: generate_id("img"),
                page,
                position,
                size,
                data_url,
                original_name,
            }),
            ElementPayload::PageNumber {
                template,
                starting_number,
                alignment,
                font_size,
                rotation,
                skew_x,
                skew_y,
            } => OverlayElement::PageNumber(PageNumber {
                id: generate_id("pagenum"),
                page,
                position,
                template,
                starting_number,
                alignment,
                font_size,
                rotation,
                skew_x,
                skew_y,
            }),
        };
        element.validate()?;
        Ok(element)
    }

    /// Content checks shared by creation and replacement. Whether the
    /// page exists is up to the session.
    pub fn validate(&self) -> Result<(), EditorError> {
        match self {
            OverlayElement::Signature(signature) => {
                check_anchor_page(signature.page)?;
                check_size(signature.size)?;
                match &signature.content {
                    SignatureContent::Drawn { data_url } => require_image_data_url(data_url),
                    SignatureContent::Text { text, .. } if text.trim().is_empty() => Err(
                        EditorError::InvalidElement("Signature text must not be empty".to_string()),
                    ),
                    SignatureContent::Text { .. } => Ok(()),
                }
            }
            OverlayElement::Image(image) => {
                check_anchor_page(image.page)?;
                check_size(image.size)?;
                require_image_data_url(&image.data_url)
            }
            OverlayElement::PageNumber(page_number) => {
                if page_number.template.is_empty() {
                    return Err(EditorError::InvalidElement(
                        "Page number template must not be empty".to_string(),
                    ));
                }
                if !(-MAX_STARTING_NUMBER..=MAX_STARTING_NUMBER)
                    .contains(&page_number.starting_number)
                {
                    return Err(EditorError::InvalidElement(format!(
                        "Starting number must be between -{0} and {0}, got {1}",
                        MAX_STARTING_NUMBER, page_number.starting_number
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn id(&self) -> &str {
        match self {
            OverlayElement::Signature(s) => s.id(),
            OverlayElement::Image(i) => i.id(),
            OverlayElement::PageNumber(p) => p.id(),
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            OverlayElement::Signature(s) => s.page,
            OverlayElement::Image(i) => i.page,
            OverlayElement::PageNumber(p) => p.page,
        }
    }

    pub fn applies_to_page(&self, page: u32) -> bool {
        match self {
            OverlayElement::Signature(s) => s.applies_to_page(page),
            OverlayElement::Image(i) => i.applies_to_page(page),
            OverlayElement::PageNumber(p) => p.applies_to_page(page),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            OverlayElement::Signature(_) => "signature",
            OverlayElement::Image(_) => "image",
            OverlayElement::PageNumber(_) => "page number",
        }
    }
}

fn check_anchor_page(page: u32) -> Result<(), EditorError> {
    if page == ALL_PAGES {
        return Err(EditorError::InvalidElement(
            "Only page numbers can target every page".to_string(),
        ));
    }
    Ok(())
}

fn check_size(size: Size) -> Result<(), EditorError> {
    if size.width > 0.0 && size.height > 0.0 {
        Ok(())
    } else {
        Err(EditorError::InvalidElement(format!(
            "Size must be positive, got {}x{}",
            size.width, size.height
        )))
    }
}

fn require_image_data_url(data_url: &str) -> Result<(), EditorError> {
    if data_url.starts_with("data:image/") && data_url.contains(";base64,") {
        Ok(())
    } else {
        Err(EditorError::InvalidElement(
            "Expected a base64 image data URL".to_string(),
        ))
    }
}

/// `<prefix>-<unix millis>-<random suffix>`
fn generate_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, millis, &random[..9])
}

/// All overlay elements of a document, one ordered list per kind.
/// Order within a list is insertion order and decides z-order on a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlays {
    pub signatures: Vec<Signature>,
    pub images: Vec<ImageOverlay>,
    pub page_numbers: Vec<PageNumber>,
}

impl Overlays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty() && self.images.is_empty() && self.page_numbers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.signatures.len() + self.images.len() + self.page_numbers.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn push(&mut self, element: OverlayElement) {
        match element {
            OverlayElement::Signature(s) => self.signatures.push(s),
            OverlayElement::Image(i) => self.images.push(i),
            OverlayElement::PageNumber(p) => self.page_numbers.push(p),
        }
    }

    pub fn get(&self, id: &str) -> Option<OverlayElement> {
        if let Some(s) = self.signatures.iter().find(|s| s.id == id) {
            return Some(OverlayElement::Signature(s.clone()));
        }
        if let Some(i) = self.images.iter().find(|i| i.id == id) {
            return Some(OverlayElement::Image(i.clone()));
        }
        self.page_numbers
            .iter()
            .find(|p| p.id == id)
            .map(|p| OverlayElement::PageNumber(p.clone()))
    }

    pub fn remove(&mut self, id: &str) -> Option<OverlayElement> {
        if let Some(pos) = self.signatures.iter().position(|s| s.id == id) {
            return Some(OverlayElement::Signature(self.signatures.remove(pos)));
        }
        if let Some(pos) = self.images.iter().position(|i| i.id == id) {
            return Some(OverlayElement::Image(self.images.remove(pos)));
        }
        if let Some(pos) = self.page_numbers.iter().position(|p| p.id == id) {
            return Some(OverlayElement::PageNumber(self.page_numbers.remove(pos)));
        }
        None
    }

    /// Replace the element with the same id and kind. Returns false if absent.
    pub fn replace(&mut self, element: OverlayElement) -> bool {
        match element {
            OverlayElement::Signature(new) => {
                match self.signatures.iter_mut().find(|s| s.id == new.id) {
                    Some(slot) => {
                        *slot = new;
                        true
                    }
                    None => false,
                }
            }
            OverlayElement::Image(new) => match self.images.iter_mut().find(|i| i.id == new.id) {
                Some(slot) => {
                    *slot = new;
                    true
                }
                None => false,
            },
            OverlayElement::PageNumber(new) => {
                match self.page_numbers.iter_mut().find(|p| p.id == new.id) {
                    Some(slot) => {
                        *slot = new;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    pub fn set_position(&mut self, id: &str, position: Position) -> bool {
        if let Some(s) = self.signatures.iter_mut().find(|s| s.id == id) {
            s.position = position;
            return true;
        }
        if let Some(i) = self.images.iter_mut().find(|i| i.id == id) {
            i.position = position;
            return true;
        }
        if let Some(p) = self.page_numbers.iter_mut().find(|p| p.id == id) {
            p.position = position;
            return true;
        }
        false
    }

    /// Resize a signature or image. Page numbers have no box and are skipped.
    pub fn set_size(&mut self, id: &str, size: Size) -> bool {
        if let Some(s) = self.signatures.iter_mut().find(|s| s.id == id) {
            s.size = size;
            return true;
        }
        if let Some(i) = self.images.iter_mut().find(|i| i.id == id) {
            i.size = size;
            return true;
        }
        false
    }

    /// Elements drawn on `page`, signatures first, then images, then page numbers
    pub fn on_page(&self, page: u32) -> Vec<OverlayElement> {
        let signatures = self
            .signatures
            .iter()
            .filter(|s| s.applies_to_page(page))
            .cloned()
            .map(OverlayElement::Signature);
        let images = self
            .images
            .iter()
            .filter(|i| i.applies_to_page(page))
            .cloned()
            .map(OverlayElement::Image);
        let page_numbers = self
            .page_numbers
            .iter()
            .filter(|p| p.applies_to_page(page))
            .cloned()
            .map(OverlayElement::PageNumber);
        signatures.chain(images).chain(page_numbers).collect()
    }

    /// Highest concrete page any element is anchored to (0 when none)
    pub fn max_page(&self) -> u32 {
        self.signatures
            .iter()
            .map(|s| s.page)
            .chain(self.images.iter().map(|i| i.page))
            .chain(self.page_numbers.iter().map(|p| p.page))
            .max()
            .unwrap_or(0)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PNG_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn image_payload() -> ElementPayload {
        ElementPayload::Image {
            data_url: PNG_URL.to_string(),
            original_name: Some("logo.png".to_string()),
        }
    }

    fn page_number(template: &str, page: u32, starting_number: i64) -> PageNumber {
        PageNumber {
            id: "pagenum-1".to_string(),
            page,
            position: Position::default(),
            template: template.to_string(),
            starting_number,
            alignment: None,
            font_size: None,
            rotation: None,
            skew_x: None,
            skew_y: None,
        }
    }

    fn box_size() -> Size {
        Size {
            width: 120.0,
            height: 60.0,
        }
    }

    #[test]
    fn test_create_image_generates_prefixed_id() {
        let element =
            OverlayElement::create(image_payload(), 2, Position::default(), box_size()).unwrap();
        assert!(element.id().starts_with("img-"));
        assert_eq!(element.page(), 2);
        assert_eq!(element.kind_name(), "image");
    }

    #[test]
    fn test_created_ids_are_unique() {
        let a = OverlayElement::create(image_payload(), 1, Position::default(), box_size())
            .unwrap();
        let b = OverlayElement::create(image_payload(), 1, Position::default(), box_size())
            .unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_empty_text_signature_rejected() {
        let payload = ElementPayload::TextSignature {
            text: "   ".to_string(),
            style: TextStyle::default(),
        };
        let result = OverlayElement::create(payload, 1, Position::default(), box_size());
        assert!(matches!(result, Err(EditorError::InvalidElement(_))));
    }

    #[test]
    fn test_drawn_signature_requires_data_url() {
        let payload = ElementPayload::DrawnSignature {
            data_url: "https://example.com/sig.png".to_string(),
        };
        let result = OverlayElement::create(payload, 1, Position::default(), box_size());
        assert!(matches!(result, Err(EditorError::InvalidElement(_))));
    }

    #[test]
    fn test_all_pages_only_for_page_numbers() {
        let result =
            OverlayElement::create(image_payload(), ALL_PAGES, Position::default(), box_size());
        assert!(result.is_err());

        let payload = ElementPayload::PageNumber {
            template: "{page}".to_string(),
            starting_number: 1,
            alignment: Some(Alignment::Center),
            font_size: None,
            rotation: None,
            skew_x: None,
            skew_y: None,
        };
        let element =
            OverlayElement::create(payload, ALL_PAGES, Position::default(), Size::default())
                .unwrap();
        assert!(element.applies_to_page(1));
        assert!(element.applies_to_page(42));
    }

    #[test]
    fn test_zero_size_image_rejected() {
        let result = OverlayElement::create(
            image_payload(),
            1,
            Position::default(),
            Size {
                width: 0.0,
                height: 10.0,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_applies_to_page_exact_match() {
        let element =
            OverlayElement::create(image_payload(), 3, Position::default(), box_size()).unwrap();
        assert!(element.applies_to_page(3));
        assert!(!element.applies_to_page(2));
        assert!(!element.applies_to_page(ALL_PAGES));
    }

    #[test]
    fn test_label_page_of_total() {
        let pn = page_number("Page {page} of {total}", ALL_PAGES, 1);
        assert_eq!(pn.label(3, 10), "Page 3 of 10");
    }

    #[test]
    fn test_label_with_starting_number_offset() {
        let pn = page_number("Page {page} of {total}", ALL_PAGES, 5);
        assert_eq!(pn.label(3, 10), "Page 7 of 10");
    }

    #[test]
    fn test_label_replaces_every_placeholder() {
        let pn = page_number("{page}/{total} ({page})", 2, 1);
        assert_eq!(pn.label(2, 4), "2/4 (2)");
    }

    #[test]
    fn test_label_saturates_at_extreme_starting_number() {
        let pn = page_number("{page}", ALL_PAGES, i64::MAX);
        assert_eq!(pn.label(3, 3), i64::MAX.to_string());
        let pn = page_number("{page}", ALL_PAGES, i64::MIN);
        assert_eq!(pn.label(1, 3), (i64::MIN + 1).to_string());
    }

    #[test]
    fn test_extreme_starting_number_rejected() {
        let payload = ElementPayload::PageNumber {
            template: "{page}".to_string(),
            starting_number: i64::MAX,
            alignment: None,
            font_size: None,
            rotation: None,
            skew_x: None,
            skew_y: None,
        };
        let result = OverlayElement::create(payload, ALL_PAGES, Position::default(), Size::default());
        assert!(matches!(result, Err(EditorError::InvalidElement(_))));

        let mut element = OverlayElement::PageNumber(page_number("{page}", 1, MAX_STARTING_NUMBER));
        assert!(element.validate().is_ok());
        if let OverlayElement::PageNumber(pn) = &mut element {
            pn.starting_number = i64::MIN;
        }
        assert!(element.validate().is_err());
    }

    #[test]
    fn test_validate_catches_edited_image() {
        let element =
            OverlayElement::create(image_payload(), 1, Position::default(), box_size()).unwrap();
        let OverlayElement::Image(image) = element else {
            panic!("Expected an image");
        };

        let bad_url = OverlayElement::Image(ImageOverlay {
            data_url: "not a data url".to_string(),
            ..image.clone()
        });
        assert!(matches!(
            bad_url.validate(),
            Err(EditorError::InvalidElement(_))
        ));

        let bad_size = OverlayElement::Image(ImageOverlay {
            size: Size {
                width: -5.0,
                height: 0.0,
            },
            ..image
        });
        assert!(matches!(
            bad_size.validate(),
            Err(EditorError::InvalidElement(_))
        ));
    }

    #[test]
    fn test_validate_catches_blanked_signature_text() {
        let payload = ElementPayload::TextSignature {
            text: "A. Tenant".to_string(),
            style: TextStyle::default(),
        };
        let element = OverlayElement::create(payload, 1, Position::default(), box_size()).unwrap();
        let OverlayElement::Signature(mut signature) = element else {
            panic!("Expected a signature");
        };
        signature.content = SignatureContent::Text {
            text: " ".to_string(),
            style: TextStyle::default(),
        };
        assert!(OverlayElement::Signature(signature).validate().is_err());
    }

    #[test]
    fn test_overlays_push_get_remove() {
        let mut overlays = Overlays::new();
        let element =
            OverlayElement::create(image_payload(), 1, Position::default(), box_size()).unwrap();
        let id = element.id().to_string();
        overlays.push(element.clone());

        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays.get(&id), Some(element.clone()));
        assert_eq!(overlays.remove(&id), Some(element));
        assert!(overlays.is_empty());
        assert_eq!(overlays.remove(&id), None);
    }

    #[test]
    fn test_overlays_move_and_resize_in_place() {
        let mut overlays = Overlays::new();
        let element =
            OverlayElement::create(image_payload(), 1, Position::default(), box_size()).unwrap();
        let id = element.id().to_string();
        overlays.push(element);

        assert!(overlays.set_position(&id, Position { x: 40.0, y: 80.0 }));
        assert!(overlays.set_size(
            &id,
            Size {
                width: 10.0,
                height: 20.0
            }
        ));
        assert_eq!(overlays.images[0].position, Position { x: 40.0, y: 80.0 });
        assert_eq!(overlays.images[0].size.height, 20.0);
        assert!(!overlays.set_position("missing", Position::default()));
    }

    #[test]
    fn test_on_page_includes_all_pages_numbers() {
        let mut overlays = Overlays::new();
        overlays.push(
            OverlayElement::create(image_payload(), 2, Position::default(), box_size()).unwrap(),
        );
        overlays.page_numbers.push(page_number("{page}", ALL_PAGES, 1));

        assert_eq!(overlays.on_page(1).len(), 1);
        assert_eq!(overlays.on_page(2).len(), 2);
    }

    #[test]
    fn test_element_json_is_tagged() {
        let element = OverlayElement::Signature(Signature {
            id: "sig-1".to_string(),
            page: 1,
            position: Position { x: 1.0, y: 2.0 },
            size: box_size(),
            content: SignatureContent::Text {
                text: "J. Doe".to_string(),
                style: TextStyle::default(),
            },
        });
        let json = serde_json::to_string(&element).unwrap();
        assert!(json.contains(r#""type":"Signature""#));
        assert!(json.contains(r#""kind":"text""#));
        let back: OverlayElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, element);
    }

    #[test]
    fn test_payload_from_ui_json() {
        let json = r#"{"type":"PageNumber","template":"Page {page} of {total}","alignment":"right"}"#;
        let payload: ElementPayload = serde_json::from_str(json).unwrap();
        match payload {
            ElementPayload::PageNumber {
                starting_number,
                alignment,
                ..
            } => {
                assert_eq!(starting_number, 1);
                assert_eq!(alignment, Some(Alignment::Right));
            }
            other => panic!("Expected PageNumber payload, got {:?}", other),
        }
    }

    // ============ Font Mapping ============

    fn style(family: &str, bold: bool, italic: bool) -> TextStyle {
        TextStyle {
            font_family: family.to_string(),
            bold,
            italic,
            ..TextStyle::default()
        }
    }

    #[test]
    fn test_font_mapping_css_generic_families() {
        assert_eq!(style("serif", false, false).pdf_font_name(), "Times-Roman");
        assert_eq!(style("sans-serif", false, false).pdf_font_name(), "Helvetica");
        assert_eq!(style("monospace", false, false).pdf_font_name(), "Courier");
        assert_eq!(style("cursive", false, false).pdf_font_name(), "Helvetica");
    }

    #[test]
    fn test_font_mapping_flags_pick_variant() {
        assert_eq!(style("serif", true, true).pdf_font_name(), "Times-BoldItalic");
        assert_eq!(style("Arial", false, true).pdf_font_name(), "Helvetica-Oblique");
        assert_eq!(style("Consolas", true, false).pdf_font_name(), "Courier-Bold");
    }

    #[test]
    fn test_font_mapping_name_carries_style() {
        assert_eq!(
            style("BCDEEE+Arial-BoldMT", false, false).pdf_font_name(),
            "Helvetica-Bold"
        );
        assert_eq!(
            style("TimesNewRoman-Italic", false, false).pdf_font_name(),
            "Times-Italic"
        );
    }

    #[test]
    fn test_font_mapping_unknown_defaults_to_helvetica() {
        assert_eq!(style("g_d0_f1", false, false).pdf_font_name(), "Helvetica");
        assert_eq!(style("", false, false).pdf_font_name(), "Helvetica");
        assert_eq!(style("ZapfDingbats", false, false).pdf_font_name(), "ZapfDingbats");
    }
}
