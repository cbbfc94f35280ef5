//! Turn image data URLs into PDF image XObjects
//!
//! PNG is decoded to raw samples and stored with FlateDecode, with any alpha
//! channel split into a soft mask. JPEG is embedded as-is with DCTDecode.

use crate::error::PdfServiceError;
use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageFormat {
    Png,
    Jpeg,
}

/// Decode `data:image/<type>;base64,<payload>` into the format and raw bytes
pub(crate) fn decode_data_url(data_url: &str) -> Result<(ImageFormat, Vec<u8>), PdfServiceError> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| PdfServiceError::ImageError("Malformed data URL".into()))?;
    if !header.ends_with(";base64") {
        return Err(PdfServiceError::ImageError(
            "Data URL is not base64 encoded".into(),
        ));
    }

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned)
        .map_err(|e| PdfServiceError::ImageError(format!("Invalid base64: {}", e)))?;

    let mime = header
        .trim_start_matches("data:")
        .trim_end_matches(";base64")
        .to_ascii_lowercase();
    let format = match mime.as_str() {
        "image/png" => ImageFormat::Png,
        "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
        _ => sniff_format(&bytes).ok_or(PdfServiceError::UnsupportedImage(mime))?,
    };
    Ok((format, bytes))
}

fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

/// Add the image behind `data_url` to `doc` and return its XObject id
pub(crate) fn embed_image(doc: &mut Document, data_url: &str) -> Result<ObjectId, PdfServiceError> {
    let (format, bytes) = decode_data_url(data_url)?;
    match format {
        ImageFormat::Png => embed_png(doc, &bytes),
        ImageFormat::Jpeg => embed_jpeg(doc, bytes),
    }
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    dict
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfServiceError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| PdfServiceError::ImageError(format!("Compression failed: {}", e)))
}

fn embed_png(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId, PdfServiceError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| PdfServiceError::ImageError(format!("Invalid PNG: {}", e)))?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buffer)
        .map_err(|e| PdfServiceError::ImageError(format!("Invalid PNG: {}", e)))?;
    let samples = &buffer[..info.buffer_size()];

    // EXPAND turns palettes into RGB(A) and low bit depths into 8 bits
    let (color, alpha, color_space) = match info.color_type {
        png::ColorType::Rgb => (samples.to_vec(), None, "DeviceRGB"),
        png::ColorType::Grayscale => (samples.to_vec(), None, "DeviceGray"),
        png::ColorType::Rgba => {
            let (color, alpha) = split_alpha(samples, 3);
            (color, Some(alpha), "DeviceRGB")
        }
        png::ColorType::GrayscaleAlpha => {
            let (color, alpha) = split_alpha(samples, 1);
            (color, Some(alpha), "DeviceGray")
        }
        png::ColorType::Indexed => {
            return Err(PdfServiceError::UnsupportedImage(
                "Indexed PNG was not expanded".into(),
            ))
        }
    };

    let mut dict = image_dict(info.width, info.height, color_space, "FlateDecode");
    if let Some(alpha) = alpha {
        let mask_dict = image_dict(info.width, info.height, "DeviceGray", "FlateDecode");
        let mask_id = doc.add_object(Stream::new(mask_dict, deflate(&alpha)?));
        dict.set("SMask", Object::Reference(mask_id));
    }
    Ok(doc.add_object(Stream::new(dict, deflate(&color)?)))
}

/// Split interleaved samples into color channels and the trailing alpha byte
fn split_alpha(samples: &[u8], color_channels: usize) -> (Vec<u8>, Vec<u8>) {
    let pixel = color_channels + 1;
    let pixels = samples.len() / pixel;
    let mut color = Vec::with_capacity(pixels * color_channels);
    let mut alpha = Vec::with_capacity(pixels);
    for chunk in samples.chunks_exact(pixel) {
        color.extend_from_slice(&chunk[..color_channels]);
        alpha.push(chunk[color_channels]);
    }
    (color, alpha)
}

fn embed_jpeg(doc: &mut Document, bytes: Vec<u8>) -> Result<ObjectId, PdfServiceError> {
    let header = jpeg_header(&bytes)
        .ok_or_else(|| PdfServiceError::ImageError("JPEG has no frame header".into()))?;
    let color_space = match header.components {
        1 => "DeviceGray",
        3 => "DeviceRGB",
        4 => "DeviceCMYK",
        n => {
            return Err(PdfServiceError::UnsupportedImage(format!(
                "JPEG with {} components",
                n
            )))
        }
    };

    let dict = image_dict(header.width, header.height, color_space, "DCTDecode");
    let mut stream = Stream::new(dict, bytes);
    stream.allows_compression = false;
    Ok(doc.add_object(stream))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u32,
    height: u32,
    components: u8,
}

/// Read dimensions from the first SOFn marker
fn jpeg_header(bytes: &[u8]) -> Option<JpegHeader> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        if marker == 0xFF {
            // fill byte
            i += 1;
            continue;
        }
        let length = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            if i + 10 > bytes.len() {
                return None;
            }
            return Some(JpegHeader {
                height: u16::from_be_bytes([bytes[i + 5], bytes[i + 6]]) as u32,
                width: u16::from_be_bytes([bytes[i + 7], bytes[i + 8]]) as u32,
                components: bytes[i + 9],
            });
        }
        i += 2 + length;
    }
    None
}
