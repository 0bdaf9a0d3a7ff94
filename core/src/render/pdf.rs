//! Minimal deterministic PDF writer.
//!
//! Emits PDF 1.4 with uncompressed content streams, base-14 fonts, and a
//! fixed object layout so identical input produces identical bytes. The
//! only time-dependent value in the file is the Info dictionary's
//! CreationDate, which the caller supplies.

use crate::render::metrics::Font;

pub const PAGE_WIDTH: f64 = 595.28;
pub const PAGE_HEIGHT: f64 = 841.89;

/// Fixed-precision number formatting for content streams. Two decimals,
/// trailing zeros trimmed, so coordinates never vary with float noise.
pub(crate) fn fmt_num(v: f64) -> String {
    let mut s = format!("{:.2}", v);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Escape a string for a PDF literal string under WinAnsiEncoding.
/// Balanced-delimiter and backslash bytes are escaped, Latin-1 codepoints
/// above ASCII become octal escapes, and anything unrepresentable is
/// replaced so the output stays pure ASCII.
pub(crate) fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            ' '..='~' => out.push(c),
            c if (c as u32) >= 0xA0 && (c as u32) <= 0xFF => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            _ => out.push('?'),
        }
    }
    out
}

/// One page's content stream, accumulated as ASCII operator text.
#[derive(Debug, Clone, Default)]
pub struct Content {
    ops: String,
}

impl Content {
    pub fn new() -> Self {
        Content::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn text(&mut self, x: f64, y: f64, font: Font, size: f64, s: &str) {
        self.ops.push_str(&format!(
            "BT /{} {} Tf {} {} Td ({}) Tj ET\n",
            font.resource_name(),
            fmt_num(size),
            fmt_num(x),
            fmt_num(y),
            escape_text(s)
        ));
    }

    pub fn text_gray(&mut self, x: f64, y: f64, font: Font, size: f64, gray: f64, s: &str) {
        self.ops.push_str(&format!(
            "q {} g BT /{} {} Tf {} {} Td ({}) Tj ET Q\n",
            fmt_num(gray),
            font.resource_name(),
            fmt_num(size),
            fmt_num(x),
            fmt_num(y),
            escape_text(s)
        ));
    }

    pub fn text_rgb(
        &mut self,
        x: f64,
        y: f64,
        font: Font,
        size: f64,
        rgb: (f64, f64, f64),
        s: &str,
    ) {
        self.ops.push_str(&format!(
            "q {} {} {} rg BT /{} {} Tf {} {} Td ({}) Tj ET Q\n",
            fmt_num(rgb.0),
            fmt_num(rgb.1),
            fmt_num(rgb.2),
            font.resource_name(),
            fmt_num(size),
            fmt_num(x),
            fmt_num(y),
            escape_text(s)
        ));
    }

    pub fn hline(&mut self, x1: f64, x2: f64, y: f64, width: f64, gray: f64) {
        self.ops.push_str(&format!(
            "q {} w {} G {} {} m {} {} l S Q\n",
            fmt_num(width),
            fmt_num(gray),
            fmt_num(x1),
            fmt_num(y),
            fmt_num(x2),
            fmt_num(y)
        ));
    }

    pub fn rect_fill(&mut self, x: f64, y: f64, w: f64, h: f64, rgb: (f64, f64, f64)) {
        self.ops.push_str(&format!(
            "q {} {} {} rg {} {} {} {} re f Q\n",
            fmt_num(rgb.0),
            fmt_num(rgb.1),
            fmt_num(rgb.2),
            fmt_num(x),
            fmt_num(y),
            fmt_num(w),
            fmt_num(h)
        ));
    }

    pub fn image(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ops.push_str(&format!(
            "q {} 0 0 {} {} {} cm /Im1 Do Q\n",
            fmt_num(w),
            fmt_num(h),
            fmt_num(x),
            fmt_num(y)
        ));
    }
}

/// A JPEG accepted for pass-through embedding (DCTDecode).
#[derive(Debug, Clone)]
pub struct JpegImage {
    pub width: u32,
    pub height: u32,
    components: u8,
    data: Vec<u8>,
}

/// Read dimensions from a baseline or progressive JPEG. Returns `None` for
/// anything malformed or with an unsupported component count; callers fall
/// back to text-only branding.
pub fn parse_jpeg(bytes: &[u8]) -> Option<JpegImage> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }
    let mut i = 2usize;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        match marker {
            // Standalone markers carry no length field.
            0x01 | 0xD0..=0xD9 => {
                i += 2;
                continue;
            }
            _ => {}
        }
        let len = usize::from(bytes[i + 2]) << 8 | usize::from(bytes[i + 3]);
        if len < 2 || i + 2 + len > bytes.len() {
            return None;
        }
        match marker {
            0xC0 | 0xC1 | 0xC2 => {
                if len < 8 {
                    return None;
                }
                let height = u32::from(bytes[i + 5]) << 8 | u32::from(bytes[i + 6]);
                let width = u32::from(bytes[i + 7]) << 8 | u32::from(bytes[i + 8]);
                let components = bytes[i + 9];
                if width == 0 || height == 0 || !matches!(components, 1 | 3) {
                    return None;
                }
                return Some(JpegImage {
                    width,
                    height,
                    components,
                    data: bytes.to_vec(),
                });
            }
            // Start of scan: no frame header seen before entropy data.
            0xDA => return None,
            _ => i += 2 + len,
        }
    }
    None
}

/// A document assembled from finished pages. Objects are numbered in one
/// fixed scheme and emitted in id order, so the xref table and therefore
/// the whole byte stream is reproducible.
pub struct PdfDocument {
    creation_date: String,
    image: Option<JpegImage>,
    pages: Vec<Content>,
}

impl PdfDocument {
    /// `creation_date` must already be in PDF date form, e.g.
    /// `D:20260804093000Z`.
    pub fn new(creation_date: String, image: Option<JpegImage>) -> Self {
        PdfDocument {
            creation_date,
            image,
            pages: Vec::new(),
        }
    }

    pub fn push_page(&mut self, content: Content) {
        self.pages.push(content);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn build(self) -> Vec<u8> {
        // Object ids: 1 catalog, 2 pages, 3 resources, 4-5 fonts,
        // [6 image,] then page/content pairs, info last.
        let has_image = self.image.is_some();
        let first_page_id = if has_image { 7 } else { 6 };
        let n = self.pages.len();
        let info_id = first_page_id + 2 * n;
        let size = info_id + 1;

        let mut out: Vec<u8> = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut offsets: Vec<usize> = vec![0; size];
        let mut push_obj = |out: &mut Vec<u8>, id: usize, body: &[u8]| {
            offsets[id] = out.len();
            out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        };

        push_obj(&mut out, 1, b"<< /Type /Catalog /Pages 2 0 R >>");

        let kids: Vec<String> = (0..n)
            .map(|i| format!("{} 0 R", first_page_id + 2 * i))
            .collect();
        push_obj(
            &mut out,
            2,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                n
            )
            .as_bytes(),
        );

        let xobject = if has_image {
            " /XObject << /Im1 6 0 R >>"
        } else {
            ""
        };
        push_obj(
            &mut out,
            3,
            format!(
                "<< /Font << /F1 4 0 R /F2 5 0 R >>{} /ProcSet [/PDF /Text /ImageC] >>",
                xobject
            )
            .as_bytes(),
        );
        push_obj(
            &mut out,
            4,
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                Font::Helvetica.base_name()
            )
            .as_bytes(),
        );
        push_obj(
            &mut out,
            5,
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                Font::HelveticaBold.base_name()
            )
            .as_bytes(),
        );

        if let Some(img) = &self.image {
            let colorspace = if img.components == 3 {
                "/DeviceRGB"
            } else {
                "/DeviceGray"
            };
            let mut body = format!(
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
                 /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
                img.width,
                img.height,
                colorspace,
                img.data.len()
            )
            .into_bytes();
            body.extend_from_slice(&img.data);
            body.extend_from_slice(b"\nendstream");
            push_obj(&mut out, 6, &body);
        }

        for (i, page) in self.pages.iter().enumerate() {
            let page_id = first_page_id + 2 * i;
            let content_id = page_id + 1;
            push_obj(
                &mut out,
                page_id,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources 3 0 R /Contents {} 0 R >>",
                    fmt_num(PAGE_WIDTH),
                    fmt_num(PAGE_HEIGHT),
                    content_id
                )
                .as_bytes(),
            );
            let stream = page.ops.as_bytes();
            let mut body =
                format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
            body.extend_from_slice(stream);
            body.extend_from_slice(b"\nendstream");
            push_obj(&mut out, content_id, &body);
        }

        push_obj(
            &mut out,
            info_id,
            format!(
                "<< /Producer (Evergreen CRM) /CreationDate ({}) >>",
                escape_text(&self.creation_date)
            )
            .as_bytes(),
        );

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
                size, info_id, xref_offset
            )
            .as_bytes(),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_num_trims_trailing_zeros() {
        assert_eq!(fmt_num(50.0), "50");
        assert_eq!(fmt_num(595.28), "595.28");
        assert_eq!(fmt_num(0.5), "0.5");
        assert_eq!(fmt_num(-0.004), "0");
    }

    #[test]
    fn test_escape_text_delimiters_and_non_ascii() {
        assert_eq!(escape_text("a(b)c\\d"), "a\\(b\\)c\\\\d");
        assert_eq!(escape_text("caf\u{e9}"), "caf\\351");
        assert_eq!(escape_text("\u{2713}"), "?");
    }

    #[test]
    fn test_build_is_deterministic() {
        let make = || {
            let mut content = Content::new();
            content.text(50.0, 700.0, Font::Helvetica, 10.0, "hello");
            let mut doc = PdfDocument::new("D:20260301120000Z".to_string(), None);
            doc.push_page(content);
            doc.build()
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn test_build_structure() {
        let mut content = Content::new();
        content.text(50.0, 700.0, Font::HelveticaBold, 12.0, "Proposal");
        let mut doc = PdfDocument::new("D:20260301120000Z".to_string(), None);
        doc.push_page(content);
        let bytes = doc.build();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("(Proposal) Tj"));
        assert!(text.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut doc = PdfDocument::new("D:20260301120000Z".to_string(), None);
        doc.push_page(Content::new());
        let bytes = doc.build();
        // One page, no image: catalog, pages, resources, two fonts, page,
        // content, info.
        let xref_at = bytes.windows(5).position(|w| w == b"xref\n").unwrap();
        let tail = std::str::from_utf8(&bytes[xref_at..]).unwrap();
        for (i, line) in tail.lines().skip(3).take(8).enumerate() {
            let offset: usize = line[..10].parse().unwrap();
            let header = format!("{} 0 obj", i + 1);
            assert_eq!(&bytes[offset..offset + header.len()], header.as_bytes());
        }
    }

    #[test]
    fn test_parse_jpeg_sof0() {
        // SOI, APP0 stub, SOF0 (3 components, 2x4), EOI.
        let mut jpeg: Vec<u8> = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
        jpeg.extend_from_slice(&[
            0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x02, 0x00, 0x04, 0x03, 0x00, 0x00, 0x00,
        ]);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        let img = parse_jpeg(&jpeg).unwrap();
        assert_eq!((img.width, img.height), (4, 2));
    }

    #[test]
    fn test_parse_jpeg_rejects_garbage() {
        assert!(parse_jpeg(b"not a jpeg").is_none());
        assert!(parse_jpeg(&[0xFF, 0xD8, 0x00, 0x00]).is_none());
    }
}
