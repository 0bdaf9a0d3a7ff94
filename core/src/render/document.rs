//! Page layout for the client-facing proposal document.
//!
//! Walks the aggregated sections with a vertical cursor; any block that
//! would cross the printable bottom edge starts a new page and continues
//! where it left off. Internal pricing fields never reach this module's
//! output: only `unit_price` and recomputed line totals are drawn.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::proposal::model::{LineItem, Proposal, Recipient};
use crate::proposal::sections::Section;
use crate::proposal::totals::{compute_totals, Totals};
use crate::render::metrics::{text_width, wrap_text, Font};
use crate::render::pdf::{parse_jpeg, Content, JpegImage, PdfDocument, PAGE_WIDTH};
use time::OffsetDateTime;

const MARGIN: f64 = 50.0;
const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;
const RIGHT_EDGE: f64 = PAGE_WIDTH - MARGIN;
const TOP_Y: f64 = 791.89;
// Keep clear of the footer zone.
const BOTTOM_Y: f64 = 78.0;
const FOOTER_Y: f64 = 40.0;

const ACCENT: (f64, f64, f64) = (0.16, 0.42, 0.2);
const GRAY_TEXT: f64 = 0.42;
const GRAY_RULE: f64 = 0.78;

/// Visual identity for the document header and footer. Every field is
/// decorative: a missing or unreadable logo degrades to text, and an empty
/// company name simply drops the line.
#[derive(Debug, Clone, Default)]
pub struct Branding {
    pub company_name: String,
    pub tagline: Option<String>,
    pub logo_jpeg: Option<Vec<u8>>,
    pub contact_lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub totals: Totals,
}

struct Layout {
    done: Vec<Content>,
    current: Content,
    y: f64,
}

impl Layout {
    fn new() -> Self {
        Layout {
            done: Vec::new(),
            current: Content::new(),
            y: TOP_Y,
        }
    }

    fn ensure_room(&mut self, height: f64) {
        if self.y - height < BOTTOM_Y {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        self.done
            .push(std::mem::replace(&mut self.current, Content::new()));
        self.y = TOP_Y;
    }

    fn advance(&mut self, height: f64) {
        self.y -= height;
    }

    fn finish(mut self) -> Vec<Content> {
        self.done.push(self.current);
        self.done
    }
}

/// Render the client-facing proposal PDF.
///
/// Pure function of its inputs: identical arguments produce identical
/// bytes, with `generated_at` confined to the document date line and the
/// PDF CreationDate field. Validation errors surface before any layout or
/// I/O happens.
pub fn render_proposal(
    proposal: &Proposal,
    sections: &[Section],
    recipient: &Recipient,
    branding: &Branding,
    generated_at: OffsetDateTime,
) -> CoreResult<RenderedDocument> {
    if proposal.title.trim().is_empty() {
        return Err(CoreError::MissingRequiredField("title"));
    }
    let totals = compute_totals(sections, proposal.tax_rate)?;

    let logo = branding.logo_jpeg.as_deref().and_then(parse_jpeg);

    let mut layout = Layout::new();
    draw_header(&mut layout, proposal, branding, logo.as_ref());
    draw_metadata(&mut layout, proposal, recipient, generated_at);
    for section in sections {
        draw_section(&mut layout, section);
    }
    draw_summary(&mut layout, proposal, sections, &totals);

    let mut pages = layout.finish();
    let total_pages = pages.len();
    for (i, page) in pages.iter_mut().enumerate() {
        draw_footer(page, branding, proposal, i + 1, total_pages);
    }

    let mut doc = PdfDocument::new(pdf_date(generated_at), logo);
    for page in pages {
        doc.push_page(page);
    }
    let page_count = doc.page_count();
    Ok(RenderedDocument {
        bytes: doc.build(),
        page_count,
        totals,
    })
}

fn draw_header(
    layout: &mut Layout,
    proposal: &Proposal,
    branding: &Branding,
    logo: Option<&JpegImage>,
) {
    let mut name_x = MARGIN;
    if let Some(img) = logo {
        let h = 34.0;
        let w = h * f64::from(img.width) / f64::from(img.height);
        layout.current.image(MARGIN, layout.y - h, w, h);
        name_x = MARGIN + w + 12.0;
    }
    if !branding.company_name.is_empty() {
        layout.current.text(
            name_x,
            layout.y - 18.0,
            Font::HelveticaBold,
            15.0,
            &branding.company_name,
        );
    }
    if let Some(tagline) = &branding.tagline {
        layout
            .current
            .text_gray(name_x, layout.y - 31.0, Font::Helvetica, 8.5, GRAY_TEXT, tagline);
    }
    let label = "PROPOSAL";
    let label_w = text_width(label, Font::HelveticaBold, 19.0);
    layout.current.text_rgb(
        RIGHT_EDGE - label_w,
        layout.y - 20.0,
        Font::HelveticaBold,
        19.0,
        ACCENT,
        label,
    );
    layout.advance(44.0);

    layout
        .current
        .rect_fill(MARGIN, layout.y, CONTENT_WIDTH, 2.0, ACCENT);
    layout.advance(24.0);

    for line in wrap_text(&proposal.title, Font::HelveticaBold, 15.0, CONTENT_WIDTH) {
        layout
            .current
            .text(MARGIN, layout.y, Font::HelveticaBold, 15.0, &line);
        layout.advance(19.0);
    }
    layout.advance(6.0);
}

fn draw_metadata(
    layout: &mut Layout,
    proposal: &Proposal,
    recipient: &Recipient,
    generated_at: OffsetDateTime,
) {
    let left_x = MARGIN;
    let right_x = MARGIN + CONTENT_WIDTH / 2.0;
    let top = layout.y;

    let mut left_y = top;
    layout
        .current
        .text_gray(left_x, left_y, Font::HelveticaBold, 8.0, GRAY_TEXT, "PREPARED FOR");
    left_y -= 13.0;
    let left_lines = [
        recipient.contact_name.as_deref(),
        recipient.company_name.as_deref(),
        recipient.contact_email.as_deref(),
    ];
    for line in left_lines.into_iter().flatten() {
        layout.current.text(left_x, left_y, Font::Helvetica, 9.5, line);
        left_y -= 13.0;
    }

    let mut right_y = top;
    layout
        .current
        .text_gray(right_x, right_y, Font::HelveticaBold, 8.0, GRAY_TEXT, "DETAILS");
    right_y -= 13.0;
    let date_line = format!("Date: {}", human_date(generated_at));
    let status_line = format!("Status: {}", proposal.status.label());
    let mut right_lines = vec![date_line, status_line];
    if let Some(deal) = &recipient.deal_name {
        right_lines.push(format!("Project: {}", deal));
    }
    if let Some(expires) = proposal.expires_at {
        right_lines.push(format!("Valid through: {}", human_date(expires)));
    }
    for line in &right_lines {
        layout.current.text(right_x, right_y, Font::Helvetica, 9.5, line);
        right_y -= 13.0;
    }

    layout.y = left_y.min(right_y);
    layout.advance(10.0);
}

fn draw_section(layout: &mut Layout, section: &Section) {
    // Keep the section header attached to at least one item line.
    layout.ensure_room(34.0);
    layout
        .current
        .text_rgb(MARGIN, layout.y, Font::HelveticaBold, 11.0, ACCENT, &section.name);
    layout.advance(6.0);
    layout
        .current
        .hline(MARGIN, RIGHT_EDGE, layout.y, 0.75, GRAY_RULE);
    layout.advance(14.0);

    for item in &section.items {
        draw_item(layout, item);
    }
    layout.advance(6.0);
}

fn draw_item(layout: &mut Layout, item: &LineItem) {
    layout.ensure_room(12.0);
    layout
        .current
        .text(MARGIN, layout.y, Font::HelveticaBold, 9.5, &item.name);
    if item.optional {
        let marker = if item.selected_by_client {
            "(optional, included)"
        } else {
            "(optional)"
        };
        let marker_x = MARGIN + text_width(&item.name, Font::HelveticaBold, 9.5) + 5.0;
        layout
            .current
            .text_gray(marker_x, layout.y, Font::Helvetica, 8.0, GRAY_TEXT, marker);
    }
    let amount = item.line_total().to_string();
    let amount_w = text_width(&amount, Font::Helvetica, 9.5);
    layout
        .current
        .text(RIGHT_EDGE - amount_w, layout.y, Font::Helvetica, 9.5, &amount);
    layout.advance(12.0);

    layout.ensure_room(11.0);
    let qty_line = format!(
        "{} - {} {} x {}",
        item.kind.label(),
        quantity_label(item.quantity),
        item.unit,
        item.unit_price
    );
    layout
        .current
        .text_gray(MARGIN + 10.0, layout.y, Font::Helvetica, 8.5, GRAY_TEXT, &qty_line);
    layout.advance(12.0);

    if let Some(description) = &item.description {
        for line in wrap_text(description, Font::Helvetica, 8.5, CONTENT_WIDTH - 20.0) {
            layout.ensure_room(11.0);
            layout
                .current
                .text_gray(MARGIN + 10.0, layout.y, Font::Helvetica, 8.5, 0.3, &line);
            layout.advance(11.0);
        }
    }

    layout.ensure_room(8.0);
    layout
        .current
        .hline(MARGIN, RIGHT_EDGE, layout.y, 0.5, 0.9);
    layout.advance(11.0);
}

fn draw_summary(layout: &mut Layout, proposal: &Proposal, sections: &[Section], totals: &Totals) {
    layout.ensure_room(30.0);
    layout
        .current
        .text_rgb(MARGIN, layout.y, Font::HelveticaBold, 11.0, ACCENT, "Pricing Summary");
    layout.advance(6.0);
    layout
        .current
        .hline(MARGIN, RIGHT_EDGE, layout.y, 0.75, GRAY_RULE);
    layout.advance(15.0);

    for section in sections {
        summary_line(layout, &section.name, section.total, Font::Helvetica, 9.5);
    }

    layout.ensure_room(8.0);
    layout
        .current
        .hline(MARGIN + CONTENT_WIDTH / 2.0, RIGHT_EDGE, layout.y, 0.5, GRAY_RULE);
    layout.advance(13.0);

    summary_line(layout, "Subtotal", totals.subtotal, Font::Helvetica, 9.5);
    let tax_label = format!("Tax ({})", rate_label(proposal.tax_rate));
    summary_line(layout, &tax_label, totals.tax_amount, Font::Helvetica, 9.5);
    summary_line(layout, "Total", totals.total_amount, Font::HelveticaBold, 11.0);
    if proposal.deposit_amount > Money::ZERO {
        summary_line(
            layout,
            "Deposit due on acceptance",
            proposal.deposit_amount,
            Font::Helvetica,
            9.5,
        );
    }
}

fn summary_line(layout: &mut Layout, label: &str, amount: Money, font: Font, size: f64) {
    layout.ensure_room(size + 4.0);
    layout.current.text(MARGIN, layout.y, font, size, label);
    let amount_s = amount.to_string();
    let amount_w = text_width(&amount_s, font, size);
    layout
        .current
        .text(RIGHT_EDGE - amount_w, layout.y, font, size, &amount_s);
    layout.advance(size + 4.5);
}

fn draw_footer(
    page: &mut Content,
    branding: &Branding,
    proposal: &Proposal,
    page_number: usize,
    total_pages: usize,
) {
    page.hline(MARGIN, RIGHT_EDGE, FOOTER_Y + 14.0, 0.5, GRAY_RULE);
    if !branding.contact_lines.is_empty() {
        let contact = branding.contact_lines.join("  |  ");
        page.text_gray(MARGIN, FOOTER_Y, Font::Helvetica, 7.5, GRAY_TEXT, &contact);
    }
    let mut right_parts = Vec::new();
    if let Some(expires) = proposal.expires_at {
        right_parts.push(format!("Valid through {}", human_date(expires)));
    }
    right_parts.push(format!("Page {} of {}", page_number, total_pages));
    let right = right_parts.join("  |  ");
    let right_w = text_width(&right, Font::Helvetica, 7.5);
    page.text_gray(
        RIGHT_EDGE - right_w,
        FOOTER_Y,
        Font::Helvetica,
        7.5,
        GRAY_TEXT,
        &right,
    );
}

fn quantity_label(quantity: f64) -> String {
    if quantity.fract().abs() < 1e-9 {
        format!("{}", quantity as i64)
    } else {
        let mut s = format!("{:.2}", quantity);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

fn rate_label(rate: f64) -> String {
    let mut s = format!("{:.2}", rate * 100.0);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    format!("{}%", s)
}

fn human_date(at: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        at.year(),
        u8::from(at.month()),
        at.day()
    )
}

fn pdf_date(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}Z",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second()
    )
}
