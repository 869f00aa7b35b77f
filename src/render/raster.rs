//! Fixed-layout raster certificate
//!
//! The layout is fully determined by the constants below, so identical
//! input always yields byte-identical PNG output.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};

use super::glyphs::{self, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use super::RenderError;
use crate::domain::CertificateData;

pub const CANVAS_WIDTH: u32 = 1600;
pub const CANVAS_HEIGHT: u32 = 1130;

pub const BACKGROUND: Rgb<u8> = Rgb([250, 246, 234]);
pub const NAVY: Rgb<u8> = Rgb([26, 43, 76]);
pub const GOLD: Rgb<u8> = Rgb([191, 150, 64]);
pub const INK: Rgb<u8> = Rgb([60, 60, 60]);

/// Horizontal margin kept free of text on each side
const TEXT_MARGIN: u32 = 140;
const MIN_SCALE: u32 = 2;
const ELLIPSIS: &str = "...";

struct TextLine {
    text: String,
    top: u32,
    scale: u32,
    color: Rgb<u8>,
}

fn layout(data: &CertificateData) -> Vec<TextLine> {
    let line = |text: String, top: u32, scale: u32, color: Rgb<u8>| TextLine {
        text,
        top,
        scale,
        color,
    };

    let when_where = match data.event_location.as_deref() {
        Some(location) if !location.trim().is_empty() => {
            format!("{} - {}", data.event_date, location.trim())
        }
        _ => data.event_date.clone(),
    };

    vec![
        line("CERTIFICATE OF ATTENDANCE".into(), 170, 10, NAVY),
        line("THIS IS TO CERTIFY THAT".into(), 350, 4, INK),
        line(data.participant_name.clone(), 420, 8, NAVY),
        line("HAS ATTENDED".into(), 540, 4, INK),
        line(data.event_title.clone(), 600, 6, NAVY),
        line(when_where, 700, 4, INK),
        line(format!("ORGANIZED BY {}", data.organizer_name), 780, 4, INK),
        line(format!("CERTIFICATE CODE: {}", data.certificate_code), 960, 3, NAVY),
        line(format!("ISSUED {}", data.issue_date), 1000, 3, INK),
    ]
}

/// Render the certificate as a PNG
pub fn render_raster(data: &CertificateData) -> Result<Vec<u8>, RenderError> {
    let mut canvas = RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, BACKGROUND);

    draw_frame(&mut canvas, 40, 14, NAVY);
    draw_frame(&mut canvas, 70, 4, NAVY);
    fill_rect(&mut canvas, (CANVAS_WIDTH - 600) / 2, 300, 600, 6, GOLD);

    let max_width = CANVAS_WIDTH - 2 * TEXT_MARGIN;
    for line in layout(data) {
        let (text, scale) = fit_line(&line.text, line.scale, max_width);
        draw_text_centered(&mut canvas, &text, line.top, scale, line.color);
    }

    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            canvas.as_raw(),
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Width in pixels of `chars` glyphs at `scale`
pub fn text_width(chars: usize, scale: u32) -> u32 {
    if chars == 0 {
        return 0;
    }
    (chars as u32 * GLYPH_ADVANCE - 1) * scale
}

/// Normalize `text` onto the font and make it fit `max_width`, shrinking the
/// scale first and truncating with `...` at the minimum scale.
pub fn fit_line(text: &str, scale: u32, max_width: u32) -> (String, u32) {
    let normalized: String = text.trim().chars().map(glyphs::normalize).collect();
    let len = normalized.chars().count();

    let mut scale = scale.max(MIN_SCALE);
    while scale > MIN_SCALE && text_width(len, scale) > max_width {
        scale -= 1;
    }
    if text_width(len, scale) <= max_width {
        return (normalized, scale);
    }

    let max_chars = ((max_width / scale + 1) / GLYPH_ADVANCE) as usize;
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let truncated: String = normalized
        .chars()
        .take(keep)
        .collect::<String>()
        .trim_end()
        .to_string();
    (format!("{truncated}{ELLIPSIS}"), scale)
}

fn draw_text_centered(canvas: &mut RgbImage, text: &str, top: u32, scale: u32, color: Rgb<u8>) {
    let width = text_width(text.chars().count(), scale);
    let mut x = CANVAS_WIDTH.saturating_sub(width) / 2;

    for c in text.chars() {
        let rows = glyphs::glyph(c);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                    fill_rect(
                        canvas,
                        x + col * scale,
                        top + row as u32 * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
        x += GLYPH_ADVANCE * scale;
    }
    debug_assert!(top + GLYPH_HEIGHT * scale <= CANVAS_HEIGHT);
}

fn draw_frame(canvas: &mut RgbImage, inset: u32, thickness: u32, color: Rgb<u8>) {
    let w = CANVAS_WIDTH - 2 * inset;
    let h = CANVAS_HEIGHT - 2 * inset;
    fill_rect(canvas, inset, inset, w, thickness, color);
    fill_rect(canvas, inset, inset + h - thickness, w, thickness, color);
    fill_rect(canvas, inset, inset, thickness, h, color);
    fill_rect(canvas, inset + w - thickness, inset, thickness, h, color);
}

fn fill_rect(canvas: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x_end = (x + w).min(canvas.width());
    let y_end = (y + h).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            canvas.put_pixel(px, py, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(name: &str) -> CertificateData {
        CertificateData {
            participant_name: name.to_string(),
            participant_email: "ada@example.com".to_string(),
            event_title: "Rust Systems Workshop".to_string(),
            event_description: None,
            event_date: "March 3, 2026".to_string(),
            event_location: Some("Room 4".to_string()),
            certificate_code: "CERT-3F9A1B2C4D5E6F70".to_string(),
            issue_date: "March 4, 2026".to_string(),
            organizer_name: "Systems Guild".to_string(),
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render_raster(&data("Ada Lovelace")).unwrap();
        let b = render_raster(&data("Ada Lovelace")).unwrap();
        assert_eq!(a, b);

        let c = render_raster(&data("Grace Hopper")).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_canvas_dimensions_and_palette() {
        let png = render_raster(&data("Ada Lovelace")).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();

        assert_eq!(img.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
        assert_eq!(*img.get_pixel(5, 5), BACKGROUND);
        assert_eq!(*img.get_pixel(45, 45), NAVY);
        assert_eq!(*img.get_pixel(CANVAS_WIDTH / 2, 302), GOLD);
    }

    #[test]
    fn test_fit_line_keeps_short_text() {
        let (text, scale) = fit_line("Ada", 8, 1320);
        assert_eq!(text, "ADA");
        assert_eq!(scale, 8);
    }

    #[test]
    fn test_fit_line_shrinks_then_truncates() {
        let long = "X".repeat(60);
        let (text, scale) = fit_line(&long, 8, 1320);
        assert!(scale < 8);
        assert_eq!(text, long);
        assert!(text_width(text.len(), scale) <= 1320);

        let very_long = "Y".repeat(400);
        let (text, scale) = fit_line(&very_long, 8, 1320);
        assert_eq!(scale, MIN_SCALE);
        assert!(text.ends_with("..."));
        assert!(text_width(text.chars().count(), scale) <= 1320);
    }

    #[test]
    fn test_unsupported_characters_render_as_placeholder() {
        let (text, _) = fit_line("Zoë 李", 4, 1320);
        assert_eq!(text, "ZOE ?");
    }
}
