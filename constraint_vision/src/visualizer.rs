// THEORY:
// The visualizer is a QA aid, not part of detection. It answers "what did the engine
// actually find?" by drawing the regions over a faded copy of the template:
//
//   - the source image at half opacity, so the overlay stands out
//   - per region, a translucent fill over the bounding box in its own hue
//     (region index * 60°), a solid outline and a dot at the center
//   - a label "#<n> <confidence>%" in the top-left corner of the box
//
// The label font is a tiny built-in bitmap so the crate needs no font files.
// The source bytes are never modified; the output is a freshly encoded PNG.

use crate::core_modules::pixel::pixel::hsv_to_rgb;
use crate::core_modules::region::DetectedRegion;
use crate::error::{DetectionError, Result};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

const HUE_STEP_DEGREES: u32 = 60;
const FILL_ALPHA: u8 = 80;
const CENTER_DOT_RADIUS: i32 = 3;
const LABEL_SCALE: u32 = 2;
const LABEL_PADDING: u32 = 2;

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

/// Decodes `image_bytes`, draws `regions` over it and returns the result as PNG bytes.
pub fn create_visualization_mask(image_bytes: &[u8], regions: &[DetectedRegion]) -> Result<Vec<u8>> {
    let source = image::load_from_memory(image_bytes)
        .map_err(|e| DetectionError::decode("input bytes are not a supported image", e))?
        .to_rgba8();
    let rendered = render_visualization(&source, regions);
    encode_png(&rendered)
}

/// Draws `regions` over a half-transparent copy of `source`.
pub fn render_visualization(source: &RgbaImage, regions: &[DetectedRegion]) -> RgbaImage {
    let mut canvas = source.clone();
    for pixel in canvas.pixels_mut() {
        pixel[3] /= 2;
    }

    for (index, region) in regions.iter().enumerate() {
        // Caller-supplied regions may be degenerate; there is no box to draw.
        if region.width == 0 || region.height == 0 {
            continue;
        }
        let color = region_color(index);
        let rect = Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);

        let mut fill = color;
        fill[3] = FILL_ALPHA;
        let mut blended = Blend(canvas);
        draw_filled_rect_mut(&mut blended, rect, fill);
        canvas = blended.0;

        draw_hollow_rect_mut(&mut canvas, rect, color);
        draw_filled_circle_mut(
            &mut canvas,
            (region.center.x as i32, region.center.y as i32),
            CENTER_DOT_RADIUS,
            color,
        );

        let label = format!("#{} {}%", index + 1, region.confidence);
        draw_label(&mut canvas, region.x, region.y, &label, color);
    }

    canvas
}

/// Opaque, fully saturated color for the `index`-th region.
pub fn region_color(index: usize) -> Rgba<u8> {
    let hue = (index as u32 * HUE_STEP_DEGREES) % 360;
    let rgb = hsv_to_rgb(hue as f32, 100.0, 100.0);
    Rgba([rgb.r, rgb.g, rgb.b, 255])
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let encoder = PngEncoder::new(&mut output);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .map_err(|e| DetectionError::encode("visualization could not be written as PNG", e))?;
    Ok(output)
}

/// Draws `text` on a dark backing box whose top-left corner is at `(x, y)`.
fn draw_label(canvas: &mut RgbaImage, x: u32, y: u32, text: &str, color: Rgba<u8>) {
    let advance = (GLYPH_WIDTH + 1) * LABEL_SCALE;
    let box_width = text.chars().count() as u32 * advance + LABEL_PADDING * 2;
    let box_height = GLYPH_HEIGHT * LABEL_SCALE + LABEL_PADDING * 2;
    draw_filled_rect_mut(
        canvas,
        Rect::at(x as i32, y as i32).of_size(box_width, box_height),
        Rgba([0, 0, 0, 200]),
    );

    let mut pen_x = x + LABEL_PADDING;
    let pen_y = y + LABEL_PADDING;
    for ch in text.chars() {
        let rows = glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                let cell = Rect::at(
                    (pen_x + col * LABEL_SCALE) as i32,
                    (pen_y + row as u32 * LABEL_SCALE) as i32,
                )
                .of_size(LABEL_SCALE, LABEL_SCALE);
                draw_filled_rect_mut(canvas, cell, color);
            }
        }
        pen_x += advance;
    }
}

/// 3x5 bitmap rows, most significant of the low three bits is the left column.
fn glyph(ch: char) -> [u8; 5] {
    match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        _ => [0; 5],
    }
}
