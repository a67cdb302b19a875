//! Raster overlays for figure artifacts.
//!
//! Labeled copies composite a filled box and the group letter in the
//! image's top-left corner; geometry scales with the raster's own
//! pixel dimensions so the label stays legible on any artifact size.
//! Text is rasterized from the 8x8 bitmap font, scaled by integer
//! factors. Labeled copies go to scratch files; the artifact directory
//! is never written to.

use crate::error::Result;
use crate::utils::create_label;
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

const GLYPH_SIZE: i32 = 8;

const BOX_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Writes a copy of the image at `image_path` with the letter label for
/// `index` composited into its top-left corner, returning the path of
/// the scratch copy.
pub fn label_image(image_path: &Path, index: usize) -> Result<PathBuf> {
    let label = create_label(index);
    let mut img = image::open(image_path)?.to_rgba8();
    let (width, height) = img.dimensions();

    let base = width.min(height) as f64;
    let scale = ((base * 0.04 / GLYPH_SIZE as f64).round() as u32).max(2);
    let inset = (base * 0.01).max(4.0) as i32;

    let text_width = label.chars().count() as i32 * GLYPH_SIZE * scale as i32;
    let text_height = GLYPH_SIZE * scale as i32;
    let pad = scale as i32 * 2;

    fill_rect(
        &mut img,
        inset,
        inset,
        inset + text_width + 2 * pad,
        inset + text_height + 2 * pad,
        BOX_FILL,
    );
    draw_bitmap_text(&mut img, inset + pad, inset + pad, &label, INK, scale);

    let scratch = tempfile::Builder::new()
        .prefix("labeled-")
        .suffix(".png")
        .tempfile()?;
    let (_, path) = scratch.keep().map_err(|e| e.error)?;
    img.save(&path)?;

    Ok(path)
}

/// Stamps `source: <source_path>` along the bottom-left edge of the
/// image, in place. Font size scales with the smaller image dimension.
pub fn overlay_source_path(image_path: &Path, source_path: &str) -> Result<()> {
    let mut img = image::open(image_path)?.to_rgba8();
    let (width, height) = img.dimensions();

    let base = width.min(height) as f64;
    let scale = ((base * 0.02 / GLYPH_SIZE as f64).round() as u32).max(1);
    let padding = 10;

    let text = format!("source: {}", source_path);
    let y = height as i32 - padding - GLYPH_SIZE * scale as i32;
    draw_bitmap_text(&mut img, padding, y, &text, INK, scale);

    img.save(image_path)?;
    Ok(())
}

fn fill_rect(img: &mut RgbaImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    let (width, height) = img.dimensions();
    for y in y0.max(0)..y1.min(height as i32) {
        for x in x0.max(0)..x1.min(width as i32) {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn draw_bitmap_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: u32) {
    let scale = scale.max(1) as i32;
    let mut cursor_x = x;

    for ch in text.chars() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += GLYPH_SIZE * scale;
            continue;
        };
        for (row_index, row) in glyph.iter().enumerate() {
            let bits = *row;
            for col_index in 0..GLYPH_SIZE {
                if (bits >> col_index) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col_index * scale;
                let py = y + row_index as i32 * scale;
                fill_rect(img, px, py, px + scale, py + scale, color);
            }
        }
        cursor_x += GLYPH_SIZE * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let img = RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_label_image_writes_scratch_copy_with_box() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_test_image(dir.path(), "fig.png", 400, 300);

        let labeled = label_image(&source, 0).unwrap();
        assert_ne!(labeled, source);
        assert!(labeled.exists());

        let img = image::open(&labeled).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (400, 300));
        // the corner box is white, the far corner untouched
        assert_eq!(*img.get_pixel(6, 6), Rgba([255, 255, 255, 255]));
        assert_eq!(*img.get_pixel(399, 299), Rgba([40, 80, 120, 255]));

        std::fs::remove_file(labeled).unwrap();
    }

    #[test]
    fn test_label_geometry_scales_with_image_size() {
        let dir = tempfile::tempdir().unwrap();
        let small = write_test_image(dir.path(), "small.png", 100, 100);
        let large = write_test_image(dir.path(), "large.png", 2000, 2000);

        let small_labeled = label_image(&small, 1).unwrap();
        let large_labeled = label_image(&large, 1).unwrap();

        let small_img = image::open(&small_labeled).unwrap().to_rgba8();
        let large_img = image::open(&large_labeled).unwrap().to_rgba8();

        // count white pixels as a proxy for box area
        let white = |img: &RgbaImage| img.pixels().filter(|p| p.0 == [255, 255, 255, 255]).count();
        assert!(white(&large_img) > white(&small_img) * 4);

        std::fs::remove_file(small_labeled).unwrap();
        std::fs::remove_file(large_labeled).unwrap();
    }

    #[test]
    fn test_overlay_source_path_edits_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "fig.png", 300, 200);

        overlay_source_path(&path, "scripts/plot.R").unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        // some ink landed along the bottom-left edge
        let inked = img
            .enumerate_pixels()
            .filter(|&(_, y, p)| y > 150 && p.0 == [0, 0, 0, 255])
            .count();
        assert!(inked > 0);
    }
}
