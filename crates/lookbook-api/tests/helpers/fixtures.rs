//! Test fixtures

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

/// A small valid PNG the preprocessor can decode.
pub fn create_test_png() -> Vec<u8> {
    let img = RgbaImage::from_pixel(32, 32, Rgba([180, 60, 60, 255]));
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    img.write_to(&mut cursor, ImageFormat::Png).unwrap();
    buffer
}

/// The wire-format garment array from the model, one t-shirt.
pub const SINGLE_GARMENT_REPLY: &str = r#"[{"type":"t-shirt","color":"noir","style":"casual","brand":"nike","suggestedBrands":["nike","adidas","puma"]}]"#;

/// Three garments; used by the partial-persistence tests.
pub const THREE_GARMENT_REPLY: &str = r#"[
  {"type":"t-shirt","color":"white","style":"casual","brand":"nike","suggestedBrands":["nike","adidas","puma"]},
  {"type":"jeans","color":"blue","style":"streetwear","brand":"unknown","suggestedBrands":["zara","levi's","bershka"]},
  {"type":"sneakers","color":"white","style":"sport","brand":"adidas","suggestedBrands":["adidas","nike","new balance"]}
]"#;
