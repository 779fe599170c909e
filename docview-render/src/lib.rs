use anyhow::{anyhow, Result};
use docview_core::RasterImage;
use image::RgbaImage;

#[cfg(feature = "pdf")]
mod info;
mod ocr;
#[cfg(feature = "pdf")]
mod pdfium;

pub use ocr::{TesseractOcr, ToolError, UnoconvExporter};
#[cfg(feature = "pdf")]
pub use pdfium::PdfiumRenderFactory;

#[cfg(feature = "pdf")]
pub type PdfRenderFactory = PdfiumRenderFactory;

/// Copies a session raster into an `image` buffer for encoding.
pub fn to_rgba_image(raster: &RasterImage) -> Result<RgbaImage> {
    RgbaImage::from_raw(raster.width, raster.height, raster.pixels.clone()).ok_or_else(|| {
        anyhow!(
            "raster buffer of {} bytes does not match {}x{}",
            raster.pixels.len(),
            raster.width,
            raster.height
        )
    })
}

#[cfg_attr(not(feature = "pdf"), allow(dead_code))]
pub(crate) fn invert_pixels(pixels: &mut [u8]) {
    for chunk in pixels.chunks_exact_mut(4) {
        chunk[0] = 255 - chunk[0];
        chunk[1] = 255 - chunk[1];
        chunk[2] = 255 - chunk[2];
    }
}
