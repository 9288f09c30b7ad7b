use anyhow::anyhow;

use crate::foundation::error::{PlaneviewError, PlaneviewResult};

/// A drawable the renderers present into.
///
/// The renderer never creates the surface. Passing `&mut S` keeps ownership
/// with the caller.
pub trait Surface {
    /// Copies a packed row-major RGBA8 image to the surface at offset (0, 0).
    fn put_image_data(&mut self, rgba: &[u8], width: u32, height: u32) -> PlaneviewResult<()>;
}

impl<S: Surface + ?Sized> Surface for &mut S {
    fn put_image_data(&mut self, rgba: &[u8], width: u32, height: u32) -> PlaneviewResult<()> {
        (**self).put_image_data(rgba, width, height)
    }
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn put_image_data(&mut self, rgba: &[u8], width: u32, height: u32) -> PlaneviewResult<()> {
        (**self).put_image_data(rgba, width, height)
    }
}

/// In-memory RGBA8 surface.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
    presents: u64,
}

impl Canvas {
    /// A transparent canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
            presents: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of successful blits so far.
    pub fn present_count(&self) -> u64 {
        self.presents
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.data[i..i + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn to_image(&self) -> PlaneviewResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| PlaneviewError::Other(anyhow!("canvas buffer does not match its size")))
    }
}

impl Surface for Canvas {
    fn put_image_data(&mut self, rgba: &[u8], width: u32, height: u32) -> PlaneviewResult<()> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(PlaneviewError::Other(anyhow!(
                "image data is {} bytes, expected {expected} for {width}x{height}",
                rgba.len()
            )));
        }
        if width > self.width || height > self.height {
            return Err(PlaneviewError::Other(anyhow!(
                "{width}x{height} image does not fit a {}x{} canvas",
                self.width,
                self.height
            )));
        }

        if rgba.is_empty() {
            return Ok(());
        }

        let src_row = width as usize * 4;
        let dst_row = self.width as usize * 4;
        for (row, src) in rgba.chunks_exact(src_row).enumerate() {
            let start = row * dst_row;
            self.data[start..start + src_row].copy_from_slice(src);
        }
        self.presents += 1;
        Ok(())
    }
}
