use ndarray::{ArrayView3, ArrayViewMut3};

use super::bounding_box::BoundingBox;

/// A single camera frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at capture boundaries only; the pipeline
/// treats pixel data as opaque except where a stage explicitly samples it.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A zero-area frame, used for crops that fall entirely outside the image.
    pub fn empty(channels: u8, index: usize) -> Self {
        Self::new(Vec::new(), 0, 0, channels, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// True when the buffer length agrees with the declared geometry.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == (self.width as usize) * (self.height as usize) * (self.channels as usize)
    }

    /// Copies the pixels inside `bbox`, clamped to the frame bounds.
    ///
    /// A box that lies outside the frame yields an empty frame rather
    /// than an error.
    pub fn crop(&self, bbox: &BoundingBox) -> Frame {
        let clamped = bbox.clamp_to(self.width, self.height);
        if !clamped.is_valid() || !self.is_well_formed() {
            return Frame::empty(self.channels, self.index);
        }

        let ch = self.channels as usize;
        let stride = self.width as usize * ch;
        let x1 = clamped.x1 as usize;
        let x2 = clamped.x2 as usize;
        let crop_w = x2 - x1;
        let crop_h = (clamped.y2 - clamped.y1) as usize;

        let mut data = Vec::with_capacity(crop_w * crop_h * ch);
        for row in clamped.y1 as usize..clamped.y2 as usize {
            let start = row * stride + x1 * ch;
            data.extend_from_slice(&self.data[start..start + crop_w * ch]);
        }
        Frame::new(data, crop_w as u32, crop_h as u32, self.channels, self.index)
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(data, width, height, 3, 7)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, R
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_crop_copies_inner_pixels() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&BoundingBox::new(2, 3, 5, 6));

        assert_eq!(crop.width(), 3);
        assert_eq!(crop.height(), 3);
        assert_eq!(crop.index(), 7);
        let arr = crop.as_ndarray();
        assert_eq!(arr[[0, 0, 0]], 2); // x
        assert_eq!(arr[[0, 0, 1]], 3); // y
        assert_eq!(arr[[2, 2, 0]], 4);
        assert_eq!(arr[[2, 2, 1]], 5);
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&BoundingBox::new(-5, -5, 4, 3));
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 3);
    }

    #[test]
    fn test_crop_outside_frame_is_empty() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&BoundingBox::new(20, 20, 30, 30));
        assert!(crop.is_empty());
        assert_eq!(crop.data().len(), 0);
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::empty(3, 0);
        assert!(frame.is_empty());
        assert!(frame.is_well_formed());
    }

    #[test]
    fn test_with_index_replaces_index() {
        let frame = gradient_frame(2, 2).with_index(42);
        assert_eq!(frame.index(), 42);
    }
}
