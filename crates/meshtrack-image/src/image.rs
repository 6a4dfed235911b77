use crate::error::ImageError;

/// Image size in pixels.
///
/// ```
/// use meshtrack_image::ImageSize;
///
/// let size: ImageSize = [640, 480].into();
/// assert_eq!(size.width, 640);
/// assert_eq!(size.height, 480);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from([width, height]: [usize; 2]) -> Self {
        ImageSize { width, height }
    }
}

/// Dense image with `CHANNELS` interleaved channels, stored row-major as (H, W, C).
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS>
where
    T: Copy,
{
    /// Wrap pixel data of `size`.
    ///
    /// # Errors
    ///
    /// Fails when `data` does not hold exactly `width * height * CHANNELS` values.
    ///
    /// ```
    /// use meshtrack_image::{Image, ImageSize};
    ///
    /// let depth = Image::<f32, 1>::new([4, 2].into(), vec![1.5; 8]).unwrap();
    /// assert_eq!(depth.size(), ImageSize { width: 4, height: 2 });
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        let expected = size.width * size.height * CHANNELS;
        if data.len() != expected {
            return Err(ImageError::InvalidChannelShape(data.len(), expected));
        }
        Ok(Self { size, data })
    }

    /// Image of `size` with every value set to `val`.
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError> {
        Image::new(size, vec![val; size.width * size.height * CHANNELS])
    }

    /// Image whose pixel `(x, y)` is `f(x, y)`.
    pub fn from_fn<F>(size: ImageSize, mut f: F) -> Result<Self, ImageError>
    where
        F: FnMut(usize, usize) -> [T; CHANNELS],
    {
        let data = (0..size.height)
            .flat_map(|y| (0..size.width).map(move |x| (x, y)))
            .flat_map(|(x, y)| f(x, y))
            .collect();
        Image::new(size, data)
    }

    /// Copy one channel out into a single channel image.
    pub fn channel(&self, channel: usize) -> Result<Image<T, 1>, ImageError> {
        if channel >= CHANNELS {
            return Err(ImageError::ChannelIndexOutOfBounds(channel, CHANNELS));
        }
        let data = self
            .data
            .chunks_exact(CHANNELS)
            .map(|pixel| pixel[channel])
            .collect();
        Image::new(self.size, data)
    }

    /// Value of channel `ch` at pixel `(x, y)`.
    pub fn get_pixel(&self, x: usize, y: usize, ch: usize) -> Result<T, ImageError> {
        let ImageSize { width, height } = self.size;
        if x >= width || y >= height {
            return Err(ImageError::PixelIndexOutOfBounds(x, y, width, height));
        }
        if ch >= CHANNELS {
            return Err(ImageError::ChannelIndexOutOfBounds(ch, CHANNELS));
        }
        Ok(self.data[(y * width + x) * CHANNELS + ch])
    }

    /// Size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Number of columns, i.e. the width.
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Number of rows, i.e. the height.
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// The raw interleaved pixel data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The raw interleaved pixel data, mutable.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use crate::image::{Image, ImageError, ImageSize};

    #[test]
    fn image_size() {
        let size = ImageSize::from([10, 20]);
        assert_eq!(size.width, 10);
        assert_eq!(size.height, 20);
        assert_eq!(size.to_string(), "10x20");
    }

    #[test]
    fn image_wrong_data_length() {
        let image = Image::<f32, 1>::new([2, 2].into(), vec![0.0; 3]);
        assert_eq!(image.unwrap_err(), ImageError::InvalidChannelShape(3, 4));
    }

    #[test]
    fn image_from_fn_layout() -> Result<(), ImageError> {
        let image = Image::<f32, 3>::from_fn([2, 2].into(), |x, y| [x as f32, y as f32, 7.0])?;
        assert_eq!(image.cols(), 2);
        assert_eq!(image.rows(), 2);
        assert_eq!(
            image.as_slice(),
            &[0.0, 0.0, 7.0, 1.0, 0.0, 7.0, 0.0, 1.0, 7.0, 1.0, 1.0, 7.0]
        );

        assert_eq!(image.channel(0)?.as_slice(), &[0.0, 1.0, 0.0, 1.0]);
        assert_eq!(image.channel(1)?.as_slice(), &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(
            image.channel(3).unwrap_err(),
            ImageError::ChannelIndexOutOfBounds(3, 3)
        );
        Ok(())
    }

    #[test]
    fn image_get_pixel() -> Result<(), ImageError> {
        let image = Image::<u8, 2>::from_fn([3, 2].into(), |x, y| [(x + 10 * y) as u8, 0])?;
        assert_eq!(image.get_pixel(2, 1, 0)?, 12);
        assert_eq!(image.get_pixel(2, 1, 1)?, 0);
        assert_eq!(
            image.get_pixel(3, 0, 0),
            Err(ImageError::PixelIndexOutOfBounds(3, 0, 3, 2))
        );
        assert_eq!(
            image.get_pixel(0, 0, 2),
            Err(ImageError::ChannelIndexOutOfBounds(2, 2))
        );
        Ok(())
    }
}
