//! One level of a frame's image pyramid, with precomputed gradients.
use meshtrack_image::{GradientImage, Image, ImageError, ImageSize};

/// Gray, color, depth and depth-normal images of one pyramid level.
///
/// Every present image shares the size of the gray image.
#[derive(Debug, Clone)]
pub struct ImageLevel {
    gray: GradientImage,
    color: Option<[GradientImage; 3]>,
    depth: Option<GradientImage>,
    depth_normals: Option<[GradientImage; 3]>,
}

fn split3(image: &Image<f32, 3>) -> Result<[GradientImage; 3], ImageError> {
    Ok([
        GradientImage::from_image(image.channel(0)?)?,
        GradientImage::from_image(image.channel(1)?)?,
        GradientImage::from_image(image.channel(2)?)?,
    ])
}

impl ImageLevel {
    /// Create a level from its gray image; gradients are computed here.
    pub fn from_gray(gray: Image<f32, 1>) -> Result<Self, ImageError> {
        Ok(Self {
            gray: GradientImage::from_image(gray)?,
            color: None,
            depth: None,
            depth_normals: None,
        })
    }

    fn check_size(&self, size: ImageSize) -> Result<(), ImageError> {
        let expected = self.size();
        if size != expected {
            return Err(ImageError::InvalidImageSize(
                size.width,
                size.height,
                expected.width,
                expected.height,
            ));
        }
        Ok(())
    }

    /// Attach a 3 channel color image, split into per channel gradient images.
    pub fn with_color(mut self, color: &Image<f32, 3>) -> Result<Self, ImageError> {
        self.check_size(color.size())?;
        self.color = Some(split3(color)?);
        Ok(self)
    }

    /// Attach a depth image.
    pub fn with_depth(mut self, depth: Image<f32, 1>) -> Result<Self, ImageError> {
        self.check_size(depth.size())?;
        self.depth = Some(GradientImage::from_image(depth)?);
        Ok(self)
    }

    /// Attach per pixel surface normals of the depth image.
    pub fn with_depth_normals(mut self, normals: &Image<f32, 3>) -> Result<Self, ImageError> {
        self.check_size(normals.size())?;
        self.depth_normals = Some(split3(normals)?);
        Ok(self)
    }

    pub fn size(&self) -> ImageSize {
        self.gray.size()
    }

    pub fn gray(&self) -> &GradientImage {
        &self.gray
    }

    pub fn color(&self) -> Option<&[GradientImage; 3]> {
        self.color.as_ref()
    }

    pub fn depth(&self) -> Option<&GradientImage> {
        self.depth.as_ref()
    }

    pub fn depth_normals(&self) -> Option<&[GradientImage; 3]> {
        self.depth_normals.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_level() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 6,
            height: 4,
        };
        let level = ImageLevel::from_gray(Image::from_size_val(size, 0.5)?)?
            .with_color(&Image::from_fn(size, |x, y| {
                [x as f32, y as f32, 1.0]
            })?)?
            .with_depth(Image::from_size_val(size, 2.0)?)?;

        assert_eq!(level.size(), size);
        assert!(level.depth_normals().is_none());
        let color = level.color().expect("color attached");
        assert_eq!(color[0].image().get_pixel(3, 1, 0)?, 3.0);
        assert_eq!(color[1].image().get_pixel(3, 1, 0)?, 1.0);
        assert_eq!(level.depth().map(|d| d.sample(1.0, 1.0).value), Some(2.0));
        Ok(())
    }

    #[test]
    fn test_size_mismatch() -> Result<(), ImageError> {
        let level = ImageLevel::from_gray(Image::from_size_val([6, 4].into(), 0.0)?)?;
        let err = level
            .with_depth(Image::from_size_val([5, 4].into(), 0.0)?)
            .unwrap_err();
        assert_eq!(err, ImageError::InvalidImageSize(5, 4, 6, 4));
        Ok(())
    }
}
