use crate::{gradient::spatial_gradient_float, Image, ImageError, ImageSize};

/// Kernel for bilinear interpolation
///
/// Coordinates are clamped to the image domain, so samples on the last row or column
/// replicate the border pixel. An empty image samples as zero.
///
/// # Arguments
///
/// * `image` - The input image container.
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
///
/// # Returns
///
/// The interpolated pixel values.
pub fn bilinear_interpolation<const C: usize>(image: &Image<f32, C>, u: f64, v: f64) -> [f64; C] {
    let (rows, cols) = (image.rows(), image.cols());
    if rows == 0 || cols == 0 {
        return [0.0; C];
    }

    let u = u.max(0.0);
    let v = v.max(0.0);

    let iu0 = (u.trunc() as usize).min(cols - 1);
    let iv0 = (v.trunc() as usize).min(rows - 1);

    let frac_u = u.fract();
    let frac_v = v.fract();

    let frac_uu = 1.0 - frac_u;
    let frac_vv = 1.0 - frac_v;

    let w00 = frac_uu * frac_vv;
    let w01 = frac_u * frac_vv;
    let w10 = frac_uu * frac_v;
    let w11 = frac_u * frac_v;

    let iu1 = if iu0 + 1 < cols { iu0 + 1 } else { iu0 };
    let iv1 = if iv0 + 1 < rows { iv0 + 1 } else { iv0 };

    let base00 = (iv0 * cols + iu0) * C;
    let base01 = (iv0 * cols + iu1) * C;
    let base10 = (iv1 * cols + iu0) * C;
    let base11 = (iv1 * cols + iu1) * C;

    let data = image.as_slice();

    let mut pixel = [0.0; C];
    for (k, out) in pixel.iter_mut().enumerate() {
        *out = data[base00 + k] as f64 * w00
            + data[base01 + k] as f64 * w01
            + data[base10 + k] as f64 * w10
            + data[base11 + k] as f64 * w11;
    }

    pixel
}

/// A sub-pixel sample of an image together with its spatial derivative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Interpolated value.
    pub value: f64,
    /// Derivative of the value with respect to the x (column) coordinate.
    pub du: f64,
    /// Derivative of the value with respect to the y (row) coordinate.
    pub dv: f64,
}

/// A single channel image stored together with its precomputed x and y gradients.
#[derive(Debug, Clone)]
pub struct GradientImage {
    image: Image<f32, 1>,
    grad_x: Image<f32, 1>,
    grad_y: Image<f32, 1>,
}

impl GradientImage {
    /// Wrap `image` and compute its gradients with a normalized Sobel operator.
    pub fn from_image(image: Image<f32, 1>) -> Result<Self, ImageError> {
        let mut grad_x = Image::from_size_val(image.size(), 0.0)?;
        let mut grad_y = Image::from_size_val(image.size(), 0.0)?;
        spatial_gradient_float(&image, &mut grad_x, &mut grad_y)?;
        Ok(Self {
            image,
            grad_x,
            grad_y,
        })
    }

    /// Build from an image and externally computed gradients.
    pub fn from_parts(
        image: Image<f32, 1>,
        grad_x: Image<f32, 1>,
        grad_y: Image<f32, 1>,
    ) -> Result<Self, ImageError> {
        for grad in [&grad_x, &grad_y] {
            if grad.size() != image.size() {
                return Err(ImageError::InvalidImageSize(
                    grad.cols(),
                    grad.rows(),
                    image.cols(),
                    image.rows(),
                ));
            }
        }
        Ok(Self {
            image,
            grad_x,
            grad_y,
        })
    }

    /// Size of the underlying image.
    pub fn size(&self) -> ImageSize {
        self.image.size()
    }

    /// The image values.
    pub fn image(&self) -> &Image<f32, 1> {
        &self.image
    }

    /// The x gradient image.
    pub fn grad_x(&self) -> &Image<f32, 1> {
        &self.grad_x
    }

    /// The y gradient image.
    pub fn grad_y(&self) -> &Image<f32, 1> {
        &self.grad_y
    }

    /// Sample the value and its derivative at `(u, v)`.
    ///
    /// The value and both derivatives are bilinearly interpolated from their own images.
    pub fn sample(&self, u: f64, v: f64) -> Sample {
        let [value] = bilinear_interpolation(&self.image, u, v);
        let [du] = bilinear_interpolation(&self.grad_x, u, v);
        let [dv] = bilinear_interpolation(&self.grad_y, u, v);
        Sample { value, du, dv }
    }
}
