use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use crate::{Image, ImageError};

/// Normalized 3x3 Sobel kernels, (kernel_x, kernel_y) stored row-major.
///
/// The normalization makes the response of a linear ramp equal to its slope in pixels.
fn normalized_sobel_kernel3() -> ([f32; 9], [f32; 9]) {
    (
        [
            -1.0 / 8.0,
            0.0,
            1.0 / 8.0,
            -2.0 / 8.0,
            0.0,
            2.0 / 8.0,
            -1.0 / 8.0,
            0.0,
            1.0 / 8.0,
        ],
        [
            -1.0 / 8.0,
            -2.0 / 8.0,
            -1.0 / 8.0,
            0.0,
            0.0,
            0.0,
            1.0 / 8.0,
            2.0 / 8.0,
            1.0 / 8.0,
        ],
    )
}

/// Compute the first order image derivative in both x and y using a normalized Sobel operator.
///
/// Borders are handled with replicate padding. Rows are processed in parallel.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dx` - The destination x derivative with shape (H, W, C).
/// * `dy` - The destination y derivative with shape (H, W, C).
///
/// PRECONDITION: `src`, `dx` and `dy` must have the same shape.
pub fn spatial_gradient_float<const C: usize>(
    src: &Image<f32, C>,
    dx: &mut Image<f32, C>,
    dy: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    if src.size() != dx.size() {
        return Err(ImageError::InvalidImageSize(
            dx.cols(),
            dx.rows(),
            src.cols(),
            src.rows(),
        ));
    }

    if src.size() != dy.size() {
        return Err(ImageError::InvalidImageSize(
            dy.cols(),
            dy.rows(),
            src.cols(),
            src.rows(),
        ));
    }

    let (rows, cols) = (src.rows(), src.cols());
    if rows == 0 || cols == 0 {
        return Err(ImageError::EmptyImage(cols, rows));
    }

    let (sobel_x, sobel_y) = normalized_sobel_kernel3();
    let src_data = src.as_slice();

    dx.as_slice_mut()
        .par_chunks_mut(cols * C)
        .zip(dy.as_slice_mut().par_chunks_mut(cols * C))
        .enumerate()
        .for_each(|(r, (dx_row, dy_row))| {
            // replicate padding
            let row_idx = [r.max(1) - 1, r, (r + 1).min(rows - 1)];
            for c in 0..cols {
                let col_idx = [c.max(1) - 1, c, (c + 1).min(cols - 1)];
                for ch in 0..C {
                    let mut sum_x = 0.0;
                    let mut sum_y = 0.0;
                    for (ky, &yy) in row_idx.iter().enumerate() {
                        for (kx, &xx) in col_idx.iter().enumerate() {
                            let val = src_data[(yy * cols + xx) * C + ch];
                            sum_x += sobel_x[ky * 3 + kx] * val;
                            sum_y += sobel_y[ky * 3 + kx] * val;
                        }
                    }
                    dx_row[c * C + ch] = sum_x;
                    dy_row[c * C + ch] = sum_y;
                }
            }
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImageSize;
    use approx::assert_relative_eq;

    #[test]
    fn test_spatial_gradient_ramp() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 6,
            height: 5,
        };
        let src = Image::<f32, 1>::from_fn(size, |x, y| [2.0 * x as f32 - 0.5 * y as f32])?;
        let mut dx = Image::<f32, 1>::from_size_val(size, 0.0)?;
        let mut dy = Image::<f32, 1>::from_size_val(size, 0.0)?;

        spatial_gradient_float(&src, &mut dx, &mut dy)?;

        for y in 1..size.height - 1 {
            for x in 1..size.width - 1 {
                assert_relative_eq!(dx.get_pixel(x, y, 0)?, 2.0, epsilon = 1e-6);
                assert_relative_eq!(dy.get_pixel(x, y, 0)?, -0.5, epsilon = 1e-6);
            }
        }

        // replicate padding halves the response on the border
        assert_relative_eq!(dx.get_pixel(0, 2, 0)?, 1.0, epsilon = 1e-6);
        assert_relative_eq!(dy.get_pixel(2, 0, 0)?, -0.25, epsilon = 1e-6);

        Ok(())
    }

    #[test]
    fn test_spatial_gradient_constant_multichannel() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 3,
        };
        let src = Image::<f32, 3>::from_size_val(size, 5.0)?;
        let mut dx = Image::<f32, 3>::from_size_val(size, 1.0)?;
        let mut dy = Image::<f32, 3>::from_size_val(size, 1.0)?;

        spatial_gradient_float(&src, &mut dx, &mut dy)?;

        assert!(dx.as_slice().iter().all(|v| v.abs() < 1e-6));
        assert!(dy.as_slice().iter().all(|v| v.abs() < 1e-6));

        Ok(())
    }

    #[test]
    fn test_spatial_gradient_size_mismatch() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([4, 3].into(), 0.0)?;
        let mut dx = Image::<f32, 1>::from_size_val([4, 2].into(), 0.0)?;
        let mut dy = Image::<f32, 1>::from_size_val([4, 3].into(), 0.0)?;

        assert_eq!(
            spatial_gradient_float(&src, &mut dx, &mut dy),
            Err(ImageError::InvalidImageSize(4, 2, 4, 3))
        );

        Ok(())
    }
}
