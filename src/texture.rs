use std::path::Path;

use glam::Vec3;

use crate::geometry::ImageData;
use crate::gpu::GpuContext;
use crate::renderer::RenderError;

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

/// An equirectangular panorama ready for upload, with its mean radiance.
#[derive(Debug, Clone)]
pub struct Panorama {
    pub width: u32,
    pub height: u32,
    /// Tone-mapped, gamma-encoded RGBA8.
    pub rgba: Vec<u8>,
    /// Average linear radiance before tone mapping.
    pub mean_radiance: Vec3,
}

impl Panorama {
    /// Tone-map linear RGB floats (Reinhard) into displayable bytes.
    pub fn from_linear(width: u32, height: u32, rgb: &[f32]) -> Self {
        let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;

        for px in rgb.chunks_exact(3) {
            let linear = Vec3::new(px[0], px[1], px[2]).max(Vec3::ZERO);
            sum += linear;
            count += 1;

            let mapped = linear / (Vec3::ONE + linear);
            for c in mapped.to_array() {
                rgba.push((c.powf(1.0 / 2.2) * 255.0).round().clamp(0.0, 255.0) as u8);
            }
            rgba.push(255);
        }

        let mean_radiance = if count == 0 {
            Vec3::ZERO
        } else {
            sum / count as f32
        };

        Self {
            width,
            height,
            rgba,
            mean_radiance,
        }
    }

    /// Decode any format the `image` crate reads, HDR included.
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        let img = image::open(path)
            .map_err(|source| RenderError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb32f();
        let (width, height) = img.dimensions();
        Ok(Self::from_linear(width, height, img.as_raw()))
    }
}

impl Texture {
    /// Create a texture from raw sRGB RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    pub fn from_image(gpu: &GpuContext, image: &ImageData, label: &str) -> Self {
        Self::from_rgba(gpu, &image.rgba, image.width, image.height, label)
    }

    pub fn from_panorama(gpu: &GpuContext, panorama: &Panorama, label: &str) -> Self {
        Self::from_rgba(gpu, &panorama.rgba, panorama.width, panorama.height, label)
    }

    /// Load a texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: &Path) -> Result<Self, RenderError> {
        let img = image::open(path)
            .map_err(|source| RenderError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(
            gpu,
            &img,
            width,
            height,
            &path.display().to_string(),
        ))
    }

    /// A 1x1 opaque white texture, bound when a material has none.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::from_rgba(gpu, &[255, 255, 255, 255], 1, 1, "White Texture")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panorama_tone_maps_and_averages() {
        // black pixel and a radiance-1 pixel
        let pano = Panorama::from_linear(2, 1, &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(pano.rgba.len(), 8);
        assert_eq!(&pano.rgba[0..4], &[0, 0, 0, 255]);
        // 1 / (1 + 1) = 0.5, gamma encoded
        let expected = (0.5f32.powf(1.0 / 2.2) * 255.0).round() as u8;
        assert_eq!(pano.rgba[4], expected);
        assert_eq!(pano.mean_radiance, Vec3::splat(0.5));
    }

    #[test]
    fn negative_radiance_is_clamped() {
        let pano = Panorama::from_linear(1, 1, &[-3.0, 0.0, 0.0]);
        assert_eq!(pano.rgba[0], 0);
        assert_eq!(pano.mean_radiance, Vec3::ZERO);
    }

    #[test]
    fn missing_panorama_is_an_image_error() {
        let err = Panorama::open(Path::new("/nonexistent/sky.hdr")).unwrap_err();
        assert!(matches!(err, RenderError::Image { .. }));
    }
}
