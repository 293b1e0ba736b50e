use tracing::debug;

use crate::error::LoadError;
use crate::loader::{DecodedImage, TextureFactory, TextureKind};

/// An uploaded texture together with the sampler it is always read through.
pub struct GpuTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

/// Uploads decoded images on the engine's device.
pub struct WgpuTextureFactory {
    device: wgpu::Device,
    queue: wgpu::Queue,
    max_dimension: u32,
}

impl WgpuTextureFactory {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            max_dimension: device.limits().max_texture_dimension_2d,
        }
    }
}

impl TextureFactory for WgpuTextureFactory {
    type Texture = GpuTexture;

    fn create(
        &self,
        label: &str,
        image: &DecodedImage,
        kind: TextureKind,
    ) -> Result<GpuTexture, LoadError> {
        let (w, h) = (image.width, image.height);
        if w == 0 || h == 0 {
            return Err(LoadError::upload(label, "image has no pixels"));
        }
        if w > self.max_dimension || h > self.max_dimension {
            return Err(LoadError::upload(
                label,
                format!("{w}x{h} exceeds the device limit of {}", self.max_dimension),
            ));
        }
        let expected = 4 * w as usize * h as usize;
        if image.pixels.len() != expected {
            return Err(LoadError::upload(
                label,
                format!("expected {expected} bytes of RGBA8, got {}", image.pixels.len()),
            ));
        }

        // Displacement maps hold data, not colour: keep them linear.
        let format = match kind {
            TextureKind::Slide => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureKind::Displacement => wgpu::TextureFormat::Rgba8Unorm,
        };
        let size = wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            texture.as_image_copy(),
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            size,
        );

        let address_mode = match kind {
            TextureKind::Slide => wgpu::AddressMode::ClampToEdge,
            TextureKind::Displacement => wgpu::AddressMode::Repeat,
        };
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        debug!(label, width = w, height = h, ?kind, "texture uploaded");

        Ok(GpuTexture {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            _texture: texture,
            sampler,
            width: w,
            height: h,
        })
    }
}
