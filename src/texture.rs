use std::borrow::Cow;
use std::path::Path;

use image::RgbaImage;
use image::imageops::FilterType;

/// How a texture is sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sampling {
    /// Linear filtering, repeating. Used for panoramas, which wrap around horizontally.
    Wrap,
    /// Linear filtering, clamped to the edge. Used for marker sprites.
    Clamp,
}

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

impl Texture {
    /// Create an sRGB texture from raw RGBA data.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        sampling: Sampling,
        label: &str,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = device.create_texture_with_data(
            queue,
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

        let address_mode = match sampling {
            Sampling::Wrap => wgpu::AddressMode::Repeat,
            Sampling::Clamp => wgpu::AddressMode::ClampToEdge,
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: address_mode,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
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

    /// Upload a decoded image, downscaling it first if it exceeds the
    /// device's texture size limit.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        sampling: Sampling,
        label: &str,
    ) -> Self {
        let image = fit_within(image, device.limits().max_texture_dimension_2d);
        let (width, height) = image.dimensions();
        Self::from_rgba(device, queue, &image, width, height, sampling, label)
    }

    /// Load a texture from an image file.
    pub fn from_file(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        sampling: Sampling,
    ) -> Result<Self, image::ImageError> {
        let img = image::open(path)?.to_rgba8();
        Ok(Self::from_image(
            device,
            queue,
            &img,
            sampling,
            &path.display().to_string(),
        ))
    }

    /// A procedural marker sprite: a white disc with a soft dark rim.
    pub fn dot(device: &wgpu::Device, queue: &wgpu::Queue, size: u32) -> Self {
        let data = dot_pixels(size);
        Self::from_rgba(device, queue, &data, size, size, Sampling::Clamp, "Marker Dot")
    }
}

/// Size of a `width` x `height` image scaled down, keeping its aspect ratio,
/// so neither side exceeds `max_dimension`.
pub(crate) fn fitted_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f64 / longest as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
    (fit(width), fit(height))
}

/// `image`, downscaled if either side exceeds `max_dimension`.
pub(crate) fn fit_within(image: &RgbaImage, max_dimension: u32) -> Cow<'_, RgbaImage> {
    let (width, height) = image.dimensions();
    let (fit_width, fit_height) = fitted_size(width, height, max_dimension);
    if (fit_width, fit_height) == (width, height) {
        return Cow::Borrowed(image);
    }

    log::info!(
        "Downscaling {}x{} image to {}x{}",
        width,
        height,
        fit_width,
        fit_height
    );
    Cow::Owned(image::imageops::resize(
        image,
        fit_width,
        fit_height,
        FilterType::Triangle,
    ))
}

/// RGBA pixels of a `size` x `size` anti-aliased dot.
pub(crate) fn dot_pixels(size: u32) -> Vec<u8> {
    let mut data = vec![0u8; (size * size * 4) as usize];
    let center = size as f32 / 2.0;
    let radius = center - 1.0;
    let rim = radius * 0.8;

    for y in 0..size {
        for x in 0..size {
            let idx = ((y * size + x) * 4) as usize;
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let d = (dx * dx + dy * dy).sqrt();

            let alpha = (radius - d + 0.5).clamp(0.0, 1.0);
            let shade = if d < rim { 255 } else { 60 };

            data[idx] = shade;
            data[idx + 1] = shade;
            data[idx + 2] = shade;
            data[idx + 3] = (alpha * 230.0) as u8;
        }
    }

    data
}
