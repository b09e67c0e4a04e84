use anyhow::{Context, Result};
use image::RgbaImage;

use crate::render::{RenderCtx, RenderTarget};
use crate::shader::ShaderContext;

/// Format of the offscreen target snapshots render into.
pub const CAPTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const BYTES_PER_PIXEL: u32 = 4;

/// Renders the frame recorded in `shader` offscreen and reads it back.
///
/// Blocks until the GPU has finished the copy.
pub fn capture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    shader: &mut ShaderContext,
    width: u32,
    height: u32,
) -> Result<RgbaImage> {
    anyhow::ensure!(width > 0 && height > 0, "cannot capture a {width}x{height} frame");

    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("quadtoy snapshot target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: CAPTURE_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let padded_row = padded_bytes_per_row(width);
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("quadtoy snapshot readback"),
        size: u64::from(padded_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("quadtoy snapshot encoder"),
    });

    {
        let rctx = RenderCtx::new(device, queue, CAPTURE_FORMAT);
        let mut target = RenderTarget::new(&mut encoder, &view, (width, height));
        shader.flush(&rctx, &mut target);
    }

    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        extent,
    );

    queue.submit(Some(encoder.finish()));

    let slice = readback.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .context("device poll failed during snapshot readback")?;
    rx.recv()
        .context("snapshot readback was never mapped")?
        .context("failed to map snapshot readback buffer")?;

    let pixels = {
        let mapped = slice.get_mapped_range();
        unpad_rows(&mapped, width, height, padded_row)
    };
    readback.unmap();

    RgbaImage::from_raw(width, height, pixels).context("snapshot readback has the wrong size")
}

/// Row pitch for texture copies, rounded up to the copy alignment.
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    unpadded.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Strips the per-row padding of a texture copy.
fn unpad_rows(data: &[u8], width: u32, height: u32, padded_row: u32) -> Vec<u8> {
    let row = (width * BYTES_PER_PIXEL) as usize;
    let mut out = Vec::with_capacity(row * height as usize);
    for chunk in data.chunks(padded_row as usize).take(height as usize) {
        out.extend_from_slice(&chunk[..row]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn unpad_keeps_only_pixel_bytes() {
        // Two rows of one pixel each, padded to 8 bytes.
        let data = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0];
        assert_eq!(unpad_rows(&data, 1, 2, 8), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn empty_capture_is_rejected() {
        let Some((device, queue)) = crate::device::headless::device() else {
            return;
        };
        let mut shader = crate::shader::FullscreenShader::new(
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
            Default::default(),
            0,
            0,
        )
        .unwrap();
        assert!(capture(&device, &queue, shader.context_mut(), 0, 4).is_err());
    }
}
