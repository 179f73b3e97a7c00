use crate::gpu::GpuContext;
use crate::renderer::RenderError;
use fontdue::{Font, FontSettings};
use std::collections::HashMap;
use std::path::Path;

/// Information about a single glyph in the font atlas.
#[derive(Clone, Copy, Debug)]
pub struct GlyphInfo {
    /// UV coordinates in the atlas (x, y, width, height) normalized to [0, 1].
    pub uv: [f32; 4],
    /// Size of the glyph in pixels.
    pub width: u32,
    pub height: u32,
    /// Offset from the cursor position to where the glyph should be drawn.
    pub offset_x: f32,
    pub offset_y: f32,
    /// How far to advance the cursor after this glyph.
    pub advance: f32,
}

/// Characters rasterized up front: printable ASCII, Latin-1 and the
/// typographic punctuation the exhibition texts use.
fn charset() -> impl Iterator<Item = char> {
    (32u8..=126u8)
        .map(char::from)
        .chain((0xA0u8..=0xFFu8).map(char::from))
        .chain(['‘', '’', '“', '”', '–', '—', '…', '€'])
}

/// Row-pack glyph rectangles, doubling the smaller atlas side until all fit.
///
/// Returns the atlas size and the top-left corner of each rectangle.
pub(crate) fn pack_glyphs(sizes: &[(u32, u32)], padding: u32) -> ((u32, u32), Vec<(u32, u32)>) {
    let mut atlas_width = 512u32;
    let mut atlas_height = 512u32;

    loop {
        let mut x = padding;
        let mut y = padding;
        let mut row_height = 0u32;
        let mut positions = Vec::with_capacity(sizes.len());
        let mut fits = true;

        for &(w, h) in sizes {
            if x + w + padding > atlas_width {
                x = padding;
                y += row_height + padding;
                row_height = 0;
            }

            if y + h + padding > atlas_height || w + 2 * padding > atlas_width {
                fits = false;
                break;
            }

            positions.push((x, y));
            x += w + padding;
            row_height = row_height.max(h);
        }

        if fits {
            return ((atlas_width, atlas_height), positions);
        }

        // Double the smaller dimension
        if atlas_width <= atlas_height {
            atlas_width *= 2;
        } else {
            atlas_height *= 2;
        }
    }
}

/// Greedy word wrap. Explicit newlines always break; a word wider than
/// `max_width` gets a line of its own.
pub fn wrap_lines(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if measure(&candidate) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            }
        }
        lines.push(line);
    }

    lines
}

/// A font atlas containing pre-rasterized glyphs.
pub struct FontAtlas {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    glyphs: HashMap<char, GlyphInfo>,
    size: f32,
    line_height: f32,
}

impl FontAtlas {
    /// Load a TTF/OTF file and rasterize it at `size` pixels.
    pub fn load(gpu: &GpuContext, path: &Path, size: f32) -> Result<Self, RenderError> {
        let data = std::fs::read(path).map_err(|source| RenderError::FontIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(gpu, &data, size).map_err(|message| RenderError::Font {
            path: path.to_path_buf(),
            message: message.to_string(),
        })
    }

    /// Create a new font atlas from TTF/OTF data.
    pub fn new(gpu: &GpuContext, font_data: &[u8], size: f32) -> Result<Self, &'static str> {
        let font = Font::from_bytes(font_data, FontSettings::default())?;

        let rasterized: Vec<(char, fontdue::Metrics, Vec<u8>)> = charset()
            .filter(|&c| font.lookup_glyph_index(c) != 0 || c == ' ')
            .map(|c| {
                let (metrics, bitmap) = font.rasterize(c, size);
                (c, metrics, bitmap)
            })
            .collect();

        let sizes: Vec<(u32, u32)> = rasterized
            .iter()
            .map(|(_, m, _)| (m.width as u32, m.height as u32))
            .collect();
        let ((atlas_width, atlas_height), positions) = pack_glyphs(&sizes, 1);

        let mut atlas_data = vec![0u8; (atlas_width * atlas_height) as usize];
        let mut glyphs = HashMap::new();

        for ((c, metrics, bitmap), &(x, y)) in rasterized.iter().zip(&positions) {
            let glyph_w = metrics.width as u32;
            let glyph_h = metrics.height as u32;

            for gy in 0..glyph_h {
                let src = (gy * glyph_w) as usize;
                let dst = ((y + gy) * atlas_width + x) as usize;
                atlas_data[dst..dst + glyph_w as usize]
                    .copy_from_slice(&bitmap[src..src + glyph_w as usize]);
            }

            glyphs.insert(
                *c,
                GlyphInfo {
                    uv: [
                        x as f32 / atlas_width as f32,
                        y as f32 / atlas_height as f32,
                        glyph_w as f32 / atlas_width as f32,
                        glyph_h as f32 / atlas_height as f32,
                    ],
                    width: glyph_w,
                    height: glyph_h,
                    offset_x: metrics.xmin as f32,
                    offset_y: metrics.ymin as f32,
                    advance: metrics.advance_width,
                },
            );
        }

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Font Atlas"),
            size: wgpu::Extent3d {
                width: atlas_width,
                height: atlas_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas_data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(atlas_width),
                rows_per_image: Some(atlas_height),
            },
            wgpu::Extent3d {
                width: atlas_width,
                height: atlas_height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Font Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let line_height = font
            .horizontal_line_metrics(size)
            .map(|m| m.new_line_size)
            .unwrap_or(size * 1.2);

        tracing::debug!(
            "Font atlas {}x{} with {} glyphs at {}px",
            atlas_width,
            atlas_height,
            glyphs.len(),
            size
        );

        Ok(Self {
            texture,
            view,
            sampler,
            glyphs,
            size,
            line_height,
        })
    }

    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    /// Get the font size this atlas was created with.
    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Measure the width of a string at `scale` times the atlas size.
    pub fn measure(&self, text: &str, scale: f32) -> f32 {
        text.chars()
            .map(|c| {
                self.glyphs
                    .get(&c)
                    .map_or(self.size * 0.5, |g| g.advance)
            })
            .sum::<f32>()
            * scale
    }

    /// Wrap `text` to `max_width` pixels at `scale`.
    pub fn wrap(&self, text: &str, max_width: f32, scale: f32) -> Vec<String> {
        wrap_lines(text, max_width, |s| self.measure(s, scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(s: &str) -> f32 {
        s.chars().count() as f32 * 10.0
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_lines("the art world is wide", 110.0, mono);
        assert_eq!(lines, vec!["the art", "world is", "wide"]);
    }

    #[test]
    fn explicit_newlines_break_lines() {
        let lines = wrap_lines("first\nsecond line", 1000.0, mono);
        assert_eq!(lines, vec!["first", "second line"]);
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let lines = wrap_lines("a plethora b", 40.0, mono);
        assert_eq!(lines, vec!["a", "plethora", "b"]);
    }

    #[test]
    fn packing_grows_until_everything_fits() {
        let sizes = vec![(100, 100); 40];
        let ((w, h), positions) = pack_glyphs(&sizes, 1);
        assert_eq!(positions.len(), 40);
        assert!(w * h >= 40 * 100 * 100);
        for &(x, y) in &positions {
            assert!(x + 100 < w && y + 100 < h);
        }
    }

    #[test]
    fn charset_covers_exhibition_punctuation() {
        let chars: Vec<char> = charset().collect();
        for c in ['A', 'è', '’', '…'] {
            assert!(chars.contains(&c));
        }
    }
}
