//! Grid layout of contributor avatars as SVG.

use std::fmt::Write as _;

use crate::error::Error;
use crate::ranker::{RankedEntry, RankedList};

/// Height reserved under each avatar for the login.
const LABEL_HEIGHT: u32 = 24;
const FONT_SIZE: u32 = 14;

/// Largest accepted image width, block size or column count.
pub const MAX_DIMENSION: u32 = 16_384;

/// Grid dimensions for the rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Output image width in pixels
    pub image_width: u32,
    /// Avatar edge length in pixels
    pub block_size: u32,
    /// Avatars per row
    pub items_per_row: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            image_width: 1000,
            block_size: 120,
            items_per_row: 8,
        }
    }
}

impl LayoutConfig {
    /// Create a validated layout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if any dimension is zero or above
    /// [`MAX_DIMENSION`].
    pub fn new(image_width: u32, block_size: u32, items_per_row: u32) -> Result<Self, Error> {
        let layout = Self {
            image_width,
            block_size,
            items_per_row,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Check that every dimension is positive and at most [`MAX_DIMENSION`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` naming the first dimension out of range.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("image width", self.image_width),
            ("block size", self.block_size),
            ("items per row", self.items_per_row),
        ] {
            if value == 0 {
                return Err(Error::Configuration(format!("{name} must be positive")));
            }
            if value > MAX_DIMENSION {
                return Err(Error::Configuration(format!(
                    "{name} {value} exceeds {MAX_DIMENSION}"
                )));
            }
        }
        Ok(())
    }

    /// Compact form of the layout, recorded in rendered images.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{}x{}x{}", self.image_width, self.block_size, self.items_per_row)
    }

    /// Total image height for `count` entries, `None` if it overflows.
    #[must_use]
    pub fn image_height(&self, count: usize) -> Option<u32> {
        let count = u32::try_from(count).ok()?;
        count.div_ceil(self.items_per_row).checked_mul(self.row_height())
    }

    /// Width of one grid cell.
    #[must_use]
    pub fn cell_width(&self) -> u32 {
        (self.image_width / self.items_per_row).max(1)
    }

    /// Height of one grid row.
    #[must_use]
    pub fn row_height(&self) -> u32 {
        self.block_size.saturating_add(LABEL_HEIGHT)
    }

    /// Rows needed for `count` entries.
    #[must_use]
    pub fn rows_for(&self, count: usize) -> u32 {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        count.div_ceil(self.items_per_row)
    }
}

/// Turns a ranked list into image bytes.
pub trait Renderer: Send + Sync {
    /// Render `ranked` with `layout`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Render` if the artifact cannot be produced.
    fn render(&self, ranked: &RankedList, layout: &LayoutConfig) -> Result<Vec<u8>, Error>;

    /// Whether `artifact` was produced by this renderer with `layout`.
    fn is_current(&self, _artifact: &[u8], _layout: &LayoutConfig) -> bool {
        false
    }
}

/// Renders a plain SVG grid with circular avatars and login labels.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    fn render(&self, ranked: &RankedList, layout: &LayoutConfig) -> Result<Vec<u8>, Error> {
        layout.validate()?;
        if ranked.is_empty() {
            return Err(Error::Render("nothing to render".to_string()));
        }

        let height = layout.image_height(ranked.len()).ok_or_else(|| {
            Error::Render(format!(
                "{} contributors do not fit in one image at block size {}",
                ranked.len(),
                layout.block_size
            ))
        })?;
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{height}" viewBox="0 0 {w} {height}" data-layout="{fingerprint}">"#,
            w = layout.image_width,
            fingerprint = layout.fingerprint(),
        );
        let radius = layout.block_size / 2;
        let _ = writeln!(
            svg,
            r#"  <defs><clipPath id="avatar-clip" clipPathUnits="objectBoundingBox"><circle cx="0.5" cy="0.5" r="0.5"/></clipPath></defs>"#,
        );
        let _ = writeln!(svg, r#"  <style>text {{ font: {FONT_SIZE}px sans-serif; }}</style>"#);

        for (index, entry) in ranked.iter().enumerate() {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            let column = index % layout.items_per_row;
            let row = index / layout.items_per_row;
            let x = column * layout.cell_width() + layout.cell_width().saturating_sub(layout.block_size) / 2;
            let y = row * layout.row_height();
            render_cell(&mut svg, entry, layout, x, y, radius);
        }

        svg.push_str("</svg>\n");
        Ok(svg.into_bytes())
    }

    fn is_current(&self, artifact: &[u8], layout: &LayoutConfig) -> bool {
        let Ok(text) = std::str::from_utf8(artifact) else {
            return false;
        };
        let root = text.split('>').next().unwrap_or_default();
        root.starts_with("<svg ") && root.contains(&format!(r#"data-layout="{}""#, layout.fingerprint()))
    }
}

fn render_cell(svg: &mut String, entry: &RankedEntry, layout: &LayoutConfig, x: u32, y: u32, radius: u32) {
    let login = escape(&entry.identifier);
    let size = layout.block_size;

    let _ = write!(svg, r#"  <g class="contributor" data-login="{login}""#);
    if let Some(previous) = entry.previous_position {
        let _ = write!(svg, r#" data-previous-position="{previous}""#);
    }
    svg.push_str(">\n");

    if let Some(profile) = &entry.profile {
        let _ = writeln!(svg, r#"    <a xlink:href="{}" target="_blank">"#, escape(profile));
    }
    let _ = writeln!(svg, r#"    <title>{login}</title>"#);
    match &entry.avatar {
        Some(avatar) => {
            let _ = writeln!(
                svg,
                r#"    <image x="{x}" y="{y}" width="{size}" height="{size}" clip-path="url(#avatar-clip)" xlink:href="{}"/>"#,
                escape(avatar),
            );
        }
        None => {
            let _ = writeln!(
                svg,
                r##"    <circle cx="{}" cy="{}" r="{radius}" fill="#d0d7de"/>"##,
                x + radius,
                y + radius,
            );
        }
    }
    let _ = writeln!(
        svg,
        r#"    <text x="{}" y="{}" text-anchor="middle">{login}</text>"#,
        x + size / 2,
        y + size + LABEL_HEIGHT - (LABEL_HEIGHT - FONT_SIZE) / 2,
    );
    if entry.profile.is_some() {
        svg.push_str("    </a>\n");
    }
    svg.push_str("  </g>\n");
}

/// Escape text for use in XML content and attribute values.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
