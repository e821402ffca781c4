use crate::domain::visual::{MarkerGeometry, MarkerVisual};

/// Turns a marker descriptor into something the host surface can draw.
pub trait IconSerializer {
    fn serialize(&self, visual: &MarkerVisual) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SvgIconSerializer;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl IconSerializer for SvgIconSerializer {
    fn serialize(&self, visual: &MarkerVisual) -> String {
        match &visual.geometry {
            MarkerGeometry::Pill {
                width,
                height,
                corner_radius,
                label,
                font_size,
                palette,
            } => format!(
                concat!(
                    r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                    r#"<rect x="1" y="1" width="{rw}" height="{rh}" rx="{r}" ry="{r}" fill="{fill}" stroke="{border}" stroke-width="2"/>"#,
                    r#"<text x="{cx}" y="{cy}" font-family="sans-serif" font-size="{fs}" font-weight="600" fill="{text}" text-anchor="middle" dominant-baseline="central">{label}</text>"#,
                    "</svg>"
                ),
                w = width,
                h = height,
                rw = width - 2.0,
                rh = height - 2.0,
                r = corner_radius,
                fill = escape(&palette.fill),
                border = escape(&palette.border),
                cx = width / 2.0,
                cy = height / 2.0,
                fs = font_size,
                text = escape(&palette.text),
                label = escape(label),
            ),
            MarkerGeometry::Bubble {
                radius,
                label,
                font_size,
                palette,
            } => format!(
                concat!(
                    r#"<svg xmlns="http://www.w3.org/2000/svg" width="{d}" height="{d}" viewBox="0 0 {d} {d}">"#,
                    r#"<circle cx="{r}" cy="{r}" r="{ir}" fill="{fill}" stroke="{border}" stroke-width="2"/>"#,
                    r#"<text x="{r}" y="{r}" font-family="sans-serif" font-size="{fs}" font-weight="700" fill="{text}" text-anchor="middle" dominant-baseline="central">{label}</text>"#,
                    "</svg>"
                ),
                d = radius * 2.0,
                r = radius,
                ir = radius - 1.0,
                fill = escape(&palette.fill),
                border = escape(&palette.border),
                fs = font_size,
                text = escape(&palette.text),
                label = escape(label),
            ),
        }
    }
}
