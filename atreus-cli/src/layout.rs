//! HTML/SVG rendering of the Atreus layout tables.

use atreus_core::keycode::usage_name;
use atreus_core::{decode, Keycode, Layer, Modifiers, COLS, ROWS};

/// Key unit size in SVG pixels.
const U: f64 = 54.0;
/// Gap between keys.
const GAP: f64 = 4.0;
/// Step: key + gap.
const S: f64 = U + GAP;
/// Key corner radius.
const R: f64 = 4.0;
/// Extra space on either side of the middle column.
const SPLIT: f64 = 20.0;
/// Margin around the SVG content.
const MARGIN: f64 = 20.0;
/// Column that sits between the two hands.
const MIDDLE_COL: usize = COLS / 2;
/// Vertical drop of each column, so the hands fan out like the real board.
const STAGGER: [f64; COLS] = [0.4, 0.2, 0.0, 0.15, 0.3, 0.9, 0.3, 0.15, 0.0, 0.2, 0.4];

const MODIFIER_NAMES: [(Modifiers, &str); 8] = [
    (Modifiers::LCTRL, "Ctrl"),
    (Modifiers::LSHIFT, "Shft"),
    (Modifiers::LALT, "Alt"),
    (Modifiers::LGUI, "Gui"),
    (Modifiers::RCTRL, "RCtl"),
    (Modifiers::RSHIFT, "RSft"),
    (Modifiers::RALT, "RAlt"),
    (Modifiers::RGUI, "RGui"),
];

/// Short key-cap label for a raw cell value.
pub fn label(raw: u8) -> String {
    match decode(raw) {
        Keycode::Empty => String::new(),
        Keycode::Key(code) => usage_name(code).to_string(),
        Keycode::ShiftedKey(code) => format!("\u{21e7}{}", usage_name(code)),
        Keycode::Modifier(mods) => modifier_names(mods).join("+"),
        Keycode::Reflash => "Flash".to_string(),
    }
}

/// One-line explanation of how a raw value decodes.
pub fn describe(raw: u8) -> String {
    match decode(raw) {
        Keycode::Empty => format!("{}: empty (no effect)", raw),
        Keycode::Key(code) => format!("{}: key 0x{:02X} ({})", raw, code, usage_name(code)),
        Keycode::ShiftedKey(code) => format!(
            "{}: shifted key 0x{:02X} ({}) with SHIFT",
            raw,
            code,
            usage_name(code)
        ),
        Keycode::Modifier(mods) => format!(
            "{}: modifier 0x{:02X} ({})",
            raw,
            mods.bits(),
            modifier_names(mods).join("+")
        ),
        Keycode::Reflash => format!("{}: reflash (enter bootloader)", raw),
    }
}

fn modifier_names(mods: Modifiers) -> Vec<&'static str> {
    MODIFIER_NAMES
        .iter()
        .filter(|(flag, _)| mods.contains(*flag))
        .map(|(_, name)| *name)
        .collect()
}

fn key_class(raw: u8) -> &'static str {
    match decode(raw) {
        Keycode::Empty => "key unused",
        Keycode::Key(_) => "key",
        Keycode::ShiftedKey(_) => "key shifted",
        Keycode::Modifier(_) => "key modifier",
        Keycode::Reflash => "key reflash",
    }
}

/// Top-left corner of the key at `(row, col)`.
fn position(row: usize, col: usize) -> (f64, f64) {
    let split = if col < MIDDLE_COL {
        0.0
    } else if col == MIDDLE_COL {
        SPLIT
    } else {
        2.0 * SPLIT
    };
    (col as f64 * S + split, (row as f64 + STAGGER[col]) * S)
}

fn content_size() -> (f64, f64) {
    let width = COLS as f64 * S + 2.0 * SPLIT;
    let depth = STAGGER.iter().cloned().fold(0.0, f64::max);
    (width, (ROWS as f64 + depth) * S)
}

fn render_layer(layer: Layer, y_offset: f64) -> String {
    let mut svg = format!(
        r#"<g transform="translate({MARGIN}, {y_offset})"><text x="0" y="-10" class="layer-title">{} layer</text>"#,
        layer.name()
    );

    for (row, cells) in layer.table().iter().enumerate() {
        for (col, &raw) in cells.iter().enumerate() {
            // The middle column only has switches on the bottom two rows.
            if col == MIDDLE_COL && row < 2 {
                continue;
            }
            let (x, y) = position(row, col);
            svg.push_str(&format!(
                r#"<rect x="{x}" y="{y}" width="{U}" height="{U}" rx="{R}" class="{}"/>"#,
                key_class(raw)
            ));

            let text = label(raw);
            if !text.is_empty() {
                let font_class = if text.chars().count() > 3 { " small" } else { "" };
                svg.push_str(&format!(
                    r#"<text x="{}" y="{}" class="label{font_class}">{}</text>"#,
                    x + U / 2.0,
                    y + U / 2.0 + 1.0,
                    html_escape(&text),
                ));
            }
        }
    }

    svg.push_str("</g>");
    svg
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Complete HTML document with one SVG grid per layer.
pub fn generate_html() -> String {
    let (content_w, content_h) = content_size();
    let layer_height = content_h + 60.0;
    let width = content_w + 2.0 * MARGIN;
    let height = Layer::ALL.len() as f64 * layer_height + 2.0 * MARGIN;

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Atreus Layout</title>
<style>
  body {{ background: #1e1e2e; margin: 2em; font-family: sans-serif; }}
  .key {{ fill: #313244; stroke: #585b70; stroke-width: 1; }}
  .key.unused {{ fill: #181825; stroke-dasharray: 3 3; }}
  .key.modifier {{ fill: #45475a; }}
  .key.shifted {{ fill: #3b3f5c; }}
  .key.reflash {{ fill: #7f2a3a; }}
  .label {{ fill: #cdd6f4; font-size: 14px; text-anchor: middle; dominant-baseline: middle; }}
  .label.small {{ font-size: 11px; }}
  .layer-title {{ fill: #f5c2e7; font-size: 16px; font-weight: bold; }}
</style>
</head>
<body>
<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">
"#
    );

    for (index, layer) in Layer::ALL.iter().enumerate() {
        let y_offset = MARGIN + 30.0 + index as f64 * layer_height;
        html.push_str(&render_layer(*layer, y_offset));
        html.push('\n');
    }

    html.push_str("</svg>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(label(0), "");
        assert_eq!(label(26), "W");
        assert_eq!(label(101), "Ctrl");
        assert_eq!(label(103), "Ctrl+Shft");
        assert_eq!(label(138), "\u{21e7}1");
        assert_eq!(label(255), "Flash");
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(108), "108: modifier 0x08 (Gui)");
        assert_eq!(describe(109), "109: shifted key 0x01 (ERR) with SHIFT");
        assert_eq!(describe(230), "230: empty (no effect)");
    }

    #[test]
    fn test_html_has_both_layers() {
        let html = generate_html();
        assert!(html.contains("Base layer"));
        assert!(html.contains("Fn layer"));
        assert!(html.contains(r#"class="key reflash""#));
        // Four middle-column slots on the top rows are not drawn.
        let keys = html.matches("<rect").count();
        assert_eq!(keys, 2 * (ROWS * COLS - 2));
    }

    #[test]
    fn test_escape() {
        assert_eq!(html_escape("<>"), "&lt;&gt;");
    }
}
