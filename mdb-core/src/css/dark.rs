//! Dark-mode derivation.
//!
//! The converter contract is `convert(light) -> MARK + dark`: the output always
//! starts with [`DARK_MARK`], so any stylesheet containing the marker is known
//! to carry its dark half already and is never converted twice.
//!
//! [`HeuristicDarkConverter`] works on colour literals only. Each declaration
//! is classified by property: backgrounds that are light get darkened, every
//! other colour (text, borders, shadows, fills) that is dark gets lightened.
//! Hue and alpha are preserved.

use super::{split_top_level, Stylesheet};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Sentinel separating a light stylesheet from its derived dark half.
pub const DARK_MARK: &str = "/* mdb-dark-mode-converted */";

/// Turns a light stylesheet into a dark one, prefixed with [`DARK_MARK`].
pub trait DarkModeConverter {
    fn convert(&self, light_css: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDarkConverter;

impl DarkModeConverter for HeuristicDarkConverter {
    fn convert(&self, light_css: &str) -> String {
        let mut sheet = Stylesheet::parse(light_css);
        sheet.for_each_rule_mut(&mut |rule| rule.body = convert_body(&rule.body));
        format!("{DARK_MARK}\n{}", sheet.to_css().trim())
    }
}

static COLOR_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)#(?P<hex>[0-9a-f]{8}|[0-9a-f]{6}|[0-9a-f]{3,4})\b|\b(?P<fn>rgba?)\(\s*(?P<args>[^)]*)\)|\b(?P<name>white|black)\b",
    )
    .expect("valid colour literal pattern")
});

#[derive(Debug, Clone, Copy, PartialEq)]
enum Role {
    Background,
    Foreground,
}

fn role_for(property: &str) -> Role {
    let property = property.trim().to_ascii_lowercase();
    if property.starts_with("background") || property.contains("-bg") || property.ends_with("bg")
    {
        Role::Background
    } else {
        Role::Foreground
    }
}

fn convert_body(body: &str) -> String {
    split_top_level(body, b';')
        .into_iter()
        .map(|declaration| match declaration.find(':') {
            Some(colon) => {
                let role = role_for(&declaration[..colon]);
                let value = &declaration[colon + 1..];
                let converted = COLOR_LITERAL.replace_all(value, |caps: &Captures| {
                    convert_literal(caps, role).unwrap_or_else(|| caps[0].to_string())
                });
                format!("{}:{}", &declaration[..colon], converted)
            }
            None => declaration.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgba {
    r: f32,
    g: f32,
    b: f32,
    a: f32,
}

fn convert_literal(caps: &Captures, role: Role) -> Option<String> {
    let (color, keep_alpha) = if let Some(hex) = caps.name("hex") {
        let hex = hex.as_str();
        (parse_hex(hex)?, hex.len() == 4 || hex.len() == 8)
    } else if let Some(args) = caps.name("args") {
        let is_rgba = caps
            .name("fn")
            .map(|f| f.as_str().eq_ignore_ascii_case("rgba"))
            .unwrap_or(false);
        let color = parse_rgb_args(args.as_str())?;
        (color, is_rgba || color.a < 1.0)
    } else {
        let name = caps.name("name")?.as_str().to_ascii_lowercase();
        let v = if name == "white" { 1.0 } else { 0.0 };
        (
            Rgba {
                r: v,
                g: v,
                b: v,
                a: 1.0,
            },
            false,
        )
    };
    Some(format_color(to_dark(color, role), keep_alpha))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let expand = |s: &str| -> Option<f32> {
        let v = u8::from_str_radix(s, 16).ok()?;
        Some(v as f32 / 255.0)
    };
    let digits: Vec<String> = match hex.len() {
        3 | 4 => hex.chars().map(|c| format!("{c}{c}")).collect(),
        6 | 8 => hex
            .as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect(),
        _ => return None,
    };
    Some(Rgba {
        r: expand(&digits[0])?,
        g: expand(&digits[1])?,
        b: expand(&digits[2])?,
        a: match digits.get(3) {
            Some(alpha) => expand(alpha)?,
            None => 1.0,
        },
    })
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    let channel = |s: &str| -> Option<f32> {
        match s.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok().map(|v| v / 100.0),
            None => s.parse::<f32>().ok().map(|v| v / 255.0),
        }
    };
    let alpha = match parts.get(3) {
        Some(s) => match s.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? / 100.0,
            None => s.parse::<f32>().ok()?,
        },
        None => 1.0,
    };
    Some(Rgba {
        r: channel(parts[0])?.clamp(0.0, 1.0),
        g: channel(parts[1])?.clamp(0.0, 1.0),
        b: channel(parts[2])?.clamp(0.0, 1.0),
        a: alpha.clamp(0.0, 1.0),
    })
}

fn to_dark(color: Rgba, role: Role) -> Rgba {
    let (h, mut s, mut l) = rgb_to_hsl(color.r, color.g, color.b);
    match role {
        Role::Background => {
            if l > 0.5 {
                l = 0.08 + (1.0 - l) * 0.5;
                s *= 0.8;
            }
        }
        Role::Foreground => {
            if l < 0.5 {
                l = 0.92 - l * 0.6;
            }
        }
    }
    let (r, g, b) = hsl_to_rgb(h, s, l);
    Rgba { r, g, b, a: color.a }
}

fn format_color(color: Rgba, keep_alpha: bool) -> String {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    if keep_alpha {
        let alpha = (color.a * 1000.0).round() / 1000.0;
        format!(
            "rgba({}, {}, {}, {alpha})",
            byte(color.r),
            byte(color.g),
            byte(color.b)
        )
    } else {
        format!(
            "#{:02x}{:02x}{:02x}",
            byte(color.r),
            byte(color.g),
            byte(color.b)
        )
    }
}

fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < f32::EPSILON {
        return (0.0, 0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if (max - r).abs() < f32::EPSILON {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if (max - g).abs() < f32::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (l, l, l);
    }
    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
