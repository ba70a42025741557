//! Device frames for the preview pane.

use serde::{Deserialize, Serialize};

/// Gap kept around the frame when auto-scaling.
const FRAME_MARGIN: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreset {
    #[default]
    Custom,
    #[serde(rename = "iphone16pro")]
    Iphone16Pro,
    #[serde(rename = "iphone16")]
    Iphone16,
    Ipad,
    Desktop,
}

impl DevicePreset {
    pub const ALL: [DevicePreset; 5] = [
        DevicePreset::Custom,
        DevicePreset::Iphone16Pro,
        DevicePreset::Iphone16,
        DevicePreset::Ipad,
        DevicePreset::Desktop,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DevicePreset::Custom => "custom",
            DevicePreset::Iphone16Pro => "iphone16pro",
            DevicePreset::Iphone16 => "iphone16",
            DevicePreset::Ipad => "ipad",
            DevicePreset::Desktop => "desktop",
        }
    }

    /// Unknown keys fall back to `custom`.
    pub fn parse(key: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(key.trim()))
            .unwrap_or_default()
    }

    fn pixels(self) -> Option<(u32, u32)> {
        match self {
            DevicePreset::Custom => None,
            DevicePreset::Iphone16Pro => Some((430, 932)),
            DevicePreset::Iphone16 => Some((390, 844)),
            DevicePreset::Ipad => Some((768, 1024)),
            DevicePreset::Desktop => Some((1280, 720)),
        }
    }
}

/// CSS width/height of the frame (`"430px"`, `"100%"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSize {
    pub width: String,
    pub height: String,
    pub is_custom: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFrame {
    pub preset: DevicePreset,
    pub custom_width: String,
    pub custom_height: String,
    pub rotated: bool,
}

impl Default for DeviceFrame {
    fn default() -> Self {
        Self {
            preset: DevicePreset::Custom,
            custom_width: "100%".into(),
            custom_height: "100%".into(),
            rotated: false,
        }
    }
}

pub enum Scale {
    /// Fit the frame into the container, never enlarging.
    Auto,
    /// Percentage, 100 = actual size.
    Manual(u32),
}

impl DeviceFrame {
    /// Rotation swaps the dimensions of fixed presets only.
    pub fn size(&self) -> FrameSize {
        let (width, height) = match self.preset.pixels() {
            Some((w, h)) => (format!("{w}px"), format!("{h}px")),
            None => (self.custom_width.clone(), self.custom_height.clone()),
        };
        let is_custom = self.preset == DevicePreset::Custom;
        if self.rotated && !is_custom {
            FrameSize {
                width: height,
                height: width,
                is_custom,
            }
        } else {
            FrameSize {
                width,
                height,
                is_custom,
            }
        }
    }

    /// CSS `transform: scale(..)` factor for a container of the given size.
    pub fn scale(&self, container_width: f64, container_height: f64, mode: Scale) -> f64 {
        match mode {
            Scale::Manual(percent) => percent as f64 / 100.0,
            Scale::Auto => {
                let size = self.size();
                let Some(width) = pixel_length(&size.width) else {
                    return 1.0;
                };
                let scale_x = (container_width - FRAME_MARGIN) / width;
                let scale_y = pixel_length(&size.height)
                    .map(|h| (container_height - FRAME_MARGIN) / h)
                    .unwrap_or(1.0);
                scale_x.min(scale_y).min(1.0)
            }
        }
    }
}

/// `"430px"` / `"430"` to 430; percentages and garbage to `None`.
fn pixel_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f64>().ok().filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(preset: DevicePreset, rotated: bool) -> DeviceFrame {
        DeviceFrame {
            preset,
            rotated,
            ..DeviceFrame::default()
        }
    }

    #[test]
    fn rotation_swaps_fixed_presets_only() {
        let size = frame(DevicePreset::Iphone16Pro, true).size();
        assert_eq!((size.width.as_str(), size.height.as_str()), ("932px", "430px"));
        let custom = frame(DevicePreset::Custom, true).size();
        assert_eq!(custom.width, "100%");
        assert!(custom.is_custom);
    }

    #[test]
    fn auto_scale_fits_and_never_enlarges() {
        let ipad = frame(DevicePreset::Ipad, false);
        let scale = ipad.scale(424.0, 2000.0, Scale::Auto);
        assert!((scale - 0.5).abs() < 1e-9);
        assert_eq!(ipad.scale(5000.0, 5000.0, Scale::Auto), 1.0);
        assert_eq!(frame(DevicePreset::Custom, false).scale(10.0, 10.0, Scale::Auto), 1.0);
        assert_eq!(ipad.scale(10.0, 10.0, Scale::Manual(75)), 0.75);
    }

    #[test]
    fn parses_preset_keys() {
        assert_eq!(DevicePreset::parse("iPhone16Pro"), DevicePreset::Iphone16Pro);
        assert_eq!(DevicePreset::parse("watch"), DevicePreset::Custom);
    }
}
