//! Editor configuration
//!
//! One configurable editor replaces the separate text-only, erase-only and
//! blur-only editors: the enabled annotation kinds are just a setting.

use serde::{Deserialize, Serialize};

use crate::annotations::{Capabilities, TextStyle, DEFAULT_ROTATION_STEP};
use crate::color::{hex_to_rgb, simulate_blur_color, Rgb};
use crate::error::{AnnotateError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegionSize {
    pub width: f64,
    pub height: f64,
}

impl Default for RegionSize {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 30.0,
        }
    }
}

/// How erase and blur regions are painted on export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportStyle {
    /// Page background color used to cover erased content
    pub erase_color: String,
    /// Base color of the blur overlay before darkening
    pub blur_color: String,
    /// Multiplier applied to `blur_color`
    pub blur_factor: f32,
    pub blur_opacity: f32,
}

impl Default for ExportStyle {
    fn default() -> Self {
        Self {
            erase_color: "#FFFFFF".to_string(),
            blur_color: "#FFFFFF".to_string(),
            blur_factor: 0.5,
            blur_opacity: 0.5,
        }
    }
}

impl ExportStyle {
    pub fn erase_rgb(&self) -> Rgb {
        hex_to_rgb(&self.erase_color)
    }

    pub fn blur_rgb(&self) -> Rgb {
        simulate_blur_color(&self.blur_color, self.blur_factor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub capabilities: Capabilities,
    pub default_text_style: TextStyle,
    /// Initial content of a freshly placed text annotation
    pub placeholder_text: String,
    pub rotation_step_degrees: i32,
    pub default_region_size: RegionSize,
    pub export_style: ExportStyle,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::all(),
            default_text_style: TextStyle::default(),
            placeholder_text: "Add your text".to_string(),
            rotation_step_degrees: DEFAULT_ROTATION_STEP,
            default_region_size: RegionSize::default(),
            export_style: ExportStyle::default(),
        }
    }
}

impl EditorConfig {
    /// Editor that only places text
    pub fn text_only() -> Self {
        Self {
            capabilities: Capabilities {
                text: true,
                erase: false,
                blur: false,
            },
            ..Self::default()
        }
    }

    /// Editor that only erases and blurs
    pub fn redaction_only() -> Self {
        Self {
            capabilities: Capabilities {
                text: false,
                erase: true,
                blur: true,
            },
            ..Self::default()
        }
    }

    /// Parse a (possibly partial) JSON config; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AnnotateError::InvalidOperation(msg));

        if !(self.default_text_style.font_size.is_finite()
            && self.default_text_style.font_size > 0.0)
        {
            return invalid(format!(
                "default font size must be positive, got {}",
                self.default_text_style.font_size
            ));
        }
        if self.capabilities.text && self.placeholder_text.trim().is_empty() {
            return invalid("placeholder text must not be blank".to_string());
        }
        let size = self.default_region_size;
        if !(size.width > 0.0 && size.height > 0.0) {
            return invalid(format!(
                "default region size must be positive, got {}x{}",
                size.width, size.height
            ));
        }
        let opacity = self.export_style.blur_opacity;
        if !(0.0..=1.0).contains(&opacity) {
            return invalid(format!("blur opacity must be within 0..=1, got {}", opacity));
        }
        Ok(())
    }
}
