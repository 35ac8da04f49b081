//! Thinking-mode normalization.
//!
//! The browser offers three labels (`standard`, `thinking`, `fast`) while the
//! gateway works with canonical modes (`normal`, `thinking`, `fast`), each of which
//! maps to a fixed pair of reasoning effort and temperature. Every function here
//! is total: unknown or missing input means `normal`.
use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

/// Mode label as shown in the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThinkingModeUi {
    #[default]
    Standard,
    Thinking,
    Fast,
}

/// Canonical mode used when calling the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThinkingMode {
    Fast,
    #[default]
    Normal,
    Thinking,
}

impl ThinkingMode {
    /// Map any label, alias or casing to a canonical mode
    pub fn from_input(input: Option<&str>) -> Self {
        let Some(input) = input else {
            return ThinkingMode::Normal;
        };
        match input.trim().to_lowercase().as_str() {
            "thinking" | "deep" => ThinkingMode::Thinking,
            "fast" | "quick" => ThinkingMode::Fast,
            _ => ThinkingMode::Normal,
        }
    }

    pub fn options(self) -> ReasoningOptions {
        ReasoningOptions::for_mode(self)
    }
}

impl FromStr for ThinkingMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ThinkingMode::from_input(Some(s)))
    }
}

impl ThinkingModeUi {
    pub fn from_form(input: Option<&str>) -> Self {
        match ThinkingMode::from_input(input) {
            ThinkingMode::Thinking => ThinkingModeUi::Thinking,
            ThinkingMode::Fast => ThinkingModeUi::Fast,
            ThinkingMode::Normal => ThinkingModeUi::Standard,
        }
    }

    pub fn canonical(self) -> ThinkingMode {
        match self {
            ThinkingModeUi::Standard => ThinkingMode::Normal,
            ThinkingModeUi::Thinking => ThinkingMode::Thinking,
            ThinkingModeUi::Fast => ThinkingMode::Fast,
        }
    }
}

impl From<ThinkingModeUi> for ThinkingMode {
    fn from(mode: ThinkingModeUi) -> Self {
        mode.canonical()
    }
}

/// Sampling parameters sent with every completion request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReasoningOptions {
    pub reasoning_effort: ReasoningEffort,
    pub temperature: f64,
}

impl ReasoningOptions {
    pub fn for_mode(mode: ThinkingMode) -> Self {
        match mode {
            ThinkingMode::Fast => ReasoningOptions {
                reasoning_effort: ReasoningEffort::Low,
                temperature: 0.10,
            },
            ThinkingMode::Normal => ReasoningOptions {
                reasoning_effort: ReasoningEffort::Medium,
                temperature: 0.20,
            },
            ThinkingMode::Thinking => ReasoningOptions {
                reasoning_effort: ReasoningEffort::High,
                temperature: 0.40,
            },
        }
    }

    pub fn from_input(input: Option<&str>) -> Self {
        Self::for_mode(ThinkingMode::from_input(input))
    }
}

impl Default for ReasoningOptions {
    fn default() -> Self {
        Self::for_mode(ThinkingMode::Normal)
    }
}

/// What a raw mode input resolved to, kept together for logging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeResolution {
    pub display_mode: ThinkingModeUi,
    pub canonical: ThinkingMode,
    pub options: ReasoningOptions,
}

impl ModeResolution {
    pub fn resolve(input: Option<&str>) -> Self {
        let display_mode = ThinkingModeUi::from_form(input);
        let canonical = display_mode.canonical();
        Self {
            display_mode,
            canonical,
            options: canonical.options(),
        }
    }
}
