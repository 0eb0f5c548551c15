use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Exclusive upper bound of a random seed.
pub const SEED_UPPER_BOUND: u32 = 2_147_483_647;

/// Model identifiers the backend routes, grouped by provider.
pub const MODEL_CATALOGUE: &[(&str, &str)] = &[
    ("gpt-4o", "openai"),
    ("gpt-4-turbo", "openai"),
    ("gpt-4", "openai"),
    ("gpt-3.5-turbo", "openai"),
    ("claude-3-5-sonnet", "anthropic"),
    ("claude-3-5-haiku", "anthropic"),
    ("claude-3-opus", "anthropic"),
    ("claude-3-haiku", "anthropic"),
    ("gemini-2.5-pro", "google"),
    ("gemini-2.5-flash", "google"),
    ("gemini-2.5-flash-lite", "google"),
    ("gemini-1.0-ultra", "google"),
    ("gemini-pro", "google"),
    ("grok-4-fast", "groq"),
    ("grok-4", "groq"),
    ("grok-2", "groq"),
    ("grok-2-mini", "groq"),
];

/// Provider the backend routes `model` to, if it is in the catalogue.
pub fn provider_for(model: &str) -> Option<&'static str> {
    MODEL_CATALOGUE
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, provider)| *provider)
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// The full parameter tuple sent with every exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub top_p: f64,
    pub seed: Option<u32>,
    pub stop_sequence: String,
    pub system_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_model(DEFAULT_MODEL)
    }
}

impl Settings {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: 2048,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            top_p: 1.0,
            seed: None,
            stop_sequence: String::new(),
            system_prompt: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SettingField
// ---------------------------------------------------------------------------

/// Identifies one field of [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingField {
    Model,
    Temperature,
    MaxTokens,
    PresencePenalty,
    FrequencyPenalty,
    TopP,
    Seed,
    StopSequence,
    SystemPrompt,
}

/// Declared range and quantization step of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl NumericRange {
    /// Round `raw` to the nearest multiple of `step`, then clamp into `[min, max]`.
    pub fn quantize(&self, raw: f64) -> f64 {
        let stepped = if self.step > 0.0 {
            (raw / self.step).round() * self.step
        } else {
            raw
        };
        // Drop float noise like 0.30000000000000004.
        let tidy = (stepped * 1e6).round() / 1e6;
        tidy.clamp(self.min, self.max)
    }
}

impl SettingField {
    pub fn label(self) -> &'static str {
        match self {
            SettingField::Model => "Model",
            SettingField::Temperature => "Temperature",
            SettingField::MaxTokens => "Max Tokens",
            SettingField::PresencePenalty => "Presence Penalty",
            SettingField::FrequencyPenalty => "Frequency Penalty",
            SettingField::TopP => "Top P",
            SettingField::Seed => "Seed",
            SettingField::StopSequence => "Stop Sequence",
            SettingField::SystemPrompt => "System Prompt",
        }
    }

    /// `None` for fields that are not numeric sliders.
    pub fn range(self) -> Option<NumericRange> {
        let r = |min, max, step| Some(NumericRange { min, max, step });
        match self {
            SettingField::Temperature => r(0.0, 2.0, 0.1),
            SettingField::MaxTokens => r(256.0, 4096.0, 64.0),
            SettingField::PresencePenalty | SettingField::FrequencyPenalty => r(-2.0, 2.0, 0.1),
            SettingField::TopP => r(0.0, 1.0, 0.05),
            SettingField::Seed => r(0.0, (SEED_UPPER_BOUND - 1) as f64, 1.0),
            SettingField::Model | SettingField::StopSequence | SettingField::SystemPrompt => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

/// Sole owner of the session's [`Settings`]. No operation fails: out-of-range
/// numbers are clamped and unparsable input leaves the field unchanged.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: Settings,
    default_model: String,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl SettingsStore {
    pub fn new(default_model: impl Into<String>) -> Self {
        let default_model = default_model.into();
        Self {
            settings: Settings::with_model(default_model.clone()),
            default_model,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Store a raw textual value, coercing it to the field's type and range.
    pub fn set(&mut self, field: SettingField, raw: &str) {
        match field {
            SettingField::Model => {
                let id = raw.trim();
                if !id.is_empty() {
                    self.settings.model = id.to_string();
                }
            }
            SettingField::StopSequence => self.settings.stop_sequence = raw.to_string(),
            SettingField::SystemPrompt => self.settings.system_prompt = raw.to_string(),
            SettingField::Seed if raw.trim().is_empty() => self.settings.seed = None,
            _ => {
                if let Ok(value) = raw.trim().parse::<f64>() {
                    self.set_number(field, value);
                }
            }
        }
    }

    /// Store a numeric value, quantized and clamped. Returns the stored value,
    /// or `None` when the field is not numeric or `value` is not finite.
    pub fn set_number(&mut self, field: SettingField, value: f64) -> Option<f64> {
        let range = field.range()?;
        if !value.is_finite() {
            return None;
        }
        let q = range.quantize(value);
        match field {
            SettingField::Temperature => self.settings.temperature = q,
            SettingField::MaxTokens => self.settings.max_tokens = q as u32,
            SettingField::PresencePenalty => self.settings.presence_penalty = q,
            SettingField::FrequencyPenalty => self.settings.frequency_penalty = q,
            SettingField::TopP => self.settings.top_p = q,
            SettingField::Seed => self.settings.seed = Some(q as u32),
            _ => return None,
        }
        Some(q)
    }

    /// Current value of a numeric field.
    pub fn number(&self, field: SettingField) -> Option<f64> {
        match field {
            SettingField::Temperature => Some(self.settings.temperature),
            SettingField::MaxTokens => Some(self.settings.max_tokens as f64),
            SettingField::PresencePenalty => Some(self.settings.presence_penalty),
            SettingField::FrequencyPenalty => Some(self.settings.frequency_penalty),
            SettingField::TopP => Some(self.settings.top_p),
            SettingField::Seed => self.settings.seed.map(f64::from),
            _ => None,
        }
    }

    /// Restore the default tuple and return it for resynchronizing views.
    pub fn reset(&mut self) -> Settings {
        self.settings = Settings::with_model(self.default_model.clone());
        tracing::info!(model = %self.settings.model, "settings reset to defaults");
        self.settings.clone()
    }

    pub fn randomize_seed(&mut self) -> u32 {
        let seed = rand::thread_rng().gen_range(0..SEED_UPPER_BOUND);
        self.settings.seed = Some(seed);
        seed
    }

    pub fn clear_seed(&mut self) {
        self.settings.seed = None;
    }

    pub fn clear_stop_sequence(&mut self) {
        self.settings.stop_sequence.clear();
    }

    pub fn clear_system_prompt(&mut self) {
        self.settings.system_prompt.clear();
    }

    /// Step through [`MODEL_CATALOGUE`], wrapping. A model outside the
    /// catalogue moves to its first (or last) entry.
    pub fn cycle_model(&mut self, forward: bool) -> &str {
        let len = MODEL_CATALOGUE.len();
        let next = match MODEL_CATALOGUE
            .iter()
            .position(|(id, _)| *id == self.settings.model)
        {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        self.settings.model = MODEL_CATALOGUE[next].0.to_string();
        &self.settings.model
    }
}
