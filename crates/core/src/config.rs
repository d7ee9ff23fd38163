use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Weekday};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::knowledge::{
    default_menu, weekday_name, DayHours, MenuCategory, OpeningHours, RestaurantKnowledge,
    RestaurantProfile, WEEK,
};
use crate::temporal::{DaypartDefaults, SameWeekdayPolicy, TemporalSettings};
use crate::validation::ReservationRules;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub restaurant: RestaurantProfile,
    pub hours: OpeningHours,
    pub menu: Vec<MenuCategory>,
    pub reservations: ReservationsConfig,
    pub temporal: TemporalConfig,
    pub dialogue: DialogueConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ReservationsConfig {
    pub min_party_size: u32,
    pub max_party_size: u32,
    pub max_days_ahead: u32,
    pub slot_interval_minutes: u32,
    pub tables_per_slot: u32,
    pub same_weekday: SameWeekdayPolicy,
}

#[derive(Clone, Debug)]
pub struct TemporalConfig {
    pub dayparts: DaypartDefaults,
    pub assume_pm_below_hour: u32,
}

#[derive(Clone, Debug)]
pub struct DialogueConfig {
    pub history_window: usize,
    pub idle_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LlmConfig {
    /// Configured model, or the provider's default.
    pub fn effective_model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model,
            (None, LlmProvider::OpenAi) => "gpt-4o-mini",
            (None, LlmProvider::Anthropic) => "claude-3-5-haiku-latest",
            (None, LlmProvider::Ollama) => "llama3.1",
            (None, LlmProvider::Disabled) => "",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Disabled,
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub same_weekday: Option<SameWeekdayPolicy>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            restaurant: RestaurantProfile::default(),
            hours: OpeningHours::default(),
            menu: default_menu(),
            reservations: ReservationsConfig {
                min_party_size: 1,
                max_party_size: 10,
                max_days_ahead: 30,
                slot_interval_minutes: 30,
                tables_per_slot: 5,
                same_weekday: SameWeekdayPolicy::Today,
            },
            temporal: TemporalConfig {
                dayparts: DaypartDefaults::default(),
                assume_pm_below_hour: 10,
            },
            dialogue: DialogueConfig { history_window: 10, idle_timeout_secs: 1800 },
            database: DatabaseConfig {
                url: "sqlite://goodtable.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Disabled,
                api_key: None,
                base_url: None,
                model: None,
                timeout_secs: 15,
                max_tokens: 300,
                temperature: 0.7,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" | "none" => Ok(Self::Disabled),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected disabled|openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut provider_explicit = false;
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            provider_explicit |= patch.llm.as_ref().is_some_and(|llm| llm.provider.is_some());
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("goodtable.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        provider_explicit |= config.apply_env_overrides()?;
        provider_explicit |= options.overrides.llm_provider.is_some();
        config.apply_overrides(options.overrides);
        if !provider_explicit {
            config.detect_llm_from_vendor_keys();
        }
        config.validate()?;

        Ok(config)
    }

    pub fn knowledge(&self) -> RestaurantKnowledge {
        RestaurantKnowledge::new(self.restaurant.clone(), self.hours.clone(), self.menu.clone())
    }

    pub fn reservation_rules(&self) -> ReservationRules {
        ReservationRules {
            min_party_size: self.reservations.min_party_size,
            max_party_size: self.reservations.max_party_size,
            max_days_ahead: self.reservations.max_days_ahead,
            slot_interval_minutes: self.reservations.slot_interval_minutes,
        }
    }

    pub fn temporal_settings(&self) -> TemporalSettings {
        TemporalSettings {
            same_weekday: self.reservations.same_weekday,
            dayparts: self.temporal.dayparts.clone(),
            assume_pm_below_hour: self.temporal.assume_pm_below_hour,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(restaurant) = patch.restaurant {
            let profile = &mut self.restaurant;
            for (target, value) in [
                (&mut profile.name, restaurant.name),
                (&mut profile.address, restaurant.address),
                (&mut profile.phone, restaurant.phone),
                (&mut profile.email, restaurant.email),
                (&mut profile.website, restaurant.website),
                (&mut profile.location_note, restaurant.location_note),
                (&mut profile.cuisine, restaurant.cuisine),
                (&mut profile.events, restaurant.events),
                (&mut profile.payments, restaurant.payments),
            ] {
                if let Some(value) = value {
                    *target = value;
                }
            }
        }

        if let Some(hours) = patch.hours {
            for (weekday, raw) in hours.entries() {
                if let Some(raw) = raw {
                    let parsed = DayHours::parse(&raw).map_err(|reason| {
                        ConfigError::Validation(format!(
                            "hours.{}: {reason}",
                            weekday_name(weekday).to_ascii_lowercase()
                        ))
                    })?;
                    self.hours.set(weekday, parsed);
                }
            }
        }

        if let Some(menu) = patch.menu {
            self.menu = menu;
        }

        if let Some(reservations) = patch.reservations {
            if let Some(min_party_size) = reservations.min_party_size {
                self.reservations.min_party_size = min_party_size;
            }
            if let Some(max_party_size) = reservations.max_party_size {
                self.reservations.max_party_size = max_party_size;
            }
            if let Some(max_days_ahead) = reservations.max_days_ahead {
                self.reservations.max_days_ahead = max_days_ahead;
            }
            if let Some(slot_interval_minutes) = reservations.slot_interval_minutes {
                self.reservations.slot_interval_minutes = slot_interval_minutes;
            }
            if let Some(tables_per_slot) = reservations.tables_per_slot {
                self.reservations.tables_per_slot = tables_per_slot;
            }
            if let Some(same_weekday) = reservations.same_weekday {
                self.reservations.same_weekday = same_weekday;
            }
        }

        if let Some(temporal) = patch.temporal {
            let dayparts = &mut self.temporal.dayparts;
            for (key, target, value) in [
                ("morning", &mut dayparts.morning, temporal.morning),
                ("noon", &mut dayparts.noon, temporal.noon),
                ("lunch", &mut dayparts.lunch, temporal.lunch),
                ("afternoon", &mut dayparts.afternoon, temporal.afternoon),
                ("evening", &mut dayparts.evening, temporal.evening),
                ("dinner", &mut dayparts.dinner, temporal.dinner),
                ("night", &mut dayparts.night, temporal.night),
            ] {
                if let Some(value) = value {
                    *target = parse_clock(&format!("temporal.{key}"), &value)?;
                }
            }
            if let Some(assume_pm_below_hour) = temporal.assume_pm_below_hour {
                self.temporal.assume_pm_below_hour = assume_pm_below_hour;
            }
        }

        if let Some(dialogue) = patch.dialogue {
            if let Some(history_window) = dialogue.history_window {
                self.dialogue.history_window = history_window;
            }
            if let Some(idle_timeout_secs) = dialogue.idle_timeout_secs {
                self.dialogue.idle_timeout_secs = idle_timeout_secs;
            }
        }

        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = Some(model);
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    /// Returns whether the environment chose the llm provider.
    fn apply_env_overrides(&mut self) -> Result<bool, ConfigError> {
        if let Some(value) = read_env("GOODTABLE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("GOODTABLE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("GOODTABLE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("GOODTABLE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("GOODTABLE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("GOODTABLE_RESERVATIONS_MIN_PARTY_SIZE") {
            self.reservations.min_party_size =
                parse_u32("GOODTABLE_RESERVATIONS_MIN_PARTY_SIZE", &value)?;
        }
        if let Some(value) = read_env("GOODTABLE_RESERVATIONS_MAX_PARTY_SIZE") {
            self.reservations.max_party_size =
                parse_u32("GOODTABLE_RESERVATIONS_MAX_PARTY_SIZE", &value)?;
        }
        if let Some(value) = read_env("GOODTABLE_RESERVATIONS_MAX_DAYS_AHEAD") {
            self.reservations.max_days_ahead =
                parse_u32("GOODTABLE_RESERVATIONS_MAX_DAYS_AHEAD", &value)?;
        }
        if let Some(value) = read_env("GOODTABLE_RESERVATIONS_SLOT_INTERVAL_MINUTES") {
            self.reservations.slot_interval_minutes =
                parse_u32("GOODTABLE_RESERVATIONS_SLOT_INTERVAL_MINUTES", &value)?;
        }
        if let Some(value) = read_env("GOODTABLE_RESERVATIONS_TABLES_PER_SLOT") {
            self.reservations.tables_per_slot =
                parse_u32("GOODTABLE_RESERVATIONS_TABLES_PER_SLOT", &value)?;
        }
        if let Some(value) = read_env("GOODTABLE_RESERVATIONS_SAME_WEEKDAY") {
            self.reservations.same_weekday =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "GOODTABLE_RESERVATIONS_SAME_WEEKDAY".to_string(),
                    value: value.clone(),
                })?;
        }

        if let Some(value) = read_env("GOODTABLE_DIALOGUE_HISTORY_WINDOW") {
            self.dialogue.history_window =
                parse_u32("GOODTABLE_DIALOGUE_HISTORY_WINDOW", &value)? as usize;
        }
        if let Some(value) = read_env("GOODTABLE_DIALOGUE_IDLE_TIMEOUT_SECS") {
            self.dialogue.idle_timeout_secs =
                parse_u64("GOODTABLE_DIALOGUE_IDLE_TIMEOUT_SECS", &value)?;
        }

        let mut provider_explicit = false;
        if let Some(value) = read_env("GOODTABLE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
            provider_explicit = true;
        }
        if let Some(value) = read_env("GOODTABLE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("GOODTABLE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("GOODTABLE_LLM_MODEL") {
            self.llm.model = Some(value);
        }
        if let Some(value) = read_env("GOODTABLE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("GOODTABLE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("GOODTABLE_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("GOODTABLE_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("GOODTABLE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("GOODTABLE_LLM_TEMPERATURE", &value)?;
        }

        let log_level =
            read_env("GOODTABLE_LOGGING_LEVEL").or_else(|| read_env("GOODTABLE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("GOODTABLE_LOGGING_FORMAT").or_else(|| read_env("GOODTABLE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(provider_explicit)
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = Some(llm_model);
        }
        if let Some(same_weekday) = overrides.same_weekday {
            self.reservations.same_weekday = same_weekday;
        }
    }

    /// With no provider chosen anywhere, a vendor key in the environment
    /// enables that vendor. OpenAI is checked first.
    fn detect_llm_from_vendor_keys(&mut self) {
        let detected = read_env("OPENAI_API_KEY")
            .map(|key| (LlmProvider::OpenAi, key))
            .or_else(|| read_env("ANTHROPIC_API_KEY").map(|key| (LlmProvider::Anthropic, key)));

        if let Some((provider, key)) = detected {
            self.llm.provider = provider;
            if self.llm.api_key.is_none() {
                self.llm.api_key = Some(secret_value(key));
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_hours(&self.hours)?;
        validate_reservations(&self.reservations)?;
        validate_temporal(&self.temporal)?;
        validate_dialogue(&self.dialogue)?;
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("goodtable.toml"), PathBuf::from("config/goodtable.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_hours(hours: &OpeningHours) -> Result<(), ConfigError> {
    if hours.closed_days().len() == WEEK.len() {
        return Err(ConfigError::Validation(
            "hours must leave at least one weekday open".to_string(),
        ));
    }
    Ok(())
}

fn validate_reservations(reservations: &ReservationsConfig) -> Result<(), ConfigError> {
    if reservations.min_party_size == 0 {
        return Err(ConfigError::Validation(
            "reservations.min_party_size must be greater than zero".to_string(),
        ));
    }
    if reservations.max_party_size < reservations.min_party_size {
        return Err(ConfigError::Validation(
            "reservations.max_party_size must be at least reservations.min_party_size"
                .to_string(),
        ));
    }
    if reservations.slot_interval_minutes > 0 && 1440 % reservations.slot_interval_minutes != 0 {
        return Err(ConfigError::Validation(
            "reservations.slot_interval_minutes must divide a day evenly (e.g. 15, 30, 60)"
                .to_string(),
        ));
    }
    if reservations.tables_per_slot == 0 {
        return Err(ConfigError::Validation(
            "reservations.tables_per_slot must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_temporal(temporal: &TemporalConfig) -> Result<(), ConfigError> {
    if temporal.assume_pm_below_hour > 12 {
        return Err(ConfigError::Validation(
            "temporal.assume_pm_below_hour must be in range 0..=12".to_string(),
        ));
    }
    Ok(())
}

fn validate_dialogue(dialogue: &DialogueConfig) -> Result<(), ConfigError> {
    if dialogue.history_window == 0 {
        return Err(ConfigError::Validation(
            "dialogue.history_window must be greater than zero".to_string(),
        ));
    }
    if dialogue.idle_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "dialogue.idle_timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::Disabled => {}
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_clock(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ConfigError::Validation(format!("{key} must be an HH:MM time, got `{value}`")))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    restaurant: Option<RestaurantPatch>,
    hours: Option<HoursPatch>,
    menu: Option<Vec<MenuCategory>>,
    reservations: Option<ReservationsPatch>,
    temporal: Option<TemporalPatch>,
    dialogue: Option<DialoguePatch>,
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RestaurantPatch {
    name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    location_note: Option<String>,
    cuisine: Option<String>,
    events: Option<String>,
    payments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HoursPatch {
    monday: Option<String>,
    tuesday: Option<String>,
    wednesday: Option<String>,
    thursday: Option<String>,
    friday: Option<String>,
    saturday: Option<String>,
    sunday: Option<String>,
}

impl HoursPatch {
    fn entries(self) -> [(Weekday, Option<String>); 7] {
        [
            (Weekday::Mon, self.monday),
            (Weekday::Tue, self.tuesday),
            (Weekday::Wed, self.wednesday),
            (Weekday::Thu, self.thursday),
            (Weekday::Fri, self.friday),
            (Weekday::Sat, self.saturday),
            (Weekday::Sun, self.sunday),
        ]
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReservationsPatch {
    min_party_size: Option<u32>,
    max_party_size: Option<u32>,
    max_days_ahead: Option<u32>,
    slot_interval_minutes: Option<u32>,
    tables_per_slot: Option<u32>,
    same_weekday: Option<SameWeekdayPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct TemporalPatch {
    morning: Option<String>,
    noon: Option<String>,
    lunch: Option<String>,
    afternoon: Option<String>,
    evening: Option<String>,
    dinner: Option<String>,
    night: Option<String>,
    assume_pm_below_hour: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DialoguePatch {
    history_window: Option<usize>,
    idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
