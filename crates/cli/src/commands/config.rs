use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use goodtable_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run(options: LoadOptions) -> String {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let open_days = config
        .hours
        .describe_week()
        .into_iter()
        .map(|(weekday, hours)| format!("{weekday:?} {hours}"))
        .collect::<Vec<_>>()
        .join(", ");

    let fields = [
        Field::new("restaurant.name", config.restaurant.name.as_str(), &[]),
        Field::new("hours", open_days, &[]),
        Field::new("database.url", config.database.url.as_str(), &["GOODTABLE_DATABASE_URL"]),
        Field::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["GOODTABLE_DATABASE_MAX_CONNECTIONS"],
        ),
        Field::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["GOODTABLE_DATABASE_TIMEOUT_SECS"],
        ),
        Field::new(
            "reservations.max_party_size",
            config.reservations.max_party_size.to_string(),
            &["GOODTABLE_RESERVATIONS_MAX_PARTY_SIZE"],
        ),
        Field::new(
            "reservations.max_days_ahead",
            config.reservations.max_days_ahead.to_string(),
            &["GOODTABLE_RESERVATIONS_MAX_DAYS_AHEAD"],
        ),
        Field::new(
            "reservations.tables_per_slot",
            config.reservations.tables_per_slot.to_string(),
            &["GOODTABLE_RESERVATIONS_TABLES_PER_SLOT"],
        ),
        Field::new(
            "reservations.same_weekday",
            format!("{:?}", config.reservations.same_weekday),
            &["GOODTABLE_RESERVATIONS_SAME_WEEKDAY"],
        ),
        Field::new(
            "dialogue.history_window",
            config.dialogue.history_window.to_string(),
            &["GOODTABLE_DIALOGUE_HISTORY_WINDOW"],
        ),
        Field::new(
            "dialogue.idle_timeout_secs",
            config.dialogue.idle_timeout_secs.to_string(),
            &["GOODTABLE_DIALOGUE_IDLE_TIMEOUT_SECS"],
        ),
        Field::new(
            "llm.provider",
            config.llm.provider.as_str(),
            &["GOODTABLE_LLM_PROVIDER", "OPENAI_API_KEY", "ANTHROPIC_API_KEY"],
        ),
        Field::new("llm.model", config.llm.effective_model(), &["GOODTABLE_LLM_MODEL"]),
        Field::new(
            "llm.base_url",
            config.llm.base_url.as_deref().unwrap_or("<unset>"),
            &["GOODTABLE_LLM_BASE_URL"],
        ),
        Field::new(
            "llm.api_key",
            llm_api_key,
            &["GOODTABLE_LLM_API_KEY", "OPENAI_API_KEY", "ANTHROPIC_API_KEY"],
        ),
        Field::new(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["GOODTABLE_LLM_TIMEOUT_SECS"],
        ),
        Field::new(
            "logging.level",
            config.logging.level.as_str(),
            &["GOODTABLE_LOGGING_LEVEL", "GOODTABLE_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["GOODTABLE_LOGGING_FORMAT", "GOODTABLE_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    ["goodtable.toml", "config/goodtable.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
