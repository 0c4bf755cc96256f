// json.rs - JSON Backend Shim
// Every document the bot persists goes through this module. A backend is
// picked once at startup from an ordered preference list; callers only ever
// see text, whatever the backend produces.
//
// Used by: storage.rs, main.rs (backend selection)

use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::io::{Read, Write};

/// Error types for JSON encoding and decoding
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("JSON backend produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw output of a backend before normalization
pub enum Encoded {
    Text(String),
    Bytes(Vec<u8>),
}

impl Encoded {
    fn into_text(self) -> Result<String, JsonError> {
        match self {
            Encoded::Text(text) => Ok(text),
            Encoded::Bytes(bytes) => Ok(String::from_utf8(bytes)?),
        }
    }
}

/// A registered JSON implementation
pub struct Backend {
    pub name: &'static str,
    encode: fn(&Value) -> Result<Encoded, serde_json::Error>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("name", &self.name).finish()
    }
}

fn encode_text(value: &Value) -> Result<Encoded, serde_json::Error> {
    serde_json::to_string(value).map(Encoded::Text)
}

fn encode_vec(value: &Value) -> Result<Encoded, serde_json::Error> {
    serde_json::to_vec(value).map(Encoded::Bytes)
}

fn encode_pretty(value: &Value) -> Result<Encoded, serde_json::Error> {
    serde_json::to_string_pretty(value).map(Encoded::Text)
}

/// The standard backend, used when nothing in the preference list is known
pub static STANDARD: Backend = Backend {
    name: "serde_json",
    encode: encode_text,
};

static BACKENDS: [&Backend; 3] = [
    &STANDARD,
    &Backend {
        name: "serde_json_vec",
        encode: encode_vec,
    },
    &Backend {
        name: "serde_json_pretty",
        encode: encode_pretty,
    },
];

pub const DEFAULT_PREFERENCES: &[&str] = &["serde_json_vec", "serde_json"];

static SELECTED: OnceCell<&'static Backend> = OnceCell::new();

/// Pick the first registered backend named in `preferences`
pub fn select(preferences: &[&str]) -> &'static Backend {
    for name in preferences {
        let name = name.trim();
        if let Some(backend) = BACKENDS.iter().find(|b| b.name.eq_ignore_ascii_case(name)) {
            return *backend;
        }
        debug!("[JSON] Backend '{}' is not available, trying next", name);
    }
    &STANDARD
}

/// Fix the process-wide backend. Later calls keep the first choice.
pub fn init(preferences: &[&str]) -> &'static Backend {
    let chosen = select(preferences);
    match SELECTED.set(chosen) {
        Ok(()) => info!("[JSON] Using backend '{}'", chosen.name),
        Err(_) => warn!(
            "[JSON] Backend already initialised as '{}', ignoring '{}'",
            backend().name,
            chosen.name
        ),
    }
    backend()
}

/// The active backend (defaults to the preference list if `init` never ran)
pub fn backend() -> &'static Backend {
    SELECTED.get_or_init(|| select(DEFAULT_PREFERENCES))
}

/// Serialize to text with the active backend
pub fn dumps<T: Serialize + ?Sized>(value: &T) -> Result<String, JsonError> {
    dumps_with(backend(), value)
}

/// Serialize to text with a specific backend
pub fn dumps_with<T: Serialize + ?Sized>(backend: &Backend, value: &T) -> Result<String, JsonError> {
    let value = serde_json::to_value(value)?;
    (backend.encode)(&value)?.into_text()
}

/// Serialize into a writer
pub fn dump<T: Serialize + ?Sized, W: Write>(value: &T, mut writer: W) -> Result<(), JsonError> {
    let text = dumps(value)?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Deserialize from text
pub fn loads<T: DeserializeOwned>(text: &str) -> Result<T, JsonError> {
    Ok(serde_json::from_str(text)?)
}

/// Deserialize from a reader
pub fn load<T: DeserializeOwned, R: Read>(mut reader: R) -> Result<T, JsonError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    loads(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        balance: i64,
        tags: Vec<String>,
        by_id: HashMap<u64, bool>,
    }

    fn sample() -> Sample {
        let mut by_id = HashMap::new();
        by_id.insert(1234567890123, true);
        by_id.insert(42, false);
        Sample {
            name: "Twentysix bank".to_string(),
            balance: i64::MAX,
            tags: vec!["a".to_string(), "ü".to_string()],
            by_id,
        }
    }

    #[test]
    fn test_select_prefers_first_known() {
        assert_eq!(select(&["orjson", "serde_json_pretty", "serde_json"]).name, "serde_json_pretty");
        assert_eq!(select(&["SERDE_JSON_VEC"]).name, "serde_json_vec");
    }

    #[test]
    fn test_select_falls_back_to_standard() {
        assert_eq!(select(&[]).name, "serde_json");
        assert_eq!(select(&["ujson", "rapidjson"]).name, "serde_json");
    }

    #[test]
    fn test_every_backend_round_trips_to_text() {
        let value = sample();
        for backend in BACKENDS.iter() {
            let text = dumps_with(backend, &value).unwrap();
            let back: Sample = loads(&text).unwrap();
            assert_eq!(back, value, "backend {}", backend.name);
        }
    }

    #[test]
    fn test_dump_and_load_through_io() {
        let value = sample();
        let mut buffer = Vec::new();
        dump(&value, &mut buffer).unwrap();
        let back: Sample = load(buffer.as_slice()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_loads_rejects_garbage() {
        assert!(matches!(loads::<Sample>("{not json"), Err(JsonError::Serde(_))));
    }
}
