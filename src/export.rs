use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::ExportError;
use crate::session::{Message, SessionSnapshot};
use crate::settings::Settings;

/// The JSON document written by an export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact<'a> {
    pub model: &'a str,
    pub settings: &'a Settings,
    pub messages: &'a [Message],
    pub exported_at: String,
}

/// `llm-conversation-<epoch-millis>.json`
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("llm-conversation-{}.json", at.timestamp_millis())
}

/// Write the snapshot to `dir` and return the file path.
pub fn export_conversation(
    snapshot: &SessionSnapshot,
    settings: &Settings,
    dir: &Path,
    at: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let artifact = ExportArtifact {
        model: &settings.model,
        settings,
        messages: &snapshot.history,
        exported_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    let json = serde_json::to_string_pretty(&artifact)?;

    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(export_file_name(at));
    fs::write(&path, json).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), messages = snapshot.history.len(), "conversation exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ConversationSession, Sender};
    use chrono::TimeZone;

    #[test]
    fn file_name_uses_epoch_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(export_file_name(at), "llm-conversation-1700000000123.json");
    }

    #[test]
    fn export_writes_session_data() {
        let mut session = ConversationSession::new();
        session.append(Sender::User, "Hello");
        session.append(Sender::Assistant, "Hi!");
        let snapshot = session.snapshot();
        let settings = Settings::with_model("claude-3-haiku");
        let dir = std::env::temp_dir().join(format!("llm-playground-export-{}", std::process::id()));
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let path = export_conversation(&snapshot, &settings, &dir, at).unwrap();
        assert!(path.ends_with("llm-conversation-1700000000000.json"));

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["model"], "claude-3-haiku");
        assert_eq!(doc["settings"]["temperature"], 0.7);
        assert_eq!(doc["messages"].as_array().unwrap().len(), 2);
        assert_eq!(doc["messages"][1]["sender"], "assistant");
        assert_eq!(doc["exportedAt"], "2023-11-14T22:13:20.000Z");

        // Exporting never touches the session.
        assert_eq!(session.snapshot(), snapshot);
        fs::remove_dir_all(&dir).ok();
    }
}
