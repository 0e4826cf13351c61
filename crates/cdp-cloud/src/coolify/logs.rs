use serde::Deserialize;

#[derive(Deserialize)]
struct LogRecord {
    #[serde(default)]
    output: Option<String>,
}

/// Render a deployment's `logs` payload as text.
///
/// The payload is a JSON string holding an array of `{ "output": ... }`
/// records; each output becomes one line. Anything else is returned as is.
pub fn parse_logs(raw: &str) -> String {
    let records: Vec<LogRecord> = match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(e) => {
            tracing::trace!(error = %e, "log payload is not a record array, passing through");
            return raw.to_owned();
        }
    };

    let mut text = String::new();
    for output in records.into_iter().filter_map(|r| r.output) {
        text.push_str(&output);
        text.push('\n');
    }
    text
}
