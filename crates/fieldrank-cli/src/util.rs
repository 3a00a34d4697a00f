use std::{
    fmt, fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Serialize, de::DeserializeOwned};

use crate::schema::dataset::Dataset;

/// Destination of a command's JSON report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    /// Writes `value` to `path`, or to stdout when no path is given.
    pub fn save_json<T>(value: &T, path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        path.map_or(Output::Stdout, Output::File).write_json(value)
    }

    pub fn write_json<T>(&self, value: &T) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let written = match self {
            Output::Stdout => write_pretty(io::stdout().lock(), value),
            Output::File(path) => {
                let file = fs::File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                write_pretty(BufWriter::new(file), value)?;
                tracing::info!(path = %path.display(), "wrote report");
                Ok(())
            }
        };
        written.with_context(|| format!("Failed to write JSON report to {self}"))
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout => f.write_str("stdout"),
            Output::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Pretty JSON followed by a newline, flushed.
fn write_pretty<W, T>(mut writer: W, value: &T) -> anyhow::Result<()>
where
    W: Write,
    T: Serialize,
{
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Reads and parses a JSON document; `kind` names it in error messages.
pub fn read_json_file<T, P>(kind: &str, path: P) -> anyhow::Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {kind} file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {kind} JSON file: {}", path.display()))
}

/// Read a dataset document and check every event against its metric catalog
///
/// # Errors
///
/// Returns error if the file cannot be opened or parsed, or if an event does
/// not match the catalog
pub fn read_dataset_file<P>(path: P) -> anyhow::Result<Dataset>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let dataset: Dataset = read_json_file("dataset", path)?;
    for event in &dataset.events {
        event
            .validate(&dataset.metrics)
            .with_context(|| format!("Invalid event in dataset: {}", path.display()))?;
    }
    tracing::info!(
        path = %path.display(),
        metrics = dataset.metrics.len(),
        events = dataset.events.len(),
        "loaded dataset"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fieldrank-util-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_write_pretty_ends_with_newline() {
        let mut buf = Vec::new();
        write_pretty(&mut buf, &BTreeMap::from([("seed", 7)])).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "{\n  \"seed\": 7\n}\n");
    }

    #[test]
    fn test_file_output_reads_back() {
        let path = scratch("report.json");
        let value = BTreeMap::from([("top20".to_owned(), 85.0)]);
        Output::save_json(&value, Some(path.clone())).unwrap();
        let parsed: BTreeMap<String, f64> = read_json_file("report", &path).unwrap();
        assert_eq!(parsed, value);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_errors_name_the_kind() {
        let path = scratch("missing.json");
        let err = read_json_file::<BTreeMap<String, f64>, _>("config", &path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));

        let path = scratch("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = read_json_file::<BTreeMap<String, f64>, _>("config", &path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config JSON file"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_output_display() {
        assert_eq!(Output::Stdout.to_string(), "stdout");
        assert_eq!(Output::File(PathBuf::from("out.json")).to_string(), "out.json");
    }
}
