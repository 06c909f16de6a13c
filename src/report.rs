//! Plot report renderer
//!
//! Loads a serialized list of plot records, substitutes them into the
//! `{{plots[i][0]}}` / `{{plots[i][1]}}` placeholders of an HTML template and
//! writes the rendered report.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Errors that can occur while rendering a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Input file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to deserialize plot list from {0}: {1}")]
    Deserialization(PathBuf, String),

    #[error("Template {0} is not valid UTF-8 text")]
    Encoding(PathBuf),

    #[error("Failed to write report {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

/// A single plot: encoded image content, its description and a type label.
///
/// On disk a record is a positional triple `(content, description, plot_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(String, String, String)",
    into = "(String, String, String)"
)]
pub struct PlotRecord {
    pub content: String,
    pub description: String,
    /// Carried through from the artifact; never substituted into the report.
    pub plot_type: String,
}

impl PlotRecord {
    pub fn new(
        content: impl Into<String>,
        description: impl Into<String>,
        plot_type: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            description: description.into(),
            plot_type: plot_type.into(),
        }
    }

    /// The text substituted for the given slot
    pub fn field(&self, slot: Slot) -> &str {
        match slot {
            Slot::Content => &self.content,
            Slot::Description => &self.description,
        }
    }
}

impl From<(String, String, String)> for PlotRecord {
    fn from((content, description, plot_type): (String, String, String)) -> Self {
        Self {
            content,
            description,
            plot_type,
        }
    }
}

impl From<PlotRecord> for (String, String, String) {
    fn from(record: PlotRecord) -> Self {
        (record.content, record.description, record.plot_type)
    }
}

/// Serialization scheme of a plot list artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Json,
    Cbor,
    Pickle,
}

impl ArtifactFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "cbor" => Some(Self::Cbor),
            "pickle" | "pkl" => Some(Self::Pickle),
            _ => None,
        }
    }

    /// Guess the format from the artifact's extension.
    ///
    /// Anything unrecognised is treated as a Python pickle, which is what the
    /// analysis notebooks emit.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_name)
            .unwrap_or(Self::Pickle)
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Cbor => "cbor",
            Self::Pickle => "pickle",
        };
        f.write_str(name)
    }
}

/// Ordered list of plot records; index `i` feeds the `plots[i]` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlotList(pub Vec<PlotRecord>);

impl PlotList {
    pub fn new(records: Vec<PlotRecord>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlotRecord> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlotRecord> {
        self.0.iter()
    }

    /// Decode a plot list from raw artifact bytes
    pub fn from_bytes(bytes: &[u8], format: ArtifactFormat) -> Result<Self, String> {
        match format {
            ArtifactFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            ArtifactFormat::Cbor => ciborium::from_reader(bytes).map_err(|e| e.to_string()),
            ArtifactFormat::Pickle => {
                serde_pickle::from_slice(bytes, serde_pickle::DeOptions::new())
                    .map_err(|e| e.to_string())
            }
        }
    }

    /// Load a plot list artifact, inferring the format from the extension
    /// unless one is given.
    pub fn load(path: &Path, format: Option<ArtifactFormat>) -> Result<Self, ReportError> {
        let format = format.unwrap_or_else(|| ArtifactFormat::from_path(path));
        log::debug!("Loading plot list {} as {}", path.display(), format);

        let bytes = read_input(path)?;
        let plots = Self::from_bytes(&bytes, format)
            .map_err(|message| ReportError::Deserialization(path.to_path_buf(), message))?;

        for (index, record) in plots.iter().enumerate() {
            log::debug!("plots[{}]: type={:?}", index, record.plot_type);
        }

        Ok(plots)
    }
}

impl<'a> IntoIterator for &'a PlotList {
    type Item = &'a PlotRecord;
    type IntoIter = std::slice::Iter<'a, PlotRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Which field of a record a placeholder refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Content,
    Description,
}

impl Slot {
    fn from_digit(digit: &str) -> Option<Self> {
        match digit {
            "0" => Some(Self::Content),
            "1" => Some(Self::Description),
            _ => None,
        }
    }

    fn as_digit(self) -> u8 {
        match self {
            Self::Content => 0,
            Self::Description => 1,
        }
    }
}

/// A well-formed `{{plots[index][slot]}}` token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Placeholder {
    pub index: usize,
    pub slot: Slot,
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{plots[{}][{}]}}}}", self.index, self.slot.as_digit())
    }
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{plots\[(\d+)\]\[(\d+)\]\}\}").expect("placeholder pattern is valid")
});

/// Parse a matched token. Indices with leading zeros or that overflow, and
/// slots other than 0 and 1, are not placeholders.
fn parse_placeholder(caps: &Captures<'_>) -> Option<Placeholder> {
    let digits = caps.get(1)?.as_str();
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    let index = digits.parse().ok()?;
    let slot = Slot::from_digit(caps.get(2)?.as_str())?;
    Some(Placeholder { index, slot })
}

/// Output of a single substitution pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Number of tokens replaced with record fields
    pub substituted: usize,
    /// Tokens left in place because no record has their index
    pub unresolved: Vec<Placeholder>,
}

/// Raw report template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read a template from disk; it must be valid UTF-8
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let bytes = read_input(path)?;
        let text =
            String::from_utf8(bytes).map_err(|_| ReportError::Encoding(path.to_path_buf()))?;
        Ok(Self(text))
    }

    /// Every placeholder token in the template, in order of appearance
    pub fn placeholders(&self) -> Vec<Placeholder> {
        PLACEHOLDER
            .captures_iter(&self.0)
            .filter_map(|caps| parse_placeholder(&caps))
            .collect()
    }

    /// Substitute `plots` into the template.
    pub fn render(&self, plots: &PlotList) -> String {
        self.render_with_summary(plots).text
    }

    /// Substitute `plots` into the template, reporting what was replaced.
    ///
    /// The template is scanned once, so text inserted from a record is never
    /// itself searched for placeholders.
    pub fn render_with_summary(&self, plots: &PlotList) -> Rendered {
        let mut substituted = 0;
        let mut unresolved = Vec::new();

        let text = PLACEHOLDER.replace_all(&self.0, |caps: &Captures<'_>| {
            let Some(placeholder) = parse_placeholder(caps) else {
                return caps[0].to_string();
            };
            match plots.get(placeholder.index) {
                Some(record) => {
                    substituted += 1;
                    record.field(placeholder.slot).to_string()
                }
                None => {
                    unresolved.push(placeholder);
                    caps[0].to_string()
                }
            }
        });

        Rendered {
            text: text.into_owned(),
            substituted,
            unresolved,
        }
    }
}

/// Write the rendered report, replacing any existing file
pub fn save_report(report: &str, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, report).map_err(|e| ReportError::Write(path.to_path_buf(), e))
}

fn read_input(path: &Path) -> Result<Vec<u8>, ReportError> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ReportError::FileNotFound(path.to_path_buf())
        } else {
            ReportError::Read(path.to_path_buf(), e)
        }
    })
}

/// What a completed run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    pub records: usize,
    pub substituted: usize,
    pub unresolved: Vec<Placeholder>,
    pub output: PathBuf,
}

/// Load → render → save, with every path given explicitly
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    pub plots_path: PathBuf,
    pub template_path: PathBuf,
    pub output_path: PathBuf,
    pub format: Option<ArtifactFormat>,
}

impl ReportRenderer {
    pub fn new(
        plots_path: impl Into<PathBuf>,
        template_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            plots_path: plots_path.into(),
            template_path: template_path.into(),
            output_path: output_path.into(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: Option<ArtifactFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn run(&self) -> Result<RenderSummary, ReportError> {
        let plots = PlotList::load(&self.plots_path, self.format)?;
        log::debug!("Loaded {} plot records", plots.len());

        let template = Template::load(&self.template_path)?;

        let referenced: BTreeSet<usize> = template
            .placeholders()
            .into_iter()
            .map(|p| p.index)
            .collect();
        for index in (0..plots.len()).filter(|i| !referenced.contains(i)) {
            log::warn!(
                "plots[{}] is not referenced by template {}",
                index,
                self.template_path.display()
            );
        }

        let rendered = template.render_with_summary(&plots);
        for placeholder in &rendered.unresolved {
            log::warn!(
                "Leaving {} unresolved: only {} plot records loaded",
                placeholder,
                plots.len()
            );
        }

        save_report(&rendered.text, &self.output_path)?;

        Ok(RenderSummary {
            records: plots.len(),
            substituted: rendered.substituted,
            unresolved: rendered.unresolved,
            output: self.output_path.clone(),
        })
    }
}
