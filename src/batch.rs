use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::client::ImageGenerator;
use crate::config::Config;
use crate::request::{GenerationRequest, ImageMediaType};
use crate::Result;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
pub const OUTPUT_EXTENSION: &str = "png";
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Output already existed; no request was sent.
    Skipped,
    Succeeded { bytes: usize },
    /// The stream completed without an image.
    Empty,
    Failed { kind: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub input: String,
    pub output: String,
    pub outcome: FileOutcome,
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            input,
            output,
            outcome,
        } = self;
        match outcome {
            FileOutcome::Skipped => write!(f, "[SKIP] {input} -> {output} already exists"),
            FileOutcome::Succeeded { bytes } => {
                write!(f, "[GEN]  {input} -> {output} ... OK ({bytes} bytes)")
            }
            FileOutcome::Empty => {
                write!(f, "[GEN]  {input} -> {output} ... FAILED (no image in response)")
            }
            FileOutcome::Failed { kind, message } => {
                write!(f, "[GEN]  {input} -> {output} ... ERROR ({kind}: {message})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    pub name: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    /// Output directory contents after the run, including outputs from earlier runs.
    pub outputs: Vec<OutputEntry>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|file| pred(&file.outcome)).count()
    }

    pub fn attempted(&self) -> usize {
        self.count(|outcome| !matches!(outcome, FileOutcome::Skipped))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Skipped))
    }

    pub fn succeeded(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Succeeded { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Empty))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Failed { .. }))
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.files.iter().map(|file| file.input.as_str()).collect();
        writeln!(f, "Found {} images: {names:?}", names.len())?;
        for file in &self.files {
            writeln!(f, "{file}")?;
        }
        writeln!(f)?;
        writeln!(f, "Done! Generated images:")?;
        for entry in &self.outputs {
            writeln!(f, "  {} ({} bytes)", entry.name, entry.bytes)?;
        }
        Ok(())
    }
}

fn is_candidate_name(name: &Path) -> bool {
    name.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Image files directly inside `input_dir`, sorted by file name.
pub async fn list_candidates(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut names = Vec::<OsString>::new();
    let mut entries = tokio::fs::read_dir(input_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !is_candidate_name(Path::new(&name)) {
            continue;
        }
        match tokio::fs::metadata(entry.path()).await {
            Ok(metadata) if metadata.is_file() => names.push(name),
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), "skipping unreadable input: {err}");
                continue;
            }
        }
    }
    names.sort();
    Ok(names.into_iter().map(|name| input_dir.join(name)).collect())
}

/// `<output_dir>/<input stem>.png`, whatever the input extension.
pub fn output_path_for(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    output_dir.join(name)
}

/// Regular files in `output_dir`, sorted by name. In-flight `.partial` files
/// and entries whose metadata cannot be read (dangling symlinks) are left out.
pub async fn list_outputs(output_dir: &Path) -> Result<Vec<OutputEntry>> {
    let mut out = Vec::new();
    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(PARTIAL_SUFFIX) {
            continue;
        }
        let metadata = match tokio::fs::metadata(entry.path()).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), "leaving unreadable output out of summary: {err}");
                continue;
            }
        };
        out.push(OutputEntry {
            name,
            bytes: metadata.len(),
        });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_os_string();
    partial.push(PARTIAL_SUFFIX);
    let partial = PathBuf::from(partial);

    tokio::fs::write(&partial, bytes).await?;
    if let Err(err) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(err.into());
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Sequential, resumable driver: one generation per input without an output.
pub struct BatchDriver<'a, G: ?Sized> {
    generator: &'a G,
    prompt: &'a str,
    input_dir: &'a Path,
    output_dir: &'a Path,
}

impl<'a, G> BatchDriver<'a, G>
where
    G: ImageGenerator + ?Sized,
{
    pub fn new(config: &'a Config, generator: &'a G) -> Self {
        Self {
            generator,
            prompt: &config.prompt,
            input_dir: &config.input_dir,
            output_dir: &config.output_dir,
        }
    }

    pub fn with_dirs(
        generator: &'a G,
        prompt: &'a str,
        input_dir: &'a Path,
        output_dir: &'a Path,
    ) -> Self {
        Self {
            generator,
            prompt,
            input_dir,
            output_dir,
        }
    }

    /// Fails only on setup errors (unreadable input directory, uncreatable
    /// output directory). Per-file failures are recorded in the report.
    pub async fn run(&self) -> Result<BatchReport> {
        tokio::fs::create_dir_all(self.output_dir).await?;
        let candidates = list_candidates(self.input_dir).await?;
        tracing::info!(
            count = candidates.len(),
            input_dir = %self.input_dir.display(),
            "found candidate images"
        );

        let mut files = Vec::with_capacity(candidates.len());
        for input in &candidates {
            files.push(self.process(input).await);
        }

        // The per-file work is done; a failed listing only costs the summary.
        let outputs = match list_outputs(self.output_dir).await {
            Ok(outputs) => outputs,
            Err(err) => {
                tracing::warn!(output_dir = %self.output_dir.display(), kind = err.kind(), "failed to list outputs: {err}");
                Vec::new()
            }
        };
        Ok(BatchReport { files, outputs })
    }

    async fn process(&self, input: &Path) -> FileReport {
        let output_path = output_path_for(self.output_dir, input);
        let report = |outcome| FileReport {
            input: display_name(input),
            output: display_name(&output_path),
            outcome,
        };

        match tokio::fs::try_exists(&output_path).await {
            Ok(true) => {
                tracing::info!(input = %input.display(), output = %output_path.display(), "skip: output exists");
                return report(FileOutcome::Skipped);
            }
            Ok(false) => {}
            Err(err) => {
                let err = crate::IllustrateError::from(err);
                tracing::warn!(input = %input.display(), kind = err.kind(), "failed: {err}");
                return report(FileOutcome::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        }

        tracing::info!(
            input = %input.display(),
            output = %output_path.display(),
            model = self.generator.model_id(),
            "generate"
        );
        let outcome = match self.generate_one(input, &output_path).await {
            Ok(Some(bytes)) => {
                tracing::info!(input = %input.display(), bytes, "succeeded");
                FileOutcome::Succeeded { bytes }
            }
            Ok(None) => {
                tracing::warn!(input = %input.display(), "empty: no image in response");
                FileOutcome::Empty
            }
            Err(err) => {
                tracing::warn!(input = %input.display(), kind = err.kind(), "failed: {err}");
                FileOutcome::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };
        report(outcome)
    }

    async fn generate_one(&self, input: &Path, output_path: &Path) -> Result<Option<usize>> {
        let image = tokio::fs::read(input).await?;
        let request = GenerationRequest::for_sketch(
            self.generator.model_id(),
            self.prompt,
            &image,
            ImageMediaType::from_path(input),
        );
        let Some(bytes) = self.generator.generate(&request).await? else {
            return Ok(None);
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        write_output(output_path, &bytes).await?;
        Ok(Some(bytes.len()))
    }
}
