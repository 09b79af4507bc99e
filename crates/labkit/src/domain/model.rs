//! Domain models for discovered scripts, annotated blocks, and concatenations.

use std::fmt;
use std::path::{Path, PathBuf};

/// Closing marker shared by every fence style.
pub const FENCE_CLOSE: &str = "```";

/// Code fence style chosen from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fence {
    /// Plain R scripts.
    R,
    /// R Markdown documents, wrapped as an embedded R chunk.
    RMarkdown,
    /// Quarto markdown documents.
    Quarto,
    /// Anything else gets an untagged fence.
    Plain,
}

impl Fence {
    /// Pick the fence for an already lowercased extension.
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "r" => Fence::R,
            "rmd" => Fence::RMarkdown,
            "qmd" => Fence::Quarto,
            _ => Fence::Plain,
        }
    }

    /// Opening marker including the language tag, if any.
    pub fn opening(&self) -> &'static str {
        match self {
            Fence::R => "```r",
            Fence::RMarkdown => "```{r}",
            Fence::Quarto => "```qmd",
            Fence::Plain => "```",
        }
    }

    pub fn closing(&self) -> &'static str {
        FENCE_CLOSE
    }
}

/// A script discovered on disk or supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub relative_path: String,
    pub extension: String,
}

impl FileRecord {
    /// Build a record, displaying the path relative to `working_dir` when the file lives inside
    /// it and as an absolute path otherwise.
    pub fn new(path: impl Into<PathBuf>, working_dir: &Path) -> Self {
        let path = path.into();
        let relative_path = display_path(&path, working_dir);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        Self {
            path,
            relative_path,
            extension,
        }
    }

    pub fn fence(&self) -> Fence {
        Fence::from_extension(&self.extension)
    }
}

fn display_path(path: &Path, working_dir: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    };
    let absolute = normalize(&absolute);

    match absolute.strip_prefix(normalize(working_dir)) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.display().to_string(),
        _ => absolute.display().to_string(),
    }
}

/// Lexically resolve `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// A single script rendered as a header plus fenced body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedBlock {
    pub header: String,
    pub fence_open: String,
    pub body_lines: Vec<String>,
    pub fence_close: String,
}

impl AnnotatedBlock {
    /// Annotate `content` for `record`. `None` content yields an empty body.
    pub fn from_record(record: &FileRecord, content: Option<&str>) -> Self {
        let fence = record.fence();
        Self {
            header: format!("## File: [{}]", record.relative_path),
            fence_open: fence.opening().to_owned(),
            body_lines: content
                .map(|text| text.lines().map(str::to_owned).collect())
                .unwrap_or_default(),
            fence_close: fence.closing().to_owned(),
        }
    }

    /// Render as text: blank line, header, fenced body, trailing blank line.
    pub fn render(&self) -> String {
        let mut lines: Vec<&str> = Vec::with_capacity(self.body_lines.len() + 5);
        lines.push("");
        lines.push(&self.header);
        lines.push(&self.fence_open);
        lines.extend(self.body_lines.iter().map(String::as_str));
        lines.push(&self.fence_close);
        lines.push("");
        lines.join("\n")
    }
}

impl fmt::Display for AnnotatedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Ordered blocks in discovery (or supply) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcatenationResult {
    blocks: Vec<AnnotatedBlock>,
}

impl ConcatenationResult {
    pub fn new(blocks: Vec<AnnotatedBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[AnnotatedBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Each block rendered to text, in order.
    pub fn rendered(&self) -> Vec<String> {
        self.blocks.iter().map(AnnotatedBlock::render).collect()
    }

    /// All blocks joined with newline separators.
    pub fn joined(&self) -> String {
        self.rendered().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_follows_lowercased_extension() {
        let cwd = Path::new("/work");
        assert_eq!(FileRecord::new("/work/a.R", cwd).fence(), Fence::R);
        assert_eq!(FileRecord::new("/work/b.RMD", cwd).fence(), Fence::RMarkdown);
        assert_eq!(FileRecord::new("/work/c.Qmd", cwd).fence(), Fence::Quarto);
        assert_eq!(FileRecord::new("/work/d.py", cwd).fence(), Fence::Plain);
        assert_eq!(FileRecord::new("/work/Makefile", cwd).fence(), Fence::Plain);
    }

    #[test]
    fn relative_path_inside_working_dir() {
        let record = FileRecord::new("/work/scripts/./clean.R", Path::new("/work"));
        assert_eq!(
            record.relative_path,
            Path::new("scripts").join("clean.R").display().to_string()
        );

        let relative = FileRecord::new("scripts/clean.R", Path::new("/work"));
        assert_eq!(relative.relative_path, record.relative_path);
    }

    #[test]
    fn absolute_path_outside_working_dir() {
        let record = FileRecord::new("/elsewhere/clean.R", Path::new("/work"));
        assert_eq!(
            record.relative_path,
            Path::new("/elsewhere/clean.R").display().to_string()
        );

        let escaped = FileRecord::new("../elsewhere/clean.R", Path::new("/work"));
        assert_eq!(escaped.relative_path, record.relative_path);
    }

    #[test]
    fn empty_body_still_renders_fences() {
        let record = FileRecord::new("/work/broken.qmd", Path::new("/work"));
        let block = AnnotatedBlock::from_record(&record, None);
        assert!(block.body_lines.is_empty());
        assert_eq!(block.render(), "\n## File: [broken.qmd]\n```qmd\n```\n");
    }

    #[test]
    fn joined_separates_blocks_with_newlines() {
        let cwd = Path::new("/work");
        let a = AnnotatedBlock::from_record(&FileRecord::new("/work/a.R", cwd), Some("x <- 1\n"));
        let b = AnnotatedBlock::from_record(&FileRecord::new("/work/b.txt", cwd), Some("hi"));
        let result = ConcatenationResult::new(vec![a.clone(), b.clone()]);
        assert_eq!(result.joined(), format!("{}\n{}", a.render(), b.render()));
    }
}
