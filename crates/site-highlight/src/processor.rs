//! Main processor that rewrites a directory of HTML files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arborium::GrammarStore;
use fs_err as fs;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::RewriteConfig;
use crate::error::ProcessError;
use crate::highlight::{ArboriumHighlighter, CodeHighlighter};
use crate::html::rewrite_html;

/// Options for the processor.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Directory holding the source HTML files.
    pub input_dir: PathBuf,
    /// Directory receiving the rewritten files (created if missing).
    pub output_dir: PathBuf,
    /// How marked blocks are found and rendered.
    pub rewrite: RewriteConfig,
}

impl ProcessOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            rewrite: RewriteConfig::default(),
        }
    }
}

/// Statistics from processing.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    /// Number of HTML files rewritten and written.
    pub files_processed: usize,
    /// Directory entries that were not `.html` files.
    pub files_skipped: usize,
    /// Number of code blocks highlighted.
    pub blocks_highlighted: usize,
    /// Total bytes read from input HTML files.
    pub bytes_input: u64,
    /// Total bytes written to output HTML files.
    pub bytes_output: u64,
    /// Time spent reading and rewriting files.
    pub process_duration: Duration,
}

impl ProcessorStats {
    /// Size change of the HTML, in percent of the input size.
    pub fn html_inflation_percent(&self) -> f64 {
        if self.bytes_input == 0 {
            0.0
        } else {
            (self.bytes_output as f64 - self.bytes_input as f64) / self.bytes_input as f64 * 100.0
        }
    }

    /// Rewrite throughput in MB/s.
    pub fn throughput_mb_s(&self) -> f64 {
        let secs = self.process_duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            (self.bytes_input as f64 / (1024.0 * 1024.0)) / secs
        }
    }
}

/// A file rewritten in memory, waiting to be written.
struct Rendered {
    file_name: OsString,
    html: String,
    input_size: usize,
    blocks_highlighted: usize,
}

/// Rewrites every `.html` file of a directory into an output directory.
pub struct Processor {
    options: ProcessOptions,
}

impl Processor {
    pub fn new(options: ProcessOptions) -> Self {
        Self { options }
    }

    /// Process the input directory with arborium highlighters.
    ///
    /// Each worker thread gets its own highlighter; compiled grammars are shared.
    pub fn process(&self) -> Result<ProcessorStats, ProcessError> {
        let store = Arc::new(GrammarStore::new());
        let prefix = self.options.rewrite.code_class.clone();
        self.process_with(|| ArboriumHighlighter::with_store(store.clone(), &prefix))
    }

    /// Process the input directory, creating one highlighter per worker thread.
    ///
    /// Nothing is written unless every file rewrites successfully.
    pub fn process_with<H, F>(&self, make_highlighter: F) -> Result<ProcessorStats, ProcessError>
    where
        H: CodeHighlighter,
        F: Fn() -> H + Sync + Send,
    {
        let ProcessOptions {
            input_dir,
            output_dir,
            rewrite,
        } = &self.options;

        if !input_dir.is_dir() {
            return Err(ProcessError::InvalidInput {
                path: input_dir.clone(),
                reason: if input_dir.exists() {
                    "not a directory"
                } else {
                    "does not exist"
                },
            });
        }

        fs::create_dir_all(output_dir)?;

        let (html_files, files_skipped) = collect_html_files(input_dir)?;
        debug!(
            input = %input_dir.display(),
            files = html_files.len(),
            skipped = files_skipped,
            "collected input files"
        );

        let progress = ProgressBar::new(html_files.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
        {
            progress.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }

        let process_start = Instant::now();

        // One highlighter per rayon worker; the first failure aborts the collect
        let rendered = html_files
            .par_iter()
            .map_init(&make_highlighter, |highlighter, path| {
                let rendered = render_file(path, highlighter, rewrite);
                progress.inc(1);
                rendered
            })
            .collect::<Result<Vec<_>, _>>();

        let process_duration = process_start.elapsed();
        progress.finish_and_clear();
        let rendered = rendered?;

        let mut stats = ProcessorStats {
            files_skipped,
            process_duration,
            ..Default::default()
        };

        for file in rendered {
            let out_path = output_dir.join(&file.file_name);
            fs::write(&out_path, &file.html)?;
            debug!(
                path = %out_path.display(),
                blocks = file.blocks_highlighted,
                "wrote file"
            );

            stats.files_processed += 1;
            stats.blocks_highlighted += file.blocks_highlighted;
            stats.bytes_input += file.input_size as u64;
            stats.bytes_output += file.html.len() as u64;
        }

        info!(
            files = stats.files_processed,
            blocks = stats.blocks_highlighted,
            output = %output_dir.display(),
            "processed directory"
        );

        Ok(stats)
    }
}

/// List the `.html` files directly inside `dir`, sorted by name.
///
/// Returns the files and the number of other entries. The suffix match is
/// exact and case-sensitive, so `page.HTML` is skipped. Symlinks count as
/// what they point to; a dangling link is skipped.
fn collect_html_files(dir: &Path) -> Result<(Vec<PathBuf>, usize), ProcessError> {
    let mut files = Vec::new();
    let mut skipped = 0;

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if is_file && is_html_file_name(entry.file_name()) {
            files.push(entry.into_path());
        } else {
            skipped += 1;
        }
    }

    Ok((files, skipped))
}

fn is_html_file_name(name: &std::ffi::OsStr) -> bool {
    name.as_encoded_bytes().ends_with(b".html")
}

/// Read and rewrite a single file without writing it.
fn render_file<H: CodeHighlighter>(
    path: &Path,
    highlighter: &mut H,
    config: &RewriteConfig,
) -> Result<Rendered, ProcessError> {
    let html = fs::read_to_string(path)?;
    let (rewritten, result) =
        rewrite_html(&html, highlighter, config).map_err(|source| ProcessError::Rewrite {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        path = %path.display(),
        blocks = result.blocks_highlighted,
        nowrap = result.blocks_nowrap,
        "rewrote file"
    );

    Ok(Rendered {
        file_name: path.file_name().map(OsString::from).unwrap_or_default(),
        input_size: html.len(),
        html: rewritten,
        blocks_highlighted: result.blocks_highlighted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HighlightError, RewriteError};
    use std::ffi::OsStr;

    /// Upper-cases code so rewritten output is easy to recognize.
    struct Shouting;

    impl CodeHighlighter for Shouting {
        fn highlight(&mut self, _language: &str, code: &str) -> Result<String, HighlightError> {
            Ok(code.to_uppercase())
        }
    }

    /// Fails on any code mentioning `boom`.
    struct Picky;

    impl CodeHighlighter for Picky {
        fn highlight(&mut self, language: &str, code: &str) -> Result<String, HighlightError> {
            if code.contains("boom") {
                Err(HighlightError {
                    language: language.to_string(),
                    message: "refused".to_string(),
                })
            } else {
                Ok(code.to_string())
            }
        }
    }

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("source");
        let docs = root.path().join("docs");
        std::fs::create_dir(&source).unwrap();
        (root, source, docs)
    }

    #[test]
    fn test_html_suffix_is_exact() {
        assert!(is_html_file_name(OsStr::new("a.html")));
        assert!(is_html_file_name(OsStr::new(".html")));
        assert!(!is_html_file_name(OsStr::new("c.HTML")));
        assert!(!is_html_file_name(OsStr::new("b.htm")));
        assert!(!is_html_file_name(OsStr::new("a.html.bak")));
    }

    #[test]
    fn test_only_html_files_are_processed() {
        let (_root, source, docs) = setup();
        write(&source, "a.html", r#"<p class="build-js">let a</p>"#);
        write(&source, "b.txt", r#"<p class="build-js">let b</p>"#);
        write(&source, "c.HTML", r#"<p class="build-js">let c</p>"#);
        std::fs::create_dir(source.join("nested.html")).unwrap();

        let processor = Processor::new(ProcessOptions::new(&source, &docs));
        let stats = processor.process_with(|| Shouting).unwrap();

        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_skipped, 3);
        assert_eq!(stats.blocks_highlighted, 1);

        let out = std::fs::read_to_string(docs.join("a.html")).unwrap();
        assert_eq!(out, r#"<code class="hljs nowrap">LET A</code>"#);
        assert!(!docs.join("b.txt").exists());
        assert!(!docs.join("c.HTML").exists());
        assert!(!docs.join("nested.html").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_pages_are_processed() {
        let (root, source, docs) = setup();
        write(root.path(), "real.html", r#"<p class="build-js">linked()</p>"#);
        std::os::unix::fs::symlink("../real.html", source.join("index.html")).unwrap();
        std::os::unix::fs::symlink("../missing.html", source.join("dangling.html")).unwrap();
        std::fs::create_dir(root.path().join("dir.html")).unwrap();
        std::os::unix::fs::symlink("../dir.html", source.join("dir.html")).unwrap();

        let stats = Processor::new(ProcessOptions::new(&source, &docs))
            .process_with(|| Shouting)
            .unwrap();

        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_skipped, 2);
        let out = std::fs::read_to_string(docs.join("index.html")).unwrap();
        assert_eq!(out, r#"<code class="hljs nowrap">LINKED()</code>"#);
        assert!(!docs.join("index.html").is_symlink());
    }

    #[test]
    fn test_files_without_blocks_are_copied_unchanged() {
        let (_root, source, docs) = setup();
        let page = "<!doctype html>\n<title>plain</title>\n<p>nothing here</p>\n";
        write(&source, "plain.html", page);

        let stats = Processor::new(ProcessOptions::new(&source, &docs))
            .process_with(|| Shouting)
            .unwrap();

        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.bytes_input, stats.bytes_output);
        assert_eq!(stats.html_inflation_percent(), 0.0);
        assert_eq!(std::fs::read_to_string(docs.join("plain.html")).unwrap(), page);
    }

    #[test]
    fn test_output_directory_is_created_recursively() {
        let (root, source, _) = setup();
        let docs = root.path().join("deep").join("er").join("docs");
        write(&source, "index.html", "<p>hi</p>");

        Processor::new(ProcessOptions::new(&source, &docs))
            .process_with(|| Shouting)
            .unwrap();
        assert!(docs.join("index.html").is_file());

        // Running again over an existing output directory is fine
        Processor::new(ProcessOptions::new(&source, &docs))
            .process_with(|| Shouting)
            .unwrap();
    }

    #[test]
    fn test_empty_input_directory() {
        let (_root, source, docs) = setup();
        let stats = Processor::new(ProcessOptions::new(&source, &docs))
            .process_with(|| Shouting)
            .unwrap();
        assert_eq!(stats.files_processed, 0);
        assert!(docs.is_dir());
    }

    #[test]
    fn test_failure_writes_nothing() {
        let (_root, source, docs) = setup();
        write(&source, "a.html", r#"<p class="build-js">fine_code()</p>"#);
        write(&source, "b.html", r#"<p class="build-js">boom()</p>"#);
        write(&source, "c.html", r#"<p class="build-js">also_fine()</p>"#);

        let err = Processor::new(ProcessOptions::new(&source, &docs))
            .process_with(|| Picky)
            .unwrap_err();

        match err {
            ProcessError::Rewrite { path, source } => {
                assert_eq!(path.file_name(), Some(OsStr::new("b.html")));
                assert!(matches!(source, RewriteError::Highlight(_)));
            }
            other => panic!("expected a rewrite error, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(&docs).unwrap().count(), 0);
    }

    #[test]
    fn test_parse_failure_names_the_file() {
        let (_root, source, docs) = setup();
        write(&source, "broken.html", r#"<div><pre class="build-js">x</div>"#);

        let err = Processor::new(ProcessOptions::new(&source, &docs))
            .process_with(|| Shouting)
            .unwrap_err();
        assert!(err.to_string().contains("broken.html"));
        assert!(matches!(
            err,
            ProcessError::Rewrite {
                source: RewriteError::Parse(_),
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_utf8_is_an_io_error() {
        let (_root, source, docs) = setup();
        std::fs::write(source.join("bad.html"), [0xff, 0xfe, b'<']).unwrap();

        let err = Processor::new(ProcessOptions::new(&source, &docs))
            .process_with(|| Shouting)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Io(_)));
    }

    #[test]
    fn test_missing_input_directory() {
        let root = tempfile::tempdir().unwrap();
        let err = Processor::new(ProcessOptions::new(
            root.path().join("nope"),
            root.path().join("docs"),
        ))
        .process_with(|| Shouting)
        .unwrap_err();
        assert!(matches!(
            err,
            ProcessError::InvalidInput {
                reason: "does not exist",
                ..
            }
        ));
        assert!(!root.path().join("docs").exists());
    }

    #[test]
    fn test_many_files_in_parallel() {
        let (_root, source, docs) = setup();
        for i in 0..32 {
            write(
                &source,
                &format!("page{i:02}.html"),
                &format!(r#"<h1>{i}</h1><pre class="build-js">value_{i}_abc</pre>"#),
            );
        }

        let stats = Processor::new(ProcessOptions::new(&source, &docs))
            .process_with(|| Shouting)
            .unwrap();
        assert_eq!(stats.files_processed, 32);
        assert_eq!(stats.blocks_highlighted, 32);

        let out = std::fs::read_to_string(docs.join("page07.html")).unwrap();
        assert_eq!(out, r#"<h1>7</h1><code class="hljs">VALUE_7_ABC</code>"#);
    }
}
