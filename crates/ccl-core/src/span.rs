use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type FileId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file: FileId,
    pub lo: u32,
    pub hi: u32,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Span({}:{}-{})", self.file, self.lo, self.hi)
    }
}

impl Span {
    pub fn new(file: FileId, lo: u32, hi: u32) -> Span {
        Span { file, lo, hi }
    }

    pub fn null() -> Span {
        Span {
            file: 0,
            lo: 0,
            hi: 0,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            file: self.file,
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    pub fn len(&self) -> u32 {
        self.hi.saturating_sub(self.lo)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.lo as usize..self.hi as usize
    }
}

/// A source text together with its precomputed line table.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: Arc<str>,
    line_starts: Arc<Vec<usize>>,
}

impl SourceFile {
    pub fn new(id: FileId, path: impl Into<PathBuf>, source: &str) -> Self {
        Self {
            id,
            path: path.into(),
            source: Arc::from(source),
            line_starts: Arc::new(compute_line_starts(source)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: u32) -> (usize, usize) {
        let offset = offset as usize;
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts.get(idx).copied().unwrap_or(0);
        let line = idx + 1;
        let col = offset.saturating_sub(line_start) + 1;
        (line, col)
    }

    pub fn line_of(&self, offset: u32) -> usize {
        self.line_col(offset).0
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        if line == 0 {
            return None;
        }
        let idx = line - 1;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .copied()
            .unwrap_or_else(|| self.source.len());
        self.source
            .get(start..end)
            .map(|s| s.trim_end_matches('\n').trim_end_matches('\r'))
    }

    /// Source text covered by `span`, if it lies inside this file.
    pub fn snippet(&self, span: Span) -> Option<&str> {
        self.source.get(span.range())
    }

    pub fn span_on_line(&self, span: Span) -> Option<LineSpan> {
        let (line, col_start) = self.line_col(span.lo);
        let (_, col_end) = self.line_col(span.hi.max(span.lo + 1));
        let text = self.line_text(line)?.to_string();
        Some(LineSpan {
            line,
            col_start,
            col_end,
            text,
        })
    }
}

#[derive(Clone, Debug)]
pub struct LineSpan {
    pub line: usize,
    pub col_start: usize,
    pub col_end: usize,
    pub text: String,
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(idx + 1);
        }
    }
    starts
}
