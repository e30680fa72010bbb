//! Line diff used by the Ghost Diff preview.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "line", rename_all = "snake_case")]
pub enum DiffLine {
    Same(String),
    Added(String),
    Removed(String),
}

impl DiffLine {
    fn text(&self) -> &str {
        match self {
            DiffLine::Same(s) | DiffLine::Added(s) | DiffLine::Removed(s) => s,
        }
    }

    fn is_change(&self) -> bool {
        !matches!(self, DiffLine::Same(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

impl DiffStats {
    pub fn of(lines: &[DiffLine]) -> Self {
        let mut stats = Self::default();
        for line in lines {
            match line {
                DiffLine::Added(_) => stats.added += 1,
                DiffLine::Removed(_) => stats.removed += 1,
                DiffLine::Same(_) => {}
            }
        }
        stats
    }

    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Longest-common-subsequence diff of `old` and `new`, line by line.
/// Removals are emitted before additions within a changed run.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();
    let (n, m) = (a.len(), b.len());

    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            out.push(DiffLine::Same(a[i].to_string()));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Removed(a[i].to_string()));
            i += 1;
        } else {
            out.push(DiffLine::Added(b[j].to_string()));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| DiffLine::Removed(l.to_string())));
    out.extend(b[j..].iter().map(|l| DiffLine::Added(l.to_string())));
    out
}

/// Render `lines` as a unified diff with `context` unchanged lines around
/// each change. Returns an empty string when nothing changed.
pub fn render_unified(old_label: &str, new_label: &str, lines: &[DiffLine], context: usize) -> String {
    let changes: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.is_change())
        .map(|(i, _)| i)
        .collect();
    if changes.is_empty() {
        return String::new();
    }

    // Group change indices into hunks whose context windows overlap.
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for &idx in &changes {
        let start = idx.saturating_sub(context);
        let end = (idx + context + 1).min(lines.len());
        match hunks.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => hunks.push((start, end)),
        }
    }

    let mut out = format!("--- {old_label}\n+++ {new_label}\n");
    for (start, end) in hunks {
        let (old_start, new_start) = line_numbers_at(lines, start);
        let slice = &lines[start..end];
        let old_len = slice.iter().filter(|l| !matches!(l, DiffLine::Added(_))).count();
        let new_len = slice.iter().filter(|l| !matches!(l, DiffLine::Removed(_))).count();
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk_start(old_start, old_len),
            old_len,
            hunk_start(new_start, new_len),
            new_len
        ));
        for line in slice {
            let prefix = match line {
                DiffLine::Same(_) => ' ',
                DiffLine::Added(_) => '+',
                DiffLine::Removed(_) => '-',
            };
            out.push(prefix);
            out.push_str(line.text());
            out.push('\n');
        }
    }
    out
}

/// Zero-based old/new line offsets of `lines[idx]`.
fn line_numbers_at(lines: &[DiffLine], idx: usize) -> (usize, usize) {
    let mut old = 0;
    let mut new = 0;
    for line in &lines[..idx] {
        match line {
            DiffLine::Same(_) => {
                old += 1;
                new += 1;
            }
            DiffLine::Removed(_) => old += 1,
            DiffLine::Added(_) => new += 1,
        }
    }
    (old, new)
}

// An empty side starts at line 0, per unified diff convention.
fn hunk_start(offset: usize, len: usize) -> usize {
    if len == 0 {
        offset
    } else {
        offset + 1
    }
}
