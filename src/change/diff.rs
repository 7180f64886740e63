use std::ops::Range;

/// Number of unchanged lines shown around each change
pub const DEFAULT_CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// One line of the edit script, with its position in both inputs
#[derive(Debug, Clone, Copy)]
struct Edit<'a> {
    op: Op,
    line: &'a str,
    old_index: usize,
    new_index: usize,
}

/// Produces a line-based unified diff from `old` to `new`
///
/// The format follows the classic `diff -u` layout with `old`/`new` as file
/// labels, hunk headers of the form `@@ -l,s +l,s @@`, and `context` lines of
/// surrounding context. Lines are joined with `\n` and carry no trailing
/// newline. Inputs with identical lines produce an empty string.
///
/// # Examples
///
/// ```
/// use driftwatch::change::unified_diff;
///
/// let diff = unified_diff("a\nb\nc", "a\nB\nc", 3);
/// assert_eq!(diff, "--- old\n+++ new\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c");
/// ```
pub fn unified_diff(old: &str, new: &str, context: usize) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let edits = edit_script(&old_lines, &new_lines);
    let hunks = group_hunks(&edits, context);
    if hunks.is_empty() {
        return String::new();
    }

    let mut out = vec!["--- old".to_string(), "+++ new".to_string()];

    for range in hunks {
        let hunk = &edits[range];
        let old_len = hunk.iter().filter(|e| e.op != Op::Insert).count();
        let new_len = hunk.iter().filter(|e| e.op != Op::Delete).count();

        out.push(format!(
            "@@ -{} +{} @@",
            format_range(hunk[0].old_index, old_len),
            format_range(hunk[0].new_index, new_len)
        ));

        for edit in hunk {
            let prefix = match edit.op {
                Op::Equal => ' ',
                Op::Delete => '-',
                Op::Insert => '+',
            };
            out.push(format!("{}{}", prefix, edit.line));
        }
    }

    out.join("\n")
}

/// Builds the edit script from a longest-common-subsequence table
///
/// Common prefix and suffix lines are peeled off first so the quadratic
/// table only covers the region that actually differs. Deletions are
/// emitted before insertions at each point of divergence.
fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Edit<'a>> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut ops = Vec::with_capacity(old.len() + new.len());
    ops.extend(std::iter::repeat(Op::Equal).take(prefix));
    ops.extend(lcs_ops(old_mid, new_mid));
    ops.extend(std::iter::repeat(Op::Equal).take(suffix));

    let mut edits = Vec::with_capacity(ops.len());
    let (mut oi, mut ni) = (0, 0);
    for op in ops {
        let line = match op {
            Op::Insert => new[ni],
            Op::Equal | Op::Delete => old[oi],
        };
        edits.push(Edit {
            op,
            line,
            old_index: oi,
            new_index: ni,
        });
        match op {
            Op::Equal => {
                oi += 1;
                ni += 1;
            }
            Op::Delete => oi += 1,
            Op::Insert => ni += 1,
        }
    }

    edits
}

fn lcs_ops(old: &[&str], new: &[&str]) -> Vec<Op> {
    let (n, m) = (old.len(), new.len());
    let width = m + 1;

    // table[i * width + j] = LCS length of old[i..] and new[j..]
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if old[i] == new[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            ops.push(Op::Equal);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            ops.push(Op::Delete);
            i += 1;
        } else {
            ops.push(Op::Insert);
            j += 1;
        }
    }
    ops.extend(std::iter::repeat(Op::Delete).take(n - i));
    ops.extend(std::iter::repeat(Op::Insert).take(m - j));

    ops
}

/// Groups changed edits into hunk ranges, merging hunks whose context overlaps
fn group_hunks(edits: &[Edit<'_>], context: usize) -> Vec<Range<usize>> {
    let mut hunks: Vec<Range<usize>> = Vec::new();

    for (idx, edit) in edits.iter().enumerate() {
        if edit.op == Op::Equal {
            continue;
        }

        let start = idx.saturating_sub(context);
        let end = (idx + 1 + context).min(edits.len());

        match hunks.last_mut() {
            Some(last) if start <= last.end => last.end = last.end.max(end),
            _ => hunks.push(start..end),
        }
    }

    hunks
}

fn format_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}
