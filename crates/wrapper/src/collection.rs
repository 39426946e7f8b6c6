//! Structural diffing of collection members.
//!
//! The common prefix and suffix are skipped, the remainder is compared with a longest common subsequence
//! table.  Each run of removals followed by insertions at the same position is folded into replacements.
//! When the remainder is larger than the configured cell budget the items are compared position by
//! position instead, which is still correct but not minimal.

use crate::value::ProxyValue;

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEdit<T = ProxyValue> {
    Insert { index: usize, value: T },
    Remove { index: usize },
    Replace { index: usize, value: T },
    /// The backing sequence was replaced wholesale.
    Reset { items: Vec<T> },
}

/// Computes edits that, applied in order to `old`, produce `new`.
pub fn diff<T: Clone + PartialEq>(old: &[T], new: &[T], max_cells: usize) -> Vec<CollectionEdit<T>> {
    diff_by(old, new, |a, b| a == b, max_cells)
}

/// Like [`diff`], comparing items with `same`, so `old` may be a lighter record of what was there.
pub fn diff_by<O, T, F>(old: &[O], new: &[T], same: F, max_cells: usize) -> Vec<CollectionEdit<T>>
where
    T: Clone,
    F: Fn(&O, &T) -> bool,
{
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| same(a, b))
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| same(a, b))
        .count();

    let old_middle = &old[prefix..old.len() - suffix];
    let new_middle = &new[prefix..new.len() - suffix];

    if old_middle.is_empty() && new_middle.is_empty() {
        return Vec::new();
    }

    let cells = old_middle
        .len()
        .saturating_mul(new_middle.len());
    if cells > max_cells {
        return positional(prefix, old_middle, new_middle, &same);
    }

    subsequence(prefix, old_middle, new_middle, &same)
}

fn positional<O, T: Clone>(
    offset: usize,
    old: &[O],
    new: &[T],
    same: &impl Fn(&O, &T) -> bool,
) -> Vec<CollectionEdit<T>> {
    let mut edits = Vec::new();
    let common = old.len().min(new.len());
    for index in 0..common {
        if !same(&old[index], &new[index]) {
            edits.push(CollectionEdit::Replace {
                index: offset + index,
                value: new[index].clone(),
            });
        }
    }
    for _ in common..old.len() {
        edits.push(CollectionEdit::Remove {
            index: offset + common,
        });
    }
    for (index, value) in new.iter().enumerate().skip(common) {
        edits.push(CollectionEdit::Insert {
            index: offset + index,
            value: value.clone(),
        });
    }
    edits
}

fn subsequence<O, T: Clone>(
    offset: usize,
    old: &[O],
    new: &[T],
    same: &impl Fn(&O, &T) -> bool,
) -> Vec<CollectionEdit<T>> {
    let (n, m) = (old.len(), new.len());
    let width = m + 1;

    // lengths[i * width + j] is the length of the LCS of old[i..] and new[j..]
    let mut lengths = vec![0usize; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i * width + j] = if same(&old[i], &new[j]) {
                lengths[(i + 1) * width + j + 1] + 1
            } else {
                lengths[(i + 1) * width + j].max(lengths[i * width + j + 1])
            };
        }
    }

    let mut edits = Vec::new();
    let mut run = Run::default();
    let mut position = offset;
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && same(&old[i], &new[j]) {
            position = run.flush(position, &mut edits) + 1;
            i += 1;
            j += 1;
        } else if i < n && (j == m || lengths[(i + 1) * width + j] >= lengths[i * width + j + 1]) {
            run.removed += 1;
            i += 1;
        } else {
            run.inserted.push(new[j].clone());
            j += 1;
        }
    }
    run.flush(position, &mut edits);
    edits
}

/// Consecutive removals and insertions at one position.
struct Run<T> {
    removed: usize,
    inserted: Vec<T>,
}

impl<T> Default for Run<T> {
    fn default() -> Self {
        Self {
            removed: 0,
            inserted: Vec::new(),
        }
    }
}

impl<T> Run<T> {
    /// Emits the run as edits starting at `position`, returns the position after the run.
    fn flush(&mut self, position: usize, edits: &mut Vec<CollectionEdit<T>>) -> usize {
        let inserted = std::mem::take(&mut self.inserted);
        let count = inserted.len();
        let paired = self.removed.min(count);

        for _ in paired..self.removed {
            edits.push(CollectionEdit::Remove {
                index: position + paired,
            });
        }
        for (offset, value) in inserted.into_iter().enumerate() {
            match offset < paired {
                true => edits.push(CollectionEdit::Replace {
                    index: position + offset,
                    value,
                }),
                false => edits.push(CollectionEdit::Insert {
                    index: position + offset,
                    value,
                }),
            }
        }

        self.removed = 0;
        position + count
    }
}

/// Applies `edits` in order.
///
/// # Panics
///
/// Panics if an edit refers to an index outside of `target`, as `Vec::insert` and `Vec::remove` do.
pub fn apply<T: Clone>(target: &mut Vec<T>, edits: &[CollectionEdit<T>]) {
    for edit in edits {
        match edit {
            CollectionEdit::Insert { index, value } => target.insert(*index, value.clone()),
            CollectionEdit::Remove { index } => {
                target.remove(*index);
            }
            CollectionEdit::Replace { index, value } => target[*index] = value.clone(),
            CollectionEdit::Reset { items } => *target = items.clone(),
        }
    }
}
