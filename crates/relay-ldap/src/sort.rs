//! Sorting and pagination of search results.
//!
//! Unsorted pages are cut from the server stream chunk by chunk, so at most
//! one page is held in memory. Sorted pages need the whole result set; it
//! is collected up to the connection's sort limit and sorted client side.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::directory::EntryStream;
use crate::entry::LdapEntry;
use crate::error::{LdapError, LdapResult};
use crate::query::attribute_name;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// One sort field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Attribute name.
    pub field: String,
    /// Direction.
    #[serde(default)]
    pub direction: Direction,
}

/// Ordered list of sort fields. Earlier fields take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(Vec<SortKey>);

impl SortSpec {
    /// Creates an empty spec.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an ascending field.
    #[must_use]
    pub fn ascending(mut self, field: impl Into<String>) -> Self {
        self.0.push(SortKey {
            field: field.into(),
            direction: Direction::Ascending,
        });
        self
    }

    /// Appends a descending field.
    #[must_use]
    pub fn descending(mut self, field: impl Into<String>) -> Self {
        self.0.push(SortKey {
            field: field.into(),
            direction: Direction::Descending,
        });
        self
    }

    /// Sort fields in precedence order.
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parses `field[:asc|desc]` lists such as `sn,givenName:desc`.
impl FromStr for SortSpec {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spec = Self::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (field, direction) = match part.split_once(':') {
                Some((field, dir)) => (field.trim(), dir.trim()),
                None => (part, "asc"),
            };
            if field.is_empty() {
                return Err(LdapError::filter(format!("empty sort field in '{s}'")));
            }
            let field = attribute_name(field)?;
            spec = match direction.to_ascii_lowercase().as_str() {
                "asc" | "ascending" => spec.ascending(field),
                "desc" | "descending" => spec.descending(field),
                other => {
                    return Err(LdapError::filter(format!(
                        "unknown sort direction '{other}' for '{field}'"
                    )))
                }
            };
        }
        Ok(spec)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let dir = match key.direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            write!(f, "{}:{dir}", key.field)?;
        }
        Ok(())
    }
}

/// Compares strings in natural order: digit runs compare by numeric value,
/// so `user2` sorts before `user10`.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let l_num = l_run.trim_start_matches('0');
                let r_num = r_run.trim_start_matches('0');
                let ord = l_num
                    .len()
                    .cmp(&r_num.len())
                    .then_with(|| l_num.cmp(r_num));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

/// Stable multi-key sort. Entries without a sort attribute come first in
/// ascending order.
pub fn sort_entries(entries: &mut [LdapEntry], spec: &SortSpec) {
    entries.sort_by(|a, b| {
        spec.keys()
            .iter()
            .map(|key| {
                let ord = match (
                    a.first_attribute_value(&key.field),
                    b.first_attribute_value(&key.field),
                ) {
                    (Some(x), Some(y)) => natural_cmp(x, y),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match key.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// Slices the 1-based `page` out of fully materialized entries.
#[must_use]
pub fn slice_page(entries: Vec<LdapEntry>, page: usize, page_size: usize) -> Vec<LdapEntry> {
    let skip = page.saturating_sub(1).saturating_mul(page_size);
    entries.into_iter().skip(skip).take(page_size).collect()
}

/// Pulls `stream` in chunks of `page_size` and returns the chunk whose
/// 1-based ordinal is `page`. Stops pulling once that chunk is complete.
///
/// ## Errors
///
/// Propagates stream errors.
pub async fn nth_chunk(
    stream: &mut (dyn EntryStream + '_),
    page: usize,
    page_size: usize,
) -> LdapResult<Vec<LdapEntry>> {
    let mut ordinal = 1;
    let mut chunk = Vec::with_capacity(page_size);

    while let Some(entry) = stream.next_entry().await? {
        chunk.push(entry);
        if chunk.len() == page_size {
            if ordinal == page {
                return Ok(chunk);
            }
            ordinal += 1;
            chunk.clear();
        }
    }

    if ordinal == page {
        Ok(chunk)
    } else {
        Ok(Vec::new())
    }
}

/// Collects all of `stream`, failing as soon as more than `limit` entries
/// arrive.
///
/// ## Errors
///
/// Returns [`LdapError::TooManyResultsToSort`] past the limit and
/// propagates stream errors.
pub async fn collect_bounded(
    stream: &mut (dyn EntryStream + '_),
    limit: usize,
) -> LdapResult<Vec<LdapEntry>> {
    let mut entries = Vec::new();
    while let Some(entry) = stream.next_entry().await? {
        if entries.len() >= limit {
            return Err(LdapError::TooManyResultsToSort { limit });
        }
        entries.push(entry);
    }
    Ok(entries)
}
