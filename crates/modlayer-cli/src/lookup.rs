//! Resolve user queries to mods and releases.
//!
//! Matching is case-insensitive and runs in three passes: exact, prefix,
//! substring. The first pass with any hit decides; more than one hit in that
//! pass is ambiguous.

use anyhow::{Result, bail};
use modlayer_schema::{Catalog, ModRecord, Release};

/// How many candidates an ambiguity error lists.
const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Exact,
    Prefix,
    Substring,
}

impl Pass {
    fn hits(self, key: &str, query: &str) -> bool {
        match self {
            Self::Exact => key == query,
            Self::Prefix => key.starts_with(query),
            Self::Substring => key.contains(query),
        }
    }
}

/// Run the passes over `items`, each item searched by its lowercase `keys`.
fn cascade<'a, T>(
    items: impl Iterator<Item = &'a T> + Clone,
    query: &str,
    keys: impl Fn(&T) -> Vec<String>,
) -> Vec<&'a T>
where
    T: 'a,
{
    let query = query.trim().to_lowercase();
    for pass in [Pass::Exact, Pass::Prefix, Pass::Substring] {
        let found: Vec<&T> = items
            .clone()
            .filter(|item| keys(item).iter().any(|k| pass.hits(k, &query)))
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

fn mod_keys(m: &ModRecord) -> Vec<String> {
    let mut keys = vec![m.display_title().to_lowercase()];
    if let Some(repo) = &m.repo {
        keys.push(repo.to_string().to_lowercase());
        keys.push(repo.name.to_lowercase());
    }
    keys
}

fn ambiguous(query: &str, names: impl Iterator<Item = String>, total: usize) -> anyhow::Error {
    let mut list: Vec<String> = names.take(MAX_SUGGESTIONS).collect();
    if total > MAX_SUGGESTIONS {
        list.push(format!("and {} more", total - MAX_SUGGESTIONS));
    }
    anyhow::anyhow!("'{query}' is ambiguous: {}", list.join(", "))
}

/// Find the one mod `query` names, by title or repository.
pub fn find_mod<'a>(catalog: &'a Catalog, query: &str) -> Result<&'a ModRecord> {
    let found = cascade(catalog.mods.iter(), query, mod_keys);
    match found.as_slice() {
        [] => bail!("no mod matches '{query}'"),
        [m] => Ok(m),
        many => Err(ambiguous(
            query,
            many.iter().map(|m| m.display_title().into_owned()),
            many.len(),
        )),
    }
}

/// Find the one release of `m` that `query` names, by tag or title.
pub fn find_release<'a>(m: &'a ModRecord, query: &str) -> Result<&'a Release> {
    let found = cascade(m.releases.iter(), query, |r| {
        let mut keys = vec![r.tag.to_lowercase()];
        if let Some(title) = &r.title {
            keys.push(title.to_lowercase());
        }
        keys
    });
    match found.as_slice() {
        [] => bail!("{} has no release matching '{query}'", m.display_title()),
        [r] => Ok(r),
        many => Err(ambiguous(
            query,
            many.iter().map(|r| r.tag.clone()),
            many.len(),
        )),
    }
}
