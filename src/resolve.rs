//! Filename derivation and collision-free name assignment.
//!
//! Every record's filename comes from the last path segment of its URL with
//! the query string removed. Records whose name is a malformed capture are
//! dropped. Among the rest, records sharing a name are disambiguated with a
//! zero-padded `NNNN_` prefix.
//!
//! # Collision rule
//!
//! For a group of `k` records sharing a name, step `i` in `1..k` renames the
//! record with the lowest id that still bears the original name to
//! `{i:04}_{name}`. The record with the highest id keeps the original name.
//! A generated name can itself collide with a name already present in the
//! input, so passes repeat until every name is unique.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, instrument};

use crate::ledger::{Ledger, LedgerError, RecordId, Rename, Resolution, UrlRecord};

/// Width of the numeric disambiguation prefix.
const INDEX_WIDTH: usize = 4;

/// Derives the target filename from a URL: the text after the last `/`,
/// cut at the first `?`.
///
/// # Examples
///
/// ```
/// use harvester_core::resolve::derive_filename;
///
/// assert_eq!(derive_filename("https://cdn.discordapp.com/a/1/y.jpg?sig=abc"), "y.jpg");
/// ```
#[must_use]
pub fn derive_filename(url: &str) -> String {
    let last_segment = url.rsplit('/').next().unwrap_or(url);
    last_segment
        .split('?')
        .next()
        .unwrap_or(last_segment)
        .to_string()
}

/// Returns true when `filename` came from a corrupted match and cannot be
/// downloaded under that name.
///
/// A trailing comma is the artifact of a greedy match that swallowed
/// delimiter punctuation. Empty, `.` and `..` cannot name a file.
#[must_use]
pub fn is_malformed_capture(filename: &str) -> bool {
    filename.is_empty() || filename == "." || filename == ".." || filename.ends_with(',')
}

/// Formats the disambiguated name for the `index`-th duplicate.
#[must_use]
pub fn prefixed_name(index: usize, filename: &str) -> String {
    format!("{index:0INDEX_WIDTH$}_{filename}")
}

/// Plans drops and renames for `records` without touching any store.
///
/// `records` may be in any order; ids define creation order. The plan is
/// deterministic for a given input, empty for an already-resolved set, and
/// lists each record at most once in `renames` with its final name.
#[must_use]
pub fn plan_resolution(records: &[UrlRecord]) -> Resolution {
    let mut dropped = Vec::new();
    // Sorted by id so groups are built in creation order.
    let mut names: BTreeMap<RecordId, String> = BTreeMap::new();

    for record in records {
        if is_malformed_capture(&record.filename) {
            debug!(id = record.id, url = %record.url, "dropping malformed capture");
            dropped.push(record.id);
        } else {
            names.insert(record.id, record.filename.clone());
        }
    }
    dropped.sort_unstable();

    let original = names.clone();
    loop {
        let mut groups: HashMap<&str, Vec<RecordId>> = HashMap::new();
        for (id, name) in &names {
            groups.entry(name.as_str()).or_default().push(*id);
        }

        let mut pass: Vec<(RecordId, String)> = Vec::new();
        for (name, ids) in &groups {
            // ids ascend because `names` iterates in id order; the last one
            // keeps the name.
            for (index, id) in ids.iter().take(ids.len() - 1).enumerate() {
                pass.push((*id, prefixed_name(index + 1, name)));
            }
        }

        if pass.is_empty() {
            break;
        }
        for (id, name) in pass {
            names.insert(id, name);
        }
    }

    let renames = names
        .into_iter()
        .filter(|(id, name)| original.get(id) != Some(name))
        .map(|(id, filename)| Rename { id, filename })
        .collect();

    Resolution { dropped, renames }
}

/// Applies [`plan_resolution`] to a plain record list, returning the
/// surviving records with their final names in id order.
#[must_use]
pub fn resolve_records(records: &[UrlRecord]) -> Vec<UrlRecord> {
    let resolution = plan_resolution(records);
    let renamed: HashMap<RecordId, &str> = resolution
        .renames
        .iter()
        .map(|rename| (rename.id, rename.filename.as_str()))
        .collect();

    let mut resolved: Vec<UrlRecord> = records
        .iter()
        .filter(|record| !resolution.dropped.contains(&record.id))
        .map(|record| {
            let mut record = record.clone();
            if let Some(name) = renamed.get(&record.id) {
                record.filename = (*name).to_string();
            }
            record
        })
        .collect();
    resolved.sort_by_key(|record| record.id);
    resolved
}

/// Resolves the whole ledger in place.
///
/// # Errors
///
/// Returns [`LedgerError`] if the ledger cannot be read or the plan cannot
/// be applied; the ledger is left unchanged in that case.
#[instrument(skip(ledger))]
pub async fn resolve_ledger(ledger: &dyn Ledger) -> Result<Resolution, LedgerError> {
    let records = ledger.scan_all().await?;
    let resolution = plan_resolution(&records);

    if resolution.is_empty() {
        debug!(records = records.len(), "filenames already unique");
        return Ok(resolution);
    }

    ledger.apply_resolution(&resolution).await?;
    info!(
        dropped = resolution.dropped.len(),
        renamed = resolution.renames.len(),
        "filenames resolved"
    );
    Ok(resolution)
}
