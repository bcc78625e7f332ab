//! Sealing and opening the catalogued fields of a whole JSON record.
//!
//! Field paths use dot notation; a `[]` suffix expands into every element of an
//! array, e.g. `"entries[].blob"`. Paths that do not exist in a record are
//! skipped, as are `null` leaves.

use serde_json::Value;
use thiserror::Error;

use super::{report_decode_failure, FieldCodec, FieldDecodeError, FieldValue};
use crate::crypto::CipherError;

/// A field that could not be sealed, with its concrete location in the record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot seal field {path}: {source}")]
pub struct SealError {
    pub path: String,
    #[source]
    pub source: CipherError,
}

/// Outcome of [`FieldCodec::open_record`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenReport {
    /// Number of fields decoded successfully.
    pub opened: usize,
    /// Concrete locations (e.g. `"entries[2].blob"`) replaced with `null`.
    pub failed: Vec<String>,
}

impl OpenReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Segments of a dot-notation field path.
#[derive(Debug, PartialEq, Eq)]
enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

/// Parse a dot-notation field path into [`PathSegment`]s.
///
/// `"entries[].blob"` → `[Key("entries"), ArrayItem, Key("blob")]`.
fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(key) = part.strip_suffix("[]") {
            segments.push(PathSegment::Key(key.to_owned()));
            segments.push(PathSegment::ArrayItem);
        } else {
            segments.push(PathSegment::Key(part.to_owned()));
        }
    }
    segments
}

/// Walk `value` along `segments`, calling `visit` on every leaf reached with
/// its concrete location.
fn for_each_leaf<E, F>(
    value: &mut Value,
    segments: &[PathSegment],
    location: &str,
    visit: &mut F,
) -> Result<(), E>
where
    F: FnMut(&str, &mut Value) -> Result<(), E>,
{
    let Some((head, rest)) = segments.split_first() else {
        return visit(location, value);
    };

    match head {
        PathSegment::Key(key) => {
            if let Value::Object(map) = value {
                if let Some(child) = map.get_mut(key) {
                    let child_location = if location.is_empty() {
                        key.clone()
                    } else {
                        format!("{location}.{key}")
                    };
                    for_each_leaf(child, rest, &child_location, visit)?;
                }
            }
        }
        PathSegment::ArrayItem => {
            if let Value::Array(items) = value {
                for (i, item) in items.iter_mut().enumerate() {
                    for_each_leaf(item, rest, &format!("{location}[{i}]"), visit)?;
                }
            }
        }
    }
    Ok(())
}

impl FieldCodec {
    /// Replace every field of `record` named by `paths` with its hex envelope.
    ///
    /// Returns the number of fields sealed.
    ///
    /// # Errors
    ///
    /// Returns [`SealError`] if a targeted leaf is a number or boolean. The
    /// record is left unchanged from that leaf onwards.
    pub fn seal_record<I, P>(&self, record: &mut Value, paths: I) -> Result<usize, SealError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut sealed = 0;
        for path in paths {
            let segments = parse_path(path.as_ref());
            let mut visit = |location: &str, leaf: &mut Value| -> Result<(), SealError> {
                if leaf.is_null() {
                    return Ok(());
                }
                let to_error = |source: CipherError| SealError {
                    path: location.to_owned(),
                    source,
                };
                let field = FieldValue::try_from(leaf.clone()).map_err(to_error)?;
                *leaf = Value::String(self.seal(&field).map_err(to_error)?);
                sealed += 1;
                Ok(())
            };
            for_each_leaf(record, &segments, "", &mut visit)?;
        }
        Ok(sealed)
    }

    /// Decode every field of `record` named by `paths` in place.
    ///
    /// Never fails: each undecodable field becomes `null`, is logged once, and
    /// is listed in the returned [`OpenReport`]. Sibling fields are unaffected.
    pub fn open_record<I, P>(&self, record: &mut Value, paths: I) -> OpenReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut report = OpenReport::default();
        for path in paths {
            let segments = parse_path(path.as_ref());
            let walked: Result<(), std::convert::Infallible> =
                for_each_leaf(record, &segments, "", &mut |location: &str, leaf: &mut Value| {
                    let decoded = match &*leaf {
                        Value::Null => return Ok(()),
                        Value::String(s) if s.is_empty() => return Ok(()),
                        Value::String(s) => self.open(s),
                        other => Err(FieldDecodeError::NotText(
                            crate::crypto::cipher::json_kind(other),
                        )),
                    };
                    match decoded {
                        Ok(value) => {
                            *leaf = value.into_json();
                            report.opened += 1;
                        }
                        Err(e) => {
                            report_decode_failure(location, &e);
                            *leaf = Value::Null;
                            report.failed.push(location.to_owned());
                        }
                    }
                    Ok(())
                });
            if let Err(never) = walked {
                match never {}
            }
        }
        report
    }
}
