//! JSON Lines skeleton recordings and polygon pairs.

use log::warn;
use serde::Deserialize;
use std::io::BufRead;

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::skeleton::Skeleton;

/// Decode one skeleton per non-blank line.
pub fn read_frames<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Skeleton>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Err(e) => Some(Err(Error::from(e))),
            Ok(l) if l.trim().is_empty() => None,
            Ok(l) => Some(
                serde_json::from_str::<Skeleton>(&l).map_err(|source| Error::Json {
                    line: i + 1,
                    source,
                }),
            ),
        })
}

/// Like [`read_frames`], but lines that fail to decode are logged and skipped.
pub fn valid_frames<R: BufRead>(reader: R) -> impl Iterator<Item = Skeleton> {
    read_frames(reader).filter_map(|frame| match frame {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("skipping frame: {e}");
            None
        }
    })
}

/// Two polygons to hit-test, as `{"a": [[x, y], ...], "b": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PolygonPair {
    pub a: Vec<Point>,
    pub b: Vec<Point>,
}

impl PolygonPair {
    pub fn from_json(txt: &str) -> Result<Self> {
        serde_json::from_str(txt).map_err(|source| Error::Json { line: 1, source })
    }
}
