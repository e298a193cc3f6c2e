// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Path Value Object
//!
//! A resource path is a dotted, indexed hierarchical key addressing either a
//! specific resource descriptor or a set of descriptors matching a template:
//!
//! - `tile0.cluster2.pe1` - a specific processing element
//! - `tile.cluster.pe` - the *template* of every processing element
//! - `tile0.cluster2.pe` - every processing element of one cluster
//!
//! The template of a path drops the numeric index from every segment.
//! Templates are idempotent: `template(template(p)) == template(p)`.
//!
//! ## Path Grammar
//!
//! ```text
//! path    := segment ("." segment)*
//! segment := name index?
//! name    := [a-zA-Z_]+
//! index   := [0-9]+
//! ```
//!
//! ## Usage Examples
//!
//! ```rust
//! use tile_arbiter_domain::value_objects::resource_path::ResourcePath;
//!
//! let path: ResourcePath = "tile0.cluster2.pe1".parse().unwrap();
//! assert_eq!(path.template().to_string(), "tile.cluster.pe");
//! assert_eq!(path.id_of("cluster"), Some(2));
//! assert_eq!(path.type_name(), "pe");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ArbiterError;

/// One `name[index]` component of a resource path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathSegment {
    name: String,
    id: Option<u16>,
}

impl PathSegment {
    /// Segment name without the numeric index
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric index, if the segment carries one
    pub fn id(&self) -> Option<u16> {
        self.id
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}{}", self.name, id),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Dotted, indexed hierarchical resource key.
///
/// Paths are validated at construction and immutable afterwards; derived
/// paths (templates, re-indexed copies) are produced as new values. Ordering
/// is lexicographic over segments, which keeps registry iteration stable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourcePath {
    segments: Vec<PathSegment>,
}

impl ResourcePath {
    /// Path separator used in the textual form
    pub const SEPARATOR: char = '.';

    /// Parse a path from its textual form.
    ///
    /// Fails with `InvalidParameter` on empty input, empty segments, or
    /// segment names containing anything but letters and underscores.
    pub fn parse(text: &str) -> Result<Self, ArbiterError> {
        if text.is_empty() {
            return Err(ArbiterError::invalid_parameter("empty resource path"));
        }

        let mut segments = Vec::new();
        for raw in text.split(Self::SEPARATOR) {
            segments.push(Self::parse_segment(raw, text)?);
        }

        Ok(ResourcePath { segments })
    }

    fn parse_segment(raw: &str, context: &str) -> Result<PathSegment, ArbiterError> {
        let name_len = raw
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(raw.len());
        let (name, index) = raw.split_at(name_len);

        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
            return Err(ArbiterError::invalid_parameter(format!(
                "malformed segment '{}' in resource path '{}'",
                raw, context
            )));
        }

        let id = if index.is_empty() {
            None
        } else {
            Some(index.parse::<u16>().map_err(|_| {
                ArbiterError::invalid_parameter(format!(
                    "index '{}' out of range in resource path '{}'",
                    index, context
                ))
            })?)
        };

        Ok(PathSegment {
            name: name.to_string(),
            id,
        })
    }

    /// Split the head segment off a raw path string.
    ///
    /// Returns the first component and the remainder (if any). This is the
    /// low-level helper used when walking a path top-down without a full
    /// parse.
    pub fn pop_head(path: &str, sep: char) -> (&str, Option<&str>) {
        match path.split_once(sep) {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        }
    }

    /// The path segments, root first
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Name of the leaf segment, which identifies the resource type
    /// (e.g. `pe` for `tile0.cluster2.pe1`)
    pub fn type_name(&self) -> &str {
        // Parsing guarantees at least one segment
        &self.segments[self.segments.len() - 1].name
    }

    /// The template of this path: every numeric index dropped.
    pub fn template(&self) -> ResourcePath {
        ResourcePath {
            segments: self
                .segments
                .iter()
                .map(|s| PathSegment {
                    name: s.name.clone(),
                    id: None,
                })
                .collect(),
        }
    }

    /// Whether no segment carries an index
    pub fn is_template(&self) -> bool {
        self.segments.iter().all(|s| s.id.is_none())
    }

    /// Whether every segment carries an index
    pub fn is_concrete(&self) -> bool {
        self.segments.iter().all(|s| s.id.is_some())
    }

    /// Index of the first segment with the given name, if present
    pub fn id_of(&self, segment_name: &str) -> Option<u16> {
        self.segments
            .iter()
            .find(|s| s.name == segment_name)
            .and_then(|s| s.id)
    }

    /// Produce a copy with the index of the named segment replaced.
    ///
    /// Fails with `NotFound` if no segment has that name.
    pub fn with_segment_id(&self, segment_name: &str, id: u16) -> Result<ResourcePath, ArbiterError> {
        let mut segments = self.segments.clone();
        let segment = segments
            .iter_mut()
            .find(|s| s.name == segment_name)
            .ok_or_else(|| {
                ArbiterError::not_found(format!(
                    "segment '{}' not present in path '{}'",
                    segment_name, self
                ))
            })?;
        segment.id = Some(id);
        Ok(ResourcePath { segments })
    }

    /// Match this (stored, usually concrete) path against a query path.
    ///
    /// Matching is segment-by-segment: names must agree, and wherever the
    /// query supplies an index it must agree too. A query segment without an
    /// index matches any index, so `tile0.cluster2.pe` matches every
    /// processing element of cluster 2 and `tile.cluster.pe` matches every
    /// processing element on the platform.
    pub fn matches(&self, query: &ResourcePath) -> bool {
        if self.segments.len() != query.segments.len() {
            return false;
        }
        self.segments.iter().zip(query.segments.iter()).all(|(s, q)| {
            s.name == q.name && (q.id.is_none() || q.id == s.id)
        })
    }
}

impl FromStr for ResourcePath {
    type Err = ArbiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourcePath::parse(s)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, "{}", Self::SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for ResourcePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourcePath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        ResourcePath::parse(&text).map_err(serde::de::Error::custom)
    }
}
