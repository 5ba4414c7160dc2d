use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Bounding box for a detected face, in frame pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Top-left corner, the point the stability tracker follows.
    pub fn origin(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }
}

/// A point in frame pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("descriptor length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Face descriptor (typically 128-dimensional), compared by Euclidean distance.
///
/// Serializes as a plain array of numbers. Deserialization also accepts the
/// index-keyed object form (`{"0": .., "1": ..}`) written by older galleries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor", into = "Vec<f32>")]
pub struct Descriptor {
    values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean distance to `other`. 0 means identical; larger is less similar.
    ///
    /// Descriptors of different lengths are never compared.
    pub fn distance(&self, other: &Descriptor) -> Result<f32, DescriptorError> {
        if self.values.len() != other.values.len() {
            return Err(DescriptorError::LengthMismatch {
                expected: self.values.len(),
                actual: other.values.len(),
            });
        }

        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt())
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl From<Descriptor> for Vec<f32> {
    fn from(descriptor: Descriptor) -> Self {
        descriptor.values
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDescriptor {
    Values(Vec<f32>),
    Indexed(BTreeMap<String, f32>),
}

impl TryFrom<RawDescriptor> for Descriptor {
    type Error = String;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        match raw {
            RawDescriptor::Values(values) => Ok(Self::new(values)),
            RawDescriptor::Indexed(map) => {
                let mut indexed = Vec::with_capacity(map.len());
                for (key, value) in map {
                    let index: usize = key
                        .parse()
                        .map_err(|_| format!("descriptor key is not an index: {key:?}"))?;
                    indexed.push((index, value));
                }
                indexed.sort_by_key(|(index, _)| *index);

                if indexed.iter().enumerate().any(|(pos, (index, _))| pos != *index) {
                    return Err("descriptor indices are not contiguous from 0".to_string());
                }

                Ok(Self::new(indexed.into_iter().map(|(_, v)| v).collect()))
            }
        }
    }
}

/// A named gallery entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub descriptor: Descriptor,
}

/// One detected face, as reported by the detector for a single frame.
///
/// The lightweight per-tick pass fills the attributes; the recognition pass
/// fills the descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Expression label → probability.
    #[serde(default)]
    pub expressions: BTreeMap<String, f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<Descriptor>,
}

impl Detection {
    /// The most probable expression. Ties keep the first label in map order.
    pub fn mood(&self) -> Option<&str> {
        let mut best: Option<(&str, f32)> = None;
        for (label, &probability) in &self.expressions {
            match best {
                Some((_, p)) if probability <= p => {}
                _ => best = Some((label.as_str(), probability)),
            }
        }
        best.map(|(label, _)| label)
    }
}
