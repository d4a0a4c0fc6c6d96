//! Merging and splitting vertex buffers.
//!
//! Buffers with differing attribute sets can be merged: an attribute present
//! on any side is carried into the result, and vertices that never had it are
//! filled with [`AttributeKind::fill_value`].

use std::ops::Range;

use crate::vertex_data::{AttributeKind, VertexData};

impl VertexData {
    /// Appends `other` to this buffer, offsetting its indices by the current
    /// vertex count.
    pub fn append(&mut self, other: &VertexData) {
        let base = self.vertex_count();
        let added = other.vertex_count();

        for kind in AttributeKind::ALL.into_iter().skip(1) {
            let mine = self.attribute(kind).is_some();
            let theirs = other.attribute(kind);
            if !mine && theirs.is_none() {
                continue;
            }

            // Sized for the vertices we already have (creating it if needed).
            let array = self.attribute_mut(kind);
            array.truncate(base * kind.stride());
            match theirs {
                Some(values) => {
                    let wanted = added * kind.stride();
                    array.extend(values.iter().take(wanted));
                    array.resize(base * kind.stride() + wanted, kind.fill_value());
                }
                None => array.resize((base + added) * kind.stride(), kind.fill_value()),
            }
        }

        self.positions
            .extend_from_slice(&other.positions[..added * 3]);

        if let Some(indices) = &other.indices {
            let base = base as u32;
            self.indices
                .get_or_insert_with(Vec::new)
                .extend(indices.iter().map(|i| i + base));
        }
    }

    /// Merges `others` into this buffer, in order.
    pub fn merge<I>(mut self, others: I) -> VertexData
    where
        I: IntoIterator<Item = VertexData>,
    {
        for other in others {
            self.append(&other);
        }
        self
    }

    /// Merges a list of buffers into one.
    ///
    /// The first buffer becomes the base and the rest are merged into it; a
    /// single buffer is returned verbatim. Returns `None` for an empty list.
    pub fn merge_all(mut buffers: Vec<VertexData>) -> Option<VertexData> {
        if buffers.is_empty() {
            return None;
        }
        let main = buffers.remove(0);
        if buffers.is_empty() {
            return Some(main);
        }
        Some(main.merge(buffers))
    }

    /// Copies a vertex range and an index range out of this buffer.
    ///
    /// Indices are rebased so that `vertices.start` becomes 0. This is the
    /// inverse of [`append`](Self::append) when the ranges are the ones the
    /// merged buffers occupied.
    pub fn extract(&self, vertices: Range<usize>, indices: Range<usize>) -> VertexData {
        let slice = |array: Option<&[f32]>, stride: usize| -> Option<Vec<f32>> {
            array.and_then(|a| {
                a.get(vertices.start * stride..vertices.end * stride)
                    .map(<[f32]>::to_vec)
            })
        };

        let base = vertices.start as u32;
        VertexData {
            positions: slice(Some(self.positions.as_slice()), 3).unwrap_or_default(),
            normals: slice(self.normals.as_deref(), 3),
            uvs: slice(self.uvs.as_deref(), 2),
            colors: slice(self.colors.as_deref(), 4),
            tangents: slice(self.tangents.as_deref(), 4),
            indices: self.indices.as_ref().and_then(|all| {
                all.get(indices)
                    .map(|part| part.iter().map(|i| i.saturating_sub(base)).collect())
            }),
            id: self.id,
        }
    }
}
