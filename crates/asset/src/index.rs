//! Attribute pools and face-index resolution shared by the OBJ parser.
//!
//! OBJ indices are 1-based; negative indices count back from the end of the
//! pool *as it is when the face line is read*. Every pool keeps a zero-filled
//! sentinel at slot 0, so a positive index maps straight to its slot and an
//! explicit `0` lands harmlessly on the sentinel.

/// Append-only pool of fixed-width attribute entries with a sentinel at 0.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributePool<const N: usize> {
    entries: Vec<[f32; N]>,
}

pub type PositionPool = AttributePool<3>;
pub type TexcoordPool = AttributePool<2>;
pub type NormalPool = AttributePool<3>;
pub type ColorPool = AttributePool<3>;

impl<const N: usize> AttributePool<N> {
    pub fn new() -> Self {
        Self {
            entries: vec![[0.0; N]],
        }
    }

    pub fn push(&mut self, entry: [f32; N]) {
        self.entries.push(entry);
    }

    /// Length including the sentinel.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when only the sentinel is present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&[f32; N]> {
        self.entries.get(index)
    }
}

impl<const N: usize> Default for AttributePool<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a face-corner index could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    Malformed(String),
    OutOfRange { index: i64, pool_len: usize },
}

/// Resolve one index token against a pool of `pool_len` entries (sentinel included).
///
/// Returns `Ok(None)` for an empty token (e.g. the middle of `1//3`).
pub fn resolve_index(token: &str, pool_len: usize) -> Result<Option<usize>, IndexError> {
    if token.is_empty() {
        return Ok(None);
    }
    let raw = token
        .parse::<i64>()
        .map_err(|_| IndexError::Malformed(token.to_string()))?;

    let absolute = if raw >= 0 {
        raw
    } else {
        pool_len as i64 + raw
    };

    if absolute < 0 || absolute >= pool_len as i64 {
        return Err(IndexError::OutOfRange {
            index: raw,
            pool_len,
        });
    }
    Ok(Some(absolute as usize))
}

/// Resolved indices of one face corner (`v`, `v/vt`, `v//vn` or `v/vt/vn`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceVertexIndex {
    pub position: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

/// Pool lengths captured at the moment a face line is processed.
#[derive(Clone, Copy, Debug)]
pub struct PoolLens {
    pub position: usize,
    pub texcoord: usize,
    pub normal: usize,
}

/// Split a corner token on `/` and resolve each part against its own pool.
pub fn parse_face_vertex(token: &str, lens: PoolLens) -> Result<FaceVertexIndex, IndexError> {
    let mut split = token.split('/');
    let position = split
        .next()
        .map(|p| resolve_index(p, lens.position))
        .transpose()?
        .flatten()
        .ok_or_else(|| IndexError::Malformed(token.to_string()))?;
    let texcoord = match split.next() {
        Some(t) => resolve_index(t, lens.texcoord)?,
        None => None,
    };
    let normal = match split.next() {
        Some(n) => resolve_index(n, lens.normal)?,
        None => None,
    };

    Ok(FaceVertexIndex {
        position,
        texcoord,
        normal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_starts_with_sentinel() {
        let pool = PositionPool::new();
        assert_eq!(pool.len(), 1);
        assert!(pool.is_empty());
        assert_eq!(pool.get(0), Some(&[0.0, 0.0, 0.0]));
    }

    #[test]
    fn positive_index_is_used_as_is() {
        assert_eq!(resolve_index("2", 4), Ok(Some(2)));
        assert_eq!(resolve_index("0", 4), Ok(Some(0)));
    }

    #[test]
    fn negative_index_counts_back_from_current_length() {
        for n in 2..10usize {
            for k in 1..n {
                let token = format!("-{k}");
                assert_eq!(resolve_index(&token, n), Ok(Some(n - k)));
            }
        }
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        assert_eq!(
            resolve_index("4", 4),
            Err(IndexError::OutOfRange {
                index: 4,
                pool_len: 4
            })
        );
        assert_eq!(
            resolve_index("-5", 4),
            Err(IndexError::OutOfRange {
                index: -5,
                pool_len: 4
            })
        );
    }

    #[test]
    fn empty_token_is_absent() {
        assert_eq!(resolve_index("", 4), Ok(None));
        assert!(matches!(resolve_index("x", 4), Err(IndexError::Malformed(_))));
    }

    #[test]
    fn corner_forms() {
        let lens = PoolLens {
            position: 4,
            texcoord: 3,
            normal: 2,
        };
        assert_eq!(
            parse_face_vertex("3", lens),
            Ok(FaceVertexIndex {
                position: 3,
                texcoord: None,
                normal: None
            })
        );
        assert_eq!(
            parse_face_vertex("3//1", lens),
            Ok(FaceVertexIndex {
                position: 3,
                texcoord: None,
                normal: Some(1)
            })
        );
        assert_eq!(
            parse_face_vertex("-1/-1/-1", lens),
            Ok(FaceVertexIndex {
                position: 3,
                texcoord: Some(2),
                normal: Some(1)
            })
        );
        assert!(parse_face_vertex("/1/1", lens).is_err());
    }
}
