//! Typed scan predicates.
//!
//! A [`ScanFilter`] compares a fixed-width field at a byte offset inside
//! each record against a constant. The comparison value is decoded once at
//! construction, so [`matches`](ScanFilter::matches) is total: records too
//! short for the field simply don't match, and no numeric promotion is
//! involved in obtaining the comparison sign.
//!
//! Numeric fields are read little-endian, the same byte order as every
//! other integer this crate puts on a page, so filters behave identically
//! across hosts.

use std::cmp::Ordering;

use super::error::HeapError;

/// Attribute type tag for [`ScanFilter::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    /// 4-byte signed integer.
    Int,
    /// 4-byte IEEE float.
    Float,
    /// Raw byte string.
    Bytes,
}

/// Relational comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Lt,
    Lte,
    Eq,
    Gte,
    Gt,
    Ne,
}

impl CompOp {
    /// Whether an attribute-versus-constant ordering satisfies the
    /// operator.
    fn matches(self, ord: Ordering) -> bool {
        match self {
            CompOp::Lt => ord == Ordering::Less,
            CompOp::Lte => ord != Ordering::Greater,
            CompOp::Eq => ord == Ordering::Equal,
            CompOp::Gte => ord != Ordering::Less,
            CompOp::Gt => ord == Ordering::Greater,
            CompOp::Ne => ord != Ordering::Equal,
        }
    }
}

/// A decoded comparison value, one variant per supported column type.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i32),
    Float(f32),
    Bytes(Vec<u8>),
}

/// An equality/ordering predicate over a byte range within each record.
///
/// Records are opaque to the heap layer except here: the filter extracts
/// `offset..offset + len` from the record bytes and compares it against
/// the stored constant, where `len` is 4 for numeric values and the
/// constant's length for byte strings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFilter {
    offset: usize,
    op: CompOp,
    value: AttrValue,
}

impl ScanFilter {
    /// Filter on a 4-byte signed integer field at `offset`.
    pub fn int(offset: usize, op: CompOp, value: i32) -> Self {
        Self {
            offset,
            op,
            value: AttrValue::Int(value),
        }
    }

    /// Filter on a 4-byte float field at `offset`.
    pub fn float(offset: usize, op: CompOp, value: f32) -> Self {
        Self {
            offset,
            op,
            value: AttrValue::Float(value),
        }
    }

    /// Filter on a byte-string field at `offset`, compared over the
    /// constant's length.
    pub fn bytes(offset: usize, op: CompOp, value: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            op,
            value: AttrValue::Bytes(value.into()),
        }
    }

    /// Builds a filter from untyped scan parameters, validating their
    /// geometry.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::BadScanParam` if `offset` is negative, `length`
    /// is less than 1, `length` does not match the attribute type's width
    /// (4 for `Int` and `Float`), or `filter` holds fewer than `length`
    /// bytes.
    pub fn from_raw(
        offset: i64,
        length: i64,
        attr_type: AttrType,
        filter: &[u8],
        op: CompOp,
    ) -> Result<Self, HeapError> {
        if offset < 0 {
            return Err(HeapError::BadScanParam("offset must be non-negative".into()));
        }
        if length < 1 {
            return Err(HeapError::BadScanParam("length must be at least 1".into()));
        }
        let length = length as usize;
        if filter.len() < length {
            return Err(HeapError::BadScanParam(format!(
                "filter value holds {} bytes, length is {}",
                filter.len(),
                length
            )));
        }
        let offset = offset as usize;

        let value = match attr_type {
            AttrType::Int => {
                if length != 4 {
                    return Err(HeapError::BadScanParam(
                        "integer filters require length 4".into(),
                    ));
                }
                AttrValue::Int(i32::from_le_bytes([
                    filter[0], filter[1], filter[2], filter[3],
                ]))
            }
            AttrType::Float => {
                if length != 4 {
                    return Err(HeapError::BadScanParam(
                        "float filters require length 4".into(),
                    ));
                }
                AttrValue::Float(f32::from_le_bytes([
                    filter[0], filter[1], filter[2], filter[3],
                ]))
            }
            AttrType::Bytes => AttrValue::Bytes(filter[..length].to_vec()),
        };

        Ok(Self { offset, op, value })
    }

    /// Width of the compared field in record bytes.
    fn attr_len(&self) -> usize {
        match &self.value {
            AttrValue::Int(_) | AttrValue::Float(_) => 4,
            AttrValue::Bytes(b) => b.len(),
        }
    }

    /// Whether a record satisfies the predicate.
    ///
    /// Records too short to contain the field don't match. Float
    /// comparisons against NaN don't match any operator.
    pub fn matches(&self, record: &[u8]) -> bool {
        let len = self.attr_len();
        let end = match self.offset.checked_add(len) {
            Some(end) if end <= record.len() => end,
            _ => return false,
        };
        let field = &record[self.offset..end];

        let ord = match &self.value {
            AttrValue::Int(v) => {
                let attr = i32::from_le_bytes([field[0], field[1], field[2], field[3]]);
                attr.cmp(v)
            }
            AttrValue::Float(v) => {
                let attr = f32::from_le_bytes([field[0], field[1], field[2], field[3]]);
                match attr.partial_cmp(v) {
                    Some(ord) => ord,
                    None => return false,
                }
            }
            AttrValue::Bytes(v) => field.cmp(v.as_slice()),
        };

        self.op.matches(ord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_record(value: i32) -> Vec<u8> {
        value.to_le_bytes().to_vec()
    }

    #[test]
    fn test_int_operators() {
        let rec = int_record(10);

        assert!(!ScanFilter::int(0, CompOp::Lt, 10).matches(&rec));
        assert!(ScanFilter::int(0, CompOp::Lte, 10).matches(&rec));
        assert!(ScanFilter::int(0, CompOp::Eq, 10).matches(&rec));
        assert!(ScanFilter::int(0, CompOp::Gte, 10).matches(&rec));
        assert!(!ScanFilter::int(0, CompOp::Gt, 10).matches(&rec));
        assert!(!ScanFilter::int(0, CompOp::Ne, 10).matches(&rec));

        assert!(ScanFilter::int(0, CompOp::Lt, 11).matches(&rec));
        assert!(ScanFilter::int(0, CompOp::Gt, 9).matches(&rec));
        assert!(ScanFilter::int(0, CompOp::Ne, 9).matches(&rec));
    }

    #[test]
    fn test_int_negative_values() {
        let rec = int_record(-5);
        assert!(ScanFilter::int(0, CompOp::Lt, 0).matches(&rec));
        assert!(ScanFilter::int(0, CompOp::Eq, -5).matches(&rec));
        assert!(!ScanFilter::int(0, CompOp::Gt, -5).matches(&rec));
    }

    #[test]
    fn test_int_at_offset() {
        let mut rec = vec![0xFFu8; 8];
        rec[4..8].copy_from_slice(&42i32.to_le_bytes());
        assert!(ScanFilter::int(4, CompOp::Eq, 42).matches(&rec));
    }

    #[test]
    fn test_float_operators() {
        let rec = 2.5f32.to_le_bytes().to_vec();
        assert!(ScanFilter::float(0, CompOp::Eq, 2.5).matches(&rec));
        assert!(ScanFilter::float(0, CompOp::Gt, 2.0).matches(&rec));
        assert!(ScanFilter::float(0, CompOp::Lt, 3.0).matches(&rec));
        assert!(!ScanFilter::float(0, CompOp::Ne, 2.5).matches(&rec));
    }

    #[test]
    fn test_float_nan_never_matches() {
        let rec = f32::NAN.to_le_bytes().to_vec();
        for op in [CompOp::Lt, CompOp::Lte, CompOp::Eq, CompOp::Gte, CompOp::Gt, CompOp::Ne] {
            assert!(!ScanFilter::float(0, op, 1.0).matches(&rec));
        }
    }

    #[test]
    fn test_bytes_lexicographic() {
        assert!(ScanFilter::bytes(0, CompOp::Eq, &b"abc"[..]).matches(b"abc"));
        assert!(ScanFilter::bytes(0, CompOp::Lt, &b"abd"[..]).matches(b"abc"));
        assert!(ScanFilter::bytes(0, CompOp::Gt, &b"abb"[..]).matches(b"abc"));
        // Comparison covers only the constant's length.
        assert!(ScanFilter::bytes(0, CompOp::Eq, &b"ab"[..]).matches(b"abXYZ"));
    }

    #[test]
    fn test_record_too_short_never_matches() {
        let rec = int_record(10);
        assert!(!ScanFilter::int(1, CompOp::Eq, 10).matches(&rec));
        assert!(!ScanFilter::int(100, CompOp::Ne, 10).matches(&rec));
        assert!(!ScanFilter::bytes(0, CompOp::Eq, &b"abcdef"[..]).matches(b"abc"));
    }

    #[test]
    fn test_offset_overflow_never_matches() {
        let filter = ScanFilter::int(usize::MAX - 1, CompOp::Eq, 1);
        assert!(!filter.matches(&int_record(1)));
    }

    #[test]
    fn test_from_raw_valid() {
        let filter =
            ScanFilter::from_raw(0, 4, AttrType::Int, &10i32.to_le_bytes(), CompOp::Gte).unwrap();
        assert!(filter.matches(&int_record(15)));
        assert!(filter.matches(&int_record(10)));
        assert!(!filter.matches(&int_record(5)));
    }

    #[test]
    fn test_from_raw_rejects_bad_geometry() {
        let value = 10i32.to_le_bytes();

        assert!(matches!(
            ScanFilter::from_raw(-1, 4, AttrType::Int, &value, CompOp::Eq),
            Err(HeapError::BadScanParam(_))
        ));
        assert!(matches!(
            ScanFilter::from_raw(0, 0, AttrType::Bytes, &value, CompOp::Eq),
            Err(HeapError::BadScanParam(_))
        ));
        assert!(matches!(
            ScanFilter::from_raw(0, 2, AttrType::Int, &value, CompOp::Eq),
            Err(HeapError::BadScanParam(_))
        ));
        assert!(matches!(
            ScanFilter::from_raw(0, 8, AttrType::Float, &[0u8; 8], CompOp::Eq),
            Err(HeapError::BadScanParam(_))
        ));
        assert!(matches!(
            ScanFilter::from_raw(0, 8, AttrType::Bytes, &value, CompOp::Eq),
            Err(HeapError::BadScanParam(_))
        ));
    }
}
