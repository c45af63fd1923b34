//! Type families and cast compatibility.

use arrow::datatypes::DataType;

pub fn is_string(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View)
}

pub fn is_binary(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView | DataType::FixedSizeBinary(_)
    )
}

/// Whether a value of `from` can be cast to `to` without changing what it
/// identifies, so that a cast between them can be looked through.
///
/// Nullability is not part of a `DataType` and is ignored.
pub fn is_interoperable(from: &DataType, to: &DataType) -> bool {
    use DataType::*;

    if from == to {
        return true;
    }
    match (from, to) {
        (a, b) if is_string(a) && is_string(b) => true,
        (a, b) if is_binary(a) && is_binary(b) => true,
        (a, b) if a.is_integer() && b.is_integer() => integer_widens(a, b),
        (a, b) if a.is_floating() && b.is_floating() => float_width(a) <= float_width(b),
        (Decimal128(p1, s1) | Decimal256(p1, s1), Decimal128(p2, s2) | Decimal256(p2, s2)) => {
            s2 >= s1 && (*p2 as i16 - *s2 as i16) >= (*p1 as i16 - *s1 as i16)
        }
        (Date32 | Date64, Date32 | Date64) => true,
        (Timestamp(u1, _), Timestamp(u2, _)) => u1 == u2,
        (List(a), List(b)) | (LargeList(a), LargeList(b)) => {
            is_interoperable(a.data_type(), b.data_type())
        }
        _ => false,
    }
}

/// Whether two types may be compared for equality in a lookup key.
pub fn is_comparable(left: &DataType, right: &DataType) -> bool {
    left == right
        || left.is_null()
        || right.is_null()
        || (left.is_numeric() && right.is_numeric())
        || is_interoperable(left, right)
        || is_interoperable(right, left)
}

fn integer_widens(from: &DataType, to: &DataType) -> bool {
    let (from_signed, from_bits) = integer_shape(from);
    let (to_signed, to_bits) = integer_shape(to);
    match (from_signed, to_signed) {
        (true, true) | (false, false) => to_bits >= from_bits,
        (false, true) => to_bits > from_bits,
        (true, false) => false,
    }
}

fn integer_shape(data_type: &DataType) -> (bool, u8) {
    match data_type {
        DataType::Int8 => (true, 8),
        DataType::Int16 => (true, 16),
        DataType::Int32 => (true, 32),
        DataType::Int64 => (true, 64),
        DataType::UInt8 => (false, 8),
        DataType::UInt16 => (false, 16),
        DataType::UInt32 => (false, 32),
        _ => (false, 64),
    }
}

fn float_width(data_type: &DataType) -> u8 {
    match data_type {
        DataType::Float16 => 16,
        DataType::Float32 => 32,
        _ => 64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, TimeUnit};
    use std::sync::Arc;

    #[test]
    fn test_identical_types_interoperate() {
        assert!(is_interoperable(&DataType::Int32, &DataType::Int32));
        assert!(is_interoperable(&DataType::Boolean, &DataType::Boolean));
    }

    #[test]
    fn test_string_family() {
        assert!(is_interoperable(&DataType::Utf8, &DataType::LargeUtf8));
        assert!(is_interoperable(&DataType::Utf8View, &DataType::Utf8));
        assert!(!is_interoperable(&DataType::Utf8, &DataType::Binary));
    }

    #[test]
    fn test_integer_widening_only() {
        assert!(is_interoperable(&DataType::Int32, &DataType::Int64));
        assert!(is_interoperable(&DataType::UInt16, &DataType::Int32));
        assert!(!is_interoperable(&DataType::Int64, &DataType::Int32));
        assert!(!is_interoperable(&DataType::Int8, &DataType::UInt64));
        assert!(!is_interoperable(&DataType::UInt32, &DataType::Int32));
    }

    #[test]
    fn test_numeric_families_do_not_mix() {
        assert!(is_interoperable(&DataType::Float32, &DataType::Float64));
        assert!(!is_interoperable(&DataType::Int32, &DataType::Float64));
        assert!(!is_interoperable(&DataType::Int32, &DataType::Utf8));
    }

    #[test]
    fn test_decimal_widening() {
        assert!(is_interoperable(&DataType::Decimal128(10, 2), &DataType::Decimal128(12, 2)));
        assert!(is_interoperable(&DataType::Decimal128(10, 2), &DataType::Decimal256(20, 4)));
        assert!(!is_interoperable(&DataType::Decimal128(10, 2), &DataType::Decimal128(10, 4)));
    }

    #[test]
    fn test_temporal_types() {
        let millis = DataType::Timestamp(TimeUnit::Millisecond, None);
        let millis_utc = DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()));
        let micros = DataType::Timestamp(TimeUnit::Microsecond, None);
        assert!(is_interoperable(&millis, &millis_utc));
        assert!(!is_interoperable(&millis, &micros));
        assert!(is_interoperable(&DataType::Date32, &DataType::Date64));
    }

    #[test]
    fn test_list_element_types() {
        let ints = DataType::List(Arc::new(Field::new("item", DataType::Int32, true)));
        let longs = DataType::List(Arc::new(Field::new("item", DataType::Int64, false)));
        assert!(is_interoperable(&ints, &longs));
        assert!(!is_interoperable(&longs, &ints));
    }

    #[test]
    fn test_comparable() {
        assert!(is_comparable(&DataType::Int32, &DataType::Float64));
        assert!(is_comparable(&DataType::Null, &DataType::Utf8));
        assert!(is_comparable(&DataType::LargeUtf8, &DataType::Utf8));
        assert!(!is_comparable(&DataType::Utf8, &DataType::Int32));
    }
}
