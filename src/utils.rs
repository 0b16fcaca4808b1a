const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a hash of `value`.
///
/// Stable across processes, platforms and compiler versions, unlike `std`'s
/// randomized `DefaultHasher`. Used to seed the synthetic price paths.
pub fn stable_hash(value: &str) -> u64 {
    value
        .bytes()
        .fold(FNV_OFFSET_BASIS, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}

#[cfg(feature = "serde")]
/// Reads a JSON array of candles from `filepath` and returns it as a `Series`.
pub fn read_series_from_file(filepath: std::path::PathBuf) -> crate::errors::Result<crate::market::Series> {
    use crate::errors::Error;
    use std::{fs::File, io::BufReader};

    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_known_vectors() {
        assert_eq!(stable_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(stable_hash("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn distinct_symbols_distinct_seeds() {
        assert_ne!(stable_hash("AAPL"), stable_hash("MSFT"));
        assert_eq!(stable_hash("AAPL"), stable_hash("AAPL"));
    }
}
