use byteorder::{ByteOrder, LittleEndian};

use crate::error::{GeoArrowError, Result};

/// Kernel options, wire-encoded as a length-prefixed sequence of string
/// key/value pairs.
///
/// The blob layout is `count:i32le`, then per pair `key_len:i32le`,
/// `key:utf8`, `val_len:i32le`, `val:utf8`. An empty blob means no options.
/// Unknown keys survive parsing; each kernel rejects keys it does not
/// recognize at start time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelOptions {
    entries: Vec<(String, String)>,
}

impl KernelOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing any existing value for the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, value.into()));
    }

    /// Look up an option value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse the wire encoding.
    pub fn parse(blob: &[u8]) -> Result<Self> {
        if blob.is_empty() {
            return Ok(Self::default());
        }
        let mut pos = 0;
        let read_i32 = |pos: &mut usize| -> Result<i32> {
            if *pos + 4 > blob.len() {
                return Err(GeoArrowError::IllegalArgument(
                    "Truncated kernel options blob".to_string(),
                ));
            }
            let out = LittleEndian::read_i32(&blob[*pos..*pos + 4]);
            *pos += 4;
            Ok(out)
        };
        let read_str = |pos: &mut usize, len: i32| -> Result<String> {
            let len = usize::try_from(len).map_err(|_| {
                GeoArrowError::IllegalArgument("Negative length in kernel options blob".to_string())
            })?;
            if *pos + len > blob.len() {
                return Err(GeoArrowError::IllegalArgument(
                    "Truncated kernel options blob".to_string(),
                ));
            }
            let out = std::str::from_utf8(&blob[*pos..*pos + len])
                .map_err(|_| {
                    GeoArrowError::IllegalArgument(
                        "Kernel options must be valid UTF-8".to_string(),
                    )
                })?
                .to_string();
            *pos += len;
            Ok(out)
        };

        let count = read_i32(&mut pos)?;
        let mut entries = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let key_len = read_i32(&mut pos)?;
            let key = read_str(&mut pos, key_len)?;
            let val_len = read_i32(&mut pos)?;
            let val = read_str(&mut pos, val_len)?;
            entries.push((key, val));
        }
        if pos != blob.len() {
            return Err(GeoArrowError::IllegalArgument(
                "Trailing bytes in kernel options blob".to_string(),
            ));
        }
        Ok(Self { entries })
    }

    /// Produce the wire encoding.
    pub fn serialize(&self) -> Vec<u8> {
        if self.entries.is_empty() {
            return vec![];
        }
        let mut out = Vec::new();
        let write_i32 = |out: &mut Vec<u8>, value: i32| {
            let mut bytes = [0; 4];
            LittleEndian::write_i32(&mut bytes, value);
            out.extend_from_slice(&bytes);
        };
        write_i32(&mut out, self.entries.len() as i32);
        for (key, value) in &self.entries {
            write_i32(&mut out, key.len() as i32);
            out.extend_from_slice(key.as_bytes());
            write_i32(&mut out, value.len() as i32);
            out.extend_from_slice(value.as_bytes());
        }
        out
    }

    /// Reject any key outside `allowed`; kernels call this at start.
    pub(crate) fn expect_keys(&self, allowed: &[&str]) -> Result<()> {
        for (key, _) in &self.entries {
            if !allowed.contains(&key.as_str()) {
                return Err(GeoArrowError::IllegalArgument(format!(
                    "Unknown kernel option: {key}"
                )));
            }
        }
        Ok(())
    }

    /// Parse an integer option.
    pub(crate) fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| {
                GeoArrowError::IllegalArgument(format!(
                    "Kernel option {key} must be an integer, got {value:?}"
                ))
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_blob_means_no_options() {
        assert_eq!(KernelOptions::parse(b"").unwrap(), KernelOptions::new());
    }

    #[test]
    fn wire_round_trip() {
        let mut options = KernelOptions::new();
        options.set("type", "10001");
        options.set("significant_digits", "6");
        let blob = options.serialize();
        assert_eq!(KernelOptions::parse(&blob).unwrap(), options);
    }

    #[test]
    fn known_layout() {
        let mut options = KernelOptions::new();
        options.set("k", "vv");
        let blob = options.serialize();
        // count=1, key_len=1, "k", val_len=2, "vv"
        assert_eq!(
            blob,
            [
                1, 0, 0, 0, //
                1, 0, 0, 0, b'k', //
                2, 0, 0, 0, b'v', b'v',
            ]
        );
    }

    #[test]
    fn truncated_blob_rejected() {
        let mut options = KernelOptions::new();
        options.set("key", "value");
        let blob = options.serialize();
        for cut in [1, 4, 7, blob.len() - 1] {
            assert!(KernelOptions::parse(&blob[..cut]).is_err());
        }
    }

    #[test]
    fn unknown_keys_rejected_by_kernels() {
        let mut options = KernelOptions::new();
        options.set("frobnicate", "1");
        assert!(options.expect_keys(&["type"]).is_err());
        assert!(options.expect_keys(&["frobnicate"]).is_ok());
    }
}
