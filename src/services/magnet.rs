// src/services/magnet.rs

//! Torrent file to magnet URI conversion.
//!
//! The info-hash is the SHA-1 of the canonical bencoding of the `info`
//! dictionary, rendered in RFC 4648 base32 as `xt=urn:btih:`.

use chrono::DateTime;
use serde_bencode::value::Value;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::utils::ISO_DATE_FORMAT;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Why a torrent file could not be turned into a magnet link.
///
/// Callers treat every variant the same way: the torrent is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed bencode: {0}")]
    Malformed(String),

    #[error("missing or invalid field '{0}'")]
    Field(&'static str),

    #[error("creation date {0} is out of range")]
    CreationDate(i64),
}

impl From<serde_bencode::Error> for DecodeError {
    fn from(e: serde_bencode::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Everything the crawler needs from a torrent file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetInfo {
    pub magnet_uri: String,

    /// `YYYY-MM-DDTHH:MM:SSZ` (UTC); `None` when the torrent has no creation date
    pub creation_date: Option<String>,

    /// Sum of file lengths in bytes
    pub total_length: i64,

    pub info_hash: [u8; 20],
}

impl MagnetInfo {
    pub fn info_hash_hex(&self) -> String {
        hex::encode(self.info_hash)
    }
}

/// Decode a complete bencoded document.
///
/// The re-encoding must have the input's length: trailing data, leading
/// zeros and duplicate keys all change it.
fn decode(raw: &[u8]) -> Result<Value, DecodeError> {
    let value: Value = serde_bencode::from_bytes(raw)?;
    let reencoded = serde_bencode::to_bytes(&value)?;
    if reencoded.len() != raw.len() {
        return Err(DecodeError::Malformed(format!(
            "{} bytes decoded as a {} byte document",
            raw.len(),
            reencoded.len()
        )));
    }
    Ok(value)
}

fn get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Dict(dict) => dict.get(key.as_bytes()),
        _ => None,
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        _ => None,
    }
}

fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

fn as_list(value: &Value) -> Option<&[Value]> {
    match value {
        Value::List(items) => Some(items),
        _ => None,
    }
}

/// Decode raw `.torrent` bytes into a magnet link.
pub fn encode(raw: &[u8]) -> Result<MagnetInfo, DecodeError> {
    let metadata = decode(raw)?;
    if !matches!(metadata, Value::Dict(_)) {
        return Err(DecodeError::Field("<root>"));
    }

    let info = get(&metadata, "info")
        .filter(|v| matches!(v, Value::Dict(_)))
        .ok_or(DecodeError::Field("info"))?;

    // serde_bencode writes dictionary keys in sorted order.
    let info_hash: [u8; 20] = Sha1::digest(serde_bencode::to_bytes(info)?).into();
    let name = get(info, "name")
        .and_then(as_str)
        .ok_or(DecodeError::Field("info.name"))?;
    let total_length = total_length(info)?;

    let mut magnet_uri = format!(
        "magnet:?xt=urn:btih:{}&dn={}",
        base32_encode(&info_hash),
        urlencoding::encode(name)
    );
    if let Some(tracker) = first_tracker(&metadata)? {
        magnet_uri.push_str("&tr=");
        magnet_uri.push_str(tracker);
    }
    magnet_uri.push_str(&format!("&xl={total_length}"));

    let creation_date = match get(&metadata, "creation date") {
        Some(value) => {
            let secs = as_int(value).ok_or(DecodeError::Field("creation date"))?;
            let date = DateTime::from_timestamp(secs, 0).ok_or(DecodeError::CreationDate(secs))?;
            Some(date.format(ISO_DATE_FORMAT).to_string())
        }
        None => {
            log::warn!("Date not available in torrent file '{name}'");
            None
        }
    };

    Ok(MagnetInfo {
        magnet_uri,
        creation_date,
        total_length,
        info_hash,
    })
}

/// `info.length` for single-file torrents, the sum of `info.files[*].length` otherwise.
fn total_length(info: &Value) -> Result<i64, DecodeError> {
    if let Some(length) = get(info, "length") {
        return as_int(length).ok_or(DecodeError::Field("info.length"));
    }
    let Some(files) = get(info, "files") else {
        return Ok(0);
    };

    as_list(files)
        .ok_or(DecodeError::Field("info.files"))?
        .iter()
        .try_fold(0i64, |sum, file| {
            let length = get(file, "length")
                .and_then(as_int)
                .ok_or(DecodeError::Field("info.files.length"))?;
            Ok(sum.saturating_add(length))
        })
}

/// The single tracker carried into the magnet link.
fn first_tracker(metadata: &Value) -> Result<Option<&str>, DecodeError> {
    match get(metadata, "announce") {
        Some(Value::Bytes(url)) => {
            return std::str::from_utf8(url)
                .map(Some)
                .map_err(|_| DecodeError::Field("announce"));
        }
        Some(Value::List(urls)) => {
            if let Some(first) = urls.first() {
                return as_str(first).map(Some).ok_or(DecodeError::Field("announce"));
            }
        }
        _ => {}
    }

    let tiers = get(metadata, "announce-list")
        .and_then(as_list)
        .unwrap_or_default();
    let first = tiers
        .iter()
        .filter_map(as_list)
        .find_map(|tier| tier.first());
    match first {
        Some(url) => as_str(url)
            .map(Some)
            .ok_or(DecodeError::Field("announce-list")),
        None => Ok(None),
    }
}

/// RFC 4648 base32, uppercase, with `=` padding.
pub fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    for chunk in data.chunks(5) {
        let mut block = [0u8; 5];
        block[..chunk.len()].copy_from_slice(chunk);
        let bits = block.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

        let symbols = (chunk.len() * 8).div_ceil(5);
        for i in 0..8 {
            if i < symbols {
                let index = (bits >> (35 - i * 5)) & 0x1f;
                out.push(char::from(BASE32_ALPHABET[index as usize]));
            } else {
                out.push('=');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_file_torrent(creation_date: Option<i64>) -> Vec<u8> {
        let mut raw = b"d8:announce30:http://tracker.example.com/ann".to_vec();
        if let Some(ts) = creation_date {
            raw.extend(format!("13:creation datei{ts}e").as_bytes());
        }
        raw.extend(b"4:infod6:lengthi1024e4:name9:Game Demo12:piece lengthi16384e6:pieces20:");
        raw.extend([7u8; 20]);
        raw.extend(b"ee");
        raw
    }

    /// Bytes of the `info` dictionary, which is the last key of the fixture.
    fn info_bytes(raw: &[u8]) -> &[u8] {
        let start = raw.windows(6).position(|w| w == b"4:info").unwrap() + 6;
        &raw[start..raw.len() - 1]
    }

    #[test]
    fn test_base32_rfc4648_vectors() {
        assert_eq!(base32_encode(b""), "");
        assert_eq!(base32_encode(b"f"), "MY======");
        assert_eq!(base32_encode(b"fo"), "MZXQ====");
        assert_eq!(base32_encode(b"foo"), "MZXW6===");
        assert_eq!(base32_encode(b"foob"), "MZXW6YQ=");
        assert_eq!(base32_encode(b"fooba"), "MZXW6YTB");
        assert_eq!(base32_encode(b"foobar"), "MZXW6YTBOI======");
    }

    #[test]
    fn test_single_file_magnet() {
        let raw = single_file_torrent(Some(1_704_103_200));
        let magnet = encode(&raw).unwrap();

        let expected = format!(
            "magnet:?xt=urn:btih:{}&dn=Game%20Demo&tr=http://tracker.example.com/ann&xl=1024",
            base32_encode(&Sha1::digest(info_bytes(&raw)))
        );
        assert_eq!(magnet.magnet_uri, expected);
        assert_eq!(magnet.total_length, 1024);
        assert_eq!(magnet.creation_date.as_deref(), Some("2024-01-01T10:00:00Z"));
        assert_eq!(magnet.info_hash_hex().len(), 40);
    }

    #[test]
    fn test_info_hash_matches_raw_info_bytes() {
        let raw = single_file_torrent(None);
        let magnet = encode(&raw).unwrap();
        let digest: [u8; 20] = Sha1::digest(info_bytes(&raw)).into();
        assert_eq!(magnet.info_hash, digest);
    }

    #[test]
    fn test_info_hash_uses_sorted_keys() {
        let sorted = b"d4:infod6:lengthi1e4:name1:xee";
        let unsorted = b"d4:infod4:name1:x6:lengthi1eee";
        assert_eq!(encode(unsorted).unwrap().info_hash, encode(sorted).unwrap().info_hash);
    }

    #[test]
    fn test_missing_creation_date_is_not_an_error() {
        let magnet = encode(&single_file_torrent(None)).unwrap();
        assert!(magnet.creation_date.is_none());
        assert!(magnet.magnet_uri.starts_with("magnet:?xt=urn:btih:"));
    }

    #[test]
    fn test_multi_file_length_sum() {
        let raw = b"d4:infod5:filesld6:lengthi100e4:pathl1:aeed6:lengthi250e4:pathl1:beee4:name5:multi6:pieces0:ee";
        let magnet = encode(raw).unwrap();
        assert_eq!(magnet.total_length, 350);
        assert!(magnet.magnet_uri.ends_with("&dn=multi&xl=350"));
    }

    #[test]
    fn test_tracker_from_announce_list() {
        let raw = b"d13:announce-listllel11:udp://t:80/ee4:infod6:lengthi1e4:name1:xee";
        let magnet = encode(raw).unwrap();
        assert!(magnet.magnet_uri.contains("&tr=udp://t:80/&xl=1"));
    }

    #[test]
    fn test_only_first_tracker_is_used() {
        let raw = b"d8:announcel5:udp:a5:udp:be4:infod6:lengthi1e4:name1:xee";
        let magnet = encode(raw).unwrap();
        assert!(magnet.magnet_uri.contains("&tr=udp:a&"));
        assert!(!magnet.magnet_uri.contains("udp:b"));
    }

    #[test]
    fn test_no_length_fields_yields_zero() {
        let magnet = encode(b"d4:infod4:name1:xee").unwrap();
        assert_eq!(magnet.total_length, 0);
        assert!(magnet.magnet_uri.ends_with("&xl=0"));
    }

    #[test]
    fn test_rejects_malformed_bencode() {
        let valid = b"d4:infod6:lengthi1e4:name1:xee".to_vec();
        let mut trailing = valid.clone();
        trailing.extend(b"i2e");

        let cases: [&[u8]; 9] = [
            b"",
            b"i12",
            b"ie",
            b"10:short",
            b"l1:a",
            b"d1:ai1e",
            b"d4:infod6:lengthi01e4:name1:xee",
            b"d4:infod6:lengthi-0e4:name1:xee",
            &trailing,
        ];
        for raw in cases {
            assert!(
                matches!(encode(raw), Err(DecodeError::Malformed(_))),
                "accepted {:?}",
                String::from_utf8_lossy(raw)
            );
        }
        assert!(encode(&valid).is_ok());
    }

    #[test]
    fn test_failures_collapse_to_decode_error() {
        assert!(encode(b"<!DOCTYPE html><html>dead torrent</html>").is_err());
        assert!(encode(b"d8:announce3:abce").is_err());
        assert!(encode(b"li1ee").is_err());
        assert!(encode(b"d4:infod4:name2:\xff\xfeee").is_err());
        assert!(encode(b"d4:infod5:filesld4:pathl1:aeee4:name1:xee").is_err());
    }
}
