use super::*;

#[test]
fn test_hash_is_deterministic() {
    let a = Hash::new(b"station");
    let b = Hash::new(b"station");
    let c = Hash::new(b"stations");

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_hash_borsh_matches_buffered_encoding() {
    let value = (42_u64, "nz".to_owned());

    let buffered = Hash::new(&borsh::to_vec(&value).unwrap());
    let streamed = Hash::hash_borsh(&value).unwrap();

    assert_eq!(buffered, streamed);
}

#[test]
fn test_base58_round_trip() {
    let hash = Hash::new(b"manifest.json");
    let text = hash.to_base58();

    let parsed: Hash = text.parse().unwrap();

    assert_eq!(hash, parsed);
    assert_eq!(format!("{hash}"), text);
}

#[test]
fn test_parse_rejects_bad_input() {
    assert!("".parse::<Hash>().is_err());
    assert!("tooshort".parse::<Hash>().is_err());
    assert!("l1l1l1l1".parse::<Hash>().is_err());
}

#[test]
fn test_serde_as_string() {
    let hash = Hash::new(b"2026/02/13");

    let json = serde_json::to_string(&hash).unwrap();
    assert_eq!(json, format!("\"{}\"", hash.to_base58()));

    let back: Hash = serde_json::from_str(&json).unwrap();
    assert_eq!(hash, back);
}
