use crate::model::FieldKey;

const MOD_ADLER: u32 = 65521;
const HASH_LENGTH: usize = 6;

fn adler32(bytes: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;
    for &byte in bytes {
        a = (a + byte as u32) % MOD_ADLER;
        b = (b + a) % MOD_ADLER;
    }
    (b << 16) | a
}

/// Hash arbitrary text into six upper-case letters
pub fn alphanum_hash(text: &str) -> String {
    let mut value = adler32(text.as_bytes());
    let mut result = String::with_capacity(HASH_LENGTH);
    for _ in 0..HASH_LENGTH {
        result.push(char::from(b'A' + (value % 26) as u8));
        value /= 26;
    }
    result
}

/// Name of the local variable holding a rule's computed value
pub fn variable_name(key: &FieldKey) -> String {
    format!("value{}", alphanum_hash(&key.as_written()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adler32() {
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
        assert_eq!(adler32(b""), 1);
    }

    #[test]
    fn test_known_hashes() {
        assert_eq!(alphanum_hash("Wikipedia"), "CJBDHZ");
        assert_eq!(alphanum_hash("Entry::ftTitle"), "RPZBCE");
        assert_eq!(alphanum_hash(""), "BAAAAA");
    }

    #[test]
    fn test_hash_shape_and_determinism() {
        for key in ["Title", "Entry::ftAuthor", "\"x-google-id\"", "QStringLiteral(\"a\")", "ä"] {
            let hash = alphanum_hash(key);
            assert_eq!(hash.len(), 6);
            assert!(hash.chars().all(|c| c.is_ascii_uppercase()));
            assert_eq!(hash, alphanum_hash(key));
        }
        assert_ne!(alphanum_hash("Entry::ftTitle"), alphanum_hash("Entry::ftYear"));
    }

    #[test]
    fn test_variable_name_uses_key_as_written() {
        assert_eq!(variable_name(&FieldKey::parse("Title")), "valueBJKOII");
        assert_eq!(variable_name(&FieldKey::parse("\"eprint\"")), "valueXGTJXR");
    }
}
