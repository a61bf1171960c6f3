use rand::RngExt;

/// URL-safe alphabet shared by link and visit identifiers
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const LINK_ID_LEN: usize = 10;
pub const VISIT_ID_LEN: usize = 8;

fn random_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate a random link identifier
pub fn generate_link_id() -> String {
    random_id(LINK_ID_LEN)
}

/// Generate a random visit identifier
pub fn generate_visit_id() -> String {
    random_id(VISIT_ID_LEN)
}
