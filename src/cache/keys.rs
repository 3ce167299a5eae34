//! Cache key and tag naming.
//!
//! Keys: `<collection>:list:<fingerprint>`, `<collection>:slug:<slug>`.
//! Tags: `collection:<collection>` for anything derived from a collection,
//! `<collection>:<slug>` for a single entry.

pub fn collection(collection: &str, fingerprint: &str) -> String {
    format!("{}:list:{}", collection, fingerprint)
}

pub fn entry(collection: &str, slug: &str) -> String {
    format!("{}:slug:{}", collection, slug)
}

pub fn single(single_type: &str) -> String {
    format!("single:{}", single_type)
}

pub mod tags {
    pub fn collection(collection: &str) -> String {
        format!("collection:{}", collection)
    }

    pub fn entry(collection: &str, slug: &str) -> String {
        format!("{}:{}", collection, slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        assert_eq!(collection("games", "ab12"), "games:list:ab12");
        assert_eq!(entry("casinos", "royal"), "casinos:slug:royal");
        assert_eq!(single("homepage"), "single:homepage");
        assert_eq!(tags::collection("blogs"), "collection:blogs");
        assert_eq!(tags::entry("blogs", "news"), "blogs:news");
    }
}
