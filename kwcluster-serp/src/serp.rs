use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// A single ranked competitor inside a SERP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub keyword: String,
    /// 1-based rank; smaller is more prominent.
    pub prominence: u32,
    pub competitor: String,
}

impl Member {
    pub fn new(keyword: impl Into<String>, prominence: u32, competitor: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            prominence,
            competitor: competitor.into(),
        }
    }
}

/// The ranked competitor list for one keyword.
///
/// Member order is authoritative and is never re-sorted. Competitors are
/// expected to be unique within a list; duplicates are not detected and will
/// skew overlap counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Serp {
    pub keyword: String,
    pub members: Vec<Member>,
}

/// Ranked lists keyed by keyword. Ordered, so every walk over it is sorted.
pub type KeywordData = BTreeMap<String, Serp>;

impl Serp {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            members: Vec::new(),
        }
    }

    /// Build a list from competitors in rank order, numbering prominence from 1.
    pub fn from_competitors(keyword: impl Into<String>, competitors: &[&str]) -> Self {
        let keyword = keyword.into();
        let members = competitors
            .iter()
            .enumerate()
            .map(|(i, c)| Member::new(keyword.clone(), i as u32 + 1, *c))
            .collect();
        Self { keyword, members }
    }

    pub fn push(&mut self, member: Member) {
        self.members.push(member);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn competitors(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.competitor.as_str())
    }

    /// The first `depth` members, or all of them if the list is shorter.
    pub fn prefix(&self, depth: usize) -> &[Member] {
        &self.members[..depth.min(self.members.len())]
    }
}

/// Parse one ranked list from a JSON array of `{keyword, prominence, competitor}`.
///
/// An empty array yields an empty list with no keyword.
pub fn parse(bytes: &[u8]) -> Result<Serp> {
    let entries: Vec<Member> = serde_json::from_slice(bytes)?;

    let keyword = entries
        .first()
        .map(|m| m.keyword.clone())
        .unwrap_or_default();

    Ok(Serp {
        keyword,
        members: entries,
    })
}

pub fn parse_reader<R: Read>(mut rdr: R) -> Result<Serp> {
    let mut buf = Vec::new();
    rdr.read_to_end(&mut buf)?;
    parse(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SerpError;

    const SAMPLE: &str = r#"[
        {"keyword": "apartment parking", "prominence": 1, "competitor": "zillow.com"},
        {"keyword": "apartment parking", "prominence": 2, "competitor": "apartments.com"},
        {"keyword": "apartment parking", "prominence": 3, "competitor": "reddit.com"}
    ]"#;

    #[test]
    fn test_parse_keeps_file_order() {
        let serp = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(serp.keyword, "apartment parking");
        assert_eq!(serp.len(), 3);
        let competitors: Vec<&str> = serp.competitors().collect();
        assert_eq!(competitors, vec!["zillow.com", "apartments.com", "reddit.com"]);
        assert_eq!(serp.members[2].prominence, 3);
    }

    #[test]
    fn test_parse_does_not_resort() {
        let input = r#"[
            {"keyword": "k", "prominence": 3, "competitor": "c"},
            {"keyword": "k", "prominence": 1, "competitor": "a"}
        ]"#;
        let serp = parse(input.as_bytes()).unwrap();
        assert_eq!(serp.members[0].competitor, "c");
        assert_eq!(serp.members[1].competitor, "a");
    }

    #[test]
    fn test_parse_empty_array() {
        let serp = parse(b"[]").unwrap();
        assert!(serp.keyword.is_empty());
        assert!(serp.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse(b"{not json");
        assert!(matches!(result, Err(SerpError::Parse(_))));
    }

    #[test]
    fn test_parse_wrong_shape() {
        let result = parse(br#"{"keyword": "k", "prominence": 1, "competitor": "a"}"#);
        assert!(matches!(result, Err(SerpError::Parse(_))));

        let result = parse(br#"[{"keyword": "k", "prominence": "first"}]"#);
        assert!(matches!(result, Err(SerpError::Parse(_))));
    }

    #[test]
    fn test_prefix_clamps_to_length() {
        let serp = Serp::from_competitors("k", &["a", "b", "c"]);
        assert_eq!(serp.prefix(2).len(), 2);
        assert_eq!(serp.prefix(10).len(), 3);
        assert_eq!(serp.prefix(2)[1].competitor, "b");
    }
}
