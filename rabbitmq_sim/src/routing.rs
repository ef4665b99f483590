use crate::binding::XMatch;
use lapin::types::{AMQPValue, FieldTable, ShortString};

pub(crate) const TOPIC_DELIMITER: char = '.';
pub(crate) const TOPIC_SINGLE_WORD: &str = "*";
pub(crate) const TOPIC_ZERO_OR_MORE_WORDS: &str = "#";

/// Header names starting with this prefix are never compared.
pub(crate) const RESERVED_HEADER_PREFIX: &str = "x-";

#[derive(Debug, Clone, PartialEq, Eq)]
enum TopicSegment {
    Word(String),
    Star,
    Hash,
}

/// A topic binding key split on `.` into literal words and wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TopicPattern {
    segments: Vec<TopicSegment>,
}

impl TopicPattern {
    pub(crate) fn parse(key: &str) -> TopicPattern {
        let mut segments: Vec<TopicSegment> = vec![];

        for word in key.split(TOPIC_DELIMITER) {
            let segment = match word {
                TOPIC_SINGLE_WORD => TopicSegment::Star,
                TOPIC_ZERO_OR_MORE_WORDS => TopicSegment::Hash,
                _ => TopicSegment::Word(word.to_owned()),
            };

            // "#.#" accepts exactly what "#" accepts
            if segment == TopicSegment::Hash && segments.last() == Some(&TopicSegment::Hash) {
                continue;
            }
            segments.push(segment);
        }

        TopicPattern { segments }
    }

    pub(crate) fn matches(&self, routing_key: &str) -> bool {
        let words: Vec<&str> = routing_key.split(TOPIC_DELIMITER).collect();
        match_words(&self.segments, &words)
    }
}

// Walks the pattern one segment at a time. `matched[j]` holds whether the
// segments seen so far account for exactly the first `j` words.
fn match_words(pattern: &[TopicSegment], words: &[&str]) -> bool {
    let mut matched = vec![false; words.len() + 1];
    matched[0] = true;

    for segment in pattern {
        let mut next = vec![false; words.len() + 1];

        match segment {
            TopicSegment::Hash => {
                let mut reached = false;
                for (j, slot) in next.iter_mut().enumerate() {
                    reached |= matched[j];
                    *slot = reached;
                }
            }
            TopicSegment::Star => {
                for j in 1..=words.len() {
                    next[j] = matched[j - 1];
                }
            }
            TopicSegment::Word(expected) => {
                for j in 1..=words.len() {
                    next[j] = matched[j - 1] && words[j - 1] == expected.as_str();
                }
            }
        }

        matched = next;
    }

    matched[words.len()]
}

/// Evaluates a headers binding against the headers of a published message.
pub(crate) fn headers_match(x_match: XMatch, required: &FieldTable, headers: &FieldTable) -> bool {
    let mut required = required
        .inner()
        .iter()
        .filter(|(key, _)| !key.as_str().starts_with(RESERVED_HEADER_PREFIX));

    let header_matches = |(key, expected): (&ShortString, &AMQPValue)| {
        headers
            .inner()
            .get(key)
            .is_some_and(|value| matches_value(expected, value))
    };

    match x_match {
        XMatch::All => required.all(header_matches),
        XMatch::Any => required.any(header_matches),
    }
}

// A void binding argument only asks for the header to be present.
fn matches_value(expected: &AMQPValue, value: &AMQPValue) -> bool {
    if let AMQPValue::Void = expected {
        return true;
    }

    if let (Some(expected), Some(value)) = (as_integer(expected), as_integer(value)) {
        return expected == value;
    }

    if let (Some(expected), Some(value)) = (as_bytes(expected), as_bytes(value)) {
        return expected == value;
    }

    expected == value
}

fn as_integer(value: &AMQPValue) -> Option<i128> {
    match value {
        AMQPValue::ShortShortInt(v) => Some(i128::from(*v)),
        AMQPValue::ShortShortUInt(v) => Some(i128::from(*v)),
        AMQPValue::ShortInt(v) => Some(i128::from(*v)),
        AMQPValue::ShortUInt(v) => Some(i128::from(*v)),
        AMQPValue::LongInt(v) => Some(i128::from(*v)),
        AMQPValue::LongUInt(v) => Some(i128::from(*v)),
        AMQPValue::LongLongInt(v) => Some(i128::from(*v)),
        _ => None,
    }
}

fn as_bytes(value: &AMQPValue) -> Option<&[u8]> {
    match value {
        AMQPValue::ShortString(v) => Some(v.as_str().as_bytes()),
        AMQPValue::LongString(v) => Some(v.as_bytes()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::types::LongString;

    fn table(pairs: &[(&str, AMQPValue)]) -> FieldTable {
        let mut table = FieldTable::default();
        for (key, value) in pairs {
            table.insert(ShortString::from(*key), value.clone());
        }
        table
    }

    fn text(value: &str) -> AMQPValue {
        AMQPValue::LongString(LongString::from(value))
    }

    #[test]
    fn topic_star_matches_exactly_one_word() {
        let pattern = TopicPattern::parse("a.*.c");

        assert!(pattern.matches("a.b.c"));
        assert!(!pattern.matches("a.b"));
        assert!(!pattern.matches("a.b.c.d"));
        assert!(!pattern.matches("a.c"));
    }

    #[test]
    fn topic_hash_matches_zero_or_more_words() {
        let pattern = TopicPattern::parse("a.#");

        assert!(pattern.matches("a"));
        assert!(pattern.matches("a.x"));
        assert!(pattern.matches("a.x.y.z"));
        assert!(!pattern.matches("b.x"));
    }

    #[test]
    fn topic_hash_in_the_middle() {
        let pattern = TopicPattern::parse("a.#.z");

        assert!(pattern.matches("a.z"));
        assert!(pattern.matches("a.b.c.z"));
        assert!(!pattern.matches("a.b.c"));
        assert!(!pattern.matches("a.z.b"));
    }

    #[test]
    fn topic_lone_hash_matches_everything() {
        let pattern = TopicPattern::parse("#");

        assert!(pattern.matches(""));
        assert!(pattern.matches("anything"));
        assert!(pattern.matches("any.thing.at.all"));
    }

    #[test]
    fn topic_many_hashes_on_a_long_key() {
        let pattern = TopicPattern::parse("#.a.#.a.#.a.#.a.#.a.#.a.#.a.#.b");
        let words = vec!["a"; 200];

        assert!(!pattern.matches(&words.join(".")));
        assert!(pattern.matches(&format!("{}.b", words.join("."))));
        assert!(!pattern.matches("a.a.a.a.a.a.b"));
        assert!(pattern.matches("a.a.a.a.a.a.a.b"));
    }

    #[test]
    fn topic_repeated_hashes_collapse() {
        assert_eq!(TopicPattern::parse("a.#.#.b"), TopicPattern::parse("a.#.b"));
    }

    #[test]
    fn topic_is_case_sensitive_and_needs_the_full_key() {
        let pattern = TopicPattern::parse("stock.usd.nyse");

        assert!(pattern.matches("stock.usd.nyse"));
        assert!(!pattern.matches("stock.USD.nyse"));
        assert!(!pattern.matches("stock.usd"));
    }

    #[test]
    fn headers_all_requires_every_pair() {
        let required = table(&[("format", text("pdf")), ("type", text("report"))]);

        let full = table(&[("format", text("pdf")), ("type", text("report"))]);
        let partial = table(&[("format", text("pdf"))]);

        assert!(headers_match(XMatch::All, &required, &full));
        assert!(!headers_match(XMatch::All, &required, &partial));
    }

    #[test]
    fn headers_any_requires_one_pair() {
        let required = table(&[("format", text("pdf")), ("type", text("report"))]);

        assert!(headers_match(
            XMatch::Any,
            &required,
            &table(&[("format", text("pdf"))])
        ));
        assert!(!headers_match(
            XMatch::Any,
            &required,
            &table(&[("format", text("zip"))])
        ));
    }

    #[test]
    fn headers_ignore_reserved_keys() {
        let required = table(&[("x-match", text("all")), ("format", text("pdf"))]);

        assert!(headers_match(
            XMatch::All,
            &required,
            &table(&[("format", text("pdf"))])
        ));
        assert!(!headers_match(
            XMatch::Any,
            &table(&[("x-match", text("any"))]),
            &table(&[("x-match", text("any"))])
        ));
    }

    #[test]
    fn headers_without_requirements() {
        let empty = FieldTable::default();
        let headers = table(&[("format", text("pdf"))]);

        assert!(headers_match(XMatch::All, &empty, &headers));
        assert!(!headers_match(XMatch::Any, &empty, &headers));
    }

    #[test]
    fn headers_compare_values_loosely() {
        let required = table(&[
            ("format", AMQPValue::ShortString(ShortString::from("pdf"))),
            ("version", AMQPValue::LongInt(2)),
        ]);
        let headers = table(&[("format", text("pdf")), ("version", AMQPValue::ShortInt(2))]);

        assert!(headers_match(XMatch::All, &required, &headers));
    }

    #[test]
    fn headers_void_matches_on_presence() {
        let required = table(&[("trace", AMQPValue::Void)]);

        assert!(headers_match(
            XMatch::All,
            &required,
            &table(&[("trace", text("abc"))])
        ));
        assert!(!headers_match(XMatch::All, &required, &FieldTable::default()));
    }

    #[test]
    fn headers_values_must_be_equal() {
        let required = table(&[("version", AMQPValue::LongInt(2))]);

        assert!(!headers_match(
            XMatch::All,
            &required,
            &table(&[("version", text("2"))])
        ));
    }
}
