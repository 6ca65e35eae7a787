use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::mention::normalize_mention;

/// Ordered call lists for one rota message, split into attendees expected
/// to join the huddle (`online`) and those called asynchronously
/// (`offline`). Order is meaningful: it is the order attendees are called
/// in, and it must survive encode/decode round-trips untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTagsAssignment {
    pub online: Vec<String>,
    pub offline: Vec<String>,
}

impl UserTagsAssignment {
    pub fn new(online: Vec<String>, offline: Vec<String>) -> Self {
        Self { online, offline }
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty() && self.offline.is_empty()
    }

    /// All mentions in call order, online group first.
    pub fn mentions(&self) -> impl Iterator<Item = &str> {
        self.online.iter().chain(self.offline.iter()).map(String::as_str)
    }

    /// Repairs an assignment from an untrusted source (typically raw LLM
    /// output): normalizes every mention to canonical form, then removes
    /// duplicates across and within the two sequences.
    ///
    /// Duplicate policy: the first occurrence wins, with `online` scanned
    /// before `offline`. A user the model placed in both groups therefore
    /// stays online.
    pub fn repaired(&self) -> Self {
        let mut seen = BTreeSet::new();
        Self {
            online: dedup_normalized(&self.online, &mut seen),
            offline: dedup_normalized(&self.offline, &mut seen),
        }
    }
}

fn dedup_normalized(mentions: &[String], seen: &mut BTreeSet<String>) -> Vec<String> {
    let mut kept = Vec::with_capacity(mentions.len());
    for raw in mentions {
        let mention = normalize_mention(raw);
        if seen.insert(mention.clone()) {
            kept.push(mention);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::UserTagsAssignment;

    fn tags(mentions: &[&str]) -> Vec<String> {
        mentions.iter().map(|mention| (*mention).to_string()).collect()
    }

    #[test]
    fn repair_keeps_first_occurrence_across_groups() {
        // <@U2> appears in both groups; the online copy wins.
        let assignment = UserTagsAssignment::new(
            tags(&["<@U2>", "<@U1>"]),
            tags(&["<@U3>", "<@U2>", "<@U4>"]),
        );

        let repaired = assignment.repaired();
        assert_eq!(repaired.online, tags(&["<@U2>", "<@U1>"]));
        assert_eq!(repaired.offline, tags(&["<@U3>", "<@U4>"]));
    }

    #[test]
    fn repair_drops_later_duplicates_within_one_group() {
        let assignment = UserTagsAssignment::new(vec![], tags(&["<@U1>", "<@U2>", "<@U1>"]));

        let repaired = assignment.repaired();
        assert_eq!(repaired.offline, tags(&["<@U1>", "<@U2>"]));
    }

    #[test]
    fn repair_normalizes_bare_ids_before_deduplication() {
        // The bare `U5` and the canonical `<@U5>` are the same user.
        let assignment = UserTagsAssignment::new(tags(&["U5"]), tags(&["<@U5>", "U6"]));

        let repaired = assignment.repaired();
        assert_eq!(repaired.online, tags(&["<@U5>"]));
        assert_eq!(repaired.offline, tags(&["<@U6>"]));
    }

    #[test]
    fn repair_preserves_call_order() {
        let assignment =
            UserTagsAssignment::new(tags(&["<@U9>", "<@U3>"]), tags(&["<@U7>", "<@U1>"]));

        let repaired = assignment.repaired();
        assert_eq!(repaired.online, tags(&["<@U9>", "<@U3>"]));
        assert_eq!(repaired.offline, tags(&["<@U7>", "<@U1>"]));
    }

    #[test]
    fn empty_assignment_is_valid_and_stays_empty() {
        let assignment = UserTagsAssignment::default();
        assert!(assignment.is_empty());
        assert!(assignment.repaired().is_empty());
    }

    #[test]
    fn serde_shape_matches_the_structured_output_contract() {
        let parsed: UserTagsAssignment =
            serde_json::from_str(r#"{"online":["<@U1>"],"offline":["<@U2>","<@U3>"]}"#)
                .expect("assignment json should parse");
        assert_eq!(parsed.online, tags(&["<@U1>"]));
        assert_eq!(parsed.offline, tags(&["<@U2>", "<@U3>"]));
    }
}
