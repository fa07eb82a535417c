//! Canonical ordering and change detection for fetched snapshots.
//!
//! Decoding the control-plane payload does not guarantee a stable order for
//! its collections, so two semantically identical payloads can differ only in
//! the order of their sources or regulations. Snapshots are therefore brought
//! into a canonical order (identifier ascending) before they are compared or
//! cached.

use crate::types::{Regulations, Source, WorkspaceConfig};

/// Types that have a canonical, identifier-sorted representation.
pub trait Canonicalize: Sized {
    /// Returns the canonical form of `self`.
    fn canonicalize(self) -> Self;
}

impl Canonicalize for Source {
    fn canonicalize(mut self) -> Self {
        self.destinations.sort_by(|a, b| a.id.cmp(&b.id));
        self
    }
}

impl Canonicalize for WorkspaceConfig {
    fn canonicalize(mut self) -> Self {
        self.sources = self
            .sources
            .into_iter()
            .map(Canonicalize::canonicalize)
            .collect();
        self.sources.sort_by(|a, b| a.id.cmp(&b.id));
        self
    }
}

impl Canonicalize for Regulations {
    fn canonicalize(mut self) -> Self {
        self.workspace_regulations.sort_by(|a, b| a.id.cmp(&b.id));
        self.source_regulations.sort_by(|a, b| a.id.cmp(&b.id));
        self
    }
}

/// Reports whether `candidate` differs from `previous` once both are canonical.
///
/// Neither argument is modified; the comparison works on canonical copies.
pub fn has_changed<T>(previous: &T, candidate: &T) -> bool
where
    T: Canonicalize + Clone + PartialEq,
{
    previous.clone().canonicalize() != candidate.clone().canonicalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Destination, RegulationKind, SourceRegulation, WorkspaceRegulation};
    use proptest::prelude::*;

    fn source(id: &str, destinations: &[&str]) -> Source {
        Source {
            id: id.to_string(),
            name: format!("source-{id}"),
            write_key: format!("wk-{id}"),
            destinations: destinations
                .iter()
                .map(|d| Destination {
                    id: d.to_string(),
                    name: format!("destination-{d}"),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn config(sources: Vec<Source>) -> WorkspaceConfig {
        WorkspaceConfig {
            workspace_id: "ws-1".into(),
            sources,
            ..Default::default()
        }
    }

    #[test]
    fn canonicalize_sorts_sources_and_destinations() {
        let canonical = config(vec![source("b", &["d2", "d1"]), source("a", &[])]).canonicalize();
        let ids: Vec<_> = canonical.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        let destinations: Vec<_> = canonical.sources[1]
            .destinations
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(destinations, vec!["d1", "d2"]);
    }

    #[test]
    fn reordered_payload_is_not_a_change() {
        let previous = config(vec![source("a", &["x", "y"]), source("b", &[])]);
        let candidate = config(vec![source("b", &[]), source("a", &["y", "x"])]);
        assert!(!has_changed(&previous, &candidate));
    }

    #[test]
    fn has_changed_leaves_operands_untouched() {
        let previous = config(vec![source("b", &[]), source("a", &[])]);
        let candidate = previous.clone();
        has_changed(&previous, &candidate);
        assert_eq!(previous.sources[0].id, "b");
        assert_eq!(candidate.sources[0].id, "b");
    }

    #[test]
    fn empty_previous_snapshot_always_changes() {
        let candidate = config(vec![source("a", &[])]);
        assert!(has_changed(&WorkspaceConfig::default(), &candidate));
    }

    #[test]
    fn field_difference_is_a_change() {
        let previous = config(vec![source("a", &[])]);
        let mut candidate = previous.clone();
        candidate.sources[0].enabled = true;
        assert!(has_changed(&previous, &candidate));
    }

    #[test]
    fn regulations_are_compared_in_identifier_order() {
        let workspace = |id: &str| WorkspaceRegulation {
            id: id.into(),
            regulation_type: RegulationKind::Suppress,
            workspace_id: "ws".into(),
            user_id: Some(format!("user-{id}")),
        };
        let by_source = |id: &str| SourceRegulation {
            id: id.into(),
            regulation_type: RegulationKind::Delete,
            workspace_id: "ws".into(),
            source_id: Some("src".into()),
            user_id: None,
        };
        let previous = Regulations {
            workspace_regulations: vec![workspace("1"), workspace("2")],
            source_regulations: vec![by_source("3"), by_source("4")],
        };
        let candidate = Regulations {
            workspace_regulations: vec![workspace("2"), workspace("1")],
            source_regulations: vec![by_source("4"), by_source("3")],
        };
        assert!(!has_changed(&previous, &candidate));
        assert!(has_changed(&Regulations::default(), &candidate));

        let canonical = candidate.canonicalize();
        assert_eq!(canonical.workspace_regulations[0].id, "1");
        assert_eq!(canonical.source_regulations[0].id, "3");
    }

    #[test]
    fn unrecognised_regulation_labels_are_compared_verbatim() {
        let decode = |label: &str| -> Regulations {
            serde_json::from_value(serde_json::json!({
                "workspaceRegulations": [
                    {"id": "r1", "regulationType": label, "workspaceId": "ws", "userId": "u1"}
                ]
            }))
            .expect("decode")
        };
        let previous = decode("Anonymize");
        assert!(has_changed(&previous, &decode("Pseudonymize")));
        assert!(!has_changed(&previous, &decode("Anonymize")));
        assert_eq!(
            previous.workspace_regulations[0].regulation_type,
            RegulationKind::Other("Anonymize".into())
        );
    }

    proptest! {
        #[test]
        fn permutations_never_register_as_changes(
            ids in proptest::collection::btree_set("[a-z]{1,6}", 0..12),
            seed in any::<u64>(),
        ) {
            let sources: Vec<Source> = ids.iter().map(|id| source(id, &["d1", "d2"])).collect();
            let mut shuffled = sources.clone();
            // Seeded rotation and reversal.
            if !shuffled.is_empty() {
                let len = shuffled.len();
                shuffled.rotate_left((seed as usize) % len);
            }
            if seed % 2 == 0 {
                shuffled.reverse();
            }
            for s in shuffled.iter_mut() {
                s.destinations.reverse();
            }
            prop_assert!(!has_changed(&config(sources), &config(shuffled)));
        }
    }
}
