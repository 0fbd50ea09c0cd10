use activity_logger::hydrator::{hydrate, hydrate_first, RepeatingRow};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct FlatRow {
    head: (usize, String),
    child: Option<u32>,
}

impl RepeatingRow for FlatRow {
    type Head = (usize, String);
    type Child = u32;

    fn split(self) -> (Self::Head, Option<u32>) {
        (self.head, self.child)
    }
}

fn flatten(aggregates: &[(String, Vec<u32>)]) -> Vec<FlatRow> {
    aggregates
        .iter()
        .enumerate()
        .flat_map(|(index, (label, children))| {
            let head = (index, label.clone());
            if children.is_empty() {
                vec![FlatRow { head, child: None }]
            } else {
                children
                    .iter()
                    .map(|child| FlatRow {
                        head: head.clone(),
                        child: Some(*child),
                    })
                    .collect()
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_hydration_restores_aggregates(
        aggregates in prop::collection::vec(("[a-z]{0,3}", prop::collection::vec(any::<u32>(), 0..=5)), 0..=20)
    ) {
        let hydrated = hydrate(flatten(&aggregates));

        prop_assert_eq!(hydrated.len(), aggregates.len());
        for (index, (aggregate, (label, children))) in hydrated.iter().zip(&aggregates).enumerate() {
            prop_assert_eq!(&aggregate.head, &(index, label.clone()));
            prop_assert_eq!(&aggregate.children, children);
        }
    }

    #[test]
    fn prop_first_matches_full_hydration(
        aggregates in prop::collection::vec(("[a-z]{0,3}", prop::collection::vec(any::<u32>(), 0..=5)), 1..=20)
    ) {
        let rows = flatten(&aggregates);
        let first = hydrate_first(rows.clone()).unwrap();
        let all = hydrate(rows);
        prop_assert_eq!(&first, &all[0]);
    }
}
