//! Server selection policy.

use std::cmp::{Ordering, Reverse};

use xferant_core::Server;

/// Lowest load first; on equal load the most recent report wins, then the
/// lexicographically smaller name.
///
/// "Most recent" means the latest `last_update`, i.e. the server most
/// recently confirmed fresh, not the one that has gone longest without a
/// report.
fn preference(a: &Server, b: &Server) -> Ordering {
    (a.load_percent, Reverse(a.last_update), &a.name).cmp(&(
        b.load_percent,
        Reverse(b.last_update),
        &b.name,
    ))
}

/// Pick the preferred server among `candidates`.
///
/// Candidates are assumed already filtered to online, fresh servers.
pub fn least_loaded(candidates: &[Server]) -> Option<&Server> {
    candidates.iter().min_by(|a, b| preference(a, b))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use xferant_core::ServerStatus;

    use super::*;

    fn server(name: &str, load: i64, reported: i64) -> Server {
        let at = DateTime::<Utc>::from_timestamp(reported, 0).unwrap();
        Server {
            id: format!("id-{name}"),
            name: name.into(),
            hostname: format!("{name}.example.net"),
            ip_address: "192.0.2.1".into(),
            status: ServerStatus::Online,
            location: "eu-west".into(),
            load_percent: load,
            last_update: at,
            created_at: at,
        }
    }

    #[test]
    fn picks_lowest_load() {
        let servers = [server("a", 40, 100), server("b", 20, 100), server("c", 80, 100)];
        assert_eq!(least_loaded(&servers).unwrap().name, "b");
    }

    #[test]
    fn tie_prefers_recent_report() {
        let servers = [server("a", 10, 100), server("b", 10, 200)];
        assert_eq!(least_loaded(&servers).unwrap().name, "b");
    }

    #[test]
    fn full_tie_prefers_smaller_name() {
        let servers = [server("zeta", 10, 100), server("alpha", 10, 100)];
        assert_eq!(least_loaded(&servers).unwrap().name, "alpha");
    }

    #[test]
    fn empty_is_none() {
        assert!(least_loaded(&[]).is_none());
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn selection_is_minimal_and_order_independent(
                entries in proptest::collection::vec((0i64..=100, 0i64..1_000, "[a-e]{1,3}"), 1..20)
            ) {
                let servers: Vec<Server> = entries
                    .iter()
                    .map(|(load, at, name)| server(name, *load, *at))
                    .collect();
                let picked = least_loaded(&servers).unwrap();

                for s in &servers {
                    prop_assert!(picked.load_percent <= s.load_percent);
                    if s.load_percent == picked.load_percent {
                        prop_assert!(picked.last_update >= s.last_update);
                        if s.last_update == picked.last_update {
                            prop_assert!(picked.name <= s.name);
                        }
                    }
                }

                let mut reversed = servers.clone();
                reversed.reverse();
                let again = least_loaded(&reversed).unwrap();
                prop_assert_eq!(
                    (again.load_percent, again.last_update, &again.name),
                    (picked.load_percent, picked.last_update, &picked.name)
                );
            }
        }
    }
}
