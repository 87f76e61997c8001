//! Hash equi-join
//!
//! The build side is the left child: its rows go into a hash map keyed
//! by the join value. The right child probes in its stored order, so
//! output order is probe order with ties in build insertion order;
//! unmatched build rows (LEFT/FULL) are appended afterwards in build
//! order. Null join keys match nothing on either side but still produce
//! their side's unmatched emission.

use std::collections::HashMap;

use super::Intermediate;
use crate::error::Result;
use crate::sql::ast::JoinType;
use crate::types::{IndexKey, Row};

/// Build map: join key to build-side row positions, in insertion order.
pub type BuildMap = HashMap<IndexKey, Vec<usize>>;

/// Qualify every bare column of an intermediate with its source table
/// name. Keys that already contain a dot came out of a lower join and
/// are left alone.
pub fn qualify(mut im: Intermediate, table: &str) -> Intermediate {
    for meta in &mut im.columns {
        if !meta.name.contains('.') {
            meta.name = format!("{}.{}", table, meta.name);
        }
    }
    for row in &mut im.rows {
        let qualified: Row = row
            .drain()
            .map(|(k, v)| {
                if k.contains('.') {
                    (k, v)
                } else {
                    (format!("{}.{}", table, k), v)
                }
            })
            .collect();
        *row = qualified;
    }
    im
}

/// Build the hash map over the build-side rows.
pub fn build_map(rows: &[Row], key: &str) -> BuildMap {
    let mut map = BuildMap::new();
    for (pos, row) in rows.iter().enumerate() {
        if let Some(k) = row.get(key).and_then(IndexKey::join_key) {
            map.entry(k).or_default().push(pos);
        }
    }
    map
}

/// Execute one join over already-qualified children.
pub fn hash_join(
    left: Intermediate,
    right: Intermediate,
    join_type: JoinType,
    left_key: &str,
    right_key: &str,
    prebuilt: Option<BuildMap>,
) -> Result<Intermediate> {
    let map = prebuilt.unwrap_or_else(|| build_map(&left.rows, left_key));
    let mut matched = vec![false; left.rows.len()];
    let mut out = Vec::with_capacity(right.rows.len());

    for probe_row in &right.rows {
        let hit = probe_row
            .get(right_key)
            .and_then(IndexKey::join_key)
            .and_then(|k| map.get(&k));

        match hit {
            Some(positions) => {
                for &pos in positions {
                    out.push(merge_rows(&left.rows[pos], probe_row));
                    matched[pos] = true;
                }
            }
            None => {
                // Unmatched probe row: kept with the left columns absent
                // for RIGHT and FULL, dropped otherwise.
                if matches!(join_type, JoinType::Right | JoinType::Full) {
                    out.push(probe_row.clone());
                }
            }
        }
    }

    // Unmatched build rows append after the probe-driven output.
    if matches!(join_type, JoinType::Left | JoinType::Full) {
        for (pos, row) in left.rows.iter().enumerate() {
            if !matched[pos] {
                out.push(row.clone());
            }
        }
    }

    let mut columns = left.columns;
    columns.extend(right.columns);

    Ok(Intermediate { columns, rows: out })
}

fn merge_rows(left: &Row, right: &Row) -> Row {
    let mut merged = Row::with_capacity(left.len() + right.len());
    for (k, v) in left {
        merged.insert(k.clone(), v.clone());
    }
    for (k, v) in right {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ColumnMeta;
    use crate::types::{ColumnType, Value};

    fn user(id: i64, name: &str) -> Row {
        [
            ("users.id".to_string(), Value::Int(id)),
            ("users.name".to_string(), Value::Text(name.into())),
        ]
        .into_iter()
        .collect()
    }

    fn order(id: i64, user_id: Option<i64>, amount: f64) -> Row {
        let mut row: Row = [
            ("orders.id".to_string(), Value::Int(id)),
            ("orders.amount".to_string(), Value::Float(amount)),
        ]
        .into_iter()
        .collect();
        if let Some(uid) = user_id {
            row.insert("orders.user_id".to_string(), Value::Int(uid));
        }
        row
    }

    fn users_im(rows: Vec<Row>) -> Intermediate {
        Intermediate {
            columns: vec![
                ColumnMeta::new("users.id", ColumnType::Int),
                ColumnMeta::new("users.name", ColumnType::Text),
            ],
            rows,
        }
    }

    fn orders_im(rows: Vec<Row>) -> Intermediate {
        Intermediate {
            columns: vec![
                ColumnMeta::new("orders.id", ColumnType::Int),
                ColumnMeta::new("orders.user_id", ColumnType::Int),
                ColumnMeta::new("orders.amount", ColumnType::Float),
            ],
            rows,
        }
    }

    fn join(
        users: Vec<Row>,
        orders: Vec<Row>,
        join_type: JoinType,
    ) -> Vec<Row> {
        hash_join(
            users_im(users),
            orders_im(orders),
            join_type,
            "users.id",
            "orders.user_id",
            None,
        )
        .unwrap()
        .rows
    }

    #[test]
    fn test_inner_join_probe_order() {
        let rows = join(
            vec![user(1, "alice"), user(2, "bob")],
            vec![
                order(10, Some(1), 9.5),
                order(11, Some(1), 4.25),
                order(12, Some(2), 1.0),
            ],
            JoinType::Inner,
        );

        assert_eq!(rows.len(), 3);
        // Probe (orders) order drives the output.
        assert_eq!(rows[0]["orders.id"], Value::Int(10));
        assert_eq!(rows[0]["users.name"], Value::Text("alice".into()));
        assert_eq!(rows[1]["orders.id"], Value::Int(11));
        assert_eq!(rows[2]["users.name"], Value::Text("bob".into()));
    }

    #[test]
    fn test_inner_join_drops_unmatched() {
        let rows = join(
            vec![user(1, "alice")],
            vec![order(10, Some(999), 5.0)],
            JoinType::Inner,
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_left_join_appends_unmatched_build_rows() {
        let rows = join(
            vec![user(1, "alice"), user(2, "bob"), user(3, "carol")],
            vec![order(12, Some(2), 1.0)],
            JoinType::Left,
        );

        assert_eq!(rows.len(), 3);
        // Matched row first (probe order), then unmatched users in
        // build order with the order columns absent.
        assert_eq!(rows[0]["users.name"], Value::Text("bob".into()));
        assert_eq!(rows[1]["users.name"], Value::Text("alice".into()));
        assert!(!rows[1].contains_key("orders.id"));
        assert_eq!(rows[2]["users.name"], Value::Text("carol".into()));
    }

    #[test]
    fn test_right_join_keeps_unmatched_probe_rows_inline() {
        let rows = join(
            vec![user(1, "alice")],
            vec![
                order(10, Some(1), 9.5),
                order(11, Some(999), 4.25),
                order(12, Some(1), 1.0),
            ],
            JoinType::Right,
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["orders.id"], Value::Int(10));
        // The orphan stays in probe position with user columns absent.
        assert_eq!(rows[1]["orders.id"], Value::Int(11));
        assert!(!rows[1].contains_key("users.name"));
        assert_eq!(rows[2]["orders.id"], Value::Int(12));
    }

    #[test]
    fn test_full_join_loses_nothing() {
        let rows = join(
            vec![user(1, "alice"), user(2, "bob")],
            vec![order(10, Some(1), 9.5), order(11, Some(999), 4.25)],
            JoinType::Full,
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["users.name"], Value::Text("alice".into()));
        assert!(!rows[1].contains_key("users.name")); // orphan order
        assert_eq!(rows[2]["users.name"], Value::Text("bob".into())); // unmatched user
    }

    #[test]
    fn test_null_keys_match_nothing_but_still_emit() {
        let rows = join(
            vec![user(1, "alice")],
            vec![order(10, None, 9.5)],
            JoinType::Full,
        );

        // The keyless order and the unmatched user both survive,
        // separately.
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].contains_key("users.name"));
        assert_eq!(rows[1]["users.name"], Value::Text("alice".into()));
    }

    #[test]
    fn test_ties_emit_in_build_insertion_order() {
        // Two users share a (non-unique) join value.
        let mut u1 = user(1, "first");
        u1.insert("users.group".into(), Value::Int(7));
        let mut u2 = user(2, "second");
        u2.insert("users.group".into(), Value::Int(7));

        let mut o = order(10, None, 1.0);
        o.insert("orders.group".into(), Value::Int(7));

        let out = hash_join(
            users_im(vec![u1, u2]),
            orders_im(vec![o]),
            JoinType::Inner,
            "users.group",
            "orders.group",
            None,
        )
        .unwrap();

        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0]["users.name"], Value::Text("first".into()));
        assert_eq!(out.rows[1]["users.name"], Value::Text("second".into()));
    }

    #[test]
    fn test_prebuilt_map_matches_temporary_map() {
        let users = vec![user(1, "alice"), user(2, "bob")];
        let orders = vec![order(10, Some(2), 3.0)];

        let prebuilt = build_map(&users, "users.id");
        let with_index = hash_join(
            users_im(users.clone()),
            orders_im(orders.clone()),
            JoinType::Inner,
            "users.id",
            "orders.user_id",
            Some(prebuilt),
        )
        .unwrap();
        let without = hash_join(
            users_im(users),
            orders_im(orders),
            JoinType::Inner,
            "users.id",
            "orders.user_id",
            None,
        )
        .unwrap();

        assert_eq!(with_index.rows, without.rows);
    }

    #[test]
    fn test_join_columns_are_left_then_right() {
        let out = hash_join(
            users_im(vec![]),
            orders_im(vec![]),
            JoinType::Inner,
            "users.id",
            "orders.user_id",
            None,
        )
        .unwrap();
        let names: Vec<&str> = out.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "users.id",
                "users.name",
                "orders.id",
                "orders.user_id",
                "orders.amount"
            ]
        );
    }

    #[test]
    fn test_qualify_leaves_dotted_keys_alone() {
        let im = Intermediate {
            columns: vec![
                ColumnMeta::new("id", ColumnType::Int),
                ColumnMeta::new("users.name", ColumnType::Text),
            ],
            rows: vec![[
                ("id".to_string(), Value::Int(1)),
                ("users.name".to_string(), Value::Text("a".into())),
            ]
            .into_iter()
            .collect()],
        };
        let out = qualify(im, "orders");
        assert_eq!(out.columns[0].name, "orders.id");
        assert_eq!(out.columns[1].name, "users.name");
        assert!(out.rows[0].contains_key("orders.id"));
        assert!(out.rows[0].contains_key("users.name"));
    }
}
