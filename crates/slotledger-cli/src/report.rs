//! Plain-text and JSON renderings of the registry for the CLI.

use std::fmt::Write as _;

use slotledger_store::{EntityKind, TableSchema};

/// Table name and row count per line, names padded to one column.
pub fn stats_table(counts: &[(EntityKind, i64)]) -> String {
    let width = counts
        .iter()
        .map(|(kind, _)| kind.schema().table.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for (kind, count) in counts {
        let _ = writeln!(out, "{:<width$}  {count}", kind.schema().table);
    }
    out.trim_end().to_string()
}

pub fn stats_json(counts: &[(EntityKind, i64)]) -> serde_json::Result<String> {
    let map: serde_json::Map<String, serde_json::Value> = counts
        .iter()
        .map(|(kind, count)| (kind.schema().table.to_string(), (*count).into()))
        .collect();
    serde_json::to_string_pretty(&map)
}

/// Catalog listing; `table` restricts it to one table.
pub fn schema(table: Option<&str>) -> anyhow::Result<String> {
    let schemas: Vec<&TableSchema> = match table {
        Some(name) => {
            let schema = EntityKind::ALL
                .into_iter()
                .map(EntityKind::schema)
                .find(|s| s.table == name)
                .ok_or_else(|| anyhow::anyhow!("Unknown table `{name}`"))?;
            vec![schema]
        }
        None => EntityKind::ALL.into_iter().map(EntityKind::schema).collect(),
    };

    let mut out = String::new();
    for schema in schemas {
        let _ = writeln!(out, "{} ({})", schema.table, schema.kind);
        for column in schema.columns {
            let mut flags = Vec::new();
            if !column.nullable {
                flags.push("required");
            }
            if column.has_default {
                flags.push("default");
            }
            let _ = writeln!(
                out,
                "  {:<24} {:<9} {}",
                column.name,
                column.kind.as_str(),
                flags.join(", ")
            );
        }
        for unique in schema.unique {
            let _ = writeln!(out, "  unique {} ({})", unique.name, unique.columns.join(", "));
        }
        for fk in schema.foreign_keys {
            let _ = writeln!(
                out,
                "  foreign key {} -> {} (restrict{})",
                fk.column,
                fk.references.schema().table,
                if fk.required { "" } else { ", optional" }
            );
        }
        out.push('\n');
    }
    Ok(out
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_table_aligns_counts() {
        let text = stats_table(&[(EntityKind::Provider, 3), (EntityKind::SlotMachine, 12)]);
        assert_eq!(text, "providers      3\nslot_machines  12");
    }

    #[test]
    fn stats_json_keys_by_table() {
        let json = stats_json(&[(EntityKind::User, 2)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["users"], 2);
    }

    #[test]
    fn schema_lists_constraints() {
        let text = schema(Some("cabinets")).unwrap();
        assert!(text.starts_with("cabinets (Cabinet)"));
        assert!(text.contains("unique cabinets_name_manufacturer_key (name, manufacturer)"));
        assert!(text.contains("foreign key provider_id -> providers (restrict)"));
    }

    #[test]
    fn unknown_table_is_an_error() {
        assert!(schema(Some("widgets")).is_err());
    }
}
