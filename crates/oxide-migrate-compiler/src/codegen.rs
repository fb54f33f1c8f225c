//! Row type declarations derived from the final schema.
//!
//! The document is descriptive only: one plain struct per table, with
//! nullable columns wrapped in `Option`.

use crate::registry::SchemaRegistry;
use crate::schema::{Column, ColumnType, TableState};

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while", "yield",
];

/// Renders one struct per tracked table, in registry order.
#[must_use]
pub fn render_types(registry: &SchemaRegistry) -> String {
    let mut out = String::from("// Generated by oxide-migrate-compiler. Do not edit.\n");
    for table in registry.iter() {
        out.push('\n');
        render_table(&mut out, table);
    }
    out
}

fn render_table(out: &mut String, table: &TableState) {
    out.push_str(&format!("/// Row of the `{}` table.\n", table.name));
    out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    out.push_str(&format!("pub struct {}Row {{\n", struct_name(&table.name)));
    for column in &table.columns {
        out.push_str(&format!(
            "    pub {}: {},\n",
            field_name(&column.name),
            field_type(column)
        ));
    }
    out.push_str("}\n");
}

fn field_type(column: &Column) -> String {
    let base = match column.column_type {
        ColumnType::Identity | ColumnType::Integer | ColumnType::Foreign => "i64",
        ColumnType::Text => "String",
        ColumnType::Real => "f64",
        ColumnType::Blob => "Vec<u8>",
    };
    if column.is_identity() || column.not_null {
        base.to_string()
    } else {
        format!("Option<{base}>")
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) || cleaned.is_empty() {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

fn field_name(name: &str) -> String {
    let name = sanitize(name).to_lowercase();
    if KEYWORDS.contains(&name.as_str()) {
        format!("r#{name}")
    } else {
        name
    }
}

fn struct_name(name: &str) -> String {
    let name: String = sanitize(name)
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_species() {
        let mut registry = SchemaRegistry::new();
        registry
            .insert(
                TableState::new(
                    "species",
                    vec![
                        Column::identity("id"),
                        Column::text("name").not_null(),
                        Column::real("mass"),
                        Column::foreign("planet", "planets"),
                        Column::blob("type"),
                    ],
                )
                .unwrap(),
            )
            .unwrap();

        let document = render_types(&registry);
        assert_eq!(
            document,
            "// Generated by oxide-migrate-compiler. Do not edit.\n\
             \n\
             /// Row of the `species` table.\n\
             #[derive(Debug, Clone, PartialEq)]\n\
             pub struct SpeciesRow {\n    \
             pub id: i64,\n    \
             pub name: String,\n    \
             pub mass: Option<f64>,\n    \
             pub planet: Option<i64>,\n    \
             pub r#type: Option<Vec<u8>>,\n\
             }\n"
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(struct_name("space_ship"), "SpaceShip");
        assert_eq!(struct_name("2fast"), "_2fast");
        assert_eq!(field_name("Home World"), "home_world");
        assert_eq!(field_name("match"), "r#match");
    }
}
