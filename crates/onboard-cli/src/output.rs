use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Left-aligned columns sized to the widest cell, two spaces apart.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let widths: Vec<usize> = (0..headers.len())
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(headers[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: &mut dyn Iterator<Item = &str>| -> String {
        let line = cells
            .enumerate()
            .map(|(col, cell)| {
                let pad = widths.get(col).copied().unwrap_or(0);
                format!("{cell:<pad$}")
            })
            .collect::<Vec<_>>()
            .join("  ");
        line.trim_end().to_string()
    };

    println!("{}", render(&mut headers.iter().copied()));
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", rule.join("  "));
    for row in &rows {
        println!("{}", render(&mut row.iter().map(String::as_str)));
    }
}

/// `-` for absent optional values in tables.
pub fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
