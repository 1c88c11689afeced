//! `mdm tables` command implementation

use crate::api::ApiClient;
use crate::error::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

pub async fn run(client: &ApiClient) -> Result<()> {
    let tables = client.list_tables().await?;

    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Table", "Key", "Fields"]);

    for table in &tables {
        let fields = table
            .fields
            .iter()
            .map(|f| {
                if f.required {
                    format!("{} ({}, required)", f.name, f.kind)
                } else {
                    format!("{} ({})", f.name, f.kind)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        out.add_row(vec![table.name.clone(), table.key_field.clone(), fields]);
    }

    println!("{}", out);

    Ok(())
}
