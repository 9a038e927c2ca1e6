//! Writing synthesized name records into binary fonts.

use std::{
    fs::{read, write},
    path::Path,
};

use read_fonts::{FontRef, types::NameId as RawNameId};
use write_fonts::{
    FontBuilder,
    tables::name::{Name, NameRecord as RawNameRecord},
};

use crate::{NameRecord, Naming, NamingError, Result, build_name_records};

/// Rewrite font data by applying a transformation function.
///
/// Copies all tables from the source font, then calls `f` to modify or add tables.
pub fn rewrite_font(
    data: &[u8],
    f: impl FnOnce(&FontRef, &mut FontBuilder) -> Result<()>,
) -> Result<Vec<u8>> {
    let font = FontRef::new(data)?;
    let mut builder = FontBuilder::new();

    for record in font.table_directory.table_records() {
        let tag = record.tag();
        if let Some(table_data) = font.table_data(tag) {
            builder.add_raw(tag, table_data);
        }
    }

    f(&font, &mut builder)?;
    Ok(builder.build())
}

/// Replace the whole `name` table of a font with `records`.
pub fn apply_name_records(font_data: &[u8], records: &[NameRecord]) -> Result<Vec<u8>> {
    let raw_records: Vec<RawNameRecord> = records
        .iter()
        .map(|r| {
            RawNameRecord::new(
                r.platform_id,
                r.encoding_id,
                r.language_id,
                RawNameId::new(r.name_id.to_u16()),
                r.value.clone().into(),
            )
        })
        .collect();

    rewrite_font(font_data, |_font, builder| {
        builder.add_table(&Name::new(raw_records))?;
        Ok(())
    })
}

/// Rename the font at `from` for `(weight, region)` and write it to `to`.
pub fn rename_font(
    from: &Path,
    to: &Path,
    prefix: &str,
    naming: &Naming,
    weight: &str,
    region: &str,
) -> Result<()> {
    let data = read(from).map_err(|source| NamingError::Io { path: from.to_path_buf(), source })?;
    let records = build_name_records(prefix, naming, weight, region)?;
    let renamed = apply_name_records(&data, &records)?;
    write(to, renamed).map_err(|source| NamingError::Io { path: to.to_path_buf(), source })
}
