//! Base table fixtures for tests.

use entry::{encode_id_list, Entry};
use std::collections::BTreeMap;
use std::path::Path;
use table::TableBuilder;

use crate::{APPS_TABLE, MAIN_TABLE};

/// Writes a base table holding `entries`, with the reverse index derived
/// from their grants.
pub fn write_base(path: &Path, entries: &[(&str, Entry)]) -> anyhow::Result<()> {
    let mut b = TableBuilder::new();
    b.add_table(MAIN_TABLE).add_table(APPS_TABLE);

    let mut apps: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (id, e) in entries {
        b.insert(MAIN_TABLE, *id, e.encode());
        for app in e.list_applications() {
            apps.entry(app).or_default().push(*id);
        }
    }
    for (app, ids) in apps {
        b.insert(APPS_TABLE, app, encode_id_list(&ids));
    }
    b.write(path)?;
    Ok(())
}

pub fn entry(payload: &[u8], grants: &[(&str, &[&str])]) -> Entry {
    grants.iter().fold(Entry::new(payload.to_vec()), |e, (app, perms)| {
        e.set_application_permissions(app, perms.iter().copied())
    })
}
