//! Compare sprint directories with state store rows.
//!
//! The filesystem and the store are updated separately, so they can drift
//! after an interrupted renumber or a hand-moved directory. `reconcile`
//! reports the drift and, when asked, registers sprints the store is
//! missing. It never deletes anything.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::outcome::SideEffect;
use crate::paths;
use crate::sprint::{self, SprintInfo};
use crate::store::SprintRecord;
use crate::types::Phase;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unregistered {
    pub id: String,
    pub slug: String,
    pub path: PathBuf,
    pub closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair: Option<SideEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orphaned {
    pub id: String,
    pub slug: String,
    pub phase: Phase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlugMismatch {
    pub id: String,
    pub directory_slug: String,
    pub store_slug: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub store_available: bool,
    pub unregistered: Vec<Unregistered>,
    pub orphaned: Vec<Orphaned>,
    pub slug_mismatch: Vec<SlugMismatch>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.unregistered.is_empty() && self.orphaned.is_empty() && self.slug_mismatch.is_empty()
    }
}

pub fn reconcile(ws: &Workspace, repair: bool) -> Result<ReconcileReport> {
    let Some(store) = ws.store() else {
        return Ok(ReconcileReport::default());
    };

    let on_disk: BTreeMap<String, SprintInfo> = sprint::list_sprints(ws, None)?
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();
    let rows: BTreeMap<String, SprintRecord> = if store.exists() {
        store.list()?.into_iter().map(|r| (r.id.clone(), r)).collect()
    } else {
        BTreeMap::new()
    };

    let mut report = ReconcileReport {
        store_available: true,
        ..ReconcileReport::default()
    };

    for (id, s) in &on_disk {
        match rows.get(id) {
            None => {
                // Closed sprints predating the store are left alone.
                let repair = (repair && !s.closed).then(|| {
                    let branch = paths::branch_name(id, &s.slug);
                    SideEffect::from_result("register sprint", store.register(id, &s.slug, Some(&branch)))
                });
                report.unregistered.push(Unregistered {
                    id: id.clone(),
                    slug: s.slug.clone(),
                    path: s.path.clone(),
                    closed: s.closed,
                    repair,
                });
            }
            Some(row) if row.slug != s.slug => report.slug_mismatch.push(SlugMismatch {
                id: id.clone(),
                directory_slug: s.slug.clone(),
                store_slug: row.slug.clone(),
            }),
            Some(_) => {}
        }
    }

    for (id, row) in &rows {
        if !on_disk.contains_key(id) {
            report.orphaned.push(Orphaned {
                id: id.clone(),
                slug: row.slug.clone(),
                phase: row.phase,
            });
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            unregistered = report.unregistered.len(),
            orphaned = report.orphaned.len(),
            slug_mismatch = report.slug_mismatch.len(),
            "filesystem and state store disagree"
        );
    }
    Ok(report)
}
