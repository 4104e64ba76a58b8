use crate::directory::{DirectoryService, MemberQuery, MemberSet};
use crate::models::{Classification, OrgCounts};
use anyhow::Result;
use tracing::{debug, info};

/// Patron-group member sets, resolved once per run.
#[derive(Debug, Clone, Default)]
pub struct RoleMembers {
    pub faculty: MemberSet,
    pub staff: MemberSet,
    pub student: MemberSet,
    pub dcc: MemberSet,
}

impl RoleMembers {
    fn slot(&mut self, classification: Classification) -> &mut MemberSet {
        match classification {
            Classification::Faculty => &mut self.faculty,
            Classification::Staff => &mut self.staff,
            Classification::Student => &mut self.student,
            Classification::Dcc => &mut self.dcc,
        }
    }
}

pub async fn resolve_role_members<D: DirectoryService>(directory: &mut D) -> Result<RoleMembers> {
    info!("Getting faculty, staff, student, and dcc members ... ");

    let mut roles = RoleMembers::default();
    for classification in Classification::ALL {
        let members = directory
            .resolve_members(&MemberQuery::Role(classification))
            .await?;
        debug!("{} members: {}", classification, members.len());
        *roles.slot(classification) = members;
    }

    info!(
        "Completed faculty, staff, student, and dcc queries ({} / {} / {} / {})",
        roles.faculty.len(),
        roles.staff.len(),
        roles.student.len(),
        roles.dcc.len()
    );
    Ok(roles)
}

/// Decides when to report progress: roughly every tenth of the run, and
/// always on the final item.
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    total: usize,
    interval: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        let interval = ((total as f64) / 10.0).round() as usize;
        Self {
            total,
            interval: interval.max(1),
        }
    }

    /// Percent complete to report after `index` (zero-based), if any.
    pub fn checkpoint(&self, index: usize) -> Option<u32> {
        if self.total == 0 || index >= self.total {
            return None;
        }
        if index % self.interval == 0 || index == self.total - 1 {
            let percent = ((index + 1) as f64 / self.total as f64 * 100.0).round() as u32;
            Some(percent)
        } else {
            None
        }
    }
}

fn intersection_len(a: &MemberSet, b: &MemberSet) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|id| large.contains(*id)).count()
}

pub fn count_privileged(total: usize, privileged: &MemberSet, roles: &RoleMembers) -> OrgCounts {
    OrgCounts {
        total,
        privileged_total: privileged.len(),
        privileged_faculty: intersection_len(privileged, &roles.faculty),
        privileged_staff: intersection_len(privileged, &roles.staff),
        privileged_student: intersection_len(privileged, &roles.student),
        privileged_dcc: intersection_len(privileged, &roles.dcc),
    }
}

/// Queries the directory twice per code and returns counts in input order.
/// The first directory error aborts the whole pass.
pub async fn aggregate<D: DirectoryService>(
    directory: &mut D,
    org_codes: &[String],
    roles: &RoleMembers,
) -> Result<Vec<OrgCounts>> {
    let progress = ProgressTracker::new(org_codes.len());
    let mut counts = Vec::with_capacity(org_codes.len());

    for (index, code) in org_codes.iter().enumerate() {
        if let Some(percent) = progress.checkpoint(index) {
            info!("{:>3}% completed ...", percent);
        }

        let total_members = directory
            .resolve_members(&MemberQuery::all_members(code))
            .await?;
        let privileged = directory
            .resolve_members(&MemberQuery::privileged_members(code))
            .await?;

        counts.push(count_privileged(total_members.len(), &privileged, roles));
    }

    Ok(counts)
}
