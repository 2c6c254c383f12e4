use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

use crate::store::EntityStore;

/// A dangling or inconsistent reference found by [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    UnresolvedCredit { show: i64, role: i64 },
    UnresolvedPrincipalCredit { show: i64, role: i64 },
    PrincipalNotInCredits { show: i64, role: i64 },
    UnresolvedEpisode { show: i64, episode: i64 },
    RoleWithoutShow { role: i64, show: i64 },
    RoleWithoutTalent { role: i64, talent: i64 },
    RoleNotInShowCredits { role: i64, show: i64 },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::UnresolvedCredit { show, role } => {
                write!(f, "show {} credits unknown role {}", show, role)
            }
            IntegrityIssue::UnresolvedPrincipalCredit { show, role } => {
                write!(f, "show {} has unknown principal role {}", show, role)
            }
            IntegrityIssue::PrincipalNotInCredits { show, role } => {
                write!(f, "show {} principal role {} is missing from its credits", show, role)
            }
            IntegrityIssue::UnresolvedEpisode { show, episode } => {
                write!(f, "show {} lists unknown episode {}", show, episode)
            }
            IntegrityIssue::RoleWithoutShow { role, show } => {
                write!(f, "role {} points at unknown show {}", role, show)
            }
            IntegrityIssue::RoleWithoutTalent { role, talent } => {
                write!(f, "role {} points at unknown person {}", role, talent)
            }
            IntegrityIssue::RoleNotInShowCredits { role, show } => {
                write!(f, "role {} is not listed in the credits of show {}", role, show)
            }
        }
    }
}

/// Cross-reference shows, people and roles. Read-only.
pub fn check(store: &EntityStore) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();
    let shows = store.shows();

    for show in &shows {
        let id = show.id();
        let credits: HashSet<i64> = show.credits.iter().flatten().copied().collect();

        for &role in show.credits.iter().flatten() {
            if !store.roles().contains(role) {
                issues.push(IntegrityIssue::UnresolvedCredit { show: id, role });
            }
        }

        for &role in show.principal_credits.iter().flatten() {
            if !store.roles().contains(role) {
                issues.push(IntegrityIssue::UnresolvedPrincipalCredit { show: id, role });
            }
            if !credits.contains(&role) {
                issues.push(IntegrityIssue::PrincipalNotInCredits { show: id, role });
            }
        }

        for &episode in show.episodes.iter().flatten() {
            if !store.has_show(episode) {
                issues.push(IntegrityIssue::UnresolvedEpisode { show: id, episode });
            }
        }
    }

    for role in store.role_manifest() {
        match store.show(role.show()) {
            None => issues.push(IntegrityIssue::RoleWithoutShow {
                role: role.id,
                show: role.show(),
            }),
            Some(show) => {
                let listed = show.credits.as_ref().is_some_and(|c| c.contains(&role.id));
                if !listed {
                    issues.push(IntegrityIssue::RoleNotInShowCredits {
                        role: role.id,
                        show: role.show(),
                    });
                }
            }
        }
        if !store.has_person(role.talent()) {
            issues.push(IntegrityIssue::RoleWithoutTalent {
                role: role.id,
                talent: role.talent(),
            });
        }
    }

    if issues.is_empty() {
        info!("Integrity check passed for {} shows", shows.len());
    } else {
        for issue in &issues {
            warn!("Integrity: {}", issue);
        }
        warn!("Integrity check found {} issues", issues.len());
    }

    issues
}
