//! Cartesian expansion of per-role candidates.
//!
//! Expansion runs in two phases: [`count_combinations`] is cheap and runs
//! first so the size guard can reject a scene before anything is
//! materialized; [`materialize`] then builds the combinations in a fixed
//! order.
//!
//! Order is roles in cut order, and inside a role costume, then pose, then
//! expression, outermost to innermost. The last axis changes fastest.

use serde::Serialize;
use tableau_core::reference::Slot;
use tableau_core::scene::Cut;
use tableau_core::types::EntityId;

use crate::error::ResolveError;
use crate::resolver::RoleCandidates;

/// Default ceiling on combinations per scene.
pub const DEFAULT_MAX_COMBINATIONS: u64 = 500;

/// Upper bound on combinations reserved up front by [`materialize`].
const MAX_PREALLOCATED: usize = 4096;

/// One concrete appearance choice for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleChoice {
    pub role_id: EntityId,
    pub actor_id: EntityId,
    pub costume_id: EntityId,
    pub pose_id: EntityId,
    pub expression_id: EntityId,
}

/// One choice per role, in cut role order.
pub type Combination = Vec<RoleChoice>;

/// Product of all candidate-list lengths, saturating at `u64::MAX`.
///
/// A cut with no roles has exactly one (empty) combination.
pub fn count_combinations(per_role: &[RoleCandidates]) -> u64 {
    per_role
        .iter()
        .flat_map(|role| Slot::ALL.map(|slot| role.slot(slot).len() as u64))
        .fold(1u64, u64::saturating_mul)
}

/// Reject counts above `limit`.
///
/// A saturated count is always rejected, whatever the limit.
pub fn check_limit(count: u64, limit: u64) -> Result<(), ResolveError> {
    if count > limit || count == u64::MAX {
        return Err(ResolveError::ExcessiveCombinations { count, limit });
    }
    Ok(())
}

/// Build every combination in order. Call [`check_limit`] first.
pub fn materialize(per_role: &[RoleCandidates]) -> Vec<Combination> {
    // Flatten to one axis per (role, slot) and walk them as a mixed-radix
    // counter with the last axis as the least significant digit.
    let axes: Vec<&[EntityId]> = per_role
        .iter()
        .flat_map(|role| Slot::ALL.map(|slot| role.slot(slot)))
        .collect();

    if axes.iter().any(|axis| axis.is_empty()) {
        return Vec::new();
    }

    let total = count_combinations(per_role);
    let mut digits = vec![0usize; axes.len()];
    let mut out = Vec::with_capacity(usize::try_from(total).unwrap_or(0).min(MAX_PREALLOCATED));

    for _ in 0..total {
        let combination = per_role
            .iter()
            .enumerate()
            .map(|(r, role)| {
                let base = r * Slot::ALL.len();
                RoleChoice {
                    role_id: role.role_id.clone(),
                    actor_id: role.actor_id.clone(),
                    costume_id: axes[base][digits[base]].clone(),
                    pose_id: axes[base + 1][digits[base + 1]].clone(),
                    expression_id: axes[base + 2][digits[base + 2]].clone(),
                }
            })
            .collect();
        out.push(combination);

        for (axis, digit) in axes.iter().zip(digits.iter_mut()).rev() {
            *digit += 1;
            if *digit < axis.len() {
                break;
            }
            *digit = 0;
        }
    }

    out
}

/// Order candidates by the cut's role list, then count, guard and
/// materialize.
pub fn expand(
    cut: &Cut,
    per_role: &[RoleCandidates],
    limit: u64,
) -> Result<Vec<Combination>, ResolveError> {
    let ordered = order_by_cut(cut, per_role)?;
    check_limit(count_combinations(&ordered), limit)?;
    Ok(materialize(&ordered))
}

fn order_by_cut(cut: &Cut, per_role: &[RoleCandidates]) -> Result<Vec<RoleCandidates>, ResolveError> {
    cut.roles
        .iter()
        .map(|role| {
            per_role
                .iter()
                .find(|c| c.role_id == role.id)
                .cloned()
                .ok_or_else(|| ResolveError::UnassignedRole {
                    role_id: role.id.clone(),
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tableau_core::scene::{CutRole, ImageMode};

    fn ids(list: &[&str]) -> Vec<EntityId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn candidates(role: &str, costumes: &[&str], poses: &[&str], expressions: &[&str]) -> RoleCandidates {
        RoleCandidates {
            role_id: role.into(),
            actor_id: format!("actor_{role}"),
            costumes: ids(costumes),
            poses: ids(poses),
            expressions: ids(expressions),
        }
    }

    fn cut(roles: &[&str]) -> Cut {
        Cut {
            id: "cut_1".into(),
            name: String::new(),
            prompt_template: String::new(),
            negative_template: String::new(),
            roles: roles
                .iter()
                .map(|r| CutRole {
                    id: r.to_string(),
                    name_in_scene: String::new(),
                })
                .collect(),
            reference_image_path: String::new(),
            image_mode: ImageMode::Txt2Img,
        }
    }

    fn triple(c: &RoleChoice) -> (&str, &str, &str) {
        (c.costume_id.as_str(), c.pose_id.as_str(), c.expression_id.as_str())
    }

    // -- counting --

    #[test]
    fn count_is_product_of_lengths() {
        let per_role = [candidates("r1", &["c1", "c2"], &["p1"], &["e1", "e2", "e3"])];
        assert_eq!(count_combinations(&per_role), 6);
    }

    #[test]
    fn count_saturates() {
        let big: Vec<String> = (0..u16::MAX).map(|i| i.to_string()).collect();
        let role = RoleCandidates {
            role_id: "r".into(),
            actor_id: "a".into(),
            costumes: big.clone(),
            poses: big.clone(),
            expressions: big.clone(),
        };
        let per_role = vec![role.clone(), role.clone(), role];
        assert_eq!(count_combinations(&per_role), u64::MAX);
    }

    #[test]
    fn limit_rejects_excess() {
        assert_matches!(
            check_limit(501, 500),
            Err(ResolveError::ExcessiveCombinations { count: 501, limit: 500 })
        );
        assert!(check_limit(500, 500).is_ok());
    }

    #[test]
    fn saturated_count_exceeds_any_limit() {
        let big: Vec<String> = (0..u16::MAX).map(|i| i.to_string()).collect();
        let per_role: Vec<RoleCandidates> = ["r1", "r2", "r3"]
            .iter()
            .map(|id| RoleCandidates {
                role_id: id.to_string(),
                actor_id: "a".into(),
                costumes: big.clone(),
                poses: big.clone(),
                expressions: big.clone(),
            })
            .collect();
        assert_matches!(
            expand(&cut(&["r1", "r2", "r3"]), &per_role, u64::MAX),
            Err(ResolveError::ExcessiveCombinations { count: u64::MAX, limit: u64::MAX })
        );
    }

    // -- ordering --

    #[test]
    fn single_role_nested_order() {
        let per_role = [candidates("r1", &["c1", "c2"], &["p1"], &["e1", "e2", "e3"])];
        let combos = expand(&cut(&["r1"]), &per_role, DEFAULT_MAX_COMBINATIONS).unwrap();
        let order: Vec<_> = combos.iter().map(|c| triple(&c[0])).collect();
        assert_eq!(
            order,
            vec![
                ("c1", "p1", "e1"),
                ("c1", "p1", "e2"),
                ("c1", "p1", "e3"),
                ("c2", "p1", "e1"),
                ("c2", "p1", "e2"),
                ("c2", "p1", "e3"),
            ]
        );
    }

    #[test]
    fn first_role_is_outermost() {
        let per_role = [
            candidates("r2", &["x1", "x2"], &["q"], &["f"]),
            candidates("r1", &["c1", "c2"], &["p"], &["e"]),
        ];
        let combos = expand(&cut(&["r1", "r2"]), &per_role, DEFAULT_MAX_COMBINATIONS).unwrap();
        let order: Vec<_> = combos
            .iter()
            .map(|c| (c[0].costume_id.as_str(), c[1].costume_id.as_str()))
            .collect();
        assert_eq!(order, vec![("c1", "x1"), ("c1", "x2"), ("c2", "x1"), ("c2", "x2")]);
        assert_eq!(combos[0][0].role_id, "r1");
    }

    #[test]
    fn no_roles_yields_one_empty_combination() {
        let combos = expand(&cut(&[]), &[], DEFAULT_MAX_COMBINATIONS).unwrap();
        assert_eq!(combos, vec![Vec::new()]);
    }

    #[test]
    fn missing_role_candidates_is_unassigned() {
        let per_role = [candidates("r1", &["c"], &["p"], &["e"])];
        assert_matches!(
            expand(&cut(&["r1", "r2"]), &per_role, DEFAULT_MAX_COMBINATIONS),
            Err(ResolveError::UnassignedRole { role_id }) if role_id == "r2"
        );
    }

    #[test]
    fn guard_runs_before_materializing() {
        let per_role = [candidates("r1", &["c1", "c2"], &["p1", "p2"], &["e1"])];
        assert_matches!(
            expand(&cut(&["r1"]), &per_role, 3),
            Err(ResolveError::ExcessiveCombinations { count: 4, limit: 3 })
        );
    }
}
